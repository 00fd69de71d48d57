use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::debug;

use super::state::{FeedState, SourceStatus};
use crate::model::{Call, CallUpdate};
use crate::stream::FeedStream;

/// Owner of the feed state.
///
/// Readers take cheap `Arc` snapshots; writers go through the methods
/// below, each of which is a single atomic mutation.
pub struct FeedStore {
    state: watch::Sender<Arc<FeedState>>,
    history_capacity: usize,
}

impl FeedStore {
    pub fn new(history_capacity: usize) -> Self {
        let (state, _) = watch::channel(Arc::new(FeedState::default()));
        Self {
            state,
            history_capacity,
        }
    }

    pub fn history_capacity(&self) -> usize {
        self.history_capacity
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Arc<FeedState> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> FeedStream {
        FeedStream::new(self.state.subscribe())
    }

    // ── Mutations ────────────────────────────────────────────────────

    pub(crate) fn modify(&self, f: impl FnOnce(&mut FeedState)) {
        self.state.send_modify(|state| f(Arc::make_mut(state)));
    }

    pub fn set_status(&self, status: SourceStatus) {
        self.state.send_if_modified(|state| {
            if state.status == status {
                return false;
            }
            Arc::make_mut(state).status = status;
            true
        });
    }

    /// Insert or overwrite an active call.
    pub fn start_call(&self, call: Call) {
        debug!(call_id = %call.id, talkgroup = %call.talkgroup_id, "call started");
        self.modify(|state| {
            state.active_calls.insert(call.id.clone(), call);
        });
    }

    /// Merge an update into an active call. Returns `false` (and changes
    /// nothing) when the call is not active.
    pub fn update_call(&self, update: &CallUpdate) -> bool {
        self.state.send_if_modified(|state| {
            if !state.active_calls.contains_key(&update.id) {
                return false;
            }
            let state = Arc::make_mut(state);
            if let Some(call) = state.active_calls.get_mut(&update.id) {
                update.apply(call);
            }
            true
        })
    }

    /// Move an active call to the head of history.
    ///
    /// `ended_at` is the source-reported end; `now` is used when the
    /// source gave none. Returns the finished call, or `None` if the id
    /// was not active.
    pub fn end_call(
        &self,
        call_id: &str,
        ended_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<Call> {
        let capacity = self.history_capacity;
        let mut finished = None;
        self.state.send_if_modified(|state| {
            if !state.active_calls.contains_key(call_id) {
                return false;
            }
            let state = Arc::make_mut(state);
            let Some(mut call) = state.active_calls.shift_remove(call_id) else {
                return false;
            };
            if let Some(end) = ended_at {
                call.end_time.get_or_insert(end);
            }
            call.finish(now);

            state.call_history.retain(|c| c.id != call.id);
            state.call_history.push_front(call.clone());
            state.call_history.truncate(capacity);
            finished = Some(call);
            true
        });
        finished
    }

    /// Drop everything, as on disconnect.
    pub fn reset(&self) {
        self.state.send_replace(Arc::new(FeedState::default()));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_760_000_000 + secs, 0).unwrap()
    }

    fn call(id: &str, start: i64) -> Call {
        Call::new(id, "metro", "101", at(start))
    }

    #[test]
    fn start_then_end_moves_call_once() {
        let store = FeedStore::new(100);
        store.start_call(call("c1", 0));
        assert_eq!(store.snapshot().active_call_count(), 1);

        let ended = store.end_call("c1", None, at(5)).unwrap();
        assert_eq!(ended.end_time, Some(at(5)));

        let snap = store.snapshot();
        assert!(snap.active_calls.is_empty());
        assert_eq!(snap.call_history.len(), 1);
        assert_eq!(snap.call_history[0].id, "c1");

        // A duplicate end is a no-op.
        assert!(store.end_call("c1", None, at(9)).is_none());
        assert_eq!(store.snapshot().call_history.len(), 1);
    }

    #[test]
    fn history_is_bounded_and_evicts_oldest() {
        let store = FeedStore::new(3);
        for i in 0..5 {
            let id = format!("c{i}");
            store.start_call(call(&id, i));
            store.end_call(&id, None, at(i + 1));
        }
        let snap = store.snapshot();
        let ids: Vec<&str> = snap.call_history.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c4", "c3", "c2"]);
        assert!(snap.call_history.iter().all(Call::has_ended));
    }

    #[test]
    fn source_end_time_wins_over_now() {
        let store = FeedStore::new(10);
        store.start_call(call("c1", 0));
        let ended = store.end_call("c1", Some(at(3)), at(60)).unwrap();
        assert_eq!(ended.end_time, Some(at(3)));
        assert!((ended.duration - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn update_of_unknown_call_is_noop() {
        let store = FeedStore::new(10);
        let mut rx = store.state.subscribe();
        rx.mark_unchanged();

        let mut update = CallUpdate::new("ghost");
        update.emergency = Some(true);
        assert!(!store.update_call(&update));
        assert!(!rx.has_changed().unwrap());
        assert!(store.snapshot().active_calls.is_empty());
    }

    #[test]
    fn status_change_notifies_once() {
        let store = FeedStore::new(10);
        let mut rx = store.state.subscribe();
        rx.mark_unchanged();

        store.set_status(SourceStatus::Connected);
        assert!(rx.has_changed().unwrap());
        rx.mark_unchanged();

        store.set_status(SourceStatus::Connected);
        assert!(!rx.has_changed().unwrap());
    }
}
