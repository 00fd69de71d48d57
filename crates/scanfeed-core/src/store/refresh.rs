// ── Full refresh application ──
//
// A refresh replaces systems, talkgroups, active calls and history in a
// single mutation built from everything the source returned.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tracing::debug;

use super::FeedStore;
use super::state::SourceStatus;
use crate::model::{Call, System, Talkgroup};

/// Everything fetched during one refresh.
#[derive(Debug, Clone, Default)]
pub struct RefreshSnapshot {
    pub systems: Vec<System>,
    /// Talkgroups per system id.
    pub talkgroups: IndexMap<String, Vec<Talkgroup>>,
    pub active_calls: Vec<Call>,
    /// Recent finished calls, any order.
    pub history: Vec<Call>,
}

impl FeedStore {
    /// Replace the feed contents with a fresh snapshot and mark the
    /// source connected.
    pub fn apply_refresh(&self, snapshot: RefreshSnapshot, now: DateTime<Utc>) {
        let capacity = self.history_capacity();
        let RefreshSnapshot {
            systems,
            talkgroups,
            active_calls,
            mut history,
        } = snapshot;

        history.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        // Keep the newest copy of each id.
        let mut seen = HashSet::with_capacity(history.len());
        history.retain(|call| seen.insert(call.id.clone()));
        history.truncate(capacity);
        for call in &mut history {
            call.finish_from_duration();
        }

        self.modify(|state| {
            // Systems only grow within a session.
            for system in systems {
                state.systems.insert(system.id.clone(), system);
            }
            state.talkgroups = talkgroups;

            state.active_calls = active_calls
                .into_iter()
                .map(|call| (call.id.clone(), call))
                .collect();
            state.call_history = history.into();
            state.last_refresh = Some(now);
            state.status = SourceStatus::Connected;

            debug!(
                systems = state.systems.len(),
                active = state.active_calls.len(),
                history = state.call_history.len(),
                "refresh applied"
            );
        });
    }
}
