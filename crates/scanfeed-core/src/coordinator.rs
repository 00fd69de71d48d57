// ── Call feed coordinator ──
//
// Owns the feed state for one scanner back end. Handles the initial and
// periodic refresh, the optional push channel, call lifecycle events,
// and every read query consumers make.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use futures_util::future::try_join_all;
use indexmap::IndexMap;
use tokio::sync::{Mutex, Notify, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use scanfeed_api::push::{PushHandle, PushMessage, ReconnectConfig};

use crate::config::{FeedConfig, SourceConfig};
use crate::error::CoreError;
use crate::model::{AudioClip, Call, CallUpdate, FeedEvent};
use crate::source::{Activity, CallSource, connect_source};
use crate::store::{
    CallQuery, FeedState, FeedStore, HistoryPage, HistoryQuery, RefreshSnapshot, SourceStatus,
    Statistics, StatsPeriod, SystemSummary, TalkgroupActivity,
};
use crate::stream::{FeedEvents, FeedStream};

const EVENT_CHANNEL_SIZE: usize = 256;

// ── ConnectionState ──────────────────────────────────────────────

/// Lifecycle state observable by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// The last refresh failed; background tasks keep retrying.
    Unavailable { reason: String },
    Failed,
}

// ── Coordinator ──────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`. Create one per scanner
/// back end and pass it to whoever needs the feed.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    config: FeedConfig,
    source: Arc<dyn CallSource>,
    store: FeedStore,
    connection_state: watch::Sender<ConnectionState>,
    event_tx: broadcast::Sender<FeedEvent>,
    refresh_requested: Notify,
    cancel: CancellationToken,
    /// Token for the current connection. Cancelled on disconnect and
    /// replaced on the next connect.
    cancel_child: Mutex<CancellationToken>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Coordinator {
    /// Create a coordinator for the configured source. Does NOT fetch
    /// anything; call [`connect()`](Self::connect) to start.
    pub fn new(config: FeedConfig) -> Result<Self, CoreError> {
        let source = connect_source(&config)?;
        Ok(Self::with_source(config, source))
    }

    /// Create a coordinator over an already-built source.
    pub fn with_source(config: FeedConfig, source: Arc<dyn CallSource>) -> Self {
        let store = FeedStore::new(config.history_capacity);
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Self {
            inner: Arc::new(CoordinatorInner {
                config,
                source,
                store,
                connection_state,
                event_tx,
                refresh_requested: Notify::new(),
                cancel,
                cancel_child: Mutex::new(cancel_child),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &FeedStore {
        &self.inner.store
    }

    pub fn source_name(&self) -> &'static str {
        self.inner.source.name()
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Perform the initial refresh and spawn background tasks (periodic
    /// refresh and, when the source offers one, the push channel).
    ///
    /// If the initial refresh fails the error is returned, but the
    /// background tasks still run. The state stays `Unavailable` until a
    /// later refresh succeeds.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let _ = self
            .inner
            .connection_state
            .send(ConnectionState::Connecting);

        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        let initial = self.refresh().await;

        let mut handles = self.inner.task_handles.lock().await;

        let interval = self.inner.config.poll_interval;
        if !interval.is_zero() {
            let coordinator = self.clone();
            let cancel = child.clone();
            handles.push(tokio::spawn(refresh_task(coordinator, interval, cancel)));
        }

        if self.inner.config.push_enabled() {
            if let Some(url) = self.inner.source.push_endpoint() {
                let coordinator = self.clone();
                let cancel = child.clone();
                handles.push(tokio::spawn(push_task(coordinator, url, cancel)));
            }
        }
        let retrying = !handles.is_empty();
        drop(handles);

        if let Err(e) = initial {
            let state = if retrying {
                ConnectionState::Unavailable {
                    reason: e.to_string(),
                }
            } else {
                ConnectionState::Failed
            };
            warn!(error = %e, retrying, "initial refresh failed");
            let _ = self.inner.connection_state.send(state);
            return Err(e);
        }

        let _ = self.inner.connection_state.send(ConnectionState::Connected);
        info!(
            source = self.inner.source.name(),
            location = %self.inner.config.source.location(),
            "call feed connected"
        );
        Ok(())
    }

    /// Cancel background tasks, close the source and discard the feed state.
    pub async fn disconnect(&self) {
        self.inner.cancel_child.lock().await.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        self.inner.source.close().await;
        self.inner.store.reset();
        let _ = self
            .inner
            .connection_state
            .send(ConnectionState::Disconnected);
        debug!("disconnected");
    }

    /// One-shot: connect, run closure, disconnect.
    ///
    /// Disables the push channel and periodic refresh since the caller
    /// only needs a single snapshot.
    pub async fn oneshot<F, Fut, T>(config: FeedConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Coordinator) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.poll_interval = Duration::ZERO;
        if let SourceConfig::TrunkRecorder { ref mut push, .. } = cfg.source {
            *push = false;
        }

        let coordinator = Coordinator::new(cfg)?;
        if let Err(e) = coordinator.connect().await {
            coordinator.disconnect().await;
            return Err(e);
        }
        let result = f(coordinator.clone()).await;
        coordinator.disconnect().await;
        result
    }

    // ── Refresh ──────────────────────────────────────────────────

    /// Fetch everything from the source and replace the feed state.
    ///
    /// On failure the state is left untouched and the status becomes
    /// unavailable.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        match self.fetch_snapshot().await {
            Ok(snapshot) => {
                self.inner.store.apply_refresh(snapshot, Utc::now());
                self.inner.connection_state.send_if_modified(|state| {
                    if matches!(state, ConnectionState::Unavailable { .. }) {
                        *state = ConnectionState::Connected;
                        true
                    } else {
                        false
                    }
                });
                Ok(())
            }
            Err(e) => {
                let reason = e.to_string();
                self.inner
                    .store
                    .set_status(SourceStatus::Unavailable(reason.clone()));
                self.inner.connection_state.send_if_modified(|state| {
                    if matches!(state, ConnectionState::Connected) {
                        *state = ConnectionState::Unavailable { reason };
                        true
                    } else {
                        false
                    }
                });
                Err(into_unavailable(e))
            }
        }
    }

    /// Ask the refresh task for an early refresh. Multiple requests
    /// before the task wakes are coalesced.
    pub fn request_refresh(&self) {
        self.inner.refresh_requested.notify_one();
    }

    async fn fetch_snapshot(&self) -> Result<RefreshSnapshot, CoreError> {
        let source = &self.inner.source;
        let capacity = self.inner.config.history_capacity;

        let systems = source.fetch_systems().await?;
        let talkgroup_lists = try_join_all(
            systems
                .iter()
                .map(|system| source.fetch_talkgroups(&system.id)),
        )
        .await?;
        let talkgroups: IndexMap<String, Vec<_>> = systems
            .iter()
            .map(|s| s.id.clone())
            .zip(talkgroup_lists)
            .collect();

        let (active_calls, history) = match source.activity() {
            Activity::ExplicitEnd => {
                let (active, mut history) = tokio::try_join!(
                    source.fetch_active_calls(),
                    source.fetch_recent_calls(capacity),
                )?;
                // A call still reported active is not history yet.
                history.retain(|h| !active.iter().any(|a| a.id == h.id));
                (active, history)
            }
            Activity::RecencyWindow(window) => {
                let history = source.fetch_recent_calls(capacity).await?;
                let window = TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX);
                let now = Utc::now();
                let active = history
                    .iter()
                    .filter(|c| c.started_within(window, now))
                    .cloned()
                    .collect();
                (active, history)
            }
        };

        Ok(RefreshSnapshot {
            systems,
            talkgroups,
            active_calls,
            history,
        })
    }

    // ── Call lifecycle ───────────────────────────────────────────

    /// Record a started call and broadcast it.
    pub fn on_call_start(&self, call: Call) {
        self.inner.store.start_call(call.clone());
        let _ = self.inner.event_tx.send(FeedEvent::CallStarted(call));
    }

    /// Merge changed fields into an active call. Returns `false` when the
    /// call is not active; nothing changes in that case.
    pub fn on_call_update(&self, update: &CallUpdate) -> bool {
        let applied = self.inner.store.update_call(update);
        if !applied {
            debug!(call_id = %update.id, "update for inactive call ignored");
        }
        applied
    }

    /// Finish an active call, move it to history and broadcast it.
    /// Unknown ids are ignored.
    pub fn on_call_end(&self, call_id: &str) -> Option<Call> {
        self.end_call(call_id, None)
    }

    fn end_call(&self, call_id: &str, ended_at: Option<DateTime<Utc>>) -> Option<Call> {
        let Some(call) = self.inner.store.end_call(call_id, ended_at, Utc::now()) else {
            debug!(call_id, "end for inactive call ignored");
            return None;
        };
        let _ = self.inner.event_tx.send(FeedEvent::CallEnded(call.clone()));
        Some(call)
    }

    /// Apply one push message and request a refresh.
    pub fn handle_push(&self, message: &PushMessage) {
        match message {
            PushMessage::CallStart { call } => {
                self.on_call_start(Call::from_api(call.clone(), Utc::now()));
            }
            PushMessage::CallUpdate { call } => {
                self.on_call_update(&CallUpdate::from(call.clone()));
            }
            PushMessage::CallEnd { call, .. } => {
                let Some(call_id) = message.call_id() else {
                    debug!("call_end without an id");
                    return;
                };
                let update = call.clone().map(CallUpdate::from);
                if let Some(ref update) = update {
                    self.inner.store.update_call(update);
                }
                self.end_call(call_id, update.and_then(|u| u.end_time));
            }
        }
        self.request_refresh();
    }

    // ── Reads ────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Arc<FeedState> {
        self.inner.store.snapshot()
    }

    pub fn query_calls(&self, query: &CallQuery) -> Vec<Call> {
        self.snapshot().query_calls(query)
    }

    pub fn query_history(&self, query: &HistoryQuery) -> HistoryPage {
        self.snapshot().query_history(query)
    }

    pub fn compute_statistics(&self, period: StatsPeriod, system_id: Option<&str>) -> Statistics {
        self.snapshot().statistics(period, system_id)
    }

    /// Active call first, then history.
    pub fn find_call(&self, call_id: &str) -> Option<Call> {
        self.snapshot().find_call(call_id).cloned()
    }

    pub async fn audio(&self, call_id: &str) -> Result<Option<AudioClip>, CoreError> {
        match self.inner.source.fetch_audio(call_id).await {
            Err(e) if e.is_not_found() => Ok(None),
            other => other,
        }
    }

    pub fn audio_url(&self, call_id: &str) -> Option<Url> {
        self.inner.source.audio_url(call_id)
    }

    pub fn system_summaries(&self) -> Vec<SystemSummary> {
        self.snapshot().system_summaries()
    }

    pub fn talkgroup_activity(&self, system_id: Option<&str>) -> Vec<TalkgroupActivity> {
        self.snapshot().talkgroup_activity(system_id)
    }

    pub fn active_call_count(&self) -> usize {
        self.snapshot().active_call_count()
    }

    pub fn total_call_count(&self) -> usize {
        self.snapshot().total_call_count()
    }

    // ── State observation ────────────────────────────────────────

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    /// Subscribe to call events (unfiltered until a filter is set).
    pub fn events(&self) -> FeedEvents {
        FeedEvents::new(self.inner.event_tx.subscribe())
    }

    pub fn subscribe(&self) -> FeedStream {
        self.inner.store.subscribe()
    }
}

fn into_unavailable(err: CoreError) -> CoreError {
    match err {
        CoreError::SourceUnavailable { .. } | CoreError::Timeout { .. } => err,
        other => CoreError::SourceUnavailable {
            reason: other.to_string(),
        },
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Refresh on a fixed interval and whenever an early refresh is requested.
async fn refresh_task(coordinator: Coordinator, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
            () = coordinator.inner.refresh_requested.notified() => {}
        }
        if let Err(e) = coordinator.refresh().await {
            warn!(error = %e, "periodic refresh failed");
        }
    }
}

/// Consume push messages until cancelled or the channel gives up.
async fn push_task(coordinator: Coordinator, url: Url, cancel: CancellationToken) {
    let reconnect = ReconnectConfig {
        delay: coordinator.inner.config.push_retry_delay,
        max_retries: coordinator.inner.config.push_max_retries,
    };
    let handle = PushHandle::connect(url, reconnect, cancel.child_token());
    let mut rx = handle.subscribe();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            message = rx.recv() => match message {
                Ok(message) => coordinator.handle_push(&message),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "push consumer lagged, refreshing");
                    coordinator.request_refresh();
                }
                Err(broadcast::error::RecvError::Closed) => {
                    warn!("push channel closed, relying on polling");
                    break;
                }
            },
        }
    }

    handle.shutdown();
}
