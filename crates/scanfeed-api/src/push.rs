//! Trunk Recorder push channel with auto-reconnect.
//!
//! Connects to the server's `/ws` endpoint and streams parsed call
//! lifecycle messages through a [`tokio::sync::broadcast`] channel.
//! Reconnects after a fixed delay, forever unless `max_retries` is set.
//!
//! # Example
//!
//! ```rust,ignore
//! use scanfeed_api::push::{PushHandle, ReconnectConfig};
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! let cancel = CancellationToken::new();
//! let ws_url = Url::parse("ws://scanner:3000/ws")?;
//!
//! let handle = PushHandle::connect(ws_url, ReconnectConfig::default(), cancel.clone());
//! let mut rx = handle.subscribe();
//!
//! while let Ok(msg) = rx.recv().await {
//!     println!("{:?} {}", msg.kind(), msg.call_id().unwrap_or("?"));
//! }
//!
//! handle.shutdown();
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::trunk::models::{ApiCall, ApiCallPatch, opt_string_or_number};

// ── Broadcast channel capacity ───────────────────────────────────────

const MESSAGE_CHANNEL_CAPACITY: usize = 1024;

// ── PushMessage ──────────────────────────────────────────────────────

/// A call lifecycle message from the push channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushMessage {
    /// A new transmission began.
    CallStart { call: ApiCall },

    /// Fields of an in-progress call changed.
    CallUpdate { call: ApiCallPatch },

    /// A transmission finished. Servers send either `call_id` or a
    /// (possibly partial) `call` object carrying the id.
    CallEnd {
        #[serde(default, deserialize_with = "opt_string_or_number")]
        call_id: Option<String>,
        #[serde(default)]
        call: Option<ApiCallPatch>,
    },
}

/// Discriminant of a [`PushMessage`], for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushKind {
    CallStart,
    CallUpdate,
    CallEnd,
}

impl PushMessage {
    pub fn kind(&self) -> PushKind {
        match self {
            Self::CallStart { .. } => PushKind::CallStart,
            Self::CallUpdate { .. } => PushKind::CallUpdate,
            Self::CallEnd { .. } => PushKind::CallEnd,
        }
    }

    /// The id of the call this message refers to.
    pub fn call_id(&self) -> Option<&str> {
        match self {
            Self::CallStart { call } => Some(&call.id),
            Self::CallUpdate { call } => Some(&call.id),
            Self::CallEnd { call_id, call } => call_id
                .as_deref()
                .or_else(|| call.as_ref().map(|c| c.id.as_str())),
        }
    }
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Fixed-delay reconnection policy for the push channel.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay between a failed connection and the next attempt. Default: 10s.
    pub delay: Duration,

    /// Maximum consecutive failed attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(10),
            max_retries: None,
        }
    }
}

// ── PushHandle ───────────────────────────────────────────────────────

/// Handle to a running push channel.
///
/// Call [`shutdown`](Self::shutdown) (or cancel the token passed to
/// [`connect`](Self::connect)) to tear down the background task; the
/// socket is closed when the task exits.
pub struct PushHandle {
    message_rx: broadcast::Receiver<Arc<PushMessage>>,
    cancel: CancellationToken,
}

impl PushHandle {
    /// Spawn the reconnection loop for `ws_url`.
    ///
    /// Returns immediately. The first connection attempt happens
    /// asynchronously; subscribe to start consuming messages.
    pub fn connect(ws_url: Url, reconnect: ReconnectConfig, cancel: CancellationToken) -> Self {
        let (message_tx, message_rx) = broadcast::channel(MESSAGE_CHANNEL_CAPACITY);

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            push_loop(ws_url, message_tx, reconnect, task_cancel).await;
        });

        Self { message_rx, cancel }
    }

    /// Get a new broadcast receiver for the message stream.
    ///
    /// If a consumer falls behind, it receives
    /// [`broadcast::error::RecvError::Lagged`].
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<PushMessage>> {
        self.message_rx.resubscribe()
    }

    /// Signal the background task to shut down.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → read → wait → reconnect.
///
/// Every reconnect waits `reconnect.delay`. A connection that closes
/// before delivering any frame counts as a failed attempt.
async fn push_loop(
    ws_url: Url,
    message_tx: broadcast::Sender<Arc<PushMessage>>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect_and_read(&ws_url, &message_tx, &cancel) => result,
        };
        if cancel.is_cancelled() {
            break;
        }

        let failed = match result {
            Ok(0) => {
                tracing::warn!(attempt, "push channel closed before delivering any frame");
                true
            }
            Ok(frames) => {
                tracing::info!(frames, "push channel closed, reconnecting");
                attempt = 0;
                false
            }
            Err(e) => {
                tracing::error!(error = %e, attempt, "push channel error");
                true
            }
        };

        if failed {
            if let Some(max) = reconnect.max_retries {
                if attempt >= max {
                    tracing::error!(
                        max_retries = max,
                        "push channel reconnection limit reached, giving up"
                    );
                    break;
                }
            }
        }

        tracing::info!(
            delay_secs = reconnect.delay.as_secs(),
            attempt,
            "waiting before reconnect"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(reconnect.delay) => {}
        }

        if failed {
            attempt = attempt.saturating_add(1);
        }
    }

    tracing::debug!("push loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish one WebSocket connection and read messages until it drops.
/// Returns the number of frames received before a clean close.
/// The stream is dropped (and the socket closed) on every return path.
async fn connect_and_read(
    url: &Url,
    message_tx: &broadcast::Sender<Arc<PushMessage>>,
    cancel: &CancellationToken,
) -> Result<usize, Error> {
    tracing::info!(url = %url, "connecting to push channel");

    let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    tracing::info!("push channel connected");

    let (_write, mut read) = ws_stream.split();
    let mut frames: usize = 0;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(frames),
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        frames += 1;
                        parse_and_broadcast(&text, message_tx);
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            tracing::info!(
                                code = %cf.code,
                                reason = %cf.reason,
                                "push channel close frame received"
                            );
                        }
                        return Ok(frames);
                    }
                    Some(Err(e)) => {
                        return Err(Error::WebSocketConnect(e.to_string()));
                    }
                    None => {
                        tracing::info!("push channel stream ended");
                        return Ok(frames);
                    }
                    // Ping/Pong/Binary: tungstenite answers pings itself
                    Some(Ok(_)) => frames += 1,
                }
            }
        }
    }
}

// ── Message parsing ──────────────────────────────────────────────────

/// Parse one text frame. Unknown types and malformed payloads yield `None`.
pub fn parse_message(text: &str) -> Option<PushMessage> {
    match serde_json::from_str::<PushMessage>(text) {
        Ok(msg) => Some(msg),
        Err(e) => {
            tracing::debug!(error = %e, "ignoring unparseable push message");
            None
        }
    }
}

fn parse_and_broadcast(text: &str, message_tx: &broadcast::Sender<Arc<PushMessage>>) {
    if let Some(msg) = parse_message(text) {
        // No subscribers right now is fine
        let _ = message_tx.send(Arc::new(msg));
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_reconnect_is_fixed_ten_seconds_forever() {
        let config = ReconnectConfig::default();
        assert_eq!(config.delay, Duration::from_secs(10));
        assert!(config.max_retries.is_none());
    }

    #[test]
    fn parses_call_start() {
        let raw = json!({
            "type": "call_start",
            "call": {"id": "c1", "system": "metro", "talkgroup": "101", "talkgroup_name": "Dispatch"}
        });
        let msg = parse_message(&raw.to_string()).unwrap();
        assert_eq!(msg.kind(), PushKind::CallStart);
        assert_eq!(msg.call_id(), Some("c1"));
    }

    #[test]
    fn parses_call_end_by_id_or_object() {
        let by_id = parse_message(&json!({"type": "call_end", "call_id": 42}).to_string()).unwrap();
        assert_eq!(by_id.call_id(), Some("42"));

        let by_obj =
            parse_message(&json!({"type": "call_end", "call": {"id": "c9"}}).to_string()).unwrap();
        assert_eq!(by_obj.call_id(), Some("c9"));
    }

    #[test]
    fn parses_partial_update() {
        let raw = json!({"type": "call_update", "call": {"id": "c1", "emergency": true}});
        let msg = parse_message(&raw.to_string()).unwrap();
        match msg {
            PushMessage::CallUpdate { call } => {
                assert_eq!(call.emergency, Some(true));
                assert!(call.talkgroup_name.is_none());
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn unknown_type_and_garbage_are_skipped() {
        assert!(parse_message(r#"{"type": "rates", "data": {}}"#).is_none());
        assert!(parse_message("not json at all").is_none());
    }

    #[test]
    fn parse_and_broadcast_delivers_to_subscribers() {
        let (tx, mut rx) = broadcast::channel(16);
        parse_and_broadcast(r#"{"type": "call_end", "call_id": "x"}"#, &tx);
        let msg = rx.try_recv().unwrap();
        assert_eq!(msg.call_id(), Some("x"));
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let (tx, _rx) = broadcast::channel(4);
        let cancel = CancellationToken::new();
        let config = ReconnectConfig {
            delay: Duration::from_millis(10),
            max_retries: Some(1),
        };
        // Port 9 on localhost refuses connections; the loop must terminate.
        let url = Url::parse("ws://127.0.0.1:9/ws").unwrap();
        tokio::time::timeout(Duration::from_secs(10), push_loop(url, tx, config, cancel))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn empty_connections_wait_between_attempts() {
        use std::sync::Mutex;
        use std::time::Instant;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(Mutex::new(Vec::new()));

        // Accept the upgrade, then close straight away.
        let seen = accepted.clone();
        let server = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                seen.lock().unwrap().push(Instant::now());
                if let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await {
                    let _ = ws.close(None).await;
                }
            }
        });

        let delay = Duration::from_millis(200);
        let (tx, _rx) = broadcast::channel(4);
        let config = ReconnectConfig {
            delay,
            max_retries: Some(2),
        };
        let url = Url::parse(&format!("ws://{addr}/ws")).unwrap();
        tokio::time::timeout(
            Duration::from_secs(10),
            push_loop(url, tx, config, CancellationToken::new()),
        )
        .await
        .unwrap();
        server.abort();

        let accepted = accepted.lock().unwrap();
        assert_eq!(accepted.len(), 3);
        for pair in accepted.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= delay);
        }
    }
}
