// ── Reactive feed streams ──
//
// Subscription types for consuming feed state changes and call events.

mod filter;

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::WatchStream;
use tracing::warn;

use crate::model::FeedEvent;
use crate::store::FeedState;

pub use filter::CallFilter;

// ── FeedStream ───────────────────────────────────────────────────────

/// A subscription to the feed state.
///
/// Provides both point-in-time snapshot access and change notification
/// via [`changed`](Self::changed) or by converting to a `Stream`.
pub struct FeedStream {
    current: Arc<FeedState>,
    receiver: watch::Receiver<Arc<FeedState>>,
}

impl FeedStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<FeedState>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Snapshot captured at creation or at the last `changed()`.
    pub fn current(&self) -> &Arc<FeedState> {
        &self.current
    }

    pub fn latest(&self) -> Arc<FeedState> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change. Returns `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<Arc<FeedState>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    pub fn into_stream(self) -> FeedWatchStream {
        FeedWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter yielding a snapshot per state change.
pub struct FeedWatchStream {
    inner: WatchStream<Arc<FeedState>>,
}

impl Stream for FeedWatchStream {
    type Item = Arc<FeedState>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

// ── FeedEvents ───────────────────────────────────────────────────────

/// Call event subscription with a per-subscriber notification filter.
pub struct FeedEvents {
    receiver: broadcast::Receiver<FeedEvent>,
    filter: CallFilter,
}

impl FeedEvents {
    pub(crate) fn new(receiver: broadcast::Receiver<FeedEvent>) -> Self {
        Self {
            receiver,
            filter: CallFilter::default(),
        }
    }

    pub fn filter(&self) -> &CallFilter {
        &self.filter
    }

    /// Replace this subscriber's filter.
    pub fn set_filter(&mut self, filter: CallFilter) {
        self.filter = filter;
    }

    pub fn with_filter(mut self, filter: CallFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Next event passing the filter. Returns `None` once the
    /// coordinator is gone. Lagged events are skipped with a warning.
    pub async fn recv(&mut self) -> Option<FeedEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(event.call()) => return Some(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::model::Call;
    use chrono::Utc;

    #[tokio::test]
    async fn events_respect_filter() {
        let (tx, rx) = broadcast::channel(8);
        let mut events = FeedEvents::new(rx).with_filter(CallFilter::for_system("county"));

        tx.send(FeedEvent::CallStarted(Call::new("a", "metro", "101", Utc::now())))
            .unwrap();
        tx.send(FeedEvent::CallStarted(Call::new("b", "county", "201", Utc::now())))
            .unwrap();
        drop(tx);

        let event = events.recv().await.unwrap();
        assert_eq!(event.call().id, "b");
        assert!(events.recv().await.is_none());
    }

    #[tokio::test]
    async fn disabled_notifications_drop_everything() {
        let (tx, rx) = broadcast::channel(8);
        let filter = CallFilter {
            notifications_enabled: false,
            ..CallFilter::default()
        };
        let mut events = FeedEvents::new(rx).with_filter(filter);

        tx.send(FeedEvent::CallEnded(Call::new("a", "metro", "101", Utc::now())))
            .unwrap();
        drop(tx);
        assert!(events.recv().await.is_none());
    }
}
