// ── Feed state store ──
//
// The feed state lives in a `watch` channel. Every mutation is one
// `send_modify` closure, so readers never observe a half-applied change
// and subscribers are woken once per mutation.

mod feed_store;
mod query;
mod refresh;
mod state;
mod statistics;

pub use feed_store::FeedStore;
pub use query::{CallQuery, HistoryPage, HistoryQuery, SystemSummary, TalkgroupActivity};
pub use refresh::RefreshSnapshot;
pub use state::{FeedState, SourceStatus};
pub use statistics::{Statistics, StatsPeriod, TalkgroupCount};
