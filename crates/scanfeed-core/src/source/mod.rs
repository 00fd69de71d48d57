// ── Call source adapters ──
//
// A `CallSource` hides which scanner back end the feed reads from. The
// coordinator only ever talks to `Arc<dyn CallSource>`.

mod cache;
mod rdio;
mod trunk;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::config::{FeedConfig, SourceConfig};
use crate::error::CoreError;
use crate::model::{AudioClip, Call, System, Talkgroup};

pub use cache::{AudioCache, CachedSource, DEFAULT_CACHE_ENTRIES, DEFAULT_MAX_CLIP_BYTES};
pub use rdio::RdioSource;
pub use trunk::TrunkSource;

/// Calls without an explicit end are active this long after they start.
pub const RECENCY_WINDOW: Duration = Duration::from_secs(30);

/// How a source signals that a call is still in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    /// The source reports active calls and their end explicitly.
    ExplicitEnd,
    /// Only finished recordings are visible; a call counts as active for
    /// this long after it started.
    RecencyWindow(Duration),
}

/// Uniform read access to a scanner back end.
#[async_trait]
pub trait CallSource: Send + Sync {
    /// Short name for logs (`trunk-recorder`, `rdio-scanner`).
    fn name(&self) -> &'static str;

    fn activity(&self) -> Activity;

    async fn fetch_systems(&self) -> Result<Vec<System>, CoreError>;

    async fn fetch_talkgroups(&self, system_id: &str) -> Result<Vec<Talkgroup>, CoreError>;

    async fn fetch_active_calls(&self) -> Result<Vec<Call>, CoreError>;

    /// Most recent calls, newest first, at most `limit`.
    async fn fetch_recent_calls(&self, limit: usize) -> Result<Vec<Call>, CoreError>;

    /// Recording for a call, or `None` if the source has none.
    async fn fetch_audio(&self, call_id: &str) -> Result<Option<AudioClip>, CoreError>;

    /// WebSocket endpoint delivering call lifecycle messages, if any.
    fn push_endpoint(&self) -> Option<Url> {
        None
    }

    /// Direct URL to a call's recording, if the source serves one.
    fn audio_url(&self, _call_id: &str) -> Option<Url> {
        None
    }

    /// Release connections held by the source.
    async fn close(&self) {}
}

/// Build the source described by `config`, wrapped in an audio cache
/// when enabled.
pub fn connect_source(config: &FeedConfig) -> Result<Arc<dyn CallSource>, CoreError> {
    let source: Arc<dyn CallSource> = match &config.source {
        SourceConfig::TrunkRecorder { url, api_key, .. } => {
            let transport = scanfeed_api::TransportConfig {
                timeout: config.timeout,
                api_key: api_key.clone(),
            };
            Arc::new(TrunkSource::new(url.clone(), &transport)?)
        }
        SourceConfig::RdioScanner { database } => Arc::new(RdioSource::new(database)),
    };

    if config.audio_cache {
        Ok(Arc::new(CachedSource::new(source)))
    } else {
        Ok(source)
    }
}
