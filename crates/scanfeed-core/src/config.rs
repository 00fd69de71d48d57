// ── Runtime feed configuration ──
//
// These types describe *where* calls come from and how the feed behaves.
// They carry credentials and tuning but never touch disk; the config
// crate or the CLI builds a `FeedConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// Default Trunk Recorder API port.
pub const DEFAULT_TRUNK_PORT: u16 = 3000;

/// Default Rdio Scanner data directory.
pub const DEFAULT_RDIO_DATA_DIR: &str = "/opt/rdio-scanner/data";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Which back end the feed reads from.
#[derive(Debug, Clone)]
pub enum SourceConfig {
    /// Trunk Recorder HTTP API with optional WebSocket push.
    TrunkRecorder {
        url: Url,
        api_key: Option<SecretString>,
        push: bool,
    },
    /// Rdio Scanner SQLite database file.
    RdioScanner { database: PathBuf },
}

impl SourceConfig {
    /// Short label for logs and sensor names.
    pub fn label(&self) -> &'static str {
        match self {
            Self::TrunkRecorder { .. } => "trunk-recorder",
            Self::RdioScanner { .. } => "rdio-scanner",
        }
    }

    /// Where the source lives, for display.
    pub fn location(&self) -> String {
        match self {
            Self::TrunkRecorder { url, .. } => url.to_string(),
            Self::RdioScanner { database } => database.display().to_string(),
        }
    }
}

/// Configuration for a [`Coordinator`](crate::Coordinator).
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub source: SourceConfig,
    /// Interval between background refreshes. Zero disables the refresh task.
    pub poll_interval: Duration,
    /// Maximum number of calls kept in history.
    pub history_capacity: usize,
    /// Per-request timeout for network sources.
    pub timeout: Duration,
    /// Wrap the source in a bounded audio cache.
    pub audio_cache: bool,
    /// Delay between push channel reconnection attempts.
    pub push_retry_delay: Duration,
    /// Give up on the push channel after this many failed attempts.
    pub push_max_retries: Option<u32>,
}

impl FeedConfig {
    pub fn new(source: SourceConfig) -> Self {
        Self {
            source,
            poll_interval: DEFAULT_POLL_INTERVAL,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            timeout: DEFAULT_TIMEOUT,
            audio_cache: true,
            push_retry_delay: Duration::from_secs(10),
            push_max_retries: None,
        }
    }

    /// Whether the push channel should be used, if the source has one.
    pub fn push_enabled(&self) -> bool {
        matches!(self.source, SourceConfig::TrunkRecorder { push: true, .. })
    }
}
