// ── Core error types ──
//
// Feed-level errors from scanfeed-core. Consumers never see HTTP status
// codes or SQLite error codes directly; the `From<scanfeed_api::Error>`
// impl folds transport failures into these kinds.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Source errors ────────────────────────────────────────────────
    #[error("Call source unavailable: {reason}")]
    SourceUnavailable { reason: String },

    #[error("Call source timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Call feed is disconnected")]
    Disconnected,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Malformed record: {reason}")]
    MalformedRecord { reason: String },

    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// The source could not be reached or did not answer in time.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::SourceUnavailable { .. } | Self::Timeout { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<scanfeed_api::Error> for CoreError {
    fn from(err: scanfeed_api::Error) -> Self {
        use scanfeed_api::Error as ApiError;

        if err.is_not_found() {
            let identifier = match &err {
                ApiError::Http { url, .. } => url.clone(),
                ApiError::Transport(e) => e.url().map(ToString::to_string).unwrap_or_default(),
                _ => String::new(),
            };
            return CoreError::NotFound {
                entity_type: "resource".into(),
                identifier,
            };
        }

        match err {
            ApiError::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            ApiError::Transport(e) => CoreError::SourceUnavailable {
                reason: e.to_string(),
            },
            ApiError::Http { status, url } => CoreError::SourceUnavailable {
                reason: format!("HTTP {status} from {url}"),
            },
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid source URL: {e}"),
            },
            ApiError::Database(e) => CoreError::SourceUnavailable {
                reason: format!("database error: {e}"),
            },
            ApiError::DatabaseClosed => CoreError::Disconnected,
            ApiError::WebSocketConnect(reason) => CoreError::SourceUnavailable {
                reason: format!("push channel: {reason}"),
            },
            ApiError::Deserialization { message, body: _ } => {
                CoreError::MalformedRecord { reason: message }
            }
        }
    }
}
