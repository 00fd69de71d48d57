//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use scanfeed_config::ConfigError;
use scanfeed_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Call source is unavailable: {reason}")]
    #[diagnostic(
        code(scanfeed::source_unavailable),
        help(
            "Check that Trunk Recorder is running and reachable, or that the\n\
             Rdio Scanner database path is correct.\n\
             Try: scanfeed config show"
        )
    )]
    SourceUnavailable { reason: String },

    #[error("Call feed was disconnected")]
    #[diagnostic(code(scanfeed::disconnected))]
    Disconnected,

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(scanfeed::not_found),
        help("Run: scanfeed {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Malformed record: {reason}")]
    #[diagnostic(code(scanfeed::malformed))]
    Malformed { reason: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(scanfeed::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(scanfeed::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: scanfeed config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No call source configured")]
    #[diagnostic(
        code(scanfeed::no_config),
        help(
            "Create a profile with: scanfeed config init\n\
             Or pass --host <trunk-recorder> / --database <rdio-scanner.db>.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(scanfeed::config))]
    Config { message: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(scanfeed::timeout),
        help("Increase timeout with --timeout or check that the source is responsive.")
    )]
    Timeout { seconds: u64 },

    // ── Internal / IO ────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    #[diagnostic(code(scanfeed::internal))]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::SourceUnavailable { .. } | Self::Disconnected => exit_code::CONNECTION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::ProfileNotFound { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::SourceUnavailable { reason } => Self::SourceUnavailable { reason },
            CoreError::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },
            CoreError::Disconnected => Self::Disconnected,
            CoreError::MalformedRecord { reason } => Self::Malformed { reason },
            CoreError::NotFound {
                entity_type,
                identifier,
            } => Self::NotFound {
                list_command: list_command_for(&entity_type).into(),
                resource_type: entity_type,
                identifier,
            },
            CoreError::Config { message } => Self::Config { message },
            CoreError::Internal(message) => Self::Internal(message),
        }
    }
}

fn list_command_for(entity_type: &str) -> &'static str {
    match entity_type {
        "system" => "systems",
        "talkgroup" => "talkgroups",
        _ => "calls",
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::UnknownProfile { name } => Self::ProfileNotFound {
                name,
                available: String::new(),
            },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        let unavailable: CliError = CoreError::SourceUnavailable {
            reason: "connection refused".into(),
        }
        .into();
        assert_eq!(unavailable.exit_code(), exit_code::CONNECTION);

        let timeout: CliError = CoreError::Timeout { timeout_secs: 10 }.into();
        assert_eq!(timeout.exit_code(), exit_code::TIMEOUT);

        let missing: CliError = CoreError::NotFound {
            entity_type: "call".into(),
            identifier: "42".into(),
        }
        .into();
        assert_eq!(missing.exit_code(), exit_code::NOT_FOUND);

        let usage: CliError = ConfigError::UnknownProfile { name: "x".into() }.into();
        assert_eq!(usage.exit_code(), exit_code::USAGE);

        let general: CliError = CoreError::Internal("boom".into()).into();
        assert_eq!(general.exit_code(), exit_code::GENERAL);
    }
}
