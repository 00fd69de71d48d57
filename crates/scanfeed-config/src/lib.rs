//! Shared configuration for scanfeed front ends.
//!
//! TOML profiles, optional API key resolution (env + keyring + plaintext),
//! and translation to `scanfeed_core::FeedConfig`. The CLI layers its
//! `GlobalOpts` overrides on top of what this crate produces.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use scanfeed_core::config::{DEFAULT_RDIO_DATA_DIR, DEFAULT_TRUNK_PORT};
use scanfeed_core::{FeedConfig, SourceConfig};

/// Keyring service name for stored API keys.
pub const KEYRING_SERVICE: &str = "scanfeed";

/// Default Rdio Scanner database file inside the data directory.
pub const DEFAULT_DATABASE_FILE: &str = "rdio-scanner.db";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found in config")]
    UnknownProfile { name: String },

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named on the command line.
    pub default_profile: Option<String>,

    /// Global defaults, overridable per profile.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named source profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile by name, falling back to `default_profile`.
    pub fn profile<'a>(&'a self, name: Option<&'a str>) -> Result<(&'a str, &'a Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get(name)
            .map(|p| (name, p))
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Seconds between background refreshes.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_true")]
    pub audio_cache: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            poll_interval: default_poll_interval(),
            history_capacity: default_history_capacity(),
            timeout: default_timeout(),
            audio_cache: true,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_poll_interval() -> u64 {
    10
}
fn default_history_capacity() -> usize {
    100
}
fn default_timeout() -> u64 {
    10
}
fn default_true() -> bool {
    true
}

/// Which back end a profile points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    TrunkRecorder,
    RdioScanner,
}

/// A named source profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// `"trunk-recorder"` or `"rdio-scanner"`.
    pub source: SourceKind,

    // ── Trunk Recorder ──
    /// Host name, IP, or full base URL.
    pub host: Option<String>,

    /// API port (default 3000).
    pub port: Option<u16>,

    /// Use https/wss instead of http/ws.
    pub tls: Option<bool>,

    /// API key (plaintext, prefer keyring or env var).
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    pub api_key_env: Option<String>,

    /// Subscribe to the WebSocket push channel (default true).
    pub push: Option<bool>,

    // ── Rdio Scanner ──
    /// Data directory holding the SQLite file.
    pub path: Option<PathBuf>,

    /// Database file name inside `path`.
    pub database: Option<String>,

    // ── Overrides of [defaults] ──
    pub poll_interval: Option<u64>,
    pub history_capacity: Option<usize>,
    pub timeout: Option<u64>,
    pub audio_cache: Option<bool>,
}

impl Profile {
    /// An empty profile for the given source kind.
    pub fn new(source: SourceKind) -> Self {
        Self {
            source,
            host: None,
            port: None,
            tls: None,
            api_key: None,
            api_key_env: None,
            push: None,
            path: None,
            database: None,
            poll_interval: None,
            history_capacity: None,
            timeout: None,
            audio_cache: None,
        }
    }

    /// Base URL of a Trunk Recorder profile.
    ///
    /// A `host` that already carries a scheme is used as-is (an explicit
    /// `port` still wins); otherwise the URL is assembled from host, port
    /// and `tls`.
    pub fn trunk_url(&self) -> Result<Url, ConfigError> {
        let host = self
            .host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ConfigError::Validation {
                field: "host".into(),
                reason: "a trunk-recorder profile needs a host".into(),
            })?;

        let invalid = |raw: &str| ConfigError::Validation {
            field: "host".into(),
            reason: format!("invalid URL: {raw}"),
        };

        if host.contains("://") {
            let mut url = Url::parse(host).map_err(|_| invalid(host))?;
            if let Some(port) = self.port {
                url.set_port(Some(port)).map_err(|()| invalid(host))?;
            }
            return Ok(url);
        }

        let scheme = if self.tls.unwrap_or(false) { "https" } else { "http" };
        let port = self.port.unwrap_or(DEFAULT_TRUNK_PORT);
        let raw = format!("{scheme}://{host}:{port}");
        Url::parse(&raw).map_err(|_| invalid(&raw))
    }

    /// Full path of an Rdio Scanner database.
    pub fn database_path(&self) -> PathBuf {
        let dir = self
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RDIO_DATA_DIR));
        dir.join(self.database.as_deref().unwrap_or(DEFAULT_DATABASE_FILE))
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "scanfeed", "scanfeed").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("scanfeed");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the Config from a specific file + environment.
///
/// A missing file is not an error; the defaults and `SCANFEED_*`
/// variables still apply. Nested keys use a double underscore, e.g.
/// `SCANFEED_DEFAULTS__TIMEOUT=5`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SCANFEED_").split("__"));

    let config: Config = figment.extract()?;
    tracing::debug!(path = %path.display(), profiles = config.profiles.len(), "config loaded");
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist or is invalid.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

/// Serialize config to TOML at `path`, creating parent directories.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution (without CLI flags) ───────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/api-key"))
}

/// Resolve an optional API key from the credential chain.
///
/// Trunk Recorder runs without authentication by default, so an empty
/// chain yields `None` rather than an error.
pub fn resolve_api_key(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    // 1. Profile's api_key_env → env var lookup
    if let Some(ref env_name) = profile.api_key_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
        tracing::debug!(env = %env_name, "api_key_env is not set");
    }

    // 2. System keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    profile.api_key.clone().map(SecretString::from)
}

/// Store an API key for `profile_name` in the system keyring.
pub fn store_api_key(profile_name: &str, key: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)
        .and_then(|entry| entry.set_password(key))
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `FeedConfig` from a profile and the global defaults.
pub fn profile_to_feed_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<FeedConfig, ConfigError> {
    let source = match profile.source {
        SourceKind::TrunkRecorder => SourceConfig::TrunkRecorder {
            url: profile.trunk_url()?,
            api_key: resolve_api_key(profile, profile_name),
            push: profile.push.unwrap_or(true),
        },
        SourceKind::RdioScanner => SourceConfig::RdioScanner {
            database: profile.database_path(),
        },
    };

    let history_capacity = profile.history_capacity.unwrap_or(defaults.history_capacity);
    if history_capacity == 0 {
        return Err(ConfigError::Validation {
            field: "history_capacity".into(),
            reason: "must be at least 1".into(),
        });
    }

    let mut config = FeedConfig::new(source);
    config.poll_interval = Duration::from_secs(profile.poll_interval.unwrap_or(defaults.poll_interval));
    config.history_capacity = history_capacity;
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.audio_cache = profile.audio_cache.unwrap_or(defaults.audio_cache);
    Ok(config)
}
