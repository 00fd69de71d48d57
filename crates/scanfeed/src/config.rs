//! CLI configuration: thin wrapper around `scanfeed_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--host, --database, --api-key, --timeout).

use std::time::Duration;

use secrecy::SecretString;

use scanfeed_config::SourceKind;
use scanfeed_core::{FeedConfig, SourceConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use scanfeed_config::{Config, Defaults, Profile, config_path, load_config, save_config};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Comma-separated profile names, sorted.
pub fn available_profiles(config: &Config) -> String {
    let mut names: Vec<_> = config.profiles.keys().map(String::as_str).collect();
    names.sort_unstable();
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}

/// Build a `FeedConfig` from the config file, profile, and CLI overrides.
///
/// `--host` or `--database` describe a source on their own and take
/// priority over any profile.
pub fn build_feed_config(global: &GlobalOpts) -> Result<FeedConfig, CliError> {
    let cfg = load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    let profile = if let Some(ref host) = global.host {
        let mut p = Profile::new(SourceKind::TrunkRecorder);
        p.host = Some(host.clone());
        p
    } else if let Some(ref database) = global.database {
        let mut p = Profile::new(SourceKind::RdioScanner);
        p.path = database.parent().map(std::path::Path::to_path_buf);
        p.database = database.file_name().map(|f| f.to_string_lossy().into_owned());
        p
    } else if let Some(p) = cfg.profiles.get(&profile_name) {
        p.clone()
    } else if global.profile.is_some() || !cfg.profiles.is_empty() {
        return Err(CliError::ProfileNotFound {
            name: profile_name,
            available: available_profiles(&cfg),
        });
    } else {
        return Err(CliError::NoConfig {
            path: config_path().display().to_string(),
        });
    };

    resolve_profile(profile, &profile_name, &cfg.defaults, global)
}

/// Translate a `Profile` + global flags into a `FeedConfig`.
///
/// CLI flag overrides take priority over profile values.
pub fn resolve_profile(
    mut profile: Profile,
    profile_name: &str,
    defaults: &Defaults,
    global: &GlobalOpts,
) -> Result<FeedConfig, CliError> {
    if global.port.is_some() {
        profile.port = global.port;
    }

    let mut feed = scanfeed_config::profile_to_feed_config(&profile, profile_name, defaults)?;

    if let Some(ref key) = global.api_key {
        if let SourceConfig::TrunkRecorder {
            ref mut api_key, ..
        } = feed.source
        {
            *api_key = Some(SecretString::from(key.clone()));
        }
    }

    if let Some(secs) = global.timeout {
        feed.timeout = Duration::from_secs(secs);
    }

    tracing::debug!(
        profile = profile_name,
        source = feed.source.label(),
        location = %feed.source.location(),
        "resolved feed config"
    );
    Ok(feed)
}
