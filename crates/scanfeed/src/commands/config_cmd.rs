//! Config subcommand handlers.

use std::fmt::Write as _;
use std::path::PathBuf;

use dialoguer::{Confirm, Input, Password, Select};

use scanfeed_config::{SourceKind, load_config_or_default, store_api_key};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

const REDACTED: &str = "****";

/// Copy of `cfg` with plaintext API keys masked.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.api_key.is_some() {
            profile.api_key = Some(REDACTED.into());
        }
    }
    cfg
}

fn source_name(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::TrunkRecorder => "trunk-recorder",
        SourceKind::RdioScanner => "rdio-scanner",
    }
}

/// Format config for display. Expects an already redacted config.
fn format_config(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let d = &cfg.defaults;
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", d.output);
    let _ = writeln!(out, "color = \"{}\"", d.color);
    let _ = writeln!(out, "poll_interval = {}", d.poll_interval);
    let _ = writeln!(out, "history_capacity = {}", d.history_capacity);
    let _ = writeln!(out, "timeout = {}", d.timeout);
    let _ = writeln!(out, "audio_cache = {}", d.audio_cache);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let Some(p) = cfg.profiles.get(name) else {
            continue;
        };
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "source = \"{}\"", source_name(p.source));
        match p.source {
            SourceKind::TrunkRecorder => match p.trunk_url() {
                Ok(url) => {
                    let _ = writeln!(out, "# url: {url}");
                }
                Err(e) => {
                    let _ = writeln!(out, "# {e}");
                }
            },
            SourceKind::RdioScanner => {
                let _ = writeln!(out, "# database: {}", p.database_path().display());
            }
        }
        if let Some(ref host) = p.host {
            let _ = writeln!(out, "host = \"{host}\"");
        }
        if let Some(port) = p.port {
            let _ = writeln!(out, "port = {port}");
        }
        if let Some(tls) = p.tls {
            let _ = writeln!(out, "tls = {tls}");
        }
        if let Some(ref key) = p.api_key {
            let _ = writeln!(out, "api_key = \"{key}\"");
        }
        if let Some(ref env) = p.api_key_env {
            let _ = writeln!(out, "api_key_env = \"{env}\"");
        }
        if let Some(push) = p.push {
            let _ = writeln!(out, "push = {push}");
        }
        if let Some(ref path) = p.path {
            let _ = writeln!(out, "path = \"{}\"", path.display());
        }
        if let Some(ref db) = p.database {
            let _ = writeln!(out, "database = \"{db}\"");
        }
        if let Some(v) = p.poll_interval {
            let _ = writeln!(out, "poll_interval = {v}");
        }
        if let Some(v) = p.history_capacity {
            let _ = writeln!(out, "history_capacity = {v}");
        }
        if let Some(v) = p.timeout {
            let _ = writeln!(out, "timeout = {v}");
        }
        if let Some(v) = p.audio_cache {
            let _ = writeln!(out, "audio_cache = {v}");
        }
    }

    out.trim_end().to_owned()
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn save(cfg: &Config) -> Result<PathBuf, CliError> {
    Ok(config::save_config(cfg)?)
}

/// Ask for an optional API key and where to keep it.
///
/// Returns the value to write into the config file, if any.
fn prompt_api_key(profile_name: &str) -> Result<Option<String>, CliError> {
    let wants_key = Confirm::new()
        .with_prompt("Does Trunk Recorder require an API key?")
        .default(false)
        .interact()
        .map_err(prompt_err)?;
    if !wants_key {
        return Ok(None);
    }

    let key = Password::new()
        .with_prompt("API key")
        .interact()
        .map_err(prompt_err)?;
    if key.is_empty() {
        return Err(CliError::Validation {
            field: "api_key".into(),
            reason: "API key cannot be empty".into(),
        });
    }

    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt("Where to store the API key?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        store_api_key(profile_name, &key)?;
        eprintln!("   ✓ API key stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(key))
    }
}

fn prompt_trunk_profile(profile_name: &str) -> Result<Profile, CliError> {
    let mut profile = Profile::new(SourceKind::TrunkRecorder);

    let host: String = Input::new()
        .with_prompt("Trunk Recorder host")
        .default("localhost".into())
        .interact_text()
        .map_err(prompt_err)?;
    let port: u16 = Input::new()
        .with_prompt("API port")
        .default(scanfeed_core::config::DEFAULT_TRUNK_PORT)
        .interact_text()
        .map_err(prompt_err)?;
    let push = Confirm::new()
        .with_prompt("Use the WebSocket push channel for live calls?")
        .default(true)
        .interact()
        .map_err(prompt_err)?;

    profile.host = Some(host);
    profile.port = Some(port);
    profile.push = Some(push);
    profile.api_key = prompt_api_key(profile_name)?;
    Ok(profile)
}

fn prompt_rdio_profile() -> Result<Profile, CliError> {
    let mut profile = Profile::new(SourceKind::RdioScanner);

    let path: String = Input::new()
        .with_prompt("Rdio Scanner data directory")
        .default(scanfeed_core::config::DEFAULT_RDIO_DATA_DIR.into())
        .interact_text()
        .map_err(prompt_err)?;
    let database: String = Input::new()
        .with_prompt("Database file")
        .default(scanfeed_config::DEFAULT_DATABASE_FILE.into())
        .interact_text()
        .map_err(prompt_err)?;

    profile.path = Some(path.into());
    profile.database = Some(database);
    if !profile.database_path().exists() {
        eprintln!(
            "   ! {} does not exist yet; it is opened on first use",
            profile.database_path().display()
        );
    }
    Ok(profile)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            eprintln!("scanfeed configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            let source = Select::new()
                .with_prompt("Call source")
                .items(&["Trunk Recorder (HTTP API)", "Rdio Scanner (SQLite database)"])
                .default(0)
                .interact()
                .map_err(prompt_err)?;

            let profile = if source == 0 {
                prompt_trunk_profile(&profile_name)?
            } else {
                prompt_rdio_profile()?
            };

            // Keep any other profiles already on disk.
            let mut cfg = load_config_or_default();
            cfg.profiles.insert(profile_name.clone(), profile);
            cfg.default_profile = Some(profile_name.clone());

            let path = save(&cfg)?;
            eprintln!("\n✓ Configuration written to {}", path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Test it: scanfeed systems");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = redacted(&load_config_or_default());
            let out = output::render_single(&global.output, &cfg, format_config, |c| {
                c.default_profile.clone().unwrap_or_default()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: scanfeed config init");
            } else {
                let mut names: Vec<_> = cfg.profiles.iter().collect();
                names.sort_by_key(|(name, _)| name.as_str());
                for (name, profile) in names {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name} ({}){marker}", source_name(profile.source));
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config()?;
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    name,
                    available: config::available_profiles(&cfg),
                });
            }
            cfg.default_profile = Some(name.clone());
            save(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        // ── SetKey ──────────────────────────────────────────────────
        ConfigCommand::SetKey { profile } => {
            let cfg = config::load_config()?;
            let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));

            let prof = cfg
                .profiles
                .get(&profile_name)
                .ok_or_else(|| CliError::ProfileNotFound {
                    name: profile_name.clone(),
                    available: config::available_profiles(&cfg),
                })?;
            if prof.source != SourceKind::TrunkRecorder {
                return Err(CliError::Validation {
                    field: "profile".into(),
                    reason: format!("'{profile_name}' is an rdio-scanner profile and takes no API key"),
                });
            }

            let key = Password::new()
                .with_prompt("API key")
                .interact()
                .map_err(prompt_err)?;
            if key.is_empty() {
                return Err(CliError::Validation {
                    field: "api_key".into(),
                    reason: "API key cannot be empty".into(),
                });
            }
            store_api_key(&profile_name, &key)?;
            eprintln!("✓ API key stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}
