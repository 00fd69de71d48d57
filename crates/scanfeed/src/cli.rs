//! Clap derive structures for the `scanfeed` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// scanfeed -- live and historical radio scanner calls from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "scanfeed",
    version,
    about = "Follow radio scanner calls from Trunk Recorder or Rdio Scanner",
    long_about = "Reads calls, talkgroups and audio from a Trunk Recorder HTTP API\n\
        (with optional WebSocket push) or an Rdio Scanner SQLite database,\n\
        and presents them as tables, JSON, statistics or sensor readings.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Source profile to use
    #[arg(long, short = 'p', env = "SCANFEED_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Trunk Recorder host or URL (overrides profile)
    #[arg(long, env = "SCANFEED_HOST", global = true, conflicts_with = "database")]
    pub host: Option<String>,

    /// Trunk Recorder API port
    #[arg(long, env = "SCANFEED_PORT", global = true)]
    pub port: Option<u16>,

    /// Rdio Scanner database file (overrides profile)
    #[arg(long, short = 'd', env = "SCANFEED_DATABASE", global = true)]
    pub database: Option<PathBuf>,

    /// Trunk Recorder API key
    #[arg(long, env = "SCANFEED_API_KEY", global = true, hide_env = true)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SCANFEED_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "SCANFEED_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List active or recent calls
    #[command(alias = "ls")]
    Calls(CallsArgs),

    /// Search call history
    #[command(alias = "hist")]
    History(HistoryArgs),

    /// Show details of one call
    Call {
        /// Call ID
        id: String,
    },

    /// Download a call recording
    Audio(AudioArgs),

    /// Call statistics for a period
    Stats(StatsArgs),

    /// List radio systems with talkgroup and activity counts
    #[command(alias = "sys")]
    Systems,

    /// List talkgroups with activity
    #[command(alias = "tg")]
    Talkgroups(TalkgroupsArgs),

    /// Show sensor readings (active calls, totals, status)
    Sensors(SensorsArgs),

    /// Stream call start/end events as they happen
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CALLS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CallsArgs {
    /// Only calls on this system
    #[arg(long, short = 's')]
    pub system: Option<String>,

    /// Only calls on this talkgroup
    #[arg(long, short = 't')]
    pub talkgroup: Option<String>,

    /// Show calls in progress instead of history
    #[arg(long, short = 'a')]
    pub active: bool,

    /// Max results
    #[arg(long, short = 'l', default_value = "50")]
    pub limit: usize,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  HISTORY
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Earliest start time (RFC3339 or Unix seconds)
    #[arg(long)]
    pub start: Option<String>,

    /// Latest start time (RFC3339 or Unix seconds)
    #[arg(long)]
    pub end: Option<String>,

    /// Only calls on this system
    #[arg(long, short = 's')]
    pub system: Option<String>,

    /// Only calls on this talkgroup
    #[arg(long, short = 't')]
    pub talkgroup: Option<String>,

    /// Case-insensitive text to find in talkgroup name, transcript or units
    #[arg(long, short = 'f')]
    pub search: Option<String>,

    /// Pagination offset
    #[arg(long, default_value = "0")]
    pub offset: usize,

    /// Max results
    #[arg(long, short = 'l', default_value = "100")]
    pub limit: usize,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  AUDIO
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct AudioArgs {
    /// Call ID
    pub id: String,

    /// Output file (default: the recording's own file name)
    #[arg(long, short = 'f')]
    pub file: Option<PathBuf>,

    /// Print the recording URL instead of downloading it
    #[arg(long, conflicts_with = "file")]
    pub url: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  STATS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Reporting period
    #[arg(long, default_value = "today", value_enum)]
    pub period: StatsPeriodArg,

    /// Only calls on this system
    #[arg(long, short = 's')]
    pub system: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatsPeriodArg {
    /// Since local midnight
    Today,
    /// Last 7 days
    Week,
    /// Last 30 days
    Month,
    /// Everything in history
    #[value(alias = "all")]
    Total,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  TALKGROUPS / SENSORS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct TalkgroupsArgs {
    /// Only talkgroups on this system
    #[arg(long, short = 's')]
    pub system: Option<String>,
}

#[derive(Debug, Args)]
pub struct SensorsArgs {
    /// Instance name used in sensor IDs
    #[arg(long, default_value = "scanfeed")]
    pub instance: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Only events on this system
    #[arg(long, short = 's')]
    pub system: Option<String>,

    /// Only events on these talkgroups (comma-separated)
    #[arg(long, short = 't', value_delimiter = ',')]
    pub talkgroups: Option<Vec<String>>,

    /// Only report call ends
    #[arg(long)]
    pub ended_only: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file location
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a Trunk Recorder API key in the system keyring
    SetKey {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
