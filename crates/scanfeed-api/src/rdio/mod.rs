// Rdio Scanner database reader
//
// Rdio Scanner keeps its calls, systems and talkgroups in a single SQLite
// file. This module opens it read-only and maps rows into plain structs;
// interpretation (timestamps, durations, activity) happens in scanfeed-core.

pub mod database;
pub mod models;

pub use database::{DEFAULT_DATABASE_FILE, RdioDatabase};
pub use models::{
    AudioRow, CallRow, FrequencyEntry, RowTimestamp, SourceEntry, SystemRow, TalkgroupRow,
};
