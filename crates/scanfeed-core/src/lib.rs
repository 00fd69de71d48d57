// scanfeed-core: Call feed coordinator between scanner back ends and consumers (CLI, sensors).

pub mod config;
pub mod convert;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod sensor;
pub mod source;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{FeedConfig, SourceConfig};
pub use coordinator::{ConnectionState, Coordinator};
pub use error::CoreError;
pub use sensor::{SENSORS, Sensor, SensorDescription, SensorReading, SensorValue};
pub use source::{Activity, CallSource};
pub use store::{
    CallQuery, FeedState, FeedStore, HistoryPage, HistoryQuery, SourceStatus, Statistics,
    StatsPeriod, SystemSummary, TalkgroupActivity, TalkgroupCount,
};
pub use stream::{CallFilter, FeedEvents, FeedStream};

pub use model::{AudioClip, AudioReference, Call, CallUpdate, FeedEvent, System, Talkgroup};
