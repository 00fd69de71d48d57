// scanfeed-api: Async clients for radio scanner back ends (Trunk Recorder + Rdio Scanner)

pub mod error;
pub mod push;
pub mod rdio;
pub mod transport;
pub mod trunk;

pub use error::Error;
pub use push::{PushHandle, PushMessage, ReconnectConfig};
pub use rdio::RdioDatabase;
pub use transport::TransportConfig;
pub use trunk::TrunkClient;
