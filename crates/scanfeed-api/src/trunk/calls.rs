// Call and call-audio endpoints

use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::trunk::client::{AudioPayload, TrunkClient};
use crate::trunk::models::ApiCall;

impl TrunkClient {
    /// List calls currently in progress. Malformed entries are skipped.
    ///
    /// `GET /api/calls/active`
    pub async fn list_active_calls(&self) -> Result<Vec<ApiCall>, Error> {
        let url = self.api_url("calls/active")?;
        debug!("listing active calls");
        self.get_json_list(url, "call").await
    }

    /// List the most recent calls, newest first.
    ///
    /// `GET /api/calls?limit={limit}`
    pub async fn list_calls(&self, limit: usize) -> Result<Vec<ApiCall>, Error> {
        let mut url = self.api_url("calls")?;
        url.query_pairs_mut().append_pair("limit", &limit.to_string());
        debug!(limit, "listing recent calls");
        self.get_json_list(url, "call").await
    }

    /// Public URL of a call's audio recording.
    ///
    /// `GET /api/calls/{id}/audio`
    pub fn call_audio_url(&self, call_id: &str) -> Result<Url, Error> {
        self.api_segments_url(&["calls", call_id, "audio"])
    }

    /// Download a call's audio. Returns `None` when the server has none (404).
    pub async fn call_audio(&self, call_id: &str) -> Result<Option<AudioPayload>, Error> {
        let url = self.call_audio_url(call_id)?;
        debug!(call_id, "fetching call audio");
        self.get_bytes(url).await
    }
}
