// System and talkgroup endpoints

use tracing::debug;

use crate::error::Error;
use crate::trunk::client::TrunkClient;
use crate::trunk::models::{ApiSystem, ApiTalkgroup};

impl TrunkClient {
    /// List all radio systems.
    ///
    /// `GET /api/systems`
    pub async fn list_systems(&self) -> Result<Vec<ApiSystem>, Error> {
        let url = self.api_url("systems")?;
        debug!("listing systems");
        self.get_json(url).await
    }

    /// List the talkgroups of one system.
    ///
    /// `GET /api/systems/{id}/talkgroups`
    pub async fn list_talkgroups(&self, system_id: &str) -> Result<Vec<ApiTalkgroup>, Error> {
        let url = self.api_segments_url(&["systems", system_id, "talkgroups"])?;
        debug!(system_id, "listing talkgroups");
        self.get_json(url).await
    }
}
