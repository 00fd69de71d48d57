// Trunk Recorder adapter: HTTP API plus push endpoint.

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use url::Url;

use scanfeed_api::{TransportConfig, TrunkClient};

use super::{Activity, CallSource};
use crate::convert::talkgroup_from_api;
use crate::error::CoreError;
use crate::model::audio::extension_for;
use crate::model::{AudioClip, Call, System, Talkgroup};

pub struct TrunkSource {
    client: TrunkClient,
}

impl TrunkSource {
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, CoreError> {
        Ok(Self {
            client: TrunkClient::new(base_url, transport)?,
        })
    }

    pub fn from_client(client: TrunkClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CallSource for TrunkSource {
    fn name(&self) -> &'static str {
        "trunk-recorder"
    }

    fn activity(&self) -> Activity {
        Activity::ExplicitEnd
    }

    async fn fetch_systems(&self) -> Result<Vec<System>, CoreError> {
        let systems = self.client.list_systems().await?;
        Ok(systems.into_iter().map(System::from).collect())
    }

    async fn fetch_talkgroups(&self, system_id: &str) -> Result<Vec<Talkgroup>, CoreError> {
        let talkgroups = self.client.list_talkgroups(system_id).await?;
        Ok(talkgroups
            .into_iter()
            .map(|t| talkgroup_from_api(t, system_id))
            .collect())
    }

    async fn fetch_active_calls(&self) -> Result<Vec<Call>, CoreError> {
        let now = Utc::now();
        let calls = self.client.list_active_calls().await?;
        Ok(calls.into_iter().map(|c| Call::from_api(c, now)).collect())
    }

    async fn fetch_recent_calls(&self, limit: usize) -> Result<Vec<Call>, CoreError> {
        let now = Utc::now();
        let mut calls: Vec<Call> = self
            .client
            .list_calls(limit)
            .await?
            .into_iter()
            .map(|c| Call::from_api(c, now))
            .collect();

        // History entries are finished even if the server omitted the stop time.
        for call in &mut calls {
            call.finish_from_duration();
        }
        calls.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        calls.truncate(limit);
        Ok(calls)
    }

    async fn fetch_audio(&self, call_id: &str) -> Result<Option<AudioClip>, CoreError> {
        let payload = self.client.call_audio(call_id).await?;
        Ok(payload.map(|p| AudioClip {
            filename: Some(format!("{call_id}.{}", extension_for(&p.content_type))),
            data: p.data,
            content_type: p.content_type,
        }))
    }

    fn push_endpoint(&self) -> Option<Url> {
        match self.client.websocket_url() {
            Ok(url) => Some(url),
            Err(e) => {
                debug!(error = %e, "no push endpoint for base URL");
                None
            }
        }
    }

    fn audio_url(&self, call_id: &str) -> Option<Url> {
        self.client.call_audio_url(call_id).ok()
    }
}
