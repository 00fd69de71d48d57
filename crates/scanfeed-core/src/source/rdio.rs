// Rdio Scanner adapter: read-only SQLite database.

use std::path::Path;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use tracing::{debug, warn};

use scanfeed_api::RdioDatabase;
use scanfeed_api::rdio::CallRow;

use super::{Activity, CallSource, RECENCY_WINDOW};
use crate::error::CoreError;
use crate::model::{AudioClip, Call, System, Talkgroup};

/// Rows scanned when looking for calls inside the recency window.
const ACTIVE_SCAN_LIMIT: usize = 100;

pub struct RdioSource {
    db: RdioDatabase,
}

impl RdioSource {
    pub fn new(path: &Path) -> Self {
        Self {
            db: RdioDatabase::new(path),
        }
    }

    pub fn from_database(db: RdioDatabase) -> Self {
        Self { db }
    }
}

/// Convert rows, skipping (and logging) any that cannot be placed in time.
fn rows_to_calls(rows: Vec<CallRow>) -> Vec<Call> {
    rows.into_iter()
        .filter_map(|row| match Call::try_from(row) {
            Ok(call) => Some(call),
            Err(e) => {
                warn!(error = %e, "skipping rdio call row");
                None
            }
        })
        .collect()
}

fn parse_row_id(kind: &str, id: &str) -> Option<i64> {
    match id.parse() {
        Ok(id) => Some(id),
        Err(_) => {
            debug!(kind, id, "non-numeric id for rdio database");
            None
        }
    }
}

#[async_trait]
impl CallSource for RdioSource {
    fn name(&self) -> &'static str {
        "rdio-scanner"
    }

    fn activity(&self) -> Activity {
        Activity::RecencyWindow(RECENCY_WINDOW)
    }

    async fn fetch_systems(&self) -> Result<Vec<System>, CoreError> {
        let rows = self.db.list_systems().await?;
        Ok(rows.into_iter().map(System::from).collect())
    }

    async fn fetch_talkgroups(&self, system_id: &str) -> Result<Vec<Talkgroup>, CoreError> {
        let Some(system_id) = parse_row_id("system", system_id) else {
            return Ok(Vec::new());
        };
        let rows = self.db.list_talkgroups(system_id).await?;
        Ok(rows.into_iter().map(Talkgroup::from).collect())
    }

    async fn fetch_active_calls(&self) -> Result<Vec<Call>, CoreError> {
        let now = Utc::now();
        let window = TimeDelta::from_std(RECENCY_WINDOW).unwrap_or(TimeDelta::seconds(30));
        let rows = self.db.recent_calls(ACTIVE_SCAN_LIMIT).await?;
        Ok(rows_to_calls(rows)
            .into_iter()
            .filter(|c| c.started_within(window, now))
            .collect())
    }

    async fn fetch_recent_calls(&self, limit: usize) -> Result<Vec<Call>, CoreError> {
        let rows = self.db.recent_calls(limit).await?;
        Ok(rows_to_calls(rows))
    }

    async fn fetch_audio(&self, call_id: &str) -> Result<Option<AudioClip>, CoreError> {
        let Some(row_id) = parse_row_id("call", call_id) else {
            return Ok(None);
        };
        let audio = self.db.call_audio(row_id).await?;
        Ok(audio.map(|a| AudioClip {
            data: a.data.into(),
            content_type: a.mime_type,
            filename: a.file_name,
        }))
    }

    async fn close(&self) {
        self.db.close().await;
    }
}
