//! Shared helpers for command handlers.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use scanfeed_core::{Coordinator, FeedConfig, FeedState};

use crate::error::CliError;

/// Connect once, take a consistent snapshot, disconnect.
pub async fn fetch_snapshot(feed: FeedConfig) -> Result<Arc<FeedState>, CliError> {
    let state = Coordinator::oneshot(feed, |coordinator| async move { Ok(coordinator.snapshot()) }).await?;
    tracing::debug!(
        active = state.active_call_count(),
        history = state.total_call_count(),
        systems = state.systems.len(),
        "snapshot fetched"
    );
    Ok(state)
}

/// Parse `value` as Unix seconds or RFC3339.
pub fn parse_time(value: &str, field: &str) -> Result<DateTime<Utc>, CliError> {
    let invalid = || CliError::Validation {
        field: field.into(),
        reason: format!("invalid timestamp '{value}' (use Unix seconds or RFC3339)"),
    };
    if let Ok(ts) = value.parse::<i64>() {
        return Utc.timestamp_opt(ts, 0).single().ok_or_else(invalid);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| invalid())
}

/// Parse an optional start/end pair, requiring `start <= end`.
pub fn parse_time_range(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), CliError> {
    let start_ts = start.map(|s| parse_time(s, "start")).transpose()?;
    let end_ts = end.map(|s| parse_time(s, "end")).transpose()?;
    if let (Some(s), Some(e)) = (start_ts, end_ts) {
        if s > e {
            return Err(CliError::Validation {
                field: "start".into(),
                reason: "start must be <= end".into(),
            });
        }
    }
    Ok((start_ts, end_ts))
}
