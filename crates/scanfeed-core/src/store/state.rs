// ── Feed state snapshot ──

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::model::{Call, System, Talkgroup};

/// Health of the call source as of the last refresh.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum SourceStatus {
    #[default]
    Disconnected,
    Connected,
    Unavailable(String),
}

impl SourceStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => f.write_str("Connected"),
            Self::Disconnected | Self::Unavailable(_) => f.write_str("Disconnected"),
        }
    }
}

/// Everything the coordinator knows about the feed at one instant.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeedState {
    /// In-progress calls by id, in the order they started.
    pub active_calls: IndexMap<String, Call>,
    /// Finished calls, newest first.
    pub call_history: VecDeque<Call>,
    /// Systems by id, in discovery order.
    pub systems: IndexMap<String, System>,
    /// Talkgroups per system id.
    pub talkgroups: IndexMap<String, Vec<Talkgroup>>,
    pub last_refresh: Option<DateTime<Utc>>,
    pub status: SourceStatus,
}

impl FeedState {
    pub fn active_call_count(&self) -> usize {
        self.active_calls.len()
    }

    pub fn total_call_count(&self) -> usize {
        self.call_history.len()
    }

    pub fn talkgroup_count(&self) -> usize {
        self.talkgroups.values().map(Vec::len).sum()
    }

    /// Most recently finished call.
    pub fn latest_call(&self) -> Option<&Call> {
        self.call_history.front()
    }

    pub fn talkgroup(&self, system_id: &str, talkgroup_id: &str) -> Option<&Talkgroup> {
        self.talkgroups
            .get(system_id)?
            .iter()
            .find(|t| t.id == talkgroup_id)
    }

    /// Active calls, newest start first.
    pub fn active_newest_first(&self) -> Vec<&Call> {
        let mut calls: Vec<&Call> = self.active_calls.values().collect();
        calls.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        calls
    }

    /// Look up a call, preferring the active set over history.
    pub fn find_call(&self, call_id: &str) -> Option<&Call> {
        self.active_calls
            .get(call_id)
            .or_else(|| self.call_history.iter().find(|c| c.id == call_id))
    }
}
