// ── Feed events ──

use serde::Serialize;

use super::call::Call;

/// Call lifecycle notification broadcast by the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "call", rename_all = "snake_case")]
pub enum FeedEvent {
    CallStarted(Call),
    CallEnded(Call),
}

impl FeedEvent {
    pub fn call(&self) -> &Call {
        match self {
            Self::CallStarted(call) | Self::CallEnded(call) => call,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::CallStarted(_) => "call_started",
            Self::CallEnded(_) => "call_ended",
        }
    }
}
