// ── Systems and talkgroups ──

use serde::{Deserialize, Serialize};

/// System type used when the source does not report one.
pub const UNKNOWN_SYSTEM_TYPE: &str = "unknown";

/// A radio system (site or trunked network).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct System {
    pub id: String,
    pub name: String,
    pub system_type: String,
}

impl System {
    pub fn new(id: impl Into<String>, name: Option<String>, system_type: Option<String>) -> Self {
        let id = id.into();
        Self {
            name: name.filter(|n| !n.is_empty()).unwrap_or_else(|| id.clone()),
            system_type: system_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| UNKNOWN_SYSTEM_TYPE.to_owned()),
            id,
        }
    }
}

/// A talkgroup within a system, keyed by `(system_id, id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Talkgroup {
    pub id: String,
    pub system_id: String,
    pub name: Option<String>,
    pub tag: Option<String>,
    pub group: Option<String>,
}

impl Talkgroup {
    /// Name if known, else the id.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}
