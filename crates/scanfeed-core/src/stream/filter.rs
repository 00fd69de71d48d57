// ── Notification filters for call events ──

use serde::{Deserialize, Serialize};

use crate::model::Call;

/// Which call events a subscriber wants to hear about.
///
/// Empty `talkgroup_ids` means every talkgroup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallFilter {
    pub system_id: Option<String>,
    #[serde(default)]
    pub talkgroup_ids: Vec<String>,
    #[serde(default = "enabled")]
    pub notifications_enabled: bool,
}

fn enabled() -> bool {
    true
}

impl Default for CallFilter {
    fn default() -> Self {
        Self {
            system_id: None,
            talkgroup_ids: Vec::new(),
            notifications_enabled: true,
        }
    }
}

impl CallFilter {
    pub fn for_system(system_id: impl Into<String>) -> Self {
        Self {
            system_id: Some(system_id.into()),
            ..Self::default()
        }
    }

    pub fn with_talkgroups<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.talkgroup_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn matches(&self, call: &Call) -> bool {
        self.notifications_enabled
            && self.system_id.as_ref().is_none_or(|s| *s == call.system_id)
            && (self.talkgroup_ids.is_empty() || self.talkgroup_ids.contains(&call.talkgroup_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn talkgroup_list_narrows_matches() {
        let filter = CallFilter::for_system("metro").with_talkgroups(["101", "102"]);
        assert!(filter.matches(&Call::new("a", "metro", "101", Utc::now())));
        assert!(!filter.matches(&Call::new("b", "metro", "103", Utc::now())));
        assert!(!filter.matches(&Call::new("c", "county", "101", Utc::now())));
    }

    #[test]
    fn default_matches_everything() {
        assert!(CallFilter::default().matches(&Call::new("a", "x", "y", Utc::now())));
    }
}
