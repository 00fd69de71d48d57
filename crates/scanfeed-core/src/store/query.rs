// ── Read queries over a feed snapshot ──

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::state::FeedState;
use crate::model::{Call, System, Talkgroup};

pub const DEFAULT_CALL_LIMIT: usize = 50;
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Filter for [`FeedState::query_calls`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallQuery {
    pub system_id: Option<String>,
    pub talkgroup_id: Option<String>,
    /// Active calls instead of history.
    pub active_only: bool,
    pub limit: usize,
}

impl Default for CallQuery {
    fn default() -> Self {
        Self {
            system_id: None,
            talkgroup_id: None,
            active_only: false,
            limit: DEFAULT_CALL_LIMIT,
        }
    }
}

/// Filter and page for [`FeedState::query_history`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Inclusive lower bound on start time.
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound on start time.
    pub end: Option<DateTime<Utc>>,
    pub system_id: Option<String>,
    pub talkgroup_id: Option<String>,
    /// Case-insensitive substring over talkgroup name, transcript and units.
    pub search: Option<String>,
    pub offset: usize,
    pub limit: usize,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            system_id: None,
            talkgroup_id: None,
            search: None,
            offset: 0,
            limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// One page of history; `total` counts all matches before paging.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPage {
    pub calls: Vec<Call>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemSummary {
    pub system: System,
    pub talkgroups: Vec<Talkgroup>,
    pub active_calls: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TalkgroupActivity {
    pub talkgroup: Talkgroup,
    pub active_calls: usize,
    pub recent_calls: usize,
}

fn matches_ids(call: &Call, system_id: Option<&str>, talkgroup_id: Option<&str>) -> bool {
    system_id.is_none_or(|s| call.system_id == s)
        && talkgroup_id.is_none_or(|t| call.talkgroup_id == t)
}

impl FeedState {
    pub fn query_calls(&self, query: &CallQuery) -> Vec<Call> {
        let system = query.system_id.as_deref();
        let talkgroup = query.talkgroup_id.as_deref();

        if query.active_only {
            self.active_newest_first()
                .into_iter()
                .filter(|c| matches_ids(c, system, talkgroup))
                .take(query.limit)
                .cloned()
                .collect()
        } else {
            self.call_history
                .iter()
                .filter(|c| matches_ids(c, system, talkgroup))
                .take(query.limit)
                .cloned()
                .collect()
        }
    }

    pub fn query_history(&self, query: &HistoryQuery) -> HistoryPage {
        let system = query.system_id.as_deref();
        let talkgroup = query.talkgroup_id.as_deref();
        let needle = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let matching: Vec<&Call> = self
            .call_history
            .iter()
            .filter(|c| query.start.is_none_or(|start| c.start_time >= start))
            .filter(|c| query.end.is_none_or(|end| c.start_time <= end))
            .filter(|c| matches_ids(c, system, talkgroup))
            .filter(|c| needle.as_deref().is_none_or(|n| c.matches_search(n)))
            .collect();

        HistoryPage {
            total: matching.len(),
            calls: matching
                .into_iter()
                .skip(query.offset)
                .take(query.limit)
                .cloned()
                .collect(),
            offset: query.offset,
            limit: query.limit,
        }
    }

    pub fn system_summaries(&self) -> Vec<SystemSummary> {
        self.systems
            .values()
            .map(|system| SystemSummary {
                system: system.clone(),
                talkgroups: self.talkgroups.get(&system.id).cloned().unwrap_or_default(),
                active_calls: self
                    .active_calls
                    .values()
                    .filter(|c| c.system_id == system.id)
                    .count(),
            })
            .collect()
    }

    /// Talkgroups with live and recent call counts. `system_id` narrows
    /// to one system.
    pub fn talkgroup_activity(&self, system_id: Option<&str>) -> Vec<TalkgroupActivity> {
        self.talkgroups
            .iter()
            .filter(|(sys, _)| system_id.is_none_or(|s| s == sys.as_str()))
            .flat_map(|(_, talkgroups)| talkgroups.iter())
            .map(|tg| {
                let same = |c: &&Call| c.system_id == tg.system_id && c.talkgroup_id == tg.id;
                TalkgroupActivity {
                    talkgroup: tg.clone(),
                    active_calls: self.active_calls.values().filter(same).count(),
                    recent_calls: self.call_history.iter().filter(same).count(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_760_000_000 + secs, 0).unwrap()
    }

    fn ended(id: &str, system: &str, tg: &str, start: i64) -> Call {
        let mut call = Call::new(id, system, tg, at(start));
        call.finish(at(start + 3));
        call
    }

    fn state() -> FeedState {
        let mut state = FeedState::default();
        let mut fire = ended("h1", "county", "201", 30);
        fire.talkgroup_name = Some("Fire EMERGENCY Ops".into());
        let mut police = ended("h2", "metro", "101", 20);
        police.transcript = Some("units respond, emergency traffic".into());
        let mut units = ended("h3", "metro", "102", 10);
        units.units = vec!["EMERGENCY-1".into()];
        let plain = ended("h4", "metro", "101", 0);
        state.call_history = vec![fire, police, units, plain].into();

        for (id, start) in [("a1", 50), ("a2", 60), ("a3", 55)] {
            let call = Call::new(id, "metro", "101", at(start));
            state.active_calls.insert(id.to_owned(), call);
        }
        state
    }

    #[test]
    fn active_calls_newest_first_and_limited() {
        let query = CallQuery {
            active_only: true,
            limit: 2,
            ..CallQuery::default()
        };
        let ids: Vec<String> = state().query_calls(&query).into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["a2".to_owned(), "a3".to_owned()]);
    }

    #[test]
    fn filters_are_conjunctive() {
        let query = CallQuery {
            system_id: Some("metro".into()),
            talkgroup_id: Some("101".into()),
            ..CallQuery::default()
        };
        let ids: Vec<String> = state().query_calls(&query).into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["h2".to_owned(), "h4".to_owned()]);
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let query = HistoryQuery {
            search: Some("EMERGENCY".into()),
            ..HistoryQuery::default()
        };
        let page = state().query_history(&query);
        let ids: Vec<&str> = page.calls.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["h1", "h2", "h3"]);
        assert_eq!(page.total, 3);
    }

    #[test]
    fn paging_reports_total_before_offset() {
        let query = HistoryQuery {
            offset: 1,
            limit: 2,
            ..HistoryQuery::default()
        };
        let page = state().query_history(&query);
        assert_eq!(page.total, 4);
        assert_eq!(page.calls.len(), 2);
        assert_eq!(page.calls[0].id, "h2");
        assert_eq!((page.offset, page.limit), (1, 2));
    }

    #[test]
    fn time_range_is_inclusive() {
        let query = HistoryQuery {
            start: Some(at(10)),
            end: Some(at(20)),
            ..HistoryQuery::default()
        };
        let page = state().query_history(&query);
        let ids: Vec<&str> = page.calls.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["h2", "h3"]);
    }

    #[test]
    fn find_prefers_active() {
        let mut state = state();
        let dup = Call::new("h1", "metro", "999", at(70));
        state.active_calls.insert("h1".into(), dup);
        assert_eq!(state.find_call("h1").unwrap().talkgroup_id, "999");
        assert!(state.find_call("nope").is_none());
    }

    #[test]
    fn talkgroup_activity_counts() {
        let mut state = state();
        state.talkgroups.insert(
            "metro".into(),
            vec![Talkgroup {
                id: "101".into(),
                system_id: "metro".into(),
                name: Some("Dispatch".into()),
                tag: None,
                group: None,
            }],
        );
        let activity = state.talkgroup_activity(Some("metro"));
        assert_eq!(activity.len(), 1);
        assert_eq!(activity[0].active_calls, 3);
        assert_eq!(activity[0].recent_calls, 2);
        assert!(state.talkgroup_activity(Some("county")).is_empty());
    }
}
