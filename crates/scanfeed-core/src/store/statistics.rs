// ── Feed statistics ──

use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use strum::{Display, EnumString};

use super::state::FeedState;

const TOP_TALKGROUPS: usize = 10;

/// Time window for [`FeedState::statistics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum StatsPeriod {
    /// Since local midnight.
    #[default]
    Today,
    /// The last 7 days.
    Week,
    /// The last 30 days.
    Month,
    /// Everything in history.
    #[strum(to_string = "total", serialize = "all")]
    Total,
}

impl StatsPeriod {
    /// Earliest start time counted, relative to `now`.
    pub fn since<Tz: TimeZone>(self, now: &DateTime<Tz>) -> Option<DateTime<Utc>> {
        match self {
            Self::Today => {
                let midnight = now.date_naive().and_hms_opt(0, 0, 0)?;
                let local = now.timezone().from_local_datetime(&midnight).earliest()?;
                Some(local.with_timezone(&Utc))
            }
            Self::Week => Some(now.with_timezone(&Utc) - TimeDelta::days(7)),
            Self::Month => Some(now.with_timezone(&Utc) - TimeDelta::days(30)),
            Self::Total => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TalkgroupCount {
    pub system_id: String,
    pub talkgroup_id: String,
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub period: StatsPeriod,
    pub total_calls: usize,
    /// Seconds.
    pub total_airtime: f64,
    pub unique_talkgroups: usize,
    pub emergency_calls: usize,
    pub encrypted_calls: usize,
    pub active_calls: usize,
    pub active_systems: usize,
    pub top_talkgroups: Vec<TalkgroupCount>,
}

impl FeedState {
    /// Statistics for `period` as of now in the local time zone.
    pub fn statistics(&self, period: StatsPeriod, system_id: Option<&str>) -> Statistics {
        self.statistics_at(period, system_id, &Local::now())
    }

    /// Statistics for `period` as of `now`.
    pub fn statistics_at<Tz: TimeZone>(
        &self,
        period: StatsPeriod,
        system_id: Option<&str>,
        now: &DateTime<Tz>,
    ) -> Statistics {
        let since = period.since(now);

        let calls: Vec<_> = self
            .call_history
            .iter()
            .filter(|c| since.is_none_or(|s| c.start_time >= s))
            .filter(|c| system_id.is_none_or(|s| c.system_id == s))
            .collect();

        // Insertion order doubles as first-seen order for tie breaking.
        let mut per_talkgroup: IndexMap<(&str, &str), usize> = IndexMap::new();
        for call in &calls {
            *per_talkgroup
                .entry((call.system_id.as_str(), call.talkgroup_id.as_str()))
                .or_insert(0) += 1;
        }
        let unique_talkgroups = per_talkgroup.len();

        let mut ranked: Vec<((&str, &str), usize)> = per_talkgroup.into_iter().collect();
        // Stable sort keeps first-seen order among equal counts.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        let top_talkgroups = ranked
            .into_iter()
            .take(TOP_TALKGROUPS)
            .map(|((system, talkgroup), count)| TalkgroupCount {
                name: self
                    .talkgroup(system, talkgroup)
                    .and_then(|t| t.name.clone())
                    .unwrap_or_else(|| talkgroup.to_owned()),
                system_id: system.to_owned(),
                talkgroup_id: talkgroup.to_owned(),
                count,
            })
            .collect();

        Statistics {
            period,
            total_calls: calls.len(),
            total_airtime: calls.iter().map(|c| c.duration).sum(),
            unique_talkgroups,
            emergency_calls: calls.iter().filter(|c| c.emergency).count(),
            encrypted_calls: calls.iter().filter(|c| c.encrypted).count(),
            active_calls: self
                .active_calls
                .values()
                .filter(|c| system_id.is_none_or(|s| c.system_id == s))
                .count(),
            active_systems: self.systems.len(),
            top_talkgroups,
        }
    }
}
