// ── Call domain types ──

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Where a call's recording can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AudioReference {
    /// Remote URL served by the scanner back end.
    Url(Url),
    /// Row id in the Rdio Scanner database.
    DatabaseRow(i64),
}

/// A single radio transmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub id: String,
    pub start_time: DateTime<Utc>,
    /// Set once the call has ended.
    pub end_time: Option<DateTime<Utc>>,
    /// Length in seconds. Zero while unknown.
    pub duration: f64,
    pub system_id: String,
    pub system_name: Option<String>,
    pub talkgroup_id: String,
    pub talkgroup_name: Option<String>,
    /// Hz.
    pub frequency: Option<f64>,
    pub emergency: bool,
    pub encrypted: bool,
    pub units: Vec<String>,
    pub transcript: Option<String>,
    pub audio: Option<AudioReference>,
}

impl Call {
    /// A fresh, in-progress call with every optional field empty.
    pub fn new(
        id: impl Into<String>,
        system_id: impl Into<String>,
        talkgroup_id: impl Into<String>,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            start_time,
            end_time: None,
            duration: 0.0,
            system_id: system_id.into(),
            system_name: None,
            talkgroup_id: talkgroup_id.into(),
            talkgroup_name: None,
            frequency: None,
            emergency: false,
            encrypted: false,
            units: Vec::new(),
            transcript: None,
            audio: None,
        }
    }

    pub fn has_ended(&self) -> bool {
        self.end_time.is_some()
    }

    /// Whether the call started within `window` before `now`.
    pub fn started_within(&self, window: TimeDelta, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.start_time);
        age >= TimeDelta::zero() && age < window
    }

    /// Talkgroup name if known, else its id.
    pub fn talkgroup_label(&self) -> &str {
        self.talkgroup_name.as_deref().unwrap_or(&self.talkgroup_id)
    }

    /// Mark the call as finished.
    ///
    /// Keeps an end time the source already supplied. Derives the
    /// duration from the timestamps when it is still unknown.
    pub fn finish(&mut self, ended_at: DateTime<Utc>) {
        let end = *self.end_time.get_or_insert(ended_at);
        if self.duration <= 0.0 {
            let elapsed = end.signed_duration_since(self.start_time);
            #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
            let secs = elapsed.num_milliseconds().max(0) as f64 / 1000.0;
            self.duration = secs;
        }
    }

    /// Close a call whose end is implied by its start and duration.
    pub fn finish_from_duration(&mut self) {
        if self.end_time.is_none() {
            self.duration = clamp_duration(self.duration);
            self.end_time = Some(end_after(self.start_time, self.duration));
        }
    }

    /// Case-insensitive substring match over talkgroup name, transcript
    /// and unit ids. `needle` must already be lowercase.
    pub(crate) fn matches_search(&self, needle: &str) -> bool {
        let contains = |text: &str| text.to_lowercase().contains(needle);
        self.talkgroup_name.as_deref().is_some_and(contains)
            || self.transcript.as_deref().is_some_and(contains)
            || self.units.iter().any(|u| contains(u))
    }
}

/// Longest recording length accepted from a source, in seconds.
pub const MAX_CALL_DURATION_SECS: f64 = 86_400.0;

/// Clamp a source-reported length into `0..=MAX_CALL_DURATION_SECS`.
/// NaN reads as zero.
pub(crate) fn clamp_duration(secs: f64) -> f64 {
    if secs.is_nan() {
        0.0
    } else {
        secs.clamp(0.0, MAX_CALL_DURATION_SECS)
    }
}

/// `start + secs`, or `start` itself when the sum leaves chrono's range.
pub(crate) fn end_after(start: DateTime<Utc>, secs: f64) -> DateTime<Utc> {
    #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
    let millis = (clamp_duration(secs) * 1000.0).round() as i64;
    start
        .checked_add_signed(TimeDelta::milliseconds(millis))
        .unwrap_or(start)
}

// ── Partial updates ──────────────────────────────────────────────────

/// Changed fields of an in-progress call. `None` leaves a field as-is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallUpdate {
    pub id: String,
    pub system_name: Option<String>,
    pub talkgroup_name: Option<String>,
    pub frequency: Option<f64>,
    pub emergency: Option<bool>,
    pub encrypted: Option<bool>,
    pub units: Option<Vec<String>>,
    pub transcript: Option<String>,
    pub duration: Option<f64>,
    pub end_time: Option<DateTime<Utc>>,
}

impl CallUpdate {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Merge the present fields into `call`. End time is not applied
    /// here; ending a call goes through the coordinator.
    pub fn apply(&self, call: &mut Call) {
        if let Some(ref name) = self.system_name {
            call.system_name = Some(name.clone());
        }
        if let Some(ref name) = self.talkgroup_name {
            call.talkgroup_name = Some(name.clone());
        }
        if let Some(freq) = self.frequency {
            call.frequency = Some(freq);
        }
        if let Some(emergency) = self.emergency {
            call.emergency = emergency;
        }
        if let Some(encrypted) = self.encrypted {
            call.encrypted = encrypted;
        }
        if let Some(ref units) = self.units {
            call.units.clone_from(units);
        }
        if let Some(ref transcript) = self.transcript {
            call.transcript = Some(transcript.clone());
        }
        if let Some(duration) = self.duration {
            call.duration = clamp_duration(duration);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_760_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn finish_keeps_supplied_end_and_derives_duration() {
        let mut call = Call::new("c1", "metro", "101", at(0));
        call.finish(at(4));
        assert_eq!(call.end_time, Some(at(4)));
        assert!((call.duration - 4.0).abs() < f64::EPSILON);

        // A second finish never moves the end time.
        call.finish(at(60));
        assert_eq!(call.end_time, Some(at(4)));
    }

    #[test]
    fn finish_from_duration_sets_end() {
        let mut call = Call::new("c1", "metro", "101", at(0));
        call.duration = 2.5;
        call.finish_from_duration();
        assert_eq!(call.end_time, Some(at(0) + TimeDelta::milliseconds(2500)));
    }

    #[test]
    fn absurd_durations_are_clamped_instead_of_overflowing() {
        let mut call = Call::new("c1", "metro", "101", at(0));
        call.duration = 1e300;
        call.finish_from_duration();
        assert!((call.duration - MAX_CALL_DURATION_SECS).abs() < f64::EPSILON);
        assert_eq!(call.end_time, Some(at(86_400)));

        let mut call = Call::new("c2", "metro", "101", at(0));
        call.duration = f64::NAN;
        call.finish_from_duration();
        assert_eq!(call.end_time, Some(at(0)));

        // Near the end of chrono's range the end time stays at the start.
        let last = DateTime::<Utc>::MAX_UTC;
        assert_eq!(end_after(last, 10.0), last);

        let mut update = CallUpdate::new("c1");
        update.duration = Some(f64::INFINITY);
        update.apply(&mut call);
        assert!((call.duration - MAX_CALL_DURATION_SECS).abs() < f64::EPSILON);
    }

    #[test]
    fn recency_window_is_half_open() {
        let call = Call::new("c1", "metro", "101", at(0));
        let window = TimeDelta::seconds(30);
        assert!(call.started_within(window, at(29)));
        assert!(!call.started_within(window, at(30)));
        assert!(!call.started_within(window, at(-1)));
    }

    #[test]
    fn search_covers_name_transcript_and_units_only() {
        let mut call = Call::new("c1", "EMERGENCY-SYS", "EMERGENCY", at(0));
        assert!(!call.matches_search("emergency"));

        call.units = vec!["Emergency-7".into()];
        assert!(call.matches_search("emergency"));

        call.units.clear();
        call.transcript = Some("declaring an EMERGENCY".into());
        assert!(call.matches_search("emergency"));
    }

    #[test]
    fn update_merges_present_fields_only() {
        let mut call = Call::new("c1", "metro", "101", at(0));
        call.talkgroup_name = Some("Dispatch".into());

        let mut update = CallUpdate::new("c1");
        update.emergency = Some(true);
        update.units = Some(vec!["1201".into()]);
        update.apply(&mut call);

        assert!(call.emergency);
        assert_eq!(call.units, vec!["1201".to_owned()]);
        assert_eq!(call.talkgroup_name.as_deref(), Some("Dispatch"));
    }
}
