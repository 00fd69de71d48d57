// ── Source-to-domain type conversions ──
//
// Bridges raw `scanfeed_api` types (Trunk Recorder JSON, Rdio Scanner rows)
// into the canonical `scanfeed_core::model` types. Missing optional data is
// defaulted; records that cannot be placed in time are rejected.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use scanfeed_api::rdio::{CallRow, RowTimestamp, SystemRow, TalkgroupRow};
use scanfeed_api::trunk::{ApiCall, ApiCallPatch, ApiSystem, ApiTalkgroup, WireTimestamp};

use crate::error::CoreError;
use crate::model::call::{clamp_duration, end_after};
use crate::model::{AudioReference, Call, CallUpdate, System, Talkgroup};

/// Placeholder for calls whose system or talkgroup is not reported.
const UNKNOWN_ID: &str = "unknown";

// Epoch values above this are milliseconds (year 5138 in seconds).
const EPOCH_MILLIS_THRESHOLD: f64 = 100_000_000_000.0;

// ── Timestamps ─────────────────────────────────────────────────────

/// Epoch seconds or milliseconds to `DateTime<Utc>`.
pub fn epoch_to_datetime(epoch: f64) -> Option<DateTime<Utc>> {
    if !epoch.is_finite() || epoch < 0.0 {
        return None;
    }
    let millis = if epoch >= EPOCH_MILLIS_THRESHOLD {
        epoch
    } else {
        epoch * 1000.0
    };
    #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
    DateTime::from_timestamp_millis(millis.round() as i64)
}

/// RFC 3339, `YYYY-MM-DD HH:MM:SS[.fff]` (taken as UTC) or a numeric epoch.
pub fn parse_timestamp_text(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    raw.parse::<f64>().ok().and_then(epoch_to_datetime)
}

fn wire_to_datetime(ts: &WireTimestamp) -> Option<DateTime<Utc>> {
    match ts {
        WireTimestamp::Epoch(epoch) => epoch_to_datetime(*epoch),
        WireTimestamp::Text(text) => parse_timestamp_text(text),
    }
}

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn row_to_datetime(ts: &RowTimestamp) -> Option<DateTime<Utc>> {
    match ts {
        // Some exports store seconds; the magnitude tells them apart.
        RowTimestamp::Millis(ms) => epoch_to_datetime(*ms as f64),
        RowTimestamp::Text(text) => parse_timestamp_text(text),
        RowTimestamp::Missing => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ── Trunk Recorder ─────────────────────────────────────────────────

impl From<ApiSystem> for System {
    fn from(s: ApiSystem) -> Self {
        System::new(s.id, s.name, s.system_type)
    }
}

/// Convert a wire talkgroup, falling back to the system it was listed under.
pub fn talkgroup_from_api(t: ApiTalkgroup, listed_under: &str) -> Talkgroup {
    Talkgroup {
        system_id: t.system_id.unwrap_or_else(|| listed_under.to_owned()),
        id: t.id,
        name: non_empty(t.name),
        tag: non_empty(t.tag),
        group: non_empty(t.group),
    }
}

impl Call {
    /// Convert a wire call. A missing or unparseable start time falls back
    /// to `received_at`, since live messages describe calls happening now.
    pub fn from_api(c: ApiCall, received_at: DateTime<Utc>) -> Self {
        let start_time = c
            .start_time
            .as_ref()
            .and_then(wire_to_datetime)
            .unwrap_or(received_at);
        let end_time = c.stop_time.as_ref().and_then(wire_to_datetime);

        let duration = match (c.call_length, end_time) {
            (Some(len), _) if len > 0.0 => clamp_duration(len),
            (_, Some(end)) => {
                #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
                let secs = end.signed_duration_since(start_time).num_milliseconds().max(0) as f64
                    / 1000.0;
                clamp_duration(secs)
            }
            _ => 0.0,
        };

        let audio = c
            .audio_url
            .as_deref()
            .and_then(|u| url::Url::parse(u).ok())
            .map(AudioReference::Url);

        Call {
            id: c.id,
            start_time,
            end_time,
            duration,
            system_id: c.system.unwrap_or_else(|| UNKNOWN_ID.to_owned()),
            system_name: non_empty(c.system_name),
            talkgroup_id: c.talkgroup.unwrap_or_else(|| UNKNOWN_ID.to_owned()),
            talkgroup_name: non_empty(c.talkgroup_name),
            frequency: c.frequency,
            emergency: c.emergency,
            encrypted: c.encrypted,
            units: c.units,
            transcript: non_empty(c.transcript),
            audio,
        }
    }
}

impl From<ApiCallPatch> for CallUpdate {
    fn from(p: ApiCallPatch) -> Self {
        CallUpdate {
            end_time: p.stop_time.as_ref().and_then(wire_to_datetime),
            id: p.id,
            system_name: non_empty(p.system_name),
            talkgroup_name: non_empty(p.talkgroup_name),
            frequency: p.frequency,
            emergency: p.emergency,
            encrypted: p.encrypted,
            units: p.units,
            transcript: non_empty(p.transcript),
            duration: p.call_length.map(clamp_duration),
        }
    }
}

// ── Rdio Scanner ───────────────────────────────────────────────────

impl From<SystemRow> for System {
    fn from(row: SystemRow) -> Self {
        System::new(row.id.to_string(), non_empty(row.label), None)
    }
}

impl From<TalkgroupRow> for Talkgroup {
    fn from(row: TalkgroupRow) -> Self {
        Talkgroup {
            id: row.id.to_string(),
            system_id: row.system_id.to_string(),
            name: non_empty(row.name).or_else(|| non_empty(row.label)),
            tag: non_empty(row.tag),
            group: non_empty(row.group),
        }
    }
}

/// Database rows are finished recordings; the end time is implied.
impl TryFrom<CallRow> for Call {
    type Error = CoreError;

    fn try_from(row: CallRow) -> Result<Self, Self::Error> {
        let start_time = row_to_datetime(&row.date_time).ok_or_else(|| {
            CoreError::MalformedRecord {
                reason: format!("call {} has no usable dateTime ({:?})", row.id, row.date_time),
            }
        })?;
        let duration = clamp_duration(row.duration_secs());

        #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
        let frequency = row.primary_frequency().map(|f| f as f64);

        Ok(Call {
            id: row.id.to_string(),
            start_time,
            end_time: Some(end_after(start_time, duration)),
            duration,
            system_id: row.system.to_string(),
            system_name: non_empty(row.system_label.clone()),
            talkgroup_id: row.talkgroup.to_string(),
            talkgroup_name: non_empty(row.talkgroup_name.clone())
                .or_else(|| non_empty(row.talkgroup_label.clone())),
            frequency,
            emergency: row.is_emergency(),
            encrypted: false,
            units: row.unit_ids(),
            transcript: None,
            audio: Some(AudioReference::DatabaseRow(row.id)),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn epoch_seconds_and_millis_agree() {
        let secs = epoch_to_datetime(1_760_000_000.0).unwrap();
        let millis = epoch_to_datetime(1_760_000_000_000.0).unwrap();
        assert_eq!(secs, millis);
        assert!(epoch_to_datetime(f64::NAN).is_none());
    }

    #[test]
    fn text_timestamps() {
        let expected = Utc.with_ymd_and_hms(2025, 10, 9, 8, 53, 20).unwrap();
        assert_eq!(parse_timestamp_text("2025-10-09T08:53:20Z"), Some(expected));
        assert_eq!(parse_timestamp_text("2025-10-09 08:53:20"), Some(expected));
        assert_eq!(parse_timestamp_text("1760000000"), epoch_to_datetime(1_760_000_000.0));
        assert_eq!(parse_timestamp_text("yesterday"), None);
    }

    #[test]
    fn api_call_defaults_missing_fields() {
        let now = Utc.with_ymd_and_hms(2025, 10, 9, 12, 0, 0).unwrap();
        let api: ApiCall = serde_json::from_value(serde_json::json!({"id": "c1"})).unwrap();
        let call = Call::from_api(api, now);

        assert_eq!(call.start_time, now);
        assert_eq!(call.system_id, UNKNOWN_ID);
        assert!(call.end_time.is_none());
        assert!(call.duration.abs() < f64::EPSILON);
    }

    #[test]
    fn api_call_duration_from_timestamps() {
        let now = Utc::now();
        let api: ApiCall = serde_json::from_value(serde_json::json!({
            "id": "c2",
            "start_time": 1_760_000_000,
            "stop_time": 1_760_000_006,
            "audio_url": "http://scanner:3000/api/calls/c2/audio"
        }))
        .unwrap();
        let call = Call::from_api(api, now);
        assert!((call.duration - 6.0).abs() < f64::EPSILON);
        assert!(matches!(call.audio, Some(AudioReference::Url(_))));
    }

    #[test]
    fn row_without_timestamp_is_rejected() {
        let row = CallRow {
            id: 5,
            date_time: RowTimestamp::Missing,
            system: 1,
            system_label: None,
            talkgroup: 2,
            talkgroup_label: Some("TG2".into()),
            talkgroup_name: None,
            tag: None,
            group: None,
            frequency: Some(851_000_000),
            frequencies: Vec::new(),
            patches: Vec::new(),
            sources: Vec::new(),
            audio_name: None,
            audio_type: None,
        };
        assert!(Call::try_from(row.clone()).is_err());

        let row = CallRow {
            date_time: RowTimestamp::Millis(1_760_000_000_000),
            ..row
        };
        let call = Call::try_from(row).unwrap();
        assert_eq!(call.talkgroup_name.as_deref(), Some("TG2"));
        assert_eq!(call.end_time, Some(call.start_time));
        assert_eq!(call.audio, Some(AudioReference::DatabaseRow(5)));
    }

    #[test]
    fn huge_lengths_are_clamped_on_both_sources() {
        use crate::model::call::MAX_CALL_DURATION_SECS;
        use scanfeed_api::rdio::FrequencyEntry;

        let row = CallRow {
            id: 6,
            date_time: RowTimestamp::Millis(1_760_000_000_000),
            system: 1,
            system_label: None,
            talkgroup: 2,
            talkgroup_label: None,
            talkgroup_name: None,
            tag: None,
            group: None,
            frequency: None,
            frequencies: vec![FrequencyEntry {
                pos: Some(0.0),
                len: Some(1e300),
                ..FrequencyEntry::default()
            }],
            patches: Vec::new(),
            sources: Vec::new(),
            audio_name: None,
            audio_type: None,
        };
        let call = Call::try_from(row).unwrap();
        assert!((call.duration - MAX_CALL_DURATION_SECS).abs() < f64::EPSILON);
        assert_eq!(
            call.end_time,
            Some(call.start_time + chrono::TimeDelta::days(1))
        );

        let api: ApiCall = serde_json::from_value(serde_json::json!({
            "id": "c7",
            "start_time": 1_760_000_000,
            "call_length": 1e300
        }))
        .unwrap();
        let mut call = Call::from_api(api, Utc::now());
        assert!((call.duration - MAX_CALL_DURATION_SECS).abs() < f64::EPSILON);
        call.finish_from_duration();
        assert!(call.end_time.is_some());
    }
}
