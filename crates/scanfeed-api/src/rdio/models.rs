// Row types for the Rdio Scanner SQLite schema.
//
// Several call columns hold JSON text (`frequencies`, `patches`, `sources`).
// Those are decoded with `decode_json_column`, which degrades to the empty
// value on malformed input so one bad row never poisons a whole query.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

// ── Timestamps ───────────────────────────────────────────────────────

/// Raw `dateTime` column value. Older databases store epoch milliseconds,
/// newer ones store text.
#[derive(Debug, Clone, PartialEq)]
pub enum RowTimestamp {
    Millis(i64),
    Text(String),
    Missing,
}

impl RowTimestamp {
    pub(crate) fn from_sql(value: rusqlite::types::ValueRef<'_>) -> Self {
        use rusqlite::types::ValueRef;
        match value {
            ValueRef::Integer(ms) => Self::Millis(ms),
            #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
            ValueRef::Real(ms) => Self::Millis(ms as i64),
            ValueRef::Text(raw) => Self::Text(String::from_utf8_lossy(raw).into_owned()),
            ValueRef::Null | ValueRef::Blob(_) => Self::Missing,
        }
    }
}

// ── JSON columns ─────────────────────────────────────────────────────

/// One entry of the `frequencies` column: a frequency hop within the call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrequencyEntry {
    #[serde(default)]
    pub freq: Option<i64>,
    /// Offset into the recording, seconds.
    #[serde(default)]
    pub pos: Option<f64>,
    /// Length of this segment, seconds.
    #[serde(default)]
    pub len: Option<f64>,
    #[serde(default)]
    pub error_count: Option<i64>,
    #[serde(default)]
    pub spike_count: Option<i64>,
}

/// One entry of the `sources` column: a unit keyed up during the call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SourceEntry {
    #[serde(default)]
    pub pos: Option<f64>,
    #[serde(default)]
    pub src: Option<Value>,
    #[serde(default)]
    pub emergency: Option<Value>,
    #[serde(default)]
    pub tag: Option<String>,
}

impl SourceEntry {
    /// Unit identifier as text, whether stored as number or string.
    pub fn unit_id(&self) -> Option<String> {
        match self.src.as_ref()? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Whether this unit flagged an emergency (`true`, `1`, `"true"`).
    pub fn is_emergency(&self) -> bool {
        match &self.emergency {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_i64().is_some_and(|v| v != 0),
            Some(Value::String(s)) => matches!(s.to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
            _ => false,
        }
    }
}

/// Decode a JSON text column, falling back to `T::default()` when the
/// column is NULL, empty or malformed.
pub fn decode_json_column<T>(raw: Option<&str>, column: &str, call_id: i64) -> T
where
    T: DeserializeOwned + Default,
{
    let Some(text) = raw.map(str::trim).filter(|t| !t.is_empty()) else {
        return T::default();
    };
    match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(call_id, column, error = %e, "malformed JSON column, using empty value");
            T::default()
        }
    }
}

// ── Rows ─────────────────────────────────────────────────────────────

/// A call row joined with its system and talkgroup labels.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRow {
    pub id: i64,
    pub date_time: RowTimestamp,
    pub system: i64,
    pub system_label: Option<String>,
    pub talkgroup: i64,
    pub talkgroup_label: Option<String>,
    pub talkgroup_name: Option<String>,
    pub tag: Option<String>,
    pub group: Option<String>,
    pub frequency: Option<i64>,
    pub frequencies: Vec<FrequencyEntry>,
    pub patches: Vec<i64>,
    pub sources: Vec<SourceEntry>,
    pub audio_name: Option<String>,
    pub audio_type: Option<String>,
}

impl CallRow {
    /// Recording length in seconds: the furthest `pos + len` across the
    /// frequency list, or zero when the list is empty.
    pub fn duration_secs(&self) -> f64 {
        self.frequencies
            .iter()
            .map(|f| f.pos.unwrap_or(0.0) + f.len.unwrap_or(0.0))
            .fold(0.0, f64::max)
    }

    /// Distinct unit ids in order of first appearance.
    pub fn unit_ids(&self) -> Vec<String> {
        let mut units: Vec<String> = Vec::new();
        for id in self.sources.iter().filter_map(SourceEntry::unit_id) {
            if !units.contains(&id) {
                units.push(id);
            }
        }
        units
    }

    pub fn is_emergency(&self) -> bool {
        self.sources.iter().any(SourceEntry::is_emergency)
    }

    /// Primary frequency: the `frequency` column, else the first hop.
    pub fn primary_frequency(&self) -> Option<i64> {
        self.frequency
            .or_else(|| self.frequencies.iter().find_map(|f| f.freq))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SystemRow {
    pub id: i64,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TalkgroupRow {
    pub system_id: i64,
    pub id: i64,
    pub label: Option<String>,
    pub name: Option<String>,
    pub tag: Option<String>,
    pub group: Option<String>,
}

/// Stored recording for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioRow {
    pub data: Vec<u8>,
    pub mime_type: String,
    pub file_name: Option<String>,
}
