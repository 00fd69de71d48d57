// Trunk Recorder wire types
//
// Field names follow the JSON the server emits. Decoding is lenient:
// ids may arrive as numbers or strings, booleans as 0/1, and several
// fields carry aliases used by different server versions.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ── Timestamps ──────────────────────────────────────────────────────

/// A timestamp as sent on the wire: epoch (seconds or milliseconds) or text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireTimestamp {
    Epoch(f64),
    Text(String),
}

// ── Systems & talkgroups ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSystem {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, alias = "short_name", alias = "label")]
    pub name: Option<String>,
    #[serde(default, rename = "type", alias = "sys_type")]
    pub system_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiTalkgroup {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, alias = "system", deserialize_with = "opt_string_or_number")]
    pub system_id: Option<String>,
    #[serde(default, alias = "alpha_tag", alias = "label")]
    pub name: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
}

// ── Calls ───────────────────────────────────────────────────────────

/// A complete call record from `/api/calls` or a `call_start` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCall {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, alias = "system_id", deserialize_with = "opt_string_or_number")]
    pub system: Option<String>,
    #[serde(default, alias = "short_name")]
    pub system_name: Option<String>,
    #[serde(default, alias = "talkgroup_id", deserialize_with = "opt_string_or_number")]
    pub talkgroup: Option<String>,
    #[serde(default, alias = "talkgroup_alpha_tag")]
    pub talkgroup_name: Option<String>,
    #[serde(default, alias = "freq")]
    pub frequency: Option<f64>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub emergency: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub encrypted: bool,
    #[serde(default, deserialize_with = "lenient_units")]
    pub units: Vec<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub start_time: Option<WireTimestamp>,
    #[serde(default, alias = "end_time")]
    pub stop_time: Option<WireTimestamp>,
    #[serde(default, alias = "duration")]
    pub call_length: Option<f64>,
    #[serde(default)]
    pub audio_url: Option<String>,
}

/// A partial call from a `call_update` message. Absent fields are left
/// untouched when merged into the active call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiCallPatch {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, alias = "short_name")]
    pub system_name: Option<String>,
    #[serde(default, alias = "talkgroup_alpha_tag")]
    pub talkgroup_name: Option<String>,
    #[serde(default, alias = "freq")]
    pub frequency: Option<f64>,
    #[serde(default, deserialize_with = "opt_lenient_bool")]
    pub emergency: Option<bool>,
    #[serde(default, deserialize_with = "opt_lenient_bool")]
    pub encrypted: Option<bool>,
    #[serde(default, deserialize_with = "opt_lenient_units")]
    pub units: Option<Vec<String>>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default, alias = "end_time")]
    pub stop_time: Option<WireTimestamp>,
    #[serde(default, alias = "duration")]
    pub call_length: Option<f64>,
}

// ── Lenient field decoders ──────────────────────────────────────────

fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    let value = Value::deserialize(de)?;
    value_to_id(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("expected string or number, got {value}")))
}

pub(crate) fn opt_string_or_number<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Value>::deserialize(de)?.as_ref().and_then(value_to_id))
}

fn value_to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => Some(matches!(s.as_str(), "1" | "true" | "True" | "yes")),
        _ => None,
    }
}

fn lenient_bool<'de, D: Deserializer<'de>>(de: D) -> Result<bool, D::Error> {
    Ok(opt_lenient_bool(de)?.unwrap_or(false))
}

fn opt_lenient_bool<'de, D: Deserializer<'de>>(de: D) -> Result<Option<bool>, D::Error> {
    Ok(Option::<Value>::deserialize(de)?.as_ref().and_then(value_to_bool))
}

/// Units arrive as ids, or as source-list objects carrying a `src` field.
fn units_from_value(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(obj) => obj.get("src").or_else(|| obj.get("id")).and_then(value_to_id),
                other => value_to_id(other),
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn lenient_units<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<String>, D::Error> {
    Ok(opt_lenient_units(de)?.unwrap_or_default())
}

fn opt_lenient_units<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Vec<String>>, D::Error> {
    Ok(Option::<Value>::deserialize(de)?
        .as_ref()
        .map(units_from_value))
}
