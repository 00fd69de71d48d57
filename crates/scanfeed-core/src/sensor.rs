// ── Sensor table ──
//
// Feed values exposed as named sensors. Each sensor is one row in a
// static table; a single `Sensor` type renders any row for a named
// feed instance.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::store::FeedState;

/// Current value of a sensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SensorValue {
    Count(usize),
    Text(String),
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

type AttributesFn = fn(&FeedState) -> BTreeMap<&'static str, String>;

/// One row of the sensor table.
#[derive(Debug)]
pub struct SensorDescription {
    pub key: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub value: fn(&FeedState) -> SensorValue,
    pub attributes: Option<AttributesFn>,
}

pub static SENSORS: &[SensorDescription] = &[
    SensorDescription {
        key: "active_calls",
        name: "Active Calls",
        icon: "mdi:radio-tower",
        value: |state| SensorValue::Count(state.active_call_count()),
        attributes: None,
    },
    SensorDescription {
        key: "total_calls",
        name: "Total Calls",
        icon: "mdi:counter",
        value: |state| SensorValue::Count(state.total_call_count()),
        attributes: Some(latest_call_attributes),
    },
    SensorDescription {
        key: "systems",
        name: "Systems",
        icon: "mdi:radio",
        value: |state| SensorValue::Count(state.systems.len()),
        attributes: None,
    },
    SensorDescription {
        key: "talkgroups",
        name: "Talkgroups",
        icon: "mdi:account-group",
        value: |state| SensorValue::Count(state.talkgroup_count()),
        attributes: None,
    },
    SensorDescription {
        key: "status",
        name: "Status",
        icon: "mdi:database",
        value: |state| SensorValue::Text(state.status.to_string()),
        attributes: None,
    },
];

fn latest_call_attributes(state: &FeedState) -> BTreeMap<&'static str, String> {
    let mut attrs = BTreeMap::new();
    if let Some(latest) = state.latest_call() {
        attrs.insert("latest_talkgroup", latest.talkgroup_label().to_owned());
        attrs.insert("latest_time", latest.start_time.to_rfc3339());
        attrs.insert("latest_length", format!("{:.1}", latest.duration));
    }
    attrs
}

/// A sensor row bound to a feed instance name.
#[derive(Debug, Clone, Copy)]
pub struct Sensor<'a> {
    instance: &'a str,
    description: &'static SensorDescription,
}

/// Rendered state of one sensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorReading {
    pub unique_id: String,
    pub name: String,
    pub icon: &'static str,
    pub value: SensorValue,
    pub attributes: BTreeMap<&'static str, String>,
}

impl<'a> Sensor<'a> {
    pub fn new(instance: &'a str, description: &'static SensorDescription) -> Self {
        Self {
            instance,
            description,
        }
    }

    /// Every sensor in the table for `instance`.
    pub fn all(instance: &'a str) -> Vec<Self> {
        SENSORS.iter().map(|d| Self::new(instance, d)).collect()
    }

    pub fn unique_id(&self) -> String {
        format!("{}_{}", self.instance, self.description.key)
    }

    pub fn name(&self) -> String {
        format!("{} {}", self.instance, self.description.name)
    }

    pub fn read(&self, state: &FeedState) -> SensorReading {
        SensorReading {
            unique_id: self.unique_id(),
            name: self.name(),
            icon: self.description.icon,
            value: (self.description.value)(state),
            attributes: self
                .description
                .attributes
                .map(|f| f(state))
                .unwrap_or_default(),
        }
    }
}
