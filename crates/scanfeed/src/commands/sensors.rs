//! Sensor readings handler.

use std::fmt::Write as _;

use tabled::Tabled;

use scanfeed_core::{FeedState, Sensor, SensorReading};

use crate::cli::{GlobalOpts, SensorsArgs};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct SensorRow {
    #[tabled(rename = "Sensor")]
    unique_id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Attributes")]
    attributes: String,
}

impl From<&SensorReading> for SensorRow {
    fn from(r: &SensorReading) -> Self {
        let mut attributes = String::new();
        for (key, value) in &r.attributes {
            if !attributes.is_empty() {
                attributes.push('\n');
            }
            let _ = write!(attributes, "{key}: {value}");
        }
        Self {
            unique_id: r.unique_id.clone(),
            name: r.name.clone(),
            value: r.value.to_string(),
            attributes,
        }
    }
}

pub fn handle(state: &FeedState, args: &SensorsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let readings: Vec<SensorReading> = Sensor::all(&args.instance)
        .iter()
        .map(|sensor| sensor.read(state))
        .collect();
    let out = output::render_list(&global.output, &readings, |r| SensorRow::from(r), |r| {
        format!("{}={}", r.unique_id, r.value)
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
