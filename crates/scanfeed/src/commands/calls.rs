//! Call list and detail handlers.

use tabled::Tabled;

use scanfeed_core::{Call, CallQuery, FeedState};

use crate::cli::{CallsArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
pub(crate) struct CallRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Started")]
    started: String,
    #[tabled(rename = "System")]
    system: String,
    #[tabled(rename = "Talkgroup")]
    talkgroup: String,
    #[tabled(rename = "Length")]
    length: String,
    #[tabled(rename = "MHz")]
    frequency: String,
    #[tabled(rename = "Units")]
    units: String,
    #[tabled(rename = "Flags")]
    flags: String,
}

impl CallRow {
    pub(crate) fn new(call: &Call, color: bool) -> Self {
        Self {
            id: call.id.clone(),
            started: output::format_time(&call.start_time),
            system: call
                .system_name
                .clone()
                .unwrap_or_else(|| call.system_id.clone()),
            talkgroup: call.talkgroup_label().to_owned(),
            length: if call.has_ended() {
                output::format_duration(call.duration)
            } else {
                "live".into()
            },
            frequency: output::format_frequency(call.frequency),
            units: call.units.join(","),
            flags: output::call_flags(call.emergency, call.encrypted, color),
        }
    }
}

fn detail(call: &Call) -> String {
    let mut lines = vec![
        format!("ID:         {}", call.id),
        format!(
            "System:     {} ({})",
            call.system_name.as_deref().unwrap_or("-"),
            call.system_id
        ),
        format!(
            "Talkgroup:  {} ({})",
            call.talkgroup_name.as_deref().unwrap_or("-"),
            call.talkgroup_id
        ),
        format!("Started:    {}", output::format_time(&call.start_time)),
        format!(
            "Ended:      {}",
            call.end_time
                .as_ref()
                .map_or_else(|| "in progress".into(), output::format_time)
        ),
        format!("Length:     {}", output::format_duration(call.duration)),
        format!("Frequency:  {} MHz", output::format_frequency(call.frequency)),
        format!("Emergency:  {}", call.emergency),
        format!("Encrypted:  {}", call.encrypted),
    ];
    if !call.units.is_empty() {
        lines.push(format!("Units:      {}", call.units.join(", ")));
    }
    if let Some(ref transcript) = call.transcript {
        lines.push(format!("Transcript: {transcript}"));
    }
    lines.join("\n")
}

// ── Handlers ────────────────────────────────────────────────────────

pub fn list(state: &FeedState, args: &CallsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let query = CallQuery {
        system_id: args.system.clone(),
        talkgroup_id: args.talkgroup.clone(),
        active_only: args.active,
        limit: args.limit,
    };
    let calls = state.query_calls(&query);
    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &calls,
        |c| CallRow::new(c, color),
        |c| c.id.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

pub fn show(state: &FeedState, id: &str, global: &GlobalOpts) -> Result<(), CliError> {
    let call = state.find_call(id).ok_or_else(|| CliError::NotFound {
        resource_type: "call".into(),
        identifier: id.into(),
        list_command: "calls".into(),
    })?;
    let out = output::render_single(&global.output, call, detail, |c| c.id.clone());
    output::print_output(&out, global.quiet);
    Ok(())
}
