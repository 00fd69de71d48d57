//! Statistics command handler.

use std::fmt::Write as _;

use tabled::{Table, Tabled, settings::Style};

use scanfeed_core::{FeedState, Statistics, StatsPeriod};

use crate::cli::{GlobalOpts, StatsArgs, StatsPeriodArg};
use crate::error::CliError;
use crate::output;

fn period(arg: StatsPeriodArg) -> StatsPeriod {
    match arg {
        StatsPeriodArg::Today => StatsPeriod::Today,
        StatsPeriodArg::Week => StatsPeriod::Week,
        StatsPeriodArg::Month => StatsPeriod::Month,
        StatsPeriodArg::Total => StatsPeriod::Total,
    }
}

#[derive(Tabled)]
struct TopRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "System")]
    system: String,
    #[tabled(rename = "Talkgroup")]
    talkgroup: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Calls")]
    count: usize,
}

fn detail(stats: &Statistics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Period:            {}", stats.period);
    let _ = writeln!(out, "Calls:             {}", stats.total_calls);
    let _ = writeln!(
        out,
        "Airtime:           {}",
        output::format_duration(stats.total_airtime)
    );
    let _ = writeln!(out, "Talkgroups heard:  {}", stats.unique_talkgroups);
    let _ = writeln!(out, "Emergency calls:   {}", stats.emergency_calls);
    let _ = writeln!(out, "Encrypted calls:   {}", stats.encrypted_calls);
    let _ = writeln!(out, "Active now:        {}", stats.active_calls);
    let _ = write!(out, "Active systems:    {}", stats.active_systems);

    if !stats.top_talkgroups.is_empty() {
        let rows: Vec<TopRow> = stats
            .top_talkgroups
            .iter()
            .enumerate()
            .map(|(i, t)| TopRow {
                rank: i + 1,
                system: t.system_id.clone(),
                talkgroup: t.talkgroup_id.clone(),
                name: t.name.clone(),
                count: t.count,
            })
            .collect();
        let _ = write!(out, "\n\nTop talkgroups\n{}", Table::new(rows).with(Style::rounded()));
    }
    out
}

pub fn handle(state: &FeedState, args: &StatsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let stats = state.statistics(period(args.period), args.system.as_deref());
    let out = output::render_single(&global.output, &stats, detail, |s| s.total_calls.to_string());
    output::print_output(&out, global.quiet);
    Ok(())
}
