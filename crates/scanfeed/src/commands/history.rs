//! History search handler.

use tabled::{Table, settings::Style};

use scanfeed_core::{FeedState, HistoryPage, HistoryQuery};

use crate::cli::{GlobalOpts, HistoryArgs};
use crate::error::CliError;
use crate::output;

use super::calls::CallRow;
use super::util;

fn page_table(page: &HistoryPage, color: bool) -> String {
    if page.calls.is_empty() {
        return format!("No calls match ({} in history).", page.total);
    }
    let rows: Vec<CallRow> = page.calls.iter().map(|c| CallRow::new(c, color)).collect();
    let first = page.offset + 1;
    let last = page.offset + page.calls.len();
    format!(
        "{}\nShowing {first}-{last} of {}",
        Table::new(rows).with(Style::rounded()),
        page.total
    )
}

pub fn handle(state: &FeedState, args: &HistoryArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (start, end) = util::parse_time_range(args.start.as_deref(), args.end.as_deref())?;
    let query = HistoryQuery {
        start,
        end,
        system_id: args.system.clone(),
        talkgroup_id: args.talkgroup.clone(),
        search: args.search.clone().filter(|s| !s.is_empty()),
        offset: args.offset,
        limit: args.limit,
    };
    let page = state.query_history(&query);
    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &page,
        |p| page_table(p, color),
        |p| {
            p.calls
                .iter()
                .map(|c| c.id.clone())
                .collect::<Vec<_>>()
                .join("\n")
        },
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
