//! System and talkgroup handlers.

use tabled::Tabled;

use scanfeed_core::{FeedState, SystemSummary, TalkgroupActivity};

use crate::cli::{GlobalOpts, TalkgroupsArgs};
use crate::error::CliError;
use crate::output;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct SystemRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    system_type: String,
    #[tabled(rename = "Talkgroups")]
    talkgroups: usize,
    #[tabled(rename = "Active")]
    active: usize,
}

impl From<&SystemSummary> for SystemRow {
    fn from(s: &SystemSummary) -> Self {
        Self {
            id: s.system.id.clone(),
            name: s.system.name.clone(),
            system_type: s.system.system_type.clone(),
            talkgroups: s.talkgroups.len(),
            active: s.active_calls,
        }
    }
}

#[derive(Tabled)]
struct TalkgroupRow {
    #[tabled(rename = "System")]
    system: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Tag")]
    tag: String,
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "Active")]
    active: usize,
    #[tabled(rename = "Recent")]
    recent: usize,
}

impl From<&TalkgroupActivity> for TalkgroupRow {
    fn from(a: &TalkgroupActivity) -> Self {
        let t = &a.talkgroup;
        Self {
            system: t.system_id.clone(),
            id: t.id.clone(),
            name: t.name.clone().unwrap_or_default(),
            tag: t.tag.clone().unwrap_or_default(),
            group: t.group.clone().unwrap_or_default(),
            active: a.active_calls,
            recent: a.recent_calls,
        }
    }
}

// ── Handlers ────────────────────────────────────────────────────────

pub fn list_systems(state: &FeedState, global: &GlobalOpts) -> Result<(), CliError> {
    let summaries = state.system_summaries();
    let out = output::render_list(
        &global.output,
        &summaries,
        |s| SystemRow::from(s),
        |s| s.system.id.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

pub fn list_talkgroups(
    state: &FeedState,
    args: &TalkgroupsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if let Some(ref system) = args.system {
        if !state.systems.contains_key(system) {
            return Err(CliError::NotFound {
                resource_type: "system".into(),
                identifier: system.clone(),
                list_command: "systems".into(),
            });
        }
    }
    let activity = state.talkgroup_activity(args.system.as_deref());
    let out = output::render_list(
        &global.output,
        &activity,
        |a| TalkgroupRow::from(a),
        |a| format!("{}/{}", a.talkgroup.system_id, a.talkgroup.id),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
