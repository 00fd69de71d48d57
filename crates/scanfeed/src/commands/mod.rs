//! Command dispatch: bridges CLI args -> core queries -> output formatting.

pub mod audio;
pub mod calls;
pub mod config_cmd;
pub mod history;
pub mod sensors;
pub mod stats;
pub mod systems;
pub mod util;
pub mod watch;

use scanfeed_core::FeedConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a source-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, feed: FeedConfig, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Watch(args) => watch::handle(feed, args, global).await,
        Command::Audio(args) => audio::handle(feed, args, global).await,
        cmd => {
            let state = util::fetch_snapshot(feed).await?;
            match cmd {
                Command::Calls(args) => calls::list(&state, &args, global),
                Command::Call { id } => calls::show(&state, &id, global),
                Command::History(args) => history::handle(&state, &args, global),
                Command::Stats(args) => stats::handle(&state, &args, global),
                Command::Systems => systems::list_systems(&state, global),
                Command::Talkgroups(args) => systems::list_talkgroups(&state, &args, global),
                Command::Sensors(args) => sensors::handle(&state, &args, global),
                Command::Watch(_)
                | Command::Audio(_)
                | Command::Config(_)
                | Command::Completions(_) => Err(CliError::Internal(
                    "command is not dispatched against a feed snapshot".into(),
                )),
            }
        }
    }
}
