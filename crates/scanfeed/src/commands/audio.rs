//! Audio download handler.

use std::path::PathBuf;

use bytesize::ByteSize;

use scanfeed_core::{Coordinator, FeedConfig, SourceConfig};

use crate::cli::{AudioArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

fn recording_not_found(id: &str) -> CliError {
    CliError::NotFound {
        resource_type: "recording".into(),
        identifier: id.into(),
        list_command: "calls".into(),
    }
}

pub async fn handle(feed: FeedConfig, args: AudioArgs, global: &GlobalOpts) -> Result<(), CliError> {
    if args.url {
        if matches!(feed.source, SourceConfig::RdioScanner { .. }) {
            return Err(CliError::Validation {
                field: "url".into(),
                reason: "rdio-scanner keeps recordings in its database; download with --file instead"
                    .into(),
            });
        }
        let id = args.id.clone();
        let url = Coordinator::oneshot(feed, |c| async move { Ok(c.audio_url(&id)) }).await?;
        let url = url.ok_or_else(|| recording_not_found(&args.id))?;
        output::print_output(url.as_str(), global.quiet);
        return Ok(());
    }

    let id = args.id.clone();
    let clip = Coordinator::oneshot(feed, |c| async move { c.audio(&id).await })
        .await?
        .ok_or_else(|| recording_not_found(&args.id))?;

    let path = args.file.unwrap_or_else(|| {
        clip.filename
            .clone()
            .map_or_else(|| PathBuf::from(format!("{}.{}", args.id, clip.extension())), PathBuf::from)
    });
    tokio::fs::write(&path, &clip.data).await?;
    tracing::info!(call = %args.id, path = %path.display(), bytes = clip.len(), "recording saved");

    if !global.quiet {
        eprintln!(
            "Saved {} ({}, {})",
            path.display(),
            ByteSize(u64::try_from(clip.len()).unwrap_or(u64::MAX)),
            clip.content_type
        );
    }
    Ok(())
}
