//! Live event stream handler.
//!
//! Push-capable sources deliver call events directly. Polling-only
//! sources are followed by diffing successive feed snapshots, so the
//! output looks the same either way.

use std::collections::HashSet;
use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

use scanfeed_core::{CallFilter, ConnectionState, Coordinator, FeedConfig, FeedEvent, FeedState};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

// ── Snapshot diffing ────────────────────────────────────────────────

/// Call ids already reported, so each start and end prints once.
#[derive(Debug, Default)]
struct SeenCalls {
    started: HashSet<String>,
    ended: HashSet<String>,
}

impl SeenCalls {
    /// Remember everything in `state` without reporting it.
    fn prime(state: &FeedState) -> Self {
        Self {
            started: state.active_calls.keys().cloned().collect(),
            ended: state.call_history.iter().map(|c| c.id.clone()).collect(),
        }
    }

    /// Events for calls that appeared since the last snapshot, oldest first.
    fn diff(&mut self, state: &FeedState) -> Vec<FeedEvent> {
        let mut events = Vec::new();
        for call in state.active_calls.values() {
            if self.started.insert(call.id.clone()) {
                events.push(FeedEvent::CallStarted(call.clone()));
            }
        }
        for call in state.call_history.iter().rev() {
            if self.ended.insert(call.id.clone()) {
                self.started.insert(call.id.clone());
                events.push(FeedEvent::CallEnded(call.clone()));
            }
        }
        // History is bounded; forget ids that scrolled out.
        let live: HashSet<&str> = state
            .active_calls
            .keys()
            .map(String::as_str)
            .chain(state.call_history.iter().map(|c| c.id.as_str()))
            .collect();
        self.started.retain(|id| live.contains(id.as_str()));
        self.ended.retain(|id| live.contains(id.as_str()));
        events
    }
}

// ── Rendering ───────────────────────────────────────────────────────

fn render_event(event: &FeedEvent, format: &OutputFormat, color: bool) -> String {
    let call = event.call();
    match format {
        OutputFormat::Table => {
            let (label, length) = match event {
                FeedEvent::CallStarted(_) => ("START", "live".to_owned()),
                FeedEvent::CallEnded(_) => ("END  ", output::format_duration(call.duration)),
            };
            let label = if !color {
                label.to_owned()
            } else if matches!(event, FeedEvent::CallStarted(_)) {
                label.green().to_string()
            } else {
                label.dimmed().to_string()
            };
            let flags = output::call_flags(call.emergency, call.encrypted, color);
            format!(
                "{} {label} {:<12} {:<28} {:>8} {flags}",
                output::format_time(&call.start_time),
                call.system_name.as_deref().unwrap_or(&call.system_id),
                call.talkgroup_label(),
                length,
            )
            .trim_end()
            .to_owned()
        }
        OutputFormat::Json | OutputFormat::JsonCompact => output::render_json_compact(event),
        OutputFormat::Yaml => format!("---\n{}", output::render_yaml(event).trim_end()),
        OutputFormat::Plain => format!("{} {}", event.name(), call.id),
    }
}

fn filter_from(args: &WatchArgs) -> CallFilter {
    let filter = args
        .system
        .clone()
        .map_or_else(CallFilter::default, CallFilter::for_system);
    match args.talkgroups {
        Some(ref ids) => filter.with_talkgroups(ids.iter().cloned()),
        None => filter,
    }
}

fn spinner(global: &GlobalOpts) -> Option<ProgressBar> {
    if global.quiet || !std::io::stderr().is_terminal() {
        return None;
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.set_message("Connecting to call source...");
    bar.enable_steady_tick(Duration::from_millis(100));
    Some(bar)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(feed: FeedConfig, args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let push = feed.push_enabled();
    let coordinator = Coordinator::new(feed)?;

    let bar = spinner(global);
    let connected = coordinator.connect().await;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    if let Err(e) = connected {
        coordinator.disconnect().await;
        return Err(e.into());
    }

    let filter = filter_from(&args);
    let color = output::should_color(&global.color);
    let emit = |event: &FeedEvent| {
        if args.ended_only && matches!(event, FeedEvent::CallStarted(_)) {
            return;
        }
        output::print_output(&render_event(event, &global.output, color), global.quiet);
    };

    if !global.quiet {
        eprintln!(
            "Watching {} ({}); Ctrl-C to stop",
            coordinator.config().source.location(),
            if push { "push" } else { "polling" }
        );
    }

    let mut state_rx = coordinator.connection_state();
    let mut events = coordinator.events().with_filter(filter.clone());
    let mut stream = coordinator.subscribe();
    let mut seen = SeenCalls::prime(stream.current());

    let result = loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => break Ok(()),
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break Err(CliError::Disconnected);
                }
                let state = state_rx.borrow_and_update().clone();
                match state {
                    ConnectionState::Unavailable { reason } => {
                        tracing::warn!(%reason, "call source unavailable, retrying");
                    }
                    ConnectionState::Connected => tracing::info!("call source reachable again"),
                    _ => {}
                }
            }
            event = events.recv(), if push => match event {
                Some(event) => emit(&event),
                None => break Err(CliError::Disconnected),
            },
            state = stream.changed(), if !push => match state {
                Some(state) => {
                    for event in seen.diff(&state) {
                        if filter.matches(event.call()) {
                            emit(&event);
                        }
                    }
                }
                None => break Err(CliError::Disconnected),
            },
        }
    };

    coordinator.disconnect().await;
    result
}
