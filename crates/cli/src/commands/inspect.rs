//! `inspect` command implementation.
//!
//! Reconciles the logs of every session with placeholder frames, so the
//! alignment can be checked without decoding any video.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use contracts::{ContractError, DatasetBlueprint, FrameEvent, ReconcileStats};
use ingestion::{discover_sessions, expand_sync_counts, read_command_log, read_sync_log, SessionPaths};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::InspectArgs;

/// Per-session inspection result for JSON output
#[derive(Debug, Serialize)]
struct SessionInspection {
    session: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<ReconcileStats>,
    /// Frames per command label, `-` for frames without a command
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    labels: BTreeMap<String, u64>,
    /// Labels outside the configured vocabulary
    #[serde(skip_serializing_if = "Vec::is_empty")]
    unknown_labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Execute the `inspect` command
pub fn run_inspect(args: &InspectArgs) -> Result<()> {
    let blueprint = config_loader::ConfigLoader::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    let sessions = discover_sessions(&args.input_dir, &blueprint.session)?;
    info!(input = %args.input_dir.display(), sessions = sessions.len(), "Inspecting sessions");

    let results: Vec<SessionInspection> = sessions
        .iter()
        .map(|session| match inspect_session(session, &blueprint) {
            Ok(result) => result,
            Err(e) => {
                warn!(session = %session, error = %e, "Session cannot be reconciled");
                SessionInspection {
                    session: session.to_string(),
                    stats: None,
                    labels: BTreeMap::new(),
                    unknown_labels: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        })
        .collect();

    if args.json {
        let json = serde_json::to_string_pretty(&results)
            .context("Failed to serialize inspection result")?;
        println!("{}", json);
    } else {
        print_inspection(&results);
    }

    Ok(())
}

fn inspect_session(
    session: &SessionPaths,
    blueprint: &DatasetBlueprint,
) -> Result<SessionInspection, ContractError> {
    let counts = read_sync_log(&session.sync)?;
    let commands = read_command_log(&session.commands)?;

    let frames = expand_sync_counts(&counts).map(|tick| FrameEvent::new(tick, ()));
    let (samples, stats) =
        sync_engine::reconcile_all(frames, commands, blueprint.reconcile.tail_policy)?;

    let mut labels = BTreeMap::new();
    let mut unknown_labels = Vec::new();
    for sample in &samples {
        let label = sample.command.as_deref().unwrap_or("-");
        *labels.entry(label.to_string()).or_insert(0) += 1;

        if let Some(label) = sample.command.as_deref() {
            if blueprint.commands.lookup(label).is_none() && !unknown_labels.iter().any(|l| l == label) {
                unknown_labels.push(label.to_string());
            }
        }
    }

    Ok(SessionInspection {
        session: session.to_string(),
        stats: Some(stats),
        labels,
        unknown_labels,
        error: None,
    })
}

fn print_inspection(results: &[SessionInspection]) {
    println!("\n=== Session Inspection ===\n");
    if results.is_empty() {
        println!("No sessions found.");
    }

    for result in results {
        match (&result.stats, &result.error) {
            (Some(stats), _) => {
                println!("{}", result.session);
                println!(
                    "  Frames: {} (matched {}, unlabeled {}, tail {})",
                    stats.frames, stats.matched, stats.unlabeled, stats.tail_frames
                );
                println!(
                    "  Commands dropped: {} stale, {} trailing",
                    stats.dropped_commands, stats.trailing_commands
                );
                println!("  Match rate: {:.1}%", stats.match_rate() * 100.0);
                if !result.labels.is_empty() {
                    let histogram: Vec<String> = result
                        .labels
                        .iter()
                        .map(|(label, count)| format!("{label}={count}"))
                        .collect();
                    println!("  Labels: {}", histogram.join(", "));
                }
                if !result.unknown_labels.is_empty() {
                    println!("  ⚠ Unknown labels: {}", result.unknown_labels.join(", "));
                }
            }
            (None, Some(error)) => {
                println!("{}", result.session);
                println!("  ✗ {}", error);
            }
            (None, None) => {}
        }
        println!();
    }
}
