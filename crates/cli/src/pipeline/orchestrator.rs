//! Pipeline orchestrator - coordinates all components.
//!
//! Sessions are processed one after another. Each one reads its two logs,
//! expands the sync counts into per-frame ticks, zips them with the decoded
//! video, reconciles against the command log and hands every joined sample
//! to a sink. The bucket sink is opened per session and released on every
//! exit path.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use contracts::{
    BucketerStats, ContractError, DatasetBlueprint, FrameEvent, FrameSource, SampleSink,
    SessionReport,
};
use dispatcher::{LabelBucketer, LogSink};
use ingestion::{discover_sessions, expand_sync_counts, read_command_log, read_sync_log, resize_frame, SessionPaths};
use observability::{record_session_failed, record_session_metrics};
use tracing::{debug, info, instrument, warn};

use super::PipelineStats;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root holding `<tag>/<index>/` sessions
    pub input_dir: PathBuf,

    /// Dataset root (None = dry run, samples are only logged)
    pub output_dir: Option<PathBuf>,

    /// Loaded and validated configuration
    pub blueprint: DatasetBlueprint,

    /// Stop at the first failing session
    pub fail_fast: bool,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Process every session under the input directory
    ///
    /// Session-local failures are logged and skipped unless `fail_fast` is
    /// set; output and configuration failures always abort.
    pub fn run<S: FrameSource + ?Sized>(&self, source: &S) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        let sessions = discover_sessions(&self.config.input_dir, &blueprint.session)
            .with_context(|| format!("Failed to scan {}", self.config.input_dir.display()))?;

        info!(
            input = %self.config.input_dir.display(),
            sessions = sessions.len(),
            dry_run = self.config.output_dir.is_none(),
            "Sessions discovered"
        );
        if sessions.is_empty() {
            warn!(input = %self.config.input_dir.display(), "No sessions found");
        }

        let mut stats = PipelineStats {
            sessions_found: sessions.len(),
            ..Default::default()
        };

        for session in &sessions {
            match self.run_session(session, source) {
                Ok(report) => {
                    record_session_metrics(&report);
                    info!(
                        session = %session,
                        frames = report.reconcile.frames,
                        matched = report.reconcile.matched,
                        unlabeled = report.reconcile.unlabeled + report.reconcile.tail_frames,
                        dropped_commands = report.reconcile.dropped_commands,
                        trailing_commands = report.reconcile.trailing_commands,
                        buckets = ?report.buckets.written,
                        "Session processed"
                    );
                    stats.runs.record_success(&report);
                }
                Err(e) => {
                    record_session_failed(e.kind());
                    if self.config.fail_fast || !e.is_session_local() {
                        return Err(e).with_context(|| format!("Session {session} failed"));
                    }
                    warn!(session = %session, path = %session.dir.display(), error = %e, "Skipping session");
                    stats.runs.record_failure(&session.to_string(), &e.to_string());
                }
            }
        }

        stats.duration = start_time.elapsed();
        info!(
            duration_secs = stats.duration.as_secs_f64(),
            fps = format!("{:.2}", stats.fps()),
            "Pipeline complete"
        );

        Ok(stats)
    }

    /// One session into a fresh sink; the sink is closed whatever happens
    fn run_session<S: FrameSource + ?Sized>(
        &self,
        session: &SessionPaths,
        source: &S,
    ) -> Result<SessionReport, ContractError> {
        if let Some(missing) = session.missing_files().first() {
            return Err(ContractError::input_not_found(*missing));
        }

        let blueprint = &self.config.blueprint;
        match &self.config.output_dir {
            Some(root) => {
                let mut bucketer = LabelBucketer::open(root, &blueprint.commands, &blueprint.output)?;
                // On error the bucketer is dropped here, which closes every bucket
                let mut report = process_session(session, blueprint, source, &mut bucketer)?;
                report.buckets = bucketer.finish()?;
                Ok(report)
            }
            None => {
                let mut sink = LogSink::new(format!("dry-run:{session}"), &blueprint.commands);
                let mut report = process_session(session, blueprint, source, &mut sink)?;
                sink.close()?;
                report.buckets = sink.into_stats();
                Ok(report)
            }
        }
    }
}

/// Decode, reconcile and route one session into `sink`
///
/// The returned report has empty bucket counters; the caller owns the sink
/// and fills them in.
#[instrument(name = "process_session", skip_all, fields(session = %session))]
pub fn process_session<S, K>(
    session: &SessionPaths,
    blueprint: &DatasetBlueprint,
    source: &S,
    sink: &mut K,
) -> Result<SessionReport, ContractError>
where
    S: FrameSource + ?Sized,
    K: SampleSink + ?Sized,
{
    let counts = read_sync_log(&session.sync)?;
    let commands = read_command_log(&session.commands)?;
    let expected_frames: u64 = counts.iter().map(|c| c.frame_count).sum();

    debug!(
        ticks = counts.len(),
        expected_frames,
        commands = commands.len(),
        "Session logs loaded"
    );

    let frames = source.open(&session.video)?;

    // zip stops at the shorter side: frames beyond the sync log are never decoded
    let events = expand_sync_counts(&counts)
        .zip(frames)
        .map(|(tick, frame)| frame.map(|f| FrameEvent::new(tick, f)));

    let frame_size = blueprint.output.frame_size;
    let mut reconciler = sync_engine::reconcile(events, commands, blueprint.reconcile.tail_policy);
    for sample in reconciler.by_ref() {
        let sample = sample?.map_frame(|f| resize_frame(&f, frame_size));
        sink.write(&sample)?;
    }
    sink.flush()?;

    let stats = reconciler.stats();
    let missing_frames = expected_frames.saturating_sub(stats.frames);
    if missing_frames > 0 {
        warn!(
            session = %session,
            expected_frames,
            decoded = stats.frames,
            "Video ended before the sync log"
        );
    }

    Ok(SessionReport {
        session: session.to_string(),
        reconcile: stats,
        buckets: BucketerStats::default(),
        missing_frames,
    })
}
