//! Frame/command stream reconciler.

use std::cmp::Ordering;

use contracts::{
    CommandEvent, ContractError, FrameEvent, JoinedSample, ReconcileStats, TailPolicy, Telemetry,
    Tick,
};
use tracing::{debug, trace};

/// Position of the pending command relative to the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Command is older than the frame: drop it, advance commands
    CommandBehind,
    /// Command is newer than the frame: frame goes out unlabeled, advance frames
    CommandAhead,
    /// Same tick: join, advance both
    Tied,
}

impl Step {
    #[inline]
    fn classify(command_tick: Tick, frame_tick: Tick) -> Self {
        match command_tick.cmp(&frame_tick) {
            Ordering::Less => Step::CommandBehind,
            Ordering::Greater => Step::CommandAhead,
            Ordering::Equal => Step::Tied,
        }
    }
}

/// Merge-join of a tick-expanded frame stream with a per-tick command stream
///
/// Yields exactly one [`JoinedSample`] per frame, in frame order. Commands
/// that fall behind the current frame are dropped; frames ahead of the
/// command stream go out with no command and the last-seen telemetry. The
/// merge ends when the frame stream ends; leftover commands are discarded.
///
/// Frame-stream errors are passed through and end the stream.
#[derive(Debug)]
pub struct Reconciler<FI, CI> {
    frames: FI,
    commands: CI,
    policy: TailPolicy,
    pending_command: Option<CommandEvent>,
    commands_exhausted: bool,
    last_telemetry: Telemetry,
    last_frame_tick: Option<Tick>,
    last_command_tick: Option<Tick>,
    done: bool,
    stats: ReconcileStats,
}

impl<FI, CI, F> Reconciler<FI, CI>
where
    FI: Iterator<Item = Result<FrameEvent<F>, ContractError>>,
    CI: Iterator<Item = CommandEvent>,
{
    pub fn new<FS, CS>(frames: FS, commands: CS, policy: TailPolicy) -> Self
    where
        FS: IntoIterator<IntoIter = FI>,
        CS: IntoIterator<IntoIter = CI>,
    {
        Self {
            frames: frames.into_iter(),
            commands: commands.into_iter(),
            policy,
            pending_command: None,
            commands_exhausted: false,
            last_telemetry: Telemetry::default(),
            last_frame_tick: None,
            last_command_tick: None,
            done: false,
            stats: ReconcileStats::default(),
        }
    }

    /// Counters so far; final once the iterator returned `None`
    pub fn stats(&self) -> ReconcileStats {
        self.stats
    }

    /// Make sure a command is pending unless the stream is exhausted
    fn pull_command(&mut self) -> Result<(), ContractError> {
        if self.pending_command.is_some() || self.commands_exhausted {
            return Ok(());
        }

        match self.commands.next() {
            Some(cmd) => {
                if let Some(previous) = self.last_command_tick {
                    if cmd.tick <= previous {
                        return Err(ContractError::TickRegression {
                            stream: "command",
                            previous,
                            tick: cmd.tick,
                        });
                    }
                }
                self.last_command_tick = Some(cmd.tick);
                self.pending_command = Some(cmd);
            }
            None => {
                debug!(
                    last_frame_tick = ?self.last_frame_tick,
                    "Command stream exhausted"
                );
                self.commands_exhausted = true;
            }
        }
        Ok(())
    }

    fn emit(&mut self, event: FrameEvent<F>, command: Option<String>) -> JoinedSample<F> {
        self.stats.frames += 1;
        JoinedSample {
            frame: event.frame,
            tick: event.tick,
            command,
            telemetry: self.last_telemetry,
        }
    }

    /// Frame arriving after the last command
    fn emit_tail(&mut self, event: FrameEvent<F>) -> Result<JoinedSample<F>, ContractError> {
        match self.policy {
            TailPolicy::CarryForward => {
                self.stats.tail_frames += 1;
                Ok(self.emit(event, None))
            }
            TailPolicy::Fail => {
                self.done = true;
                Err(ContractError::CommandStreamExhausted { tick: event.tick })
            }
        }
    }

    /// Frame stream ended: count and discard what is left of the commands
    fn finish(&mut self) {
        self.done = true;
        let leftover = self.pending_command.take().map_or(0, |_| 1)
            + if self.commands_exhausted {
                0
            } else {
                self.commands.by_ref().count() as u64
            };
        self.commands_exhausted = true;
        self.stats.trailing_commands += leftover;

        metrics::counter!("reconcile_commands_dropped_total", "reason" => "stale")
            .increment(self.stats.dropped_commands);
        metrics::counter!("reconcile_commands_dropped_total", "reason" => "trailing")
            .increment(leftover);

        debug!(
            frames = self.stats.frames,
            matched = self.stats.matched,
            unlabeled = self.stats.unlabeled,
            dropped_commands = self.stats.dropped_commands,
            trailing_commands = self.stats.trailing_commands,
            tail_frames = self.stats.tail_frames,
            "Reconciliation finished"
        );
    }

    fn fail(&mut self, err: ContractError) -> Option<Result<JoinedSample<F>, ContractError>> {
        self.done = true;
        Some(Err(err))
    }
}

impl<FI, CI, F> Iterator for Reconciler<FI, CI>
where
    FI: Iterator<Item = Result<FrameEvent<F>, ContractError>>,
    CI: Iterator<Item = CommandEvent>,
{
    type Item = Result<JoinedSample<F>, ContractError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let event = match self.frames.next() {
            None => {
                self.finish();
                return None;
            }
            Some(Err(e)) => return self.fail(e),
            Some(Ok(event)) => event,
        };

        if let Some(previous) = self.last_frame_tick {
            if event.tick < previous {
                return self.fail(ContractError::TickRegression {
                    stream: "frame",
                    previous,
                    tick: event.tick,
                });
            }
        }
        self.last_frame_tick = Some(event.tick);

        loop {
            if let Err(e) = self.pull_command() {
                return self.fail(e);
            }

            let Some(cmd) = self.pending_command.take() else {
                return Some(self.emit_tail(event));
            };

            match Step::classify(cmd.tick, event.tick) {
                Step::CommandBehind => {
                    trace!(command_tick = cmd.tick, frame_tick = event.tick, "Dropping stale command");
                    self.stats.dropped_commands += 1;
                    self.last_telemetry = cmd.telemetry;
                }
                Step::CommandAhead => {
                    self.pending_command = Some(cmd);
                    self.stats.unlabeled += 1;
                    return Some(Ok(self.emit(event, None)));
                }
                Step::Tied => {
                    self.stats.matched += 1;
                    self.last_telemetry = cmd.telemetry;
                    return Some(Ok(self.emit(event, cmd.command)));
                }
            }
        }
    }
}

/// Reconcile a fallible frame stream against commands
pub fn reconcile<FS, CS, F>(
    frames: FS,
    commands: CS,
    policy: TailPolicy,
) -> Reconciler<FS::IntoIter, CS::IntoIter>
where
    FS: IntoIterator<Item = Result<FrameEvent<F>, ContractError>>,
    CS: IntoIterator<Item = CommandEvent>,
{
    Reconciler::new(frames, commands, policy)
}

/// Reconcile in-memory frames and collect the joined samples with stats
pub fn reconcile_all<F>(
    frames: impl IntoIterator<Item = FrameEvent<F>>,
    commands: impl IntoIterator<Item = CommandEvent>,
    policy: TailPolicy,
) -> Result<(Vec<JoinedSample<F>>, ReconcileStats), ContractError> {
    let mut reconciler = reconcile(frames.into_iter().map(Ok), commands, policy);
    let samples = reconciler.by_ref().collect::<Result<Vec<_>, _>>()?;
    Ok((samples, reconciler.stats()))
}
