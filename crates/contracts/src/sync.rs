//! JoinedSample - Sync Engine output
//!
//! Frames paired with the command and telemetry in effect for them.

use serde::{Deserialize, Serialize};

use crate::{Telemetry, Tick};

/// One frame joined with its (best-effort) command
///
/// Exactly one sample is produced per input frame, in frame order.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedSample<F> {
    pub frame: F,

    /// Tick of the source frame
    pub tick: Tick,

    /// `None` when no command matched the frame's tick
    pub command: Option<String>,

    pub telemetry: Telemetry,
}

impl<F> JoinedSample<F> {
    /// Replace the frame payload, keeping the labels
    pub fn map_frame<G>(self, f: impl FnOnce(F) -> G) -> JoinedSample<G> {
        JoinedSample {
            frame: f(self.frame),
            tick: self.tick,
            command: self.command,
            telemetry: self.telemetry,
        }
    }
}

/// What to do with frames left over once the command stream runs dry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TailPolicy {
    /// Emit remaining frames unlabeled with the last-seen telemetry
    #[default]
    CarryForward,
    /// Stop with `CommandStreamExhausted`
    Fail,
}

/// Reconciliation counters for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileStats {
    /// Samples emitted
    pub frames: u64,

    /// Frames whose tick had a command
    pub matched: u64,

    /// Frames emitted without a command while commands remained
    pub unlabeled: u64,

    /// Commands older than the current frame, discarded
    pub dropped_commands: u64,

    /// Commands left over once frames ran out
    pub trailing_commands: u64,

    /// Frames emitted after the command stream was exhausted
    pub tail_frames: u64,
}

impl ReconcileStats {
    /// Fraction of frames that carried a real command
    pub fn match_rate(&self) -> f64 {
        if self.frames == 0 {
            0.0
        } else {
            self.matched as f64 / self.frames as f64
        }
    }
}
