//! Timeline events - Ingestion output
//!
//! Raw per-tick records read from a session's logs and video.

use serde::{Deserialize, Serialize};

/// Discrete time unit keying frames and commands (one second in recordings)
pub type Tick = u64;

/// Wheel-speed telemetry attached to a command
///
/// Speeds range from -255 to 255 on the recorder side, but are kept as
/// floats because the command log writes them that way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub left_speed: f64,
    pub right_speed: f64,
}

impl Telemetry {
    pub fn new(left_speed: f64, right_speed: f64) -> Self {
        Self {
            left_speed,
            right_speed,
        }
    }
}

/// One decoded frame stamped with the tick it was captured in
#[derive(Debug, Clone, PartialEq)]
pub struct FrameEvent<F> {
    pub tick: Tick,
    pub frame: F,
}

impl<F> FrameEvent<F> {
    pub fn new(tick: Tick, frame: F) -> Self {
        Self { tick, frame }
    }
}

/// Operator command (or its absence) plus telemetry at one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEvent {
    pub tick: Tick,

    /// `None` when telemetry was logged without an operator command
    pub command: Option<String>,

    pub telemetry: Telemetry,
}

impl CommandEvent {
    pub fn new(tick: Tick, command: Option<&str>, left_speed: f64, right_speed: f64) -> Self {
        Self {
            tick,
            command: command.map(str::to_string),
            telemetry: Telemetry::new(left_speed, right_speed),
        }
    }
}

/// Number of frames captured during one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCount {
    pub tick: Tick,
    pub frame_count: u64,
}

impl SyncCount {
    pub fn new(tick: Tick, frame_count: u64) -> Self {
        Self { tick, frame_count }
    }
}
