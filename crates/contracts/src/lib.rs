//! # Contracts
//!
//! Frozen interface contracts shared by every stage of the dataset builder.
//! Business crates depend on this crate only, never on each other's internals.
//!
//! ## Time Model
//! - A [`Tick`] is one second of recording time, as written by the recorder
//! - Frames carry the tick they were captured in, many frames per tick
//! - Commands carry the tick they were issued in, at most one per tick

mod blueprint;
mod command;
mod error;
mod event;
mod frame_source;
mod report;
mod sink;
mod sync;

pub use blueprint::*;
pub use command::{CommandCode, CommandSet, CommandSpec};
pub use error::*;
pub use event::*;
pub use frame_source::{FrameSource, GrayFrames};
pub use report::{BucketerStats, SessionReport};
pub use sink::*;
pub use sync::*;
