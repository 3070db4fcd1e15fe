//! # Ingestion
//!
//! Session input ingestion.
//!
//! Responsibilities:
//! - Discover session directories
//! - Read the sparse sync/command timelines (sorted, last duplicate wins)
//! - Expand per-tick frame counts into one tick per frame
//! - Decode video frames (ffmpeg) and resize them
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{expand_sync_counts, read_command_log, read_sync_log, FfmpegFrameSource};
//! use contracts::{FrameEvent, FrameSource};
//!
//! let counts = read_sync_log(&session.sync)?;
//! let commands = read_command_log(&session.commands)?;
//! let frames = FfmpegFrameSource::default().open(&session.video)?;
//!
//! let events = expand_sync_counts(&counts)
//!     .zip(frames)
//!     .map(|(tick, frame)| frame.map(|f| FrameEvent::new(tick, f)));
//! ```

mod expand;
mod frame;
mod logs;
mod mock;
mod session;
mod timeline;
mod video;

// Re-exports
pub use contracts::{CommandEvent, FrameEvent, SyncCount, Tick};
pub use expand::{expand_counts, expand_sync_counts, BucketExpander};
pub use frame::resize_frame;
pub use logs::{parse_command_values, parse_sync_values, read_command_log, read_sync_log};
pub use mock::{SyntheticFrameConfig, SyntheticFrameSource};
pub use session::{discover_sessions, SessionPaths};
pub use timeline::{parse_tick, read_timeline, read_timeline_from, Timeline};
pub use video::{FfmpegFrameSource, FFMPEG_ENV, FFPROBE_ENV};
