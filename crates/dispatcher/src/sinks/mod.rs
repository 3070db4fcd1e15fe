//! Sink implementations
//!
//! Contains LogSink; file output lives in [`crate::bucketer`].

mod log;

pub use self::log::LogSink;
