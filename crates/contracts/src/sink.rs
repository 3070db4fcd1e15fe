//! SampleSink trait - Dispatcher output interface
//!
//! Defines the abstract interface for sinks consuming joined samples.

use image::GrayImage;

use crate::{ContractError, JoinedSample};

/// Joined sample consumer
///
/// All sink implementations must implement this trait.
pub trait SampleSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one joined sample
    ///
    /// # Errors
    /// Returns write error (should include context)
    fn write(&mut self, sample: &JoinedSample<GrayImage>) -> Result<(), ContractError>;

    /// Flush buffers (if any)
    fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink, releasing every handle it holds
    fn close(&mut self) -> Result<(), ContractError>;
}
