//! FrameSource trait - video decoding abstraction
//!
//! Decouples the pipeline from the concrete decoder so sessions can be
//! processed from ffmpeg in production and from synthetic frames in tests.

use std::path::Path;

use image::GrayImage;

use crate::ContractError;

/// Lazily decoded grayscale frames in capture order
///
/// The stream can only be restarted by opening the video again.
pub type GrayFrames = Box<dyn Iterator<Item = Result<GrayImage, ContractError>> + Send>;

/// Video decoding capability
///
/// # Example
///
/// ```ignore
/// let frames = source.open(Path::new("session/video.avi"))?;
/// for frame in frames {
///     let frame = frame?;
///     println!("{}x{}", frame.width(), frame.height());
/// }
/// ```
pub trait FrameSource {
    /// Open a video and return its frame stream
    ///
    /// # Errors
    /// `ContractError::VideoOpen` when the file cannot be decoded at all.
    fn open(&self, path: &Path) -> Result<GrayFrames, ContractError>;
}
