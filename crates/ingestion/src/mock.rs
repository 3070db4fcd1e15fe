//! Synthetic frame source
//!
//! Used for tests and dry runs without ffmpeg.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use contracts::{ContractError, FrameSource, GrayFrames};
use image::{GrayImage, Luma};
use tracing::trace;

/// Synthetic frame source configuration
#[derive(Debug, Clone)]
pub struct SyntheticFrameConfig {
    /// Frames produced per video
    pub frame_count: u64,

    /// Frame width
    pub width: u32,

    /// Frame height
    pub height: u32,
}

impl Default for SyntheticFrameConfig {
    fn default() -> Self {
        Self {
            frame_count: 10,
            width: 32,
            height: 24,
        }
    }
}

/// Frame source producing flat gray frames
///
/// Frame `i` is filled with intensity `i % 256`, so tests can tell frames
/// apart after they went through the pipeline. Per-path frame counts can be
/// overridden to emulate several sessions, and paths can be marked as
/// unreadable to exercise `VideoOpen` handling.
#[derive(Debug, Clone, Default)]
pub struct SyntheticFrameSource {
    config: SyntheticFrameConfig,
    per_path: HashMap<PathBuf, u64>,
    unreadable: Vec<PathBuf>,
}

impl SyntheticFrameSource {
    pub fn new(config: SyntheticFrameConfig) -> Self {
        Self {
            config,
            per_path: HashMap::new(),
            unreadable: Vec::new(),
        }
    }

    /// `frame_count` frames of `width`x`height`
    pub fn frames(frame_count: u64, width: u32, height: u32) -> Self {
        Self::new(SyntheticFrameConfig {
            frame_count,
            width,
            height,
        })
    }

    /// Override the frame count for one video path
    pub fn with_count(mut self, path: impl Into<PathBuf>, frame_count: u64) -> Self {
        self.per_path.insert(path.into(), frame_count);
        self
    }

    /// Make opening this path fail
    pub fn with_unreadable(mut self, path: impl Into<PathBuf>) -> Self {
        self.unreadable.push(path.into());
        self
    }

    /// Intensity of frame `index`
    pub fn intensity(index: u64) -> u8 {
        (index % 256) as u8
    }
}

impl FrameSource for SyntheticFrameSource {
    fn open(&self, path: &Path) -> Result<GrayFrames, ContractError> {
        if self.unreadable.iter().any(|p| p == path) {
            return Err(ContractError::video_open(path, "synthetic open failure"));
        }

        let count = self
            .per_path
            .get(path)
            .copied()
            .unwrap_or(self.config.frame_count);
        let (width, height) = (self.config.width, self.config.height);
        trace!(path = %path.display(), count, "Opening synthetic video");

        Ok(Box::new((0..count).map(move |i| {
            Ok::<_, ContractError>(GrayImage::from_pixel(
                width,
                height,
                Luma([SyntheticFrameSource::intensity(i)]),
            ))
        })))
    }
}
