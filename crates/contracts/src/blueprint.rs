//! DatasetBlueprint - Config Loader output
//!
//! Describes a complete dataset build: session file names, output layout,
//! reconciliation policy, decoder binaries and the command vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::{CommandSet, ContractError, TailPolicy};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete dataset build configuration
///
/// Every section has defaults, so an empty document is a valid blueprint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct DatasetBlueprint {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Per-session input file names
    #[serde(default)]
    #[validate(nested)]
    pub session: SessionLayout,

    /// Output layout and encoding
    #[serde(default)]
    #[validate(nested)]
    pub output: OutputConfig,

    /// Stream reconciliation policy
    #[serde(default)]
    pub reconcile: ReconcileConfig,

    /// External decoder binaries
    #[serde(default)]
    #[validate(nested)]
    pub decoder: DecoderConfig,

    /// Command vocabulary
    #[serde(default)]
    pub commands: CommandSet,
}

/// File names inside one session directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SessionLayout {
    #[serde(default = "default_video_file")]
    #[validate(length(min = 1))]
    pub video_file: String,

    #[serde(default = "default_sync_file")]
    #[validate(length(min = 1))]
    pub sync_file: String,

    #[serde(default = "default_commands_file")]
    #[validate(length(min = 1))]
    pub commands_file: String,
}

impl Default for SessionLayout {
    fn default() -> Self {
        Self {
            video_file: default_video_file(),
            sync_file: default_sync_file(),
            commands_file: default_commands_file(),
        }
    }
}

fn default_video_file() -> String {
    "video.avi".to_string()
}

fn default_sync_file() -> String {
    "sync.txt".to_string()
}

fn default_commands_file() -> String {
    "commands.txt".to_string()
}

/// Bucket directory contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct OutputConfig {
    /// Target resolution of stored frames
    #[serde(default)]
    pub frame_size: FrameSize,

    /// Extension of numbered image files (also selects the encoder)
    #[serde(default = "default_image_extension")]
    #[validate(length(min = 1))]
    pub image_extension: String,

    /// JPEG quality (1-100)
    #[serde(default = "default_jpeg_quality")]
    #[validate(range(min = 1, max = 100))]
    pub jpeg_quality: u8,

    /// Name of the per-bucket speed log
    #[serde(default = "default_speeds_file")]
    #[validate(length(min = 1))]
    pub speeds_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            frame_size: FrameSize::default(),
            image_extension: default_image_extension(),
            jpeg_quality: default_jpeg_quality(),
            speeds_file: default_speeds_file(),
        }
    }
}

fn default_image_extension() -> String {
    "jpeg".to_string()
}

fn default_jpeg_quality() -> u8 {
    95
}

fn default_speeds_file() -> String {
    "speeds.txt".to_string()
}

/// Reconciliation settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    #[serde(default)]
    pub tail_policy: TailPolicy,
}

/// ffmpeg/ffprobe locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct DecoderConfig {
    #[serde(default = "default_ffmpeg")]
    #[validate(length(min = 1))]
    pub ffmpeg: String,

    #[serde(default = "default_ffprobe")]
    #[validate(length(min = 1))]
    pub ffprobe: String,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
        }
    }
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

/// Frame resolution written as `WIDTHxHEIGHT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for FrameSize {
    fn default() -> Self {
        Self::new(100, 100)
    }
}

impl FromStr for FrameSize {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            ContractError::config_validation(
                "frame_size",
                format!("'{s}' must be of the form 'MxN', where M, N are both integers"),
            )
        };

        let (w, h) = s.split_once(['x', 'X']).ok_or_else(invalid)?;
        let width: u32 = w.trim().parse().map_err(|_| invalid())?;
        let height: u32 = h.trim().parse().map_err(|_| invalid())?;

        if width == 0 || height == 0 {
            return Err(ContractError::config_validation(
                "frame_size",
                format!("'{s}' must have non-zero dimensions"),
            ));
        }
        Ok(Self { width, height })
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl TryFrom<String> for FrameSize {
    type Error = ContractError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<FrameSize> for String {
    fn from(size: FrameSize) -> Self {
        size.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let blueprint: DatasetBlueprint = toml::from_str("").unwrap();
        assert_eq!(blueprint, DatasetBlueprint::default());
        assert_eq!(blueprint.session.video_file, "video.avi");
        assert_eq!(blueprint.output.frame_size, FrameSize::new(100, 100));
        assert_eq!(blueprint.output.jpeg_quality, 95);
        assert_eq!(blueprint.reconcile.tail_policy, TailPolicy::CarryForward);
        assert_eq!(blueprint.commands.len(), 7);
    }

    #[test]
    fn frame_size_parsing() {
        assert_eq!("64x48".parse::<FrameSize>().unwrap(), FrameSize::new(64, 48));
        assert_eq!(" 64 x 48 ".parse::<FrameSize>().unwrap(), FrameSize::new(64, 48));
        assert!("64".parse::<FrameSize>().is_err());
        assert!("64x".parse::<FrameSize>().is_err());
        assert!("axb".parse::<FrameSize>().is_err());
        assert!("64x48x3".parse::<FrameSize>().is_err());
        assert!("0x48".parse::<FrameSize>().is_err());
    }

    #[test]
    fn frame_size_serializes_as_string() {
        let json = serde_json::to_string(&FrameSize::new(32, 24)).unwrap();
        assert_eq!(json, "\"32x24\"");
        let back: FrameSize = serde_json::from_str(&json).unwrap();
        assert_eq!(back, FrameSize::new(32, 24));
    }

    #[test]
    fn quality_range_is_validated() {
        let mut blueprint = DatasetBlueprint::default();
        assert!(blueprint.validate().is_ok());
        blueprint.output.jpeg_quality = 0;
        assert!(blueprint.validate().is_err());
    }
}
