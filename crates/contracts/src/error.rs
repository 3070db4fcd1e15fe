//! Layered error definitions
//!
//! Categorized by source: input / parse / video / sync / sink / config

use std::path::PathBuf;

use thiserror::Error;

use crate::Tick;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Input Errors =====
    /// Input directory or session file missing
    #[error("input not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    /// Output path exists but is not a directory
    #[error("{} exists and is not a directory", path.display())]
    OutputConflict { path: PathBuf },

    // ===== Parse Errors =====
    /// Line could not be split into a key and values
    #[error("{}:{line}: malformed line: {message}", path.display())]
    MalformedLine {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// A key or value field failed to parse
    #[error("{}:{line}: {message}", path.display())]
    ValueParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    // ===== Video Errors =====
    /// Video could not be opened for decoding
    #[error("could not open video {}: {message}", path.display())]
    VideoOpen { path: PathBuf, message: String },

    /// Decoder failed mid-stream
    #[error("video decode error in {}: {message}", path.display())]
    VideoDecode { path: PathBuf, message: String },

    // ===== Sync Errors =====
    /// Command stream ended while frames remain (fail tail policy)
    #[error("command stream exhausted before frame at tick {tick}")]
    CommandStreamExhausted { tick: Tick },

    /// A stream went backwards in time
    #[error("{stream} tick regressed from {previous} to {tick}")]
    TickRegression {
        stream: &'static str,
        previous: Tick,
        tick: Tick,
    },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create input-not-found error
    pub fn input_not_found(path: impl Into<PathBuf>) -> Self {
        Self::InputNotFound { path: path.into() }
    }

    /// Create output-conflict error
    pub fn output_conflict(path: impl Into<PathBuf>) -> Self {
        Self::OutputConflict { path: path.into() }
    }

    /// Create malformed-line error
    pub fn malformed_line(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::MalformedLine {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    /// Create value-parse error
    pub fn value_parse(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::ValueParse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    /// Create video-open error
    pub fn video_open(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::VideoOpen {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create video-decode error
    pub fn video_decode(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::VideoDecode {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Whether the error is confined to one session's inputs
    ///
    /// Batch runs skip such sessions instead of aborting. Output and
    /// configuration errors would hit every session, so they are not local.
    pub fn is_session_local(&self) -> bool {
        !matches!(
            self,
            Self::OutputConflict { .. }
                | Self::SinkWrite { .. }
                | Self::ConfigParse { .. }
                | Self::ConfigValidation { .. }
        )
    }

    /// Short category name, used as a metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InputNotFound { .. } | Self::OutputConflict { .. } => "input",
            Self::MalformedLine { .. } | Self::ValueParse { .. } => "parse",
            Self::VideoOpen { .. } | Self::VideoDecode { .. } => "video",
            Self::CommandStreamExhausted { .. } | Self::TickRegression { .. } => "sync",
            Self::SinkWrite { .. } => "sink",
            Self::ConfigParse { .. } | Self::ConfigValidation { .. } => "config",
            Self::Io(_) => "io",
        }
    }
}
