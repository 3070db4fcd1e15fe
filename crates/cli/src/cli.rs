//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Teleop Dataset - turns teleoperation recordings into a labeled frame dataset
#[derive(Parser, Debug)]
#[command(
    name = "teleop-dataset",
    author,
    version,
    about = "Build a command-labeled frame dataset from teleoperation recordings",
    long_about = "Reads recorded sessions (video, per-second frame counts and operator \n\
                  commands), aligns frames with the command in effect for them, and \n\
                  stores the frames in one numbered directory per command."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TELEOP_DATASET_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "TELEOP_DATASET_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the dataset from every session under INPUT_DIR
    Run(RunArgs),

    /// Report how sessions would reconcile, without decoding video
    Inspect(InspectArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Directory holding `<tag>/<index>/` session directories
    pub input_dir: PathBuf,

    /// Dataset root; one subdirectory per command code is created inside
    pub output_dir: PathBuf,

    /// Stored frame size as WIDTHxHEIGHT (overrides the configuration)
    #[arg(long = "frame-size", alias = "frame_size", value_name = "MxN")]
    pub frame_size: Option<String>,

    /// Path to configuration file (TOML or JSON); built-in defaults otherwise
    #[arg(short, long, env = "TELEOP_DATASET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Abort on the first session that fails instead of skipping it
    #[arg(long)]
    pub fail_fast: bool,

    /// Decode and reconcile, log samples instead of writing files
    #[arg(long)]
    pub dry_run: bool,

    /// Serve Prometheus metrics on this port while running (0 = disabled)
    #[arg(long, default_value = "0", env = "TELEOP_DATASET_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `inspect` command
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Directory holding `<tag>/<index>/` session directories
    pub input_dir: PathBuf,

    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, env = "TELEOP_DATASET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "dataset.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}
