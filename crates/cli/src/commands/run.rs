//! `run` command implementation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use contracts::{ContractError, DatasetBlueprint, FrameSize};
use ingestion::FfmpegFrameSource;
use tracing::info;

use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub fn run_dataset(args: &RunArgs) -> Result<()> {
    check_input_dir(&args.input_dir)?;
    check_output_dir(&args.output_dir)?;

    let blueprint = load_blueprint(args)?;

    info!(
        input = %args.input_dir.display(),
        output = %args.output_dir.display(),
        frame_size = %blueprint.output.frame_size,
        commands = blueprint.commands.len(),
        tail_policy = ?blueprint.reconcile.tail_policy,
        "Configuration loaded"
    );

    let output_dir = if args.dry_run {
        info!("Dry run mode - samples are logged, nothing is written");
        None
    } else {
        fs::create_dir_all(&args.output_dir).with_context(|| {
            format!("Failed to create output directory {}", args.output_dir.display())
        })?;
        Some(args.output_dir.clone())
    };

    let source = FfmpegFrameSource::new(&blueprint.decoder);
    let pipeline = Pipeline::new(PipelineConfig {
        input_dir: args.input_dir.clone(),
        output_dir,
        blueprint,
        fail_fast: args.fail_fast,
    });

    info!("Starting pipeline...");
    let stats = pipeline.run(&source).context("Pipeline execution failed")?;

    info!(
        sessions = stats.sessions_found,
        frames = stats.runs.total_frames,
        duration_secs = stats.duration.as_secs_f64(),
        "Dataset build finished"
    );
    stats.print_summary();

    Ok(())
}

/// Config file (or defaults) with the CLI frame size applied on top
fn load_blueprint(args: &RunArgs) -> Result<DatasetBlueprint> {
    // Parse the override first so a bad value fails before anything is read
    let frame_size = args
        .frame_size
        .as_deref()
        .map(str::parse::<FrameSize>)
        .transpose()
        .context("Invalid --frame_size, expected <width>x<height>")?;

    let mut blueprint = config_loader::ConfigLoader::load_or_default(args.config.as_deref())
        .with_context(|| match &args.config {
            Some(path) => format!("Failed to load config from {}", path.display()),
            None => "Failed to build default config".to_string(),
        })?;

    if let Some(size) = frame_size {
        info!(frame_size = %size, "Overriding frame size from CLI");
        blueprint.output.frame_size = size;
    }
    Ok(blueprint)
}

fn check_input_dir(path: &Path) -> Result<(), ContractError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(ContractError::input_not_found(path))
    }
}

fn check_output_dir(path: &Path) -> Result<(), ContractError> {
    if path.exists() && !path.is_dir() {
        Err(ContractError::output_conflict(path))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn args(input: PathBuf, output: PathBuf, frame_size: Option<&str>) -> RunArgs {
        RunArgs {
            input_dir: input,
            output_dir: output,
            frame_size: frame_size.map(str::to_string),
            config: None,
            fail_fast: false,
            dry_run: false,
            metrics_port: 0,
        }
    }

    #[test]
    fn test_missing_input_dir_fails() {
        let dir = tempdir().unwrap();
        let err = run_dataset(&args(dir.path().join("nope"), dir.path().join("out"), None)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ContractError>(),
            Some(ContractError::InputNotFound { .. })
        ));
    }

    #[test]
    fn test_output_file_conflict_fails() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        fs::write(&out, "not a dir").unwrap();

        let err = run_dataset(&args(dir.path().to_path_buf(), out, None)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ContractError>(),
            Some(ContractError::OutputConflict { .. })
        ));
    }

    #[test]
    fn test_bad_frame_size_fails_before_output_created() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let err = run_dataset(&args(dir.path().to_path_buf(), out.clone(), Some("100by100"))).unwrap_err();
        assert!(err.to_string().contains("--frame_size"));
        assert!(!out.exists());
    }

    #[test]
    fn test_frame_size_override() {
        let dir = tempdir().unwrap();
        let blueprint = load_blueprint(&args(dir.path().into(), dir.path().into(), Some("64x48"))).unwrap();
        assert_eq!(blueprint.output.frame_size, FrameSize::new(64, 48));

        let blueprint = load_blueprint(&args(dir.path().into(), dir.path().into(), None)).unwrap();
        assert_eq!(blueprint.output.frame_size, FrameSize::default());
    }
}
