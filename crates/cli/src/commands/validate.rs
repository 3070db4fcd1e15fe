//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{DatasetBlueprint, TailPolicy};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    frame_size: String,
    image_extension: String,
    tail_policy: TailPolicy,
    session_files: [String; 3],
    commands: Vec<String>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(summarize(&blueprint)),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

fn summarize(blueprint: &DatasetBlueprint) -> ConfigSummary {
    ConfigSummary {
        version: format!("{:?}", blueprint.version),
        frame_size: blueprint.output.frame_size.to_string(),
        image_extension: blueprint.output.image_extension.clone(),
        tail_policy: blueprint.reconcile.tail_policy,
        session_files: [
            blueprint.session.video_file.clone(),
            blueprint.session.sync_file.clone(),
            blueprint.session.commands_file.clone(),
        ],
        commands: blueprint
            .commands
            .iter()
            .map(|spec| format!("{} = {}", spec.code, spec.label))
            .collect(),
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &DatasetBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.commands.len() == 1 {
        warnings.push("Only the no-op command is defined - every frame lands in bucket 0".to_string());
    }

    let is_jpeg = matches!(
        blueprint.output.image_extension.to_ascii_lowercase().as_str(),
        "jpeg" | "jpg"
    );
    if is_jpeg && blueprint.output.jpeg_quality < 50 {
        warnings.push(format!(
            "output.jpeg_quality = {} is low - compression artifacts will show in training data",
            blueprint.output.jpeg_quality
        ));
    }

    let size = blueprint.output.frame_size;
    if size.width > 1024 || size.height > 1024 {
        warnings.push(format!("output.frame_size {size} is unusually large"));
    }

    if blueprint.reconcile.tail_policy == TailPolicy::Fail {
        warnings.push(
            "reconcile.tail_policy = \"fail\" - sessions whose command log ends early are skipped"
                .to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Frame size: {}", summary.frame_size);
            println!("  Image extension: {}", summary.image_extension);
            println!("  Tail policy: {:?}", summary.tail_policy);
            println!("  Session files: {}", summary.session_files.join(", "));
            println!("  Commands ({}):", summary.commands.len());
            for command in &summary.commands {
                println!("    {}", command);
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
