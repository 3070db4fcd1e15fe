//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Generate `DatasetBlueprint`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("dataset.toml")).unwrap();
//! println!("Frame size: {}", blueprint.output.frame_size);
//! ```

mod parser;
mod validator;

pub use contracts::DatasetBlueprint;
pub use validator::SUPPORTED_IMAGE_EXTENSIONS;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<DatasetBlueprint, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<DatasetBlueprint, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Load from an optional path, falling back to the built-in defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<DatasetBlueprint, ContractError> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Ok(DatasetBlueprint::default()),
        }
    }

    /// Serialize DatasetBlueprint to TOML string
    pub fn to_toml(blueprint: &DatasetBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize DatasetBlueprint to JSON string
    pub fn to_json(blueprint: &DatasetBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<DatasetBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{CommandCode, TailPolicy};

    const MINIMAL_TOML: &str = r#"
[output]
frame_size = "80x60"

[reconcile]
tail_policy = "fail"

[[commands]]
code = 0
label = "nop"
name = "no-op"

[[commands]]
code = 1
label = "w"
name = "forward"

[[commands]]
code = 2
label = "s"
name = "backward"
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.output.frame_size.to_string(), "80x60");
        assert_eq!(bp.reconcile.tail_policy, TailPolicy::Fail);
        assert_eq!(bp.commands.resolve(Some("s")), CommandCode(2));
    }

    #[test]
    fn test_round_trip_toml() {
        let bp = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(bp, bp2);
    }

    #[test]
    fn test_round_trip_json() {
        let bp = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(bp, bp2);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[session]
video_file = "sync.txt"
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("more than one"));
    }

    #[test]
    fn test_load_or_default_without_path() {
        let bp = ConfigLoader::load_or_default(None).unwrap();
        assert_eq!(bp, DatasetBlueprint::default());
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let err = ConfigLoader::load_from_path(Path::new("dataset.yaml")).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }
}
