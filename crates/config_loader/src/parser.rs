//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{ContractError, DatasetBlueprint};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<DatasetBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<DatasetBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<DatasetBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{CommandCode, FrameSize, TailPolicy};

    #[test]
    fn test_parse_toml_full() {
        let content = r#"
[session]
video_file = "capture.avi"

[output]
frame_size = "64x48"
jpeg_quality = 90

[reconcile]
tail_policy = "fail"

[[commands]]
code = 0
label = "idle"
name = "idle"

[[commands]]
code = 1
label = "go"
name = "go forward"
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.session.video_file, "capture.avi");
        assert_eq!(bp.session.sync_file, "sync.txt");
        assert_eq!(bp.output.frame_size, FrameSize::new(64, 48));
        assert_eq!(bp.output.jpeg_quality, 90);
        assert_eq!(bp.reconcile.tail_policy, TailPolicy::Fail);
        assert_eq!(bp.commands.len(), 2);
        assert_eq!(bp.commands.lookup("go"), Some(CommandCode(1)));
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "output": { "frame_size": "32x32" },
            "commands": [
                { "code": 0, "label": "nop" },
                { "code": 1, "label": "forward" }
            ]
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        assert_eq!(result.unwrap().output.frame_size, FrameSize::new(32, 32));
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_bad_frame_size_is_parse_error() {
        let result = parse_toml("[output]\nframe_size = \"big\"\n");
        assert!(matches!(result, Err(ContractError::ConfigParse { .. })));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
