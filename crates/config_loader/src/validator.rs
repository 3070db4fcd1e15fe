//! 配置校验模块
//!
//! 校验规则：
//! - 字段范围 (validator derive): jpeg_quality 1..=100, 文件名非空
//! - 会话文件名互不相同且不含路径分隔符
//! - 图像扩展名可被编码器识别
//! - 指令表已在反序列化时校验 (见 `CommandSet::new`)

use std::collections::HashSet;

use contracts::{ContractError, DatasetBlueprint};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Extensions the bucket writer knows how to encode
pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png"];

/// 校验 DatasetBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &DatasetBlueprint) -> Result<(), ContractError> {
    validate_fields(blueprint)?;
    validate_session_files(blueprint)?;
    validate_output(blueprint)?;
    Ok(())
}

/// 运行 derive 生成的字段校验
fn validate_fields(blueprint: &DatasetBlueprint) -> Result<(), ContractError> {
    blueprint.validate().map_err(|errors| {
        let (field, message) = first_error(&errors, String::new());
        ContractError::config_validation(field, message)
    })
}

/// Flatten nested validator errors down to the first offending field
fn first_error(errors: &ValidationErrors, prefix: String) -> (String, String) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                let message = list
                    .first()
                    .map(|e| match &e.message {
                        Some(m) => m.to_string(),
                        None => format!("failed '{}' check", e.code),
                    })
                    .unwrap_or_else(|| "invalid value".to_string());
                return (path, message);
            }
            ValidationErrorsKind::Struct(nested) => return first_error(nested, path),
            ValidationErrorsKind::List(items) => {
                if let Some((idx, nested)) = items.iter().next() {
                    return first_error(nested, format!("{path}[{idx}]"));
                }
            }
        }
    }
    (prefix, "invalid value".to_string())
}

/// 校验会话文件名
fn validate_session_files(blueprint: &DatasetBlueprint) -> Result<(), ContractError> {
    let session = &blueprint.session;
    let files = [
        ("session.video_file", &session.video_file),
        ("session.sync_file", &session.sync_file),
        ("session.commands_file", &session.commands_file),
    ];

    let mut seen = HashSet::new();
    for (field, name) in files {
        check_plain_file_name(field, name)?;
        if !seen.insert(name.as_str()) {
            return Err(ContractError::config_validation(
                field,
                format!("'{name}' is used for more than one session file"),
            ));
        }
    }
    Ok(())
}

/// 校验输出配置
fn validate_output(blueprint: &DatasetBlueprint) -> Result<(), ContractError> {
    let output = &blueprint.output;
    check_plain_file_name("output.speeds_file", &output.speeds_file)?;

    let ext = output.image_extension.to_lowercase();
    if !SUPPORTED_IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ContractError::config_validation(
            "output.image_extension",
            format!(
                "unsupported image extension '{}', expected one of {:?}",
                output.image_extension, SUPPORTED_IMAGE_EXTENSIONS
            ),
        ));
    }

    if output
        .speeds_file
        .to_lowercase()
        .ends_with(&format!(".{ext}"))
    {
        return Err(ContractError::config_validation(
            "output.speeds_file",
            "speeds file must not share the image extension",
        ));
    }
    Ok(())
}

fn check_plain_file_name(field: &str, name: &str) -> Result<(), ContractError> {
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(ContractError::config_validation(
            field,
            format!("'{name}' must be a plain file name"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_blueprint_is_valid() {
        assert!(validate(&DatasetBlueprint::default()).is_ok());
    }

    #[test]
    fn test_quality_out_of_range() {
        let mut bp = DatasetBlueprint::default();
        bp.output.jpeg_quality = 101;
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("output.jpeg_quality"), "{err}");
    }

    #[test]
    fn test_empty_file_name() {
        let mut bp = DatasetBlueprint::default();
        bp.session.sync_file = String::new();
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("session.sync_file"), "{err}");
    }

    #[test]
    fn test_duplicate_session_files() {
        let mut bp = DatasetBlueprint::default();
        bp.session.commands_file = "sync.txt".to_string();
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("more than one"), "{err}");
    }

    #[test]
    fn test_path_separator_rejected() {
        let mut bp = DatasetBlueprint::default();
        bp.session.video_file = "../video.avi".to_string();
        assert!(validate(&bp).is_err());
    }

    #[test]
    fn test_unsupported_extension() {
        let mut bp = DatasetBlueprint::default();
        bp.output.image_extension = "webp".to_string();
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("unsupported image extension"));
    }

    #[test]
    fn test_speeds_file_clashing_with_images() {
        let mut bp = DatasetBlueprint::default();
        bp.output.speeds_file = "speeds.jpeg".to_string();
        assert!(validate(&bp).is_err());
    }
}
