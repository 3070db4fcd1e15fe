//! Typed readers for the two session logs
//!
//! - `sync.txt`: `tick,frame_count`
//! - `commands.txt`: `tick,command_label,left_speed,right_speed`

use std::path::Path;

use contracts::{CommandEvent, ContractError, SyncCount, Telemetry};

use crate::timeline::read_timeline;

/// Labels the recorder writes when telemetry was logged without a command
const NO_COMMAND_LABELS: &[&str] = &["", "None", "none", "null"];

/// Read a sync log into tick-ordered frame counts
pub fn read_sync_log(path: &Path) -> Result<Vec<SyncCount>, ContractError> {
    let timeline = read_timeline(path, parse_sync_values)?;
    Ok(timeline
        .into_iter()
        .map(|(tick, frame_count)| SyncCount { tick, frame_count })
        .collect())
}

/// Read a command log into tick-ordered command events
pub fn read_command_log(path: &Path) -> Result<Vec<CommandEvent>, ContractError> {
    let timeline = read_timeline(path, parse_command_values)?;
    Ok(timeline
        .into_iter()
        .map(|(tick, (command, telemetry))| CommandEvent {
            tick,
            command,
            telemetry,
        })
        .collect())
}

/// Value transform for sync lines
pub fn parse_sync_values(values: &[&str]) -> Result<u64, String> {
    let [count] = values else {
        return Err(format!(
            "expected 1 value (frame_count), found {}",
            values.len()
        ));
    };
    parse_frame_count(count)
}

/// Value transform for command lines
pub fn parse_command_values(values: &[&str]) -> Result<(Option<String>, Telemetry), String> {
    let [label, left, right] = values else {
        return Err(format!(
            "expected 3 values (command,left_speed,right_speed), found {}",
            values.len()
        ));
    };

    let label = label.trim();
    let command = if NO_COMMAND_LABELS.contains(&label) {
        None
    } else {
        Some(label.to_string())
    };

    Ok((
        command,
        Telemetry::new(parse_speed(left)?, parse_speed(right)?),
    ))
}

fn parse_frame_count(field: &str) -> Result<u64, String> {
    let field = field.trim();
    if let Ok(count) = field.parse::<u64>() {
        return Ok(count);
    }

    // Integral floats such as "3.0" are tolerated; anything else is not
    match field.parse::<f64>() {
        Ok(v) if v < 0.0 => Err(format!("negative frame count '{field}'")),
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v <= u64::MAX as f64 => Ok(v as u64),
        _ => Err(format!("invalid frame count '{field}'")),
    }
}

fn parse_speed(field: &str) -> Result<f64, String> {
    let field = field.trim();
    match field.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("invalid speed '{field}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_read_sync_log() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sync.txt");
        fs::write(&path, "1,3\n0,2\n2,0\n").unwrap();

        let counts = read_sync_log(&path).unwrap();
        assert_eq!(
            counts,
            vec![
                SyncCount::new(0, 2),
                SyncCount::new(1, 3),
                SyncCount::new(2, 0)
            ]
        );
    }

    #[test]
    fn test_read_command_log() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("commands.txt");
        fs::write(&path, "2,left,10,-10\n0,forward,100,100\n2,right,-5,5\n1,,0,0\n").unwrap();

        let cmds = read_command_log(&path).unwrap();
        assert_eq!(
            cmds,
            vec![
                CommandEvent::new(0, Some("forward"), 100.0, 100.0),
                CommandEvent::new(1, None, 0.0, 0.0),
                CommandEvent::new(2, Some("right"), -5.0, 5.0),
            ]
        );
    }

    #[test]
    fn test_sync_values() {
        assert_eq!(parse_sync_values(&["4"]), Ok(4));
        assert_eq!(parse_sync_values(&[" 4.0 "]), Ok(4));
        assert!(parse_sync_values(&["-1"]).unwrap_err().contains("negative"));
        assert!(parse_sync_values(&["2.5"]).is_err());
        assert!(parse_sync_values(&["x"]).is_err());
        assert!(parse_sync_values(&[]).is_err());
        assert!(parse_sync_values(&["1", "2"]).is_err());
    }

    #[test]
    fn test_command_values() {
        let (cmd, telemetry) = parse_command_values(&["None", "1.5", "-2"]).unwrap();
        assert_eq!(cmd, None);
        assert_eq!(telemetry, Telemetry::new(1.5, -2.0));

        let (cmd, _) = parse_command_values(&[" left ", "0", "0"]).unwrap();
        assert_eq!(cmd.as_deref(), Some("left"));

        assert!(parse_command_values(&["left", "fast", "0"]).is_err());
        assert!(parse_command_values(&["left", "0"]).is_err());
        assert!(parse_command_values(&["left", "nan", "0"]).is_err());
    }

    #[test]
    fn test_negative_count_in_file_fails_with_location() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sync.txt");
        fs::write(&path, "0,2\n1,-3\n").unwrap();

        let err = read_sync_log(&path).unwrap_err();
        assert!(matches!(err, ContractError::ValueParse { line: 2, .. }));
        assert!(err.to_string().contains("negative frame count"));
    }
}
