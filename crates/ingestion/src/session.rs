//! Session discovery
//!
//! Input layout: `INPUT_DIR/<tag>/<index>/{video, sync log, command log}`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use contracts::{ContractError, SessionLayout};
use tracing::{debug, warn};

/// Files of one recorded session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    /// Recording group, e.g. `simple`
    pub tag: String,

    /// Session number inside the group
    pub index: u64,

    pub dir: PathBuf,
    pub video: PathBuf,
    pub sync: PathBuf,
    pub commands: PathBuf,
}

impl SessionPaths {
    pub fn new(tag: impl Into<String>, index: u64, dir: PathBuf, layout: &SessionLayout) -> Self {
        Self {
            tag: tag.into(),
            index,
            video: dir.join(&layout.video_file),
            sync: dir.join(&layout.sync_file),
            commands: dir.join(&layout.commands_file),
            dir,
        }
    }

    /// Names of expected files that are absent
    pub fn missing_files(&self) -> Vec<&Path> {
        [&self.video, &self.sync, &self.commands]
            .into_iter()
            .filter(|p| !p.is_file())
            .map(PathBuf::as_path)
            .collect()
    }
}

impl fmt::Display for SessionPaths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tag, self.index)
    }
}

/// Find every session below `input_dir`, sorted by tag then index
///
/// Hidden tags, plain files and non-numeric session directories are skipped.
pub fn discover_sessions(
    input_dir: &Path,
    layout: &SessionLayout,
) -> Result<Vec<SessionPaths>, ContractError> {
    if !input_dir.is_dir() {
        return Err(ContractError::input_not_found(input_dir));
    }

    let mut sessions = Vec::new();
    for tag_entry in fs::read_dir(input_dir)? {
        let tag_entry = tag_entry?;
        let tag = tag_entry.file_name().to_string_lossy().into_owned();
        let tag_dir = tag_entry.path();

        if tag.starts_with('.') || !tag_dir.is_dir() {
            debug!(path = %tag_dir.display(), "Skipping non-tag entry");
            continue;
        }

        for entry in fs::read_dir(&tag_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let dir = entry.path();

            let Some(index) = parse_session_index(&name) else {
                debug!(path = %dir.display(), "Skipping non-numeric session entry");
                continue;
            };
            if !dir.is_dir() {
                continue;
            }

            let session = SessionPaths::new(tag.clone(), index, dir, layout);
            let missing = session.missing_files();
            if !missing.is_empty() {
                warn!(
                    session = %session,
                    missing = ?missing,
                    "Session is missing input files"
                );
            }
            sessions.push(session);
        }
    }

    sessions.sort_by(|a, b| a.tag.cmp(&b.tag).then(a.index.cmp(&b.index)));
    Ok(sessions)
}

fn parse_session_index(name: &str) -> Option<u64> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}
