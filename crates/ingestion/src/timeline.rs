//! Sparse timeline reader
//!
//! Reads `key,val1,...,valN` logs keyed by tick. Lines may be unordered and
//! ticks may repeat; the last line for a tick wins and the result is sorted
//! ascending by tick.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use contracts::{ContractError, Tick};
use tracing::{debug, trace};

/// Tick-ordered records with duplicates collapsed
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline<V> {
    entries: Vec<(Tick, V)>,
}

impl<V> Timeline<V> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (Tick, V)> {
        self.entries.iter()
    }

    pub fn first_tick(&self) -> Option<Tick> {
        self.entries.first().map(|(t, _)| *t)
    }

    pub fn last_tick(&self) -> Option<Tick> {
        self.entries.last().map(|(t, _)| *t)
    }

    pub fn into_vec(self) -> Vec<(Tick, V)> {
        self.entries
    }
}

impl<V> IntoIterator for Timeline<V> {
    type Item = (Tick, V);
    type IntoIter = std::vec::IntoIter<(Tick, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Coerce a tick field: parse as float, truncate toward zero
///
/// Recorders occasionally write `12.0` for tick 12, so fractional keys are
/// accepted. Negative and non-finite keys are rejected.
pub fn parse_tick(field: &str) -> Result<Tick, String> {
    let field = field.trim();
    let value: f64 = field
        .parse()
        .map_err(|_| format!("invalid tick '{field}'"))?;

    if !value.is_finite() {
        return Err(format!("tick '{field}' is not finite"));
    }
    let truncated = value.trunc();
    if truncated < 0.0 {
        return Err(format!("tick '{field}' is negative"));
    }
    if truncated > Tick::MAX as f64 {
        return Err(format!("tick '{field}' is out of range"));
    }
    Ok(truncated as Tick)
}

/// Read a timeline file
///
/// `transform` receives the value fields of each line (everything after the
/// key) and returns the parsed record or a reason for rejecting it.
///
/// # Errors
/// - `Io` if the file cannot be read
/// - `MalformedLine` if a line has no key
/// - `ValueParse` if the key or the transform fails
pub fn read_timeline<V, F>(path: &Path, transform: F) -> Result<Timeline<V>, ContractError>
where
    F: FnMut(&[&str]) -> Result<V, String>,
{
    let file = File::open(path)?;
    read_timeline_from(BufReader::new(file), path, transform)
}

/// Read a timeline from any buffered reader; `source` names it in errors
pub fn read_timeline_from<R, V, F>(
    reader: R,
    source: impl Into<PathBuf>,
    mut transform: F,
) -> Result<Timeline<V>, ContractError>
where
    R: BufRead,
    F: FnMut(&[&str]) -> Result<V, String>,
{
    let source = source.into();
    let mut latest: BTreeMap<Tick, V> = BTreeMap::new();
    let mut lines_read = 0usize;

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        lines_read += 1;

        let fields: Vec<&str> = line.split(',').collect();
        let (key, values) = match fields.split_first() {
            Some((key, values)) if !key.trim().is_empty() => (*key, values),
            _ => {
                return Err(ContractError::malformed_line(
                    &source,
                    line_no,
                    "missing tick field",
                ))
            }
        };

        let tick = parse_tick(key).map_err(|m| ContractError::value_parse(&source, line_no, m))?;
        let value =
            transform(values).map_err(|m| ContractError::value_parse(&source, line_no, m))?;

        if latest.insert(tick, value).is_some() {
            trace!(source = %source.display(), tick, line = line_no, "Duplicate tick, keeping later line");
        }
    }

    debug!(
        source = %source.display(),
        lines = lines_read,
        ticks = latest.len(),
        "Timeline loaded"
    );

    Ok(Timeline {
        entries: latest.into_iter().collect(),
    })
}
