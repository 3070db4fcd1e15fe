//! Command vocabulary - closed enumeration of command codes
//!
//! Ties together the three views of a command: the numeric code used for
//! output directories, the label written by the recorder, and a readable name.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::ContractError;

/// Numeric command code; doubles as the bucket directory name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandCode(pub u8);

impl CommandCode {
    /// Reserved code for "no command"
    pub const NOOP: CommandCode = CommandCode(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of the vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub code: CommandCode,

    /// Label as written in `commands.txt`
    pub label: String,

    /// Human-readable name for reports
    #[serde(default)]
    pub name: String,
}

impl CommandSpec {
    pub fn new(code: u8, label: &str, name: &str) -> Self {
        Self {
            code: CommandCode(code),
            label: label.to_string(),
            name: name.to_string(),
        }
    }
}

/// Validated command vocabulary
///
/// Codes are contiguous from 0, code 0 is the no-op command, labels are
/// unique. Anything else is rejected at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CommandSpec>", into = "Vec<CommandSpec>")]
pub struct CommandSet {
    specs: Vec<CommandSpec>,
    #[serde(skip)]
    by_label: HashMap<String, CommandCode>,
}

impl CommandSet {
    /// Build a vocabulary from its entries, in any order
    pub fn new(mut specs: Vec<CommandSpec>) -> Result<Self, ContractError> {
        if specs.is_empty() {
            return Err(ContractError::config_validation(
                "commands",
                "command set cannot be empty",
            ));
        }

        specs.sort_by_key(|s| s.code);
        for (expected, spec) in specs.iter().enumerate() {
            if spec.code.index() != expected {
                return Err(ContractError::config_validation(
                    format!("commands[code={}]", spec.code),
                    format!(
                        "command codes must be unique and contiguous from 0, expected {expected}"
                    ),
                ));
            }
        }

        let mut by_label = HashMap::with_capacity(specs.len());
        for spec in &specs {
            if spec.label.trim().is_empty() {
                return Err(ContractError::config_validation(
                    format!("commands[code={}].label", spec.code),
                    "label cannot be empty",
                ));
            }
            if by_label.insert(spec.label.clone(), spec.code).is_some() {
                return Err(ContractError::config_validation(
                    format!("commands[label={}]", spec.label),
                    "duplicate command label",
                ));
            }
        }

        Ok(Self { specs, by_label })
    }

    /// Resolve a recorded label to its code
    ///
    /// `None` and labels outside the vocabulary map to [`CommandCode::NOOP`].
    pub fn resolve(&self, label: Option<&str>) -> CommandCode {
        label
            .and_then(|l| self.lookup(l))
            .unwrap_or(CommandCode::NOOP)
    }

    /// Exact label lookup
    pub fn lookup(&self, label: &str) -> Option<CommandCode> {
        self.by_label.get(label).copied()
    }

    pub fn get(&self, code: CommandCode) -> Option<&CommandSpec> {
        self.specs.get(code.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandSpec> {
        self.specs.iter()
    }

    pub fn codes(&self) -> impl Iterator<Item = CommandCode> + '_ {
        self.specs.iter().map(|s| s.code)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for CommandSet {
    /// The seven-command vocabulary of the teleoperation rig
    fn default() -> Self {
        let specs = vec![
            CommandSpec::new(0, "nop", "no-op"),
            CommandSpec::new(1, "forward", "forward"),
            CommandSpec::new(2, "backward", "backward"),
            CommandSpec::new(3, "left", "turn left"),
            CommandSpec::new(4, "right", "turn right"),
            CommandSpec::new(5, "forward_left", "forward and left"),
            CommandSpec::new(6, "forward_right", "forward and right"),
        ];
        let by_label = specs.iter().map(|s| (s.label.clone(), s.code)).collect();
        Self { specs, by_label }
    }
}

impl TryFrom<Vec<CommandSpec>> for CommandSet {
    type Error = ContractError;

    fn try_from(specs: Vec<CommandSpec>) -> Result<Self, Self::Error> {
        Self::new(specs)
    }
}

impl From<CommandSet> for Vec<CommandSpec> {
    fn from(set: CommandSet) -> Self {
        set.specs
    }
}
