#![forbid(unsafe_code)]

//! Structured operation requests.
//!
//! An [`Intent`] names a structure, an action and optionally how to run it.
//! The command line, tests and any external producer all build intents, and
//! [`Workspace::submit`](crate::workspace::Workspace::submit) treats them
//! identically regardless of origin.

use std::fmt;

use crate::structures::StructureKind;

/// How a submitted composite runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    any(feature = "policy-config", feature = "state-persistence"),
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Mode {
    /// Stage and wait for `start`/`step`.
    #[default]
    Step,
    /// Execute every step and commit at once.
    Immediate,
}

/// Operation to perform on a structure.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "op", rename_all = "snake_case")
)]
pub enum Action {
    /// Replace the contents with these values.
    Init { values: Vec<i64> },
    /// Build a tree from level-order slots; `None` is an empty slot.
    InitTree { slots: Vec<Option<i64>> },
    Insert { index: usize, value: i64 },
    Delete { index: usize },
    Sort,
    Push { value: i64 },
    Pop,
    Clear,
    Reverse,
}

impl Action {
    /// Stable lowercase name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Init { .. } | Self::InitTree { .. } => "init",
            Self::Insert { .. } => "insert",
            Self::Delete { .. } => "delete",
            Self::Sort => "sort",
            Self::Push { .. } => "push",
            Self::Pop => "pop",
            Self::Clear => "clear",
            Self::Reverse => "reverse",
        }
    }

    /// Whether the action replaces the structure wholesale.
    #[must_use]
    pub const fn is_init(&self) -> bool {
        matches!(self, Self::Init { .. } | Self::InitTree { .. })
    }
}

/// A request to run `action` on `structure`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Intent {
    pub structure: StructureKind,
    pub action: Action,
    /// `None` uses the configured default.
    #[cfg_attr(feature = "state-persistence", serde(default))]
    pub mode: Option<Mode>,
}

impl Intent {
    #[must_use]
    pub fn new(structure: StructureKind, action: Action) -> Self {
        Self {
            structure,
            action,
            mode: None,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Parse an intent from JSON, e.g.
    /// `{"structure":"array","action":{"op":"insert","index":2,"value":99}}`.
    #[cfg(feature = "state-persistence")]
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.structure, self.action.name())?;
        match &self.action {
            Action::Init { values } => write!(f, " {values:?}"),
            Action::InitTree { slots } => write!(f, " {slots:?}"),
            Action::Insert { index, value } => write!(f, " {index} {value}"),
            Action::Delete { index } => write!(f, " {index}"),
            Action::Push { value } => write!(f, " {value}"),
            Action::Sort | Action::Pop | Action::Clear | Action::Reverse => Ok(()),
        }
    }
}
