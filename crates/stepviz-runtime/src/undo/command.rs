#![forbid(unsafe_code)]

//! Atomic operation contract for the undo/redo engine.
//!
//! This module provides the [`AtomicOp`] trait for the smallest reversible
//! mutations of a [`Container`], the [`Step`] wrapper that enforces their
//! temporal contract, and the error and metadata types shared by the rest of
//! the engine.
//!
//! # Design Principles
//!
//! 1. **Explicit state**: an op captures everything `revert` needs while it
//!    applies; parameters never change after construction
//! 2. **Structured positions**: renderers ask [`AtomicOp::affected`] instead
//!    of parsing descriptions
//! 3. **Plain values**: ops are `Clone` enums, so copying a composite into
//!    history is a deep copy including captured state
//!
//! # Invariants
//!
//! - `apply()` followed by `revert()` restores the prior container exactly
//! - An op whose precondition fails during `apply()` records the skip in its
//!   capture, and its `revert()` is a no-op
//! - A [`Step`] is `Applied` exactly when its op holds a capture from the
//!   most recent `apply()`
//!
//! # Failure Modes
//!
//! - **Contract misuse**: executing an applied step or undoing a step that
//!   never ran
//!   - Mitigation: [`Step`] rejects both with [`CommandError::InvalidState`]
//! - **State drift**: the container changed behind the engine's back
//!   - Mitigation: ops re-check preconditions and skip instead of corrupting

use std::fmt;

use crate::structures::{Container, NodeId};

/// Source of a composite operation: who or what requested it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum CommandSource {
    /// Direct request (command line, button).
    #[default]
    User,
    /// Structured intent from an external producer.
    Intent,
    /// Restored from a saved history.
    Replay,
}

impl CommandSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Intent => "intent",
            Self::Replay => "replay",
        }
    }
}

/// Metadata attached to every composite for history display.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct CommandMetadata {
    /// Short name (e.g. "Insert").
    pub name: String,
    /// Human-readable description (e.g. "Insert 99 at index 2").
    pub description: String,
    /// Who/what triggered the operation.
    #[cfg_attr(feature = "state-persistence", serde(default))]
    pub source: CommandSource,
}

impl CommandMetadata {
    /// Create new metadata.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            source: CommandSource::User,
        }
    }

    /// Set the command source.
    #[must_use]
    pub fn with_source(mut self, source: CommandSource) -> Self {
        self.source = source;
        self
    }
}

impl Default for CommandMetadata {
    fn default() -> Self {
        Self::new("Unknown", "")
    }
}

/// Result of a step execution or undo.
pub type CommandResult = Result<(), CommandError>;

/// Errors raised by the engine.
///
/// Invalid user parameters surface from the composite builders; contract
/// violations surface from [`Step`] and the stepper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Position is out of bounds.
    PositionOutOfBounds { position: usize, length: usize },
    /// Container is at capacity.
    CapacityExceeded { capacity: usize },
    /// Tree node does not exist.
    NodeNotFound(NodeId),
    /// Parameters do not describe a valid operation.
    InvalidInput(String),
    /// Composite has no steps and cannot be staged.
    EmptyOperation(String),
    /// Command cannot run in the current state.
    InvalidState(String),
    /// Operation is not offered by this structure.
    Unsupported { structure: String, operation: String },
    /// A partially executed composite blocks staging.
    StagingBusy(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PositionOutOfBounds { position, length } => {
                write!(f, "position {} out of bounds (length {})", position, length)
            }
            Self::CapacityExceeded { capacity } => {
                write!(f, "capacity {} exceeded", capacity)
            }
            Self::NodeNotFound(id) => write!(f, "node {} not found", id),
            Self::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            Self::EmptyOperation(name) => write!(f, "operation '{}' has no steps", name),
            Self::InvalidState(msg) => write!(f, "invalid state: {}", msg),
            Self::Unsupported {
                structure,
                operation,
            } => write!(f, "{} does not support '{}'", structure, operation),
            Self::StagingBusy(name) => {
                write!(f, "'{}' is partially executed; finish it first", name)
            }
        }
    }
}

impl std::error::Error for CommandError {}

/// Positions touched by an atomic operation, for highlighting.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Affected {
    /// Array cells.
    Indices(Vec<usize>),
    /// Tree nodes.
    Nodes(Vec<NodeId>),
    /// The top of a stack.
    StackTop,
    /// Nothing addressable.
    #[default]
    None,
}

impl fmt::Display for Affected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Indices(ix) => {
                let parts: Vec<String> = ix.iter().map(|i| format!("[{i}]")).collect();
                f.write_str(&parts.join(" "))
            }
            Self::Nodes(ids) => {
                let parts: Vec<String> = ids.iter().map(ToString::to_string).collect();
                f.write_str(&parts.join(" "))
            }
            Self::StackTop => f.write_str("top"),
            Self::None => f.write_str("-"),
        }
    }
}

/// What a single `apply` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The container was mutated.
    Applied,
    /// Precondition failed; the container is untouched.
    Skipped(&'static str),
}

/// The smallest reversible mutation of a container.
///
/// Implementors hold immutable parameters plus an optional capture that
/// `apply` fills in and `revert` consumes.
pub trait AtomicOp: Clone + fmt::Debug {
    /// Container family this op mutates.
    type Target: Container;

    /// Apply the mutation, capturing what `revert` needs.
    fn apply(&mut self, target: &mut Self::Target) -> Outcome;

    /// Reverse the last `apply`. A skipped apply reverts as a no-op.
    fn revert(&mut self, target: &mut Self::Target);

    /// Human-readable description. Valid before the op has run.
    fn describe(&self) -> String;

    /// Positions this op touches.
    fn affected(&self) -> Affected;

    /// Stable kind tag (e.g. "write", "connect").
    fn kind_name(&self) -> &'static str;

    /// Whether the last `apply` was skipped.
    fn was_skipped(&self) -> bool {
        false
    }
}

/// Temporal state of a [`Step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum StepState {
    #[default]
    NotRun,
    Applied,
}

/// An atomic op plus its `NotRun | Applied` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Step<O> {
    op: O,
    state: StepState,
}

impl<O: AtomicOp> Step<O> {
    /// Wrap a freshly built op.
    #[must_use]
    pub fn new(op: O) -> Self {
        Self {
            op,
            state: StepState::NotRun,
        }
    }

    /// Apply the op.
    ///
    /// # Errors
    ///
    /// [`CommandError::InvalidState`] if the step is already applied.
    pub fn execute(&mut self, target: &mut O::Target) -> Result<Outcome, CommandError> {
        if self.state == StepState::Applied {
            let msg = format!("'{}' executed twice", self.op.describe());
            tracing::error!(target: "stepviz.undo", op = self.op.kind_name(), "{msg}");
            return Err(CommandError::InvalidState(msg));
        }
        let outcome = self.op.apply(target);
        self.state = StepState::Applied;
        match outcome {
            Outcome::Applied => tracing::debug!(
                target: "stepviz.undo",
                op = self.op.kind_name(),
                step = %self.op.describe(),
                "step applied"
            ),
            Outcome::Skipped(reason) => tracing::warn!(
                target: "stepviz.undo",
                op = self.op.kind_name(),
                step = %self.op.describe(),
                reason,
                "step skipped"
            ),
        }
        Ok(outcome)
    }

    /// Revert the op.
    ///
    /// # Errors
    ///
    /// [`CommandError::InvalidState`] if the step has not run.
    pub fn undo(&mut self, target: &mut O::Target) -> CommandResult {
        if self.state == StepState::NotRun {
            let msg = format!("'{}' undone before it ran", self.op.describe());
            tracing::error!(target: "stepviz.undo", op = self.op.kind_name(), "{msg}");
            return Err(CommandError::InvalidState(msg));
        }
        self.op.revert(target);
        self.state = StepState::NotRun;
        tracing::debug!(
            target: "stepviz.undo",
            op = self.op.kind_name(),
            step = %self.op.describe(),
            "step reverted"
        );
        Ok(())
    }

    #[must_use]
    pub fn state(&self) -> StepState {
        self.state
    }

    #[must_use]
    pub fn is_applied(&self) -> bool {
        self.state == StepState::Applied
    }

    /// The wrapped op.
    #[must_use]
    pub fn op(&self) -> &O {
        &self.op
    }

    #[must_use]
    pub fn describe(&self) -> String {
        self.op.describe()
    }

    #[must_use]
    pub fn affected(&self) -> Affected {
        self.op.affected()
    }
}
