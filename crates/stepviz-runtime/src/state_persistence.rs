#![forbid(unsafe_code)]

//! JSON snapshots of containers and their undo history.
//!
//! A snapshot stores every committed composite as (name, description,
//! ordered ops) and every op as (kind, parameters, captured state). Loading
//! restores the captures verbatim; no decomposition is re-run, so an undo
//! after loading reverses exactly what was recorded.
//!
//! # Format
//!
//! ```json
//! {
//!   "version": 1,
//!   "active": "array",
//!   "array": { "cells": [1, 2], "capacity": { "fixed": 100 } },
//!   "array_history": {
//!     "undo": [{ "metadata": { "name": "Init", ... }, "steps": [...], "applied": 2 }],
//!     "redo": [],
//!     "records": [...]
//!   },
//!   ...
//! }
//! ```
//!
//! Staged composites are not part of a snapshot: capturing while one is
//! held is refused.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ops::{ArrayOp, StackOp, TreeOp};
use crate::policy_config::EngineConfig;
use crate::session::Session;
use crate::structures::{
    ArrayStructure, BinaryTree, Container, NodeId, StackStructure, StructureKind,
};
use crate::undo::{
    AtomicOp, CommandError, HistoryConfig, HistoryManager, HistoryRecord, Step, Stepper,
    UserOperation,
};
use crate::workspace::Workspace;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Saved undo/redo stacks of one structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySnapshot<O> {
    /// Undo entries, oldest first.
    pub undo: Vec<UserOperation<O>>,
    /// Redo entries, oldest first (the next redo is last).
    pub redo: Vec<UserOperation<O>>,
    #[serde(default)]
    pub records: Vec<HistoryRecord>,
}

impl<O: AtomicOp> HistorySnapshot<O> {
    /// Copy the stacks of `history`.
    #[must_use]
    pub fn capture(history: &HistoryManager<O>) -> Self {
        Self {
            undo: history.undo_entries().cloned().collect(),
            redo: history.redo_entries().cloned().collect(),
            records: history.records().to_vec(),
        }
    }

    /// Rebuild a manager under `config`.
    ///
    /// # Errors
    ///
    /// [`CommandError::InvalidState`] if an entry's step states contradict
    /// the stack it sits on.
    pub fn into_manager(self, config: HistoryConfig) -> Result<HistoryManager<O>, CommandError> {
        HistoryManager::from_parts(config, self.undo, self.redo, self.records)
    }

    /// Every op on either stack.
    fn ops(&self) -> impl Iterator<Item = &O> {
        self.undo
            .iter()
            .chain(&self.redo)
            .flat_map(UserOperation::steps)
            .map(Step::op)
    }
}

/// Saved state of a whole [`Workspace`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceSnapshot {
    pub version: u32,
    pub active: StructureKind,
    pub array: ArrayStructure,
    pub array_history: HistorySnapshot<ArrayOp>,
    pub stack: StackStructure,
    pub stack_history: HistorySnapshot<StackOp>,
    pub tree: BinaryTree,
    pub tree_history: HistorySnapshot<TreeOp>,
}

impl WorkspaceSnapshot {
    /// Capture `ws`.
    ///
    /// # Errors
    ///
    /// [`PersistenceError::Invalid`] with [`CommandError::StagingBusy`] while
    /// a composite is staged.
    pub fn capture(ws: &Workspace) -> Result<Self, PersistenceError> {
        if let Some(kind) = ws.staged_structure() {
            let name = ws
                .view()
                .map_or_else(|| kind.to_string(), |(_, view)| view.name);
            return Err(PersistenceError::Invalid(CommandError::StagingBusy(name)));
        }
        Ok(Self {
            version: SNAPSHOT_VERSION,
            active: ws.active(),
            array: ws.array().container().clone(),
            array_history: HistorySnapshot::capture(ws.array().history()),
            stack: ws.stack().container().clone(),
            stack_history: HistorySnapshot::capture(ws.stack().history()),
            tree: ws.tree().container().clone(),
            tree_history: HistorySnapshot::capture(ws.tree().history()),
        })
    }

    /// Rebuild a workspace. Containers keep their saved capacities; history
    /// depth and restage policy come from `config`.
    ///
    /// # Errors
    ///
    /// [`PersistenceError::Version`] for an unknown format version,
    /// [`PersistenceError::Invalid`] for inconsistent history entries, a
    /// container that breaks its own invariants, or recorded ops that
    /// reach beyond what the history could have produced.
    pub fn restore(self, config: EngineConfig) -> Result<Workspace, PersistenceError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(PersistenceError::Version(self.version));
        }
        check_array(&self.array, &self.array_history)?;
        self.stack
            .check_invariants()
            .map_err(CommandError::InvalidInput)?;
        check_tree(&self.tree, &self.tree_history)?;

        let history = config.to_history_config();
        let restage = config.staging.restage;
        let array = Session::from_parts(
            self.array,
            Stepper::new(restage),
            self.array_history.into_manager(history)?,
        );
        let stack = Session::from_parts(
            self.stack,
            Stepper::new(restage),
            self.stack_history.into_manager(history)?,
        );
        let tree = Session::from_parts(
            self.tree,
            Stepper::new(restage),
            self.tree_history.into_manager(history)?,
        );
        tracing::info!(target: "stepviz.persistence", active = %self.active, "workspace restored");
        Ok(Workspace::from_parts(config, array, stack, tree, self.active))
    }

    pub fn to_json(&self) -> Result<String, PersistenceError> {
        serde_json::to_string_pretty(self).map_err(PersistenceError::Json)
    }

    pub fn from_json_str(s: &str) -> Result<Self, PersistenceError> {
        serde_json::from_str(s).map_err(PersistenceError::Json)
    }

    /// Write the snapshot as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
        let json = self.to_json()?;
        std::fs::write(path.as_ref(), json).map_err(PersistenceError::Io)?;
        tracing::debug!(
            target: "stepviz.persistence",
            path = %path.as_ref().display(),
            "snapshot saved"
        );
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(PersistenceError::Io)?;
        Self::from_json_str(&content)
    }
}

/// No length the array ever had exceeds its current length plus the number
/// of recorded steps, so neither can a recorded resize.
fn check_array(
    array: &ArrayStructure,
    history: &HistorySnapshot<ArrayOp>,
) -> Result<(), CommandError> {
    array.check_invariants().map_err(CommandError::InvalidInput)?;
    let bound = array.len() + history.ops().count();
    match history
        .ops()
        .filter_map(ArrayOp::resize_target)
        .find(|&len| len > bound)
    {
        Some(len) => Err(CommandError::InvalidInput(format!(
            "recorded resize to {len} exceeds reachable length {bound}"
        ))),
        None => Ok(()),
    }
}

/// Node ids are handed out from the end of the arena, so every recorded
/// `CreateNode` falls within the arena plus the number of creates.
fn check_tree(tree: &BinaryTree, history: &HistorySnapshot<TreeOp>) -> Result<(), CommandError> {
    tree.check_invariants().map_err(CommandError::InvalidInput)?;
    let created: Vec<NodeId> = history.ops().filter_map(TreeOp::created_id).collect();
    let bound = tree.arena_len() + created.len();
    match created.into_iter().find(|id| id.raw() as usize > bound) {
        Some(id) => Err(CommandError::InvalidInput(format!(
            "recorded node {id} lies beyond reachable arena size {bound}"
        ))),
        None => Ok(()),
    }
}

/// Errors raised while saving or loading snapshots.
#[derive(Debug)]
pub enum PersistenceError {
    /// I/O error reading or writing a file.
    Io(std::io::Error),
    /// JSON encode/decode error.
    Json(serde_json::Error),
    /// Unknown format version.
    Version(u32),
    /// Snapshot contents violate engine invariants.
    Invalid(CommandError),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Json(e) => write!(f, "JSON error: {e}"),
            Self::Version(v) => write!(
                f,
                "unsupported snapshot version {v} (expected {SNAPSHOT_VERSION})"
            ),
            Self::Invalid(e) => write!(f, "invalid snapshot: {e}"),
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Invalid(e) => Some(e),
            Self::Version(_) => None,
        }
    }
}

impl From<CommandError> for PersistenceError {
    fn from(e: CommandError) -> Self {
        Self::Invalid(e)
    }
}
