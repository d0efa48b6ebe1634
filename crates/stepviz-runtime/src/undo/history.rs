#![forbid(unsafe_code)]

//! History stack for undo/redo of whole composites.
//!
//! This module provides the [`HistoryManager`] which maintains dual stacks
//! of committed [`UserOperation`]s with support for:
//!
//! - **Depth limits**: oldest composites evicted past `max_depth`
//! - **Branch handling**: a new commit clears the redo stack
//! - **Commit log**: every commit is recorded for display, independent of
//!   the undo position
//!
//! # Invariants
//!
//! 1. `undo_stack.len() <= config.max_depth` (after any operation)
//! 2. Redo stack is cleared whenever a composite is pushed
//! 3. Every composite on the undo stack is fully applied; every composite on
//!    the redo stack is fully reverted
//! 4. A composite is never on both stacks
//!
//! ```text
//! push(op5)
//! ┌───────────────────────────────────────────────┐
//! │ Undo Stack: [op1, op2, op3, op4, op5]         │
//! │ Redo Stack: []                                │
//! └───────────────────────────────────────────────┘
//!
//! undo() x2
//! ┌───────────────────────────────────────────────┐
//! │ Undo Stack: [op1, op2, op3]                   │
//! │ Redo Stack: [op5, op4]                        │
//! └───────────────────────────────────────────────┘
//!
//! push(op6)  <-- new branch, clears redo
//! ┌───────────────────────────────────────────────┐
//! │ Undo Stack: [op1, op2, op3, op6]              │
//! │ Redo Stack: []                                │
//! └───────────────────────────────────────────────┘
//! ```

use std::collections::VecDeque;
use std::fmt;

use super::command::{AtomicOp, CommandError, CommandSource};
use super::user_operation::UserOperation;

/// Configuration for the history manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Maximum number of composites to keep in undo history.
    pub max_depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_depth: 100 }
    }
}

impl HistoryConfig {
    /// Create a new configuration with a custom depth limit.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Create unlimited configuration (for testing).
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            max_depth: usize::MAX,
        }
    }
}

/// One line of the commit log.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct HistoryRecord {
    pub name: String,
    pub description: String,
    pub steps: usize,
    pub source: CommandSource,
}

/// Manager for undo/redo history.
#[derive(Clone)]
pub struct HistoryManager<O> {
    /// Composites available for undo (newest at back).
    undo_stack: VecDeque<UserOperation<O>>,
    /// Composites available for redo (newest at back).
    redo_stack: VecDeque<UserOperation<O>>,
    /// Every commit, oldest first.
    records: Vec<HistoryRecord>,
    config: HistoryConfig,
}

impl<O> fmt::Debug for HistoryManager<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryManager")
            .field("undo_depth", &self.undo_stack.len())
            .field("redo_depth", &self.redo_stack.len())
            .field("records", &self.records.len())
            .field("config", &self.config)
            .finish()
    }
}

impl<O: AtomicOp> Default for HistoryManager<O> {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl<O: AtomicOp> HistoryManager<O> {
    /// Create a new history manager with the given configuration.
    #[must_use]
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            records: Vec::new(),
            config,
        }
    }

    // ========================================================================
    // Core Operations
    // ========================================================================

    /// Commit a fully executed composite.
    ///
    /// This clears the redo stack (new branch) and enforces the depth limit.
    /// The composite is NOT executed here.
    pub fn push(&mut self, op: UserOperation<O>) {
        debug_assert!(op.is_fully_applied(), "committed a partially applied composite");
        self.redo_stack.clear();
        self.records.push(HistoryRecord {
            name: op.name().to_string(),
            description: op.description().to_string(),
            steps: op.len(),
            source: op.metadata().source,
        });
        tracing::info!(
            target: "stepviz.undo",
            name = op.name(),
            steps = op.len(),
            "committed"
        );
        self.undo_stack.push_back(op);
        self.enforce_limits();
    }

    /// Undo the most recent composite.
    ///
    /// # Returns
    ///
    /// - `Ok(description)` if undo succeeded
    /// - `Err(error)` if undo failed (composite remains on undo stack)
    /// - `None` if there is nothing to undo
    pub fn undo(&mut self, target: &mut O::Target) -> Option<Result<String, CommandError>> {
        let mut op = self.undo_stack.pop_back()?;
        let description = op.description().to_string();

        match op.undo_all(target) {
            Ok(()) => {
                tracing::info!(target: "stepviz.undo", name = op.name(), "undone");
                self.redo_stack.push_back(op);
                Some(Ok(description))
            }
            Err(e) => {
                self.undo_stack.push_back(op);
                Some(Err(e))
            }
        }
    }

    /// Redo the most recently undone composite.
    ///
    /// # Returns
    ///
    /// - `Ok(description)` if redo succeeded
    /// - `Err(error)` if redo failed (composite remains on redo stack)
    /// - `None` if there is nothing to redo
    pub fn redo(&mut self, target: &mut O::Target) -> Option<Result<String, CommandError>> {
        let mut op = self.redo_stack.pop_back()?;
        let description = op.description().to_string();

        match op.execute_all(target) {
            Ok(()) => {
                tracing::info!(target: "stepviz.undo", name = op.name(), "redone");
                self.undo_stack.push_back(op);
                Some(Ok(description))
            }
            Err(e) => {
                self.redo_stack.push_back(op);
                Some(Err(e))
            }
        }
    }

    /// Check if undo is available.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    // ========================================================================
    // Info
    // ========================================================================

    /// Get the undo stack depth.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Get the redo stack depth.
    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Get descriptions for undo entries (most recent first).
    pub fn undo_descriptions(&self, limit: usize) -> Vec<&str> {
        self.undo_stack
            .iter()
            .rev()
            .take(limit)
            .map(|op| op.description())
            .collect()
    }

    /// Get descriptions for redo entries (most recent first).
    pub fn redo_descriptions(&self, limit: usize) -> Vec<&str> {
        self.redo_stack
            .iter()
            .rev()
            .take(limit)
            .map(|op| op.description())
            .collect()
    }

    /// Get the description of the next undo entry.
    #[must_use]
    pub fn next_undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|op| op.description())
    }

    /// Get the description of the next redo entry.
    #[must_use]
    pub fn next_redo_description(&self) -> Option<&str> {
        self.redo_stack.back().map(|op| op.description())
    }

    /// Every commit since the last clear, oldest first.
    #[must_use]
    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    /// Undo stack, oldest first.
    pub fn undo_entries(&self) -> impl Iterator<Item = &UserOperation<O>> {
        self.undo_stack.iter()
    }

    /// Redo stack, oldest first (the next redo is last).
    pub fn redo_entries(&self) -> impl Iterator<Item = &UserOperation<O>> {
        self.redo_stack.iter()
    }

    /// Get the current configuration.
    #[must_use]
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Clear all history (both stacks and the commit log). The container is
    /// not touched.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.records.clear();
    }

    /// Rebuild a manager from saved stacks.
    ///
    /// # Errors
    ///
    /// [`CommandError::InvalidState`] if an undo entry is not fully applied
    /// or a redo entry is not fully reverted.
    pub(crate) fn from_parts(
        config: HistoryConfig,
        undo: Vec<UserOperation<O>>,
        redo: Vec<UserOperation<O>>,
        records: Vec<HistoryRecord>,
    ) -> Result<Self, CommandError> {
        if let Some(bad) = undo
            .iter()
            .find(|op| !op.is_consistent() || !op.is_fully_applied())
        {
            return Err(CommandError::InvalidState(format!(
                "undo entry '{}' is not fully applied",
                bad.name()
            )));
        }
        if let Some(bad) = redo
            .iter()
            .find(|op| !op.is_consistent() || op.applied_count() != 0)
        {
            return Err(CommandError::InvalidState(format!(
                "redo entry '{}' is not fully reverted",
                bad.name()
            )));
        }
        let mut mgr = Self {
            undo_stack: undo.into(),
            redo_stack: redo.into(),
            records,
            config,
        };
        mgr.enforce_limits();
        Ok(mgr)
    }

    fn enforce_limits(&mut self) {
        while self.undo_stack.len() > self.config.max_depth {
            if let Some(evicted) = self.undo_stack.pop_front() {
                tracing::debug!(target: "stepviz.undo", name = evicted.name(), "evicted");
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
