#![forbid(unsafe_code)]

//! Composite operations: one semantic user action as an ordered list of
//! atomic steps.
//!
//! Steps are appended while the composite is being built and frozen as soon
//! as the first one runs. Applied steps always form a prefix of the list, so
//! the composite tracks progress with a single count.
//!
//! ```text
//!  steps:   [ s0 ][ s1 ][ s2 ][ s3 ]
//!  applied:  ████  ████
//!                        ^ applied_count = 2
//!  execute_step(2) runs s2; undo_prefix(2) reverts s1 then s0
//! ```

use super::command::{AtomicOp, CommandError, CommandMetadata, CommandResult, Step};

/// A named, ordered sequence of atomic steps.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct UserOperation<O> {
    metadata: CommandMetadata,
    steps: Vec<Step<O>>,
    applied: usize,
}

impl<O: AtomicOp> UserOperation<O> {
    /// Create an empty composite.
    #[must_use]
    pub fn new(metadata: CommandMetadata) -> Self {
        Self {
            metadata,
            steps: Vec::new(),
            applied: 0,
        }
    }

    /// Append a step.
    ///
    /// # Errors
    ///
    /// [`CommandError::InvalidState`] once any step has run.
    pub fn push_step(&mut self, op: O) -> CommandResult {
        if self.applied > 0 {
            return Err(CommandError::InvalidState(format!(
                "'{}' is frozen; cannot append steps",
                self.metadata.name
            )));
        }
        self.steps.push(Step::new(op));
        Ok(())
    }

    /// Builder-style [`push_step`](Self::push_step) for hand-built fixtures.
    #[cfg(test)]
    #[must_use]
    pub(crate) fn with_step(mut self, op: O) -> Self {
        assert!(self.applied == 0, "'{}' is frozen", self.metadata.name);
        self.steps.push(Step::new(op));
        self
    }

    /// Run step `index`, which must be the next unapplied one.
    ///
    /// # Errors
    ///
    /// [`CommandError::InvalidState`] if `index` is not the next step.
    pub fn execute_step(&mut self, index: usize, target: &mut O::Target) -> CommandResult {
        if index != self.applied || index >= self.steps.len() {
            return Err(CommandError::InvalidState(format!(
                "'{}': step {} requested, next is {} of {}",
                self.metadata.name,
                index,
                self.applied,
                self.steps.len()
            )));
        }
        self.steps[index].execute(target)?;
        self.applied += 1;
        Ok(())
    }

    /// Run every remaining step in order.
    ///
    /// On failure, steps run by this call are reverted in reverse order.
    pub fn execute_all(&mut self, target: &mut O::Target) -> CommandResult {
        let start = self.applied;
        for i in start..self.steps.len() {
            if let Err(e) = self.execute_step(i, target) {
                for j in (start..self.applied).rev() {
                    let _ = self.steps[j].undo(target);
                }
                self.applied = start;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Revert the first `n` steps, last first. `n` must equal the number of
    /// applied steps.
    ///
    /// # Errors
    ///
    /// [`CommandError::InvalidState`] if `n` is not the applied count.
    pub fn undo_prefix(&mut self, n: usize, target: &mut O::Target) -> CommandResult {
        if n != self.applied {
            return Err(CommandError::InvalidState(format!(
                "'{}': cannot roll back {} steps, {} applied",
                self.metadata.name, n, self.applied
            )));
        }
        for i in (0..n).rev() {
            self.steps[i].undo(target)?;
            self.applied = i;
        }
        Ok(())
    }

    /// Revert every applied step, last first.
    pub fn undo_all(&mut self, target: &mut O::Target) -> CommandResult {
        self.undo_prefix(self.applied, target)
    }

    #[must_use]
    pub fn metadata(&self) -> &CommandMetadata {
        &self.metadata
    }

    pub(crate) fn metadata_mut(&mut self) -> &mut CommandMetadata {
        &mut self.metadata
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.metadata.description
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of steps run so far.
    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.applied
    }

    #[must_use]
    pub fn is_fully_applied(&self) -> bool {
        self.applied == self.steps.len()
    }

    #[must_use]
    pub fn steps(&self) -> &[Step<O>] {
        &self.steps
    }

    /// Step descriptions in execution order.
    #[must_use]
    pub fn descriptions(&self) -> Vec<String> {
        self.steps.iter().map(Step::describe).collect()
    }

    /// Check that the applied steps form a prefix matching the count, as a
    /// deserialized composite must.
    pub(crate) fn is_consistent(&self) -> bool {
        self.applied <= self.steps.len()
            && self
                .steps
                .iter()
                .enumerate()
                .all(|(i, s)| s.is_applied() == (i < self.applied))
    }
}
