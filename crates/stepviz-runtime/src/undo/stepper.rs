#![forbid(unsafe_code)]

//! Staging controller: holds at most one composite and walks it step by step.
//!
//! # State Machine
//!
//! ```text
//!            stage(op)                start()
//!   Idle ───────────────► Staged ───────────────► Visualizing
//!    ▲                     │  │                     │   │
//!    │      cancel()       │  │ execute_all()       │   │ step() (cursor < N)
//!    ├─────────────────────┘  │                     │   └──────┐
//!    │◄───────────────────────┘ (commit)            │          │
//!    │◄─────────────────────────────────────────────┘ ◄────────┘
//!          step() reaching cursor == N (commit)
//! ```
//!
//! Staging while a composite is already held applies the [`RestagePolicy`]:
//! an untouched composite is dropped, a partially run one is rolled back
//! (default) or blocks the new stage.
//!
//! The stepper never owns history. A finished composite is handed back to
//! the caller, which commits it.

use std::fmt;

use super::command::{Affected, AtomicOp, CommandError, CommandResult};
use super::user_operation::UserOperation;

/// Stepper phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Phase {
    #[default]
    Idle,
    Staged,
    Visualizing,
}

impl Phase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Staged => "staged",
            Self::Visualizing => "visualizing",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happens to a staged composite when another one is staged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    any(feature = "policy-config", feature = "state-persistence"),
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum RestagePolicy {
    /// Revert any steps already run, then discard.
    #[default]
    Rollback,
    /// Refuse with [`CommandError::StagingBusy`] once any step has run.
    Forbid,
}

/// Result of a single [`Stepper::step`].
#[derive(Debug)]
pub enum StepOutcome<O> {
    /// A step ran; more remain.
    Advanced { cursor: usize, total: usize },
    /// The last step ran. The composite is ready to commit.
    Finished(UserOperation<O>),
}

/// One step as shown to a renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepView {
    pub index: usize,
    pub description: String,
    pub affected: Affected,
}

/// Snapshot of the staged composite for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingView {
    pub name: String,
    pub description: String,
    pub phase: Phase,
    pub cursor: usize,
    pub total: usize,
    /// Step that the next `step()` will run.
    pub next: Option<StepView>,
    /// Step most recently run.
    pub last: Option<StepView>,
}

impl fmt::Display for StagingView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] step {}/{}",
            self.name, self.phase, self.cursor, self.total
        )?;
        if let Some(next) = &self.next {
            write!(f, " next: {} @ {}", next.description, next.affected)?;
        }
        Ok(())
    }
}

/// Holds at most one staged composite and its cursor.
#[derive(Debug, Clone)]
pub struct Stepper<O> {
    staged: Option<UserOperation<O>>,
    phase: Phase,
    policy: RestagePolicy,
}

impl<O: AtomicOp> Default for Stepper<O> {
    fn default() -> Self {
        Self::new(RestagePolicy::default())
    }
}

impl<O: AtomicOp> Stepper<O> {
    #[must_use]
    pub fn new(policy: RestagePolicy) -> Self {
        Self {
            staged: None,
            phase: Phase::Idle,
            policy,
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn policy(&self) -> RestagePolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: RestagePolicy) {
        self.policy = policy;
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    /// Number of steps of the held composite already run.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.staged.as_ref().map_or(0, UserOperation::applied_count)
    }

    #[must_use]
    pub fn staged(&self) -> Option<&UserOperation<O>> {
        self.staged.as_ref()
    }

    /// Stage `op`, replacing whatever is held according to the policy.
    ///
    /// # Errors
    ///
    /// - [`CommandError::EmptyOperation`] for a composite with no steps
    /// - [`CommandError::InvalidState`] for a composite that already ran
    /// - [`CommandError::StagingBusy`] when the held composite is partially
    ///   run and the policy is [`RestagePolicy::Forbid`]
    pub fn stage(&mut self, op: UserOperation<O>, target: &mut O::Target) -> CommandResult {
        if op.is_empty() {
            return Err(CommandError::EmptyOperation(op.name().to_string()));
        }
        if op.applied_count() > 0 {
            return Err(CommandError::InvalidState(format!(
                "'{}' has already run",
                op.name()
            )));
        }
        self.discard(target)?;
        tracing::debug!(
            target: "stepviz.undo",
            name = op.name(),
            steps = op.len(),
            "staged"
        );
        self.staged = Some(op);
        self.phase = Phase::Staged;
        Ok(())
    }

    /// Drop the held composite, if any, according to the policy.
    ///
    /// # Errors
    ///
    /// [`CommandError::StagingBusy`] under [`RestagePolicy::Forbid`] when
    /// steps have run.
    pub fn discard(&mut self, target: &mut O::Target) -> CommandResult {
        let Some(held) = self.staged.as_mut() else {
            return Ok(());
        };
        let applied = held.applied_count();
        if applied > 0 {
            match self.policy {
                RestagePolicy::Forbid => {
                    return Err(CommandError::StagingBusy(held.name().to_string()));
                }
                RestagePolicy::Rollback => {
                    held.undo_prefix(applied, target)?;
                    tracing::warn!(
                        target: "stepviz.undo",
                        name = held.name(),
                        rolled_back = applied,
                        "discarded partially run composite"
                    );
                }
            }
        } else {
            tracing::warn!(
                target: "stepviz.undo",
                name = held.name(),
                "discarded staged composite"
            );
        }
        self.staged = None;
        self.phase = Phase::Idle;
        Ok(())
    }

    /// Enter step-by-step mode. Does not mutate the container.
    ///
    /// # Errors
    ///
    /// [`CommandError::InvalidState`] unless `Staged`.
    pub fn start(&mut self) -> CommandResult {
        self.expect_phase(Phase::Staged, "start")?;
        self.phase = Phase::Visualizing;
        Ok(())
    }

    /// Run the step at the cursor. Running the last step finishes the
    /// composite and returns to `Idle`.
    ///
    /// # Errors
    ///
    /// [`CommandError::InvalidState`] unless `Visualizing`.
    pub fn step(&mut self, target: &mut O::Target) -> Result<StepOutcome<O>, CommandError> {
        self.expect_phase(Phase::Visualizing, "step")?;
        let Some(op) = self.staged.as_mut() else {
            return Err(CommandError::InvalidState("nothing staged".into()));
        };
        let cursor = op.applied_count();
        op.execute_step(cursor, target)?;
        let total = op.len();
        if op.is_fully_applied() {
            return Ok(StepOutcome::Finished(self.take_finished()?));
        }
        Ok(StepOutcome::Advanced {
            cursor: cursor + 1,
            total,
        })
    }

    /// Discard the staged composite. Only valid before any step has run.
    ///
    /// # Errors
    ///
    /// [`CommandError::InvalidState`] unless `Staged`.
    pub fn cancel(&mut self) -> Result<UserOperation<O>, CommandError> {
        self.expect_phase(Phase::Staged, "cancel")?;
        self.phase = Phase::Idle;
        let op = self
            .staged
            .take()
            .ok_or_else(|| CommandError::InvalidState("nothing staged".into()))?;
        tracing::debug!(target: "stepviz.undo", name = op.name(), "cancelled");
        Ok(op)
    }

    /// Run every step of the staged composite at once and finish it.
    ///
    /// # Errors
    ///
    /// [`CommandError::InvalidState`] unless `Staged`.
    pub fn execute_all(&mut self, target: &mut O::Target) -> Result<UserOperation<O>, CommandError> {
        self.expect_phase(Phase::Staged, "execute_all")?;
        let Some(op) = self.staged.as_mut() else {
            return Err(CommandError::InvalidState("nothing staged".into()));
        };
        op.execute_all(target)?;
        self.take_finished()
    }

    /// Renderer snapshot, or `None` when idle.
    #[must_use]
    pub fn view(&self) -> Option<StagingView> {
        let op = self.staged.as_ref()?;
        let cursor = op.applied_count();
        let step_view = |index: usize| {
            op.steps().get(index).map(|s| StepView {
                index,
                description: s.describe(),
                affected: s.affected(),
            })
        };
        Some(StagingView {
            name: op.name().to_string(),
            description: op.description().to_string(),
            phase: self.phase,
            cursor,
            total: op.len(),
            next: step_view(cursor),
            last: cursor.checked_sub(1).and_then(step_view),
        })
    }

    fn take_finished(&mut self) -> Result<UserOperation<O>, CommandError> {
        self.phase = Phase::Idle;
        self.staged
            .take()
            .ok_or_else(|| CommandError::InvalidState("nothing staged".into()))
    }

    fn expect_phase(&self, phase: Phase, action: &str) -> CommandResult {
        if self.phase == phase {
            return Ok(());
        }
        let msg = format!("{action} requires phase {phase}, stepper is {}", self.phase);
        tracing::error!(target: "stepviz.undo", action, phase = %self.phase, "{msg}");
        Err(CommandError::InvalidState(msg))
    }
}

impl<O> Stepper<O>
where
    O: AtomicOp,
    O::Target: Clone,
{
    /// A copy of `target` as it will be once the held composite is
    /// released: any applied prefix is rolled back on the copy only.
    ///
    /// A composite staged over a partially run one must be built from this
    /// state, since staging rolls the live container back first.
    pub fn settled(&self, target: &O::Target) -> Result<O::Target, CommandError> {
        let mut base = target.clone();
        if let Some(held) = self.staged.as_ref().filter(|op| op.applied_count() > 0) {
            held.clone().undo_prefix(held.applied_count(), &mut base)?;
        }
        Ok(base)
    }
}
