#![forbid(unsafe_code)]

//! A container bound to its own stepper and history.
//!
//! [`Session`] is what a renderer binds to for a single structure: it can
//! read the container between steps, ask for the staging view and list the
//! committed history. All mutation goes through the stepper or history.

use crate::structures::Container;
use crate::undo::{
    AtomicOp, CommandError, CommandResult, HistoryConfig, HistoryManager, HistoryRecord, Phase,
    RestagePolicy, StagingView, StepOutcome, Stepper, UserOperation,
};

/// Result of advancing a session by one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepReport {
    /// A step ran; `cursor` of `total` are now applied.
    Advanced { cursor: usize, total: usize },
    /// The last step ran and the composite was committed.
    Committed { name: String, total: usize },
}

/// Container + stepper + history.
#[derive(Debug, Clone)]
pub struct Session<O: AtomicOp> {
    container: O::Target,
    stepper: Stepper<O>,
    history: HistoryManager<O>,
}

impl<O> Session<O>
where
    O: AtomicOp,
    O::Target: Clone,
{
    /// Bind a container.
    #[must_use]
    pub fn new(container: O::Target, history: HistoryConfig, restage: RestagePolicy) -> Self {
        Self {
            container,
            stepper: Stepper::new(restage),
            history: HistoryManager::new(history),
        }
    }

    pub(crate) fn from_parts(
        container: O::Target,
        stepper: Stepper<O>,
        history: HistoryManager<O>,
    ) -> Self {
        Self {
            container,
            stepper,
            history,
        }
    }

    #[must_use]
    pub fn container(&self) -> &O::Target {
        &self.container
    }

    #[must_use]
    pub fn history(&self) -> &HistoryManager<O> {
        &self.history
    }

    #[must_use]
    pub fn stepper(&self) -> &Stepper<O> {
        &self.stepper
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.stepper.phase()
    }

    #[must_use]
    pub fn view(&self) -> Option<StagingView> {
        self.stepper.view()
    }

    #[must_use]
    pub fn records(&self) -> &[HistoryRecord] {
        self.history.records()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.stepper.is_idle() && self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.stepper.is_idle() && self.history.can_redo()
    }

    /// Build a composite from the settled container and stage it.
    pub fn stage_with<F>(&mut self, build: F) -> CommandResult
    where
        F: FnOnce(&O::Target) -> Result<UserOperation<O>, CommandError>,
    {
        let op = build(&self.settled()?)?;
        self.stage(op)
    }

    /// The container with any partially run staged composite rolled back,
    /// which is the state a newly staged composite runs against.
    pub fn settled(&self) -> Result<O::Target, CommandError> {
        self.stepper.settled(&self.container)
    }

    /// Stage a built composite.
    pub fn stage(&mut self, op: UserOperation<O>) -> CommandResult {
        self.stepper.stage(op, &mut self.container)
    }

    /// An empty copy of the container, for building initializing composites.
    #[must_use]
    pub fn blank(&self) -> O::Target {
        let mut empty = self.container.clone();
        empty.clear();
        empty
    }

    /// Reset the container and history, then stage `op`, an initializing
    /// composite built against [`blank`](Self::blank).
    ///
    /// An empty `op`, or a held composite the restage policy will not
    /// release, leaves the session untouched.
    pub fn baseline(&mut self, op: UserOperation<O>) -> CommandResult {
        if op.is_empty() {
            return Err(CommandError::EmptyOperation(op.name().to_string()));
        }
        self.stepper.discard(&mut self.container)?;
        self.container.clear();
        self.history.clear();
        tracing::info!(
            target: "stepviz.undo",
            structure = %self.container.kind(),
            "baseline reset"
        );
        self.stage(op)
    }

    /// Drop the staged composite according to the restage policy.
    pub fn discard(&mut self) -> CommandResult {
        self.stepper.discard(&mut self.container)
    }

    pub fn start(&mut self) -> CommandResult {
        self.stepper.start()
    }

    /// Advance one step, committing when the composite finishes.
    pub fn step(&mut self) -> Result<StepReport, CommandError> {
        match self.stepper.step(&mut self.container)? {
            StepOutcome::Advanced { cursor, total } => Ok(StepReport::Advanced { cursor, total }),
            StepOutcome::Finished(op) => {
                let report = StepReport::Committed {
                    name: op.name().to_string(),
                    total: op.len(),
                };
                self.history.push(op);
                Ok(report)
            }
        }
    }

    /// Cancel a staged composite that has not started.
    pub fn cancel(&mut self) -> CommandResult {
        self.stepper.cancel().map(drop)
    }

    /// Run the staged composite to completion and commit it. Returns its
    /// name.
    pub fn execute_all(&mut self) -> Result<String, CommandError> {
        let op = self.stepper.execute_all(&mut self.container)?;
        let name = op.name().to_string();
        self.history.push(op);
        Ok(name)
    }

    /// Undo the latest commit. `None` means there is nothing to undo.
    ///
    /// Refused with [`CommandError::StagingBusy`] while a composite is
    /// staged, since it was built against the current state.
    pub fn undo(&mut self) -> Option<Result<String, CommandError>> {
        if let Err(e) = self.ensure_idle() {
            return Some(Err(e));
        }
        self.history.undo(&mut self.container)
    }

    /// Redo the latest undone commit. `None` means there is nothing to redo.
    pub fn redo(&mut self) -> Option<Result<String, CommandError>> {
        if let Err(e) = self.ensure_idle() {
            return Some(Err(e));
        }
        self.history.redo(&mut self.container)
    }

    pub fn set_restage_policy(&mut self, policy: RestagePolicy) {
        self.stepper.set_policy(policy);
    }

    fn ensure_idle(&self) -> CommandResult {
        match self.stepper.staged() {
            Some(op) => Err(CommandError::StagingBusy(op.name().to_string())),
            None => Ok(()),
        }
    }
}
