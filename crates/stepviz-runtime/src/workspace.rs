#![forbid(unsafe_code)]

//! One session per structure behind a single request surface.
//!
//! The workspace turns [`Intent`]s into composites, enforces that at most
//! one composite is staged across all structures, and routes stepping to the
//! structure that holds it. Undo and redo apply to the active structure,
//! which is the one most recently targeted by an intent.

use crate::intent::{Action, Intent, Mode};
use crate::ops::{ArrayOp, StackOp, TreeOp, array, stack, tree};
use crate::policy_config::EngineConfig;
use crate::session::{Session, StepReport};
use crate::structures::{ArrayStructure, BinaryTree, Container, StackStructure, StructureKind};
use crate::undo::{
    AtomicOp, CommandError, CommandResult, CommandSource, HistoryRecord, Phase, StagingView,
    UserOperation,
};

/// Outcome of [`Workspace::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submitted {
    /// Staged and waiting for `start`/`step` or `execute_all`.
    Staged {
        structure: StructureKind,
        name: String,
        total: usize,
    },
    /// Executed and committed.
    Committed {
        structure: StructureKind,
        name: String,
    },
}

/// Run `$body` with `$s` bound to the session for `$kind`.
macro_rules! with_session {
    ($ws:expr, $kind:expr, |$s:ident| $body:expr) => {
        match $kind {
            StructureKind::Array => {
                let $s = &mut $ws.array;
                $body
            }
            StructureKind::Stack => {
                let $s = &mut $ws.stack;
                $body
            }
            StructureKind::BinaryTree => {
                let $s = &mut $ws.tree;
                $body
            }
        }
    };
}

/// Read-only variant of [`with_session!`].
macro_rules! with_session_ref {
    ($ws:expr, $kind:expr, |$s:ident| $body:expr) => {
        match $kind {
            StructureKind::Array => {
                let $s = &$ws.array;
                $body
            }
            StructureKind::Stack => {
                let $s = &$ws.stack;
                $body
            }
            StructureKind::BinaryTree => {
                let $s = &$ws.tree;
                $body
            }
        }
    };
}

/// Every structure, its session, and the active selection.
#[derive(Debug, Clone)]
pub struct Workspace {
    array: Session<ArrayOp>,
    stack: Session<StackOp>,
    tree: Session<TreeOp>,
    active: StructureKind,
    config: EngineConfig,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Workspace {
    /// Empty structures configured by `config`.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let history = config.to_history_config();
        let restage = config.staging.restage;
        Self {
            array: Session::new(
                ArrayStructure::new(config.array_capacity()),
                history,
                restage,
            ),
            stack: Session::new(StackStructure::new(config.stack.capacity), history, restage),
            tree: Session::new(BinaryTree::new(), history, restage),
            active: StructureKind::Array,
            config,
        }
    }

    pub(crate) fn from_parts(
        config: EngineConfig,
        array: Session<ArrayOp>,
        stack: Session<StackOp>,
        tree: Session<TreeOp>,
        active: StructureKind,
    ) -> Self {
        Self {
            array,
            stack,
            tree,
            active,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn active(&self) -> StructureKind {
        self.active
    }

    /// Select the structure that undo/redo act on.
    pub fn set_active(&mut self, kind: StructureKind) {
        self.active = kind;
    }

    #[must_use]
    pub fn array(&self) -> &Session<ArrayOp> {
        &self.array
    }

    #[must_use]
    pub fn stack(&self) -> &Session<StackOp> {
        &self.stack
    }

    #[must_use]
    pub fn tree(&self) -> &Session<TreeOp> {
        &self.tree
    }

    /// Structure holding the staged composite, if any.
    #[must_use]
    pub fn staged_structure(&self) -> Option<StructureKind> {
        StructureKind::ALL
            .into_iter()
            .find(|&kind| with_session_ref!(self, kind, |s| s.phase() != Phase::Idle))
    }

    /// Staging snapshot of whichever structure holds a composite.
    #[must_use]
    pub fn view(&self) -> Option<(StructureKind, StagingView)> {
        let kind = self.staged_structure()?;
        with_session_ref!(self, kind, |s| s.view()).map(|v| (kind, v))
    }

    #[must_use]
    pub fn contents(&self, kind: StructureKind) -> Vec<i64> {
        with_session_ref!(self, kind, |s| s.container().contents())
    }

    #[must_use]
    pub fn summary(&self, kind: StructureKind) -> String {
        with_session_ref!(self, kind, |s| s.container().summary())
    }

    #[must_use]
    pub fn records(&self, kind: StructureKind) -> &[HistoryRecord] {
        with_session_ref!(self, kind, |s| s.records())
    }

    #[must_use]
    pub fn can_undo(&self, kind: StructureKind) -> bool {
        with_session_ref!(self, kind, |s| s.can_undo())
    }

    #[must_use]
    pub fn can_redo(&self, kind: StructureKind) -> bool {
        with_session_ref!(self, kind, |s| s.can_redo())
    }

    /// Submit a user request.
    pub fn submit(&mut self, intent: Intent) -> Result<Submitted, CommandError> {
        self.submit_as(intent, CommandSource::User)
    }

    /// Submit a request, tagging the composite with `source`.
    ///
    /// The composite is built and validated first, against the target
    /// container as it will be once any partially run composite on it is
    /// rolled back. Only then is any staged composite released (per the
    /// restage policy), so a rejected request changes nothing.
    pub fn submit_as(
        &mut self,
        intent: Intent,
        source: CommandSource,
    ) -> Result<Submitted, CommandError> {
        let kind = intent.structure;
        let mode = intent.mode.unwrap_or(self.config.staging.default_mode);
        tracing::debug!(target: "stepviz.workspace", %intent, ?mode, "submit");

        match kind {
            StructureKind::Array => {
                let op = non_empty(build_array(&self.array, &intent.action)?)?;
                self.release_others(kind)?;
                stage_into(&mut self.array, op, intent.action.is_init(), source)?;
            }
            StructureKind::Stack => {
                let op = non_empty(build_stack(&self.stack, &intent.action)?)?;
                self.release_others(kind)?;
                stage_into(&mut self.stack, op, intent.action.is_init(), source)?;
            }
            StructureKind::BinaryTree => {
                let op = non_empty(build_tree(&self.tree, &intent.action)?)?;
                self.release_others(kind)?;
                stage_into(&mut self.tree, op, intent.action.is_init(), source)?;
            }
        }
        self.active = kind;

        match mode {
            Mode::Immediate => {
                let name = with_session!(self, kind, |s| s.execute_all())?;
                Ok(Submitted::Committed {
                    structure: kind,
                    name,
                })
            }
            Mode::Step => {
                let view = with_session_ref!(self, kind, |s| s.view()).ok_or_else(|| {
                    CommandError::InvalidState("staged composite vanished".into())
                })?;
                Ok(Submitted::Staged {
                    structure: kind,
                    name: view.name,
                    total: view.total,
                })
            }
        }
    }

    /// Enter step-by-step mode for the staged composite.
    pub fn start(&mut self) -> CommandResult {
        let kind = self.require_staged()?;
        with_session!(self, kind, |s| s.start())
    }

    /// Advance the staged composite by one step.
    pub fn step(&mut self) -> Result<(StructureKind, StepReport), CommandError> {
        let kind = self.require_staged()?;
        let report = with_session!(self, kind, |s| s.step())?;
        Ok((kind, report))
    }

    /// Cancel a staged composite that has not started.
    pub fn cancel(&mut self) -> CommandResult {
        let kind = self.require_staged()?;
        with_session!(self, kind, |s| s.cancel())
    }

    /// Run the staged composite at once and commit it.
    pub fn execute_all(&mut self) -> Result<(StructureKind, String), CommandError> {
        let kind = self.require_staged()?;
        let name = with_session!(self, kind, |s| s.execute_all())?;
        Ok((kind, name))
    }

    /// Undo on the active structure.
    pub fn undo(&mut self) -> Option<Result<String, CommandError>> {
        with_session!(self, self.active, |s| s.undo())
    }

    /// Redo on the active structure.
    pub fn redo(&mut self) -> Option<Result<String, CommandError>> {
        with_session!(self, self.active, |s| s.redo())
    }

    fn require_staged(&self) -> Result<StructureKind, CommandError> {
        self.staged_structure()
            .ok_or_else(|| CommandError::InvalidState("nothing staged".into()))
    }

    /// Release composites staged on structures other than `keep`.
    fn release_others(&mut self, keep: StructureKind) -> CommandResult {
        for kind in StructureKind::ALL {
            if kind != keep {
                with_session!(self, kind, |s| s.discard())?;
            }
        }
        Ok(())
    }
}

fn stage_into<O>(
    session: &mut Session<O>,
    mut op: UserOperation<O>,
    is_init: bool,
    source: CommandSource,
) -> CommandResult
where
    O: AtomicOp,
    O::Target: Clone,
{
    op.metadata_mut().source = source;
    if is_init {
        session.baseline(op)
    } else {
        session.stage(op)
    }
}

fn non_empty<O: AtomicOp>(op: UserOperation<O>) -> Result<UserOperation<O>, CommandError> {
    if op.is_empty() {
        return Err(CommandError::EmptyOperation(op.name().to_string()));
    }
    Ok(op)
}

fn unsupported(kind: StructureKind, action: &Action) -> CommandError {
    CommandError::Unsupported {
        structure: kind.to_string(),
        operation: action.name().to_string(),
    }
}

fn build_array(
    session: &Session<ArrayOp>,
    action: &Action,
) -> Result<UserOperation<ArrayOp>, CommandError> {
    if let Action::Init { values } = action {
        return array::init(&session.blank(), values);
    }
    let arr = session.settled()?;
    match action {
        Action::Insert { index, value } => array::insert(&arr, *index, *value),
        Action::Delete { index } => array::delete(&arr, *index),
        Action::Sort => array::sort(&arr),
        other => Err(unsupported(StructureKind::Array, other)),
    }
}

fn build_stack(
    session: &Session<StackOp>,
    action: &Action,
) -> Result<UserOperation<StackOp>, CommandError> {
    if let Action::Init { values } = action {
        return stack::init(&session.blank(), values);
    }
    let st = session.settled()?;
    match action {
        Action::Push { value } => stack::push(&st, *value),
        Action::Pop => stack::pop(&st),
        Action::Clear => stack::clear(&st),
        Action::Reverse => stack::reverse(&st),
        other => Err(unsupported(StructureKind::Stack, other)),
    }
}

fn build_tree(
    session: &Session<TreeOp>,
    action: &Action,
) -> Result<UserOperation<TreeOp>, CommandError> {
    match action {
        Action::InitTree { slots } => tree::init(&session.blank(), slots),
        Action::Init { values } => {
            let slots: Vec<Option<i64>> = values.iter().copied().map(Some).collect();
            tree::init(&session.blank(), &slots)
        }
        other => Err(unsupported(StructureKind::BinaryTree, other)),
    }
}
