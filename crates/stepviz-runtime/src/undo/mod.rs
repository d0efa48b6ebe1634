#![forbid(unsafe_code)]

//! Step-wise undo/redo engine.
//!
//! Every user-visible action is a composite ([`UserOperation`]) of atomic,
//! independently reversible steps ([`AtomicOp`]). A composite is staged in a
//! [`Stepper`], run all at once or one step at a time against the live
//! container, and only then committed to the [`HistoryManager`]. Undo and
//! redo always move whole composites.
//!
//! # Architecture
//!
//! ```text
//!   builder (ops::*)          Stepper                 HistoryManager
//!  ┌──────────────┐  stage  ┌───────────────┐ commit ┌───────────────────┐
//!  │ UserOperation│ ──────► │ staged + cursor│ ─────► │ undo stack        │
//!  │  [s0 s1 s2]  │         │ step()/all()   │        │ redo stack        │
//!  └──────────────┘         └───────┬───────┘        └─────────┬─────────┘
//!                                   │ apply                    │ undo_all / execute_all
//!                                   ▼                          ▼
//!                           ┌────────────────────────────────────────┐
//!                           │             container                  │
//!                           └────────────────────────────────────────┘
//! ```
//!
//! # Module Structure
//!
//! - [`command`]: the atomic contract, [`Step`], errors and metadata
//! - [`user_operation`]: composites
//! - [`stepper`]: staging controller
//! - [`history`]: undo/redo stacks and the commit log
//!
//! # Design Notes
//!
//! ## Why ops receive the container
//!
//! Ops never hold a reference to their container. The container is passed to
//! `apply`/`revert` by whoever drives them, so composites can sit in history
//! as plain owned values and be cloned or serialized freely.
//!
//! ## Temporal contract
//!
//! Each step carries a `NotRun | Applied` tag. Running an applied step or
//! reverting one that never ran is reported as
//! [`CommandError::InvalidState`] and logged at `error` level; everything
//! else the user can trigger is either a recoverable error or a recorded
//! no-op.

pub mod command;
pub mod history;
pub mod stepper;
pub mod user_operation;

pub use command::{
    Affected, AtomicOp, CommandError, CommandMetadata, CommandResult, CommandSource, Outcome,
    Step, StepState,
};
pub use history::{HistoryConfig, HistoryManager, HistoryRecord};
pub use stepper::{Phase, RestagePolicy, StagingView, StepOutcome, StepView, Stepper};
pub use user_operation::UserOperation;
