#![forbid(unsafe_code)]

//! stepviz runtime
//!
//! A headless engine that animates data-structure operations one atomic step
//! at a time, with whole-action undo and redo.
//!
//! # Key Components
//!
//! - [`structures`] - Array, stack and arena binary tree behind [`Container`]
//! - [`undo`] - Atomic op contract, composites, [`Stepper`] and [`HistoryManager`]
//! - [`ops`] - Per-structure atomic kinds and the decompositions that build composites
//! - [`Session`] - One container bound to its stepper and history
//! - [`Workspace`] - All structures behind a single [`Intent`] surface
//! - [`EngineConfig`] - Policy-as-data configuration
//!
//! # How it fits together
//! A request becomes an [`Intent`]. The workspace builds a composite from
//! the current container, stages it, and either runs it at once or lets the
//! caller step through it. Only a finished composite reaches history, so
//! undo and redo always move whole user actions.

pub mod intent;
pub mod ops;
pub mod policy_config;
pub mod session;
#[cfg(feature = "state-persistence")]
pub mod state_persistence;
pub mod structures;
pub mod undo;
pub mod workspace;

pub use intent::{Action, Intent, Mode};
pub use policy_config::{EngineConfig, PolicyConfigError};
pub use session::{Session, StepReport};
#[cfg(feature = "state-persistence")]
pub use state_persistence::{HistorySnapshot, PersistenceError, WorkspaceSnapshot};
pub use structures::{
    ArrayCapacity, ArrayStructure, BinaryTree, Container, NodeId, Side, StackStructure,
    StructureKind,
};
pub use undo::{
    Affected, AtomicOp, CommandError, CommandMetadata, CommandSource, HistoryConfig,
    HistoryManager, Phase, RestagePolicy, StagingView, Stepper, UserOperation,
};
pub use workspace::{Submitted, Workspace};
