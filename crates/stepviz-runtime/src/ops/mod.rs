#![forbid(unsafe_code)]

//! Atomic operation families and the decompositions that build composites
//! from them.
//!
//! Each submodule pairs one structure with its op enum and a set of builder
//! functions. Builders read the current container state and return either a
//! ready-to-stage [`UserOperation`](crate::undo::UserOperation) or the
//! [`CommandError`](crate::undo::CommandError) explaining why nothing may be
//! staged. Builders never mutate the container.

pub mod array;
pub mod stack;
pub mod tree;

pub use array::ArrayOp;
pub use stack::StackOp;
pub use tree::TreeOp;
