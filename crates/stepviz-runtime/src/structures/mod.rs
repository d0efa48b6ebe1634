#![forbid(unsafe_code)]

//! Concrete data structures that the operation engine mutates.
//!
//! Every structure implements [`Container`], the small capability surface the
//! engine relies on for identity, size and content inspection. Positional
//! mutation primitives live on the concrete types and are only called by the
//! matching atomic operation family in [`crate::ops`].
//!
//! # Invariants
//!
//! - `len()` always equals the number of addressable positions
//!   (cells for arrays, elements for stacks, live nodes for trees).
//! - `contents()` is a pure read; rendering code may call it between steps.

pub mod array;
pub mod stack;
pub mod tree;

use std::fmt;

pub use array::{ArrayCapacity, ArrayStructure};
pub use stack::StackStructure;
pub use tree::{BinaryTree, NodeId, Side, TreeNode};

/// Type tag identifying a structure family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum StructureKind {
    /// Indexed array of integers.
    Array,
    /// LIFO stack of integers.
    Stack,
    /// Binary tree built in level order.
    BinaryTree,
}

impl StructureKind {
    /// All structure kinds, in display order.
    pub const ALL: [Self; 3] = [Self::Array, Self::Stack, Self::BinaryTree];

    /// Stable lowercase name used in logs and command input.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Array => "array",
            Self::Stack => "stack",
            Self::BinaryTree => "tree",
        }
    }

    /// Parse a structure name (`array`, `stack`, `tree`).
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "array" | "arr" => Some(Self::Array),
            "stack" => Some(Self::Stack),
            "tree" | "bintree" | "binary_tree" => Some(Self::BinaryTree),
            _ => None,
        }
    }
}

impl fmt::Display for StructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform capability surface shared by every structure.
pub trait Container: fmt::Debug {
    /// Type tag of this container.
    fn kind(&self) -> StructureKind;

    /// Number of addressable positions.
    fn len(&self) -> usize;

    /// Whether the container holds no positions.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every element. Not tracked by the undo system.
    fn clear(&mut self);

    /// Current contents in the structure's natural order.
    fn contents(&self) -> Vec<i64>;

    /// One-line human-readable summary.
    fn summary(&self) -> String;
}
