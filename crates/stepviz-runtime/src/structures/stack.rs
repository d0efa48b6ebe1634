#![forbid(unsafe_code)]

//! LIFO stack of integers with an optional capacity.

use std::fmt;

use super::{Container, StructureKind};

/// A stack of integers. Elements are stored bottom to top.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct StackStructure {
    items: Vec<i64>,
    capacity: Option<usize>,
}

impl StackStructure {
    /// Create an empty stack. `None` means unbounded.
    #[must_use]
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            items: Vec::new(),
            capacity,
        }
    }

    /// Create a stack by pushing `values` in order.
    #[must_use]
    pub fn from_values(capacity: Option<usize>, values: &[i64]) -> Self {
        let mut stack = Self::new(capacity);
        for &v in values {
            stack.push(v);
        }
        stack
    }

    /// Maximum number of elements, if bounded.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Push `value`. Returns `false` (stack untouched) when full.
    pub fn push(&mut self, value: i64) -> bool {
        if self.capacity.is_some_and(|cap| self.items.len() >= cap) {
            return false;
        }
        self.items.push(value);
        true
    }

    /// Pop the top element.
    pub fn pop(&mut self) -> Option<i64> {
        self.items.pop()
    }

    /// Top element without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<i64> {
        self.items.last().copied()
    }

    /// Iterate bottom to top.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = i64> + '_ {
        self.items.iter().copied()
    }

    /// Check that the elements fit the capacity.
    #[cfg(feature = "state-persistence")]
    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        match self.capacity {
            Some(cap) if self.items.len() > cap => Err(format!(
                "stack holds {} elements but its capacity is {cap}",
                self.items.len()
            )),
            _ => Ok(()),
        }
    }
}

impl Container for StackStructure {
    fn kind(&self) -> StructureKind {
        StructureKind::Stack
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn clear(&mut self) {
        self.items.clear();
    }

    fn contents(&self) -> Vec<i64> {
        self.items.clone()
    }

    fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for StackStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stack[{}]", self.items.len())?;
        match self.peek() {
            Some(top) => write!(f, " top={top}"),
            None => f.write_str(" (empty)"),
        }
    }
}
