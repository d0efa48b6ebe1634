#![forbid(unsafe_code)]

//! Integer array with an optional fixed capacity.
//!
//! The array exposes exactly the primitives the array atomic operations need:
//! read a cell, overwrite a cell, append one cell at `len`, resize, truncate.
//! Appending at `len` is how shift-right sequences grow the array by one slot
//! during an insert.

use std::fmt;

use super::{Container, StructureKind};

/// Default capacity of a fixed-capacity array.
pub const DEFAULT_FIXED_CAPACITY: usize = 100;

/// Capacity policy for an [`ArrayStructure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ArrayCapacity {
    /// At most this many cells.
    Fixed(usize),
    /// Unbounded.
    Growable,
}

impl ArrayCapacity {
    /// Maximum number of cells, if bounded.
    #[must_use]
    pub const fn limit(self) -> Option<usize> {
        match self {
            Self::Fixed(n) => Some(n),
            Self::Growable => None,
        }
    }

    /// Whether `len` cells fit.
    #[must_use]
    pub const fn admits(self, len: usize) -> bool {
        match self {
            Self::Fixed(n) => len <= n,
            Self::Growable => true,
        }
    }
}

impl Default for ArrayCapacity {
    fn default() -> Self {
        Self::Fixed(DEFAULT_FIXED_CAPACITY)
    }
}

/// An array of integers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct ArrayStructure {
    cells: Vec<i64>,
    capacity: ArrayCapacity,
}

impl ArrayStructure {
    /// Create an empty array with the given capacity policy.
    #[must_use]
    pub fn new(capacity: ArrayCapacity) -> Self {
        Self {
            cells: Vec::new(),
            capacity,
        }
    }

    /// Create an array holding `values`.
    ///
    /// Values beyond a fixed capacity are dropped.
    #[must_use]
    pub fn from_values(capacity: ArrayCapacity, values: &[i64]) -> Self {
        let take = capacity.limit().map_or(values.len(), |n| n.min(values.len()));
        Self {
            cells: values[..take].to_vec(),
            capacity,
        }
    }

    /// Capacity policy.
    #[must_use]
    pub fn capacity(&self) -> ArrayCapacity {
        self.capacity
    }

    /// Whether another cell can be appended.
    #[must_use]
    pub fn is_full(&self) -> bool {
        !self.capacity.admits(self.cells.len() + 1)
    }

    /// Cell at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<i64> {
        self.cells.get(index).copied()
    }

    /// Borrow all cells.
    #[must_use]
    pub fn as_slice(&self) -> &[i64] {
        &self.cells
    }

    /// Overwrite the cell at `index`, returning the old value.
    ///
    /// Returns `None` and leaves the array untouched when `index >= len`.
    pub fn set(&mut self, index: usize, value: i64) -> Option<i64> {
        let cell = self.cells.get_mut(index)?;
        Some(std::mem::replace(cell, value))
    }

    /// Append one cell at `len`. Returns `false` at capacity.
    pub fn extend_one(&mut self, value: i64) -> bool {
        if self.is_full() {
            return false;
        }
        self.cells.push(value);
        true
    }

    /// Resize to `new_len`, zero-filling new cells.
    ///
    /// Returns the cells removed when shrinking, or `None` if `new_len`
    /// exceeds the capacity (array untouched).
    pub fn resize(&mut self, new_len: usize) -> Option<Vec<i64>> {
        if !self.capacity.admits(new_len) {
            return None;
        }
        if new_len < self.cells.len() {
            return Some(self.cells.split_off(new_len));
        }
        self.cells.resize(new_len, 0);
        Some(Vec::new())
    }

    /// Restore a previous length `len`, whose last cells were `tail`.
    pub(crate) fn restore_len(&mut self, len: usize, tail: &[i64]) {
        self.cells.truncate(len.saturating_sub(tail.len()));
        self.cells.extend_from_slice(tail);
    }

    /// Drop cells from `len` onward.
    pub fn truncate(&mut self, len: usize) {
        self.cells.truncate(len);
    }

    /// Check that the cells fit the capacity, as a deserialized array must.
    #[cfg(feature = "state-persistence")]
    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        if self.capacity.admits(self.cells.len()) {
            return Ok(());
        }
        Err(format!(
            "array holds {} cells but its capacity is {}",
            self.cells.len(),
            self.capacity.limit().unwrap_or(usize::MAX)
        ))
    }
}

impl Container for ArrayStructure {
    fn kind(&self) -> StructureKind {
        StructureKind::Array
    }

    fn len(&self) -> usize {
        self.cells.len()
    }

    fn clear(&mut self) {
        self.cells.clear();
    }

    fn contents(&self) -> Vec<i64> {
        self.cells.clone()
    }

    fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ArrayStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.capacity.limit() {
            Some(limit) => write!(f, "Array[{}/{}]: [", self.cells.len(), limit)?,
            None => write!(f, "Array[{}]: [", self.cells.len())?,
        }
        for (i, value) in self.cells.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str("]")
    }
}
