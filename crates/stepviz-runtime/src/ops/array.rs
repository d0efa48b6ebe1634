#![forbid(unsafe_code)]

//! Array atomic operations and composite builders.
//!
//! | Op | Captures | Revert |
//! |---|---|---|
//! | `Write(i, v)` | old value at `i`, or that the cell was appended | restore / truncate |
//! | `Move(f -> t)` | old value at `t`, or that the cell was appended | restore / truncate |
//! | `Resize(n)` | old length plus the truncated tail | restore length and tail |
//! | `Swap(a, b)` | whether both cells existed | swap back |
//!
//! A write or move targeting exactly `len` appends one cell; that is how the
//! shift-right sequence of an insert grows the array.

use crate::structures::{ArrayCapacity, ArrayStructure, Container};
use crate::undo::{Affected, AtomicOp, CommandError, CommandMetadata, Outcome, UserOperation};

/// What a write-like op did to its target cell.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum CellCapture {
    /// Overwrote an existing cell holding this value.
    Overwrote(i64),
    /// Appended a new cell at `len`.
    Appended,
    /// Target out of range or array full.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ResizeCapture {
    Resized { old_len: usize, tail: Vec<i64> },
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum SwapCapture {
    Swapped,
    Skipped,
}

/// Atomic mutation of an [`ArrayStructure`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "kind", rename_all = "snake_case")
)]
pub enum ArrayOp {
    Write {
        index: usize,
        value: i64,
        capture: Option<CellCapture>,
    },
    Move {
        from: usize,
        to: usize,
        capture: Option<CellCapture>,
    },
    Resize {
        new_len: usize,
        capture: Option<ResizeCapture>,
    },
    Swap {
        a: usize,
        b: usize,
        capture: Option<SwapCapture>,
    },
}

impl ArrayOp {
    /// Length a `Resize` sets.
    #[must_use]
    pub fn resize_target(&self) -> Option<usize> {
        match self {
            Self::Resize { new_len, .. } => Some(*new_len),
            _ => None,
        }
    }

    #[must_use]
    pub fn write(index: usize, value: i64) -> Self {
        Self::Write {
            index,
            value,
            capture: None,
        }
    }

    /// Copy cell `from` into cell `to`.
    #[must_use]
    pub fn move_cell(from: usize, to: usize) -> Self {
        Self::Move {
            from,
            to,
            capture: None,
        }
    }

    #[must_use]
    pub fn resize(new_len: usize) -> Self {
        Self::Resize {
            new_len,
            capture: None,
        }
    }

    #[must_use]
    pub fn swap(a: usize, b: usize) -> Self {
        Self::Swap {
            a,
            b,
            capture: None,
        }
    }
}

fn write_cell(arr: &mut ArrayStructure, index: usize, value: i64) -> CellCapture {
    if let Some(old) = arr.set(index, value) {
        CellCapture::Overwrote(old)
    } else if index == arr.len() && arr.extend_one(value) {
        CellCapture::Appended
    } else {
        CellCapture::Skipped
    }
}

fn restore_cell(arr: &mut ArrayStructure, index: usize, capture: &CellCapture) {
    match *capture {
        CellCapture::Overwrote(old) => {
            arr.set(index, old);
        }
        CellCapture::Appended => arr.truncate(index),
        CellCapture::Skipped => {}
    }
}

fn cell_outcome(capture: &CellCapture, reason: &'static str) -> Outcome {
    match capture {
        CellCapture::Skipped => Outcome::Skipped(reason),
        _ => Outcome::Applied,
    }
}

impl AtomicOp for ArrayOp {
    type Target = ArrayStructure;

    fn apply(&mut self, target: &mut ArrayStructure) -> Outcome {
        match self {
            Self::Write {
                index,
                value,
                capture,
            } => {
                let cap = write_cell(target, *index, *value);
                let outcome = cell_outcome(&cap, "write target beyond end or array full");
                *capture = Some(cap);
                outcome
            }
            Self::Move { from, to, capture } => {
                let cap = match target.get(*from) {
                    Some(value) => write_cell(target, *to, value),
                    None => CellCapture::Skipped,
                };
                let outcome = cell_outcome(&cap, "move source or target out of range");
                *capture = Some(cap);
                outcome
            }
            Self::Resize { new_len, capture } => {
                let old_len = target.len();
                match target.resize(*new_len) {
                    Some(tail) => {
                        *capture = Some(ResizeCapture::Resized { old_len, tail });
                        Outcome::Applied
                    }
                    None => {
                        *capture = Some(ResizeCapture::Skipped);
                        Outcome::Skipped("resize beyond capacity")
                    }
                }
            }
            Self::Swap { a, b, capture } => match (target.get(*a), target.get(*b)) {
                (Some(va), Some(vb)) => {
                    target.set(*a, vb);
                    target.set(*b, va);
                    *capture = Some(SwapCapture::Swapped);
                    Outcome::Applied
                }
                _ => {
                    *capture = Some(SwapCapture::Skipped);
                    Outcome::Skipped("swap index out of range")
                }
            },
        }
    }

    fn revert(&mut self, target: &mut ArrayStructure) {
        match self {
            Self::Write { index, capture, .. } => {
                if let Some(cap) = capture.take() {
                    restore_cell(target, *index, &cap);
                }
            }
            Self::Move { to, capture, .. } => {
                if let Some(cap) = capture.take() {
                    restore_cell(target, *to, &cap);
                }
            }
            Self::Resize { capture, .. } => {
                if let Some(ResizeCapture::Resized { old_len, tail }) = capture.take() {
                    target.restore_len(old_len, &tail);
                }
            }
            Self::Swap { a, b, capture } => {
                if capture.take() != Some(SwapCapture::Swapped) {
                    return;
                }
                if let (Some(va), Some(vb)) = (target.get(*a), target.get(*b)) {
                    target.set(*a, vb);
                    target.set(*b, va);
                }
            }
        }
    }

    fn describe(&self) -> String {
        let text = match self {
            Self::Write { index, value, .. } => format!("Write {value} at [{index}]"),
            Self::Move { from, to, .. } => format!("Move [{from}] -> [{to}]"),
            Self::Resize { new_len, .. } => format!("Resize to {new_len}"),
            Self::Swap { a, b, .. } => format!("Swap [{a}] <-> [{b}]"),
        };
        if self.was_skipped() {
            format!("{text} (skipped)")
        } else {
            text
        }
    }

    fn affected(&self) -> Affected {
        match *self {
            Self::Write { index, .. } => Affected::Indices(vec![index]),
            Self::Move { from, to, .. } => Affected::Indices(vec![from, to]),
            Self::Resize { new_len, .. } => Affected::Indices(vec![new_len]),
            Self::Swap { a, b, .. } => Affected::Indices(vec![a, b]),
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Self::Write { .. } => "write",
            Self::Move { .. } => "move",
            Self::Resize { .. } => "resize",
            Self::Swap { .. } => "swap",
        }
    }

    fn was_skipped(&self) -> bool {
        match self {
            Self::Write { capture, .. } | Self::Move { capture, .. } => {
                matches!(capture, Some(CellCapture::Skipped))
            }
            Self::Resize { capture, .. } => matches!(capture, Some(ResizeCapture::Skipped)),
            Self::Swap { capture, .. } => matches!(capture, Some(SwapCapture::Skipped)),
        }
    }
}

fn format_values(values: &[i64]) -> String {
    let parts: Vec<String> = values.iter().map(ToString::to_string).collect();
    format!("[{}]", parts.join(", "))
}

/// Fill an (empty) array with `values`.
///
/// A growable array is resized first and then written cell by cell; a
/// fixed-capacity array is written cell by cell, each write appending.
///
/// # Errors
///
/// [`CommandError::InvalidInput`] for no values,
/// [`CommandError::CapacityExceeded`] if they do not fit.
pub fn init(arr: &ArrayStructure, values: &[i64]) -> Result<UserOperation<ArrayOp>, CommandError> {
    if values.is_empty() {
        return Err(CommandError::InvalidInput(
            "array init needs at least one value".into(),
        ));
    }
    let capacity = arr.capacity();
    if !capacity.admits(values.len()) {
        return Err(CommandError::CapacityExceeded {
            capacity: capacity.limit().unwrap_or(usize::MAX),
        });
    }
    let mut op = UserOperation::new(CommandMetadata::new(
        "Init",
        format!("Init array with {}", format_values(values)),
    ));
    if capacity == ArrayCapacity::Growable {
        op.push_step(ArrayOp::resize(values.len()))?;
    }
    for (i, &v) in values.iter().enumerate() {
        op.push_step(ArrayOp::write(i, v))?;
    }
    Ok(op)
}

/// Insert `value` at `index`, shifting the tail right.
///
/// Moves run from the last cell down to `index`; ascending order would
/// overwrite cells before they are copied.
///
/// # Errors
///
/// [`CommandError::PositionOutOfBounds`] for `index > len`,
/// [`CommandError::CapacityExceeded`] for a full array.
pub fn insert(
    arr: &ArrayStructure,
    index: usize,
    value: i64,
) -> Result<UserOperation<ArrayOp>, CommandError> {
    let len = arr.len();
    if index > len {
        return Err(CommandError::PositionOutOfBounds {
            position: index,
            length: len,
        });
    }
    if arr.is_full() {
        return Err(CommandError::CapacityExceeded {
            capacity: arr.capacity().limit().unwrap_or(len),
        });
    }
    let mut op = UserOperation::new(CommandMetadata::new(
        "Insert",
        format!("Insert {value} at index {index}"),
    ));
    for k in (index..len).rev() {
        op.push_step(ArrayOp::move_cell(k, k + 1))?;
    }
    op.push_step(ArrayOp::write(index, value))?;
    Ok(op)
}

/// Delete the cell at `index`, shifting the tail left and shrinking by one.
///
/// # Errors
///
/// [`CommandError::PositionOutOfBounds`] for `index >= len`.
pub fn delete(arr: &ArrayStructure, index: usize) -> Result<UserOperation<ArrayOp>, CommandError> {
    let len = arr.len();
    let Some(removed) = arr.get(index) else {
        return Err(CommandError::PositionOutOfBounds {
            position: index,
            length: len,
        });
    };
    let mut op = UserOperation::new(CommandMetadata::new(
        "Delete",
        format!("Delete {removed} at index {index}"),
    ));
    for k in index..len - 1 {
        op.push_step(ArrayOp::move_cell(k + 1, k))?;
    }
    op.push_step(ArrayOp::resize(len - 1))?;
    Ok(op)
}

/// Bubble sort, one swap step per exchange.
///
/// An already sorted array yields a composite with no steps, which the
/// stepper refuses to stage.
pub fn sort(arr: &ArrayStructure) -> Result<UserOperation<ArrayOp>, CommandError> {
    let mut data = arr.contents();
    let n = data.len();
    let mut swaps = Vec::new();
    for i in 0..n.saturating_sub(1) {
        for j in 0..n - i - 1 {
            if data[j] > data[j + 1] {
                data.swap(j, j + 1);
                swaps.push(ArrayOp::swap(j, j + 1));
            }
        }
    }
    let mut op = UserOperation::new(CommandMetadata::new(
        "Sort",
        format!("Bubble sort ({} swaps)", swaps.len()),
    ));
    for swap in swaps {
        op.push_step(swap)?;
    }
    Ok(op)
}
