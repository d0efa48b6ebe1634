#![forbid(unsafe_code)]

//! Stack atomic operations and composite builders.

use crate::structures::{Container, StackStructure};
use crate::undo::{Affected, AtomicOp, CommandError, CommandMetadata, Outcome, UserOperation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum PushCapture {
    Pushed,
    /// Stack was at capacity.
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum PopCapture {
    Popped(i64),
    WasEmpty,
}

/// Atomic mutation of a [`StackStructure`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "kind", rename_all = "snake_case")
)]
pub enum StackOp {
    Push {
        value: i64,
        capture: Option<PushCapture>,
    },
    Pop {
        capture: Option<PopCapture>,
    },
}

impl StackOp {
    #[must_use]
    pub fn push(value: i64) -> Self {
        Self::Push {
            value,
            capture: None,
        }
    }

    #[must_use]
    pub fn pop() -> Self {
        Self::Pop { capture: None }
    }

    /// Value removed by the last apply of a pop.
    #[must_use]
    pub fn popped_value(&self) -> Option<i64> {
        match self {
            Self::Pop {
                capture: Some(PopCapture::Popped(v)),
            } => Some(*v),
            _ => None,
        }
    }
}

impl AtomicOp for StackOp {
    type Target = StackStructure;

    fn apply(&mut self, target: &mut StackStructure) -> Outcome {
        match self {
            Self::Push { value, capture } => {
                if target.push(*value) {
                    *capture = Some(PushCapture::Pushed);
                    Outcome::Applied
                } else {
                    *capture = Some(PushCapture::Full);
                    Outcome::Skipped("stack full")
                }
            }
            Self::Pop { capture } => match target.pop() {
                Some(v) => {
                    *capture = Some(PopCapture::Popped(v));
                    Outcome::Applied
                }
                None => {
                    *capture = Some(PopCapture::WasEmpty);
                    Outcome::Skipped("stack empty")
                }
            },
        }
    }

    fn revert(&mut self, target: &mut StackStructure) {
        match self {
            Self::Push { capture, .. } => {
                if capture.take() == Some(PushCapture::Pushed) {
                    target.pop();
                }
            }
            Self::Pop { capture } => {
                if let Some(PopCapture::Popped(v)) = capture.take() {
                    target.push(v);
                }
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Push {
                value,
                capture: Some(PushCapture::Full),
            } => format!("Push {value} (skipped, full)"),
            Self::Push { value, .. } => format!("Push {value}"),
            Self::Pop {
                capture: Some(PopCapture::Popped(v)),
            } => format!("Pop {v}"),
            Self::Pop {
                capture: Some(PopCapture::WasEmpty),
            } => "Pop (skipped, empty)".to_string(),
            Self::Pop { capture: None } => "Pop top".to_string(),
        }
    }

    fn affected(&self) -> Affected {
        Affected::StackTop
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Self::Push { .. } => "push",
            Self::Pop { .. } => "pop",
        }
    }

    fn was_skipped(&self) -> bool {
        matches!(
            self,
            Self::Push {
                capture: Some(PushCapture::Full),
                ..
            } | Self::Pop {
                capture: Some(PopCapture::WasEmpty)
            }
        )
    }
}

fn check_room(stack: &StackStructure, extra: usize) -> Result<(), CommandError> {
    match stack.capacity() {
        Some(cap) if stack.len() + extra > cap => {
            Err(CommandError::CapacityExceeded { capacity: cap })
        }
        _ => Ok(()),
    }
}

/// Push each of `values` onto an (empty) stack, bottom first.
///
/// # Errors
///
/// [`CommandError::InvalidInput`] for no values,
/// [`CommandError::CapacityExceeded`] if they do not fit.
pub fn init(stack: &StackStructure, values: &[i64]) -> Result<UserOperation<StackOp>, CommandError> {
    if values.is_empty() {
        return Err(CommandError::InvalidInput(
            "stack init needs at least one value".into(),
        ));
    }
    check_room(stack, values.len())?;
    let parts: Vec<String> = values.iter().map(ToString::to_string).collect();
    let mut op = UserOperation::new(CommandMetadata::new(
        "Init",
        format!("Init stack with [{}]", parts.join(", ")),
    ));
    for &v in values {
        op.push_step(StackOp::push(v))?;
    }
    Ok(op)
}

/// Push one value.
///
/// # Errors
///
/// [`CommandError::CapacityExceeded`] for a full stack.
pub fn push(stack: &StackStructure, value: i64) -> Result<UserOperation<StackOp>, CommandError> {
    check_room(stack, 1)?;
    let mut op = UserOperation::new(CommandMetadata::new("Push", format!("Push {value}")));
    op.push_step(StackOp::push(value))?;
    Ok(op)
}

/// Pop the top value.
///
/// # Errors
///
/// [`CommandError::InvalidInput`] for an empty stack.
pub fn pop(stack: &StackStructure) -> Result<UserOperation<StackOp>, CommandError> {
    let Some(top) = stack.peek() else {
        return Err(CommandError::InvalidInput("pop from an empty stack".into()));
    };
    let mut op = UserOperation::new(CommandMetadata::new("Pop", format!("Pop {top}")));
    op.push_step(StackOp::pop())?;
    Ok(op)
}

/// Pop every element.
pub fn clear(stack: &StackStructure) -> Result<UserOperation<StackOp>, CommandError> {
    let mut op = UserOperation::new(CommandMetadata::new(
        "Clear",
        format!("Clear {} elements", stack.len()),
    ));
    for _ in 0..stack.len() {
        op.push_step(StackOp::pop())?;
    }
    Ok(op)
}

/// Reverse the stack: pop everything, then push the values back in the
/// order they were popped.
pub fn reverse(stack: &StackStructure) -> Result<UserOperation<StackOp>, CommandError> {
    let popped: Vec<i64> = stack.iter().rev().collect();
    let mut op = UserOperation::new(CommandMetadata::new(
        "Reverse",
        format!("Reverse {} elements", popped.len()),
    ));
    for _ in &popped {
        op.push_step(StackOp::pop())?;
    }
    for v in popped {
        op.push_step(StackOp::push(v))?;
    }
    Ok(op)
}
