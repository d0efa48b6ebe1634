#![forbid(unsafe_code)]

//! Binary-tree atomic operations and the level-order init builder.
//!
//! Nodes move through the tree's staging slot: `CreateNode` leaves the new
//! node there, `Connect` and `SetRoot` take it out, `Disconnect` puts the
//! detached child back. Every capture remembers the slot's prior occupant so
//! reverts restore it exactly.
//!
//! Preconditions checked at apply time:
//!
//! - `CreateNode`: the id is not live
//! - `DeleteNode`: the node is live and fully detached
//! - `Connect`: both nodes live and distinct, the child has no parent and is
//!   not the root
//! - `Disconnect`: `parent.side` currently holds `child`
//! - `SetRoot`: the node is live and has no parent
//!
//! A failed precondition is a recorded no-op.

use crate::structures::{BinaryTree, Container, NodeId, Side};
use crate::undo::{Affected, AtomicOp, CommandError, CommandMetadata, Outcome, UserOperation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum CreateCapture {
    Created {
        /// Arena length before the slot was filled.
        grew_from: usize,
        prev_staged: Option<NodeId>,
    },
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum DeleteCapture {
    Deleted { value: i64, was_staged: bool },
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ConnectCapture {
    Connected {
        /// Child that previously occupied the link.
        previous: Option<NodeId>,
        was_staged: bool,
    },
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum DisconnectCapture {
    Disconnected { prev_staged: Option<NodeId> },
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum SetRootCapture {
    Rooted {
        previous: Option<NodeId>,
        was_staged: bool,
    },
    Skipped,
}

/// Atomic mutation of a [`BinaryTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "kind", rename_all = "snake_case")
)]
pub enum TreeOp {
    CreateNode {
        id: NodeId,
        value: i64,
        capture: Option<CreateCapture>,
    },
    DeleteNode {
        id: NodeId,
        capture: Option<DeleteCapture>,
    },
    Connect {
        parent: NodeId,
        child: NodeId,
        side: Side,
        capture: Option<ConnectCapture>,
    },
    Disconnect {
        parent: NodeId,
        child: NodeId,
        side: Side,
        capture: Option<DisconnectCapture>,
    },
    SetRoot {
        id: NodeId,
        capture: Option<SetRootCapture>,
    },
}

impl TreeOp {
    /// Slot a `CreateNode` fills.
    #[must_use]
    pub fn created_id(&self) -> Option<NodeId> {
        match self {
            Self::CreateNode { id, .. } => Some(*id),
            _ => None,
        }
    }

    #[must_use]
    pub fn create_node(id: NodeId, value: i64) -> Self {
        Self::CreateNode {
            id,
            value,
            capture: None,
        }
    }

    #[must_use]
    pub fn delete_node(id: NodeId) -> Self {
        Self::DeleteNode { id, capture: None }
    }

    #[must_use]
    pub fn connect(parent: NodeId, child: NodeId, side: Side) -> Self {
        Self::Connect {
            parent,
            child,
            side,
            capture: None,
        }
    }

    #[must_use]
    pub fn disconnect(parent: NodeId, child: NodeId, side: Side) -> Self {
        Self::Disconnect {
            parent,
            child,
            side,
            capture: None,
        }
    }

    #[must_use]
    pub fn set_root(id: NodeId) -> Self {
        Self::SetRoot { id, capture: None }
    }
}

/// Take `id` out of the staging slot if it is there.
fn unstage(tree: &mut BinaryTree, id: NodeId) -> bool {
    if tree.staged() == Some(id) {
        tree.set_staged(None);
        true
    } else {
        false
    }
}

fn restage(tree: &mut BinaryTree, id: NodeId, was_staged: bool) {
    if was_staged {
        tree.set_staged(Some(id));
    }
}

impl AtomicOp for TreeOp {
    type Target = BinaryTree;

    fn apply(&mut self, tree: &mut BinaryTree) -> Outcome {
        match self {
            Self::CreateNode { id, value, capture } => {
                let grew_from = tree.arena_len();
                if !tree.insert_node(*id, *value) {
                    *capture = Some(CreateCapture::Skipped);
                    return Outcome::Skipped("node id already live");
                }
                let prev_staged = tree.set_staged(Some(*id));
                *capture = Some(CreateCapture::Created {
                    grew_from,
                    prev_staged,
                });
                Outcome::Applied
            }
            Self::DeleteNode { id, capture } => {
                if !tree.is_detached(*id) {
                    *capture = Some(DeleteCapture::Skipped);
                    return Outcome::Skipped("node missing or still linked");
                }
                let was_staged = unstage(tree, *id);
                match tree.remove_node(*id) {
                    Some(node) => {
                        *capture = Some(DeleteCapture::Deleted {
                            value: node.value,
                            was_staged,
                        });
                        Outcome::Applied
                    }
                    None => {
                        restage(tree, *id, was_staged);
                        *capture = Some(DeleteCapture::Skipped);
                        Outcome::Skipped("node missing")
                    }
                }
            }
            Self::Connect {
                parent,
                child,
                side,
                capture,
            } => {
                let ok = parent != child
                    && tree.contains(*parent)
                    && tree.node(*child).is_some_and(|n| n.parent.is_none())
                    && tree.root() != Some(*child);
                if !ok {
                    *capture = Some(ConnectCapture::Skipped);
                    return Outcome::Skipped("connect precondition failed");
                }
                let previous = tree.set_child(*parent, *side, Some(*child));
                if let Some(prev) = previous {
                    tree.set_parent(prev, None);
                }
                tree.set_parent(*child, Some(*parent));
                let was_staged = unstage(tree, *child);
                *capture = Some(ConnectCapture::Connected {
                    previous,
                    was_staged,
                });
                Outcome::Applied
            }
            Self::Disconnect {
                parent,
                child,
                side,
                capture,
            } => {
                if tree.child(*parent, *side) != Some(*child) {
                    *capture = Some(DisconnectCapture::Skipped);
                    return Outcome::Skipped("child not on that side");
                }
                tree.set_child(*parent, *side, None);
                tree.set_parent(*child, None);
                let prev_staged = tree.set_staged(Some(*child));
                *capture = Some(DisconnectCapture::Disconnected { prev_staged });
                Outcome::Applied
            }
            Self::SetRoot { id, capture } => {
                if !tree.node(*id).is_some_and(|n| n.parent.is_none()) {
                    *capture = Some(SetRootCapture::Skipped);
                    return Outcome::Skipped("root candidate missing or linked");
                }
                let previous = tree.set_root(Some(*id));
                let was_staged = unstage(tree, *id);
                *capture = Some(SetRootCapture::Rooted {
                    previous,
                    was_staged,
                });
                Outcome::Applied
            }
        }
    }

    fn revert(&mut self, tree: &mut BinaryTree) {
        match self {
            Self::CreateNode { id, capture, .. } => {
                if let Some(CreateCapture::Created {
                    grew_from,
                    prev_staged,
                }) = capture.take()
                {
                    tree.remove_node(*id);
                    if tree.arena_len() > grew_from {
                        tree.truncate_arena(grew_from);
                    }
                    tree.set_staged(prev_staged);
                }
            }
            Self::DeleteNode { id, capture } => {
                if let Some(DeleteCapture::Deleted { value, was_staged }) = capture.take() {
                    tree.insert_node(*id, value);
                    restage(tree, *id, was_staged);
                }
            }
            Self::Connect {
                parent,
                child,
                side,
                capture,
            } => {
                if let Some(ConnectCapture::Connected {
                    previous,
                    was_staged,
                }) = capture.take()
                {
                    tree.set_child(*parent, *side, previous);
                    if let Some(prev) = previous {
                        tree.set_parent(prev, Some(*parent));
                    }
                    tree.set_parent(*child, None);
                    restage(tree, *child, was_staged);
                }
            }
            Self::Disconnect {
                parent,
                child,
                side,
                capture,
            } => {
                if let Some(DisconnectCapture::Disconnected { prev_staged }) = capture.take() {
                    tree.set_child(*parent, *side, Some(*child));
                    tree.set_parent(*child, Some(*parent));
                    tree.set_staged(prev_staged);
                }
            }
            Self::SetRoot { id, capture } => {
                if let Some(SetRootCapture::Rooted {
                    previous,
                    was_staged,
                }) = capture.take()
                {
                    tree.set_root(previous);
                    restage(tree, *id, was_staged);
                }
            }
        }
    }

    fn describe(&self) -> String {
        let text = match self {
            Self::CreateNode { id, value, .. } => format!("Create node {id} ({value})"),
            Self::DeleteNode { id, .. } => format!("Delete node {id}"),
            Self::Connect {
                parent,
                child,
                side,
                ..
            } => format!("Connect {child} as {side} child of {parent}"),
            Self::Disconnect {
                parent,
                child,
                side,
                ..
            } => format!("Disconnect {child} from {side} of {parent}"),
            Self::SetRoot { id, .. } => format!("Set root to {id}"),
        };
        if self.was_skipped() {
            format!("{text} (skipped)")
        } else {
            text
        }
    }

    fn affected(&self) -> Affected {
        match *self {
            Self::CreateNode { id, .. } | Self::DeleteNode { id, .. } | Self::SetRoot { id, .. } => {
                Affected::Nodes(vec![id])
            }
            Self::Connect { parent, child, .. } | Self::Disconnect { parent, child, .. } => {
                Affected::Nodes(vec![parent, child])
            }
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Self::CreateNode { .. } => "create_node",
            Self::DeleteNode { .. } => "delete_node",
            Self::Connect { .. } => "connect",
            Self::Disconnect { .. } => "disconnect",
            Self::SetRoot { .. } => "set_root",
        }
    }

    fn was_skipped(&self) -> bool {
        match self {
            Self::CreateNode { capture, .. } => matches!(capture, Some(CreateCapture::Skipped)),
            Self::DeleteNode { capture, .. } => matches!(capture, Some(DeleteCapture::Skipped)),
            Self::Connect { capture, .. } => matches!(capture, Some(ConnectCapture::Skipped)),
            Self::Disconnect { capture, .. } => {
                matches!(capture, Some(DisconnectCapture::Skipped))
            }
            Self::SetRoot { capture, .. } => matches!(capture, Some(SetRootCapture::Skipped)),
        }
    }
}

/// Build a tree from level-order `values` into an (empty) tree.
///
/// Slots use heap numbering: the value at position `i > 0` hangs off
/// position `(i - 1) / 2`, on the left when `i` is odd. `None` marks an
/// empty slot that keeps its position. Node ids are allocated in order from
/// [`BinaryTree::next_node_id`] for present values only.
///
/// # Errors
///
/// [`CommandError::InvalidInput`] when there are no values, the first slot is
/// empty, or a value sits under an empty slot.
pub fn init(tree: &BinaryTree, values: &[Option<i64>]) -> Result<UserOperation<TreeOp>, CommandError> {
    let Some(Some(root_value)) = values.first() else {
        return Err(CommandError::InvalidInput(
            "tree init needs a root value in the first slot".into(),
        ));
    };
    let base = tree.next_node_id().raw();
    let mut ids: Vec<Option<NodeId>> = Vec::with_capacity(values.len());
    let mut next = base;
    let mut alloc = || {
        let id = NodeId(next);
        next += 1;
        id
    };

    let rendered: Vec<String> = values
        .iter()
        .map(|v| v.map_or_else(|| "null".to_string(), |v| v.to_string()))
        .collect();
    let mut op = UserOperation::new(CommandMetadata::new(
        "Init",
        format!("Init tree with [{}]", rendered.join(", ")),
    ));

    let root = alloc();
    op.push_step(TreeOp::create_node(root, *root_value))?;
    op.push_step(TreeOp::set_root(root))?;
    ids.push(Some(root));

    for (i, slot) in values.iter().enumerate().skip(1) {
        let Some(value) = *slot else {
            ids.push(None);
            continue;
        };
        let Some(parent) = ids[(i - 1) / 2] else {
            return Err(CommandError::InvalidInput(format!(
                "value {value} at position {i} has no parent (slot {} is empty)",
                (i - 1) / 2
            )));
        };
        let side = if i % 2 == 1 { Side::Left } else { Side::Right };
        let id = alloc();
        op.push_step(TreeOp::create_node(id, value))?;
        op.push_step(TreeOp::connect(parent, id, side))?;
        ids.push(Some(id));
    }
    Ok(op)
}

/// Parse level-order tree input. `null`, `x`, `none` and `_` mark empty slots.
///
/// # Errors
///
/// [`CommandError::InvalidInput`] for any other non-integer token.
pub fn parse_level_order<'a, I>(tokens: I) -> Result<Vec<Option<i64>>, CommandError>
where
    I: IntoIterator<Item = &'a str>,
{
    tokens
        .into_iter()
        .map(|tok| match tok.to_ascii_lowercase().as_str() {
            "null" | "x" | "none" | "_" => Ok(None),
            other => other
                .parse::<i64>()
                .map(Some)
                .map_err(|_| CommandError::InvalidInput(format!("not a tree value: '{tok}'"))),
        })
        .collect()
}
