#![forbid(unsafe_code)]

//! Arena-backed binary tree.
//!
//! Nodes live in a `Vec<Option<TreeNode>>` indexed by [`NodeId`]. Creating a
//! node fills a slot, deleting one retires it; ids are never reused while the
//! slot is live, so undoing a delete restores the node under its original id.
//!
//! Besides the root, the tree carries a single *staging slot*: the node most
//! recently created or detached that is not yet linked into the shape. It lets
//! a renderer show a freshly created node before the following connect step
//! places it.
//!
//! # Invariants
//!
//! - `parent` links mirror `left`/`right` links of live nodes.
//! - `len()` counts live slots, attached or not.
//! - `contents()` and `level_order()` only see nodes reachable from the root.

use std::collections::VecDeque;
use std::fmt;

use super::{Container, StructureKind};

/// Stable identifier of a tree node slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Create a node id from a raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw id value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    const fn slot(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which child link of a parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A live node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct TreeNode {
    pub value: i64,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
    pub parent: Option<NodeId>,
}

impl TreeNode {
    /// A detached node holding `value`.
    #[must_use]
    pub const fn leaf(value: i64) -> Self {
        Self {
            value,
            left: None,
            right: None,
            parent: None,
        }
    }

    /// Child on `side`.
    #[must_use]
    pub const fn child(&self, side: Side) -> Option<NodeId> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

/// Binary tree of integers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct BinaryTree {
    nodes: Vec<Option<TreeNode>>,
    root: Option<NodeId>,
    staged: Option<NodeId>,
}

impl BinaryTree {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Root node, if any.
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Node in the staging slot, if any.
    #[must_use]
    pub fn staged(&self) -> Option<NodeId> {
        self.staged
    }

    /// Replace the staging slot, returning the previous occupant.
    pub fn set_staged(&mut self, id: Option<NodeId>) -> Option<NodeId> {
        std::mem::replace(&mut self.staged, id)
    }

    /// Id that the next appended node will receive.
    #[must_use]
    pub fn next_node_id(&self) -> NodeId {
        NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX))
    }

    /// Number of slots in the arena, live or retired.
    #[must_use]
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    /// Live node `id`.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.slot()).and_then(Option::as_ref)
    }

    /// Whether `id` names a live node.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Whether `id` is live and linked to nothing (no parent, no children,
    /// not the root).
    #[must_use]
    pub fn is_detached(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|n| {
            n.parent.is_none() && n.left.is_none() && n.right.is_none() && self.root != Some(id)
        })
    }

    /// Fill slot `id` with a detached node. Grows the arena with retired
    /// slots as needed. Returns `false` if the slot is already live.
    pub fn insert_node(&mut self, id: NodeId, value: i64) -> bool {
        if self.contains(id) {
            return false;
        }
        if self.nodes.len() <= id.slot() {
            self.nodes.resize(id.slot() + 1, None);
        }
        self.nodes[id.slot()] = Some(TreeNode::leaf(value));
        true
    }

    /// Retire slot `id`, returning the node that lived there. Links held by
    /// other nodes are left untouched.
    pub fn remove_node(&mut self, id: NodeId) -> Option<TreeNode> {
        self.nodes.get_mut(id.slot()).and_then(Option::take)
    }

    /// Shrink the arena back to `len` slots.
    pub(crate) fn truncate_arena(&mut self, len: usize) {
        self.nodes.truncate(len);
    }

    /// Child of `parent` on `side`.
    #[must_use]
    pub fn child(&self, parent: NodeId, side: Side) -> Option<NodeId> {
        self.node(parent).and_then(|n| n.child(side))
    }

    /// Which side of `parent` holds `child`, if either.
    #[must_use]
    pub fn side_of(&self, parent: NodeId, child: NodeId) -> Option<Side> {
        let node = self.node(parent)?;
        if node.left == Some(child) {
            Some(Side::Left)
        } else if node.right == Some(child) {
            Some(Side::Right)
        } else {
            None
        }
    }

    /// Set the `side` link of `parent`, returning the previous child. Does
    /// not touch the child's `parent` link. No-op if `parent` is not live.
    pub fn set_child(
        &mut self,
        parent: NodeId,
        side: Side,
        child: Option<NodeId>,
    ) -> Option<NodeId> {
        let node = self.nodes.get_mut(parent.slot())?.as_mut()?;
        let link = match side {
            Side::Left => &mut node.left,
            Side::Right => &mut node.right,
        };
        std::mem::replace(link, child)
    }

    /// Set the `parent` link of `child`. No-op if `child` is not live.
    pub fn set_parent(&mut self, child: NodeId, parent: Option<NodeId>) {
        if let Some(node) = self.nodes.get_mut(child.slot()).and_then(Option::as_mut) {
            node.parent = parent;
        }
    }

    /// Replace the root, returning the previous root.
    pub fn set_root(&mut self, id: Option<NodeId>) -> Option<NodeId> {
        std::mem::replace(&mut self.root, id)
    }

    /// Check that the root and staging slot name live nodes, the root has
    /// no parent, and every child link is mirrored by the child's `parent`.
    #[cfg(feature = "state-persistence")]
    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        if let Some(root) = self.root {
            let node = self
                .node(root)
                .ok_or_else(|| format!("root {root} is not live"))?;
            if let Some(parent) = node.parent {
                return Err(format!("root {root} has parent {parent}"));
            }
        }
        if let Some(staged) = self.staged.filter(|&id| !self.contains(id)) {
            return Err(format!("staged node {staged} is not live"));
        }
        for (slot, node) in self.nodes.iter().enumerate() {
            let Some(node) = node else {
                continue;
            };
            let id = NodeId(u32::try_from(slot).map_err(|_| "arena exceeds u32 ids".to_string())?);
            if node.left.is_some() && node.left == node.right {
                return Err(format!("{id} holds the same child on both sides"));
            }
            for child in [node.left, node.right].into_iter().flatten() {
                if self.node(child).and_then(|c| c.parent) != Some(id) {
                    return Err(format!("{id} links {child}, whose parent link disagrees"));
                }
            }
            if let Some(parent) = node.parent.filter(|&p| self.side_of(p, id).is_none()) {
                return Err(format!("{id} names parent {parent}, which does not link back"));
            }
        }
        Ok(())
    }

    /// Ids reachable from the root in breadth-first order.
    #[must_use]
    pub fn level_order(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut queue: VecDeque<NodeId> = self.root.into_iter().collect();
        while let Some(id) = queue.pop_front() {
            let Some(node) = self.node(id) else {
                continue;
            };
            out.push(id);
            queue.extend(node.left);
            queue.extend(node.right);
        }
        out
    }

    /// Parenthesised rendering of the attached shape, e.g. `10(5(3,7),15)`.
    /// Missing children inside a parenthesised group print as `_`.
    #[must_use]
    pub fn shape(&self) -> String {
        let mut out = String::new();
        match self.root {
            Some(root) => self.write_shape(root, &mut out),
            None => out.push_str("()"),
        }
        out
    }

    fn write_shape(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else {
            out.push('?');
            return;
        };
        out.push_str(&node.value.to_string());
        if node.left.is_none() && node.right.is_none() {
            return;
        }
        out.push('(');
        match node.left {
            Some(left) => self.write_shape(left, out),
            None => out.push('_'),
        }
        if let Some(right) = node.right {
            out.push(',');
            self.write_shape(right, out);
        }
        out.push(')');
    }
}

impl Container for BinaryTree {
    fn kind(&self) -> StructureKind {
        StructureKind::BinaryTree
    }

    fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.staged = None;
    }

    fn contents(&self) -> Vec<i64> {
        self.level_order()
            .into_iter()
            .filter_map(|id| self.node(id).map(|n| n.value))
            .collect()
    }

    fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BinaryTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tree[{}]: {}", self.len(), self.shape())?;
        if let Some(node) = self.staged.and_then(|id| self.node(id)) {
            write!(f, " staged={}", node.value)?;
        }
        Ok(())
    }
}
