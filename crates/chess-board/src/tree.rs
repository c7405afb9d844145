//! Variation tree of positions.
//!
//! Nodes live in an arena indexed by [`NodeId`]. The root is always id 0 and
//! ids are handed out in increasing order and never reused, so an id that has
//! been trimmed stays unknown for the lifetime of the tree.
//!
//! `children[0]` of a node is its main-line continuation; later children are
//! variations, in the order they were added.

use crate::notation::StatusMark;
use crate::Position;
use chess_core::Color;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable identity of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub const fn new(raw: u32) -> Self {
        NodeId(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    fn slot(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors raised by tree operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("unknown tree node {0}")]
    UnknownKey(NodeId),

    #[error("no room for another variation at node {at}")]
    TreeFull { at: NodeId },

    #[error("the root node cannot be trimmed")]
    RootNotTrimmable,
}

/// Size limits of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeLimits {
    /// Maximum number of children per node.
    pub branch_limit: usize,
    /// Maximum nesting of displayed variations.
    pub depth_limit: usize,
}

impl Default for TreeLimits {
    fn default() -> Self {
        TreeLimits {
            branch_limit: 5,
            depth_limit: 5,
        }
    }
}

/// Result of [`VariationTree::add_move`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new node was created.
    Inserted(NodeId),
    /// The move already exists under the node; nothing was inserted.
    Redirected(NodeId),
}

impl AddOutcome {
    /// The node the caller should move to.
    pub fn id(self) -> NodeId {
        match self {
            AddOutcome::Inserted(id) | AddOutcome::Redirected(id) => id,
        }
    }
}

/// A node of the tree.
#[derive(Debug, Clone)]
pub struct Node {
    position: Position,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// One displayed move of a [`VisibleSlice`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SliceEntry {
    pub id: NodeId,
    pub label: String,
}

/// Nested variation lines to display around a node.
///
/// Layer 0 is the outermost line, starting at the root. Each deeper layer is
/// the variation the next branch point on the way to `focus` leads into; the
/// deepest layer holds the line containing `focus`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisibleSlice {
    pub focus: NodeId,
    pub layers: Vec<Vec<SliceEntry>>,
}

impl VisibleSlice {
    pub fn depth(&self) -> usize {
        self.layers.len().saturating_sub(1)
    }

    /// Ids of one layer, in display order.
    pub fn layer_ids(&self, depth: usize) -> Vec<NodeId> {
        self.layers
            .get(depth)
            .map(|layer| layer.iter().map(|e| e.id).collect())
            .unwrap_or_default()
    }
}

/// The tree of all positions reached in an analysis session.
#[derive(Debug, Clone)]
pub struct VariationTree {
    nodes: Vec<Option<Node>>,
    limits: TreeLimits,
    display_depth: usize,
}

impl VariationTree {
    pub fn new(root: Position, limits: TreeLimits) -> Self {
        VariationTree {
            nodes: vec![Some(Node {
                position: root,
                parent: None,
                children: Vec::new(),
            })],
            limits,
            display_depth: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn limits(&self) -> TreeLimits {
        self.limits
    }

    /// Depth of the last projected slice.
    pub fn display_depth(&self) -> usize {
        self.display_depth
    }

    /// Number of live nodes, root included.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id.slot()), Some(Some(_)))
    }

    pub fn get(&self, id: NodeId) -> Result<&Node, TreeError> {
        self.nodes
            .get(id.slot())
            .and_then(Option::as_ref)
            .ok_or(TreeError::UnknownKey(id))
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut Node, TreeError> {
        self.nodes
            .get_mut(id.slot())
            .and_then(Option::as_mut)
            .ok_or(TreeError::UnknownKey(id))
    }

    pub fn position(&self, id: NodeId) -> Result<&Position, TreeError> {
        self.get(id).map(Node::position)
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, TreeError> {
        self.get(id).map(Node::parent)
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId], TreeError> {
        self.get(id).map(Node::children)
    }

    /// Index of `id` among its siblings; the root is index 0.
    pub fn sibling_index(&self, id: NodeId) -> Result<usize, TreeError> {
        let Some(parent) = self.get(id)?.parent else {
            return Ok(0);
        };
        Ok(self
            .get(parent)?
            .children
            .iter()
            .position(|c| *c == id)
            .unwrap_or(0))
    }

    /// Adds `position` as a child of `at`.
    ///
    /// A move already present under `at` is not added twice; the existing
    /// child is returned instead. On [`TreeError::TreeFull`] the position is
    /// dropped.
    pub fn add_move(&mut self, mut position: Position, at: NodeId) -> Result<AddOutcome, TreeError> {
        let parent = self.get(at)?;

        for &child in &parent.children {
            if self.position(child)?.notation().same_move(position.notation()) {
                return Ok(AddOutcome::Redirected(child));
            }
        }

        let has_children = !parent.children.is_empty();
        if parent.children.len() >= self.limits.branch_limit
            || (has_children && self.display_depth >= self.limits.depth_limit)
        {
            return Err(TreeError::TreeFull { at });
        }

        let parent_ply = parent.position.ply();
        let ply = match position.turn() {
            Color::White => parent_ply + 1,
            Color::Black => parent_ply,
        };
        position.set_ply(ply);
        position.prepend_captured(parent.position.captured());

        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(Node {
            position,
            parent: Some(at),
            children: Vec::new(),
        }));
        self.get_mut(at)?.children.push(id);
        Ok(AddOutcome::Inserted(id))
    }

    /// Adds a status mark to a node's notation. Returns false if the node
    /// already carried a mark.
    pub fn mark(&mut self, id: NodeId, mark: StatusMark) -> Result<bool, TreeError> {
        Ok(self.get_mut(id)?.position.set_mark(mark))
    }

    /// Follows `children[0]` from `id` (exclusive) to the end of its line.
    fn continuation(&self, id: NodeId) -> Vec<NodeId> {
        let mut line = Vec::new();
        let mut cursor = self.get(id).ok().and_then(|n| n.children.first().copied());
        while let Some(next) = cursor {
            line.push(next);
            cursor = self.get(next).ok().and_then(|n| n.children.first().copied());
        }
        line
    }

    /// The root and its `children[0]` chain.
    pub fn main_line(&self) -> Vec<NodeId> {
        let mut line = vec![NodeId::ROOT];
        line.extend(self.continuation(NodeId::ROOT));
        line
    }

    /// Ids from the root down to `id`, both included.
    pub fn path_to(&self, id: NodeId) -> Result<Vec<NodeId>, TreeError> {
        let mut path = vec![id];
        let mut cursor = self.get(id)?.parent;
        while let Some(parent) = cursor {
            path.push(parent);
            cursor = self.get(parent)?.parent;
        }
        path.reverse();
        Ok(path)
    }

    /// Nearest ancestor-or-self of `id` that is not a main-line child.
    pub fn branch_ancestor(&self, id: NodeId) -> Result<Option<NodeId>, TreeError> {
        let mut cursor = id;
        loop {
            let node = self.get(cursor)?;
            let Some(parent) = node.parent else {
                return Ok(None);
            };
            if self.sibling_index(cursor)? > 0 {
                return Ok(Some(cursor));
            }
            cursor = parent;
        }
    }

    /// Reconstructs the nested lines to display around `id` and records the
    /// resulting depth as the display depth.
    pub fn project(&mut self, id: NodeId) -> Result<VisibleSlice, TreeError> {
        let mut layers: Vec<Vec<NodeId>> = vec![Vec::new()];
        let mut cursor = id;
        let mut follow_line = false;

        loop {
            layers[0].insert(0, cursor);
            if follow_line {
                let rest = self.continuation(cursor);
                layers[0].extend(rest);
            }
            let Some(parent) = self.get(cursor)?.parent else {
                break;
            };
            follow_line = self.sibling_index(cursor)? > 0;
            if follow_line {
                layers.insert(0, Vec::new());
            }
            cursor = parent;
        }

        let deepest = layers.len() - 1;
        let rest = self.continuation(id);
        layers[deepest].extend(rest);
        self.display_depth = deepest;

        let layers = layers
            .into_iter()
            .map(|layer| {
                layer
                    .into_iter()
                    .map(|id| self.entry(id))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(VisibleSlice { focus: id, layers })
    }

    fn entry(&self, id: NodeId) -> Result<SliceEntry, TreeError> {
        let node = self.get(id)?;
        let parent_is_root = node.parent == Some(NodeId::ROOT);
        Ok(SliceEntry {
            id,
            label: node.position.label(parent_is_root),
        })
    }

    /// Detaches `id` and its whole subtree. Returns the removed ids.
    pub fn trim(&mut self, id: NodeId) -> Result<Vec<NodeId>, TreeError> {
        let parent = self.get(id)?.parent.ok_or(TreeError::RootNotTrimmable)?;
        self.get_mut(parent)?.children.retain(|c| *c != id);

        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(next.slot()).and_then(Option::take) {
                stack.extend(node.children);
                removed.push(next);
            }
        }
        Ok(removed)
    }

    /// Moves the variation containing `id` one place closer to the main
    /// line. Returns the promoted branch, or `None` if `id` is on the main
    /// line already.
    pub fn promote_variation(&mut self, id: NodeId) -> Result<Option<NodeId>, TreeError> {
        let Some(branch) = self.branch_ancestor(id)? else {
            return Ok(None);
        };
        let index = self.sibling_index(branch)?;
        let Some(parent) = self.get(branch)?.parent else {
            return Ok(None);
        };
        self.get_mut(parent)?.children.swap(index - 1, index);
        Ok(Some(branch))
    }
}
