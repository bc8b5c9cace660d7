// SPDX-License-Identifier: MIT
//
// The retained node tree.
//
// Nodes live in an arena owned by `Tree`. A `NodeId` is an index plus a
// generation; disposing a node bumps its slot's generation, so a stale id
// resolves to `None` instead of aliasing whatever reuses the slot.
//
// Ownership is strictly tree-shaped. A parent owns its ordered child list;
// a child records its parent as a plain id for upward walks. Attaching a
// node that already has a parent moves it, and detaching clears the link.
//
// Every setter that could change layout or paint marks the node dirty. The
// tree also tracks structural changes, so `is_dirty` covers inserts,
// moves and disposals as well as property edits.

use std::fmt;

use crate::geometry::{Edges, Rect, Size};
use crate::style::{Align, Dimension, Direction, Justify, LayoutStyle};

// ─── Ids & Errors ────────────────────────────────────────────────────────────

/// Handle to a node in a [`Tree`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("node {0:?} does not exist")]
    UnknownNode(NodeId),
    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    WouldCycle { parent: NodeId, child: NodeId },
}

// ─── Measure ─────────────────────────────────────────────────────────────────

/// Intrinsic content size of a leaf.
///
/// Containers derive their intrinsic size from their children; this is only
/// consulted for nodes without visible children. Padding and border are
/// added by the engine.
pub trait Measure {
    fn measure(&self, available: Size) -> Size {
        let _ = available;
        Size::ZERO
    }
}

impl Measure for () {}

// ─── Node ────────────────────────────────────────────────────────────────────

/// One node: a payload plus its layout properties and computed bounds.
#[derive(Debug, Clone)]
pub struct Node<W> {
    widget: W,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    style: LayoutStyle,
    bounds: Rect,
    visible: bool,
    dirty: bool,
}

macro_rules! style_setter {
    ($(#[$doc:meta])* $name:ident: $ty:ty => $($field:ident).+) => {
        $(#[$doc])*
        pub fn $name(&mut self, value: $ty) -> &mut Self {
            self.style.$($field).+ = value;
            self.dirty = true;
            self
        }
    };
}

impl<W> Node<W> {
    fn new(widget: W) -> Self {
        Self {
            widget,
            parent: None,
            children: Vec::new(),
            style: LayoutStyle::default(),
            bounds: Rect::default(),
            visible: true,
            dirty: true,
        }
    }

    #[inline]
    #[must_use]
    pub const fn widget(&self) -> &W {
        &self.widget
    }

    /// Mutable access to the payload. Marks the node dirty.
    #[inline]
    pub fn widget_mut(&mut self) -> &mut W {
        self.dirty = true;
        &mut self.widget
    }

    /// Mutable access that leaves the dirty flag alone, for callers that
    /// only mark dirty when the payload reports a change.
    #[inline]
    pub const fn widget_mut_untracked(&mut self) -> &mut W {
        &mut self.widget
    }

    #[inline]
    #[must_use]
    pub const fn style(&self) -> &LayoutStyle {
        &self.style
    }

    /// Bounds from the most recent layout pass.
    #[inline]
    #[must_use]
    pub const fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Bounds minus border and padding.
    #[inline]
    #[must_use]
    pub const fn content_bounds(&self) -> Rect {
        self.bounds.inset(self.style.chrome())
    }

    #[inline]
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    #[inline]
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Request a repaint without changing anything.
    pub fn mark_dirty(&mut self) -> &mut Self {
        self.dirty = true;
        self
    }

    style_setter!(width: Dimension => width);
    style_setter!(height: Dimension => height);
    style_setter!(
        /// Flex weight; zero opts out of leftover space.
        flex: u16 => flex
    );
    style_setter!(direction: Direction => direction);
    style_setter!(justify: Justify => justify);
    style_setter!(align: Align => align);
    style_setter!(gap: u16 => gap);
    style_setter!(padding: Edges => padding);
    style_setter!(margin: Edges => margin);
    style_setter!(border: bool => border);

    pub fn visible(&mut self, visible: bool) -> &mut Self {
        self.visible = visible;
        self.dirty = true;
        self
    }

    /// Replace all layout properties at once.
    pub fn set_style(&mut self, style: LayoutStyle) -> &mut Self {
        self.style = style;
        self.dirty = true;
        self
    }

    pub(crate) const fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
    }
}

// ─── Tree ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Slot<W> {
    generation: u32,
    node: Option<Node<W>>,
}

/// Arena of nodes.
///
/// ```
/// use tessel_layout::tree::Tree;
///
/// let mut tree: Tree<&str> = Tree::new();
/// let root = tree.insert("root");
/// let child = tree.insert("child");
/// tree.append_child(root, child)?;
/// assert_eq!(tree.parent(child), Some(root));
/// assert_eq!(tree.dispose(root), 2);
/// assert!(tree.get(child).is_none());
/// # Ok::<(), tessel_layout::tree::TreeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Tree<W> {
    slots: Vec<Slot<W>>,
    free: Vec<u32>,
    len: usize,
    structure_dirty: bool,
}

impl<W> Default for Tree<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> Tree<W> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            structure_dirty: false,
        }
    }

    /// Number of live nodes.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One past the highest slot index ever used. Scratch arrays indexed by
    /// [`NodeId::index`] need this many entries.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Add a detached node.
    pub fn insert(&mut self, widget: W) -> NodeId {
        self.len += 1;
        self.structure_dirty = true;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(Node::new(widget));
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            node: Some(Node::new(widget)),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node<W>> {
        self.slots
            .get(id.index())
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node<W>> {
        self.slots
            .get_mut(id.index())
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_mut())
    }

    fn node(&self, id: NodeId) -> Result<&Node<W>, TreeError> {
        self.get(id).ok_or(TreeError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node<W>, TreeError> {
        self.get_mut(id).ok_or(TreeError::UnknownNode(id))
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::parent)
    }

    /// Children in order. Empty for unknown ids.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[][..], Node::children)
    }

    /// Parent, grandparent, and so on up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), |&p| self.parent(p))
    }

    /// `id` and everything below it, parents before children.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    /// Append `child` as the last child of `parent`, detaching it from any
    /// previous parent.
    ///
    /// # Errors
    ///
    /// [`TreeError::UnknownNode`] for a stale id, [`TreeError::WouldCycle`]
    /// when `child` is `parent` or one of its ancestors.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let at = self.node(parent)?.children.len();
        self.insert_child(parent, at, child)
    }

    /// Insert `child` at position `index` among `parent`'s children
    /// (clamped to the end).
    ///
    /// # Errors
    ///
    /// Same as [`append_child`](Self::append_child).
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<(), TreeError> {
        self.node(parent)?;
        self.node(child)?;
        if child == parent || self.ancestors(parent).any(|a| a == child) {
            return Err(TreeError::WouldCycle { parent, child });
        }

        // Moving within the same parent shifts later indices by one.
        let mut index = index;
        if let Some(old) = self.parent(child) {
            if old == parent {
                if let Some(pos) = self.children(parent).iter().position(|&c| c == child) {
                    if pos < index {
                        index -= 1;
                    }
                }
            }
            self.detach(child);
        }

        let p = self.node_mut(parent)?;
        let index = index.min(p.children.len());
        p.children.insert(index, child);
        p.dirty = true;
        self.node_mut(child)?.parent = Some(parent);
        self.structure_dirty = true;
        Ok(())
    }

    /// Unlink `id` from its parent. The node and its subtree stay alive.
    ///
    /// Returns `false` if `id` was unknown or already detached.
    pub fn detach(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.parent(id) else {
            return false;
        };
        if let Some(p) = self.get_mut(parent) {
            p.children.retain(|&c| c != id);
            p.dirty = true;
        }
        if let Some(n) = self.get_mut(id) {
            n.parent = None;
        }
        self.structure_dirty = true;
        true
    }

    /// Detach `id` and free it with its whole subtree.
    ///
    /// Returns how many nodes were freed (0 for an unknown id).
    pub fn dispose(&mut self, id: NodeId) -> usize {
        if !self.contains(id) {
            return 0;
        }
        self.detach(id);
        let doomed = self.descendants(id);
        for &n in &doomed {
            let slot = &mut self.slots[n.index()];
            slot.node = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(n.index);
        }
        self.len -= doomed.len();
        self.structure_dirty = true;
        doomed.len()
    }

    /// Whether anything changed since the last [`mark_all_clean`](Self::mark_all_clean).
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.structure_dirty || self.iter().any(|(_, n)| n.dirty)
    }

    pub fn mark_all_clean(&mut self) {
        self.structure_dirty = false;
        for slot in &mut self.slots {
            if let Some(n) = slot.node.as_mut() {
                n.dirty = false;
            }
        }
    }

    /// Live nodes in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node<W>)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            let node = s.node.as_ref()?;
            let index = u32::try_from(i).ok()?;
            Some((
                NodeId {
                    index,
                    generation: s.generation,
                },
                node,
            ))
        })
    }

    /// Whether `id` and every ancestor are visible.
    #[must_use]
    pub fn is_displayed(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_visible)
            && self.ancestors(id).all(|a| self.get(a).is_some_and(Node::is_visible))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
