// SPDX-License-Identifier: MIT
//
// Shared state every plugin sees: the node tree and its root, the focused
// node, the theme, the screen size and the capability registry.
//
// Writes to a field belong to one owner by convention. The focus plugin is
// the only writer of `focused`; the kernel alone sets `size`. Nothing
// enforces this at runtime.

use std::any::Any;
use std::rc::Rc;

use tessel_layout::{Node, NodeId, Size};

use crate::capability::Capabilities;
use crate::error::{KernelError, Result};
use crate::theme::Theme;
use crate::widget::{NodeTree, Widget};
use crate::widgets::Panel;

pub struct Context {
    tree: NodeTree,
    root: NodeId,
    focused: Option<NodeId>,
    theme: Theme,
    size: Size,
    capabilities: Capabilities,
    dirty: bool,
}

impl Context {
    /// A tree holding only a bare root panel, which fills the screen.
    #[must_use]
    pub fn new(theme: Theme, size: Size) -> Self {
        let mut tree = NodeTree::new();
        let root = tree.insert(Box::new(Panel::new()));
        Self {
            tree,
            root,
            focused: None,
            theme,
            size,
            capabilities: Capabilities::new(),
            dirty: true,
        }
    }

    // ─── Tree ────────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    #[must_use]
    pub const fn tree(&self) -> &NodeTree {
        &self.tree
    }

    #[inline]
    pub const fn tree_mut(&mut self) -> &mut NodeTree {
        &mut self.tree
    }

    /// Add a detached node.
    pub fn insert(&mut self, widget: impl Widget + 'static) -> NodeId {
        self.tree.insert(Box::new(widget))
    }

    /// Add a node as the last child of `parent`.
    ///
    /// # Errors
    ///
    /// [`KernelError::Tree`] if `parent` is gone.
    pub fn append(&mut self, parent: NodeId, widget: impl Widget + 'static) -> Result<NodeId> {
        let id = self.insert(widget);
        if let Err(e) = self.tree.append_child(parent, id) {
            self.tree.dispose(id);
            return Err(e.into());
        }
        Ok(id)
    }

    /// # Errors
    ///
    /// [`KernelError::UnknownNode`] for a stale or foreign id.
    pub fn node(&self, id: NodeId) -> Result<&Node<Box<dyn Widget>>> {
        self.tree.get(id).ok_or(KernelError::UnknownNode(id))
    }

    /// # Errors
    ///
    /// [`KernelError::UnknownNode`] for a stale or foreign id.
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node<Box<dyn Widget>>> {
        self.tree.get_mut(id).ok_or(KernelError::UnknownNode(id))
    }

    /// The widget at `id`, if it is a `T`.
    #[must_use]
    pub fn widget<T: Any>(&self, id: NodeId) -> Option<&T> {
        self.tree.get(id)?.widget().downcast_ref()
    }

    /// Mutable access to the widget at `id`, if it is a `T`. Marks the
    /// node dirty.
    pub fn widget_mut<T: Any>(&mut self, id: NodeId) -> Option<&mut T> {
        self.tree.get_mut(id)?.widget_mut().downcast_mut()
    }

    /// Dispose `id` and everything under it. Focus on a disposed node is
    /// dropped. The root can't be removed; asking to returns 0.
    pub fn remove(&mut self, id: NodeId) -> usize {
        if id == self.root {
            tracing::debug!("refusing to remove the root node");
            return 0;
        }
        let n = self.tree.dispose(id);
        if self.focused.is_some_and(|f| !self.tree.contains(f)) {
            self.focused = None;
        }
        n
    }

    /// Deepest displayed node whose bounds contain `(x, y)`. Among
    /// siblings, later ones are on top.
    #[must_use]
    pub fn hit_test(&self, x: u16, y: u16) -> Option<NodeId> {
        let contains = |id: NodeId| {
            self.tree
                .get(id)
                .is_some_and(|n| n.is_visible() && n.bounds().contains(x, y))
        };
        if !contains(self.root) {
            return None;
        }
        let mut hit = self.root;
        while let Some(&child) = self.tree.children(hit).iter().rev().find(|&&c| contains(c)) {
            hit = child;
        }
        Some(hit)
    }

    /// Displayed nodes whose widget accepts focus, in depth-first order.
    #[must_use]
    pub fn focusable_nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.tree.get(id) else { continue };
            if !node.is_visible() {
                continue;
            }
            if node.widget().focusable() {
                out.push(id);
            }
            stack.extend(node.children().iter().rev());
        }
        out
    }

    // ─── Focus ───────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub const fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    /// Replace the focused node. Meant for the focus plugin only; use its
    /// `Focus` capability instead so the `"focus"` event fires.
    pub fn set_focused(&mut self, id: Option<NodeId>) {
        if self.focused != id {
            self.focused = id;
            self.dirty = true;
        }
    }

    // ─── Theme & Screen ──────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub const fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.dirty = true;
    }

    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    pub(crate) const fn set_size(&mut self, size: Size) {
        self.size = size;
        self.dirty = true;
    }

    // ─── Capabilities ────────────────────────────────────────────────────

    pub fn provide<T: Any>(&mut self, name: &str, value: Rc<T>) {
        self.capabilities.provide(name, value);
    }

    /// # Errors
    ///
    /// See [`Capabilities::get`].
    pub fn capability<T: Any>(&self, name: &str) -> Result<Rc<T>> {
        self.capabilities.get(name)
    }

    #[inline]
    #[must_use]
    pub const fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    // ─── Dirty Tracking ──────────────────────────────────────────────────

    /// Ask for a repaint on the next tick.
    pub const fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Whether the next tick has to lay out and paint.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty || self.tree.is_dirty()
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
        self.tree.mark_all_clean();
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("nodes", &self.tree.len())
            .field("root", &self.root)
            .field("focused", &self.focused)
            .field("size", &self.size)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tessel_layout::{LayoutEngine, Rect};

    use crate::widgets::Label;

    fn laid_out() -> (Context, NodeId, NodeId, NodeId) {
        let mut ctx = Context::new(Theme::DEFAULT, Size::new(20, 10));
        let root = ctx.root();
        ctx.node_mut(root).unwrap().direction(tessel_layout::Direction::Row);
        let left = ctx.append(root, Panel::new().focusable(true)).unwrap();
        let right = ctx.append(root, Panel::new()).unwrap();
        let inner = ctx.append(right, Label::new("hi")).unwrap();
        ctx.node_mut(left).unwrap().flex(1);
        ctx.node_mut(right).unwrap().flex(1);
        let size = ctx.size();
        LayoutEngine::new().compute(ctx.tree_mut(), root, size).unwrap();
        (ctx, left, right, inner)
    }

    // ── Tree ────────────────────────────────────────────────────────────

    #[test]
    fn append_and_downcast() {
        let (mut ctx, left, _, inner) = laid_out();
        assert_eq!(ctx.widget::<Label>(inner).map(Label::text), Some("hi"));
        assert!(ctx.widget::<Label>(left).is_none());
        ctx.widget_mut::<Label>(inner).unwrap().set_text("yo");
        assert_eq!(ctx.widget::<Label>(inner).map(Label::text), Some("yo"));
    }

    #[test]
    fn append_to_missing_parent_fails_and_leaves_nothing() {
        let (mut ctx, left, _, _) = laid_out();
        let count = ctx.tree().len();
        ctx.remove(left);
        assert!(ctx.append(left, Label::new("orphan")).is_err());
        assert_eq!(ctx.tree().len(), count - 1);
    }

    #[test]
    fn root_cannot_be_removed() {
        let (mut ctx, ..) = laid_out();
        let root = ctx.root();
        assert_eq!(ctx.remove(root), 0);
        assert!(ctx.tree().contains(root));
    }

    #[test]
    fn removing_the_focused_node_clears_focus() {
        let (mut ctx, _, right, inner) = laid_out();
        ctx.set_focused(Some(inner));
        assert_eq!(ctx.remove(right), 2);
        assert_eq!(ctx.focused(), None);
    }

    #[test]
    fn unknown_node_error() {
        let (mut ctx, left, ..) = laid_out();
        ctx.remove(left);
        assert!(matches!(ctx.node(left), Err(KernelError::UnknownNode(id)) if id == left));
    }

    // ── Hit Testing ─────────────────────────────────────────────────────

    #[test]
    fn hit_test_finds_the_innermost_node() {
        let (ctx, left, right, inner) = laid_out();
        assert_eq!(ctx.node(inner).unwrap().bounds(), Rect::new(10, 0, 10, 1));
        assert_eq!(ctx.hit_test(0, 5), Some(left));
        assert_eq!(ctx.hit_test(12, 0), Some(inner));
        assert_eq!(ctx.hit_test(12, 5), Some(right));
        assert_eq!(ctx.hit_test(20, 0), None);
    }

    #[test]
    fn hidden_nodes_are_not_hit() {
        let (mut ctx, _, right, inner) = laid_out();
        ctx.node_mut(inner).unwrap().visible(false);
        assert_eq!(ctx.hit_test(12, 0), Some(right));
    }

    #[test]
    fn collapsed_nodes_are_never_hit() {
        let mut ctx = Context::new(Theme::DEFAULT, Size::new(4, 4));
        let root = ctx.root();
        let a = ctx.append(root, Panel::new()).unwrap();
        let b = ctx.append(root, Panel::new()).unwrap();
        ctx.node_mut(a).unwrap().height(tessel_layout::Dimension::Cells(4));
        LayoutEngine::new().compute(ctx.tree_mut(), root, Size::new(4, 4)).unwrap();
        assert!(ctx.node(b).unwrap().bounds().is_empty());
        assert_eq!(ctx.hit_test(1, 3), Some(a));
    }

    // ── Focus & Dirty ───────────────────────────────────────────────────

    #[test]
    fn focusable_nodes_in_tree_order() {
        let (mut ctx, left, right, _) = laid_out();
        let extra = ctx.append(right, Panel::new().focusable(true)).unwrap();
        assert_eq!(ctx.focusable_nodes(), [left, extra]);
        ctx.node_mut(right).unwrap().visible(false);
        assert_eq!(ctx.focusable_nodes(), [left]);
    }

    #[test]
    fn dirty_follows_tree_and_explicit_marks() {
        let (mut ctx, left, ..) = laid_out();
        assert!(ctx.is_dirty());
        ctx.mark_clean();
        assert!(!ctx.is_dirty());
        ctx.mark_dirty();
        assert!(ctx.is_dirty());
        ctx.mark_clean();
        ctx.node_mut(left).unwrap().flex(2);
        assert!(ctx.is_dirty());
        ctx.mark_clean();
        ctx.set_focused(Some(left));
        assert!(ctx.is_dirty());
        ctx.mark_clean();
        ctx.set_focused(Some(left));
        assert!(!ctx.is_dirty());
    }

    #[test]
    fn capabilities_round_trip() {
        let mut ctx = Context::new(Theme::DEFAULT, Size::new(1, 1));
        ctx.provide("answer", Rc::new(42i32));
        assert_eq!(*ctx.capability::<i32>("answer").unwrap(), 42);
        assert!(ctx.capabilities().contains("answer"));
    }
}
