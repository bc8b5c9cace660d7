// SPDX-License-Identifier: MIT
//
// Keyboard focus.
//
// The plugin is the only writer of `Context::focused`. Tab and Shift+Tab
// walk the focusable, displayed nodes in depth-first order, wrapping at
// either end. Every other key goes to the focused node and bubbles up its
// ancestors until one consumes it. A left click focuses the nearest
// focusable node under the pointer.
//
// Other plugins move focus through the `"focus"` capability so that the
// `"focus"` event always fires:
//
//     let focus = kernel.capability::<Focus>("focus")?;
//     focus.next(&mut kernel);

use std::rc::Rc;

use tessel_layout::NodeId;
use tessel_term::{KeyCode, KeyEvent, Modifiers, MouseAction, MouseButton};

use super::bubble_path;
use crate::event::{self, Payload};
use crate::kernel::Kernel;
use crate::plugin::Plugin;

/// Capability name.
pub const FOCUS: &str = "focus";

/// Focus operations, shared through the capability registry.
#[derive(Debug, Default)]
pub struct Focus;

impl Focus {
    /// Focus `id`, or clear focus with `None`. Emits `"focus"` when the
    /// focused node changes.
    ///
    /// Returns `false` without changing anything when `id` is stale,
    /// hidden or not focusable.
    pub fn set(&self, kernel: &mut Kernel, id: Option<NodeId>) -> bool {
        if let Some(id) = id {
            if !is_focus_target(kernel, id) {
                return false;
            }
        }
        let previous = kernel.context().focused();
        if previous == id {
            return true;
        }
        kernel.context_mut().set_focused(id);
        tracing::debug!(?previous, current = ?id, "focus");
        kernel.emit(
            event::FOCUS,
            &Payload::Focus {
                previous,
                current: id,
            },
        );
        true
    }

    /// Move to the next focusable node, wrapping. Returns the newly
    /// focused node, or `None` when nothing is focusable.
    pub fn next(&self, kernel: &mut Kernel) -> Option<NodeId> {
        self.step(kernel, true)
    }

    /// Move to the previous focusable node, wrapping.
    pub fn prev(&self, kernel: &mut Kernel) -> Option<NodeId> {
        self.step(kernel, false)
    }

    pub fn clear(&self, kernel: &mut Kernel) {
        self.set(kernel, None);
    }

    fn step(&self, kernel: &mut Kernel, forward: bool) -> Option<NodeId> {
        let order = kernel.context().focusable_nodes();
        let len = order.len();
        if len == 0 {
            return None;
        }
        let current = kernel.context().focused();
        let index = match current.and_then(|c| order.iter().position(|&n| n == c)) {
            Some(pos) if forward => (pos + 1) % len,
            Some(pos) => (pos + len - 1) % len,
            None if forward => 0,
            None => len - 1,
        };
        let target = order[index];
        self.set(kernel, Some(target));
        Some(target)
    }
}

fn is_focus_target(kernel: &Kernel, id: NodeId) -> bool {
    let ctx = kernel.context();
    ctx.tree().is_displayed(id) && ctx.node(id).is_ok_and(|n| n.widget().focusable())
}

/// Route a key to the focused node, then its ancestors. Returns whether
/// some node consumed it.
fn route_key(kernel: &mut Kernel, key: &KeyEvent) -> bool {
    let Some(focused) = kernel.context().focused() else {
        return false;
    };
    for id in bubble_path(kernel, focused) {
        let Ok(node) = kernel.context_mut().node_mut(id) else {
            continue;
        };
        if node.widget_mut_untracked().handle_key(key) {
            node.mark_dirty();
            return true;
        }
    }
    false
}

#[derive(Debug, Default)]
pub struct FocusPlugin;

impl FocusPlugin {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Plugin for FocusPlugin {
    fn name(&self) -> &str {
        "focus"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn dependencies(&self) -> &[&str] {
        &["input"]
    }

    fn install(&mut self, kernel: &mut Kernel) -> anyhow::Result<()> {
        kernel.provide(FOCUS, Rc::new(Focus));

        kernel.on(event::KEY, |k: &mut Kernel, p: &Payload| {
            let Some(key) = p.key() else { return Ok(()) };
            match (key.code, key.modifiers) {
                (KeyCode::Tab, m) if m == Modifiers::SHIFT => {
                    Focus.prev(k);
                }
                (KeyCode::Tab, m) if m.is_empty() => {
                    Focus.next(k);
                }
                _ => {
                    route_key(k, key);
                }
            }
            Ok(())
        });

        kernel.on(event::MOUSE, |k: &mut Kernel, p: &Payload| {
            let Some(mouse) = p.mouse() else { return Ok(()) };
            if mouse.action != MouseAction::Press || mouse.button != Some(MouseButton::Left) {
                return Ok(());
            }
            let Some(hit) = k.hit_test(mouse.x, mouse.y) else {
                return Ok(());
            };
            if let Some(target) = bubble_path(k, hit).into_iter().find(|&id| is_focus_target(k, id)) {
                Focus.set(k, Some(target));
            }
            Ok(())
        });
        Ok(())
    }

    fn destroy(&mut self, ctx: &mut crate::context::Context) -> anyhow::Result<()> {
        ctx.set_focused(None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use pretty_assertions::assert_eq;
    use tessel_layout::Dimension;

    use crate::plugins::InputPlugin;
    use crate::plugins::testing::{Target, headless};
    use crate::widgets::Panel;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Scene {
        kernel: Kernel,
        log: Log,
        ids: [NodeId; 4],
    }

    /// Three one-row targets `a`, `b`, `c` stacked in a column, `b` inside
    /// a non-focusable panel.
    fn scene() -> Scene {
        let mut kernel = headless(10, 3);
        kernel
            .use_plugin(InputPlugin::new())
            .and_then(|k| k.use_plugin(FocusPlugin::new()))
            .unwrap();
        let log = Log::default();
        let root = kernel.root();
        let ctx = kernel.context_mut();
        let a = ctx.append(root, Target::new("a", &log)).unwrap();
        let wrap = ctx.append(root, Panel::new()).unwrap();
        let b = ctx.append(wrap, Target::new("b", &log)).unwrap();
        let c = ctx.append(root, Target::new("c", &log)).unwrap();
        for id in [a, wrap, b, c] {
            ctx.node_mut(id).unwrap().height(Dimension::Cells(1));
        }
        kernel.start().unwrap();
        kernel.tick().unwrap();
        Scene {
            kernel,
            log,
            ids: [a, b, c, wrap],
        }
    }

    fn focused(s: &Scene) -> Option<NodeId> {
        s.kernel.context().focused()
    }

    // ── Cycling ─────────────────────────────────────────────────

    #[test]
    fn tab_cycles_forward_and_wraps() {
        let mut s = scene();
        let [a, b, c, _] = s.ids;
        let mut seen = Vec::new();
        for _ in 0..4 {
            s.kernel.feed(b"\t");
            seen.push(focused(&s).unwrap());
        }
        assert_eq!(seen, [a, b, c, a]);
    }

    #[test]
    fn shift_tab_cycles_backward() {
        let mut s = scene();
        let [a, _, c, _] = s.ids;
        s.kernel.feed(b"\x1b[Z");
        assert_eq!(focused(&s), Some(c));
        s.kernel.feed(b"\x1b[Z\x1b[Z");
        assert_eq!(focused(&s), Some(a));
    }

    #[test]
    fn hidden_nodes_are_skipped() {
        let mut s = scene();
        let [a, b, c, wrap] = s.ids;
        s.kernel.context_mut().node_mut(wrap).unwrap().visible(false);
        s.kernel.feed(b"\t\t");
        assert_eq!(focused(&s), Some(c));
        let focus = s.kernel.capability::<Focus>(FOCUS).unwrap();
        assert!(!focus.set(&mut s.kernel, Some(b)));
        assert!(focus.set(&mut s.kernel, Some(a)));
    }

    #[test]
    fn focus_event_reports_both_ends() {
        let mut s = scene();
        let [a, b, ..] = s.ids;
        let events = Rc::new(RefCell::new(Vec::new()));
        let e = Rc::clone(&events);
        s.kernel.on(event::FOCUS, move |_: &mut Kernel, p: &Payload| {
            if let Payload::Focus { previous, current } = p {
                e.borrow_mut().push((*previous, *current));
            }
            Ok(())
        });
        s.kernel.feed(b"\t\t");
        let focus = s.kernel.capability::<Focus>(FOCUS).unwrap();
        focus.clear(&mut s.kernel);
        focus.clear(&mut s.kernel);
        assert_eq!(*events.borrow(), [(None, Some(a)), (Some(a), Some(b)), (Some(b), None)]);
    }

    #[test]
    fn next_with_nothing_focusable_is_none() {
        let mut k = headless(4, 1);
        k.use_plugin(InputPlugin::new()).unwrap();
        k.use_plugin(FocusPlugin::new()).unwrap();
        let focus = k.capability::<Focus>(FOCUS).unwrap();
        assert_eq!(focus.next(&mut k), None);
    }

    // ── Routing ─────────────────────────────────────────────────

    #[test]
    fn keys_go_to_the_focused_node() {
        let mut s = scene();
        s.kernel.feed(b"\tx");
        assert_eq!(*s.log.borrow(), ["a key x"]);
    }

    #[test]
    fn unconsumed_keys_bubble_to_ancestors() {
        let mut kernel = headless(10, 3);
        kernel.use_plugin(InputPlugin::new()).unwrap();
        kernel.use_plugin(FocusPlugin::new()).unwrap();
        let log = Log::default();
        let root = kernel.root();
        let ctx = kernel.context_mut();
        let outer = ctx.append(root, Target::new("outer", &log)).unwrap();
        let mut inner = Target::new("inner", &log);
        inner.consume = false;
        let inner = ctx.append(outer, inner).unwrap();
        kernel.start().unwrap();
        kernel.tick().unwrap();

        let focus = kernel.capability::<Focus>(FOCUS).unwrap();
        assert!(focus.set(&mut kernel, Some(inner)));
        kernel.tick().unwrap();
        kernel.feed(b"k");
        assert_eq!(*log.borrow(), ["inner key k", "outer key k"]);
        assert!(kernel.context().is_dirty());
    }

    #[test]
    fn unconsumed_keys_do_not_mark_dirty() {
        let mut s = scene();
        let [a, ..] = s.ids;
        s.kernel
            .context_mut()
            .widget_mut::<Target>(a)
            .unwrap()
            .consume = false;
        s.kernel.feed(b"\t");
        s.kernel.tick().unwrap();
        s.kernel.feed(b"z");
        assert!(!s.kernel.context().is_dirty());
    }

    #[test]
    fn no_focus_means_no_routing() {
        let mut s = scene();
        s.kernel.feed(b"q");
        assert!(s.log.borrow().is_empty());
    }

    // ── Mouse ───────────────────────────────────────────────────

    #[test]
    fn left_click_focuses_the_node_under_the_pointer() {
        let mut s = scene();
        let [_, b, c, _] = s.ids;
        // Row 1 is `b` inside its non-focusable wrapper.
        s.kernel.feed(b"\x1b[<0;3;2M");
        assert_eq!(focused(&s), Some(b));
        // Right click and release don't move focus.
        s.kernel.feed(b"\x1b[<2;3;3M\x1b[<0;3;3m");
        assert_eq!(focused(&s), Some(b));
        s.kernel.feed(b"\x1b[<0;1;3M");
        assert_eq!(focused(&s), Some(c));
    }

    #[test]
    fn destroy_clears_focus() {
        let mut s = scene();
        s.kernel.feed(b"\t");
        s.kernel.stop().unwrap();
        assert_eq!(focused(&s), None);
    }
}
