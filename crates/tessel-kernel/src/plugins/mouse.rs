// SPDX-License-Identifier: MIT
//
// Mouse routing.
//
// Each decoded mouse event is hit-tested against the last layout. The
// innermost node under the pointer gets it first, with coordinates made
// local to that node's bounds, then each ancestor in turn until one
// consumes it. A consuming node is marked dirty.

use std::cell::Cell;
use std::rc::Rc;

use tessel_layout::NodeId;
use tessel_term::MouseEvent;

use super::bubble_path;
use crate::event::{self, Payload};
use crate::kernel::Kernel;
use crate::plugin::Plugin;

/// Capability name.
pub const POINTER: &str = "pointer";

/// Where the pointer is, as of the last mouse event.
#[derive(Debug, Default)]
pub struct Pointer {
    hovered: Cell<Option<NodeId>>,
    position: Cell<Option<(u16, u16)>>,
    consumed_by: Cell<Option<NodeId>>,
}

impl Pointer {
    /// The innermost node under the pointer.
    #[must_use]
    pub fn hovered(&self) -> Option<NodeId> {
        self.hovered.get()
    }

    /// Last screen position seen.
    #[must_use]
    pub fn position(&self) -> Option<(u16, u16)> {
        self.position.get()
    }

    /// The node that consumed the last event, if any did.
    #[must_use]
    pub fn consumed_by(&self) -> Option<NodeId> {
        self.consumed_by.get()
    }
}

/// Offer `mouse` to `hit` and its ancestors. Returns the consuming node.
fn route(kernel: &mut Kernel, hit: NodeId, mouse: &MouseEvent) -> Option<NodeId> {
    for id in bubble_path(kernel, hit) {
        let Ok(node) = kernel.context_mut().node_mut(id) else {
            continue;
        };
        let Some((x, y)) = node.bounds().to_local(mouse.x, mouse.y) else {
            continue;
        };
        let local = MouseEvent { x, y, ..*mouse };
        if node.widget_mut_untracked().handle_mouse(&local) {
            node.mark_dirty();
            return Some(id);
        }
    }
    None
}

#[derive(Debug, Default)]
pub struct MousePlugin {
    pointer: Rc<Pointer>,
}

impl MousePlugin {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Plugin for MousePlugin {
    fn name(&self) -> &str {
        "mouse"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn dependencies(&self) -> &[&str] {
        &["input"]
    }

    fn install(&mut self, kernel: &mut Kernel) -> anyhow::Result<()> {
        kernel.provide(POINTER, Rc::clone(&self.pointer));

        let pointer = Rc::clone(&self.pointer);
        kernel.on(event::MOUSE, move |k: &mut Kernel, p: &Payload| {
            let Some(mouse) = p.mouse() else { return Ok(()) };
            let hit = k.hit_test(mouse.x, mouse.y);
            pointer.position.set(Some((mouse.x, mouse.y)));
            pointer.hovered.set(hit);
            let consumed = hit.and_then(|id| route(k, id, mouse));
            pointer.consumed_by.set(consumed);
            Ok(())
        });
        Ok(())
    }
}
