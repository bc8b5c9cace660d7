// SPDX-License-Identifier: MIT
//
// Painting the node tree into a frame.
//
// Depth first, parents before children, children in order, hidden
// subtrees skipped. Each node paints through a canvas clipped to its own
// bounds and its ancestors'. A node whose render fails is reported and
// its children still paint, so one broken widget costs only its own cells.

use tessel_layout::NodeId;
use tessel_term::Style;
use tessel_term::buffer::{ClipRect, FrameBuffer};

use crate::error::KernelError;
use crate::widget::{Canvas, NodeTree};

/// What one paint pass did.
#[derive(Debug, Default)]
pub struct Painted {
    pub nodes: usize,
    pub failures: Vec<KernelError>,
}

/// Paint `root` and its visible descendants. `base` is the style the root
/// inherits; `focused` is told its focus state through the canvas.
pub fn paint(
    tree: &NodeTree,
    root: NodeId,
    buf: &mut FrameBuffer,
    base: Style,
    focused: Option<NodeId>,
) -> Painted {
    let mut out = Painted::default();
    let mut stack: Vec<(NodeId, Style, ClipRect)> = vec![(root, base, buf.bounds())];

    while let Some((id, style, clip)) = stack.pop() {
        let Some(node) = tree.get(id) else { continue };
        if !node.is_visible() {
            continue;
        }
        let widget = node.widget();
        let mut canvas = Canvas::new(buf, node.bounds(), clip).with_focus(focused == Some(id));
        let child_clip = canvas.clip();
        if let Err(source) = widget.render(&mut canvas, style) {
            out.failures.push(KernelError::Render {
                node: id,
                kind: widget.kind(),
                source,
            });
        }
        out.nodes += 1;

        let inherited = widget.inherit(style);
        for &child in node.children().iter().rev() {
            stack.push((child, inherited, child_clip));
        }
    }
    out
}
