// SPDX-License-Identifier: MIT
//
// Layout engine: layout properties plus an outer size in, per-node bounds
// out. The whole visible tree is recomputed on every call.
//
// Two passes over the visible nodes:
//
//   1. Intrinsic sizes, children before parents. A leaf reports its content
//      size through `Measure`; a container sums its children along the main
//      axis and takes the largest on the cross axis. Border and padding are
//      added on top.
//
//   2. Placement, parents before children. Each container splits its content
//      box among its visible children:
//        - explicit cells are taken as given,
//        - percentages are of the container's resolved content size,
//        - auto children with a flex weight share what is left,
//        - other auto children get their intrinsic size.
//      Leftover space is then handed out by `justify`, and `align` places
//      each child on the cross axis.
//
// Everything is integer cells. When percentages or flex weights don't
// divide evenly, the cells left over after flooring go one at a time to the
// earliest siblings in the group. The group total is therefore exact and
// the result is the same on every pass. Children never extend past their
// container's content box; whatever doesn't fit is cut off.

use crate::geometry::{Edges, Rect, Size};
use crate::style::{Align, Dimension, Justify, LayoutStyle};
use crate::tree::{Measure, Node, NodeId, Tree, TreeError};

/// Reusable layout state. One engine can lay out any number of trees.
///
/// ```
/// use tessel_layout::engine::LayoutEngine;
/// use tessel_layout::geometry::{Rect, Size};
/// use tessel_layout::style::Direction;
/// use tessel_layout::tree::Tree;
///
/// let mut tree: Tree<()> = Tree::new();
/// let root = tree.insert(());
/// tree.get_mut(root).unwrap().direction(Direction::Row);
/// let left = tree.insert(());
/// let right = tree.insert(());
/// tree.get_mut(left).unwrap().flex(1);
/// tree.get_mut(right).unwrap().flex(1);
/// tree.append_child(root, left)?;
/// tree.append_child(root, right)?;
///
/// LayoutEngine::new().compute(&mut tree, root, Size::new(9, 3))?;
/// assert_eq!(tree.get(left).unwrap().bounds(), Rect::new(0, 0, 5, 3));
/// assert_eq!(tree.get(right).unwrap().bounds(), Rect::new(5, 0, 4, 3));
/// # Ok::<(), tessel_layout::tree::TreeError>(())
/// ```
#[derive(Debug, Default)]
pub struct LayoutEngine {
    intrinsic: Vec<Size>,
    passes: u64,
}

/// One child's share of its container, on the container's axes.
#[derive(Debug, Clone, Copy)]
struct Item {
    id: NodeId,
    main: u32,
    flex: u16,
    margin_start: u32,
    margin_end: u32,
}

impl LayoutEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times [`compute`](Self::compute) has run.
    #[inline]
    #[must_use]
    pub const fn passes(&self) -> u64 {
        self.passes
    }

    /// Lay out `root` and its visible descendants inside `available`.
    ///
    /// Hidden nodes, and everything under them, get empty bounds. Returns
    /// the number of nodes placed.
    ///
    /// # Errors
    ///
    /// [`TreeError::UnknownNode`] if `root` is not in the tree.
    pub fn compute<W: Measure>(
        &mut self,
        tree: &mut Tree<W>,
        root: NodeId,
        available: Size,
    ) -> Result<usize, TreeError> {
        if !tree.contains(root) {
            return Err(TreeError::UnknownNode(root));
        }
        self.passes += 1;

        for id in tree.descendants(root) {
            if let Some(node) = tree.get_mut(id) {
                node.set_bounds(Rect::default());
            }
        }

        let order = visible_pre_order(tree, root);
        if order.is_empty() {
            return Ok(0);
        }

        self.intrinsic.clear();
        self.intrinsic.resize(tree.capacity(), Size::ZERO);
        for &id in order.iter().rev() {
            self.intrinsic[id.index()] = self.measure(tree, id, available);
        }

        let root_bounds = tree
            .get(root)
            .map_or_else(Rect::default, |n| place_root(n.style(), available));
        if let Some(node) = tree.get_mut(root) {
            node.set_bounds(root_bounds);
        }

        let mut placed = Vec::new();
        for &id in &order {
            placed.clear();
            self.place_children(tree, id, &mut placed);
            for &(child, bounds) in &placed {
                if let Some(node) = tree.get_mut(child) {
                    node.set_bounds(bounds);
                }
            }
        }

        tracing::debug!(
            nodes = order.len(),
            width = available.width,
            height = available.height,
            "layout pass"
        );
        Ok(order.len())
    }

    // ── Intrinsic Sizes ─────────────────────────────────────────────

    fn measure<W: Measure>(&self, tree: &Tree<W>, id: NodeId, available: Size) -> Size {
        let Some(node) = tree.get(id) else {
            return Size::ZERO;
        };
        let style = node.style();
        let chrome = style.chrome();
        let row = style.direction.is_row();

        let kids = visible_children(tree, node);
        let content = if kids.is_empty() {
            let m = node.widget().measure(available);
            (u32::from(m.width), u32::from(m.height))
        } else {
            let mut sum_main = 0u32;
            let mut max_cross = 0u32;
            for &kid in &kids {
                let Some(k) = tree.get(kid) else { continue };
                let ks = k.style();
                let intr = self.intrinsic[kid.index()];
                let w = explicit_cells(ks.width).unwrap_or(intr.width);
                let h = explicit_cells(ks.height).unwrap_or(intr.height);
                let (m, c) = if row { (w, h) } else { (h, w) };
                let (mm, mc) = margins(ks.margin, row);
                sum_main += u32::from(m) + mm;
                max_cross = max_cross.max(u32::from(c) + mc);
            }
            sum_main += gaps(style.gap, kids.len());
            if row { (sum_main, max_cross) } else { (max_cross, sum_main) }
        };

        Size::new(
            clamp_u16(content.0 + u32::from(chrome.horizontal())),
            clamp_u16(content.1 + u32::from(chrome.vertical())),
        )
    }

    // ── Placement ───────────────────────────────────────────────────

    fn place_children<W>(&self, tree: &Tree<W>, id: NodeId, out: &mut Vec<(NodeId, Rect)>) {
        let Some(node) = tree.get(id) else { return };
        let kids = visible_children(tree, node);
        if kids.is_empty() {
            return;
        }

        let style = node.style();
        let content = node.content_bounds();
        let row = style.direction.is_row();
        let (main_origin, main_len, cross_origin, cross_len) = if row {
            (content.x, content.width, content.y, content.height)
        } else {
            (content.y, content.height, content.x, content.width)
        };
        let main_len = u32::from(main_len);
        let cross_len = u32::from(cross_len);

        let mut items: Vec<Item> = kids
            .iter()
            .filter_map(|&kid| {
                let k = tree.get(kid)?;
                let ks = k.style();
                let intr = self.intrinsic[kid.index()];
                let (dim, intr_main) = if row { (ks.width, intr.width) } else { (ks.height, intr.height) };
                let (margin_start, margin_end) = if row {
                    (ks.margin.left, ks.margin.right)
                } else {
                    (ks.margin.top, ks.margin.bottom)
                };
                let (main, flex) = match dim {
                    Dimension::Cells(n) => (u32::from(n), 0),
                    Dimension::Percent(_) => (0, 0),
                    Dimension::Auto if ks.flex > 0 => (0, ks.flex),
                    Dimension::Auto => (u32::from(intr_main), 0),
                };
                Some(Item {
                    id: kid,
                    main,
                    flex,
                    margin_start: u32::from(margin_start),
                    margin_end: u32::from(margin_end),
                })
            })
            .collect();

        // Percentages of the resolved content size, remainder to the front.
        let percents: Vec<(usize, u32)> = items
            .iter()
            .enumerate()
            .filter_map(|(i, it)| {
                let k = tree.get(it.id)?;
                let dim = if row { k.style().width } else { k.style().height };
                match dim {
                    Dimension::Percent(p) => Some((i, u32::from(p))),
                    _ => None,
                }
            })
            .collect();
        let weights: Vec<u32> = percents.iter().map(|&(_, p)| p).collect();
        let total: u32 = weights.iter().sum();
        let pool = u32::try_from(u64::from(main_len) * u64::from(total) / 100).unwrap_or(u32::MAX);
        for ((i, _), share) in percents.iter().zip(apportion(pool, &weights)) {
            items[*i].main = share.min(main_len);
        }

        // Flex weights share whatever the fixed items left.
        let used: u32 = items
            .iter()
            .map(|it| it.main + it.margin_start + it.margin_end)
            .sum::<u32>()
            + gaps(style.gap, items.len());
        let leftover = main_len.saturating_sub(used);
        let flex_idx: Vec<usize> = (0..items.len()).filter(|&i| items[i].flex > 0).collect();
        let flex_weights: Vec<u32> = flex_idx.iter().map(|&i| u32::from(items[i].flex)).collect();
        let mut flex_used = 0;
        for (&i, share) in flex_idx.iter().zip(apportion(leftover, &flex_weights)) {
            items[i].main = share;
            flex_used += share;
        }
        let free = leftover - flex_used;

        // Walk the main axis.
        let n = items.len();
        let main_end = main_len;
        let mut cursor = 0u32;
        for (i, it) in items.iter().enumerate() {
            let Some(k) = tree.get(it.id) else { continue };
            let start = cursor + justify_offset(style.justify, free, i, n) + it.margin_start;
            let pos = start.min(main_end);
            let size = it.main.min(main_end - pos);
            cursor += it.main + it.margin_start + it.margin_end + u32::from(style.gap);

            let (cpos, csize) = cross_place(k.style(), self.intrinsic[it.id.index()], style.align, row, cross_len);

            let main_pos = clamp_u16(u32::from(main_origin) + pos);
            let cross_pos = clamp_u16(u32::from(cross_origin) + cpos);
            let bounds = if row {
                Rect::new(main_pos, cross_pos, clamp_u16(size), clamp_u16(csize))
            } else {
                Rect::new(cross_pos, main_pos, clamp_u16(csize), clamp_u16(size))
            };
            out.push((it.id, bounds));
        }
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn visible_children<W>(tree: &Tree<W>, node: &Node<W>) -> Vec<NodeId> {
    node.children()
        .iter()
        .copied()
        .filter(|&c| tree.get(c).is_some_and(Node::is_visible))
        .collect()
}

fn visible_pre_order<W>(tree: &Tree<W>, root: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    if !tree.get(root).is_some_and(Node::is_visible) {
        return out;
    }
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        out.push(id);
        if let Some(node) = tree.get(id) {
            stack.extend(visible_children(tree, node).into_iter().rev());
        }
    }
    out
}

fn place_root(style: &LayoutStyle, available: Size) -> Rect {
    let outer = Rect::from_size(available).inset(style.margin);
    let resolve = |dim: Dimension, avail: u16| match dim {
        Dimension::Auto => avail,
        Dimension::Cells(n) => n.min(avail),
        Dimension::Percent(p) => percent_of(avail.into(), p),
    };
    Rect::new(
        outer.x,
        outer.y,
        resolve(style.width, outer.width),
        resolve(style.height, outer.height),
    )
}

/// Cross-axis offset and size of one child inside a line `len` cells long.
fn cross_place(style: &LayoutStyle, intrinsic: Size, align: Align, row: bool, len: u32) -> (u32, u32) {
    let (dim, intr, m_start, m_end) = if row {
        (style.height, intrinsic.height, style.margin.top, style.margin.bottom)
    } else {
        (style.width, intrinsic.width, style.margin.left, style.margin.right)
    };
    let m_start = u32::from(m_start);
    let avail = len.saturating_sub(m_start + u32::from(m_end));
    let size = match dim {
        Dimension::Cells(n) => u32::from(n),
        Dimension::Percent(p) => u32::from(percent_of(len, p)),
        Dimension::Auto if align == Align::Stretch => avail,
        Dimension::Auto => u32::from(intr),
    }
    .min(avail);
    let slack = avail - size;
    let offset = match align {
        Align::Start | Align::Stretch => 0,
        Align::Center => slack / 2,
        Align::End => slack,
    };
    (m_start + offset, size)
}

/// Total extra space before item `i` of `n` when `free` cells are left over.
fn justify_offset(justify: Justify, free: u32, i: usize, n: usize) -> u32 {
    let (i, n) = (u64::try_from(i).unwrap_or(0), u64::try_from(n).unwrap_or(1));
    let free = u64::from(free);
    let off = match justify {
        Justify::Start => 0,
        Justify::Center => free / 2,
        Justify::End => free,
        Justify::Between if n > 1 => free * i / (n - 1),
        Justify::Between => 0,
        Justify::Around => free * (2 * i + 1) / (2 * n),
    };
    u32::try_from(off).unwrap_or(u32::MAX)
}

/// Split `pool` in proportion to `weights`, flooring each share and giving
/// the leftover cells one at a time to the earliest entries. Shares sum to
/// exactly `pool` whenever any weight is non-zero.
fn apportion(pool: u32, weights: &[u32]) -> Vec<u32> {
    let total: u64 = weights.iter().map(|&w| u64::from(w)).sum();
    if total == 0 {
        return vec![0; weights.len()];
    }
    let mut shares: Vec<u32> = weights
        .iter()
        .map(|&w| u32::try_from(u64::from(pool) * u64::from(w) / total).unwrap_or(u32::MAX))
        .collect();
    let mut rest = pool - shares.iter().sum::<u32>();
    for (share, &w) in shares.iter_mut().zip(weights) {
        if rest == 0 {
            break;
        }
        if w > 0 {
            *share += 1;
            rest -= 1;
        }
    }
    shares
}

fn percent_of(len: u32, p: u16) -> u16 {
    let cells = (u64::from(len) * u64::from(p) / 100).min(u64::from(len));
    clamp_u16(u32::try_from(cells).unwrap_or(u32::MAX))
}

const fn explicit_cells(dim: Dimension) -> Option<u16> {
    match dim {
        Dimension::Cells(n) => Some(n),
        _ => None,
    }
}

/// Main-axis and cross-axis margin totals.
fn margins(m: Edges, row: bool) -> (u32, u32) {
    let (h, v) = (u32::from(m.horizontal()), u32::from(m.vertical()));
    if row { (h, v) } else { (v, h) }
}

fn gaps(gap: u16, count: usize) -> u32 {
    let between = u32::try_from(count.saturating_sub(1)).unwrap_or(u32::MAX);
    u32::from(gap).saturating_mul(between)
}

fn clamp_u16(v: u32) -> u16 {
    u16::try_from(v).unwrap_or(u16::MAX)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
