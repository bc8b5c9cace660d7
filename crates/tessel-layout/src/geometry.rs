// SPDX-License-Identifier: MIT
//
// Integer cell geometry shared by the tree, the layout engine and the
// kernel's hit testing.

// ─── Size ────────────────────────────────────────────────────────────────────

/// A width and height in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Size {
    pub width: u16,
    pub height: u16,
}

impl Size {
    pub const ZERO: Self = Self::new(0, 0);

    #[inline]
    #[must_use]
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

// ─── Edges ───────────────────────────────────────────────────────────────────

/// Per-side cell offsets, used for padding and margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Edges {
    pub top: u16,
    pub right: u16,
    pub bottom: u16,
    pub left: u16,
}

impl Edges {
    pub const ZERO: Self = Self::all(0);

    #[inline]
    #[must_use]
    pub const fn all(n: u16) -> Self {
        Self {
            top: n,
            right: n,
            bottom: n,
            left: n,
        }
    }

    /// `vertical` on top and bottom, `horizontal` on left and right.
    #[inline]
    #[must_use]
    pub const fn symmetric(vertical: u16, horizontal: u16) -> Self {
        Self {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }

    #[inline]
    #[must_use]
    pub const fn new(top: u16, right: u16, bottom: u16, left: u16) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Left plus right.
    #[inline]
    #[must_use]
    pub const fn horizontal(self) -> u16 {
        self.left.saturating_add(self.right)
    }

    /// Top plus bottom.
    #[inline]
    #[must_use]
    pub const fn vertical(self) -> u16 {
        self.top.saturating_add(self.bottom)
    }
}

impl From<u16> for Edges {
    fn from(n: u16) -> Self {
        Self::all(n)
    }
}

// ─── Rect ────────────────────────────────────────────────────────────────────

/// A screen rectangle in cells, origin top-left.
///
/// ```
/// use tessel_layout::geometry::{Edges, Rect};
///
/// let r = Rect::new(2, 1, 10, 4);
/// assert!(r.contains(11, 4));
/// assert!(!r.contains(12, 4));
/// assert_eq!(r.inset(Edges::all(1)), Rect::new(3, 2, 8, 2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    #[inline]
    #[must_use]
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    #[must_use]
    pub const fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    #[inline]
    #[must_use]
    pub const fn size(self) -> Size {
        Size::new(self.width, self.height)
    }

    /// One past the last column.
    #[inline]
    #[must_use]
    pub const fn right(self) -> u32 {
        self.x as u32 + self.width as u32
    }

    /// One past the last row.
    #[inline]
    #[must_use]
    pub const fn bottom(self) -> u32 {
        self.y as u32 + self.height as u32
    }

    #[inline]
    #[must_use]
    pub const fn area(self) -> u32 {
        self.width as u32 * self.height as u32
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether the cell at `(x, y)` lies inside. Empty rects contain nothing.
    #[inline]
    #[must_use]
    pub const fn contains(self, x: u16, y: u16) -> bool {
        x >= self.x && (x as u32) < self.right() && y >= self.y && (y as u32) < self.bottom()
    }

    /// Shrink by `edges`, collapsing to zero size rather than going negative.
    #[must_use]
    pub const fn inset(self, edges: Edges) -> Self {
        let dx = if edges.left < self.width { edges.left } else { self.width };
        let dy = if edges.top < self.height { edges.top } else { self.height };
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            width: self.width.saturating_sub(edges.horizontal()),
            height: self.height.saturating_sub(edges.vertical()),
        }
    }

    /// Translate a screen point into this rect's local coordinates.
    #[must_use]
    pub const fn to_local(self, x: u16, y: u16) -> Option<(u16, u16)> {
        if self.contains(x, y) {
            Some((x - self.x, y - self.y))
        } else {
            None
        }
    }
}
