// SPDX-License-Identifier: MIT
//
// Layout properties a node carries. The engine reads them every pass; the
// node's chainable setters write them.

use std::fmt;
use std::str::FromStr;

use crate::geometry::Edges;

// ─── Dimension ───────────────────────────────────────────────────────────────

/// How a node's size along one axis is decided.
///
/// ```
/// use tessel_layout::style::Dimension;
///
/// assert_eq!("50%".parse(), Ok(Dimension::Percent(50)));
/// assert_eq!("12".parse(), Ok(Dimension::Cells(12)));
/// assert_eq!("auto".parse(), Ok(Dimension::Auto));
/// assert!("fifty".parse::<Dimension>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Dimension {
    /// Flex share when the node has a flex weight, intrinsic size otherwise.
    /// On the cross axis, stretch or intrinsic depending on alignment.
    #[default]
    Auto,
    /// Exactly this many cells.
    Cells(u16),
    /// Whole percent of the parent's resolved content size.
    Percent(u16),
}

impl From<u16> for Dimension {
    fn from(n: u16) -> Self {
        Self::Cells(n)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Cells(n) => write!(f, "{n}"),
            Self::Percent(p) => write!(f, "{p}%"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid dimension {input:?}: expected a cell count, a whole percentage or \"auto\"")]
pub struct ParseDimensionError {
    pub input: String,
}

impl FromStr for Dimension {
    type Err = ParseDimensionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        let err = || ParseDimensionError {
            input: s.to_owned(),
        };
        if t.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        if let Some(p) = t.strip_suffix('%') {
            return p.trim().parse().map(Self::Percent).map_err(|_| err());
        }
        t.parse().map(Self::Cells).map_err(|_| err())
    }
}

// ─── Flex Enums ──────────────────────────────────────────────────────────────

/// Main axis of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Direction {
    Row,
    #[default]
    Column,
}

impl Direction {
    #[inline]
    #[must_use]
    pub const fn is_row(self) -> bool {
        matches!(self, Self::Row)
    }
}

/// Where leftover main-axis space goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Justify {
    #[default]
    Start,
    Center,
    End,
    /// Gaps only between items.
    Between,
    /// Equal space around every item; the outer gaps are half size.
    Around,
}

/// Cross-axis placement of children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Align {
    Start,
    Center,
    End,
    /// Auto-sized children fill the cross axis.
    #[default]
    Stretch,
}

// ─── LayoutStyle ─────────────────────────────────────────────────────────────

/// Everything the engine needs to place one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct LayoutStyle {
    pub width: Dimension,
    pub height: Dimension,
    /// Flex weight. Zero means the node doesn't take leftover space.
    pub flex: u16,
    pub direction: Direction,
    pub justify: Justify,
    pub align: Align,
    /// Cells between adjacent children on the main axis.
    pub gap: u16,
    pub padding: Edges,
    pub margin: Edges,
    /// A one-cell ring inside the bounds, outside the padding.
    pub border: bool,
}

impl LayoutStyle {
    /// Space taken by border plus padding around the content box.
    #[must_use]
    pub const fn chrome(&self) -> Edges {
        let b = if self.border { 1 } else { 0 };
        Edges {
            top: self.padding.top.saturating_add(b),
            right: self.padding.right.saturating_add(b),
            bottom: self.padding.bottom.saturating_add(b),
            left: self.padding.left.saturating_add(b),
        }
    }
}
