// SPDX-License-Identifier: MIT
//
// Cell and Style: what one terminal column holds.
//
// A Cell is a codepoint plus a Style. A Style is the paint state a renderer
// has to establish before writing that codepoint: foreground, background,
// attribute bits and underline shape. Widgets build Styles, the buffer
// stamps them into Cells, and the diff renderer compares Cells by value.
//
// Wide characters (CJK, most emoji) occupy two columns. The first cell holds
// the codepoint; the second is a continuation cell (ch = 0) carrying the same
// style so the background fills both columns. The renderer never writes a
// character for a continuation cell.

use crate::color::CellColor;

// ─── Text Attributes ─────────────────────────────────────────────────────────

bitflags::bitflags! {
    /// Text attributes as a one-byte bitset.
    ///
    /// Each flag maps to one SGR parameter:
    ///
    /// ```
    /// use tessel_term::cell::Attr;
    ///
    /// let a = Attr::BOLD | Attr::INVERSE;
    /// assert!(a.contains(Attr::BOLD));
    /// assert!(!a.contains(Attr::ITALIC));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Attr: u8 {
        /// SGR 1.
        const BOLD          = 1 << 0;
        /// SGR 2.
        const DIM           = 1 << 1;
        /// SGR 3.
        const ITALIC        = 1 << 2;
        /// SGR 5.
        const BLINK         = 1 << 3;
        /// SGR 7, swaps foreground and background.
        const INVERSE       = 1 << 4;
        /// SGR 8.
        const HIDDEN        = 1 << 5;
        /// SGR 9.
        const STRIKETHROUGH = 1 << 6;
    }
}

/// Underline shape.
///
/// Kept apart from [`Attr`] so "is underlined" and "which underline" can't
/// disagree. Anything but `None` means the cell is underlined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(u8)]
pub enum UnderlineStyle {
    #[default]
    None = 0,
    /// SGR 4 / 4:1.
    Straight = 1,
    /// SGR 4:2.
    Double = 2,
    /// SGR 4:3.
    Curly = 3,
    /// SGR 4:4.
    Dotted = 4,
    /// SGR 4:5.
    Dashed = 5,
}

impl UnderlineStyle {
    #[inline]
    #[must_use]
    pub const fn is_underlined(self) -> bool {
        !matches!(self, Self::None)
    }
}

// ─── Style ───────────────────────────────────────────────────────────────────

/// The paint state applied to a run of cells.
///
/// `Style::default()` is the terminal baseline, which is what `ESC[0m`
/// restores: default colors, no attributes, no underline.
///
/// ```
/// use tessel_term::cell::{Attr, Style};
/// use tessel_term::color::CellColor;
///
/// let title = Style::new()
///     .fg(CellColor::from_packed(0xE0_C0_60))
///     .attrs(Attr::BOLD);
/// assert!(title.attrs.contains(Attr::BOLD));
/// assert!(title.bg.is_default());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Style {
    pub fg: CellColor,
    pub bg: CellColor,
    pub attrs: Attr,
    pub underline: UnderlineStyle,
}

impl Style {
    /// The terminal baseline style.
    pub const DEFAULT: Self = Self {
        fg: CellColor::Default,
        bg: CellColor::Default,
        attrs: Attr::empty(),
        underline: UnderlineStyle::None,
    };

    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self::DEFAULT
    }

    #[inline]
    #[must_use]
    pub const fn fg(self, fg: CellColor) -> Self {
        Self { fg, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn bg(self, bg: CellColor) -> Self {
        Self { bg, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn attrs(self, attrs: Attr) -> Self {
        Self { attrs, ..self }
    }

    /// Add attributes on top of the ones already set.
    #[inline]
    #[must_use]
    pub const fn add_attrs(self, attrs: Attr) -> Self {
        Self {
            attrs: self.attrs.union(attrs),
            ..self
        }
    }

    #[inline]
    #[must_use]
    pub const fn underline(self, underline: UnderlineStyle) -> Self {
        Self { underline, ..self }
    }

    /// Whether this is the baseline style.
    #[inline]
    #[must_use]
    pub fn is_default(&self) -> bool {
        *self == Self::DEFAULT
    }
}

// ─── Cell ────────────────────────────────────────────────────────────────────

/// A single terminal column.
///
/// 16 bytes: a `u32` codepoint plus a 10-byte [`Style`], padded.
///
/// `ch` is `0` for the continuation half of a wide character and a Unicode
/// scalar value otherwise. A blank cell is a space, not `0`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub ch: u32,
    pub style: Style,
}

const CONTINUATION: u32 = 0;
const SPACE: u32 = b' ' as u32;

impl Cell {
    /// A space in the baseline style. Every fresh buffer is filled with this.
    pub const EMPTY: Self = Self {
        ch: SPACE,
        style: Style::DEFAULT,
    };

    #[inline]
    #[must_use]
    pub const fn new(ch: char) -> Self {
        Self {
            ch: ch as u32,
            style: Style::DEFAULT,
        }
    }

    #[inline]
    #[must_use]
    pub const fn styled(ch: char, style: Style) -> Self {
        Self {
            ch: ch as u32,
            style,
        }
    }

    /// The right half of a wide character, painted in the glyph's style.
    #[inline]
    #[must_use]
    pub const fn continuation(style: Style) -> Self {
        Self {
            ch: CONTINUATION,
            style,
        }
    }

    /// A space painted in `style`. Used wherever a glyph had to be dropped.
    #[inline]
    #[must_use]
    pub const fn blank(style: Style) -> Self {
        Self { ch: SPACE, style }
    }

    #[inline]
    #[must_use]
    pub const fn is_continuation(self) -> bool {
        self.ch == CONTINUATION
    }

    /// Whether this is a space in the baseline style.
    #[inline]
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.ch == SPACE && self.style.is_default()
    }

    /// The codepoint as a `char`; `None` for continuation cells.
    #[inline]
    #[must_use]
    pub const fn character(self) -> Option<char> {
        if self.ch == CONTINUATION {
            return None;
        }
        char::from_u32(self.ch)
    }

    #[inline]
    #[must_use]
    pub const fn with_style(self, style: Style) -> Self {
        Self { style, ..self }
    }
}

impl Default for Cell {
    #[inline]
    fn default() -> Self {
        Self::EMPTY
    }
}

impl std::fmt::Debug for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_continuation() {
            return write!(f, "Cell(continuation)");
        }
        let ch = char::from_u32(self.ch).unwrap_or('?');
        write!(f, "Cell({ch:?}")?;
        let s = &self.style;
        if !s.fg.is_default() {
            write!(f, ", fg={:?}", s.fg)?;
        }
        if !s.bg.is_default() {
            write!(f, ", bg={:?}", s.bg)?;
        }
        if !s.attrs.is_empty() {
            write!(f, ", {:?}", s.attrs)?;
        }
        if s.underline.is_underlined() {
            write!(f, ", {:?}", s.underline)?;
        }
        write!(f, ")")
    }
}

/// Whether two cells would look identical on screen.
///
/// Compares codepoint, both colors, attributes and underline.
#[inline]
#[must_use]
pub fn cells_equal(a: &Cell, b: &Cell) -> bool {
    a == b
}

// ─── Tests ───────────────────────────────────────────────────────────────────
