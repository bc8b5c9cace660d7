// SPDX-License-Identifier: MIT
//
// FrameBuffer: the 2D cell grid that every node paints to.
//
// One frame's worth of terminal content. Nodes paint into the current
// buffer each tick; the diff renderer compares it with the previous one and
// emits escape sequences only for what changed.
//
// Design:
//
//   - Flat `Vec<Cell>` in row-major order. The renderer walks rows left to
//     right, so a row is one contiguous slice.
//
//   - Paint coordinates are signed. A node partially scrolled off the top
//     or left still paints; the part outside the buffer (or outside an
//     optional `ClipRect`) is dropped.
//
//   - Wide characters occupy a glyph cell plus a continuation cell. Every
//     mutation goes through `put_narrow`/`put_wide`, which break any pair
//     the write would split, so the grid never holds a glyph without its
//     continuation or a continuation without its glyph.
//
//   - Allocation is capped at `MAX_CELLS`. Asking for more is an error, not
//     a silent truncation.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

use crate::cell::{Cell, Style};

/// Largest buffer we agree to allocate (2048 × 2048 cells, 64 MiB).
pub const MAX_CELLS: usize = 1 << 22;

/// Buffer construction failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("buffer {width}x{height} exceeds the {max}-cell limit")]
    TooLarge { width: u16, height: u16, max: usize },
}

// ─── ClipRect ───────────────────────────────────────────────────────────────────

/// A clipping rectangle with a signed origin.
///
/// ```
/// use tessel_term::buffer::ClipRect;
///
/// let clip = ClipRect::new(-2, 0, 10, 3);
/// assert!(clip.contains(0, 0));
/// assert!(clip.contains(7, 2));
/// assert!(!clip.contains(8, 0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipRect {
    pub x: i32,
    pub y: i32,
    pub width: u16,
    pub height: u16,
}

impl ClipRect {
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    #[must_use]
    pub const fn from_unsigned(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self::new(x as i32, y as i32, width, height)
    }

    /// Right edge (exclusive), saturating at `i32::MAX`.
    #[inline]
    #[must_use]
    pub const fn right(self) -> i32 {
        self.x.saturating_add(self.width as i32)
    }

    /// Bottom edge (exclusive), saturating at `i32::MAX`.
    #[inline]
    #[must_use]
    pub const fn bottom(self) -> i32 {
        self.y.saturating_add(self.height as i32)
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, px: i32, py: i32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    /// Overlap of two rectangles, `None` when they don't touch.
    #[must_use]
    pub fn intersect(self, other: Self) -> Option<Self> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        if x2 > x1 && y2 > y1 {
            // Both differences are positive and bounded by a u16 extent.
            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
            Some(Self {
                x: x1,
                y: y1,
                width: (x2 - x1) as u16,
                height: (y2 - y1) as u16,
            })
        } else {
            None
        }
    }
}

// ─── BorderSet ──────────────────────────────────────────────────────────────────

/// Box-drawing glyphs for [`FrameBuffer::draw_rect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderSet {
    pub top_left: char,
    pub top_right: char,
    pub bottom_left: char,
    pub bottom_right: char,
    pub horizontal: char,
    pub vertical: char,
}

impl BorderSet {
    /// `┌─┐ │ └─┘`
    pub const PLAIN: Self = Self::from_glyphs(['┌', '┐', '└', '┘', '─', '│']);
    /// `╭─╮ │ ╰─╯`
    pub const ROUNDED: Self = Self::from_glyphs(['╭', '╮', '╰', '╯', '─', '│']);
    /// `╔═╗ ║ ╚═╝`
    pub const DOUBLE: Self = Self::from_glyphs(['╔', '╗', '╚', '╝', '═', '║']);
    /// `┏━┓ ┃ ┗━┛`
    pub const HEAVY: Self = Self::from_glyphs(['┏', '┓', '┗', '┛', '━', '┃']);

    const fn from_glyphs(g: [char; 6]) -> Self {
        Self {
            top_left: g[0],
            top_right: g[1],
            bottom_left: g[2],
            bottom_right: g[3],
            horizontal: g[4],
            vertical: g[5],
        }
    }
}

impl Default for BorderSet {
    fn default() -> Self {
        Self::PLAIN
    }
}

// ─── FrameBuffer ────────────────────────────────────────────────────────────────

/// A rectangular grid of [`Cell`]s.
///
/// ```
/// use tessel_term::buffer::FrameBuffer;
/// use tessel_term::cell::Style;
///
/// let mut buf = FrameBuffer::new(80, 24).unwrap();
/// buf.write(0, 0, "Hello", Style::default());
/// assert_eq!(buf.get(4, 0).and_then(|c| c.character()), Some('o'));
/// assert!(buf.get(5, 0).is_some_and(|c| c.is_empty()));
/// assert!(buf.get(80, 0).is_none());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    // ─── Construction ────────────────────────────────────────────────────

    /// Create a buffer filled with blank cells.
    ///
    /// Each dimension is clamped to at least 1, so `new(0, 0)` is a 1×1
    /// buffer.
    ///
    /// # Errors
    ///
    /// [`BufferError::TooLarge`] when `width * height` exceeds [`MAX_CELLS`].
    pub fn new(width: u16, height: u16) -> Result<Self, BufferError> {
        let (width, height) = Self::checked_dims(width, height)?;
        Ok(Self {
            width,
            height,
            cells: vec![Cell::EMPTY; usize::from(width) * usize::from(height)],
        })
    }

    fn checked_dims(width: u16, height: u16) -> Result<(u16, u16), BufferError> {
        let width = width.max(1);
        let height = height.max(1);
        if usize::from(width) * usize::from(height) > MAX_CELLS {
            return Err(BufferError::TooLarge {
                width,
                height,
                max: MAX_CELLS,
            });
        }
        Ok((width, height))
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    #[inline]
    #[must_use]
    pub fn total_cells(&self) -> usize {
        self.cells.len()
    }

    /// The whole buffer as a clip rectangle at the origin.
    #[inline]
    #[must_use]
    pub const fn bounds(&self) -> ClipRect {
        ClipRect::new(0, 0, self.width, self.height)
    }

    #[inline]
    #[must_use]
    pub const fn in_bounds(&self, x: u16, y: u16) -> bool {
        x < self.width && y < self.height
    }

    #[inline]
    const fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// The cell at `(x, y)`, or `None` outside the buffer.
    #[inline]
    #[must_use]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        if self.in_bounds(x, y) {
            Some(&self.cells[self.index(x, y)])
        } else {
            None
        }
    }

    /// All cells, row-major.
    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    #[inline]
    #[must_use]
    pub fn row(&self, y: u16) -> Option<&[Cell]> {
        if y >= self.height {
            return None;
        }
        let start = self.index(0, y);
        Some(&self.cells[start..start + usize::from(self.width)])
    }

    /// A row's characters as a string, continuation cells skipped.
    #[must_use]
    pub fn row_text(&self, y: u16) -> String {
        self.row(y)
            .map(|row| row.iter().filter_map(|c| c.character()).collect())
            .unwrap_or_default()
    }

    /// Iterate `(x, y, cell)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, u16, &Cell)> {
        let w = usize::from(self.width);
        self.cells.iter().enumerate().map(move |(i, cell)| {
            // i < width * height, so both quotient and remainder fit in u16.
            #[allow(clippy::cast_possible_truncation)]
            ((i % w) as u16, (i / w) as u16, cell)
        })
    }

    // ─── Clear, Resize, Copy ─────────────────────────────────────────────

    /// Reset every cell to a blank default cell.
    pub fn clear(&mut self) {
        self.cells.fill(Cell::EMPTY);
    }

    /// Change dimensions, keeping the overlapping top-left region.
    ///
    /// A wide glyph whose continuation falls past the new right edge is
    /// replaced by a blank cell in the same style.
    ///
    /// # Errors
    ///
    /// [`BufferError::TooLarge`] if the new size exceeds [`MAX_CELLS`]; the
    /// buffer is left unchanged.
    pub fn resize(&mut self, width: u16, height: u16) -> Result<(), BufferError> {
        let (width, height) = Self::checked_dims(width, height)?;
        if width == self.width && height == self.height {
            return Ok(());
        }

        let mut cells = vec![Cell::EMPTY; usize::from(width) * usize::from(height)];
        let keep_w = usize::from(width.min(self.width));
        for y in 0..height.min(self.height) {
            let src = self.index(0, y);
            let dst = usize::from(y) * usize::from(width);
            cells[dst..dst + keep_w].copy_from_slice(&self.cells[src..src + keep_w]);

            let last = dst + keep_w - 1;
            let split = usize::from(self.width) > keep_w
                && self.cells[src + keep_w].is_continuation();
            if split {
                cells[last] = Cell::blank(cells[last].style);
            }
        }

        self.width = width;
        self.height = height;
        self.cells = cells;
        Ok(())
    }

    /// Overwrite this buffer with `other`, reusing the allocation when the
    /// sizes match.
    pub fn copy_from(&mut self, other: &Self) {
        if self.cells.len() == other.cells.len() {
            self.cells.copy_from_slice(&other.cells);
            self.width = other.width;
            self.height = other.height;
        } else {
            self.clone_from(other);
        }
    }

    // ─── Single Cells ────────────────────────────────────────────────────

    /// Place one cell. Out-of-range positions are ignored.
    ///
    /// A wide glyph also writes its continuation (or becomes a blank when
    /// it would not fit). A continuation or zero-width cell is stored as a
    /// blank in its style; continuations are only created alongside their
    /// glyph.
    ///
    /// Returns `true` if the position was in bounds.
    pub fn set(&mut self, x: u16, y: u16, cell: Cell) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        match cell.character().map_or(0, char_width) {
            2 if x + 1 < self.width => self.put_wide(x, y, cell),
            1 => self.put_narrow(x, y, cell),
            _ => self.put_narrow(x, y, Cell::blank(cell.style)),
        }
        true
    }

    /// Break any wide pair touching `(x, y)` ahead of an overwrite.
    ///
    /// The surviving half becomes a blank cell in its own style.
    fn break_wide_char_at(&mut self, x: u16, y: u16) {
        let idx = self.index(x, y);
        if self.cells[idx].is_continuation() && x > 0 {
            let prev = idx - 1;
            self.cells[prev] = Cell::blank(self.cells[prev].style);
        }
        if x + 1 < self.width {
            let next = idx + 1;
            if self.cells[next].is_continuation() {
                self.cells[next] = Cell::blank(self.cells[next].style);
            }
        }
    }

    /// Write a single-width cell. `(x, y)` must be in bounds.
    fn put_narrow(&mut self, x: u16, y: u16, cell: Cell) {
        self.break_wide_char_at(x, y);
        let idx = self.index(x, y);
        self.cells[idx] = cell;
    }

    /// Write a wide glyph and its continuation. `x + 1` must be in bounds.
    fn put_wide(&mut self, x: u16, y: u16, cell: Cell) {
        self.break_wide_char_at(x, y);
        self.break_wide_char_at(x + 1, y);
        let idx = self.index(x, y);
        self.cells[idx] = cell;
        self.cells[idx + 1] = Cell::continuation(cell.style);
    }

    /// The paintable area: buffer bounds, narrowed by `clip` if given.
    fn paint_area(&self, clip: Option<&ClipRect>) -> Option<ClipRect> {
        match clip {
            Some(clip) => self.bounds().intersect(*clip),
            None => Some(self.bounds()),
        }
    }

    // ─── Text ────────────────────────────────────────────────────────────

    /// Write `text` left to right starting at `(x, y)`.
    ///
    /// Text is split into grapheme clusters; each cluster is stored as its
    /// base character. Control characters and zero-width clusters are
    /// skipped. Wide glyphs take two columns; one that would be cut by the
    /// buffer edge is written as a single blank instead.
    ///
    /// Returns the columns consumed, stopping at the right edge.
    pub fn write(&mut self, x: i32, y: i32, text: &str, style: Style) -> u16 {
        self.write_impl(x, y, text, style, None)
    }

    /// [`write`](Self::write) restricted to `clip`.
    pub fn write_clipped(
        &mut self,
        x: i32,
        y: i32,
        text: &str,
        style: Style,
        clip: &ClipRect,
    ) -> u16 {
        self.write_impl(x, y, text, style, Some(clip))
    }

    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    fn write_impl(
        &mut self,
        x: i32,
        y: i32,
        text: &str,
        style: Style,
        clip: Option<&ClipRect>,
    ) -> u16 {
        let Some(area) = self.paint_area(clip) else {
            return 0;
        };
        if y < area.y || y >= area.bottom() {
            return 0;
        }
        // Inside `area`, so 0 <= y < height.
        let row = y as u16;

        let mut col = x;
        for grapheme in text.graphemes(true) {
            if col >= area.right() {
                break;
            }
            let Some(base) = grapheme.chars().next() else {
                continue;
            };
            let w = char_width(base);
            if w == 0 {
                continue;
            }

            let left = area.contains(col, y);
            if w == 2 {
                let right = area.contains(col + 1, y);
                match (left, right) {
                    (true, true) => self.put_wide(col as u16, row, Cell::styled(base, style)),
                    (true, false) => self.put_narrow(col as u16, row, Cell::blank(style)),
                    (false, true) => self.put_narrow((col + 1) as u16, row, Cell::blank(style)),
                    (false, false) => {}
                }
                col += 2;
            } else {
                if left {
                    self.put_narrow(col as u16, row, Cell::styled(base, style));
                }
                col += 1;
            }
        }

        col.min(area.right())
            .saturating_sub(x)
            .clamp(0, i32::from(u16::MAX)) as u16
    }

    // ─── Rectangles and Lines ────────────────────────────────────────────

    /// Fill a rectangle with `cell`, clipped to the buffer.
    ///
    /// Zero or negative extents do nothing. A wide or continuation `cell`
    /// fills with blanks in its style.
    pub fn fill(&mut self, x: i32, y: i32, width: i32, height: i32, cell: Cell) {
        self.fill_impl(x, y, width, height, cell, None);
    }

    /// [`fill`](Self::fill) restricted to `clip`.
    pub fn fill_clipped(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        cell: Cell,
        clip: &ClipRect,
    ) {
        self.fill_impl(x, y, width, height, cell, Some(clip));
    }

    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    fn fill_impl(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        cell: Cell,
        clip: Option<&ClipRect>,
    ) {
        if width <= 0 || height <= 0 {
            return;
        }
        let rect = ClipRect::new(
            x,
            y,
            width.min(i32::from(u16::MAX)) as u16,
            height.min(i32::from(u16::MAX)) as u16,
        );
        let Some(area) = self.paint_area(clip).and_then(|a| a.intersect(rect)) else {
            return;
        };
        let cell = match cell.character().map_or(0, char_width) {
            1 => cell,
            _ => Cell::blank(cell.style),
        };

        // `area` lies inside the buffer, so every edge fits in u16.
        let (x1, x2) = (area.x as u16, area.right() as u16);
        for row in area.y as u16..area.bottom() as u16 {
            self.break_wide_char_at(x1, row);
            self.break_wide_char_at(x2 - 1, row);
            let start = self.index(x1, row);
            let end = self.index(x2, row);
            self.cells[start..end].fill(cell);
        }
    }

    /// Draw `len` copies of `ch` rightwards from `(x, y)`.
    pub fn draw_hline(&mut self, x: i32, y: i32, len: i32, ch: char, style: Style) {
        self.fill_impl(x, y, len, 1, Cell::styled(ch, style), None);
    }

    /// Draw `len` copies of `ch` downwards from `(x, y)`.
    pub fn draw_vline(&mut self, x: i32, y: i32, len: i32, ch: char, style: Style) {
        self.fill_impl(x, y, 1, len, Cell::styled(ch, style), None);
    }

    /// Draw a box outline. The interior is untouched.
    pub fn draw_rect(&mut self, x: i32, y: i32, width: i32, height: i32, set: &BorderSet, style: Style) {
        self.rect_impl(x, y, width, height, set, style, None);
    }

    /// [`draw_rect`](Self::draw_rect) restricted to `clip`.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_rect_clipped(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        set: &BorderSet,
        style: Style,
        clip: &ClipRect,
    ) {
        self.rect_impl(x, y, width, height, set, style, Some(clip));
    }

    #[allow(clippy::too_many_arguments)]
    fn rect_impl(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        set: &BorderSet,
        style: Style,
        clip: Option<&ClipRect>,
    ) {
        if width <= 0 || height <= 0 {
            return;
        }
        let glyph = |ch| Cell::styled(ch, style);
        if height == 1 {
            self.fill_impl(x, y, width, 1, glyph(set.horizontal), clip);
            return;
        }
        if width == 1 {
            self.fill_impl(x, y, 1, height, glyph(set.vertical), clip);
            return;
        }

        // Edges past i32::MAX saturate and then clip away.
        let (right, bottom) = (x.saturating_add(width - 1), y.saturating_add(height - 1));
        let (inner_x, inner_y) = (x.saturating_add(1), y.saturating_add(1));
        self.fill_impl(inner_x, y, width - 2, 1, glyph(set.horizontal), clip);
        self.fill_impl(inner_x, bottom, width - 2, 1, glyph(set.horizontal), clip);
        self.fill_impl(x, inner_y, 1, height - 2, glyph(set.vertical), clip);
        self.fill_impl(right, inner_y, 1, height - 2, glyph(set.vertical), clip);
        self.fill_impl(x, y, 1, 1, glyph(set.top_left), clip);
        self.fill_impl(right, y, 1, 1, glyph(set.top_right), clip);
        self.fill_impl(x, bottom, 1, 1, glyph(set.bottom_left), clip);
        self.fill_impl(right, bottom, 1, 1, glyph(set.bottom_right), clip);
    }

    /// Copy the `region` of `src` so its top-left lands at `(dest_x, dest_y)`.
    ///
    /// Both ends are clipped to their buffers. A wide pair cut by the edge
    /// of the copied region arrives as a blank in the glyph's style.
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    pub fn copy_region(&mut self, src: &Self, region: ClipRect, dest_x: i32, dest_y: i32) {
        let Some(from) = src.bounds().intersect(region) else {
            return;
        };
        let shift = |dest: i32, clipped: i32, origin: i32| {
            i32::try_from(i64::from(dest) + i64::from(clipped) - i64::from(origin)).ok()
        };
        let (Some(dx), Some(dy)) = (shift(dest_x, from.x, region.x), shift(dest_y, from.y, region.y))
        else {
            return;
        };
        let target = ClipRect::new(dx, dy, from.width, from.height);
        let Some(to) = self.bounds().intersect(target) else {
            return;
        };
        // Offset from destination back into the source.
        let (ox, oy) = (from.x - dx, from.y - dy);

        let (x1, x2) = (to.x as u16, to.right() as u16);
        for row in to.y as u16..to.bottom() as u16 {
            self.break_wide_char_at(x1, row);
            self.break_wide_char_at(x2 - 1, row);
            let sy = (i32::from(row) + oy) as u16;
            for col in x1..x2 {
                let sx = (i32::from(col) + ox) as u16;
                let mut cell = src.cells[src.index(sx, sy)];
                let cut_left = col == x1 && cell.is_continuation();
                let cut_right = col + 1 == x2
                    && sx + 1 < src.width
                    && src.cells[src.index(sx + 1, sy)].is_continuation();
                if cut_left || cut_right {
                    cell = Cell::blank(cell.style);
                }
                let idx = self.index(col, row);
                self.cells[idx] = cell;
            }
        }
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FrameBuffer({}x{})", self.width, self.height)
    }
}

// ─── Text Width ─────────────────────────────────────────────────────────────────

/// Display width of a character in terminal columns.
///
/// 0 for control characters and combining marks, 2 for wide characters.
///
/// ```
/// use tessel_term::buffer::char_width;
///
/// assert_eq!(char_width('a'), 1);
/// assert_eq!(char_width('中'), 2);
/// assert_eq!(char_width('\n'), 0);
/// ```
#[inline]
#[must_use]
pub fn char_width(ch: char) -> usize {
    if ch.is_control() {
        return 0;
    }
    ch.width().unwrap_or(0)
}

/// Width of one grapheme cluster as the buffer stores it (its base
/// character).
#[inline]
#[must_use]
pub fn grapheme_width(grapheme: &str) -> usize {
    grapheme.chars().next().map_or(0, char_width)
}

/// Display width of a string, i.e. the columns [`FrameBuffer::write`] would
/// consume given unlimited room.
///
/// ```
/// use tessel_term::buffer::string_width;
///
/// assert_eq!(string_width("hello"), 5);
/// assert_eq!(string_width("a中b"), 4);
/// assert_eq!(string_width("e\u{301}"), 1);
/// ```
#[must_use]
pub fn string_width(s: &str) -> usize {
    s.graphemes(true).map(grapheme_width).sum()
}

// ─── Tests ──────────────────────────────────────────────────────────────────────
