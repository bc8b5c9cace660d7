// SPDX-License-Identifier: MIT
//
// The node contract: what a widget stored in the tree must provide.
//
// Widgets paint through a `Canvas`, a view of the frame clipped to the
// node's bounds (and to every ancestor's), addressed in node-local cells.
// Interaction hooks return whether the event was consumed; the focus and
// mouse plugins call them, the kernel core never does.

use std::any::Any;

use tessel_layout::{Measure, Rect, Size, Tree};
use tessel_term::buffer::{BorderSet, ClipRect, FrameBuffer};
use tessel_term::{Cell, KeyEvent, MouseEvent, Style};

/// The kernel's node tree.
pub type NodeTree = Tree<Box<dyn Widget>>;

// ─── Widget ──────────────────────────────────────────────────────────────────

pub trait Widget: Measure {
    /// Type tag, used in logs and error reports.
    fn kind(&self) -> &'static str;

    /// Paint this node. Called once per frame, parents before children,
    /// and only for visible nodes.
    ///
    /// # Errors
    ///
    /// A failure is reported and the rest of the frame still renders.
    fn render(&self, canvas: &mut Canvas<'_>, style: Style) -> anyhow::Result<()>;

    /// The style this node's children inherit.
    fn inherit(&self, inherited: Style) -> Style {
        inherited
    }

    /// Whether Tab can land here.
    fn focusable(&self) -> bool {
        false
    }

    fn handle_key(&mut self, _key: &KeyEvent) -> bool {
        false
    }

    /// `event.x`/`event.y` are relative to this node's top-left corner.
    fn handle_mouse(&mut self, _event: &MouseEvent) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl Measure for Box<dyn Widget> {
    fn measure(&self, available: Size) -> Size {
        (**self).measure(available)
    }
}

impl dyn Widget {
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    #[must_use]
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }
}

// ─── Canvas ──────────────────────────────────────────────────────────────────

/// One node's drawing surface.
pub struct Canvas<'a> {
    buf: &'a mut FrameBuffer,
    bounds: Rect,
    clip: ClipRect,
    focused: bool,
}

impl<'a> Canvas<'a> {
    /// A canvas over `bounds`, further restricted to `clip`.
    #[must_use]
    pub fn new(buf: &'a mut FrameBuffer, bounds: Rect, clip: ClipRect) -> Self {
        let own = ClipRect::from_unsigned(bounds.x, bounds.y, bounds.width, bounds.height);
        let clip = own.intersect(clip).unwrap_or(ClipRect::new(own.x, own.y, 0, 0));
        Self {
            buf,
            bounds,
            clip,
            focused: false,
        }
    }

    #[must_use]
    pub const fn with_focus(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    #[inline]
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.bounds.width
    }

    #[inline]
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.bounds.height
    }

    /// Screen rectangle of the node.
    #[inline]
    #[must_use]
    pub const fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Screen area actually paintable.
    #[inline]
    #[must_use]
    pub const fn clip(&self) -> ClipRect {
        self.clip
    }

    /// Whether this node holds keyboard focus.
    #[inline]
    #[must_use]
    pub const fn is_focused(&self) -> bool {
        self.focused
    }

    fn origin(&self, x: i32, y: i32) -> (i32, i32) {
        (
            i32::from(self.bounds.x).saturating_add(x),
            i32::from(self.bounds.y).saturating_add(y),
        )
    }

    /// Write text at local `(x, y)`. Returns the columns written.
    pub fn write(&mut self, x: i32, y: i32, text: &str, style: Style) -> u16 {
        let (sx, sy) = self.origin(x, y);
        self.buf.write_clipped(sx, sy, text, style, &self.clip)
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32, cell: Cell) {
        let (sx, sy) = self.origin(x, y);
        self.buf.fill_clipped(sx, sy, width, height, cell, &self.clip);
    }

    /// Paint the whole node with blanks in `style`.
    pub fn fill(&mut self, style: Style) {
        let (w, h) = (i32::from(self.bounds.width), i32::from(self.bounds.height));
        self.fill_rect(0, 0, w, h, Cell::blank(style));
    }

    /// A box around the node's edge.
    pub fn draw_border(&mut self, set: &BorderSet, style: Style) {
        let (w, h) = (i32::from(self.bounds.width), i32::from(self.bounds.height));
        let (sx, sy) = self.origin(0, 0);
        self.buf.draw_rect_clipped(sx, sy, w, h, set, style, &self.clip);
    }

    /// The cell at local `(x, y)`, if it is on screen.
    #[must_use]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        let sx = self.bounds.x.checked_add(x)?;
        let sy = self.bounds.y.checked_add(y)?;
        self.buf.get(sx, sy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn writes_are_local_and_clipped() {
        let mut buf = FrameBuffer::new(20, 4).unwrap();
        let bounds = Rect::new(5, 1, 4, 2);
        let mut canvas = Canvas::new(&mut buf, bounds, buf_clip(20, 4));
        assert_eq!(canvas.write(0, 0, "abcdefgh", Style::default()), 4);
        canvas.write(-2, 1, "xyz", Style::default());
        assert_eq!(buf.row_text(1).trim_end(), "     abcd");
        assert_eq!(buf.row_text(2).trim_end(), "     z");
        assert_eq!(buf.row_text(0).trim_end(), "");
    }

    #[test]
    fn ancestor_clip_applies() {
        let mut buf = FrameBuffer::new(10, 1).unwrap();
        let mut canvas = Canvas::new(&mut buf, Rect::new(0, 0, 10, 1), ClipRect::new(0, 0, 3, 1));
        canvas.write(0, 0, "hello", Style::default());
        assert_eq!(buf.row_text(0).trim_end(), "hel");
    }

    #[test]
    fn disjoint_clip_paints_nothing() {
        let mut buf = FrameBuffer::new(10, 2).unwrap();
        let mut canvas = Canvas::new(&mut buf, Rect::new(0, 0, 3, 1), ClipRect::new(5, 1, 3, 1));
        canvas.fill(Style::default());
        canvas.write(0, 0, "hi", Style::default());
        assert!(buf.cells().iter().all(|c| c.is_empty()));
    }

    #[test]
    fn extreme_local_offsets_clip_away() {
        let mut buf = FrameBuffer::new(10, 3).unwrap();
        let mut canvas = Canvas::new(&mut buf, Rect::new(5, 1, 4, 2), buf_clip(10, 3));
        canvas.write(i32::MAX, i32::MAX, "far", Style::default());
        canvas.fill_rect(i32::MAX - 2, 0, 10, 1, Cell::new('#'));
        canvas.fill_rect(i32::MIN, i32::MIN, i32::MAX, i32::MAX, Cell::new('#'));
        assert_eq!(canvas.write(i32::MIN, 0, "x", Style::default()), 1);
        assert!(buf.cells().iter().all(|c| c.is_empty()));
    }

    #[test]
    fn border_hugs_the_edge() {
        let mut buf = FrameBuffer::new(6, 3).unwrap();
        let mut canvas = Canvas::new(&mut buf, Rect::new(1, 0, 4, 3), buf_clip(6, 3));
        canvas.draw_border(&BorderSet::PLAIN, Style::default());
        assert_eq!(canvas.get(0, 0).and_then(|c| c.character()), Some('┌'));
        assert_eq!(buf.row_text(0), " ┌──┐ ");
        assert_eq!(buf.row_text(1), " │  │ ");
        assert_eq!(buf.row_text(2), " └──┘ ");
    }

    fn buf_clip(w: u16, h: u16) -> ClipRect {
        ClipRect::new(0, 0, w, h)
    }
}
