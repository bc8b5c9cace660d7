// SPDX-License-Identifier: MIT
//
// Frame output: one byte buffer per frame and a writer that knows what the
// terminal already has.
//
//   OutputBuffer collects a whole frame in memory so it reaches the sink
//   as a single `write_all`. The tick path never blocks on partial writes.
//
//   CellWriter remembers where the terminal cursor is and which style is
//   active, so a run of cells costs one cursor move and one SGR sequence per
//   style change. Continuation cells produce no bytes: the terminal already
//   advanced past them when it drew the wide glyph.

use std::io::{self, Write};

use crate::ansi;
use crate::buffer::char_width;
use crate::cell::{Cell, Style};

// ─── OutputBuffer ────────────────────────────────────────────────────────────

const DEFAULT_CAPACITY: usize = 16_384;

/// Bytes for one frame, flushed to the sink in one call.
pub struct OutputBuffer {
    buf: Vec<u8>,
}

impl OutputBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(DEFAULT_CAPACITY),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Append a character as UTF-8.
    #[inline]
    pub fn push_char(&mut self, ch: char) {
        let mut enc = [0u8; 4];
        self.buf.extend_from_slice(ch.encode_utf8(&mut enc).as_bytes());
    }

    /// Drop the contents, keeping the allocation.
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Write everything to `w`, flush it, and clear.
    ///
    /// An empty buffer writes nothing and does not flush.
    ///
    /// # Errors
    ///
    /// Propagates the sink's I/O error. The buffer is cleared either way so
    /// a broken sink can't make frames pile up.
    pub fn flush_to(&mut self, w: &mut (impl Write + ?Sized)) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let result = w.write_all(&self.buf).and_then(|()| w.flush());
        self.buf.clear();
        result
    }
}

impl Write for OutputBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    // Real flushing goes through `flush_to`.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── CellWriter ──────────────────────────────────────────────────────────────

/// Emits cells while tracking terminal cursor and style.
///
/// The tracked style starts unknown; the first cell always gets an absolute
/// SGR. After [`finish`](Self::finish) the terminal is at the baseline style
/// and the writer knows it.
#[derive(Debug, Clone, Copy, Default)]
pub struct CellWriter {
    cursor: Option<(u16, u16)>,
    style: Option<Style>,
}

impl CellWriter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cursor: None,
            style: None,
        }
    }

    /// Forget everything. Use when something else wrote to the terminal.
    pub fn invalidate(&mut self) {
        *self = Self::new();
    }

    /// Forget the cursor position but keep the style (after a screen clear).
    pub fn invalidate_cursor(&mut self) {
        self.cursor = None;
    }

    /// Position the cursor at `(x, y)`, skipping the move if it's already
    /// there.
    ///
    /// Returns `true` if a cursor sequence was written.
    pub fn move_to(&mut self, out: &mut OutputBuffer, x: u16, y: u16) -> bool {
        if self.cursor == Some((x, y)) {
            return false;
        }
        // Writes into a Vec cannot fail.
        let _ = ansi::cursor_to(out, x, y);
        self.cursor = Some((x, y));
        true
    }

    /// Draw one cell at the current cursor position.
    ///
    /// Returns `true` if the cell produced output (continuations don't).
    pub fn put(&mut self, out: &mut OutputBuffer, cell: &Cell) -> bool {
        if cell.is_continuation() {
            return false;
        }
        self.apply_style(out, &cell.style);

        let ch = cell.character().unwrap_or('?');
        out.push_char(ch);
        let advance = u16::try_from(char_width(ch).max(1)).unwrap_or(1);
        if let Some((x, _)) = self.cursor.as_mut() {
            *x = x.saturating_add(advance);
        }
        true
    }

    /// Switch to `style` with the fewest parameters.
    pub fn apply_style(&mut self, out: &mut OutputBuffer, style: &Style) {
        match self.style {
            Some(current) if current == *style => return,
            Some(current) => {
                let _ = ansi::style_delta(out, &current, style);
            }
            None => {
                let _ = ansi::style(out, style);
            }
        }
        self.style = Some(*style);
    }

    /// Return the terminal to the baseline style unless it's already there.
    pub fn finish(&mut self, out: &mut OutputBuffer) {
        if self.style != Some(Style::DEFAULT) {
            let _ = ansi::reset(out);
            self.style = Some(Style::DEFAULT);
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Attr;
    use crate::color::CellColor;
    use pretty_assertions::assert_eq;

    fn text(out: &OutputBuffer) -> String {
        String::from_utf8(out.as_bytes().to_vec()).unwrap()
    }

    // ── OutputBuffer ────────────────────────────────────────────────────

    #[test]
    fn output_buffer_collects_writes() {
        let mut out = OutputBuffer::new();
        assert!(out.is_empty());
        write!(out, "x={}", 4).unwrap();
        out.push_char('中');
        assert_eq!(text(&out), "x=4中");
        assert_eq!(out.len(), 6);
    }

    #[test]
    fn flush_to_moves_bytes_and_clears() {
        let mut out = OutputBuffer::new();
        out.push_char('a');
        let mut sink = Vec::new();
        out.flush_to(&mut sink).unwrap();
        assert_eq!(sink, b"a");
        assert!(out.is_empty());
    }

    #[test]
    fn flush_to_with_empty_buffer_writes_nothing() {
        struct Panicky;
        impl Write for Panicky {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                panic!("unexpected write")
            }
            fn flush(&mut self) -> io::Result<()> {
                panic!("unexpected flush")
            }
        }
        OutputBuffer::new().flush_to(&mut Panicky).unwrap();
    }

    #[test]
    fn flush_to_clears_even_on_error() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::other("gone"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        let mut out = OutputBuffer::new();
        out.push_char('a');
        assert!(out.flush_to(&mut Broken).is_err());
        assert!(out.is_empty());
    }

    // ── CellWriter ──────────────────────────────────────────────────────

    #[test]
    fn first_cell_gets_absolute_style() {
        let mut out = OutputBuffer::new();
        let mut w = CellWriter::new();
        w.move_to(&mut out, 0, 0);
        w.put(&mut out, &Cell::new('a'));
        assert_eq!(text(&out), "\x1b[1;1H\x1b[0ma");
    }

    #[test]
    fn sequential_cells_share_one_move_and_style() {
        let mut out = OutputBuffer::new();
        let mut w = CellWriter::new();
        let style = Style::new().fg(CellColor::Ansi256(2));
        w.move_to(&mut out, 3, 1);
        for ch in ['a', 'b', 'c'] {
            w.put(&mut out, &Cell::styled(ch, style));
        }
        assert!(!w.move_to(&mut out, 6, 1));
        w.finish(&mut out);
        assert_eq!(text(&out), "\x1b[2;4H\x1b[0;32mabc\x1b[0m");
    }

    #[test]
    fn style_change_mid_run_uses_delta() {
        let mut out = OutputBuffer::new();
        let mut w = CellWriter::new();
        let plain = Style::DEFAULT;
        w.move_to(&mut out, 0, 0);
        w.put(&mut out, &Cell::styled('a', plain));
        w.put(&mut out, &Cell::styled('b', plain.attrs(Attr::BOLD)));
        assert_eq!(text(&out), "\x1b[1;1H\x1b[0ma\x1b[1mb");
    }

    #[test]
    fn wide_glyph_advances_two_and_continuation_is_silent() {
        let mut out = OutputBuffer::new();
        let mut w = CellWriter::new();
        w.move_to(&mut out, 0, 0);
        assert!(w.put(&mut out, &Cell::new('你')));
        assert!(!w.put(&mut out, &Cell::continuation(Style::DEFAULT)));
        assert!(!w.move_to(&mut out, 2, 0));
        assert_eq!(text(&out), "\x1b[1;1H\x1b[0m你");
    }

    #[test]
    fn finish_skips_reset_at_baseline() {
        let mut out = OutputBuffer::new();
        let mut w = CellWriter::new();
        w.apply_style(&mut out, &Style::DEFAULT);
        out.clear();
        w.finish(&mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn invalidate_forces_move_and_absolute_style() {
        let mut out = OutputBuffer::new();
        let mut w = CellWriter::new();
        w.move_to(&mut out, 0, 0);
        w.put(&mut out, &Cell::new('a'));
        w.invalidate();
        out.clear();
        assert!(w.move_to(&mut out, 1, 0));
        w.put(&mut out, &Cell::new('b'));
        assert_eq!(text(&out), "\x1b[1;2H\x1b[0mb");
    }
}
