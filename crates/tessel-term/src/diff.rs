// SPDX-License-Identifier: MIT
//
// The differential renderer turns "terminal shows A, should show B" into the
// shortest byte sequence we know how to produce.
//
// The caller owns both frames. Each tick paints into `current`, asks us to
// diff it against `previous`, flushes our output, and swaps the two.
//
// Per row:
//
//   1. Equal slices are skipped outright. An untouched row costs one memcmp.
//   2. Otherwise scan for runs: a run starts at the first differing cell and
//      continues while cells keep differing.
//   3. Runs never split a wide pair. A run starting on a continuation cell
//      backs up to its glyph; a run ending on a wide glyph takes the
//      continuation along.
//   4. Each run costs one CUP, one SGR per style change, and the literal
//      characters. Continuations emit nothing.
//
// A non-empty frame leaves the terminal at the baseline style and, when
// enabled, sits between synchronized-output markers. A frame with no
// changes emits zero bytes.

use std::io::{self, Write};

use crate::ansi;
use crate::buffer::FrameBuffer;
use crate::cell::{Cell, Style};
use crate::output::{CellWriter, OutputBuffer};

// ─── Errors & Stats ──────────────────────────────────────────────────────────

/// Renderer misuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// The two frames don't have the same size. Resize both before diffing.
    #[error("frame size mismatch: previous is {previous:?}, current is {current:?}")]
    DimensionMismatch {
        previous: (u16, u16),
        current: (u16, u16),
    },
}

/// What one render pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    /// Cells covered by a changed run.
    pub cells_rendered: usize,
    /// Cells left alone.
    pub cells_skipped: usize,
    /// Changed runs (each one cursor move).
    pub runs: usize,
    /// Bytes of escape output produced.
    pub bytes_written: usize,
}

impl RenderStats {
    #[inline]
    #[must_use]
    pub const fn total_cells(&self) -> usize {
        self.cells_rendered + self.cells_skipped
    }
}

// ─── DiffRenderer ────────────────────────────────────────────────────────────

/// Frame-to-frame differ with a reusable output buffer.
///
/// ```
/// use tessel_term::buffer::FrameBuffer;
/// use tessel_term::cell::Style;
/// use tessel_term::diff::DiffRenderer;
///
/// let previous = FrameBuffer::new(20, 2).unwrap();
/// let mut current = previous.clone();
/// let mut renderer = DiffRenderer::new().with_synchronized_output(false);
///
/// // First frame paints everything.
/// let stats = renderer.render(&previous, &current).unwrap();
/// assert_eq!(stats.cells_rendered, 40);
/// renderer.flush_to(&mut std::io::sink()).unwrap();
///
/// // Later frames paint only what changed.
/// current.write(3, 1, "hi", Style::default());
/// let stats = renderer.render(&previous, &current).unwrap();
/// assert_eq!((stats.runs, stats.cells_rendered), (1, 2));
/// assert_eq!(renderer.output_bytes(), b"\x1b[2;4Hhi");
/// ```
pub struct DiffRenderer {
    output: OutputBuffer,
    writer: CellWriter,
    full_redraw: bool,
    synchronized: bool,
}

impl DiffRenderer {
    /// A renderer whose first frame is a full redraw, with synchronized
    /// output on.
    #[must_use]
    pub fn new() -> Self {
        Self {
            output: OutputBuffer::new(),
            writer: CellWriter::new(),
            full_redraw: true,
            synchronized: true,
        }
    }

    /// Enable or disable DEC 2026 frame markers.
    #[must_use]
    pub const fn with_synchronized_output(mut self, on: bool) -> Self {
        self.synchronized = on;
        self
    }

    /// Make the next frame a full redraw (screen clear, every cell painted).
    pub const fn force_redraw(&mut self) {
        self.full_redraw = true;
    }

    /// Whether the next frame will be a full redraw.
    #[inline]
    #[must_use]
    pub const fn needs_full_redraw(&self) -> bool {
        self.full_redraw
    }

    /// Encode the changes from `previous` to `current` into the output
    /// buffer, replacing whatever it held.
    ///
    /// # Errors
    ///
    /// [`RenderError::DimensionMismatch`] if the frames differ in size.
    /// Nothing is emitted and the pending full redraw, if any, stays pending.
    pub fn render(
        &mut self,
        previous: &FrameBuffer,
        current: &FrameBuffer,
    ) -> Result<RenderStats, RenderError> {
        let (w, h) = (current.width(), current.height());
        if (previous.width(), previous.height()) != (w, h) {
            return Err(RenderError::DimensionMismatch {
                previous: (previous.width(), previous.height()),
                current: (w, h),
            });
        }

        self.output.clear();
        self.writer.invalidate_cursor();
        let mut stats = RenderStats::default();
        let full = std::mem::take(&mut self.full_redraw);
        let mut started = false;

        if full {
            self.begin_frame(&mut started);
            // Known baseline before the clear, so it fills with the default
            // background.
            self.writer.invalidate();
            self.writer.apply_style(&mut self.output, &Style::DEFAULT);
            let _ = ansi::clear_screen(&mut self.output);
        }

        for y in 0..h {
            let (Some(prev), Some(curr)) = (previous.row(y), current.row(y)) else {
                continue;
            };
            if full {
                self.emit_run(y, curr, 0, curr.len(), &mut stats, &mut started);
                continue;
            }
            if prev == curr {
                stats.cells_skipped += curr.len();
                continue;
            }

            let mut x = 0;
            while x < curr.len() {
                if prev[x] == curr[x] {
                    stats.cells_skipped += 1;
                    x += 1;
                    continue;
                }
                let mut start = x;
                if curr[start].is_continuation() && start > 0 {
                    start -= 1;
                    // That glyph cell matched and was counted as skipped.
                    stats.cells_skipped -= 1;
                }
                let mut end = x + 1;
                while end < curr.len() && prev[end] != curr[end] {
                    end += 1;
                }
                if end < curr.len() && curr[end].is_continuation() {
                    end += 1;
                }
                self.emit_run(y, curr, start, end, &mut stats, &mut started);
                x = end;
            }
        }

        if started {
            self.writer.finish(&mut self.output);
            if self.synchronized {
                let _ = ansi::end_sync(&mut self.output);
            }
        }
        stats.bytes_written = self.output.len();
        Ok(stats)
    }

    fn begin_frame(&mut self, started: &mut bool) {
        if !*started {
            *started = true;
            if self.synchronized {
                let _ = ansi::begin_sync(&mut self.output);
            }
        }
    }

    /// Emit `row[start..end]`.
    #[allow(clippy::cast_possible_truncation)] // Row indices fit in u16.
    fn emit_run(
        &mut self,
        y: u16,
        row: &[Cell],
        start: usize,
        end: usize,
        stats: &mut RenderStats,
        started: &mut bool,
    ) {
        self.begin_frame(started);
        self.writer.move_to(&mut self.output, start as u16, y);
        for cell in &row[start..end] {
            self.writer.put(&mut self.output, cell);
        }
        stats.runs += 1;
        stats.cells_rendered += end - start;
    }

    /// Bytes from the last [`render`](Self::render).
    #[must_use]
    pub fn output_bytes(&self) -> &[u8] {
        self.output.as_bytes()
    }

    /// Write the pending output to `w` in one call and clear it.
    ///
    /// # Errors
    ///
    /// Propagates the sink's I/O error.
    pub fn flush_to(&mut self, w: &mut (impl Write + ?Sized)) -> io::Result<()> {
        self.output.flush_to(w)
    }
}

impl Default for DiffRenderer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::char_width;
    use crate::cell::{Attr, UnderlineStyle};
    use crate::color::CellColor;
    use pretty_assertions::assert_eq;

    fn frame(w: u16, h: u16) -> FrameBuffer {
        FrameBuffer::new(w, h).unwrap()
    }

    fn plain() -> DiffRenderer {
        DiffRenderer::new().with_synchronized_output(false)
    }

    /// A renderer that has already drawn its first frame.
    fn primed(prev: &FrameBuffer) -> DiffRenderer {
        let mut r = plain();
        r.render(prev, prev).unwrap();
        r
    }

    fn render(r: &mut DiffRenderer, prev: &FrameBuffer, curr: &FrameBuffer) -> (RenderStats, String) {
        let stats = r.render(prev, curr).unwrap();
        (stats, String::from_utf8(r.output_bytes().to_vec()).unwrap())
    }

    // ── Virtual screen ──────────────────────────────────────────────────

    /// Model terminal: interprets the CUP/SGR/ED subset the renderer emits.
    struct Screen {
        width: u16,
        cells: Vec<Cell>,
        x: u16,
        y: u16,
        style: Style,
    }

    impl Screen {
        fn showing(buf: &FrameBuffer) -> Self {
            Self {
                width: buf.width(),
                cells: buf.cells().to_vec(),
                x: 0,
                y: 0,
                style: Style::DEFAULT,
            }
        }

        fn apply(&mut self, bytes: &[u8]) {
            let text = std::str::from_utf8(bytes).unwrap();
            let mut chars = text.chars();
            while let Some(ch) = chars.next() {
                if ch != '\x1b' {
                    self.print(ch);
                    continue;
                }
                assert_eq!(chars.next(), Some('['));
                let mut params = String::new();
                let fin = loop {
                    let c = chars.next().unwrap();
                    if ('\x40'..='\x7e').contains(&c) {
                        break c;
                    }
                    params.push(c);
                };
                self.csi(&params, fin);
            }
        }

        fn csi(&mut self, params: &str, fin: char) {
            if params.starts_with('?') {
                return;
            }
            match fin {
                'H' => {
                    let (row, col) = params.split_once(';').unwrap();
                    self.y = row.parse::<u16>().unwrap() - 1;
                    self.x = col.parse::<u16>().unwrap() - 1;
                }
                'J' => {
                    assert_eq!(params, "2");
                    self.cells.fill(Cell::blank(self.style));
                }
                'm' => self.sgr(params),
                other => panic!("unexpected CSI final {other:?}"),
            }
        }

        fn sgr(&mut self, params: &str) {
            let parts: Vec<&str> = params.split(';').collect();
            let num = |i: usize| parts[i].parse::<u8>().unwrap();
            let mut i = 0;
            while i < parts.len() {
                let s = &mut self.style;
                match parts[i] {
                    "" | "0" => *s = Style::DEFAULT,
                    "1" => s.attrs |= Attr::BOLD,
                    "2" => s.attrs |= Attr::DIM,
                    "3" => s.attrs |= Attr::ITALIC,
                    "5" => s.attrs |= Attr::BLINK,
                    "7" => s.attrs |= Attr::INVERSE,
                    "8" => s.attrs |= Attr::HIDDEN,
                    "9" => s.attrs |= Attr::STRIKETHROUGH,
                    "4" => s.underline = UnderlineStyle::Straight,
                    "4:2" => s.underline = UnderlineStyle::Double,
                    "4:3" => s.underline = UnderlineStyle::Curly,
                    "4:4" => s.underline = UnderlineStyle::Dotted,
                    "4:5" => s.underline = UnderlineStyle::Dashed,
                    "24" => s.underline = UnderlineStyle::None,
                    "39" => s.fg = CellColor::Default,
                    "49" => s.bg = CellColor::Default,
                    target @ ("38" | "48") => {
                        let color = if parts[i + 1] == "2" {
                            let c = CellColor::Rgb(num(i + 2), num(i + 3), num(i + 4));
                            i += 4;
                            c
                        } else {
                            let c = CellColor::Ansi256(num(i + 2));
                            i += 2;
                            c
                        };
                        if target == "38" {
                            s.fg = color;
                        } else {
                            s.bg = color;
                        }
                    }
                    code => match code.parse::<u8>().unwrap() {
                        v @ 30..=37 => s.fg = CellColor::Ansi256(v - 30),
                        v @ 90..=97 => s.fg = CellColor::Ansi256(v - 82),
                        v @ 40..=47 => s.bg = CellColor::Ansi256(v - 40),
                        v @ 100..=107 => s.bg = CellColor::Ansi256(v - 92),
                        v => panic!("unexpected SGR {v}"),
                    },
                }
                i += 1;
            }
        }

        fn print(&mut self, ch: char) {
            let w = char_width(ch);
            assert!(w > 0, "zero-width char {ch:?} on the wire");
            let idx = usize::from(self.y) * usize::from(self.width) + usize::from(self.x);
            assert!(self.x < self.width && idx < self.cells.len(), "print outside screen");
            self.cells[idx] = Cell::styled(ch, self.style);
            if w == 2 {
                assert!(self.x + 1 < self.width, "wide glyph cut by screen edge");
                self.cells[idx + 1] = Cell::continuation(self.style);
            }
            self.x += u16::try_from(w).unwrap();
        }
    }

    /// Render `prev` → `curr` and check the model terminal ends up at `curr`.
    fn assert_converges(prev: &FrameBuffer, curr: &FrameBuffer) {
        let mut r = primed(prev);
        r.render(prev, curr).unwrap();
        let mut screen = Screen::showing(prev);
        screen.apply(r.output_bytes());
        assert_eq!(screen.cells, curr.cells());
    }

    /// xorshift32 so the randomized cases are reproducible.
    struct Rng(u32);

    impl Rng {
        fn below(&mut self, n: u32) -> u32 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 17;
            self.0 ^= self.0 << 5;
            self.0 % n
        }
    }

    fn scribble(rng: &mut Rng, buf: &mut FrameBuffer) {
        const TEXT: [&str; 6] = ["ab", "你好", "x", "界a", "   ", "e\u{301}!"];
        let styles = [
            Style::DEFAULT,
            Style::new().fg(CellColor::Rgb(200, 10, 10)),
            Style::new().bg(CellColor::Ansi256(4)).attrs(Attr::BOLD),
            Style::new()
                .attrs(Attr::ITALIC | Attr::DIM)
                .underline(UnderlineStyle::Dotted),
        ];
        for _ in 0..rng.below(8) {
            let x = i32::try_from(rng.below(u32::from(buf.width()) + 2)).unwrap() - 1;
            let y = i32::try_from(rng.below(u32::from(buf.height()))).unwrap();
            let text = TEXT[rng.below(6) as usize];
            let style = styles[rng.below(4) as usize];
            buf.write(x, y, text, style);
        }
    }

    // ── First frame ─────────────────────────────────────────────────────

    #[test]
    fn first_frame_paints_every_cell() {
        let f = frame(10, 5);
        let mut r = plain();
        let (stats, out) = render(&mut r, &f, &f);
        assert_eq!(stats.cells_rendered, 50);
        assert_eq!(stats.cells_skipped, 0);
        assert_eq!(stats.runs, 5);
        assert!(out.starts_with("\x1b[0m\x1b[2J\x1b[1;1H"));
    }

    #[test]
    fn first_frame_has_sync_markers_when_enabled() {
        let f = frame(4, 1);
        let mut r = DiffRenderer::new();
        let (_, out) = render(&mut r, &f, &f);
        assert!(out.starts_with("\x1b[?2026h"));
        assert!(out.ends_with("\x1b[?2026l"));
    }

    #[test]
    fn first_frame_converges_from_garbage() {
        let mut garbage = frame(6, 2);
        garbage.write(0, 0, "#####", Style::new().attrs(Attr::BOLD));
        let mut want = frame(6, 2);
        want.write(1, 1, "你ok", Style::new().fg(CellColor::Ansi256(3)));

        let mut r = plain();
        r.render(&want, &want).unwrap();
        let mut screen = Screen::showing(&garbage);
        screen.apply(r.output_bytes());
        assert_eq!(screen.cells, want.cells());
    }

    // ── Unchanged frames ────────────────────────────────────────────────

    #[test]
    fn identical_frames_emit_nothing() {
        let f = frame(10, 5);
        let mut r = primed(&f);
        let (stats, out) = render(&mut r, &f, &f);
        assert_eq!(out, "");
        assert_eq!(stats.bytes_written, 0);
        assert_eq!(stats.cells_skipped, 50);
        assert_eq!(stats.runs, 0);
    }

    #[test]
    fn identical_frames_emit_nothing_even_with_sync() {
        let f = frame(10, 5);
        let mut r = DiffRenderer::new();
        r.render(&f, &f).unwrap();
        let (_, out) = render(&mut r, &f, &f);
        assert_eq!(out, "");
    }

    // ── Runs ────────────────────────────────────────────────────────────

    #[test]
    fn single_change_is_one_run() {
        let prev = frame(10, 5);
        let mut curr = prev.clone();
        curr.set(7, 4, Cell::new('Z'));
        let mut r = primed(&prev);
        let (stats, out) = render(&mut r, &prev, &curr);
        assert_eq!(out, "\x1b[5;8HZ");
        assert_eq!(
            (stats.runs, stats.cells_rendered, stats.cells_skipped),
            (1, 1, 49)
        );
    }

    #[test]
    fn separated_changes_are_separate_runs() {
        let prev = frame(10, 1);
        let mut curr = prev.clone();
        curr.write(1, 0, "ab", Style::DEFAULT);
        curr.write(6, 0, "c", Style::DEFAULT);
        let mut r = primed(&prev);
        let (stats, out) = render(&mut r, &prev, &curr);
        assert_eq!(stats.runs, 2);
        assert_eq!(out, "\x1b[1;2Hab\x1b[1;7Hc");
    }

    #[test]
    fn style_is_coalesced_across_a_run() {
        let prev = frame(10, 1);
        let mut curr = prev.clone();
        curr.write(0, 0, "rrr", Style::new().fg(CellColor::Rgb(255, 0, 0)));
        curr.write(3, 0, "d", Style::DEFAULT);
        let mut r = primed(&prev);
        let (_, out) = render(&mut r, &prev, &curr);
        assert_eq!(out, "\x1b[1;1H\x1b[38;2;255;0;0mrrr\x1b[39md");
    }

    #[test]
    fn dropping_an_attr_resets_mid_run() {
        let prev = frame(4, 1);
        let mut curr = prev.clone();
        curr.write(0, 0, "b", Style::new().attrs(Attr::BOLD));
        curr.write(1, 0, "p", Style::DEFAULT);
        let mut r = primed(&prev);
        let (_, out) = render(&mut r, &prev, &curr);
        assert_eq!(out, "\x1b[1;1H\x1b[1mb\x1b[0mp");
    }

    #[test]
    fn styled_frame_ends_with_reset() {
        let prev = frame(4, 1);
        let mut curr = prev.clone();
        curr.write(0, 0, "b", Style::new().attrs(Attr::BOLD));
        let mut r = primed(&prev);
        let (_, out) = render(&mut r, &prev, &curr);
        assert_eq!(out, "\x1b[1;1H\x1b[1mb\x1b[0m");
    }

    // ── Wide characters ─────────────────────────────────────────────────

    #[test]
    fn restyled_wide_glyph_rewrites_both_halves() {
        let mut prev = frame(6, 1);
        prev.write(2, 0, "你", Style::DEFAULT);
        let mut curr = prev.clone();
        curr.write(2, 0, "你", Style::new().attrs(Attr::BOLD));
        let mut r = primed(&prev);
        let (stats, out) = render(&mut r, &prev, &curr);
        assert_eq!(stats.cells_rendered, 2);
        assert_eq!(out, "\x1b[1;3H\x1b[1m你\x1b[0m");
    }

    #[test]
    fn wide_glyph_over_narrow_cells() {
        let mut prev = frame(6, 1);
        prev.write(0, 0, "abcdef", Style::DEFAULT);
        let mut curr = prev.clone();
        curr.write(2, 0, "你", Style::DEFAULT);
        assert_converges(&prev, &curr);
    }

    #[test]
    fn narrow_over_wide_glyph_halves() {
        let mut prev = frame(6, 1);
        prev.write(0, 0, "你好世", Style::DEFAULT);
        let mut curr = prev.clone();
        curr.write(1, 0, "x", Style::DEFAULT);
        curr.write(4, 0, "y", Style::DEFAULT);
        assert_converges(&prev, &curr);
    }

    // ── Property: output reproduces the target frame ────────────────────

    #[test]
    fn random_frames_converge() {
        let mut rng = Rng(0x9E37_79B9);
        for _ in 0..300 {
            let w = 1 + u16::try_from(rng.below(12)).unwrap();
            let h = 1 + u16::try_from(rng.below(4)).unwrap();
            let mut prev = frame(w, h);
            scribble(&mut rng, &mut prev);
            let mut curr = prev.clone();
            scribble(&mut rng, &mut curr);
            assert_converges(&prev, &curr);
        }
    }

    #[test]
    fn equal_random_frames_emit_nothing() {
        let mut rng = Rng(7);
        for _ in 0..50 {
            let mut f = frame(10, 3);
            scribble(&mut rng, &mut f);
            let mut r = primed(&f);
            let (stats, _) = render(&mut r, &f, &f.clone());
            assert_eq!(stats.bytes_written, 0);
        }
    }

    // ── Errors and redraws ──────────────────────────────────────────────

    #[test]
    fn dimension_mismatch_is_an_error() {
        let mut r = plain();
        let err = r.render(&frame(10, 5), &frame(20, 5)).unwrap_err();
        assert_eq!(
            err,
            RenderError::DimensionMismatch {
                previous: (10, 5),
                current: (20, 5)
            }
        );
        assert!(r.needs_full_redraw());
        assert!(r.output_bytes().is_empty());
    }

    #[test]
    fn force_redraw_repaints_everything() {
        let f = frame(10, 5);
        let mut r = primed(&f);
        assert!(!r.needs_full_redraw());
        r.force_redraw();
        let (stats, out) = render(&mut r, &f, &f);
        assert_eq!(stats.cells_rendered, 50);
        assert!(out.contains("\x1b[2J"));
        assert!(!r.needs_full_redraw());
    }

    #[test]
    fn flush_moves_output_to_sink() {
        let prev = frame(3, 1);
        let mut curr = prev.clone();
        curr.write(0, 0, "q", Style::DEFAULT);
        let mut r = primed(&prev);
        r.render(&prev, &curr).unwrap();
        let mut sink = Vec::new();
        r.flush_to(&mut sink).unwrap();
        assert_eq!(sink, b"\x1b[1;1Hq");
        assert!(r.output_bytes().is_empty());
    }
}
