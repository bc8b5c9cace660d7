// SPDX-License-Identifier: MIT
//
// Escape-sequence encoding for the paint protocol.
//
// Stateless writers over any `impl Write`. Deciding *when* to emit is the
// `CellWriter`'s job; this module only knows the bytes.
//
// Coordinates are 0-based in our API and 1-based on the wire.
//
// Styles go out as one combined SGR sequence (`ESC[1;3;38;2;r;g;bm`) rather
// than one sequence per attribute. `style` writes an absolute style starting
// from a reset; `style_delta` writes only the parameters that differ between
// two styles and falls back to the absolute form when an attribute has to be
// switched off.

use std::fmt::Display;
use std::io::{self, Write};

use crate::cell::{Attr, Style, UnderlineStyle};
use crate::color::CellColor;

// ─── Cursor & Screen ─────────────────────────────────────────────────────────

/// CUP: move the cursor to `(x, y)`.
#[inline]
pub fn cursor_to(w: &mut impl Write, x: u16, y: u16) -> io::Result<()> {
    write!(w, "\x1b[{};{}H", u32::from(y) + 1, u32::from(x) + 1)
}

#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

/// ED 2: erase the whole screen.
#[inline]
pub fn clear_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2J")
}

/// SGR 0: back to the baseline style.
#[inline]
pub fn reset(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[0m")
}

// ─── SGR ─────────────────────────────────────────────────────────────────────

/// Semicolon-joined SGR parameter list. Writes `ESC[` lazily on the first
/// parameter so an empty list costs nothing.
struct Sgr<'a, W: Write> {
    w: &'a mut W,
    open: bool,
}

impl<'a, W: Write> Sgr<'a, W> {
    const fn new(w: &'a mut W) -> Self {
        Self { w, open: false }
    }

    fn param(&mut self, p: impl Display) -> io::Result<()> {
        if self.open {
            self.w.write_all(b";")?;
        } else {
            self.w.write_all(b"\x1b[")?;
            self.open = true;
        }
        write!(self.w, "{p}")
    }

    fn fg(&mut self, color: CellColor) -> io::Result<()> {
        match color {
            CellColor::Default => self.param(39),
            CellColor::Ansi256(i @ 0..=7) => self.param(30 + u16::from(i)),
            CellColor::Ansi256(i @ 8..=15) => self.param(82 + u16::from(i)),
            CellColor::Ansi256(i) => self.param(format_args!("38;5;{i}")),
            CellColor::Rgb(r, g, b) => self.param(format_args!("38;2;{r};{g};{b}")),
        }
    }

    fn bg(&mut self, color: CellColor) -> io::Result<()> {
        match color {
            CellColor::Default => self.param(49),
            CellColor::Ansi256(i @ 0..=7) => self.param(40 + u16::from(i)),
            CellColor::Ansi256(i @ 8..=15) => self.param(92 + u16::from(i)),
            CellColor::Ansi256(i) => self.param(format_args!("48;5;{i}")),
            CellColor::Rgb(r, g, b) => self.param(format_args!("48;2;{r};{g};{b}")),
        }
    }

    fn attrs(&mut self, attrs: Attr) -> io::Result<()> {
        const CODES: [(Attr, u8); 7] = [
            (Attr::BOLD, 1),
            (Attr::DIM, 2),
            (Attr::ITALIC, 3),
            (Attr::BLINK, 5),
            (Attr::INVERSE, 7),
            (Attr::HIDDEN, 8),
            (Attr::STRIKETHROUGH, 9),
        ];
        for (flag, code) in CODES {
            if attrs.contains(flag) {
                self.param(code)?;
            }
        }
        Ok(())
    }

    fn underline(&mut self, style: UnderlineStyle) -> io::Result<()> {
        match style {
            UnderlineStyle::None => self.param(24),
            UnderlineStyle::Straight => self.param(4),
            other => self.param(format_args!("4:{}", other as u8)),
        }
    }

    fn finish(self) -> io::Result<()> {
        if self.open {
            self.w.write_all(b"m")?;
        }
        Ok(())
    }
}

/// Write `style` as one absolute SGR sequence, starting from a reset.
///
/// ```
/// use tessel_term::ansi;
/// use tessel_term::cell::{Attr, Style};
/// use tessel_term::color::CellColor;
///
/// let mut out = Vec::new();
/// let s = Style::new().fg(CellColor::Rgb(255, 0, 0)).attrs(Attr::BOLD);
/// ansi::style(&mut out, &s).unwrap();
/// assert_eq!(out, b"\x1b[0;1;38;2;255;0;0m");
/// ```
pub fn style(w: &mut impl Write, style: &Style) -> io::Result<()> {
    let mut sgr = Sgr::new(w);
    sgr.param(0)?;
    sgr.attrs(style.attrs)?;
    if style.underline.is_underlined() {
        sgr.underline(style.underline)?;
    }
    if !style.fg.is_default() {
        sgr.fg(style.fg)?;
    }
    if !style.bg.is_default() {
        sgr.bg(style.bg)?;
    }
    sgr.finish()
}

/// Write the parameters that turn `from` into `to` as one SGR sequence.
///
/// Emits nothing when the styles are equal. Attributes can only be added
/// incrementally, so dropping any attribute emits the absolute form.
pub fn style_delta(w: &mut impl Write, from: &Style, to: &Style) -> io::Result<()> {
    if !to.attrs.contains(from.attrs) {
        return style(w, to);
    }
    let mut sgr = Sgr::new(w);
    sgr.attrs(to.attrs.difference(from.attrs))?;
    if to.underline != from.underline {
        sgr.underline(to.underline)?;
    }
    if to.fg != from.fg {
        sgr.fg(to.fg)?;
    }
    if to.bg != from.bg {
        sgr.bg(to.bg)?;
    }
    sgr.finish()
}

// ─── Synchronized Output ─────────────────────────────────────────────────────

/// DEC 2026: hold the frame until [`end_sync`].
#[inline]
pub fn begin_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026h")
}

#[inline]
pub fn end_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026l")
}

// ─── Terminal Modes ─────────────────────────────────────────────────────────

/// DEC 1049: switch to the alternate screen, saving the primary one.
#[inline]
pub fn enter_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049h")
}

#[inline]
pub fn exit_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049l")
}

/// How much pointer activity the terminal reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseMode {
    /// Presses, releases and wheel (DEC 1000).
    Click,
    /// Also motion while a button is held (DEC 1002).
    #[default]
    Drag,
    /// Also bare motion (DEC 1003).
    Motion,
}

/// Turn on SGR-encoded (DEC 1006) mouse reporting.
pub fn enable_mouse(w: &mut impl Write, mode: MouseMode) -> io::Result<()> {
    let tracking: &[u8] = match mode {
        MouseMode::Click => b"\x1b[?1000h",
        MouseMode::Drag => b"\x1b[?1000h\x1b[?1002h",
        MouseMode::Motion => b"\x1b[?1000h\x1b[?1002h\x1b[?1003h",
    };
    w.write_all(tracking)?;
    w.write_all(b"\x1b[?1006h")
}

/// Turn off every mouse mode [`enable_mouse`] can set.
pub fn disable_mouse(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1006l\x1b[?1003l\x1b[?1002l\x1b[?1000l")
}

/// DEC 2004: wrap pastes in `ESC[200~` … `ESC[201~`.
#[inline]
pub fn enable_bracketed_paste(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2004h")
}

#[inline]
pub fn disable_bracketed_paste(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2004l")
}

/// DEC 1004: report `ESC[I` / `ESC[O` on focus changes.
#[inline]
pub fn enable_focus_reporting(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1004h")
}

#[inline]
pub fn disable_focus_reporting(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1004l")
}

// ─── Tests ───────────────────────────────────────────────────────────────────
