// SPDX-License-Identifier: MIT
//
// Input decoder: raw terminal bytes in, structured events out.
//
// Covers the protocols the terminal module switches on:
//
// - CSI key sequences (arrows, editing keys, F1-F20, xterm modifiers)
// - SS3 and the rxvt / linux-console variants of the same keys
// - SGR mouse reporting (press, release, drag, move, four wheel directions)
// - Bracketed paste, delivered as one event
// - Focus reporting
// - Alt+key as ESC-prefixed bytes, and UTF-8 text
//
// A sequence may arrive split across reads, so the decoder keeps the bytes
// it could not resolve yet. Pending bytes are bounded: once a partial
// sequence grows past MAX_LOOKAHEAD it is given up on and its bytes are
// reported as plain keys. Unknown or malformed sequences get the same
// treatment. Decoding never fails and never drops keystrokes.
//
// An open bracketed paste is bounded too. Once more than MAX_PASTE_CHUNK
// bytes of its text are held they go out as a partial paste, and a paste
// whose closing delimiter never arrives is closed by the second idle flush
// with no bytes between.

use std::fmt;

use bitflags::bitflags;

// ─── Event Types ─────────────────────────────────────────────────────────────

/// A decoded input event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Key(KeyEvent),
    Mouse(MouseEvent),
    /// Text between bracketed-paste delimiters, as one unit.
    Paste(String),
    /// `CSI I`.
    FocusGained,
    /// `CSI O`.
    FocusLost,
}

/// A key press with its modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    #[inline]
    #[must_use]
    pub const fn new(code: KeyCode, modifiers: Modifiers) -> Self {
        Self { code, modifiers }
    }

    /// A key with no modifiers held.
    #[inline]
    #[must_use]
    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, Modifiers::empty())
    }

    /// Whether this is Ctrl plus the given (lowercase) letter.
    #[inline]
    #[must_use]
    pub fn is_ctrl(&self, ch: char) -> bool {
        self.code == KeyCode::Char(ch) && self.modifiers.contains(Modifiers::CTRL)
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, name) in [
            (Modifiers::CTRL, "Ctrl"),
            (Modifiers::ALT, "Alt"),
            (Modifiers::SHIFT, "Shift"),
            (Modifiers::SUPER, "Super"),
            (Modifiers::HYPER, "Hyper"),
            (Modifiers::META, "Meta"),
        ] {
            if self.modifiers.contains(flag) {
                write!(f, "{name}+")?;
            }
        }
        write!(f, "{}", self.code)
    }
}

/// Which key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Char(char),
    Enter,
    Tab,
    Backspace,
    Escape,
    Delete,
    Insert,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    /// F1 through F20.
    F(u8),
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Char(' ') => f.write_str("Space"),
            Self::Char(c) => write!(f, "{c}"),
            Self::F(n) => write!(f, "F{n}"),
            other => write!(f, "{other:?}"),
        }
    }
}

bitflags! {
    /// Modifier keys.
    ///
    /// The bit layout is xterm's: a CSI modifier parameter is `1 + bits`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0000_0001;
        const ALT   = 0b0000_0010;
        const CTRL  = 0b0000_0100;
        const SUPER = 0b0000_1000;
        const HYPER = 0b0001_0000;
        const META  = 0b0010_0000;
    }
}

/// A mouse report in 0-based screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    pub action: MouseAction,
    /// The button involved. `None` for wheel events and bare motion.
    pub button: Option<MouseButton>,
    pub x: u16,
    pub y: u16,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseAction {
    Press,
    Release,
    /// Pointer motion. Carries a button while dragging.
    Move,
    ScrollUp,
    ScrollDown,
    ScrollLeft,
    ScrollRight,
}

impl MouseAction {
    #[inline]
    #[must_use]
    pub const fn is_scroll(self) -> bool {
        matches!(
            self,
            Self::ScrollUp | Self::ScrollDown | Self::ScrollLeft | Self::ScrollRight
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

// ─── Decoder ─────────────────────────────────────────────────────────────────

/// Longest partial sequence kept while waiting for more bytes.
pub const MAX_LOOKAHEAD: usize = 32;

/// Largest paste text held before it is emitted as a partial paste.
pub const MAX_PASTE_CHUNK: usize = 64 * 1024;

const ESC: u8 = 0x1B;
const PASTE_END: &[u8] = b"\x1b[201~";

/// Stateful byte-to-event decoder.
///
/// Feed it whatever the terminal sends, in arrival order. Bytes that could
/// still be the start of a longer sequence are held until the next
/// [`feed`](Self::feed). A lone ESC is ambiguous (Escape key or the start
/// of a sequence) and stays pending until the caller decides no more bytes
/// are coming and calls [`flush`](Self::flush).
///
/// ```
/// use tessel_term::input::{Event, InputDecoder, KeyCode, KeyEvent};
///
/// let mut decoder = InputDecoder::new();
/// assert!(decoder.feed(b"\x1b[").is_empty());
/// let events = decoder.feed(b"A");
/// assert_eq!(events, vec![Event::Key(KeyEvent::plain(KeyCode::Up))]);
/// ```
#[derive(Debug, Default)]
pub struct InputDecoder {
    buf: Vec<u8>,
    in_paste: bool,
    /// Text of the open paste, not yet emitted.
    paste: Vec<u8>,
    /// An idle flush saw the open paste and no bytes have arrived since.
    paste_idle: bool,
}

impl InputDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(64),
            in_paste: false,
            paste: Vec::new(),
            paste_idle: false,
        }
    }

    /// Decode `data` together with anything left over from earlier calls.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Event> {
        if !data.is_empty() {
            self.paste_idle = false;
        }
        self.buf.extend_from_slice(data);
        let mut events = Vec::new();
        let mut pos = 0;

        loop {
            if self.in_paste {
                // Only the new bytes, plus enough of the old tail to catch a
                // split delimiter, need searching.
                let start = self.paste.len().saturating_sub(PASTE_END.len() - 1);
                self.paste.extend_from_slice(&self.buf[pos..]);
                self.buf.clear();
                pos = 0;

                if let Some(end) = find_subsequence(&self.paste[start..], PASTE_END) {
                    let end = start + end;
                    self.buf = self.paste.split_off(end + PASTE_END.len());
                    self.paste.truncate(end);
                    events.push(self.close_paste());
                    continue;
                }
                if let Some(chunk) = self.take_paste_chunk() {
                    events.push(chunk);
                }
                break;
            }

            if pos >= self.buf.len() {
                break;
            }

            match decode(&self.buf[pos..]) {
                Decoded::Event(event, n) => {
                    events.push(event);
                    pos += n;
                }
                Decoded::Literal(n) => {
                    events.extend(self.buf[pos..pos + n].iter().map(|&b| literal_key(b)));
                    pos += n;
                }
                Decoded::PasteStart(n) => {
                    self.in_paste = true;
                    pos += n;
                }
                Decoded::Ignore(n) => pos += n,
                Decoded::Incomplete => {
                    if self.buf.len() - pos < MAX_LOOKAHEAD {
                        break;
                    }
                    // Give up on the sequence; its first byte is a key and
                    // the rest is decoded afresh.
                    events.push(literal_key(self.buf[pos]));
                    pos += 1;
                }
            }
        }

        self.buf.drain(..pos);
        events
    }

    /// Whether [`flush`](Self::flush) would produce events.
    ///
    /// An open bracketed paste is not pending until one idle flush has
    /// passed with no bytes arriving.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        if self.in_paste {
            self.paste_idle
        } else {
            !self.buf.is_empty()
        }
    }

    /// Resolve pending bytes as keys.
    ///
    /// A lone ESC becomes Escape, ESC plus one printable byte becomes
    /// Alt+that key, and anything else maps byte by byte.
    ///
    /// An open paste survives the first flush. A second flush with no
    /// bytes in between gives up on the closing delimiter and emits the
    /// text so far, so later input decodes normally.
    pub fn flush(&mut self) -> Vec<Event> {
        if self.in_paste && !self.paste_idle {
            self.paste_idle = true;
            return Vec::new();
        }
        if self.in_paste {
            return vec![self.close_paste()];
        }
        if !self.has_pending() {
            return Vec::new();
        }
        let pending = std::mem::take(&mut self.buf);
        match pending.as_slice() {
            [ESC, b @ 0x20..=0x7E] => vec![key(KeyCode::Char(char::from(*b)), Modifiers::ALT)],
            bytes => bytes.iter().map(|&b| literal_key(b)).collect(),
        }
    }

    fn close_paste(&mut self) -> Event {
        self.in_paste = false;
        self.paste_idle = false;
        let text = std::mem::take(&mut self.paste);
        Event::Paste(String::from_utf8_lossy(&text).into_owned())
    }

    /// Split off a full chunk of the open paste, keeping a tail that could
    /// begin the closing delimiter and never cutting a UTF-8 sequence.
    fn take_paste_chunk(&mut self) -> Option<Event> {
        let keep = PASTE_END.len() - 1;
        if self.paste.len() < MAX_PASTE_CHUNK + keep {
            return None;
        }
        let mut cut = self.paste.len() - keep;
        for _ in 0..3 {
            if self.paste[cut] & 0xC0 != 0x80 {
                break;
            }
            cut -= 1;
        }
        let rest = self.paste.split_off(cut);
        let chunk = std::mem::replace(&mut self.paste, rest);
        Some(Event::Paste(String::from_utf8_lossy(&chunk).into_owned()))
    }
}

// ─── Sequence Tables ─────────────────────────────────────────────────────────
//
// Pure functions over the front of the pending buffer. Each reports what it
// found and how many bytes that used.

enum Decoded {
    Event(Event, usize),
    /// The first n bytes match nothing known; report them as plain keys.
    Literal(usize),
    PasteStart(usize),
    /// A known sequence with nothing to report.
    Ignore(usize),
    Incomplete,
}

fn decode(buf: &[u8]) -> Decoded {
    match buf[0] {
        ESC => decode_escape(buf),
        b @ (0x00..=0x1F | 0x7F) => Decoded::Event(Event::Key(control_key(b)), 1),
        b @ 0x20..=0x7E => Decoded::Event(key(KeyCode::Char(char::from(b)), Modifiers::empty()), 1),
        _ => decode_utf8(buf, Modifiers::empty(), 0),
    }
}

fn decode_escape(buf: &[u8]) -> Decoded {
    let Some(&next) = buf.get(1) else {
        return Decoded::Incomplete;
    };
    match next {
        b'[' => decode_csi(buf),
        b'O' => decode_ss3(buf),
        ESC => Decoded::Event(key(KeyCode::Escape, Modifiers::ALT), 2),
        b @ 0x20..=0x7E => Decoded::Event(key(KeyCode::Char(char::from(b)), Modifiers::ALT), 2),
        b @ (0x00..=0x1F | 0x7F) => {
            let mut ev = control_key(b);
            ev.modifiers |= Modifiers::ALT;
            Decoded::Event(Event::Key(ev), 2)
        }
        _ => decode_utf8(&buf[1..], Modifiers::ALT, 1),
    }
}

fn decode_csi(buf: &[u8]) -> Decoded {
    debug_assert!(buf.starts_with(b"\x1b["));

    match buf.get(2) {
        None => return Decoded::Incomplete,
        Some(b'<') => return decode_sgr_mouse(buf),
        // Linux console F1-F5: ESC [ [ A..E
        Some(b'[') => {
            return match buf.get(3) {
                None => Decoded::Incomplete,
                Some(&b @ b'A'..=b'E') => {
                    Decoded::Event(key(KeyCode::F(b - b'A' + 1), Modifiers::empty()), 4)
                }
                Some(_) => Decoded::Literal(3),
            };
        }
        Some(_) => {}
    }

    // Parameters 0x30-0x3F, intermediates 0x20-0x2F, final 0x40-0x7E. rxvt
    // also ends editing keys with '$' (shift), so a '$' after parameters is
    // taken as final.
    let mut end = 2;
    loop {
        let Some(&b) = buf.get(end) else {
            return Decoded::Incomplete;
        };
        match b {
            b'$' if end > 2 => break,
            0x20..=0x3F => end += 1,
            0x40..=0x7E => break,
            _ => return Decoded::Literal(end),
        }
    }

    let consumed = end + 1;
    let params = parse_params(&buf[2..end]);
    let first = params.first().copied().unwrap_or(0);
    let mods = params.get(1).map_or(Modifiers::empty(), |&p| decode_modifiers(p));

    let code = match buf[end] {
        final_byte @ (b'~' | b'^' | b'@' | b'$') => {
            if first == 200 {
                return Decoded::PasteStart(consumed);
            }
            if first == 201 {
                return Decoded::Ignore(consumed);
            }
            let Some(code) = tilde_key(first) else {
                return Decoded::Literal(consumed);
            };
            let rxvt = match final_byte {
                b'^' => Modifiers::CTRL,
                b'@' => Modifiers::CTRL | Modifiers::SHIFT,
                b'$' => Modifiers::SHIFT,
                _ => Modifiers::empty(),
            };
            return Decoded::Event(key(code, mods | rxvt), consumed);
        }
        b'I' if params.is_empty() => return Decoded::Event(Event::FocusGained, consumed),
        b'O' if params.is_empty() => return Decoded::Event(Event::FocusLost, consumed),
        b'Z' => return Decoded::Event(key(KeyCode::Tab, Modifiers::SHIFT), consumed),
        // rxvt shifted arrows
        b @ b'a'..=b'd' => {
            let code = arrow(b - b'a');
            return Decoded::Event(key(code, Modifiers::SHIFT), consumed);
        }
        b'A' => KeyCode::Up,
        b'B' => KeyCode::Down,
        b'C' => KeyCode::Right,
        b'D' => KeyCode::Left,
        b'H' => KeyCode::Home,
        b'F' => KeyCode::End,
        b'P' => KeyCode::F(1),
        b'Q' => KeyCode::F(2),
        b'R' => KeyCode::F(3),
        b'S' => KeyCode::F(4),
        _ => return Decoded::Literal(consumed),
    };
    Decoded::Event(key(code, mods), consumed)
}

fn tilde_key(param: u16) -> Option<KeyCode> {
    let code = match param {
        1 | 7 => KeyCode::Home,
        2 => KeyCode::Insert,
        3 => KeyCode::Delete,
        4 | 8 => KeyCode::End,
        5 => KeyCode::PageUp,
        6 => KeyCode::PageDown,
        11 => KeyCode::F(1),
        12 => KeyCode::F(2),
        13 => KeyCode::F(3),
        14 => KeyCode::F(4),
        15 => KeyCode::F(5),
        17 => KeyCode::F(6),
        18 => KeyCode::F(7),
        19 => KeyCode::F(8),
        20 => KeyCode::F(9),
        21 => KeyCode::F(10),
        23 => KeyCode::F(11),
        24 => KeyCode::F(12),
        25 => KeyCode::F(13),
        26 => KeyCode::F(14),
        28 => KeyCode::F(15),
        29 => KeyCode::F(16),
        31 => KeyCode::F(17),
        32 => KeyCode::F(18),
        33 => KeyCode::F(19),
        34 => KeyCode::F(20),
        _ => return None,
    };
    Some(code)
}

const fn arrow(index: u8) -> KeyCode {
    match index {
        0 => KeyCode::Up,
        1 => KeyCode::Down,
        2 => KeyCode::Right,
        _ => KeyCode::Left,
    }
}

fn decode_ss3(buf: &[u8]) -> Decoded {
    let Some(&b) = buf.get(2) else {
        return Decoded::Incomplete;
    };
    let event = match b {
        b'A' => key(KeyCode::Up, Modifiers::empty()),
        b'B' => key(KeyCode::Down, Modifiers::empty()),
        b'C' => key(KeyCode::Right, Modifiers::empty()),
        b'D' => key(KeyCode::Left, Modifiers::empty()),
        b'H' => key(KeyCode::Home, Modifiers::empty()),
        b'F' => key(KeyCode::End, Modifiers::empty()),
        b'M' => key(KeyCode::Enter, Modifiers::empty()),
        b'P' => key(KeyCode::F(1), Modifiers::empty()),
        b'Q' => key(KeyCode::F(2), Modifiers::empty()),
        b'R' => key(KeyCode::F(3), Modifiers::empty()),
        b'S' => key(KeyCode::F(4), Modifiers::empty()),
        // rxvt ctrl-arrows
        b @ b'a'..=b'd' => key(arrow(b - b'a'), Modifiers::CTRL),
        _ => return Decoded::Literal(3),
    };
    Decoded::Event(event, 3)
}

// ESC [ < Pb ; Px ; Py M   press or motion
// ESC [ < Pb ; Px ; Py m   release
fn decode_sgr_mouse(buf: &[u8]) -> Decoded {
    let start = 3;
    let mut end = start;
    loop {
        let Some(&b) = buf.get(end) else {
            return Decoded::Incomplete;
        };
        match b {
            b'M' | b'm' => break,
            b'0'..=b'9' | b';' => end += 1,
            _ => return Decoded::Literal(end),
        }
    }

    let params = parse_params(&buf[start..end]);
    let [cb, raw_x, raw_y] = params[..] else {
        return Decoded::Literal(end + 1);
    };
    let is_release = buf[end] == b'm';

    let mut modifiers = Modifiers::empty();
    if cb & 4 != 0 {
        modifiers |= Modifiers::SHIFT;
    }
    if cb & 8 != 0 {
        modifiers |= Modifiers::ALT;
    }
    if cb & 16 != 0 {
        modifiers |= Modifiers::CTRL;
    }

    let base = cb & 3;
    let button = match base {
        0 => Some(MouseButton::Left),
        1 => Some(MouseButton::Middle),
        2 => Some(MouseButton::Right),
        _ => None,
    };

    let (action, button) = if cb & 64 != 0 {
        let action = match base {
            0 => MouseAction::ScrollUp,
            1 => MouseAction::ScrollDown,
            2 => MouseAction::ScrollLeft,
            _ => MouseAction::ScrollRight,
        };
        (action, None)
    } else if cb & 32 != 0 {
        (MouseAction::Move, button)
    } else if is_release {
        (MouseAction::Release, button)
    } else {
        (MouseAction::Press, button)
    };

    let event = MouseEvent {
        action,
        button,
        x: raw_x.saturating_sub(1),
        y: raw_y.saturating_sub(1),
        modifiers,
    };
    Decoded::Event(Event::Mouse(event), end + 1)
}

/// Decode one UTF-8 scalar from the front of `buf`. `prefix` bytes (an ESC
/// for Alt) were already examined by the caller and count toward the total.
fn decode_utf8(buf: &[u8], modifiers: Modifiers, prefix: usize) -> Decoded {
    let len = utf8_len(buf[0]);
    if len == 0 {
        return Decoded::Literal(prefix + 1);
    }
    if buf.len() < len {
        return Decoded::Incomplete;
    }
    match std::str::from_utf8(&buf[..len]).ok().and_then(|s| s.chars().next()) {
        Some(ch) => Decoded::Event(key(KeyCode::Char(ch), modifiers), prefix + len),
        None => Decoded::Literal(prefix + 1),
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

const fn key(code: KeyCode, modifiers: Modifiers) -> Event {
    Event::Key(KeyEvent { code, modifiers })
}

/// The key a single C0 control byte (or DEL) stands for.
fn control_key(b: u8) -> KeyEvent {
    match b {
        0x08 | 0x7F => KeyEvent::plain(KeyCode::Backspace),
        0x09 => KeyEvent::plain(KeyCode::Tab),
        0x0A | 0x0D => KeyEvent::plain(KeyCode::Enter),
        ESC => KeyEvent::plain(KeyCode::Escape),
        0x00 => KeyEvent::new(KeyCode::Char(' '), Modifiers::CTRL),
        0x01..=0x1A => KeyEvent::new(KeyCode::Char(char::from(b - 1 + b'a')), Modifiers::CTRL),
        // 0x1C-0x1F: Ctrl+\ ] ^ _
        _ => KeyEvent::new(KeyCode::Char(char::from(b + 0x40)), Modifiers::CTRL),
    }
}

/// A byte reported on its own, outside any sequence.
fn literal_key(b: u8) -> Event {
    match b {
        0x00..=0x1F | 0x7F => Event::Key(control_key(b)),
        0x20..=0x7E => key(KeyCode::Char(char::from(b)), Modifiers::empty()),
        _ => key(KeyCode::Char(char::REPLACEMENT_CHARACTER), Modifiers::empty()),
    }
}

/// Semicolon-separated decimal parameters. Empty fields read as 0; colon
/// sub-parameters are ignored.
fn parse_params(raw: &[u8]) -> Vec<u16> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(|&b| b == b';')
        .map(|field| {
            field
                .iter()
                .take_while(|b| b.is_ascii_digit())
                .fold(0u16, |acc, &b| {
                    acc.saturating_mul(10).saturating_add(u16::from(b - b'0'))
                })
        })
        .collect()
}

/// xterm modifier parameter: `1 + bits`, where 0 and 1 both mean none.
#[allow(clippy::cast_possible_truncation)] // only the low six bits are flags
const fn decode_modifiers(param: u16) -> Modifiers {
    let bits = param.saturating_sub(1);
    Modifiers::from_bits_truncate(bits as u8)
}

const fn utf8_len(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 0,
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn decode_all(data: &[u8]) -> Vec<Event> {
        InputDecoder::new().feed(data)
    }

    fn decode_one(data: &[u8]) -> Event {
        let events = decode_all(data);
        assert_eq!(events.len(), 1, "expected one event, got {events:?}");
        events.into_iter().next().unwrap()
    }

    fn plain(code: KeyCode) -> Event {
        Event::Key(KeyEvent::plain(code))
    }

    fn with(code: KeyCode, modifiers: Modifiers) -> Event {
        Event::Key(KeyEvent::new(code, modifiers))
    }

    fn chars(s: &str) -> Vec<Event> {
        s.chars().map(|c| plain(KeyCode::Char(c))).collect()
    }

    // ── Text ────────────────────────────────────────────────────────────

    #[test]
    fn printable_ascii() {
        assert_eq!(decode_all(b"ab ~"), chars("ab ~"));
    }

    #[test]
    fn utf8_multibyte() {
        assert_eq!(decode_one("é".as_bytes()), plain(KeyCode::Char('é')));
        assert_eq!(decode_one("你".as_bytes()), plain(KeyCode::Char('你')));
        assert_eq!(decode_one("🦀".as_bytes()), plain(KeyCode::Char('🦀')));
    }

    #[test]
    fn utf8_split_across_feeds() {
        let bytes = "你".as_bytes();
        let mut d = InputDecoder::new();
        assert!(d.feed(&bytes[..1]).is_empty());
        assert!(d.feed(&bytes[1..2]).is_empty());
        assert_eq!(d.feed(&bytes[2..]), vec![plain(KeyCode::Char('你'))]);
    }

    #[test]
    fn stray_continuation_byte_is_replacement_char() {
        assert_eq!(
            decode_all(b"\x80a"),
            vec![plain(KeyCode::Char('\u{FFFD}')), plain(KeyCode::Char('a'))]
        );
    }

    // ── Control Characters ──────────────────────────────────────────────

    #[test]
    fn control_bytes() {
        assert_eq!(decode_one(b"\x01"), with(KeyCode::Char('a'), Modifiers::CTRL));
        assert_eq!(decode_one(b"\x03"), with(KeyCode::Char('c'), Modifiers::CTRL));
        assert_eq!(decode_one(b"\x00"), with(KeyCode::Char(' '), Modifiers::CTRL));
        assert_eq!(decode_one(b"\x1f"), with(KeyCode::Char('_'), Modifiers::CTRL));
        assert_eq!(decode_one(b"\r"), plain(KeyCode::Enter));
        assert_eq!(decode_one(b"\n"), plain(KeyCode::Enter));
        assert_eq!(decode_one(b"\t"), plain(KeyCode::Tab));
        assert_eq!(decode_one(b"\x7f"), plain(KeyCode::Backspace));
        assert_eq!(decode_one(b"\x08"), plain(KeyCode::Backspace));
    }

    #[test]
    fn is_ctrl_matches_letter_and_modifier() {
        let Event::Key(k) = decode_one(b"\x03") else {
            panic!("expected key");
        };
        assert!(k.is_ctrl('c'));
        assert!(!k.is_ctrl('d'));
        assert!(!KeyEvent::plain(KeyCode::Char('c')).is_ctrl('c'));
    }

    // ── Escape and Alt ──────────────────────────────────────────────────

    #[test]
    fn lone_escape_waits_for_flush() {
        let mut d = InputDecoder::new();
        assert!(d.feed(b"\x1b").is_empty());
        assert!(d.has_pending());
        assert_eq!(d.flush(), vec![plain(KeyCode::Escape)]);
        assert!(!d.has_pending());
        assert!(d.flush().is_empty());
    }

    #[test]
    fn alt_letter() {
        assert_eq!(decode_one(b"\x1bx"), with(KeyCode::Char('x'), Modifiers::ALT));
    }

    #[test]
    fn alt_control_bytes() {
        assert_eq!(decode_one(b"\x1b\x7f"), with(KeyCode::Backspace, Modifiers::ALT));
        assert_eq!(decode_one(b"\x1b\r"), with(KeyCode::Enter, Modifiers::ALT));
        assert_eq!(
            decode_one(b"\x1b\x01"),
            with(KeyCode::Char('a'), Modifiers::ALT | Modifiers::CTRL)
        );
    }

    #[test]
    fn alt_utf8() {
        assert_eq!(
            decode_one("\x1bé".as_bytes()),
            with(KeyCode::Char('é'), Modifiers::ALT)
        );
    }

    #[test]
    fn double_escape_is_alt_escape() {
        assert_eq!(decode_one(b"\x1b\x1b"), with(KeyCode::Escape, Modifiers::ALT));
    }

    #[test]
    fn flush_resolves_escape_bracket_as_alt() {
        let mut d = InputDecoder::new();
        assert!(d.feed(b"\x1b[").is_empty());
        assert_eq!(d.flush(), vec![with(KeyCode::Char('['), Modifiers::ALT)]);
    }

    #[test]
    fn flush_resolves_longer_partial_as_literals() {
        let mut d = InputDecoder::new();
        assert!(d.feed(b"\x1b[1;").is_empty());
        let mut expected = vec![plain(KeyCode::Escape)];
        expected.extend(chars("[1;"));
        assert_eq!(d.flush(), expected);
    }

    // ── CSI Keys ────────────────────────────────────────────────────────

    #[test]
    fn arrows() {
        assert_eq!(decode_one(b"\x1b[A"), plain(KeyCode::Up));
        assert_eq!(decode_one(b"\x1b[B"), plain(KeyCode::Down));
        assert_eq!(decode_one(b"\x1b[C"), plain(KeyCode::Right));
        assert_eq!(decode_one(b"\x1b[D"), plain(KeyCode::Left));
    }

    #[test]
    fn arrow_up_split_across_two_feeds_is_one_event() {
        let mut d = InputDecoder::new();
        let first = d.feed(b"\x1b");
        let second = d.feed(b"[A");
        assert!(first.is_empty());
        assert_eq!(second, vec![plain(KeyCode::Up)]);
        assert!(!d.has_pending());
    }

    #[test]
    fn arrow_split_after_bracket() {
        let mut d = InputDecoder::new();
        assert!(d.feed(b"\x1b[").is_empty());
        assert_eq!(d.feed(b"A"), vec![plain(KeyCode::Up)]);
    }

    #[test]
    fn xterm_modifiers() {
        assert_eq!(decode_one(b"\x1b[1;5A"), with(KeyCode::Up, Modifiers::CTRL));
        assert_eq!(decode_one(b"\x1b[1;2D"), with(KeyCode::Left, Modifiers::SHIFT));
        assert_eq!(
            decode_one(b"\x1b[1;7C"),
            with(KeyCode::Right, Modifiers::CTRL | Modifiers::ALT)
        );
        assert_eq!(decode_one(b"\x1b[3;3~"), with(KeyCode::Delete, Modifiers::ALT));
        assert_eq!(
            decode_one(b"\x1b[1;9H"),
            with(KeyCode::Home, Modifiers::SUPER)
        );
    }

    #[test]
    fn editing_keys() {
        assert_eq!(decode_one(b"\x1b[1~"), plain(KeyCode::Home));
        assert_eq!(decode_one(b"\x1b[7~"), plain(KeyCode::Home));
        assert_eq!(decode_one(b"\x1b[2~"), plain(KeyCode::Insert));
        assert_eq!(decode_one(b"\x1b[3~"), plain(KeyCode::Delete));
        assert_eq!(decode_one(b"\x1b[4~"), plain(KeyCode::End));
        assert_eq!(decode_one(b"\x1b[8~"), plain(KeyCode::End));
        assert_eq!(decode_one(b"\x1b[5~"), plain(KeyCode::PageUp));
        assert_eq!(decode_one(b"\x1b[6~"), plain(KeyCode::PageDown));
        assert_eq!(decode_one(b"\x1b[H"), plain(KeyCode::Home));
        assert_eq!(decode_one(b"\x1b[F"), plain(KeyCode::End));
    }

    #[test]
    fn function_keys() {
        assert_eq!(decode_one(b"\x1b[P"), plain(KeyCode::F(1)));
        assert_eq!(decode_one(b"\x1b[11~"), plain(KeyCode::F(1)));
        assert_eq!(decode_one(b"\x1b[15~"), plain(KeyCode::F(5)));
        assert_eq!(decode_one(b"\x1b[24~"), plain(KeyCode::F(12)));
        assert_eq!(decode_one(b"\x1b[34~"), plain(KeyCode::F(20)));
        assert_eq!(decode_one(b"\x1b[15;5~"), with(KeyCode::F(5), Modifiers::CTRL));
    }

    #[test]
    fn shift_tab() {
        assert_eq!(decode_one(b"\x1b[Z"), with(KeyCode::Tab, Modifiers::SHIFT));
    }

    // ── Terminal Variants ───────────────────────────────────────────────

    #[test]
    fn ss3_keys() {
        assert_eq!(decode_one(b"\x1bOA"), plain(KeyCode::Up));
        assert_eq!(decode_one(b"\x1bOH"), plain(KeyCode::Home));
        assert_eq!(decode_one(b"\x1bOP"), plain(KeyCode::F(1)));
        assert_eq!(decode_one(b"\x1bOS"), plain(KeyCode::F(4)));
        assert_eq!(decode_one(b"\x1bOM"), plain(KeyCode::Enter));
    }

    #[test]
    fn rxvt_variants() {
        assert_eq!(decode_one(b"\x1b[a"), with(KeyCode::Up, Modifiers::SHIFT));
        assert_eq!(decode_one(b"\x1b[d"), with(KeyCode::Left, Modifiers::SHIFT));
        assert_eq!(decode_one(b"\x1bOc"), with(KeyCode::Right, Modifiers::CTRL));
        assert_eq!(decode_one(b"\x1b[3^"), with(KeyCode::Delete, Modifiers::CTRL));
        assert_eq!(decode_one(b"\x1b[2$"), with(KeyCode::Insert, Modifiers::SHIFT));
        assert_eq!(
            decode_one(b"\x1b[5@"),
            with(KeyCode::PageUp, Modifiers::CTRL | Modifiers::SHIFT)
        );
    }

    #[test]
    fn linux_console_function_keys() {
        assert_eq!(decode_one(b"\x1b[[A"), plain(KeyCode::F(1)));
        assert_eq!(decode_one(b"\x1b[[E"), plain(KeyCode::F(5)));
    }

    // ── Unknown Sequences ───────────────────────────────────────────────

    #[test]
    fn unknown_csi_final_becomes_literal_keys() {
        let mut expected = vec![plain(KeyCode::Escape)];
        expected.extend(chars("[5X"));
        assert_eq!(decode_all(b"\x1b[5X"), expected);
    }

    #[test]
    fn unknown_tilde_code_becomes_literal_keys() {
        let mut expected = vec![plain(KeyCode::Escape)];
        expected.extend(chars("[99~"));
        assert_eq!(decode_all(b"\x1b[99~"), expected);
    }

    #[test]
    fn malformed_csi_keeps_every_byte() {
        let mut expected = vec![plain(KeyCode::Escape)];
        expected.extend(chars("[1"));
        expected.push(with(KeyCode::Char('a'), Modifiers::CTRL));
        expected.extend(chars("A"));
        assert_eq!(decode_all(b"\x1b[1\x01A"), expected);
    }

    #[test]
    fn overlong_partial_sequence_resolves_as_literals() {
        let mut data = b"\x1b[".to_vec();
        data.extend(std::iter::repeat_n(b'1', 40));
        let mut d = InputDecoder::new();
        let events = d.feed(&data);
        assert_eq!(events.len(), 42);
        assert_eq!(events[0], plain(KeyCode::Escape));
        assert_eq!(events[1], plain(KeyCode::Char('[')));
        assert!(events[2..].iter().all(|e| *e == plain(KeyCode::Char('1'))));
        assert!(!d.has_pending());
    }

    #[test]
    fn partial_sequence_under_the_limit_stays_pending() {
        let mut data = b"\x1b[".to_vec();
        data.extend(std::iter::repeat_n(b'1', MAX_LOOKAHEAD - 3));
        let mut d = InputDecoder::new();
        assert!(d.feed(&data).is_empty());
        assert!(d.has_pending());
        assert_eq!(d.feed(b"~").len(), MAX_LOOKAHEAD);
    }

    // ── Mouse ───────────────────────────────────────────────────────────

    fn mouse(action: MouseAction, button: Option<MouseButton>, x: u16, y: u16) -> Event {
        Event::Mouse(MouseEvent {
            action,
            button,
            x,
            y,
            modifiers: Modifiers::empty(),
        })
    }

    #[test]
    fn mouse_press_and_release_are_zero_based() {
        assert_eq!(
            decode_one(b"\x1b[<0;10;5M"),
            mouse(MouseAction::Press, Some(MouseButton::Left), 9, 4)
        );
        assert_eq!(
            decode_one(b"\x1b[<2;1;1m"),
            mouse(MouseAction::Release, Some(MouseButton::Right), 0, 0)
        );
        assert_eq!(
            decode_one(b"\x1b[<1;3;3M"),
            mouse(MouseAction::Press, Some(MouseButton::Middle), 2, 2)
        );
    }

    #[test]
    fn mouse_drag_and_move() {
        assert_eq!(
            decode_one(b"\x1b[<32;4;2M"),
            mouse(MouseAction::Move, Some(MouseButton::Left), 3, 1)
        );
        assert_eq!(
            decode_one(b"\x1b[<35;4;2M"),
            mouse(MouseAction::Move, None, 3, 1)
        );
    }

    #[test]
    fn mouse_wheel() {
        assert_eq!(decode_one(b"\x1b[<64;1;1M"), mouse(MouseAction::ScrollUp, None, 0, 0));
        assert_eq!(decode_one(b"\x1b[<65;1;1M"), mouse(MouseAction::ScrollDown, None, 0, 0));
        assert_eq!(decode_one(b"\x1b[<66;1;1M"), mouse(MouseAction::ScrollLeft, None, 0, 0));
        assert_eq!(decode_one(b"\x1b[<67;1;1M"), mouse(MouseAction::ScrollRight, None, 0, 0));
        assert!(MouseAction::ScrollUp.is_scroll());
        assert!(!MouseAction::Press.is_scroll());
    }

    #[test]
    fn mouse_modifiers() {
        let Event::Mouse(m) = decode_one(b"\x1b[<28;5;5M") else {
            panic!("expected mouse");
        };
        assert_eq!(m.modifiers, Modifiers::SHIFT | Modifiers::ALT | Modifiers::CTRL);
        assert_eq!(m.action, MouseAction::Press);
        assert_eq!(m.button, Some(MouseButton::Left));
    }

    #[test]
    fn mouse_split_across_feeds() {
        let mut d = InputDecoder::new();
        assert!(d.feed(b"\x1b[<0;12").is_empty());
        assert_eq!(
            d.feed(b";7M"),
            vec![mouse(MouseAction::Press, Some(MouseButton::Left), 11, 6)]
        );
    }

    #[test]
    fn malformed_mouse_report_is_literal() {
        let events = decode_all(b"\x1b[<0;a;1M");
        assert_eq!(events[0], plain(KeyCode::Escape));
        assert_eq!(events.len(), 9);
    }

    // ── Paste and Focus ─────────────────────────────────────────────────

    #[test]
    fn bracketed_paste_is_one_event() {
        assert_eq!(
            decode_all(b"x\x1b[200~hi\x1b[Athere\x1b[201~y"),
            vec![
                plain(KeyCode::Char('x')),
                Event::Paste("hi\x1b[Athere".to_owned()),
                plain(KeyCode::Char('y')),
            ]
        );
    }

    #[test]
    fn paste_split_across_feeds() {
        let mut d = InputDecoder::new();
        assert!(d.feed(b"\x1b[20").is_empty());
        assert!(d.feed(b"0~abc").is_empty());
        assert!(!d.has_pending());
        assert!(d.feed(b"def\x1b[2").is_empty());
        assert_eq!(d.feed(b"01~"), vec![Event::Paste("abcdef".to_owned())]);
    }

    #[test]
    fn open_paste_survives_flush() {
        let mut d = InputDecoder::new();
        d.feed(b"\x1b[200~part");
        assert!(d.flush().is_empty());
        assert_eq!(d.feed(b"\x1b[201~"), vec![Event::Paste("part".to_owned())]);
    }

    #[test]
    fn unterminated_paste_closes_after_two_idle_flushes() {
        let mut d = InputDecoder::new();
        assert!(d.feed(b"\x1b[200~stray").is_empty());
        assert!(d.flush().is_empty());
        assert!(d.has_pending());
        assert_eq!(d.flush(), vec![Event::Paste("stray".to_owned())]);
        assert!(!d.has_pending());

        assert_eq!(
            d.feed(b"\x1b[Aq"),
            vec![plain(KeyCode::Up), plain(KeyCode::Char('q'))]
        );
    }

    #[test]
    fn bytes_between_idle_flushes_keep_the_paste_open() {
        let mut d = InputDecoder::new();
        d.feed(b"\x1b[200~slow");
        assert!(d.flush().is_empty());
        assert!(d.feed(b" typist").is_empty());
        assert!(d.flush().is_empty());
        assert_eq!(d.feed(b"\x1b[201~"), vec![Event::Paste("slow typist".to_owned())]);
    }

    #[test]
    fn long_paste_is_emitted_in_bounded_pieces() {
        let mut d = InputDecoder::new();
        d.feed(b"\x1b[200~");
        let block = vec![b'x'; 4096];
        let mut text = 0;
        for _ in 0..64 {
            for event in d.feed(&block) {
                let Event::Paste(chunk) = event else {
                    panic!("unexpected {event:?}");
                };
                assert!(chunk.len() <= MAX_PASTE_CHUNK + block.len());
                text += chunk.len();
            }
            assert!(d.paste.len() < MAX_PASTE_CHUNK + PASTE_END.len());
        }
        assert!(text > 0);

        let events = d.feed(b"\x1b[201~\x1b[Aq");
        let total: usize = events
            .iter()
            .map(|e| match e {
                Event::Paste(t) => t.len(),
                _ => 0,
            })
            .sum::<usize>()
            + text;
        assert_eq!(total, 64 * 4096);
        assert_eq!(
            events[events.len() - 2..].to_vec(),
            vec![plain(KeyCode::Up), plain(KeyCode::Char('q'))]
        );
    }

    #[test]
    fn paste_delimiter_split_across_a_chunk_boundary() {
        let mut d = InputDecoder::new();
        d.feed(b"\x1b[200~");
        let mut big = vec![b'y'; MAX_PASTE_CHUNK + 10];
        big.extend_from_slice(b"\x1b[20");
        let first = d.feed(&big);
        assert_eq!(first.len(), 1);
        // The piece held back is what completes the delimiter.
        assert_eq!(
            d.feed(b"1~z"),
            vec![
                Event::Paste("y".repeat(MAX_PASTE_CHUNK + 10 - first_len(&first))),
                plain(KeyCode::Char('z')),
            ]
        );
    }

    fn first_len(events: &[Event]) -> usize {
        match &events[0] {
            Event::Paste(t) => t.len(),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn multibyte_text_is_not_cut_between_pieces() {
        let mut d = InputDecoder::new();
        d.feed(b"\x1b[200~");
        let text = "é".repeat(MAX_PASTE_CHUNK);
        let mut pieces = d.feed(text.as_bytes());
        pieces.extend(d.feed(b"\x1b[201~"));
        let joined: String = pieces
            .into_iter()
            .map(|e| match e {
                Event::Paste(t) => t,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(joined, text);
    }

    #[test]
    fn focus_reports() {
        assert_eq!(decode_one(b"\x1b[I"), Event::FocusGained);
        assert_eq!(decode_one(b"\x1b[O"), Event::FocusLost);
    }

    // ── Display ─────────────────────────────────────────────────────────

    #[test]
    fn key_display() {
        assert_eq!(KeyEvent::plain(KeyCode::Up).to_string(), "Up");
        assert_eq!(KeyEvent::plain(KeyCode::F(5)).to_string(), "F5");
        assert_eq!(
            KeyEvent::new(KeyCode::Char('x'), Modifiers::CTRL | Modifiers::ALT).to_string(),
            "Ctrl+Alt+x"
        );
        assert_eq!(KeyEvent::plain(KeyCode::Char(' ')).to_string(), "Space");
    }
}
