// SPDX-License-Identifier: MIT
//
// tessel-term: the terminal-facing layer of tessel.
//
// Widgets paint into a `FrameBuffer` of `Cell`s. `DiffRenderer` compares
// two frames and produces the bytes that turn one into the other: a cursor
// move per changed run, one SGR per style change, nothing for rows that
// didn't change. Going the other way, `InputDecoder` turns whatever the
// terminal sends into key, mouse, paste and focus events, holding partial
// sequences across reads.
//
// `terminal`, `reader` and `signal` are the OS plumbing: raw mode and screen
// modes with guaranteed restore, a background byte reader, and signal flags.
// Everything else is plain data and works on any `impl Write`.

pub mod ansi;
pub mod buffer;
pub mod cell;
pub mod color;
pub mod diff;
pub mod input;
pub mod output;
pub mod reader;
pub mod signal;
pub mod terminal;

pub use buffer::{BorderSet, BufferError, ClipRect, FrameBuffer};
pub use cell::{Attr, Cell, Style, UnderlineStyle};
pub use color::CellColor;
pub use diff::{DiffRenderer, RenderError, RenderStats};
pub use input::{Event, InputDecoder, KeyCode, KeyEvent, Modifiers, MouseAction, MouseButton, MouseEvent};
pub use terminal::{Size, Terminal, TerminalModes};
