// SPDX-License-Identifier: MIT
//
// Event names and payloads.
//
// Events are addressed by name so plugins can invent their own. The names
// the kernel and the built-in plugins use are the constants below. Every
// emission carries one `Payload`; plugin-defined data rides in `Custom`.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use tessel_layout::{NodeId, Size};
use tessel_term::{KeyEvent, MouseEvent};

use crate::error::KernelError;

// ─── Names ───────────────────────────────────────────────────────────────────

/// The kernel started. Emitted once, after terminal modes are on.
pub const START: &str = "start";
/// The kernel is stopping. Emitted before plugins are destroyed.
pub const STOP: &str = "stop";
/// Every tick, before the dirty check.
pub const TICK: &str = "tick";
/// The screen changed size. Payload: [`Payload::Resize`].
pub const RESIZE: &str = "resize";
/// Raw input bytes. Payload: [`Payload::Bytes`].
pub const DATA: &str = "data";
/// No input arrived for a whole tick; pending escape bytes should resolve.
pub const INPUT_IDLE: &str = "input:idle";
/// A decoded key. Payload: [`Payload::Key`].
pub const KEY: &str = "key";
/// A decoded mouse event in screen coordinates. Payload: [`Payload::Mouse`].
pub const MOUSE: &str = "mouse";
/// A bracketed paste. Payload: [`Payload::Paste`].
pub const PASTE: &str = "paste";
/// The terminal window gained focus.
pub const FOCUS_IN: &str = "focus-in";
/// The terminal window lost focus.
pub const FOCUS_OUT: &str = "focus-out";
/// The focused node changed. Payload: [`Payload::Focus`].
pub const FOCUS: &str = "focus";
/// A runtime failure was isolated. Payload: [`Payload::Error`].
pub const ERROR: &str = "error";

// ─── Payload ─────────────────────────────────────────────────────────────────

/// Data carried by one emission.
#[derive(Clone, Default)]
pub enum Payload {
    #[default]
    None,
    Bytes(Rc<[u8]>),
    Key(KeyEvent),
    Mouse(MouseEvent),
    Paste(Rc<str>),
    Resize(Size),
    Focus {
        previous: Option<NodeId>,
        current: Option<NodeId>,
    },
    Error(Rc<KernelError>),
    Custom(Rc<dyn Any>),
}

impl Payload {
    #[must_use]
    pub const fn key(&self) -> Option<&KeyEvent> {
        match self {
            Self::Key(k) => Some(k),
            _ => None,
        }
    }

    #[must_use]
    pub const fn mouse(&self) -> Option<&MouseEvent> {
        match self {
            Self::Mouse(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&KernelError> {
        match self {
            Self::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Downcast a `Custom` payload.
    #[must_use]
    pub fn custom<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Custom(v) => v.downcast_ref(),
            _ => None,
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            Self::Key(k) => write!(f, "Key({k})"),
            Self::Mouse(m) => f.debug_tuple("Mouse").field(m).finish(),
            Self::Paste(s) => f.debug_tuple("Paste").field(s).finish(),
            Self::Resize(s) => write!(f, "Resize({}x{})", s.width, s.height),
            Self::Focus { previous, current } => f
                .debug_struct("Focus")
                .field("previous", previous)
                .field("current", current)
                .finish(),
            Self::Error(e) => write!(f, "Error({e})"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<KeyEvent> for Payload {
    fn from(k: KeyEvent) -> Self {
        Self::Key(k)
    }
}

impl From<MouseEvent> for Payload {
    fn from(m: MouseEvent) -> Self {
        Self::Mouse(m)
    }
}

impl From<&[u8]> for Payload {
    fn from(b: &[u8]) -> Self {
        Self::Bytes(b.into())
    }
}
