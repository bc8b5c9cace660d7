// SPDX-License-Identifier: MIT
//
// Terminal control: raw mode, screen modes and guaranteed restore.
//
// termios, ioctl(TIOCGWINSZ), isatty and the raw fd write in the panic hook
// have no safe wrappers, so this module allows unsafe code. Each block is a
// single libc call.
#![allow(unsafe_code)]
//
// `Terminal::enter` switches on exactly the modes requested and remembers
// them; `leave` switches the same set off in reverse order. Dropping an
// active Terminal leaves it. A process-wide panic hook writes a fixed
// restore sequence straight to fd 1, bypassing the stdout lock that a
// panicking frame flush may still hold, then restores termios from a
// global backup and hands over to the previous hook.

use std::io::{self, Write};
use std::sync::{Mutex, Once};

use crate::ansi;

// ─── Size ────────────────────────────────────────────────────────────────────

/// Terminal dimensions in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size {
    pub cols: u16,
    pub rows: u16,
}

impl Size {
    pub const FALLBACK: Self = Self { cols: 80, rows: 24 };

    #[inline]
    #[must_use]
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }

    #[inline]
    #[must_use]
    pub const fn area(self) -> u32 {
        self.cols as u32 * self.rows as u32
    }
}

/// Query the size of the terminal on stdout.
///
/// `None` when stdout isn't a terminal.
#[cfg(unix)]
#[must_use]
pub fn get_size() -> Option<Size> {
    // SAFETY: winsize is plain data; the ioctl only writes into it.
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &raw mut ws) };
    (rc == 0 && ws.ws_col > 0 && ws.ws_row > 0).then(|| Size::new(ws.ws_col, ws.ws_row))
}

#[cfg(not(unix))]
#[must_use]
pub fn get_size() -> Option<Size> {
    None
}

/// Whether stdin is a terminal.
#[cfg(unix)]
#[must_use]
pub fn is_tty() -> bool {
    // SAFETY: isatty has no preconditions.
    unsafe { libc::isatty(libc::STDIN_FILENO) != 0 }
}

#[cfg(not(unix))]
#[must_use]
pub fn is_tty() -> bool {
    false
}

// ─── Modes ───────────────────────────────────────────────────────────────────

/// Which terminal features to switch on while the engine runs.
///
/// Raw mode and the hidden cursor are always part of the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalModes {
    pub alt_screen: bool,
    pub mouse: bool,
    pub bracketed_paste: bool,
    pub focus_reporting: bool,
}

impl Default for TerminalModes {
    fn default() -> Self {
        Self {
            alt_screen: true,
            mouse: true,
            bracketed_paste: true,
            focus_reporting: true,
        }
    }
}

/// Write the sequence that switches `modes` on.
///
/// # Errors
///
/// Propagates write errors from `w`.
pub fn write_enter_sequence(w: &mut impl Write, modes: TerminalModes) -> io::Result<()> {
    if modes.alt_screen {
        ansi::enter_alt_screen(w)?;
    }
    ansi::cursor_hide(w)?;
    ansi::clear_screen(w)?;
    if modes.mouse {
        ansi::enable_mouse(w, ansi::MouseMode::Drag)?;
    }
    if modes.bracketed_paste {
        ansi::enable_bracketed_paste(w)?;
    }
    if modes.focus_reporting {
        ansi::enable_focus_reporting(w)?;
    }
    Ok(())
}

/// Write the sequence that switches `modes` off, in reverse order.
///
/// # Errors
///
/// Propagates write errors from `w`.
pub fn write_leave_sequence(w: &mut impl Write, modes: TerminalModes) -> io::Result<()> {
    ansi::end_sync(w)?;
    if modes.focus_reporting {
        ansi::disable_focus_reporting(w)?;
    }
    if modes.bracketed_paste {
        ansi::disable_bracketed_paste(w)?;
    }
    if modes.mouse {
        ansi::disable_mouse(w)?;
    }
    ansi::reset(w)?;
    ansi::cursor_show(w)?;
    if modes.alt_screen {
        ansi::exit_alt_screen(w)?;
    }
    Ok(())
}

// ─── Panic Restore ───────────────────────────────────────────────────────────

#[cfg(unix)]
static TERMIOS_BACKUP: Mutex<Option<libc::termios>> = Mutex::new(None);

#[cfg(unix)]
fn restore_termios_from_backup() {
    if let Ok(guard) = TERMIOS_BACKUP.lock() {
        if let Some(original) = guard.as_ref() {
            // SAFETY: original is a termios previously filled by tcgetattr.
            unsafe {
                let _ = libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, original);
            }
        }
    }
}

/// Everything `leave` could need to undo, with the alternate screen last so
/// the shell's screen comes back clean.
#[rustfmt::skip]
const EMERGENCY_RESTORE: &[u8] = b"\
    \x1b[?2026l\
    \x1b[?1006l\x1b[?1003l\x1b[?1002l\x1b[?1000l\
    \x1b[?2004l\
    \x1b[?1004l\
    \x1b[0m\
    \x1b[?25h\
    \x1b[?1049l";

static PANIC_HOOK_INSTALLED: Once = Once::new();

fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if TERMINAL_ACTIVE.lock().is_ok_and(|active| *active) {
                emergency_restore();
                #[cfg(unix)]
                restore_termios_from_backup();
            }
            previous(info);
        }));
    });
}

/// Whether some Terminal is currently entered. Keeps the hook quiet for
/// panics that happen while the terminal is in its normal state.
static TERMINAL_ACTIVE: Mutex<bool> = Mutex::new(false);

fn set_active_flag(on: bool) {
    if let Ok(mut flag) = TERMINAL_ACTIVE.lock() {
        *flag = on;
    }
}

fn emergency_restore() {
    #[cfg(unix)]
    // SAFETY: writes a static byte slice to fd 1.
    unsafe {
        let _ = libc::write(
            libc::STDOUT_FILENO,
            EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
            EMERGENCY_RESTORE.len(),
        );
    }

    #[cfg(not(unix))]
    {
        let _ = io::stdout().write_all(EMERGENCY_RESTORE);
        let _ = io::stdout().flush();
    }
}

// ─── Terminal ────────────────────────────────────────────────────────────────

/// The process's controlling terminal, restored on drop.
///
/// ```no_run
/// use tessel_term::terminal::{Terminal, TerminalModes};
///
/// let mut term = Terminal::new();
/// term.enter(TerminalModes::default())?;
/// // draw frames ...
/// term.leave()?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct Terminal {
    #[cfg(unix)]
    original_termios: Option<libc::termios>,
    size: Size,
    active: Option<TerminalModes>,
}

impl Terminal {
    /// A handle in the normal (cooked) state. Size falls back to 80x24 when
    /// stdout isn't a terminal.
    #[must_use]
    pub fn new() -> Self {
        Self {
            #[cfg(unix)]
            original_termios: None,
            size: get_size().unwrap_or(Size::FALLBACK),
            active: None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    /// Re-query the size, e.g. after SIGWINCH.
    pub fn refresh_size(&mut self) -> Size {
        if let Some(s) = get_size() {
            self.size = s;
        }
        self.size
    }

    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// The modes switched on by the last `enter`, while active.
    #[inline]
    #[must_use]
    pub const fn modes(&self) -> Option<TerminalModes> {
        self.active
    }

    /// Enter raw mode and switch on `modes`. No-op while already active.
    ///
    /// # Errors
    ///
    /// Fails if termios or writing to stdout fails. Raw mode is undone
    /// before returning the error.
    pub fn enter(&mut self, modes: TerminalModes) -> io::Result<()> {
        if self.active.is_some() {
            return Ok(());
        }
        install_panic_hook();
        self.enable_raw_mode()?;

        let stdout = io::stdout();
        let mut lock = stdout.lock();
        let written = write_enter_sequence(&mut lock, modes).and_then(|()| lock.flush());
        drop(lock);
        if let Err(e) = written {
            let _ = self.disable_raw_mode();
            return Err(e);
        }

        self.active = Some(modes);
        set_active_flag(true);
        tracing::debug!(?modes, cols = self.size.cols, rows = self.size.rows, "terminal acquired");
        Ok(())
    }

    /// Switch off what `enter` switched on and leave raw mode. No-op while
    /// inactive.
    ///
    /// # Errors
    ///
    /// Fails if writing to stdout or restoring termios fails. Termios is
    /// restored even when the write fails.
    pub fn leave(&mut self) -> io::Result<()> {
        let Some(modes) = self.active.take() else {
            return Ok(());
        };
        set_active_flag(false);

        let stdout = io::stdout();
        let mut lock = stdout.lock();
        let written = write_leave_sequence(&mut lock, modes).and_then(|()| lock.flush());
        drop(lock);

        self.disable_raw_mode()?;
        tracing::debug!("terminal restored");
        written
    }

    // ── Raw Mode ────────────────────────────────────────────────────

    #[cfg(unix)]
    fn enable_raw_mode(&mut self) -> io::Result<()> {
        if !is_tty() {
            return Ok(());
        }
        let fd = libc::STDIN_FILENO;

        // SAFETY: termios is plain data filled by tcgetattr before use.
        unsafe {
            let mut termios: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(fd, &raw mut termios) != 0 {
                return Err(io::Error::last_os_error());
            }
            self.original_termios = Some(termios);
            if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
                *guard = Some(termios);
            }

            libc::cfmakeraw(&raw mut termios);
            termios.c_cc[libc::VMIN] = 1;
            termios.c_cc[libc::VTIME] = 0;

            if libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const termios) != 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn enable_raw_mode(&mut self) -> io::Result<()> {
        Ok(())
    }

    #[cfg(unix)]
    fn disable_raw_mode(&mut self) -> io::Result<()> {
        let Some(original) = self.original_termios.take() else {
            return Ok(());
        };
        // SAFETY: original came from tcgetattr on the same fd.
        let rc = unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, &raw const original) };
        if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
            *guard = None;
        }
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn disable_raw_mode(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
