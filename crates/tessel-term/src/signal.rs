// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Process signals as polled flags.
//
// The handlers only store into atomics, which is async-signal-safe. The run
// loop drains the flags once per iteration: SIGWINCH means "re-query the
// size", SIGTERM and SIGHUP mean "stop and restore the terminal".

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

static RESIZED: AtomicBool = AtomicBool::new(false);
static TERMINATE: AtomicBool = AtomicBool::new(false);

/// Install the handlers. Safe to call more than once.
///
/// # Errors
///
/// Returns the OS error if `sigaction` rejects a handler.
#[cfg(unix)]
pub fn install() -> io::Result<()> {
    set_handler(libc::SIGWINCH, on_resize)?;
    set_handler(libc::SIGTERM, on_terminate)?;
    set_handler(libc::SIGHUP, on_terminate)?;
    Ok(())
}

#[cfg(not(unix))]
pub fn install() -> io::Result<()> {
    Ok(())
}

/// Whether the terminal was resized since the last call.
pub fn take_resize() -> bool {
    RESIZED.swap(false, Ordering::Relaxed)
}

/// Whether a termination signal arrived since the last call.
pub fn take_terminate() -> bool {
    TERMINATE.swap(false, Ordering::Relaxed)
}

#[cfg(unix)]
fn set_handler(signal: libc::c_int, handler: extern "C" fn(libc::c_int)) -> io::Result<()> {
    // SAFETY: sa is zero-initialized plain data, the handler only touches
    // atomics, and the old-action pointer may be null.
    let rc = unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = handler as usize;
        sa.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&raw mut sa.sa_mask);
        libc::sigaction(signal, &raw const sa, std::ptr::null_mut())
    };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(unix)]
extern "C" fn on_resize(_: libc::c_int) {
    RESIZED.store(true, Ordering::Relaxed);
}

#[cfg(unix)]
extern "C" fn on_terminate(_: libc::c_int) {
    TERMINATE.store(true, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_drained_by_take() {
        RESIZED.store(true, Ordering::Relaxed);
        assert!(take_resize());
        assert!(!take_resize());

        TERMINATE.store(true, Ordering::Relaxed);
        assert!(take_terminate());
        assert!(!take_terminate());
    }

    #[cfg(unix)]
    #[test]
    fn sigwinch_sets_the_resize_flag() {
        install().unwrap();
        // SAFETY: raising a signal whose handler we just installed.
        unsafe {
            libc::raise(libc::SIGWINCH);
        }
        assert!(take_resize());
    }
}
