// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Background input reader.
//
// Reads block, and the kernel's loop has to keep ticking, so the reads move
// onto a named thread that sends byte chunks over a channel. The loop waits
// on the channel with `recv_timeout` until its next deadline.
//
// Two flavours:
//
//   ByteReader::stdin() polls fd 0 with a short timeout and checks a stop
//   flag between polls, so `stop()` returns promptly and joins the thread.
//
//   ByteReader::spawn(reader) works over any `Read + Send`. A plain reader
//   can't be interrupted mid-read; `stop()` raises the flag and lets the
//   thread go if it is still blocked. It exits on its next read or at EOF.

use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

const READ_BUF_SIZE: usize = 4096;

/// How long each poll of stdin waits before rechecking the stop flag.
#[cfg(unix)]
const POLL_TIMEOUT_MS: i32 = 50;

/// Handle to a reader thread. Stops the thread on drop.
///
/// ```no_run
/// use tessel_term::reader::ByteReader;
///
/// let (reader, rx) = ByteReader::stdin()?;
/// while let Ok(chunk) = rx.recv() {
///     println!("{} bytes", chunk.len());
/// }
/// drop(reader);
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct ByteReader {
    handle: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
    interruptible: bool,
}

impl ByteReader {
    /// Read the process's standard input.
    ///
    /// # Errors
    ///
    /// Fails if the OS refuses to spawn the thread.
    pub fn stdin() -> io::Result<(Self, Receiver<Vec<u8>>)> {
        Self::start("tessel-stdin", true, stdin_loop)
    }

    /// Read from an arbitrary source until EOF, an error, or `stop()`.
    ///
    /// # Errors
    ///
    /// Fails if the OS refuses to spawn the thread.
    pub fn spawn<R>(mut source: R) -> io::Result<(Self, Receiver<Vec<u8>>)>
    where
        R: Read + Send + 'static,
    {
        Self::start("tessel-input", false, move |tx, stop| {
            read_loop(&mut source, &tx, &stop);
        })
    }

    fn start<F>(name: &str, interruptible: bool, body: F) -> io::Result<(Self, Receiver<Vec<u8>>)>
    where
        F: FnOnce(Sender<Vec<u8>>, Arc<AtomicBool>) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || body(tx, flag))?;
        Ok((
            Self {
                handle: Some(handle),
                stop,
                interruptible,
            },
            rx,
        ))
    }

    /// Ask the thread to exit. Idempotent.
    ///
    /// Joins the thread when it can exit on its own schedule (stdin, or a
    /// source that already finished); otherwise detaches it.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if self.interruptible || handle.is_finished() {
                let _ = handle.join();
            }
        }
    }

    /// Whether the thread has exited (EOF, error, or stop).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for ByteReader {
    fn drop(&mut self) {
        self.stop();
    }
}

fn read_loop(source: &mut impl Read, tx: &Sender<Vec<u8>>, stop: &AtomicBool) {
    let mut buf = [0u8; READ_BUF_SIZE];
    while !stop.load(Ordering::Relaxed) {
        match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                tracing::debug!(error = %e, "input source failed");
                break;
            }
        }
    }
}

#[cfg(unix)]
#[allow(clippy::needless_pass_by_value)] // moved into the thread
fn stdin_loop(tx: Sender<Vec<u8>>, stop: Arc<AtomicBool>) {
    use std::os::unix::io::AsRawFd;

    let fd = io::stdin().as_raw_fd();
    let mut buf = [0u8; READ_BUF_SIZE];

    while !stop.load(Ordering::Relaxed) {
        let mut pfd = libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        };
        // SAFETY: pfd is a valid pollfd for the duration of the call.
        let ready = unsafe { libc::poll(&raw mut pfd, 1, POLL_TIMEOUT_MS) };
        if ready <= 0 {
            continue;
        }

        // SAFETY: buf is a live, writable buffer of buf.len() bytes.
        let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
        let Ok(n) = usize::try_from(n) else {
            break;
        };
        if n == 0 || tx.send(buf[..n].to_vec()).is_err() {
            break;
        }
    }
}

#[cfg(not(unix))]
#[allow(clippy::needless_pass_by_value)]
fn stdin_loop(tx: Sender<Vec<u8>>, stop: Arc<AtomicBool>) {
    read_loop(&mut io::stdin(), &tx, &stop);
}

// ─── Tests ───────────────────────────────────────────────────────────────────
