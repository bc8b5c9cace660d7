// SPDX-License-Identifier: MIT
//
// Kernel configuration.
//
// `KernelConfig` is plain data, loadable from TOML, with every field
// optional. The I/O handles a kernel talks to can't be serialized and come
// separately as `KernelIo`.

use std::fmt;
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tessel_layout::Size;

use crate::error::{KernelError, Result};
use crate::theme::Theme;

pub const DEFAULT_FPS: u32 = 30;
pub const MIN_FPS: u32 = 1;
pub const MAX_FPS: u32 = 240;

// ─── KernelConfig ────────────────────────────────────────────────────────────

/// ```
/// use tessel_kernel::config::KernelConfig;
///
/// let config = KernelConfig::from_toml_str("fps = 1000\nmouse = false")?;
/// assert_eq!(config.fps(), 240);
/// assert!(!config.mouse);
/// assert!(config.fullscreen);
/// # Ok::<(), tessel_kernel::KernelError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KernelConfig {
    /// Target frame rate. Read it through [`fps`](Self::fps), which clamps.
    pub fps: u32,
    /// Use the alternate screen.
    pub fullscreen: bool,
    /// Capture mouse events.
    pub mouse: bool,
    /// Watch SIGWINCH/SIGTERM/SIGHUP while running.
    pub handle_signals: bool,
    /// Ctrl+C ends the run loop.
    pub exit_on_ctrl_c: bool,
    /// Wrap frames in DEC 2026 synchronized-output markers.
    pub synchronized_output: bool,
    pub theme: Theme,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            fullscreen: true,
            mouse: true,
            handle_signals: true,
            exit_on_ctrl_c: true,
            synchronized_output: true,
            theme: Theme::DEFAULT,
        }
    }
}

impl KernelConfig {
    /// # Errors
    ///
    /// [`KernelError::Config`] on malformed TOML, unknown keys or bad colors.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Read and parse a TOML file.
    ///
    /// # Errors
    ///
    /// [`KernelError::ConfigIo`] if the file can't be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| KernelError::ConfigIo {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Frame rate clamped to `MIN_FPS..=MAX_FPS`.
    #[inline]
    #[must_use]
    pub const fn fps(&self) -> u32 {
        if self.fps < MIN_FPS {
            MIN_FPS
        } else if self.fps > MAX_FPS {
            MAX_FPS
        } else {
            self.fps
        }
    }

    /// Time between ticks.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(1) / self.fps()
    }

    /// Builder-style setter, mostly for tests and embedding.
    #[must_use]
    pub const fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }
}

// ─── KernelIo ────────────────────────────────────────────────────────────────

/// Where the kernel reads bytes from.
pub enum InputSource {
    /// The process's stdin, read on a background thread.
    Stdin,
    /// Any byte source, read on a background thread until EOF.
    Reader(Box<dyn Read + Send>),
    /// No reader; bytes arrive only through `Kernel::feed`.
    None,
}

impl fmt::Debug for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stdin => "Stdin",
            Self::Reader(_) => "Reader(..)",
            Self::None => "None",
        })
    }
}

/// The kernel's I/O handles.
pub struct KernelIo {
    pub output: Box<dyn Write>,
    pub input: InputSource,
    /// Screen size to start with.
    pub size: Size,
    /// Whether the kernel owns the real terminal: raw mode, screen modes
    /// and signal handling are only touched when this is set.
    pub terminal: bool,
}

impl KernelIo {
    /// stdout and stdin of a real terminal.
    #[must_use]
    pub fn terminal() -> Self {
        let size = tessel_term::terminal::get_size().unwrap_or(tessel_term::Size::FALLBACK);
        Self {
            output: Box::new(io::stdout()),
            input: InputSource::Stdin,
            size: Size::new(size.cols, size.rows),
            terminal: true,
        }
    }

    /// A detached kernel writing to `output`, fed by hand.
    #[must_use]
    pub fn headless(output: Box<dyn Write>, size: Size) -> Self {
        Self {
            output,
            input: InputSource::None,
            size,
            terminal: false,
        }
    }

    /// Replace the input source.
    #[must_use]
    pub fn with_input(mut self, input: InputSource) -> Self {
        self.input = input;
        self
    }
}

impl fmt::Debug for KernelIo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelIo")
            .field("input", &self.input)
            .field("size", &self.size)
            .field("terminal", &self.terminal)
            .finish_non_exhaustive()
    }
}
