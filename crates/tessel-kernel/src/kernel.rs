// SPDX-License-Identifier: MIT
//
// The kernel: context, plugin registry, event bus and the tick loop.
//
// The core knows nothing about keys, focus or mice. It owns the node tree
// and the two frame buffers, and once per tick it runs
//
//   pending plugin inits → "tick" → (if dirty) layout → clear → paint →
//   diff → flush → swap
//
// Everything else arrives as a plugin subscribing to events. Handlers get
// `&mut Kernel`, so they can emit, mark dirty, install capabilities or
// request a stop without any shared-ownership plumbing.
//
// `run()` is the blocking driver. Bytes from the reader thread come in over
// a channel with `recv_timeout` bounded by the next tick deadline, so input
// is decoded the moment it arrives while the frame rate stays fixed. A tick
// with no bytes since the previous one emits "input:idle", which is what
// resolves a lone ESC into the Escape key.

use std::io::Write;
use std::rc::Rc;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread;
use std::time::Instant;

use tessel_layout::{LayoutEngine, NodeId, Size};
use tessel_term::buffer::FrameBuffer;
use tessel_term::reader::ByteReader;
use tessel_term::{Cell, DiffRenderer, RenderStats, Terminal, TerminalModes, signal};

use crate::bus::{Bus, HandlerId};
use crate::clock::Clock;
use crate::config::{InputSource, KernelConfig, KernelIo};
use crate::context::Context;
use crate::error::{KernelError, Result};
use crate::event::{self, Payload};
use crate::plugin::Plugin;
use crate::render::{self, Painted};

/// Where the kernel is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Created,
    Running,
    Stopped,
}

/// ```
/// use tessel_kernel::{Kernel, KernelConfig, KernelIo};
/// use tessel_kernel::widgets::Label;
/// use tessel_layout::Size;
///
/// let io = KernelIo::headless(Box::new(Vec::new()), Size::new(20, 2));
/// let mut kernel = Kernel::new(KernelConfig::default(), io)?;
/// let root = kernel.root();
/// kernel.context_mut().append(root, Label::new("hello"))?;
///
/// kernel.start()?;
/// let first = kernel.tick()?;
/// assert!(first.is_some_and(|stats| stats.cells_rendered > 0));
/// // Nothing changed, so nothing is laid out, painted or written.
/// assert!(kernel.tick()?.is_none());
/// assert_eq!(kernel.frame().row_text(0).trim_end(), "hello");
/// kernel.stop()?;
/// # Ok::<(), tessel_kernel::KernelError>(())
/// ```
pub struct Kernel {
    config: KernelConfig,
    context: Context,
    bus: Bus<Self>,
    plugins: Vec<Box<dyn Plugin>>,
    pending_init: Vec<usize>,

    engine: LayoutEngine,
    renderer: DiffRenderer,
    previous: FrameBuffer,
    current: FrameBuffer,
    output: Box<dyn Write>,

    input: Option<InputSource>,
    reader: Option<ByteReader>,
    rx: Option<Receiver<Vec<u8>>>,
    terminal: Option<Terminal>,
    signals: bool,

    clock: Clock,
    state: State,
    stop_requested: bool,
    handling_error: bool,
}

impl Kernel {
    /// # Errors
    ///
    /// [`KernelError::Buffer`] if `io.size` is too large for a frame buffer.
    pub fn new(config: KernelConfig, io: KernelIo) -> Result<Self> {
        let KernelIo {
            output,
            input,
            size,
            terminal,
        } = io;
        let previous = FrameBuffer::new(size.width, size.height)?;
        let current = FrameBuffer::new(size.width, size.height)?;
        let size = Size::new(previous.width(), previous.height());

        Ok(Self {
            context: Context::new(config.theme, size),
            bus: Bus::new(),
            plugins: Vec::new(),
            pending_init: Vec::new(),
            engine: LayoutEngine::new(),
            renderer: DiffRenderer::new().with_synchronized_output(config.synchronized_output),
            previous,
            current,
            output,
            input: Some(input),
            reader: None,
            rx: None,
            terminal: terminal.then(Terminal::new),
            signals: false,
            clock: Clock::new(config.tick_interval(), Instant::now()),
            state: State::Created,
            stop_requested: false,
            handling_error: false,
            config,
        })
    }

    // ─── Plugins ─────────────────────────────────────────────────────────

    /// Install a plugin. Its `init` runs at `start`, or on the next tick
    /// when the kernel is already running.
    ///
    /// # Errors
    ///
    /// [`KernelError::DuplicatePlugin`], [`KernelError::MissingDependency`],
    /// or [`KernelError::Plugin`] when `install` itself fails. In every case
    /// the plugin is not registered.
    pub fn use_plugin(&mut self, mut plugin: impl Plugin + 'static) -> Result<&mut Self> {
        let name = plugin.name().to_owned();
        if self.has_plugin(&name) {
            return Err(KernelError::DuplicatePlugin { name });
        }
        if let Some(missing) = plugin.dependencies().iter().find(|dep| !self.has_plugin(dep)) {
            return Err(KernelError::MissingDependency {
                plugin: name,
                dependency: (*missing).to_owned(),
            });
        }

        plugin.install(self).map_err(|source| KernelError::Plugin {
            plugin: name.clone(),
            hook: "install",
            source,
        })?;
        tracing::debug!(plugin = %name, version = plugin.version(), "plugin installed");

        self.pending_init.push(self.plugins.len());
        self.plugins.push(Box::new(plugin));
        Ok(self)
    }

    #[must_use]
    pub fn has_plugin(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p.name() == name)
    }

    /// Installed plugin names, in installation order.
    pub fn plugin_names(&self) -> impl Iterator<Item = &str> {
        self.plugins.iter().map(|p| p.name())
    }

    fn run_pending_inits(&mut self) {
        let pending = std::mem::take(&mut self.pending_init);
        for index in pending {
            let Some(plugin) = self.plugins.get_mut(index) else {
                continue;
            };
            if let Err(source) = plugin.init(&mut self.context) {
                let plugin = plugin.name().to_owned();
                self.report_error(KernelError::Plugin {
                    plugin,
                    hook: "init",
                    source,
                });
            }
        }
    }

    // ─── Events ──────────────────────────────────────────────────────────

    /// Subscribe to `event`. Handlers run in subscription order.
    pub fn on<F>(&mut self, event: &str, handler: F) -> HandlerId
    where
        F: Fn(&mut Self, &Payload) -> anyhow::Result<()> + 'static,
    {
        self.bus.on(event, handler)
    }

    /// Subscribe for the next emission of `event` only.
    pub fn once<F>(&mut self, event: &str, handler: F) -> HandlerId
    where
        F: Fn(&mut Self, &Payload) -> anyhow::Result<()> + 'static,
    {
        self.bus.once(event, handler)
    }

    /// Unsubscribe. Returns `false` if the handler was already gone.
    pub fn off(&mut self, id: HandlerId) -> bool {
        self.bus.off(id)
    }

    #[must_use]
    pub fn has_handlers(&self, event: &str) -> bool {
        self.bus.has_handlers(event)
    }

    /// Run every handler subscribed to `event` when the call is made.
    /// Subscriptions changed by a handler take effect from the next
    /// emission. A failing handler is reported and the rest still run.
    ///
    /// Returns how many handlers ran.
    pub fn emit(&mut self, event: &str, payload: &Payload) -> usize {
        let handlers = self.bus.snapshot(event);
        for handler in &handlers {
            if let Err(source) = handler(&mut *self, payload) {
                if event == event::ERROR {
                    tracing::warn!(error = %format!("{source:#}"), "error handler failed");
                } else {
                    self.report_error(KernelError::Handler {
                        event: event.to_owned(),
                        source,
                    });
                }
            }
        }
        handlers.len()
    }

    /// Deliver an isolated failure: log it, hand it to every plugin's
    /// `on_error`, then emit it on `"error"`.
    pub fn report_error(&mut self, error: KernelError) {
        tracing::warn!(error = %error_chain(&error), "isolated failure");
        for plugin in &mut self.plugins {
            plugin.on_error(&error);
        }
        if self.handling_error {
            return;
        }
        self.handling_error = true;
        self.emit(event::ERROR, &Payload::Error(Rc::new(error)));
        self.handling_error = false;
    }

    // ─── Context ─────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.context
    }

    #[inline]
    pub const fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    #[inline]
    #[must_use]
    pub const fn config(&self) -> &KernelConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.context.root()
    }

    /// Register a named capability on the context.
    pub fn provide<T: std::any::Any>(&mut self, name: &str, value: Rc<T>) {
        self.context.provide(name, value);
    }

    /// # Errors
    ///
    /// [`KernelError::CapabilityMissing`] or [`KernelError::CapabilityType`].
    pub fn capability<T: std::any::Any>(&self, name: &str) -> Result<Rc<T>> {
        self.context.capability(name)
    }

    /// Request a repaint on the next tick.
    pub const fn mark_dirty(&mut self) {
        self.context.mark_dirty();
    }

    /// Deepest visible node containing the screen point.
    #[must_use]
    pub fn hit_test(&self, x: u16, y: u16) -> Option<NodeId> {
        self.context.hit_test(x, y)
    }

    /// The most recently flushed frame.
    #[inline]
    #[must_use]
    pub const fn frame(&self) -> &FrameBuffer {
        &self.previous
    }

    #[inline]
    #[must_use]
    pub const fn state(&self) -> State {
        self.state
    }

    /// End `run()` once the current tick finishes.
    pub const fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    #[inline]
    #[must_use]
    pub const fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Acquire the terminal (when owned), start the input reader, run
    /// pending inits and emit `"start"`. No-op while running.
    ///
    /// # Errors
    ///
    /// Terminal or signal setup failures, or failing to spawn the reader.
    /// The terminal is restored before returning an error.
    pub fn start(&mut self) -> Result<()> {
        if self.state == State::Running {
            return Ok(());
        }
        if let Err(e) = self.acquire() {
            self.release();
            return Err(e);
        }

        self.state = State::Running;
        self.stop_requested = false;
        self.clock = Clock::new(self.config.tick_interval(), Instant::now());
        self.renderer.force_redraw();
        self.context.mark_dirty();
        tracing::debug!(fps = self.config.fps(), plugins = self.plugins.len(), "kernel started");

        self.run_pending_inits();
        self.emit(event::START, &Payload::None);
        Ok(())
    }

    fn acquire(&mut self) -> Result<()> {
        if let Some(term) = &mut self.terminal {
            term.enter(TerminalModes {
                alt_screen: self.config.fullscreen,
                mouse: self.config.mouse,
                bracketed_paste: true,
                focus_reporting: true,
            })?;
            if self.config.handle_signals {
                signal::install()?;
                self.signals = true;
            }
            let size = term.refresh_size();
            let size = Size::new(size.cols, size.rows);
            if size != self.context.size() {
                self.resize(size)?;
            }
        }

        let (reader, rx) = match self.input.take() {
            Some(InputSource::Stdin) => ByteReader::stdin()?,
            Some(InputSource::Reader(source)) => ByteReader::spawn(source)?,
            Some(InputSource::None) | None => return Ok(()),
        };
        self.reader = Some(reader);
        self.rx = Some(rx);
        Ok(())
    }

    /// Stop the reader and restore the terminal. Safe to call twice.
    fn release(&mut self) -> Option<std::io::Error> {
        if let Some(mut reader) = self.reader.take() {
            reader.stop();
        }
        self.rx = None;
        self.signals = false;
        self.terminal.as_mut().and_then(|term| term.leave().err())
    }

    /// Emit `"stop"`, destroy plugins newest first and release the terminal.
    /// No-op unless running.
    ///
    /// # Errors
    ///
    /// Only a failure to restore the terminal. Destroy failures are
    /// reported through the error channel.
    pub fn stop(&mut self) -> Result<()> {
        if self.state != State::Running {
            return Ok(());
        }
        self.emit(event::STOP, &Payload::None);

        for index in (0..self.plugins.len()).rev() {
            if let Err(source) = self.plugins[index].destroy(&mut self.context) {
                let plugin = self.plugins[index].name().to_owned();
                self.report_error(KernelError::Plugin {
                    plugin,
                    hook: "destroy",
                    source,
                });
            }
        }

        self.state = State::Stopped;
        let restored = self.release();
        tracing::debug!(ticks = self.clock.ticks(), "kernel stopped");
        restored.map_or(Ok(()), |e| Err(e.into()))
    }

    /// Start, loop until stopped, then stop. The terminal is restored even
    /// when the loop fails.
    ///
    /// The loop ends on [`request_stop`](Self::request_stop), a termination
    /// signal, or the input source reaching EOF.
    ///
    /// # Errors
    ///
    /// The first fatal error from the loop (layout, buffer or output
    /// failures), otherwise any error from `start` or `stop`.
    pub fn run(&mut self) -> Result<()> {
        self.start()?;
        let result = self.run_loop();
        if let Err(e) = &result {
            tracing::error!(error = %error_chain(e), "run loop failed");
        }
        let stopped = self.stop();
        result.and(stopped)
    }

    fn run_loop(&mut self) -> Result<()> {
        let mut received = false;
        loop {
            if self.stop_requested {
                return Ok(());
            }

            let wait = self.clock.until_next(Instant::now());
            match self.rx.as_ref().map(|rx| rx.recv_timeout(wait)) {
                Some(Ok(bytes)) => {
                    received = true;
                    self.feed(&bytes);
                }
                Some(Err(RecvTimeoutError::Timeout)) => {}
                Some(Err(RecvTimeoutError::Disconnected)) => {
                    tracing::debug!("input closed");
                    self.rx = None;
                    self.emit(event::INPUT_IDLE, &Payload::None);
                    self.tick()?;
                    return Ok(());
                }
                None => thread::sleep(wait),
            }

            if self.signals {
                if signal::take_terminate() {
                    tracing::debug!("termination signal");
                    return Ok(());
                }
                if signal::take_resize() {
                    if let Some(term) = &mut self.terminal {
                        let size = term.refresh_size();
                        self.resize(Size::new(size.cols, size.rows))?;
                    }
                }
            }

            let now = Instant::now();
            if self.clock.is_due(now) {
                if !received {
                    self.emit(event::INPUT_IDLE, &Payload::None);
                }
                received = false;
                self.tick()?;
                self.clock.advance(now);
            }
        }
    }

    // ─── Frame ───────────────────────────────────────────────────────────

    /// One tick. Returns the frame statistics, or `None` when nothing was
    /// dirty and no work was done.
    ///
    /// # Errors
    ///
    /// Layout failures, a mismatched frame, or writing to the output sink.
    /// Render and handler failures are reported, not returned.
    pub fn tick(&mut self) -> Result<Option<RenderStats>> {
        self.run_pending_inits();
        self.emit(event::TICK, &Payload::None);
        if !self.context.is_dirty() {
            return Ok(None);
        }

        let root = self.context.root();
        let size = self.context.size();
        self.engine.compute(self.context.tree_mut(), root, size)?;

        let base = self.context.theme().base_style();
        self.current.clear();
        if !base.is_default() {
            let (w, h) = (i32::from(self.current.width()), i32::from(self.current.height()));
            self.current.fill(0, 0, w, h, Cell::blank(base));
        }
        let Painted { nodes, failures } = render::paint(
            self.context.tree(),
            root,
            &mut self.current,
            base,
            self.context.focused(),
        );

        let stats = self.renderer.render(&self.previous, &self.current)?;
        self.renderer.flush_to(self.output.as_mut())?;
        self.output.flush()?;
        std::mem::swap(&mut self.previous, &mut self.current);
        self.context.mark_clean();

        tracing::trace!(
            nodes,
            cells = stats.cells_rendered,
            runs = stats.runs,
            bytes = stats.bytes_written,
            "frame"
        );
        for failure in failures {
            self.report_error(failure);
        }
        Ok(Some(stats))
    }

    /// Inject input bytes as a `"data"` emission.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.emit(event::DATA, &Payload::from(bytes));
    }

    /// Resize both frames, keeping their overlap, and force a full redraw.
    ///
    /// # Errors
    ///
    /// [`KernelError::Buffer`] if the size is too large; nothing changes.
    pub fn resize(&mut self, size: Size) -> Result<()> {
        let mut previous = self.previous.clone();
        previous.resize(size.width, size.height)?;
        self.current.resize(size.width, size.height)?;
        self.previous = previous;

        let size = Size::new(self.previous.width(), self.previous.height());
        self.renderer.force_redraw();
        self.context.set_size(size);
        tracing::debug!(width = size.width, height = size.height, "resize");
        self.emit(event::RESIZE, &Payload::Resize(size));
        Ok(())
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("state", &self.state)
            .field("plugins", &self.plugin_names().collect::<Vec<_>>())
            .field("context", &self.context)
            .field("ticks", &self.clock.ticks())
            .finish_non_exhaustive()
    }
}

/// `error: cause: cause` on one line.
fn error_chain(error: &KernelError) -> String {
    let mut out = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
