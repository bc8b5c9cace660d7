// SPDX-License-Identifier: MIT
//
// tessel: a small live dashboard built on the tessel kernel.
//
// It wires every crate together: the kernel owns the terminal and the tick
// loop, the built-in plugins decode input and route focus and mouse events,
// and a `Dashboard` plugin builds the node tree and keeps it current.
//
//   ┌──────────────────────────────────────────┐
//   │              tessel dashboard            │  ← header, 1 row
//   │ ╭ Alpha ─╮ ╭ Beta ──╮ ╭ Gamma ─╮         │
//   │ │   0    │ │   0    │ │   0    │         │  ← counters, flex 1
//   │ ╰────────╯ ╰────────╯ ╰────────╯         │
//   │ Tab focus · +/- adjust · q quit  up 12s  │  ← footer, 1 row
//   └──────────────────────────────────────────┘
//
// Environment:
//
//   TESSEL_LOG     file to write logs to; no logging without it, since
//                  stdout carries the frames
//   TESSEL_CONFIG  TOML file with kernel settings and theme
//   RUST_LOG       filter directives (default "tessel=info")

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;
use std::time::Instant;

use anyhow::Context as _;
use tessel_kernel::event::{self, Payload};
use tessel_kernel::plugins::{FocusPlugin, InputPlugin, MousePlugin};
use tessel_kernel::widgets::{Label, Panel, TextAlign};
use tessel_kernel::{Canvas, Kernel, KernelConfig, KernelIo, Plugin, Widget};
use tessel_layout::{Dimension, Direction, Edges, Measure, NodeId, Size};
use tessel_term::buffer::{BorderSet, string_width};
use tessel_term::{Attr, KeyCode, MouseAction, MouseEvent, Style};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// ─── Counter ─────────────────────────────────────────────────────────────────

/// A focusable card showing a number. `+`/`-` or the arrow keys change it
/// while focused; the wheel changes it under the pointer.
struct Counter {
    frame: Panel,
    value: i64,
    accent: Style,
}

impl Counter {
    fn new(title: &str, frame: Panel, accent: Style) -> Self {
        Self {
            frame: frame.title(title).focusable(true),
            value: 0,
            accent,
        }
    }

    const fn bump(&mut self, by: i64) -> bool {
        self.value = self.value.saturating_add(by);
        true
    }
}

impl Measure for Counter {
    fn measure(&self, _available: Size) -> Size {
        Size::new(10, 3)
    }
}

impl Widget for Counter {
    fn kind(&self) -> &'static str {
        "counter"
    }

    fn render(&self, canvas: &mut Canvas<'_>, style: Style) -> anyhow::Result<()> {
        self.frame.render(canvas, style)?;
        let text = self.value.to_string();
        let width = i32::try_from(string_width(&text)).unwrap_or(i32::MAX);
        let x = (i32::from(canvas.width()) - width) / 2;
        let y = i32::from(canvas.height()) / 2;
        let value_style = if canvas.is_focused() {
            self.accent.add_attrs(Attr::BOLD)
        } else {
            self.frame.inherit(style)
        };
        canvas.write(x, y, &text, value_style);
        Ok(())
    }

    fn inherit(&self, inherited: Style) -> Style {
        self.frame.inherit(inherited)
    }

    fn focusable(&self) -> bool {
        true
    }

    fn handle_key(&mut self, key: &tessel_term::KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('+' | '=') | KeyCode::Up => self.bump(1),
            KeyCode::Char('-' | '_') | KeyCode::Down => self.bump(-1),
            KeyCode::Char('0') => {
                self.value = 0;
                true
            }
            _ => false,
        }
    }

    fn handle_mouse(&mut self, event: &MouseEvent) -> bool {
        match event.action {
            MouseAction::ScrollUp => self.bump(1),
            MouseAction::ScrollDown => self.bump(-1),
            _ => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ─── Dashboard ───────────────────────────────────────────────────────────────

const COUNTERS: [&str; 3] = ["Alpha", "Beta", "Gamma"];
const HELP: &str = "Tab focus · +/- adjust · q quit";

#[derive(Default)]
struct Dashboard {
    footer: Rc<Cell<Option<NodeId>>>,
    counters: Rc<RefCell<Vec<NodeId>>>,
}

impl Dashboard {
    fn build(&self, kernel: &mut Kernel) -> anyhow::Result<()> {
        let theme = *kernel.context().theme();
        let root = kernel.root();
        let ctx = kernel.context_mut();

        let header = ctx.append(
            root,
            Label::new("tessel dashboard")
                .style(Style::new().fg(theme.accent).attrs(Attr::BOLD))
                .align(TextAlign::Center),
        )?;
        ctx.node_mut(header)?.height(Dimension::Cells(1));

        let body = ctx.append(root, Panel::new())?;
        ctx.node_mut(body)?
            .direction(Direction::Row)
            .flex(1)
            .gap(1)
            .padding(Edges::symmetric(0, 1));

        let accent = Style::new().fg(theme.accent);
        for title in COUNTERS {
            let frame = Panel::new()
                .border(BorderSet::ROUNDED)
                .border_color(theme.border)
                .focus_color(theme.accent);
            let id = ctx.append(body, Counter::new(title, frame, accent))?;
            ctx.node_mut(id)?.flex(1).border(true);
            self.counters.borrow_mut().push(id);
        }

        let footer = ctx.append(root, Label::new(HELP).style(Style::new().fg(theme.muted)))?;
        ctx.node_mut(footer)?.height(Dimension::Cells(1)).padding(Edges::symmetric(0, 1));
        self.footer.set(Some(footer));
        Ok(())
    }
}

impl Plugin for Dashboard {
    fn name(&self) -> &str {
        "dashboard"
    }

    fn dependencies(&self) -> &[&str] {
        &["input", "focus"]
    }

    fn install(&mut self, kernel: &mut Kernel) -> anyhow::Result<()> {
        self.build(kernel)?;

        kernel.on(event::KEY, |k: &mut Kernel, p: &Payload| {
            if p.key().is_some_and(|key| key.code == KeyCode::Char('q') && key.modifiers.is_empty()) {
                k.request_stop();
            }
            Ok(())
        });

        let started = Rc::new(Cell::new(None::<Instant>));
        let shown = Rc::new(Cell::new(u64::MAX));
        let footer = Rc::clone(&self.footer);
        let origin = Rc::clone(&started);
        kernel.on(event::START, move |_: &mut Kernel, _: &Payload| {
            origin.set(Some(Instant::now()));
            Ok(())
        });
        kernel.on(event::TICK, move |k: &mut Kernel, _: &Payload| {
            let (Some(start), Some(id)) = (started.get(), footer.get()) else {
                return Ok(());
            };
            let secs = start.elapsed().as_secs();
            if secs == shown.get() {
                return Ok(());
            }
            shown.set(secs);
            if let Some(label) = k.context_mut().widget_mut::<Label>(id) {
                label.set_text(format!("{HELP}   up {secs}s"));
            }
            Ok(())
        });

        let counters = Rc::clone(&self.counters);
        kernel.on(event::FOCUS, move |_: &mut Kernel, p: &Payload| {
            if let Payload::Focus { current: Some(id), .. } = p {
                let index = counters.borrow().iter().position(|c| c == id);
                tracing::info!(counter = ?index.map(|i| COUNTERS[i]), "focus moved");
            }
            Ok(())
        });
        Ok(())
    }

    fn destroy(&mut self, ctx: &mut tessel_kernel::Context) -> anyhow::Result<()> {
        let values: Vec<i64> = self
            .counters
            .borrow()
            .iter()
            .filter_map(|&id| ctx.widget::<Counter>(id).map(|c| c.value))
            .collect();
        tracing::info!(?values, "final counter values");
        Ok(())
    }
}

// ─── Logging ─────────────────────────────────────────────────────────────────

/// Install a file subscriber when `TESSEL_LOG` names a file. The returned
/// guard flushes the writer on drop and must live until exit.
fn init_logging() -> anyhow::Result<Option<WorkerGuard>> {
    let Some(path) = env::var_os("TESSEL_LOG").map(PathBuf::from) else {
        return Ok(None);
    };
    let file = path
        .file_name()
        .with_context(|| format!("TESSEL_LOG={} does not name a file", path.display()))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let appender = tracing_appender::rolling::never(dir, file);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tessel=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .context("installing the log subscriber")?;
    Ok(Some(guard))
}

fn load_config() -> anyhow::Result<KernelConfig> {
    match env::var_os("TESSEL_CONFIG") {
        Some(path) => KernelConfig::load(&path)
            .with_context(|| format!("loading {}", Path::new(&path).display())),
        None => Ok(KernelConfig::default()),
    }
}

fn install(kernel: &mut Kernel) -> anyhow::Result<()> {
    kernel
        .use_plugin(InputPlugin::new())?
        .use_plugin(FocusPlugin::new())?
        .use_plugin(MousePlugin::new())?
        .use_plugin(Dashboard::default())?;
    Ok(())
}

fn run() -> anyhow::Result<()> {
    let _guard = init_logging()?;
    let config = load_config()?;
    tracing::info!(fps = config.fps(), fullscreen = config.fullscreen, "starting");

    let mut kernel = Kernel::new(config, KernelIo::terminal())?;
    install(&mut kernel)?;
    kernel.run()?;
    tracing::info!("exited cleanly");
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("tessel: {e:#}");
            ExitCode::FAILURE
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
