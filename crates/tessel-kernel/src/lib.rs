// SPDX-License-Identifier: MIT
//
// tessel-kernel: the micro-kernel that drives a tessel application.
//
// A `Kernel` owns a `Context` (node tree, focus slot, theme, screen size
// and capability registry), an event bus, and the plugin registry. Each
// tick it lays out the tree with `tessel-layout`, paints the visible nodes
// into a frame, diffs that against the previous frame with `tessel-term`
// and flushes the difference to its output sink.
//
// Input handling, focus and mouse routing are not part of the core. They
// are ordinary plugins in `plugins`, built on the same `Plugin` and event
// API an application uses.

pub mod bus;
pub mod capability;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod kernel;
pub mod plugin;
pub mod plugins;
pub mod render;
pub mod theme;
pub mod widget;
pub mod widgets;

pub use bus::HandlerId;
pub use config::{InputSource, KernelConfig, KernelIo};
pub use context::Context;
pub use error::{KernelError, Result};
pub use event::Payload;
pub use kernel::{Kernel, State};
pub use plugin::Plugin;
pub use theme::Theme;
pub use widget::{Canvas, NodeTree, Widget};
