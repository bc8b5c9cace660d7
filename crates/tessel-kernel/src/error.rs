// SPDX-License-Identifier: MIT
//
// Kernel errors.
//
// Misuse at a call site (duplicate plugin, missing dependency, unknown
// capability) comes back as `Err` from that call. Failures inside a tick
// (a handler, a widget's render, a plugin hook) never abort the tick; they
// are wrapped with the event, node or plugin involved and reported through
// `Kernel::report_error`.

use std::io;
use std::path::PathBuf;

use tessel_layout::{NodeId, TreeError};
use tessel_term::{BufferError, RenderError};

#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    #[error("plugin {name:?} is already installed")]
    DuplicatePlugin { name: String },

    #[error("plugin {plugin:?} depends on {dependency:?}, which is not installed")]
    MissingDependency { plugin: String, dependency: String },

    #[error("no capability named {name:?}; the plugin providing it is not installed")]
    CapabilityMissing { name: String },

    #[error("capability {name:?} is not a {expected}")]
    CapabilityType { name: String, expected: &'static str },

    #[error("node {0} is not in the tree")]
    UnknownNode(NodeId),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("handler for {event:?} failed")]
    Handler {
        event: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{kind} node {node} failed to render")]
    Render {
        node: NodeId,
        kind: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("plugin {plugin:?} failed in {hook}")]
    Plugin {
        plugin: String,
        hook: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("invalid config")]
    Config(#[from] toml::de::Error),

    #[error("cannot read config {}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Buffer(#[from] BufferError),

    #[error(transparent)]
    Renderer(#[from] RenderError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl KernelError {
    /// Whether this came from inside a tick rather than from a call site.
    #[must_use]
    pub const fn is_runtime(&self) -> bool {
        matches!(
            self,
            Self::Handler { .. } | Self::Render { .. } | Self::Plugin { .. }
        )
    }
}

pub type Result<T, E = KernelError> = std::result::Result<T, E>;
