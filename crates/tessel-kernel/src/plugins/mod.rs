// SPDX-License-Identifier: MIT
//
// Built-in plugins.
//
// `InputPlugin` turns raw `"data"` bytes into key, mouse, paste and focus
// events. `FocusPlugin` and `MousePlugin` both depend on it and route those
// events into the node tree. Install input first:
//
//     kernel.use_plugin(InputPlugin::new())?
//           .use_plugin(FocusPlugin::new())?
//           .use_plugin(MousePlugin::new())?;

pub mod focus;
pub mod input;
pub mod mouse;

pub use focus::{Focus, FocusPlugin};
pub use input::InputPlugin;
pub use mouse::{MousePlugin, Pointer};

use tessel_layout::NodeId;

use crate::kernel::Kernel;

/// `id` followed by its ancestors up to the root.
fn bubble_path(kernel: &Kernel, id: NodeId) -> Vec<NodeId> {
    std::iter::once(id)
        .chain(kernel.context().tree().ancestors(id))
        .collect()
}
