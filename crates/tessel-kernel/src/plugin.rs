// SPDX-License-Identifier: MIT
//
// The plugin contract.
//
// Everything beyond the bare loop is a plugin: input decoding, focus, mouse
// routing, application logic. `install` runs synchronously inside
// `Kernel::use_plugin` and usually subscribes handlers or provides
// capabilities. `init` is deferred to the next tick (or to `start`), so a
// slow or failing init never holds up installation. `destroy` runs on
// `stop`, newest plugin first.

use crate::context::Context;
use crate::error::KernelError;
use crate::kernel::Kernel;

pub trait Plugin {
    /// Unique within one kernel.
    fn name(&self) -> &str;

    fn version(&self) -> &str {
        "0.0.0"
    }

    /// Plugins that must be installed first.
    fn dependencies(&self) -> &[&str] {
        &[]
    }

    /// # Errors
    ///
    /// A failure aborts installation; the plugin is not registered.
    fn install(&mut self, kernel: &mut Kernel) -> anyhow::Result<()>;

    /// # Errors
    ///
    /// A failure is reported; the plugin stays installed.
    fn init(&mut self, _ctx: &mut Context) -> anyhow::Result<()> {
        Ok(())
    }

    /// # Errors
    ///
    /// A failure is reported and the remaining plugins are still destroyed.
    fn destroy(&mut self, _ctx: &mut Context) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called for every isolated runtime failure, from any plugin.
    fn on_error(&mut self, _error: &KernelError) {}
}
