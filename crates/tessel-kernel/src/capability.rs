// SPDX-License-Identifier: MIT
//
// Named capabilities plugins attach to the context at install time.
//
// A capability is any `'static` value behind an `Rc`, usually a small
// handle with interior mutability. Lookup is by name and type; asking for
// a name nobody provided, or for the wrong type, fails with an error that
// says which.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{KernelError, Result};

struct Entry {
    value: Rc<dyn Any>,
    type_name: &'static str,
}

/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use tessel_kernel::capability::Capabilities;
///
/// let mut caps = Capabilities::new();
/// caps.provide("clicks", Rc::new(Cell::new(0u32)));
///
/// let clicks = caps.get::<Cell<u32>>("clicks")?;
/// clicks.set(clicks.get() + 1);
/// assert_eq!(caps.get::<Cell<u32>>("clicks")?.get(), 1);
/// assert!(caps.get::<Cell<u32>>("scrolls").is_err());
/// # Ok::<(), tessel_kernel::KernelError>(())
/// ```
#[derive(Default)]
pub struct Capabilities {
    entries: HashMap<String, Entry>,
}

impl Capabilities {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `value` under `name`, replacing and returning whatever was
    /// there.
    pub fn provide<T: Any>(&mut self, name: &str, value: Rc<T>) -> Option<Rc<dyn Any>> {
        let entry = Entry {
            value,
            type_name: type_name::<T>(),
        };
        self.entries.insert(name.to_owned(), entry).map(|e| e.value)
    }

    /// # Errors
    ///
    /// [`KernelError::CapabilityMissing`] if nothing is registered under
    /// `name`, [`KernelError::CapabilityType`] if it isn't a `T`.
    pub fn get<T: Any>(&self, name: &str) -> Result<Rc<T>> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| KernelError::CapabilityMissing {
                name: name.to_owned(),
            })?;
        Rc::clone(&entry.value)
            .downcast::<T>()
            .map_err(|_| KernelError::CapabilityType {
                name: name.to_owned(),
                expected: type_name::<T>(),
            })
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self
            .entries
            .iter()
            .map(|(k, e)| (k.as_str(), e.type_name))
            .collect();
        names.sort_unstable();
        f.debug_map().entries(names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn wrong_type_names_the_expected_type() {
        let mut caps = Capabilities::new();
        caps.provide("n", Rc::new(1u8));
        let err = caps.get::<String>("n").unwrap_err();
        assert!(matches!(err, KernelError::CapabilityType { .. }));
        assert!(err.to_string().contains("String"), "{err}");
    }

    #[test]
    fn missing_names_the_capability() {
        let err = Capabilities::new().get::<u8>("focus").unwrap_err();
        assert_eq!(
            err.to_string(),
            "no capability named \"focus\"; the plugin providing it is not installed"
        );
    }

    #[test]
    fn handles_share_state() {
        let mut caps = Capabilities::new();
        let log = Rc::new(RefCell::new(Vec::<u8>::new()));
        caps.provide("log", Rc::clone(&log));
        caps.get::<RefCell<Vec<u8>>>("log").unwrap().borrow_mut().push(7);
        assert_eq!(*log.borrow(), [7]);
    }

    #[test]
    fn provide_replaces() {
        let mut caps = Capabilities::new();
        assert!(caps.provide("x", Rc::new(1u32)).is_none());
        assert!(caps.provide("x", Rc::new(2u32)).is_some());
        assert_eq!(*caps.get::<u32>("x").unwrap(), 2);
        assert_eq!(caps.len(), 1);
        assert!(caps.remove("x"));
        assert!(caps.is_empty());
    }
}
