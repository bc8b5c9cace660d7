// SPDX-License-Identifier: MIT
//
// Subscriber table for named events.
//
// The bus only stores handlers; dispatch lives with whoever owns the bus,
// because handlers take that owner mutably. An emission starts by taking a
// `snapshot`: the handlers in registration order, copied out of the table.
// Handlers added or removed while the snapshot runs affect the next
// emission, never the current one. One-shot handlers leave the table as
// soon as they are snapshotted, so they fire at most once even if the
// event is re-emitted from inside a handler.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::event::Payload;

/// A subscriber callback. `C` is the bus owner, handed to every call.
pub type Handler<C> = Rc<dyn Fn(&mut C, &Payload) -> anyhow::Result<()>>;

/// Returned by `on`/`once`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

struct Subscriber<C> {
    id: HandlerId,
    handler: Handler<C>,
    once: bool,
}

pub struct Bus<C> {
    next_id: u64,
    table: HashMap<String, Vec<Subscriber<C>>>,
}

impl<C> Bus<C> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 0,
            table: HashMap::new(),
        }
    }

    /// Subscribe `handler` to `event`, after any existing subscribers.
    pub fn on<F>(&mut self, event: &str, handler: F) -> HandlerId
    where
        F: Fn(&mut C, &Payload) -> anyhow::Result<()> + 'static,
    {
        self.subscribe(event, Rc::new(handler), false)
    }

    /// Like [`on`](Self::on), but the handler is removed after its first
    /// call.
    pub fn once<F>(&mut self, event: &str, handler: F) -> HandlerId
    where
        F: Fn(&mut C, &Payload) -> anyhow::Result<()> + 'static,
    {
        self.subscribe(event, Rc::new(handler), true)
    }

    fn subscribe(&mut self, event: &str, handler: Handler<C>, once: bool) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.table
            .entry(event.to_owned())
            .or_default()
            .push(Subscriber { id, handler, once });
        id
    }

    /// Unsubscribe. Returns `false` if `id` was already gone.
    pub fn off(&mut self, id: HandlerId) -> bool {
        let mut found = false;
        self.table.retain(|_, subs| {
            if let Some(pos) = subs.iter().position(|s| s.id == id) {
                subs.remove(pos);
                found = true;
            }
            !subs.is_empty()
        });
        found
    }

    /// The handlers to run for one emission of `event`, in order.
    pub fn snapshot(&mut self, event: &str) -> Vec<Handler<C>> {
        let Some(subs) = self.table.get_mut(event) else {
            return Vec::new();
        };
        let out = subs.iter().map(|s| Rc::clone(&s.handler)).collect();
        subs.retain(|s| !s.once);
        if subs.is_empty() {
            self.table.remove(event);
        }
        out
    }

    #[must_use]
    pub fn handler_count(&self, event: &str) -> usize {
        self.table.get(event).map_or(0, Vec::len)
    }

    #[must_use]
    pub fn has_handlers(&self, event: &str) -> bool {
        self.handler_count(event) > 0
    }

    /// Drop every subscription.
    pub fn clear(&mut self) {
        self.table.clear();
    }
}

impl<C> Default for Bus<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for Bus<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut events: Vec<_> = self.table.iter().map(|(k, v)| (k.as_str(), v.len())).collect();
        events.sort_unstable();
        f.debug_struct("Bus").field("events", &events).finish()
    }
}
