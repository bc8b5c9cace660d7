// SPDX-License-Identifier: MIT
//
// Raw bytes in, structured events out.
//
// The decoder keeps partial escape sequences between `"data"` emissions, so
// a sequence split across two reads still yields one event. A tick with no
// new bytes emits `"input:idle"`, which flushes whatever is still pending.

use std::cell::RefCell;
use std::rc::Rc;

use tessel_term::{Event, InputDecoder};

use crate::event::{self, Payload};
use crate::kernel::Kernel;
use crate::plugin::Plugin;

#[derive(Debug, Default)]
pub struct InputPlugin {
    decoder: Rc<RefCell<InputDecoder>>,
}

impl InputPlugin {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Plugin for InputPlugin {
    fn name(&self) -> &str {
        "input"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn install(&mut self, kernel: &mut Kernel) -> anyhow::Result<()> {
        let decoder = Rc::clone(&self.decoder);
        kernel.on(event::DATA, move |k: &mut Kernel, payload: &Payload| {
            if let Some(bytes) = payload.bytes() {
                // The borrow ends before dispatch, so handlers may feed again.
                let events = decoder.borrow_mut().feed(bytes);
                dispatch(k, events);
            }
            Ok(())
        });

        let decoder = Rc::clone(&self.decoder);
        kernel.on(event::INPUT_IDLE, move |k: &mut Kernel, _: &Payload| {
            let events = decoder.borrow_mut().flush();
            dispatch(k, events);
            Ok(())
        });
        Ok(())
    }
}

fn dispatch(kernel: &mut Kernel, events: Vec<Event>) {
    for ev in events {
        match ev {
            Event::Key(key) => {
                if key.is_ctrl('c') && kernel.config().exit_on_ctrl_c {
                    tracing::debug!("ctrl+c");
                    kernel.request_stop();
                }
                kernel.emit(event::KEY, &Payload::Key(key));
            }
            Event::Mouse(mouse) => {
                kernel.emit(event::MOUSE, &Payload::Mouse(mouse));
            }
            Event::Paste(text) => {
                kernel.emit(event::PASTE, &Payload::Paste(Rc::from(text)));
            }
            Event::FocusGained => {
                kernel.emit(event::FOCUS_IN, &Payload::None);
            }
            Event::FocusLost => {
                kernel.emit(event::FOCUS_OUT, &Payload::None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tessel_term::{KeyCode, KeyEvent, Modifiers, MouseAction};

    use crate::plugins::testing::headless;

    fn recording(kernel: &mut Kernel) -> Rc<RefCell<Vec<String>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        for name in [event::KEY, event::MOUSE, event::PASTE, event::FOCUS_IN, event::FOCUS_OUT] {
            let log = Rc::clone(&log);
            kernel.on(name, move |_: &mut Kernel, p: &Payload| {
                let entry = match p {
                    Payload::Key(k) => format!("key {k}"),
                    Payload::Mouse(m) => format!("mouse {:?} {},{}", m.action, m.x, m.y),
                    Payload::Paste(s) => format!("paste {s}"),
                    _ => name.to_owned(),
                };
                log.borrow_mut().push(entry);
                Ok(())
            });
        }
        log
    }

    fn kernel() -> (Kernel, Rc<RefCell<Vec<String>>>) {
        let mut k = headless(10, 2);
        k.use_plugin(InputPlugin::new()).unwrap();
        let log = recording(&mut k);
        (k, log)
    }

    // ── Decoding ────────────────────────────────────────────────

    #[test]
    fn split_arrow_yields_one_key() {
        let (mut k, log) = kernel();
        k.feed(b"\x1b[");
        assert!(log.borrow().is_empty());
        k.feed(b"A");
        assert_eq!(*log.borrow(), ["key Up"]);
    }

    #[test]
    fn idle_resolves_a_lone_escape() {
        let (mut k, log) = kernel();
        k.feed(b"\x1b");
        assert!(log.borrow().is_empty());
        k.emit(event::INPUT_IDLE, &Payload::None);
        assert_eq!(*log.borrow(), ["key Escape"]);
        k.emit(event::INPUT_IDLE, &Payload::None);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn idle_recovers_from_a_paste_that_never_closes() {
        let (mut k, log) = kernel();
        k.feed(b"\x1b[200~lost");
        k.emit(event::INPUT_IDLE, &Payload::None);
        assert!(log.borrow().is_empty());
        k.emit(event::INPUT_IDLE, &Payload::None);
        k.feed(b"\x1b[Aq");
        assert_eq!(*log.borrow(), ["paste lost", "key Up", "key q"]);
    }

    #[test]
    fn mouse_paste_and_focus_reports_are_routed() {
        let (mut k, log) = kernel();
        k.feed(b"\x1b[<0;5;3M\x1b[200~hi\x1b[201~\x1b[I\x1b[O");
        assert_eq!(
            *log.borrow(),
            ["mouse Press 4,2", "paste hi", event::FOCUS_IN, event::FOCUS_OUT]
        );
    }

    #[test]
    fn handlers_see_decoded_payloads() {
        let mut k = headless(4, 1);
        k.use_plugin(InputPlugin::new()).unwrap();
        let got = Rc::new(RefCell::new(Vec::new()));
        let g = Rc::clone(&got);
        k.on(event::KEY, move |_: &mut Kernel, p: &Payload| {
            g.borrow_mut().extend(p.key().copied());
            Ok(())
        });
        k.on(event::MOUSE, |_: &mut Kernel, p: &Payload| {
            assert!(p.mouse().is_some_and(|m| m.action == MouseAction::ScrollUp));
            Ok(())
        });
        k.feed(b"\x1b[Z\x1b[<64;1;1M");
        assert_eq!(*got.borrow(), [KeyEvent::new(KeyCode::Tab, Modifiers::SHIFT)]);
    }

    // ── Ctrl+C ──────────────────────────────────────────────────

    #[test]
    fn ctrl_c_requests_stop_and_is_still_delivered() {
        let (mut k, log) = kernel();
        k.feed(b"\x03");
        assert!(k.stop_requested());
        assert_eq!(*log.borrow(), ["key Ctrl+c"]);
    }

    #[test]
    fn ctrl_c_is_just_a_key_when_disabled() {
        let io = crate::config::KernelIo::headless(Box::new(std::io::sink()), tessel_layout::Size::new(4, 1));
        let config = crate::config::KernelConfig {
            exit_on_ctrl_c: false,
            ..Default::default()
        };
        let mut k = Kernel::new(config, io).unwrap();
        k.use_plugin(InputPlugin::new()).unwrap();
        k.feed(b"\x03");
        assert!(!k.stop_requested());
    }

    #[test]
    fn a_handler_may_feed_more_input() {
        let (mut k, log) = kernel();
        k.once(event::KEY, |k: &mut Kernel, _: &Payload| {
            k.feed(b"y");
            Ok(())
        });
        k.feed(b"x");
        // The recorder was subscribed first, so it sees "x" before the nested feed.
        assert_eq!(*log.borrow(), ["key x", "key y"]);
    }
}
