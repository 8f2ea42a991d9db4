//! Payload event queue.
//!
//! Entries carry a ready time. A consumer waits on the queue's event and then
//! drains every entry whose time has come with `next_ready()`. Entries with
//! the same ready time come out in insertion order.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::time::Duration;

use super::event::{Event, EventWait};
use super::kernel::SimHandle;

pub struct PayloadEventQueue<P> {
    sim: SimHandle,
    event: Event,
    entries: RefCell<BTreeMap<(Duration, u64), P>>,
    next_seq: Cell<u64>,
}

impl<P> PayloadEventQueue<P> {
    pub fn new(name: impl Into<String>, sim: &SimHandle) -> Self {
        Self {
            sim: sim.clone(),
            event: Event::new(name, sim),
            entries: RefCell::new(BTreeMap::new()),
            next_seq: Cell::new(0),
        }
    }

    /// Queue `payload` to become ready after `delay`.
    pub fn notify(&self, payload: P, delay: Duration) {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        let at = self.sim.now() + delay;
        self.entries.borrow_mut().insert((at, seq), payload);
        self.event.notify(delay);
    }

    /// Pop the earliest entry whose ready time has been reached.
    ///
    /// When only future entries remain, the event is re-armed for the
    /// earliest of them so a busy consumer does not miss it.
    pub fn next_ready(&self) -> Option<P> {
        let now = self.sim.now();
        let mut entries = self.entries.borrow_mut();
        let &(at, _) = entries.keys().next()?;
        if at <= now {
            entries.pop_first().map(|(_, payload)| payload)
        } else {
            drop(entries);
            self.event.notify(at - now);
            None
        }
    }

    /// Suspend until some entry becomes ready.
    pub fn wait(&self) -> EventWait {
        self.event.wait()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}
