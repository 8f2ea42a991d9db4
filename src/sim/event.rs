//! Notification events.
//!
//! An `Event` carries no value. Tasks suspend on `wait()` and resume when the
//! event triggers. At most one notification is pending at a time; a new
//! notification only replaces it when it would trigger earlier.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};
use std::time::Duration;

use super::kernel::SimHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingNotify {
    at: Duration,
    token: u64,
}

struct EventCore {
    name: String,
    sim: SimHandle,
    generation: Cell<u64>,
    waiters: RefCell<Vec<Waker>>,
    pending: Cell<Option<PendingNotify>>,
    next_token: Cell<u64>,
}

impl EventCore {
    fn trigger(&self) {
        self.generation.set(self.generation.get() + 1);
        let waiters: Vec<Waker> = self.waiters.borrow_mut().drain(..).collect();
        log::trace!(
            target: "tlm_bridge::sim",
            "event '{}' triggered at {:?} ({} waiter(s))",
            self.name,
            self.sim.now(),
            waiters.len()
        );
        for waker in waiters {
            waker.wake();
        }
    }
}

/// Value-less notification shared between tasks.
#[derive(Clone)]
pub struct Event {
    core: Rc<EventCore>,
}

impl Event {
    pub fn new(name: impl Into<String>, sim: &SimHandle) -> Self {
        Self {
            core: Rc::new(EventCore {
                name: name.into(),
                sim: sim.clone(),
                generation: Cell::new(0),
                waiters: RefCell::new(Vec::new()),
                pending: Cell::new(None),
                next_token: Cell::new(0),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Trigger after `delay`. A zero delay triggers in the next delta cycle.
    ///
    /// Ignored when a notification at the same time or earlier is pending.
    pub fn notify(&self, delay: Duration) {
        let at = self.core.sim.now() + delay;
        if let Some(pending) = self.core.pending.get()
            && pending.at <= at
        {
            return;
        }

        let token = self.core.next_token.get();
        self.core.next_token.set(token + 1);
        self.core.pending.set(Some(PendingNotify { at, token }));

        let weak = Rc::downgrade(&self.core);
        let scheduled = self.core.sim.schedule(
            delay,
            Box::new(move || {
                let Some(core) = weak.upgrade() else {
                    return;
                };
                // A newer notification or a cancel supersedes this one.
                if core.pending.get().map(|p| p.token) == Some(token) {
                    core.pending.set(None);
                    core.trigger();
                }
            }),
        );
        if scheduled.is_err() {
            self.core.pending.set(None);
        }
    }

    /// Trigger immediately, waking tasks already waiting, and drop any
    /// pending notification.
    pub fn notify_now(&self) {
        self.core.pending.set(None);
        self.core.trigger();
    }

    /// Drop the pending notification, if any.
    pub fn cancel(&self) {
        self.core.pending.set(None);
    }

    pub fn is_pending(&self) -> bool {
        self.core.pending.get().is_some()
    }

    /// Suspend until the next trigger after the first poll.
    pub fn wait(&self) -> EventWait {
        EventWait {
            core: Rc::clone(&self.core),
            armed_at: None,
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.core.name)
            .field("pending", &self.core.pending.get().map(|p| p.at))
            .finish()
    }
}

/// Future returned by `Event::wait`.
pub struct EventWait {
    core: Rc<EventCore>,
    armed_at: Option<u64>,
}

impl EventWait {
    fn register(&self, waker: &Waker) {
        let mut waiters = self.core.waiters.borrow_mut();
        if !waiters.iter().any(|w| w.will_wake(waker)) {
            waiters.push(waker.clone());
        }
    }
}

impl Future for EventWait {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        let generation = this.core.generation.get();
        match this.armed_at {
            Some(armed) if armed != generation => Poll::Ready(()),
            Some(_) => {
                this.register(cx.waker());
                Poll::Pending
            }
            None => {
                this.armed_at = Some(generation);
                this.register(cx.waker());
                Poll::Pending
            }
        }
    }
}
