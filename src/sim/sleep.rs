//! Time-delay suspension point.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};
use std::time::Duration;

use super::kernel::SimHandle;

#[derive(Default)]
struct SleepState {
    elapsed: Cell<bool>,
    waker: RefCell<Option<Waker>>,
}

/// Future returned by `SimHandle::sleep`.
///
/// The timer is armed on first poll, so the delay counts from the moment the
/// task actually suspends. A zero delay still yields for one delta cycle.
pub struct Sleep {
    sim: SimHandle,
    delay: Duration,
    state: Option<Rc<SleepState>>,
}

impl Sleep {
    pub(crate) fn new(sim: SimHandle, delay: Duration) -> Self {
        Self {
            sim,
            delay,
            state: None,
        }
    }
}

impl Future for Sleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        match &this.state {
            Some(state) => {
                if state.elapsed.get() {
                    return Poll::Ready(());
                }
                *state.waker.borrow_mut() = Some(cx.waker().clone());
                Poll::Pending
            }
            None => {
                let state = Rc::new(SleepState::default());
                *state.waker.borrow_mut() = Some(cx.waker().clone());
                let timer = Rc::clone(&state);
                let armed = this.sim.schedule(
                    this.delay,
                    Box::new(move || {
                        timer.elapsed.set(true);
                        if let Some(waker) = timer.waker.borrow_mut().take() {
                            waker.wake();
                        }
                    }),
                );
                if armed.is_err() {
                    log::warn!(target: "tlm_bridge::sim", "sleep without kernel never wakes");
                }
                this.state = Some(state);
                Poll::Pending
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Simulation;

    #[test]
    fn zero_sleep_yields_without_advancing_time() {
        let sim = Simulation::new();
        let handle = sim.handle();
        let order = Rc::new(RefCell::new(Vec::new()));

        let first = Rc::clone(&order);
        let h = handle.clone();
        sim.spawn("yielding", async move {
            first.borrow_mut().push("yielding:before");
            h.sleep(Duration::ZERO).await;
            first.borrow_mut().push("yielding:after");
        });
        let second = Rc::clone(&order);
        sim.spawn("plain", async move {
            second.borrow_mut().push("plain");
        });

        let summary = sim.run().expect("run");
        assert_eq!(summary.end_time, Duration::ZERO);
        assert_eq!(
            *order.borrow(),
            vec!["yielding:before", "plain", "yielding:after"]
        );
    }

    #[test]
    fn consecutive_sleeps_accumulate() {
        let sim = Simulation::new();
        let handle = sim.handle();
        let end = Rc::new(Cell::new(Duration::ZERO));

        let seen = Rc::clone(&end);
        sim.spawn("accumulate", async move {
            handle.sleep(Duration::from_nanos(10)).await;
            handle.sleep(Duration::from_nanos(15)).await;
            seen.set(handle.now());
        });

        sim.run().expect("run");
        assert_eq!(end.get(), Duration::from_nanos(25));
    }
}
