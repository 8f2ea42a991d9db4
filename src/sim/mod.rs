//! Discrete-event simulation kernel.
//!
//! # Module Structure
//!
//! - `kernel` - `Simulation`, `SimHandle`, task polling and the timed queue
//! - `event` - value-less notification events with delta-cycle semantics
//! - `sleep` - time-delay future
//! - `peq` - payload event queue (time-ordered queue plus "ready" event)
//!
//! Everything runs on one thread; components hold `Rc` state and interior
//! mutability instead of locks.

mod event;
mod kernel;
mod peq;
mod sleep;

pub use event::{Event, EventWait};
pub use kernel::{RunSummary, SimHandle, Simulation, TaskId};
pub use peq::PayloadEventQueue;
pub use sleep::Sleep;
