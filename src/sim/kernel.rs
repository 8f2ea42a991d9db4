//! Single-threaded discrete-event kernel.
//!
//! Tasks are plain futures polled on one thread. Simulated time only moves
//! when every runnable task has yielded: the kernel then pops the earliest
//! entry of its timed queue, advances `now` to it and runs every continuation
//! due at that instant. Continuations scheduled for "now" while those run land
//! in the next delta cycle, so zero-delay notifications never starve tasks
//! that are already runnable.

use std::cell::{Cell, RefCell};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Wake, Waker};
use std::time::Duration;

use super::sleep::Sleep;
use crate::error::{BridgeError, BridgeResult, LockResultExt};

type LocalFuture = Pin<Box<dyn Future<Output = ()>>>;

/// Continuation run when simulated time reaches its wake time.
pub(crate) type Continuation = Box<dyn FnOnce()>;

/// Identifier of a spawned task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

struct Task {
    name: String,
    future: LocalFuture,
}

/// Task ids that were woken and wait to be polled, in wake order.
///
/// `Waker` must be `Send + Sync`, so this is the only piece of kernel state
/// behind a lock.
#[derive(Default)]
struct ReadyQueue {
    ids: Mutex<VecDeque<TaskId>>,
}

impl ReadyQueue {
    fn push(&self, id: TaskId) {
        self.ids
            .lock()
            .recover_poison("ReadyQueue::push")
            .push_back(id);
    }

    fn pop(&self) -> Option<TaskId> {
        self.ids.lock().recover_poison("ReadyQueue::pop").pop_front()
    }
}

struct TaskWaker {
    id: TaskId,
    ready: Arc<ReadyQueue>,
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.ready.push(self.id);
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.ready.push(self.id);
    }
}

struct Scheduled {
    at: Duration,
    seq: u64,
    action: Continuation,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.at, self.seq).cmp(&(other.at, other.seq))
    }
}

pub(crate) struct Kernel {
    now: Cell<Duration>,
    started: Cell<bool>,
    next_task: Cell<u64>,
    next_seq: Cell<u64>,
    time_steps: Cell<u64>,
    tasks: RefCell<HashMap<TaskId, Task>>,
    ready: Arc<ReadyQueue>,
    timed: RefCell<BinaryHeap<Reverse<Scheduled>>>,
    halted: RefCell<Option<BridgeError>>,
}

impl Kernel {
    fn new() -> Self {
        Self {
            now: Cell::new(Duration::ZERO),
            started: Cell::new(false),
            next_task: Cell::new(0),
            next_seq: Cell::new(0),
            time_steps: Cell::new(0),
            tasks: RefCell::new(HashMap::new()),
            ready: Arc::new(ReadyQueue::default()),
            timed: RefCell::new(BinaryHeap::new()),
            halted: RefCell::new(None),
        }
    }

    fn spawn(&self, name: String, future: LocalFuture) -> TaskId {
        let id = TaskId(self.next_task.get());
        self.next_task.set(id.0 + 1);
        log::trace!(target: "tlm_bridge::sim", "spawn {:?} '{}' at {:?}", id, name, self.now.get());
        self.tasks.borrow_mut().insert(id, Task { name, future });
        self.ready.push(id);
        id
    }

    fn schedule(&self, delay: Duration, action: Continuation) {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        self.timed.borrow_mut().push(Reverse(Scheduled {
            at: self.now.get() + delay,
            seq,
            action,
        }));
    }

    fn halt(&self, err: BridgeError) {
        let mut halted = self.halted.borrow_mut();
        if halted.is_none() {
            log::error!(target: "tlm_bridge::sim", "simulation halted at {:?}: {}", self.now.get(), err);
            *halted = Some(err);
        } else {
            log::debug!(target: "tlm_bridge::sim", "ignoring error after halt: {}", err);
        }
    }

    fn is_halted(&self) -> bool {
        self.halted.borrow().is_some()
    }

    fn poll_task(&self, id: TaskId) {
        // Taken out of the map while polling so the task may spawn freely.
        let Some(mut task) = self.tasks.borrow_mut().remove(&id) else {
            return;
        };
        let waker = Waker::from(Arc::new(TaskWaker {
            id,
            ready: Arc::clone(&self.ready),
        }));
        let mut cx = Context::from_waker(&waker);
        match task.future.as_mut().poll(&mut cx) {
            Poll::Ready(()) => {
                log::trace!(target: "tlm_bridge::sim", "task '{}' finished at {:?}", task.name, self.now.get());
            }
            Poll::Pending => {
                self.tasks.borrow_mut().insert(id, task);
            }
        }
    }

    fn drain_ready(&self) {
        while !self.is_halted() {
            let Some(id) = self.ready.pop() else {
                break;
            };
            self.poll_task(id);
        }
    }

    fn pop_due(&self, at: Duration) -> Vec<Scheduled> {
        let mut timed = self.timed.borrow_mut();
        let mut due = Vec::new();
        while timed.peek().is_some_and(|Reverse(next)| next.at == at) {
            if let Some(Reverse(next)) = timed.pop() {
                due.push(next);
            }
        }
        due
    }

    fn run_until(&self, limit: Option<Duration>) -> BridgeResult<RunSummary> {
        if !self.started.replace(true) {
            log::debug!(target: "tlm_bridge::sim", "simulation started");
        }
        loop {
            self.drain_ready();
            if let Some(err) = self.halted.borrow().clone() {
                return Err(err);
            }

            let next = self.timed.borrow().peek().map(|Reverse(next)| next.at);
            let Some(at) = next else {
                break;
            };
            if let Some(limit) = limit
                && at > limit
            {
                self.now.set(limit.max(self.now.get()));
                break;
            }

            self.now.set(at);
            self.time_steps.set(self.time_steps.get() + 1);
            for scheduled in self.pop_due(at) {
                (scheduled.action)();
            }
        }
        Ok(self.summary())
    }

    fn summary(&self) -> RunSummary {
        RunSummary {
            end_time: self.now.get(),
            time_steps: self.time_steps.get(),
            live_tasks: self.tasks.borrow().len(),
        }
    }
}

/// Outcome of a `Simulation::run` call that did not halt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Simulated time when the run stopped
    pub end_time: Duration,
    /// Number of timed-queue steps taken so far (delta cycles included)
    pub time_steps: u64,
    /// Tasks still suspended, e.g. perpetual dispatch loops
    pub live_tasks: usize,
}

/// Owner of the simulation kernel.
///
/// Components get a `SimHandle`; dropping the `Simulation` drops every task
/// and with it every component a task kept alive.
pub struct Simulation {
    kernel: Rc<Kernel>,
}

impl Simulation {
    pub fn new() -> Self {
        Self {
            kernel: Rc::new(Kernel::new()),
        }
    }

    pub fn handle(&self) -> SimHandle {
        SimHandle {
            kernel: Rc::downgrade(&self.kernel),
        }
    }

    pub fn now(&self) -> Duration {
        self.kernel.now.get()
    }

    pub fn spawn<F>(&self, name: impl Into<String>, future: F) -> TaskId
    where
        F: Future<Output = ()> + 'static,
    {
        self.kernel.spawn(name.into(), Box::pin(future))
    }

    /// Run until no task is runnable and nothing is scheduled.
    ///
    /// Returns the first fatal error reported through `SimHandle::halt`.
    pub fn run(&self) -> BridgeResult<RunSummary> {
        self.kernel.run_until(None)
    }

    /// Run for at most `duration` of simulated time from now.
    pub fn run_for(&self, duration: Duration) -> BridgeResult<RunSummary> {
        let limit = self.now() + duration;
        self.kernel.run_until(Some(limit))
    }

    pub fn live_tasks(&self) -> usize {
        self.kernel.tasks.borrow().len()
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-owning access to the kernel, handed to components.
#[derive(Clone)]
pub struct SimHandle {
    kernel: Weak<Kernel>,
}

impl SimHandle {
    /// Current simulated time (zero once the kernel is gone).
    pub fn now(&self) -> Duration {
        self.kernel
            .upgrade()
            .map(|kernel| kernel.now.get())
            .unwrap_or_default()
    }

    /// Whether `run` has been called, i.e. elaboration is over.
    pub fn has_started(&self) -> bool {
        self.kernel
            .upgrade()
            .is_some_and(|kernel| kernel.started.get())
    }

    pub fn spawn<F>(&self, name: impl Into<String>, future: F) -> BridgeResult<TaskId>
    where
        F: Future<Output = ()> + 'static,
    {
        let kernel = self.kernel.upgrade().ok_or(BridgeError::KernelGone)?;
        Ok(kernel.spawn(name.into(), Box::pin(future)))
    }

    /// Suspend the calling task for `delay` of simulated time.
    pub fn sleep(&self, delay: Duration) -> Sleep {
        Sleep::new(self.clone(), delay)
    }

    /// Abort the run. Only the first error is kept.
    pub fn halt(&self, err: BridgeError) {
        match self.kernel.upgrade() {
            Some(kernel) => kernel.halt(err),
            None => log::error!(target: "tlm_bridge::sim", "fatal error without kernel: {}", err),
        }
    }

    pub fn is_halted(&self) -> bool {
        self.kernel.upgrade().is_some_and(|kernel| kernel.is_halted())
    }

    /// Run `action` once simulated time advanced by `delay`.
    pub(crate) fn schedule(&self, delay: Duration, action: Continuation) -> BridgeResult<()> {
        let kernel = self.kernel.upgrade().ok_or(BridgeError::KernelGone)?;
        kernel.schedule(delay, action);
        Ok(())
    }
}
