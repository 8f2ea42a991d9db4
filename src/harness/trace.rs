//! Time-stamped record of the calls seen by harness components.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::payload::{Phase, SyncStatus, TransactionId};

/// What happened at one trace point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracePoint {
    /// A non-blocking call arrived
    Received { phase: Phase, delay: Duration },
    /// A non-blocking call made by this component returned
    Returned {
        phase: Phase,
        status: SyncStatus,
        delay: Duration,
    },
    /// A blocking call started
    BlockingStart { delay: Duration },
    /// A blocking call returned
    BlockingEnd { delay: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    pub at: Duration,
    pub actor: String,
    pub transaction: TransactionId,
    pub point: TracePoint,
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>8} ns  {:<12} {:<16} ",
            self.at.as_nanos(),
            self.actor,
            self.transaction.to_string()
        )?;
        match self.point {
            TracePoint::Received { phase, delay } => {
                write!(f, "<- {phase} (+{} ns)", delay.as_nanos())
            }
            TracePoint::Returned {
                phase,
                status,
                delay,
            } => write!(f, "-> {status} {phase} (+{} ns)", delay.as_nanos()),
            TracePoint::BlockingStart { delay } => {
                write!(f, "b_transport start (+{} ns)", delay.as_nanos())
            }
            TracePoint::BlockingEnd { delay } => {
                write!(f, "b_transport end (+{} ns)", delay.as_nanos())
            }
        }
    }
}

/// Shared, append-only trace. Clones record into the same list.
#[derive(Debug, Clone, Default)]
pub struct PhaseTrace {
    entries: Rc<RefCell<Vec<TraceEntry>>>,
}

impl PhaseTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &self,
        at: Duration,
        actor: &str,
        transaction: TransactionId,
        point: TracePoint,
    ) {
        log::debug!(
            target: "tlm_bridge::harness",
            "{} {} {:?} at {:?}",
            actor,
            transaction,
            point,
            at
        );
        self.entries.borrow_mut().push(TraceEntry {
            at,
            actor: actor.to_string(),
            transaction,
            point,
        });
    }

    pub fn entries(&self) -> Vec<TraceEntry> {
        self.entries.borrow().clone()
    }

    /// Entries recorded by `actor`, in order.
    pub fn by_actor(&self, actor: &str) -> Vec<TraceEntry> {
        self.entries
            .borrow()
            .iter()
            .filter(|entry| entry.actor == actor)
            .cloned()
            .collect()
    }

    /// Times at which `actor` received `phase`.
    pub fn received_at(&self, actor: &str, phase: Phase) -> Vec<Duration> {
        self.entries
            .borrow()
            .iter()
            .filter(|entry| {
                entry.actor == actor
                    && matches!(entry.point, TracePoint::Received { phase: p, .. } if p == phase)
            })
            .map(|entry| entry.at)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}
