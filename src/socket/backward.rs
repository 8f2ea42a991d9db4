//! Backward adapter: calls traveling from the target toward the initiator.
//!
//! Replies for transactions a blocking caller is waiting on are consumed
//! here; everything else goes to the bound initiator unchanged.

use std::rc::{Rc, Weak};
use std::time::Duration;

use super::interface::{BackwardTransport, SocketTag};
use super::state::SocketCore;
use crate::error::{BridgeError, BridgeResult};
use crate::payload::{Phase, SyncStatus, Transaction};

impl<T: SocketTag> SocketCore<T> {
    pub(crate) fn nb_transport_bw(
        &self,
        trans: &Transaction,
        phase: &mut Phase,
        delay: &mut Duration,
    ) -> BridgeResult<SyncStatus> {
        if !self.pending.contains(trans.id()) {
            return self.forward_to_initiator(trans, phase, delay);
        }

        match *phase {
            Phase::EndReq => {
                self.end_request.notify(Duration::ZERO);
                Ok(SyncStatus::Accepted)
            }
            Phase::BeginResp => {
                // The response also ends a request still held by the dispatch task.
                if self.current.get() == Some(trans.id()) {
                    self.end_request.notify(Duration::ZERO);
                }
                self.signal_completion(trans, *delay)?;
                Ok(SyncStatus::Completed)
            }
            other => Err(self.fatal(BridgeError::unexpected_phase(
                &self.name,
                "nb_transport_bw of a waiting blocking call",
                other,
            ))),
        }
    }

    pub(crate) fn invalidate_direct_mem_ptr(&self, start: u64, end: u64) -> BridgeResult<()> {
        let initiator = self.initiator.borrow().clone();
        match initiator {
            Some(initiator) => initiator.invalidate_direct_mem_ptr(start, end),
            None => Err(self.fatal(BridgeError::Unbound {
                socket: self.name.clone(),
                call: "invalidate_direct_mem_ptr",
            })),
        }
    }
}

/// Handle a target module keeps to send backward calls through its socket.
///
/// Holds the socket weakly so that a target registered on the socket does
/// not keep it alive.
pub struct BackwardPath<T: SocketTag = ()> {
    core: Weak<SocketCore<T>>,
}

impl<T: SocketTag> BackwardPath<T> {
    pub(crate) fn new(core: &Rc<SocketCore<T>>) -> Self {
        Self {
            core: Rc::downgrade(core),
        }
    }

    fn core(&self) -> BridgeResult<Rc<SocketCore<T>>> {
        self.core.upgrade().ok_or(BridgeError::SocketDropped)
    }
}

impl<T: SocketTag> Clone for BackwardPath<T> {
    fn clone(&self) -> Self {
        Self {
            core: Weak::clone(&self.core),
        }
    }
}

impl<T: SocketTag> BackwardTransport for BackwardPath<T> {
    fn nb_transport_bw(
        &self,
        trans: &Transaction,
        phase: &mut Phase,
        delay: &mut Duration,
    ) -> BridgeResult<SyncStatus> {
        self.core()?.nb_transport_bw(trans, phase, delay)
    }

    fn invalidate_direct_mem_ptr(&self, start: u64, end: u64) -> BridgeResult<()> {
        self.core()?.invalidate_direct_mem_ptr(start, end)
    }
}
