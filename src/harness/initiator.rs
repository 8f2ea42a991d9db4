//! Initiator that drives transactions and records what comes back.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Notify;

use super::trace::{PhaseTrace, TracePoint};
use crate::error::{BridgeError, BridgeResult};
use crate::payload::{Phase, SyncStatus, Transaction, TransactionId};
use crate::sim::SimHandle;
use crate::socket::{BackwardTransport, ForwardTransport};

/// How the initiator answers BEGIN_RESP on the backward path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// Return COMPLETED, ending the exchange in one step
    #[default]
    Complete,
    /// Return ACCEPTED and send END_RESP afterwards
    Accept,
}

pub struct RecordingInitiator {
    name: String,
    sim: SimHandle,
    trace: PhaseTrace,
    mode: ResponseMode,
    responses: RefCell<VecDeque<(TransactionId, Duration)>>,
    response_ready: Notify,
    invalidations: RefCell<Vec<(u64, u64)>>,
}

impl RecordingInitiator {
    pub fn new(name: impl Into<String>, sim: &SimHandle, trace: PhaseTrace, mode: ResponseMode) -> Self {
        Self {
            name: name.into(),
            sim: sim.clone(),
            trace,
            mode,
            responses: RefCell::new(VecDeque::new()),
            response_ready: Notify::new(),
            invalidations: RefCell::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ranges received through `invalidate_direct_mem_ptr`.
    pub fn invalidations(&self) -> Vec<(u64, u64)> {
        self.invalidations.borrow().clone()
    }

    fn record(&self, trans: &Transaction, point: TracePoint) {
        self.trace.record(self.sim.now(), &self.name, trans.id(), point);
    }

    fn take_response(&self, id: TransactionId) -> Option<Duration> {
        let mut responses = self.responses.borrow_mut();
        let index = responses.iter().position(|(pending, _)| *pending == id)?;
        responses.remove(index).map(|(_, at)| at)
    }

    /// Wait for BEGIN_RESP of `trans`; returns the annotated arrival time.
    pub async fn wait_response(&self, trans: &Transaction) -> Duration {
        loop {
            if let Some(at) = self.take_response(trans.id()) {
                return at;
            }
            self.response_ready.notified().await;
        }
    }

    /// Run one exchange through non-blocking forward calls.
    ///
    /// Returns the simulated time from BEGIN_REQ to the response.
    pub async fn transact_non_blocking(
        &self,
        socket: &dyn ForwardTransport,
        trans: &Transaction,
    ) -> BridgeResult<Duration> {
        let start = self.sim.now();
        let mut phase = Phase::BeginReq;
        let mut delay = Duration::ZERO;
        let status = socket.nb_transport_fw(trans, &mut phase, &mut delay)?;
        self.record(
            trans,
            TracePoint::Returned {
                phase,
                status,
                delay,
            },
        );

        match (status, phase) {
            (SyncStatus::Completed, _) => Ok(self.sim.now() + delay - start),
            (_, Phase::BeginResp) => {
                let arrived = self.sim.now() + delay;
                self.end_response(socket, trans, delay)?;
                Ok(arrived - start)
            }
            _ => {
                let arrived = self.wait_response(trans).await;
                if self.mode == ResponseMode::Accept {
                    self.end_response(socket, trans, Duration::ZERO)?;
                }
                Ok(arrived - start)
            }
        }
    }

    fn end_response(
        &self,
        socket: &dyn ForwardTransport,
        trans: &Transaction,
        delay: Duration,
    ) -> BridgeResult<()> {
        let mut phase = Phase::EndResp;
        let mut delay = delay;
        let status = socket.nb_transport_fw(trans, &mut phase, &mut delay)?;
        self.record(
            trans,
            TracePoint::Returned {
                phase,
                status,
                delay,
            },
        );
        Ok(())
    }

    /// Run one exchange through a blocking forward call.
    ///
    /// Returns the elapsed simulated time including the delay still annotated
    /// on return.
    pub async fn transact_blocking(
        &self,
        socket: &dyn ForwardTransport,
        trans: &Transaction,
        delay: Duration,
    ) -> BridgeResult<Duration> {
        let start = self.sim.now();
        let mut delay = delay;
        self.record(trans, TracePoint::BlockingStart { delay });
        socket.b_transport(trans, &mut delay).await?;
        self.record(trans, TracePoint::BlockingEnd { delay });
        Ok(self.sim.now() + delay - start)
    }
}

impl BackwardTransport for RecordingInitiator {
    fn nb_transport_bw(
        &self,
        trans: &Transaction,
        phase: &mut Phase,
        delay: &mut Duration,
    ) -> BridgeResult<SyncStatus> {
        self.record(
            trans,
            TracePoint::Received {
                phase: *phase,
                delay: *delay,
            },
        );
        match *phase {
            Phase::EndReq => Ok(SyncStatus::Accepted),
            Phase::BeginResp => {
                self.responses
                    .borrow_mut()
                    .push_back((trans.id(), self.sim.now() + *delay));
                // Wakes waiters of every transaction; one that arrives before
                // its waiter is found in `responses` by `wait_response`.
                self.response_ready.notify_waiters();
                Ok(match self.mode {
                    ResponseMode::Complete => SyncStatus::Completed,
                    ResponseMode::Accept => SyncStatus::Accepted,
                })
            }
            other => Err(BridgeError::unexpected_phase(
                &self.name,
                "initiator backward path",
                other,
            )),
        }
    }

    fn invalidate_direct_mem_ptr(&self, start: u64, end: u64) -> BridgeResult<()> {
        log::debug!(
            target: "tlm_bridge::harness",
            "{}: invalidate DMI [{:#x}, {:#x}]",
            self.name,
            start,
            end
        );
        self.invalidations.borrow_mut().push((start, end));
        Ok(())
    }
}
