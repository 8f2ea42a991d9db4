//! Target modules implementing exactly one transport style.

use std::cell::RefCell;
use std::time::Duration;

use async_trait::async_trait;

use super::trace::{PhaseTrace, TracePoint};
use crate::error::{BridgeError, BridgeResult};
use crate::payload::{Phase, ResponseStatus, SyncStatus, Transaction};
use crate::sim::SimHandle;
use crate::socket::{
    BackwardPath, BackwardTransport, BlockingTarget, DebugTarget, NonBlockingTarget, SocketTag,
};

/// Blocking target that answers every request after a fixed latency.
pub struct LatencyTarget<T: SocketTag = ()> {
    name: String,
    sim: SimHandle,
    latency: Duration,
    wait_in_handler: bool,
    trace: PhaseTrace,
    tags: RefCell<Vec<T>>,
}

impl<T: SocketTag> LatencyTarget<T> {
    /// Target that adds `latency` to the annotated delay.
    pub fn new(name: impl Into<String>, sim: &SimHandle, latency: Duration, trace: PhaseTrace) -> Self {
        Self {
            name: name.into(),
            sim: sim.clone(),
            latency,
            wait_in_handler: false,
            trace,
            tags: RefCell::new(Vec::new()),
        }
    }

    /// Suspend for the latency inside the handler instead of annotating it.
    pub fn waiting(mut self) -> Self {
        self.wait_in_handler = true;
        self
    }

    /// Tags of every blocking call served so far.
    pub fn tags_seen(&self) -> Vec<T> {
        self.tags.borrow().clone()
    }
}

#[async_trait(?Send)]
impl<T: SocketTag> BlockingTarget<T> for LatencyTarget<T> {
    async fn b_transport(&self, tag: T, trans: &Transaction, delay: &mut Duration) -> BridgeResult<()> {
        self.tags.borrow_mut().push(tag);
        self.trace.record(
            self.sim.now(),
            &self.name,
            trans.id(),
            TracePoint::BlockingStart { delay: *delay },
        );

        if self.wait_in_handler {
            self.sim.sleep(self.latency).await;
        } else {
            *delay += self.latency;
        }
        trans.set_response_status(ResponseStatus::Ok);

        self.trace.record(
            self.sim.now(),
            &self.name,
            trans.id(),
            TracePoint::BlockingEnd { delay: *delay },
        );
        Ok(())
    }
}

impl<T: SocketTag> DebugTarget<T> for LatencyTarget<T> {
    fn transport_dbg(&self, _tag: T, trans: &Transaction) -> u32 {
        u32::try_from(trans.data_length()).unwrap_or(u32::MAX)
    }
}

/// How `PhasedTarget` answers BEGIN_REQ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestStyle {
    /// ACCEPTED; END_REQ and BEGIN_RESP follow on the backward path
    #[default]
    Backward,
    /// UPDATED with END_REQ; BEGIN_RESP follows on the backward path
    ReturnEndRequest,
    /// UPDATED with BEGIN_RESP; expects END_RESP on the forward path
    ReturnBeginResponse,
    /// COMPLETED in one call
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhaseTiming {
    /// From BEGIN_REQ to END_REQ
    pub end_request: Duration,
    /// From END_REQ to BEGIN_RESP
    pub begin_response: Duration,
    pub style: RequestStyle,
}

/// Non-blocking target that walks every request through the four phases.
pub struct PhasedTarget<T: SocketTag = ()> {
    name: String,
    sim: SimHandle,
    backward: BackwardPath<T>,
    timing: PhaseTiming,
    trace: PhaseTrace,
    tags: RefCell<Vec<T>>,
}

impl<T: SocketTag> PhasedTarget<T> {
    pub fn new(
        name: impl Into<String>,
        sim: &SimHandle,
        backward: BackwardPath<T>,
        timing: PhaseTiming,
        trace: PhaseTrace,
    ) -> Self {
        Self {
            name: name.into(),
            sim: sim.clone(),
            backward,
            timing,
            trace,
            tags: RefCell::new(Vec::new()),
        }
    }

    pub fn tags_seen(&self) -> Vec<T> {
        self.tags.borrow().clone()
    }

    fn send_later(&self, trans: &Transaction, phases: Vec<(Duration, Phase)>) -> BridgeResult<()> {
        let sim = self.sim.clone();
        let backward = self.backward.clone();
        let trace = self.trace.clone();
        let name = self.name.clone();
        let trans = trans.clone();
        let task = format!("{}.respond({})", self.name, trans.id());
        self.sim.spawn(task, async move {
            for (wait, phase) in phases {
                sim.sleep(wait).await;
                if phase == Phase::BeginResp {
                    trans.set_response_status(ResponseStatus::Ok);
                }
                let mut phase = phase;
                let mut delay = Duration::ZERO;
                match backward.nb_transport_bw(&trans, &mut phase, &mut delay) {
                    Ok(status) => trace.record(
                        sim.now(),
                        &name,
                        trans.id(),
                        TracePoint::Returned {
                            phase,
                            status,
                            delay,
                        },
                    ),
                    Err(err) => {
                        sim.halt(err);
                        return;
                    }
                }
            }
        })?;
        Ok(())
    }
}

impl<T: SocketTag> NonBlockingTarget<T> for PhasedTarget<T> {
    fn nb_transport_fw(
        &self,
        tag: T,
        trans: &Transaction,
        phase: &mut Phase,
        delay: &mut Duration,
    ) -> BridgeResult<SyncStatus> {
        self.trace.record(
            self.sim.now(),
            &self.name,
            trans.id(),
            TracePoint::Received {
                phase: *phase,
                delay: *delay,
            },
        );

        let PhaseTiming {
            end_request,
            begin_response,
            style,
        } = self.timing;
        match *phase {
            Phase::BeginReq => {
                self.tags.borrow_mut().push(tag);
                match style {
                    RequestStyle::Backward => {
                        self.send_later(
                            trans,
                            vec![
                                (*delay + end_request, Phase::EndReq),
                                (begin_response, Phase::BeginResp),
                            ],
                        )?;
                        Ok(SyncStatus::Accepted)
                    }
                    RequestStyle::ReturnEndRequest => {
                        self.send_later(
                            trans,
                            vec![(*delay + end_request + begin_response, Phase::BeginResp)],
                        )?;
                        *phase = Phase::EndReq;
                        *delay += end_request;
                        Ok(SyncStatus::Updated)
                    }
                    RequestStyle::ReturnBeginResponse => {
                        trans.set_response_status(ResponseStatus::Ok);
                        *phase = Phase::BeginResp;
                        *delay += end_request + begin_response;
                        Ok(SyncStatus::Updated)
                    }
                    RequestStyle::Complete => {
                        trans.set_response_status(ResponseStatus::Ok);
                        *delay += end_request + begin_response;
                        Ok(SyncStatus::Completed)
                    }
                }
            }
            Phase::EndResp => Ok(SyncStatus::Completed),
            other => Err(BridgeError::unexpected_phase(
                &self.name,
                "target forward path",
                other,
            )),
        }
    }
}
