//! Canned adaptation scenarios, shared by the CLI and the integration tests.
//!
//! Each scenario builds a fresh simulation with one socket, one target and
//! one recording initiator, runs a single read through the socket and
//! reports the elapsed simulated time together with the phase trace.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use super::initiator::{RecordingInitiator, ResponseMode};
use super::targets::{LatencyTarget, PhaseTiming, PhasedTarget};
use super::trace::{PhaseTrace, TraceEntry};
use crate::error::BridgeResult;
use crate::payload::{ResponseStatus, Transaction};
use crate::sim::{RunSummary, Simulation};
use crate::socket::{BackwardTransport, SimpleTargetSocket};

pub const INITIATOR: &str = "initiator";
pub const TARGET: &str = "target";

/// Transaction issued by a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    pub address: u64,
    pub length: usize,
}

impl Default for ReadRequest {
    fn default() -> Self {
        Self {
            address: 0x1000,
            length: 4,
        }
    }
}

/// Blocking-only target driven by a non-blocking initiator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockingTargetScenario {
    pub response_delay: Duration,
    /// Target suspends for the delay instead of annotating it
    pub wait_in_handler: bool,
    pub response_mode: ResponseMode,
    pub request: ReadRequest,
}

/// Non-blocking-only target driven by a blocking initiator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NonBlockingTargetScenario {
    pub timing: PhaseTiming,
    pub request: ReadRequest,
}

#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub name: &'static str,
    /// Simulated time the initiator observed; `None` if the exchange did not
    /// finish before the time limit
    pub elapsed: Option<Duration>,
    pub response_status: ResponseStatus,
    pub trace: Vec<TraceEntry>,
    pub summary: RunSummary,
}

fn run(sim: &Simulation, time_limit: Option<Duration>) -> BridgeResult<RunSummary> {
    match time_limit {
        Some(limit) => sim.run_for(limit),
        None => sim.run(),
    }
}

pub fn run_blocking_target(
    scenario: &BlockingTargetScenario,
    time_limit: Option<Duration>,
) -> BridgeResult<ScenarioReport> {
    let sim = Simulation::new();
    let handle = sim.handle();
    let trace = PhaseTrace::new();

    let socket = SimpleTargetSocket::new("top.target.socket", &handle)?;
    let mut target = LatencyTarget::new(TARGET, &handle, scenario.response_delay, trace.clone());
    if scenario.wait_in_handler {
        target = target.waiting();
    }
    let target = Rc::new(target);
    socket.register_b_transport(&target, ())?;
    socket.register_transport_dbg(&target, ())?;

    let initiator = Rc::new(RecordingInitiator::new(
        INITIATOR,
        &handle,
        trace.clone(),
        scenario.response_mode,
    ));
    socket.bind(Rc::clone(&initiator) as Rc<dyn BackwardTransport>)?;

    let trans = Transaction::read(scenario.request.address, scenario.request.length);
    let elapsed = Rc::new(Cell::new(None));
    {
        let socket = socket.clone();
        let trans = trans.clone();
        let elapsed = Rc::clone(&elapsed);
        let handle = handle.clone();
        sim.spawn("initiator.run", async move {
            match initiator.transact_non_blocking(&socket, &trans).await {
                Ok(time) => elapsed.set(Some(time)),
                Err(err) => handle.halt(err),
            }
        });
    }

    let summary = run(&sim, time_limit)?;
    Ok(ScenarioReport {
        name: "blocking-target",
        elapsed: elapsed.get(),
        response_status: trans.response_status(),
        trace: trace.entries(),
        summary,
    })
}

pub fn run_non_blocking_target(
    scenario: &NonBlockingTargetScenario,
    time_limit: Option<Duration>,
) -> BridgeResult<ScenarioReport> {
    let sim = Simulation::new();
    let handle = sim.handle();
    let trace = PhaseTrace::new();

    let socket = SimpleTargetSocket::new("top.target.socket", &handle)?;
    let target = Rc::new(PhasedTarget::new(
        TARGET,
        &handle,
        socket.backward_path(),
        scenario.timing,
        trace.clone(),
    ));
    socket.register_nb_transport_fw(&target, ())?;

    let initiator = Rc::new(RecordingInitiator::new(
        INITIATOR,
        &handle,
        trace.clone(),
        ResponseMode::Complete,
    ));
    socket.bind(Rc::clone(&initiator) as Rc<dyn BackwardTransport>)?;

    let trans = Transaction::read(scenario.request.address, scenario.request.length);
    let elapsed = Rc::new(Cell::new(None));
    {
        let socket = socket.clone();
        let trans = trans.clone();
        let elapsed = Rc::clone(&elapsed);
        let handle = handle.clone();
        sim.spawn("initiator.run", async move {
            match initiator
                .transact_blocking(&socket, &trans, Duration::ZERO)
                .await
            {
                Ok(time) => elapsed.set(Some(time)),
                Err(err) => handle.halt(err),
            }
        });
    }

    let summary = run(&sim, time_limit)?;
    Ok(ScenarioReport {
        name: "non-blocking-target",
        elapsed: elapsed.get(),
        response_status: trans.response_status(),
        trace: trace.entries(),
        summary,
    })
}
