//! Probe components for exercising a target socket.
//!
//! - `trace` - `PhaseTrace`, a shared time-stamped call log
//! - `initiator` - `RecordingInitiator`, drives exchanges and records replies
//! - `targets` - `LatencyTarget` (blocking only) and `PhasedTarget` (non-blocking only)
//! - `scenario` - ready-made single-transaction runs

mod initiator;
pub mod scenario;
mod targets;
mod trace;

pub use initiator::{RecordingInitiator, ResponseMode};
pub use scenario::{
    BlockingTargetScenario, NonBlockingTargetScenario, ReadRequest, ScenarioReport,
    run_blocking_target, run_non_blocking_target,
};
pub use targets::{LatencyTarget, PhaseTiming, PhasedTarget, RequestStyle};
pub use trace::{PhaseTrace, TraceEntry, TracePoint};
