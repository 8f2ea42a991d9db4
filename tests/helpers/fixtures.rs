//! Small target modules and memory managers used across the tests.

use std::cell::Cell;
use std::time::Duration;

use async_trait::async_trait;
use tlm_bridge::payload::{DmiAccess, DmiRegion, MemoryManager};
use tlm_bridge::sim::SimHandle;
use tlm_bridge::socket::{
    BackwardPath, BackwardTransport, BlockingTarget, DirectMemoryTarget, NonBlockingTarget,
};
use tlm_bridge::{BridgeResult, Phase, SyncStatus, Transaction};

/// Memory manager that only counts how often it was asked to free.
#[derive(Default)]
pub struct CountingManager {
    pub frees: Cell<u32>,
}

impl MemoryManager for CountingManager {
    fn free(&self, _trans: &Transaction) {
        self.frees.set(self.frees.get() + 1);
    }
}

/// Non-blocking target that completes at once but keeps a reference to the
/// transaction for `hold` before releasing it.
pub struct HoldingTarget {
    pub sim: SimHandle,
    pub hold: Duration,
}

impl NonBlockingTarget for HoldingTarget {
    fn nb_transport_fw(
        &self,
        _tag: (),
        trans: &Transaction,
        _phase: &mut Phase,
        _delay: &mut Duration,
    ) -> BridgeResult<SyncStatus> {
        trans.acquire();
        let sim = self.sim.clone();
        let hold = self.hold;
        let trans = trans.clone();
        self.sim.spawn("holder", async move {
            sim.sleep(hold).await;
            if let Err(err) = trans.release() {
                sim.halt(err);
            }
        })?;
        Ok(SyncStatus::Completed)
    }
}

/// Non-blocking target that answers BEGIN_REQ with a fixed reply.
pub struct ScriptedTarget {
    pub status: SyncStatus,
    pub phase: Phase,
    pub delay: Duration,
}

impl NonBlockingTarget for ScriptedTarget {
    fn nb_transport_fw(
        &self,
        _tag: (),
        _trans: &Transaction,
        phase: &mut Phase,
        delay: &mut Duration,
    ) -> BridgeResult<SyncStatus> {
        *phase = self.phase;
        *delay += self.delay;
        Ok(self.status)
    }
}

/// Non-blocking target that never sends END_REQ: it accepts BEGIN_REQ and
/// sends only BEGIN_RESP after `respond_after`, annotated with
/// `response_delay`.
pub struct ResponseOnlyTarget {
    pub sim: SimHandle,
    pub backward: BackwardPath,
    pub respond_after: Duration,
    pub response_delay: Duration,
}

impl NonBlockingTarget for ResponseOnlyTarget {
    fn nb_transport_fw(
        &self,
        _tag: (),
        trans: &Transaction,
        phase: &mut Phase,
        _delay: &mut Duration,
    ) -> BridgeResult<SyncStatus> {
        if *phase != Phase::BeginReq {
            return Ok(SyncStatus::Completed);
        }
        let sim = self.sim.clone();
        let backward = self.backward.clone();
        let trans = trans.clone();
        let (wait, response_delay) = (self.respond_after, self.response_delay);
        self.sim.spawn("responder", async move {
            sim.sleep(wait).await;
            let mut phase = Phase::BeginResp;
            let mut delay = response_delay;
            if let Err(err) = backward.nb_transport_bw(&trans, &mut phase, &mut delay) {
                sim.halt(err);
            }
        })?;
        Ok(SyncStatus::Accepted)
    }
}

/// Module implementing both transport styles, counting calls to each.
#[derive(Default)]
pub struct DualModule {
    pub non_blocking_calls: Cell<u32>,
    pub blocking_calls: Cell<u32>,
}

impl NonBlockingTarget for DualModule {
    fn nb_transport_fw(
        &self,
        _tag: (),
        _trans: &Transaction,
        _phase: &mut Phase,
        _delay: &mut Duration,
    ) -> BridgeResult<SyncStatus> {
        self.non_blocking_calls.set(self.non_blocking_calls.get() + 1);
        Ok(SyncStatus::Completed)
    }
}

#[async_trait(?Send)]
impl BlockingTarget for DualModule {
    async fn b_transport(
        &self,
        _tag: (),
        _trans: &Transaction,
        delay: &mut Duration,
    ) -> BridgeResult<()> {
        self.blocking_calls.set(self.blocking_calls.get() + 1);
        *delay += Duration::from_nanos(3);
        Ok(())
    }
}

/// Module granting DMI on one fixed window.
pub struct DmiWindow {
    pub start: u64,
    pub end: u64,
}

impl DirectMemoryTarget for DmiWindow {
    fn get_direct_mem_ptr(&self, _tag: (), _trans: &Transaction, dmi: &mut DmiRegion) -> bool {
        dmi.start_address = self.start;
        dmi.end_address = self.end;
        dmi.access = DmiAccess::ReadWrite;
        true
    }
}

/// Auto extension attached by tests to observe transaction resets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker(pub u32);
