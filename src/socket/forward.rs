//! Forward adapter: calls traveling from the initiator toward the target.

use std::rc::Rc;
use std::time::Duration;

use super::handlers::Registered;
use super::interface::{BlockingTarget, SocketTag};
use super::ownership::TemporaryOwnership;
use super::registry::CompletionRegistry;
use super::state::SocketCore;
use crate::error::{BridgeError, BridgeResult};
use crate::payload::{DmiRegion, Phase, SyncStatus, Transaction, TransactionId};

/// Drops the registry entry of a blocking call that stops waiting early.
struct PendingGuard<'a> {
    registry: &'a CompletionRegistry,
    id: TransactionId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.registry.remove(self.id) {
            log::debug!(target: "tlm_bridge::socket", "{} stopped waiting before completion", self.id);
        }
    }
}

impl<T: SocketTag> SocketCore<T> {
    pub(crate) fn nb_transport_fw(
        self: &Rc<Self>,
        trans: &Transaction,
        phase: &mut Phase,
        delay: &mut Duration,
    ) -> BridgeResult<SyncStatus> {
        let (non_blocking, blocking) = {
            let table = self.handlers.borrow();
            (table.non_blocking.clone(), table.blocking.clone())
        };

        if let Some(target) = non_blocking {
            return target.handler.nb_transport_fw(target.tag, trans, phase, delay);
        }
        let Some(target) = blocking else {
            return Err(self.fatal(BridgeError::unhandled(&self.name, "nb_transport_fw")));
        };

        match *phase {
            Phase::BeginReq => {
                self.spawn_blocking_exchange(target, trans.clone(), *delay)?;
                Ok(SyncStatus::Accepted)
            }
            Phase::EndResp => {
                self.response_in_progress.set(false);
                self.end_response.notify(*delay);
                Ok(SyncStatus::Completed)
            }
            other => Err(self.fatal(BridgeError::unexpected_phase(
                &self.name,
                "nb_transport_fw to a blocking target",
                other,
            ))),
        }
    }

    fn spawn_blocking_exchange(
        self: &Rc<Self>,
        target: Registered<dyn BlockingTarget<T>, T>,
        trans: Transaction,
        start: Duration,
    ) -> BridgeResult<()> {
        let core = Rc::clone(self);
        let name = format!("{}.nb2b({})", self.name, trans.id());
        log::debug!(
            target: "tlm_bridge::socket",
            "{}: {} adapted to blocking call starting in {:?}",
            self.name,
            trans.id(),
            start
        );
        self.sim.spawn(name, async move {
            if let Err(err) = core.blocking_exchange(target, &trans, start).await {
                core.fatal(err);
            }
        })?;
        Ok(())
    }

    /// Serve one non-blocking request with the blocking handler and send the
    /// response back upward.
    async fn blocking_exchange(
        &self,
        target: Registered<dyn BlockingTarget<T>, T>,
        trans: &Transaction,
        start: Duration,
    ) -> BridgeResult<()> {
        self.sim.sleep(start).await;

        let mut delay = Duration::ZERO;
        target.handler.b_transport(target.tag, trans, &mut delay).await?;
        self.sim.sleep(delay).await;

        while self.response_in_progress.get() {
            self.end_response.wait().await;
        }

        let mut phase = Phase::BeginResp;
        let mut delay = Duration::ZERO;
        let status = self.forward_to_initiator(trans, &mut phase, &mut delay)?;
        if status != SyncStatus::Completed {
            self.response_in_progress.set(true);
        }
        Ok(())
    }

    pub(crate) async fn b_transport(
        &self,
        trans: &Transaction,
        delay: &mut Duration,
    ) -> BridgeResult<()> {
        let (non_blocking, blocking) = {
            let table = self.handlers.borrow();
            (table.non_blocking.is_some(), table.blocking.clone())
        };

        if let Some(target) = blocking {
            return target.handler.b_transport(target.tag, trans, delay).await;
        }
        if !non_blocking {
            return Err(self.fatal(BridgeError::unhandled(&self.name, "b_transport")));
        }

        let Some(done) = self.pending.register(trans.id()) else {
            return Err(self.fatal(BridgeError::TransactionReused {
                socket: self.name.clone(),
                transaction: trans.id(),
            }));
        };
        let _guard = PendingGuard {
            registry: &self.pending,
            id: trans.id(),
        };

        self.requests.notify(trans.clone(), *delay);
        *delay = Duration::ZERO;

        let ownership =
            (!trans.has_memory_manager()).then(|| TemporaryOwnership::install(&self.name, trans));

        let Ok(completion) = done.await else {
            return Err(self.fatal(BridgeError::protocol(
                &self.name,
                format!("{} was dropped before its exchange completed", trans.id()),
            )));
        };
        self.sim.sleep(completion).await;

        if let Some(ownership) = ownership {
            ownership.finish(trans).await?;
        }
        Ok(())
    }

    pub(crate) fn transport_dbg(&self, trans: &Transaction) -> u32 {
        let debug = self.handlers.borrow().debug.clone();
        match debug {
            Some(target) => target.handler.transport_dbg(target.tag, trans),
            None => 0,
        }
    }

    pub(crate) fn get_direct_mem_ptr(&self, trans: &Transaction, dmi: &mut DmiRegion) -> bool {
        let direct_memory = self.handlers.borrow().direct_memory.clone();
        match direct_memory {
            Some(target) => target.handler.get_direct_mem_ptr(target.tag, trans, dmi),
            None => {
                *dmi = DmiRegion::full_range();
                false
            }
        }
    }
}
