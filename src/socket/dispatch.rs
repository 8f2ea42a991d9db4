//! Dispatch task: turns queued blocking calls into non-blocking exchanges.
//!
//! One task per socket drains the request queue in (time, arrival) order and
//! drives each transaction through the target's non-blocking handler. A
//! request the target accepted without ending it holds the task until END_REQ
//! arrives, so at most one request per socket is outstanding at a time.

use std::rc::Rc;
use std::time::Duration;

use super::interface::SocketTag;
use super::state::SocketCore;
use crate::error::{BridgeError, BridgeResult};
use crate::payload::{Phase, SyncStatus, Transaction};

/// Body of the dispatch task. Returns only after a fatal error.
pub(crate) async fn dispatch_requests<T: SocketTag>(core: Rc<SocketCore<T>>) {
    loop {
        core.requests.wait().await;
        while let Some(trans) = core.requests.next_ready() {
            if let Err(err) = core.drive(&trans).await {
                core.fatal(err);
                return;
            }
        }
    }
}

impl<T: SocketTag> SocketCore<T> {
    /// Run the non-blocking handler for a request queued by `b_transport`.
    fn call_non_blocking(
        &self,
        trans: &Transaction,
        phase: &mut Phase,
        delay: &mut Duration,
    ) -> BridgeResult<SyncStatus> {
        let target = self.handlers.borrow().non_blocking.clone();
        let Some(target) = target else {
            return Err(BridgeError::unhandled(&self.name, "nb_transport_fw"));
        };
        target.handler.nb_transport_fw(target.tag, trans, phase, delay)
    }

    async fn drive(&self, trans: &Transaction) -> BridgeResult<()> {
        let mut phase = Phase::BeginReq;
        let mut delay = Duration::ZERO;
        let status = self.call_non_blocking(trans, &mut phase, &mut delay)?;
        log::trace!(
            target: "tlm_bridge::socket",
            "{}: {} BEGIN_REQ returned {} with phase {} after {:?}",
            self.name,
            trans.id(),
            status,
            phase,
            delay
        );

        match (status, phase) {
            (SyncStatus::Completed, _) => self.signal_completion(trans, delay),
            (SyncStatus::Accepted | SyncStatus::Updated, Phase::BeginReq) => {
                self.current.set(Some(trans.id()));
                self.end_request.wait().await;
                self.current.set(None);
                Ok(())
            }
            (SyncStatus::Accepted | SyncStatus::Updated, Phase::EndReq) => {
                self.sim.sleep(delay).await;
                Ok(())
            }
            (SyncStatus::Accepted | SyncStatus::Updated, Phase::BeginResp) => {
                // END_RESP goes out at the annotated response time.
                let mut phase = Phase::EndResp;
                let mut delay = delay;
                self.call_non_blocking(trans, &mut phase, &mut delay)?;
                self.signal_completion(trans, delay)
            }
            (status, phase) => Err(BridgeError::unexpected_status(
                &self.name,
                "dispatch of a blocking call",
                phase,
                status,
            )),
        }
    }
}
