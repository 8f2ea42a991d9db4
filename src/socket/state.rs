//! Shared state of one target socket.
//!
//! The forward adapter, the backward adapter and the dispatch task all work
//! on the same `SocketCore`. Their entry points live in `forward.rs`,
//! `backward.rs` and `dispatch.rs`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use super::handlers::{ForwardMode, HandlerTable, ModuleKey};
use super::interface::{BackwardTransport, SocketTag};
use super::registry::CompletionRegistry;
use crate::error::{BridgeError, BridgeResult, HandlerKind};
use crate::payload::{Phase, SyncStatus, Transaction, TransactionId};
use crate::sim::{Event, PayloadEventQueue, SimHandle};

pub(crate) struct SocketCore<T: SocketTag> {
    pub(crate) name: String,
    pub(crate) sim: SimHandle,
    pub(crate) handlers: RefCell<HandlerTable<T>>,
    pub(crate) initiator: RefCell<Option<Rc<dyn BackwardTransport>>>,
    /// Blocking callers waiting for their exchange to complete
    pub(crate) pending: CompletionRegistry,
    /// Blocking calls queued for the dispatch task
    pub(crate) requests: PayloadEventQueue<Transaction>,
    pub(crate) end_request: Event,
    /// Request the dispatch task is holding until END_REQ
    pub(crate) current: Cell<Option<TransactionId>>,
    pub(crate) response_in_progress: Cell<bool>,
    pub(crate) end_response: Event,
}

impl<T: SocketTag> SocketCore<T> {
    pub(crate) fn new(name: String, sim: &SimHandle) -> Self {
        Self {
            requests: PayloadEventQueue::new(format!("{name}.requests"), sim),
            end_request: Event::new(format!("{name}.end_request"), sim),
            end_response: Event::new(format!("{name}.end_response"), sim),
            sim: sim.clone(),
            handlers: RefCell::new(HandlerTable::new()),
            initiator: RefCell::new(None),
            pending: CompletionRegistry::new(),
            current: Cell::new(None),
            response_in_progress: Cell::new(false),
            name,
        }
    }

    /// Abort the run with `err` and hand it back for propagation.
    pub(crate) fn fatal(&self, err: BridgeError) -> BridgeError {
        self.sim.halt(err.clone());
        err
    }

    pub(crate) fn forward_mode(&self) -> ForwardMode {
        self.handlers.borrow().mode()
    }

    /// Install one handler slot.
    ///
    /// A slot that is already filled keeps its first handler; the attempt is
    /// logged as a warning and otherwise ignored.
    pub(crate) fn register(
        &self,
        kind: HandlerKind,
        module: ModuleKey,
        install: impl FnOnce(&mut HandlerTable<T>),
    ) -> BridgeResult<()> {
        if self.sim.has_started() {
            return Err(BridgeError::RegistrationClosed {
                socket: self.name.clone(),
                what: format!("{kind} callback"),
            });
        }

        let mut table = self.handlers.borrow_mut();
        table.claim_owner(module, kind, &self.name)?;
        if table.is_set(kind) {
            log::warn!(
                target: "tlm_bridge::socket",
                "{}",
                BridgeError::DoubleRegistration {
                    socket: self.name.clone(),
                    kind,
                }
            );
            return Ok(());
        }

        let before = table.mode();
        install(&mut table);
        log::debug!(target: "tlm_bridge::socket", "{}: registered {} callback", self.name, kind);
        if before != ForwardMode::Dual && table.mode() == ForwardMode::Dual {
            log::warn!(
                target: "tlm_bridge::socket",
                "{}: both blocking and non-blocking callbacks registered; calls go to their native callback without adaptation",
                self.name
            );
        }
        Ok(())
    }

    pub(crate) fn bind(&self, initiator: Rc<dyn BackwardTransport>) -> BridgeResult<()> {
        if self.sim.has_started() {
            return Err(BridgeError::RegistrationClosed {
                socket: self.name.clone(),
                what: "an initiator binding".to_string(),
            });
        }
        let mut slot = self.initiator.borrow_mut();
        if slot.is_some() {
            return Err(BridgeError::AlreadyBound {
                socket: self.name.clone(),
            });
        }
        *slot = Some(initiator);
        Ok(())
    }

    /// Send a backward call to the bound initiator.
    pub(crate) fn forward_to_initiator(
        &self,
        trans: &Transaction,
        phase: &mut Phase,
        delay: &mut Duration,
    ) -> BridgeResult<SyncStatus> {
        let initiator = self.initiator.borrow().clone();
        match initiator {
            Some(initiator) => initiator.nb_transport_bw(trans, phase, delay),
            None => Err(self.fatal(BridgeError::Unbound {
                socket: self.name.clone(),
                call: "nb_transport_bw",
            })),
        }
    }

    /// Wake the blocking caller waiting on `trans`; it resumes after `delay`.
    pub(crate) fn signal_completion(&self, trans: &Transaction, delay: Duration) -> BridgeResult<()> {
        if self.pending.complete(trans.id(), delay) {
            log::debug!(
                target: "tlm_bridge::socket",
                "{}: {} completed, caller resumes after {:?}",
                self.name,
                trans.id(),
                delay
            );
            Ok(())
        } else {
            Err(self.fatal(BridgeError::protocol(
                &self.name,
                format!("completion for {} which no blocking call is waiting on", trans.id()),
            )))
        }
    }
}
