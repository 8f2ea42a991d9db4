use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;

use super::backward::BackwardPath;
use super::dispatch::dispatch_requests;
use super::handlers::{ForwardMode, ModuleKey, Registered};
use super::interface::{
    BackwardTransport, BlockingTarget, DebugTarget, DirectMemoryTarget, ForwardTransport,
    NonBlockingTarget, SocketTag,
};
use super::state::SocketCore;
use crate::error::{BridgeResult, HandlerKind};
use crate::payload::{DmiRegion, Phase, SyncStatus, Transaction, TransactionId};
use crate::sim::SimHandle;

/// Target socket that lets a module implement only one transport style.
///
/// Handlers are registered once, before the simulation starts, and all of
/// them must come from the same module. Every handler call carries the tag
/// given at registration.
pub struct TargetSocket<T: SocketTag = ()> {
    core: Rc<SocketCore<T>>,
}

/// Socket whose handlers take no identifier.
pub type SimpleTargetSocket = TargetSocket<()>;

/// Socket whose handlers receive an integer identifier, for modules serving
/// several sockets with one set of handlers.
pub type TaggedTargetSocket = TargetSocket<i32>;

impl<T: SocketTag> TargetSocket<T> {
    /// Create the socket and spawn its dispatch task.
    pub fn new(name: impl Into<String>, sim: &SimHandle) -> BridgeResult<Self> {
        let core = Rc::new(SocketCore::new(name.into(), sim));
        sim.spawn(
            format!("{}.dispatch", core.name),
            dispatch_requests(Rc::clone(&core)),
        )?;
        Ok(Self { core })
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn register_nb_transport_fw<M>(&self, module: &Rc<M>, tag: T) -> BridgeResult<()>
    where
        M: NonBlockingTarget<T> + 'static,
    {
        let handler: Rc<dyn NonBlockingTarget<T>> = module.clone();
        self.core
            .register(HandlerKind::NonBlocking, ModuleKey::of(module), |table| {
                table.non_blocking = Some(Registered { handler, tag });
            })
    }

    pub fn register_b_transport<M>(&self, module: &Rc<M>, tag: T) -> BridgeResult<()>
    where
        M: BlockingTarget<T> + 'static,
    {
        let handler: Rc<dyn BlockingTarget<T>> = module.clone();
        self.core
            .register(HandlerKind::Blocking, ModuleKey::of(module), |table| {
                table.blocking = Some(Registered { handler, tag });
            })
    }

    pub fn register_transport_dbg<M>(&self, module: &Rc<M>, tag: T) -> BridgeResult<()>
    where
        M: DebugTarget<T> + 'static,
    {
        let handler: Rc<dyn DebugTarget<T>> = module.clone();
        self.core
            .register(HandlerKind::Debug, ModuleKey::of(module), |table| {
                table.debug = Some(Registered { handler, tag });
            })
    }

    pub fn register_get_direct_mem_ptr<M>(&self, module: &Rc<M>, tag: T) -> BridgeResult<()>
    where
        M: DirectMemoryTarget<T> + 'static,
    {
        let handler: Rc<dyn DirectMemoryTarget<T>> = module.clone();
        self.core
            .register(HandlerKind::DirectMemory, ModuleKey::of(module), |table| {
                table.direct_memory = Some(Registered { handler, tag });
            })
    }

    /// Connect the initiator that receives backward calls.
    pub fn bind(&self, initiator: Rc<dyn BackwardTransport>) -> BridgeResult<()> {
        self.core.bind(initiator)
    }

    /// Backward interface for the module registered on this socket.
    pub fn backward_path(&self) -> BackwardPath<T> {
        BackwardPath::new(&self.core)
    }

    pub fn forward_mode(&self) -> ForwardMode {
        self.core.forward_mode()
    }

    /// Blocking calls waiting for their non-blocking exchange to complete.
    pub fn pending_count(&self) -> usize {
        self.core.pending.pending_count()
    }

    /// Request the dispatch task is holding until END_REQ arrives.
    pub fn current_transaction(&self) -> Option<TransactionId> {
        self.core.current.get()
    }

    /// Whether a response sent upward still waits for END_RESP.
    pub fn response_in_progress(&self) -> bool {
        self.core.response_in_progress.get()
    }

    /// Blocking calls queued but not yet picked up by the dispatch task.
    pub fn queued_requests(&self) -> usize {
        self.core.requests.len()
    }
}

impl<T: SocketTag> Clone for TargetSocket<T> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

#[async_trait(?Send)]
impl<T: SocketTag> ForwardTransport for TargetSocket<T> {
    fn nb_transport_fw(
        &self,
        trans: &Transaction,
        phase: &mut Phase,
        delay: &mut Duration,
    ) -> BridgeResult<SyncStatus> {
        self.core.nb_transport_fw(trans, phase, delay)
    }

    async fn b_transport(&self, trans: &Transaction, delay: &mut Duration) -> BridgeResult<()> {
        self.core.b_transport(trans, delay).await
    }

    fn transport_dbg(&self, trans: &Transaction) -> u32 {
        self.core.transport_dbg(trans)
    }

    fn get_direct_mem_ptr(&self, trans: &Transaction, dmi: &mut DmiRegion) -> bool {
        self.core.get_direct_mem_ptr(trans, dmi)
    }
}

impl<T: SocketTag> BackwardTransport for TargetSocket<T> {
    fn nb_transport_bw(
        &self,
        trans: &Transaction,
        phase: &mut Phase,
        delay: &mut Duration,
    ) -> BridgeResult<SyncStatus> {
        self.core.nb_transport_bw(trans, phase, delay)
    }

    fn invalidate_direct_mem_ptr(&self, start: u64, end: u64) -> BridgeResult<()> {
        self.core.invalidate_direct_mem_ptr(start, end)
    }
}
