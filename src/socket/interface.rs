//! Transport interfaces on both sides of a target socket.
//!
//! `ForwardTransport` / `BackwardTransport` are what peers see: an initiator
//! calls forward transport on the socket and implements backward transport
//! itself. The `*Target` traits are what the implementing module registers;
//! each call carries the tag chosen at registration (`()` when untagged).

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::BridgeResult;
use crate::payload::{DmiRegion, Phase, SyncStatus, Transaction};

/// Identifier threaded through every handler call.
///
/// `()` for a plain socket, an integer for a tagged one.
pub trait SocketTag: Copy + fmt::Debug + 'static {}

impl<T: Copy + fmt::Debug + 'static> SocketTag for T {}

/// Calls traveling from initiator toward target.
#[async_trait(?Send)]
pub trait ForwardTransport {
    fn nb_transport_fw(
        &self,
        trans: &Transaction,
        phase: &mut Phase,
        delay: &mut Duration,
    ) -> BridgeResult<SyncStatus>;

    async fn b_transport(&self, trans: &Transaction, delay: &mut Duration) -> BridgeResult<()>;

    /// Number of bytes processed; 0 means no debug support.
    fn transport_dbg(&self, trans: &Transaction) -> u32;

    /// Whether a direct memory pointer is available for the region in `dmi`.
    fn get_direct_mem_ptr(&self, trans: &Transaction, dmi: &mut DmiRegion) -> bool;
}

/// Calls traveling from target toward initiator.
pub trait BackwardTransport {
    fn nb_transport_bw(
        &self,
        trans: &Transaction,
        phase: &mut Phase,
        delay: &mut Duration,
    ) -> BridgeResult<SyncStatus>;

    fn invalidate_direct_mem_ptr(&self, start: u64, end: u64) -> BridgeResult<()>;
}

/// Phase-based forward handler of a target module.
///
/// Must not suspend; follow-up phases are sent later through the socket's
/// backward path.
pub trait NonBlockingTarget<T: SocketTag = ()> {
    fn nb_transport_fw(
        &self,
        tag: T,
        trans: &Transaction,
        phase: &mut Phase,
        delay: &mut Duration,
    ) -> BridgeResult<SyncStatus>;
}

/// Blocking forward handler of a target module. May suspend in simulated time.
#[async_trait(?Send)]
pub trait BlockingTarget<T: SocketTag = ()> {
    async fn b_transport(&self, tag: T, trans: &Transaction, delay: &mut Duration)
    -> BridgeResult<()>;
}

pub trait DebugTarget<T: SocketTag = ()> {
    fn transport_dbg(&self, tag: T, trans: &Transaction) -> u32;
}

pub trait DirectMemoryTarget<T: SocketTag = ()> {
    fn get_direct_mem_ptr(&self, tag: T, trans: &Transaction, dmi: &mut DmiRegion) -> bool;
}
