//! Shared transaction record.
//!
//! A `Transaction` is a cheap handle; clones refer to the same record and two
//! distinct records never compare equal, whatever their contents. Lifetime of
//! the record as far as the protocol is concerned is tracked by an explicit
//! reference count, separate from the `Rc` count of handles: when the count
//! returns to zero the installed `MemoryManager` is told to free it.

use std::any::Any;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::extensions::Extensions;
use super::{Command, ResponseStatus};
use crate::error::{BridgeError, BridgeResult};

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a transaction record.
///
/// Allocated once per record; used as the key of the pending registry so
/// that lookups never depend on payload contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(u64);

impl TransactionId {
    fn next() -> Self {
        Self(NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transaction #{}", self.0)
    }
}

/// Party responsible for a transaction once its reference count drops to zero.
pub trait MemoryManager {
    /// Called exactly once each time the count reaches zero while this
    /// manager is installed.
    fn free(&self, trans: &Transaction);
}

/// Payload fields of a transaction.
#[derive(Debug, Clone, Default)]
pub struct Payload {
    pub address: u64,
    pub command: Command,
    pub data: Vec<u8>,
    pub streaming_width: u32,
    pub response_status: ResponseStatus,
    pub dmi_allowed: bool,
}

struct TransactionCore {
    id: TransactionId,
    payload: RefCell<Payload>,
    extensions: RefCell<Extensions>,
    ref_count: Cell<u32>,
    manager: RefCell<Option<Rc<dyn MemoryManager>>>,
}

/// Handle to a shared transaction record.
#[derive(Clone)]
pub struct Transaction {
    core: Rc<TransactionCore>,
}

impl Transaction {
    pub fn new(payload: Payload) -> Self {
        Self {
            core: Rc::new(TransactionCore {
                id: TransactionId::next(),
                payload: RefCell::new(payload),
                extensions: RefCell::new(Extensions::new()),
                ref_count: Cell::new(0),
                manager: RefCell::new(None),
            }),
        }
    }

    /// Read of `length` bytes at `address`; the data buffer is zero-filled.
    pub fn read(address: u64, length: usize) -> Self {
        Self::new(Payload {
            address,
            command: Command::Read,
            data: vec![0; length],
            streaming_width: streaming_width_for(length),
            ..Payload::default()
        })
    }

    pub fn write(address: u64, data: Vec<u8>) -> Self {
        let streaming_width = streaming_width_for(data.len());
        Self::new(Payload {
            address,
            command: Command::Write,
            data,
            streaming_width,
            ..Payload::default()
        })
    }

    pub fn id(&self) -> TransactionId {
        self.core.id
    }

    /// Whether both handles refer to the same record.
    pub fn same_as(&self, other: &Transaction) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }

    // Payload access. Borrows must not be held across calls into another
    // component, which may touch the same record.

    pub fn payload(&self) -> Ref<'_, Payload> {
        self.core.payload.borrow()
    }

    pub fn payload_mut(&self) -> RefMut<'_, Payload> {
        self.core.payload.borrow_mut()
    }

    pub fn address(&self) -> u64 {
        self.core.payload.borrow().address
    }

    pub fn command(&self) -> Command {
        self.core.payload.borrow().command
    }

    pub fn data_length(&self) -> usize {
        self.core.payload.borrow().data.len()
    }

    pub fn response_status(&self) -> ResponseStatus {
        self.core.payload.borrow().response_status
    }

    pub fn set_response_status(&self, status: ResponseStatus) {
        self.core.payload.borrow_mut().response_status = status;
    }

    // Extensions

    pub fn set_extension<E: Any>(&self, ext: E) -> Option<E> {
        self.core.extensions.borrow_mut().insert(ext)
    }

    /// Install an extension that is dropped when the record is reset.
    pub fn set_auto_extension<E: Any>(&self, ext: E) -> Option<E> {
        self.core.extensions.borrow_mut().insert_auto(ext)
    }

    pub fn extension<E: Any + Clone>(&self) -> Option<E> {
        self.core.extensions.borrow().get::<E>().cloned()
    }

    pub fn has_extension<E: Any>(&self) -> bool {
        self.core.extensions.borrow().contains::<E>()
    }

    pub fn clear_extension<E: Any>(&self) -> Option<E> {
        self.core.extensions.borrow_mut().remove::<E>()
    }

    /// Drop auto extensions so the record can start a new episode.
    pub fn reset(&self) {
        let dropped = self.core.extensions.borrow_mut().clear_auto();
        log::trace!(
            target: "tlm_bridge::transaction",
            "{} reset ({} auto extension(s) dropped)",
            self.core.id,
            dropped
        );
    }

    // Ownership

    pub fn has_memory_manager(&self) -> bool {
        self.core.manager.borrow().is_some()
    }

    pub fn set_memory_manager(&self, manager: Option<Rc<dyn MemoryManager>>) {
        *self.core.manager.borrow_mut() = manager;
    }

    pub fn ref_count(&self) -> u32 {
        self.core.ref_count.get()
    }

    pub fn acquire(&self) {
        self.core.ref_count.set(self.core.ref_count.get() + 1);
    }

    /// Drop one reference. The party that brings the count to zero hands the
    /// record to the memory manager, if one is installed.
    pub fn release(&self) -> BridgeResult<()> {
        let count = self.core.ref_count.get();
        if count == 0 {
            return Err(BridgeError::ReleaseUnderflow {
                transaction: self.core.id,
            });
        }
        self.core.ref_count.set(count - 1);
        if count == 1 {
            // Clone out so the manager may replace itself while freeing.
            let manager = self.core.manager.borrow().clone();
            if let Some(manager) = manager {
                manager.free(self);
            }
        }
        Ok(())
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Transaction {}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let payload = self.core.payload.borrow();
        f.debug_struct("Transaction")
            .field("id", &self.core.id)
            .field("command", &payload.command)
            .field("address", &format_args!("{:#x}", payload.address))
            .field("length", &payload.data.len())
            .field("ref_count", &self.core.ref_count.get())
            .finish()
    }
}

/// Streaming width covering a whole buffer, saturating at `u32::MAX`.
fn streaming_width_for(length: usize) -> u32 {
    u32::try_from(length).unwrap_or(u32::MAX)
}
