//! Transaction payload and the protocol vocabulary exchanged across a socket.
//!
//! - `transaction` - shared, reference-counted `Transaction` record
//! - `extensions` - typed extension slots carried by a transaction

mod extensions;
mod transaction;

pub use extensions::Extensions;
pub use transaction::{MemoryManager, Payload, Transaction, TransactionId};

use std::fmt;
use std::time::Duration;

/// Handshake phase of a non-blocking transport call.
///
/// A full exchange walks `BeginReq -> EndReq -> BeginResp -> EndResp`;
/// a `Completed` return may collapse the remaining phases into one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    BeginReq,
    EndReq,
    BeginResp,
    EndResp,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::BeginReq => "BEGIN_REQ",
            Phase::EndReq => "END_REQ",
            Phase::BeginResp => "BEGIN_RESP",
            Phase::EndResp => "END_RESP",
        };
        f.write_str(name)
    }
}

/// Return value of every non-blocking transport call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStatus {
    /// Callee took the call; phase and delay are unchanged
    Accepted,
    /// Callee advanced the phase and/or delay
    Updated,
    /// Transaction is finished; no further phases follow
    Completed,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncStatus::Accepted => "ACCEPTED",
            SyncStatus::Updated => "UPDATED",
            SyncStatus::Completed => "COMPLETED",
        };
        f.write_str(name)
    }
}

/// Command carried by a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Command {
    Read,
    Write,
    #[default]
    Ignore,
}

/// Response status written by the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResponseStatus {
    Ok,
    #[default]
    Incomplete,
    GenericError,
    AddressError,
    CommandError,
    BurstError,
    ByteEnableError,
}

impl ResponseStatus {
    pub fn is_ok(self) -> bool {
        self == ResponseStatus::Ok
    }
}

/// Access rights granted by a direct memory interface answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DmiAccess {
    #[default]
    None,
    Read,
    Write,
    ReadWrite,
}

/// Direct memory interface region returned by `get_direct_mem_ptr`.
///
/// The region describes what the target allows; the boolean returned next to
/// it says whether a direct pointer is actually available.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DmiRegion {
    pub start_address: u64,
    pub end_address: u64,
    pub access: DmiAccess,
    pub read_latency: Duration,
    pub write_latency: Duration,
}

impl DmiRegion {
    /// Region covering the whole address space with read/write allowed.
    ///
    /// Used as the answer when a target has no DMI support: it tells the
    /// initiator that no part of the address space will ever grant DMI.
    pub fn full_range() -> Self {
        Self {
            start_address: 0,
            end_address: u64::MAX,
            access: DmiAccess::ReadWrite,
            ..Self::default()
        }
    }

    pub fn contains(&self, address: u64) -> bool {
        (self.start_address..=self.end_address).contains(&address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_display_uses_protocol_names() {
        assert_eq!(Phase::BeginReq.to_string(), "BEGIN_REQ");
        assert_eq!(Phase::EndResp.to_string(), "END_RESP");
        assert_eq!(SyncStatus::Completed.to_string(), "COMPLETED");
    }

    #[test]
    fn full_range_covers_every_address() {
        let region = DmiRegion::full_range();
        assert!(region.contains(0));
        assert!(region.contains(u64::MAX));
        assert_eq!(region.access, DmiAccess::ReadWrite);
    }
}
