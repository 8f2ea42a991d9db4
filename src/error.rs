//! Error handling types for tlm-bridge
//!
//! This module provides the error taxonomy shared by the simulation kernel and
//! the target socket. Fatal variants abort the simulated run; the rest are
//! reported to the caller and leave the socket usable.

use std::sync::PoisonError;
use thiserror::Error;

use crate::payload::{Phase, SyncStatus, TransactionId};

/// Which handler slot of a socket a registration targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    /// Non-blocking (phase-based) forward transport
    NonBlocking,
    /// Blocking forward transport
    Blocking,
    /// Debug transport
    Debug,
    /// Direct memory interface query
    DirectMemory,
}

impl std::fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HandlerKind::NonBlocking => "non-blocking transport",
            HandlerKind::Blocking => "blocking transport",
            HandlerKind::Debug => "debug transport",
            HandlerKind::DirectMemory => "direct memory",
        };
        f.write_str(name)
    }
}

/// Comprehensive error type for bridge operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// Unexpected phase/status combination; protocol state is undefined afterwards
    #[error("{socket}: protocol violation: {detail}")]
    ProtocolViolation { socket: String, detail: String },

    /// A handler of this kind is already registered; the first one stays active
    #[error("{socket}: {kind} callback already registered")]
    DoubleRegistration { socket: String, kind: HandlerKind },

    /// A transport call arrived and no handler can serve it
    #[error("{socket}: no transport callback registered for {call}")]
    UnhandledRequest { socket: String, call: &'static str },

    /// Registration or binding attempted after the simulation started
    #[error("{socket}: cannot register {what} after the simulation has started")]
    RegistrationClosed { socket: String, what: String },

    /// Handlers on one socket must all belong to the same module
    #[error("{socket}: {kind} callback belongs to a different module than earlier registrations")]
    ForeignModule { socket: String, kind: HandlerKind },

    /// The backward path already has an initiator
    #[error("{socket}: already bound to an initiator")]
    AlreadyBound { socket: String },

    /// A backward call was made before any initiator was bound
    #[error("{socket}: no initiator bound for {call}")]
    Unbound { socket: String, call: &'static str },

    /// A transaction was handed to a second blocking call while the first is still waiting
    #[error("{socket}: {transaction} is already waiting for completion")]
    TransactionReused {
        socket: String,
        transaction: TransactionId,
    },

    /// `release()` called on a transaction without a matching `acquire()`
    #[error("{transaction} released more often than acquired")]
    ReleaseUnderflow { transaction: TransactionId },

    /// A target used its backward path after the socket was dropped
    #[error("target socket was dropped")]
    SocketDropped,

    /// The simulation kernel was dropped while a component still used it
    #[error("simulation kernel is gone")]
    KernelGone,
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Helper functions for common error patterns
impl BridgeError {
    /// Create a protocol violation for an unexpected phase
    pub fn unexpected_phase(socket: impl Into<String>, context: &str, phase: Phase) -> Self {
        BridgeError::ProtocolViolation {
            socket: socket.into(),
            detail: format!("unexpected phase {phase} in {context}"),
        }
    }

    /// Create a protocol violation for an unexpected phase/status pair
    pub fn unexpected_status(
        socket: impl Into<String>,
        context: &str,
        phase: Phase,
        status: SyncStatus,
    ) -> Self {
        BridgeError::ProtocolViolation {
            socket: socket.into(),
            detail: format!("unexpected {status} with phase {phase} in {context}"),
        }
    }

    /// Create a protocol violation with a free-form description
    pub fn protocol(socket: impl Into<String>, detail: impl Into<String>) -> Self {
        BridgeError::ProtocolViolation {
            socket: socket.into(),
            detail: detail.into(),
        }
    }

    /// Create an unhandled request error
    pub fn unhandled(socket: impl Into<String>, call: &'static str) -> Self {
        BridgeError::UnhandledRequest {
            socket: socket.into(),
            call,
        }
    }

    /// Whether this error must abort the simulated run.
    ///
    /// Registration problems are reported to the caller during setup and do
    /// not stop the kernel.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            BridgeError::DoubleRegistration { .. }
                | BridgeError::RegistrationClosed { .. }
                | BridgeError::ForeignModule { .. }
                | BridgeError::AlreadyBound { .. }
        )
    }
}

/// Helper trait to recover from a poisoned lock
pub trait LockResultExt<T> {
    /// Recover the guard from a PoisonError with logging.
    ///
    /// The context parameter identifies which operation triggered lock recovery.
    fn recover_poison(self, context: &str) -> T;
}

impl<T> LockResultExt<T> for Result<T, PoisonError<T>> {
    fn recover_poison(self, context: &str) -> T {
        match self {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!(
                    target: "tlm_bridge::lock_recovery",
                    "Recovered from poisoned lock in {}",
                    context
                );
                poisoned.into_inner()
            }
        }
    }
}
