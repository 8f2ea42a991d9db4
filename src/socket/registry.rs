//! Completion registry for blocking calls adapted onto a non-blocking target.
//!
//! A blocking caller registers its transaction and awaits the returned
//! receiver. Whoever observes the end of the exchange (the dispatch task on a
//! `Completed` return, the backward adapter on `BEGIN_RESP`) calls
//! `complete()` with the annotated delay; the caller then resumes after that
//! delay. Only the single cooperative thread touches the registry.

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::payload::TransactionId;

/// Pending blocking calls, keyed by transaction identity.
pub(crate) struct CompletionRegistry {
    pending: RefCell<HashMap<TransactionId, oneshot::Sender<Duration>>>,
}

impl CompletionRegistry {
    pub(crate) fn new() -> Self {
        Self {
            pending: RefCell::new(HashMap::new()),
        }
    }

    /// Register a waiting transaction and return the receiver for its completion.
    ///
    /// Returns `None` if the transaction is already waiting: one identity is
    /// never pending twice.
    pub(crate) fn register(&self, id: TransactionId) -> Option<oneshot::Receiver<Duration>> {
        let mut pending = self.pending.borrow_mut();
        if pending.contains_key(&id) {
            return None;
        }
        let (tx, rx) = oneshot::channel();
        pending.insert(id, tx);
        Some(rx)
    }

    pub(crate) fn contains(&self, id: TransactionId) -> bool {
        self.pending.borrow().contains_key(&id)
    }

    /// Signal completion with the annotated delay and drop the entry.
    ///
    /// Returns `false` if the transaction was not pending. A waiter that went
    /// away still has its entry removed.
    pub(crate) fn complete(&self, id: TransactionId, delay: Duration) -> bool {
        let Some(tx) = self.pending.borrow_mut().remove(&id) else {
            return false;
        };
        if tx.send(delay).is_err() {
            log::debug!(
                target: "tlm_bridge::socket",
                "{} completed after its waiter went away",
                id
            );
        }
        true
    }

    /// Drop a pending entry without signaling it.
    pub(crate) fn remove(&self, id: TransactionId) -> bool {
        self.pending.borrow_mut().remove(&id).is_some()
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }
}
