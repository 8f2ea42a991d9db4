//! Temporary ownership of a transaction during blocking-call adaptation.
//!
//! A transaction that arrives without a memory manager gets one for the
//! duration of the call, so that a target acquiring and releasing it cannot
//! free it underneath the waiting caller. The caller releases its own
//! reference when the exchange completes and, if someone still holds the
//! record, waits until the last holder lets go.

use std::cell::Cell;
use std::rc::Rc;

use tokio::sync::Notify;

use crate::error::BridgeResult;
use crate::payload::{MemoryManager, Transaction};

pub(crate) struct TemporaryOwnership {
    socket: String,
    released: Notify,
    fired: Cell<bool>,
}

impl TemporaryOwnership {
    /// Install as memory manager of `trans` and take one reference.
    pub(crate) fn install(socket: &str, trans: &Transaction) -> Rc<Self> {
        let owner = Rc::new(Self {
            socket: socket.to_string(),
            released: Notify::new(),
            fired: Cell::new(false),
        });
        trans.set_memory_manager(Some(Rc::clone(&owner) as Rc<dyn MemoryManager>));
        trans.acquire();
        log::trace!(
            target: "tlm_bridge::socket",
            "{}: took temporary ownership of {}",
            socket,
            trans.id()
        );
        owner
    }

    /// Drop the bridge's reference and wait until every holder released.
    pub(crate) async fn finish(&self, trans: &Transaction) -> BridgeResult<()> {
        trans.release()?;
        if trans.ref_count() > 0 {
            log::debug!(
                target: "tlm_bridge::socket",
                "{}: {} still held by {} reference(s), waiting for release",
                self.socket,
                trans.id(),
                trans.ref_count()
            );
            self.released.notified().await;
        }
        trans.set_memory_manager(None);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn has_fired(&self) -> bool {
        self.fired.get()
    }
}

impl MemoryManager for TemporaryOwnership {
    fn free(&self, trans: &Transaction) {
        if self.fired.replace(true) {
            log::error!(
                target: "tlm_bridge::socket",
                "{}: release callback for {} fired twice in one ownership episode",
                self.socket,
                trans.id()
            );
            return;
        }
        // Signal first; reset drops the auto extensions of this episode.
        self.released.notify_one();
        trans.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Simulation;
    use std::time::Duration;

    #[test]
    fn install_takes_one_reference() {
        let trans = Transaction::read(0, 4);
        let owner = TemporaryOwnership::install("sock", &trans);

        assert!(trans.has_memory_manager());
        assert_eq!(trans.ref_count(), 1);
        assert!(!owner.has_fired());
    }

    #[test]
    fn finish_without_other_holders_frees_immediately() {
        let sim = Simulation::new();
        let trans = Transaction::read(0, 4);
        trans.set_auto_extension(42u32);
        let owner = TemporaryOwnership::install("sock", &trans);

        let t = trans.clone();
        let o = Rc::clone(&owner);
        sim.spawn("caller", async move {
            o.finish(&t).await.expect("finish");
        });
        sim.run().expect("run");

        assert!(owner.has_fired());
        assert_eq!(trans.ref_count(), 0);
        assert!(!trans.has_memory_manager());
        assert!(!trans.has_extension::<u32>(), "reset drops auto extensions");
    }

    #[test]
    fn finish_waits_for_last_holder() {
        let sim = Simulation::new();
        let handle = sim.handle();
        let trans = Transaction::read(0, 4);
        let owner = TemporaryOwnership::install("sock", &trans);
        // A target keeps its own reference.
        trans.acquire();

        let finished_at = Rc::new(Cell::new(None));
        let t = trans.clone();
        let o = Rc::clone(&owner);
        let h = handle.clone();
        let out = Rc::clone(&finished_at);
        sim.spawn("caller", async move {
            o.finish(&t).await.expect("finish");
            out.set(Some(h.now()));
        });

        let t = trans.clone();
        sim.spawn("target", async move {
            handle.sleep(Duration::from_nanos(30)).await;
            t.release().expect("target release");
        });

        sim.run().expect("run");
        assert_eq!(finished_at.get(), Some(Duration::from_nanos(30)));
        assert!(owner.has_fired());
    }

    #[test]
    fn second_free_in_same_episode_is_ignored() {
        let trans = Transaction::read(0, 4);
        let owner = TemporaryOwnership::install("sock", &trans);
        trans.set_auto_extension(1u8);

        owner.free(&trans);
        trans.set_auto_extension(2u8);
        owner.free(&trans);

        assert!(owner.has_fired());
        assert_eq!(
            trans.extension::<u8>(),
            Some(2),
            "second callback must not reset the record again"
        );
    }
}
