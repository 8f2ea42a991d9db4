//! Handler registration table of a target socket.

use std::rc::Rc;

use super::interface::{
    BlockingTarget, DebugTarget, DirectMemoryTarget, NonBlockingTarget, SocketTag,
};
use crate::error::{BridgeError, BridgeResult, HandlerKind};

/// How forward transport calls are served, derived from what is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardMode {
    /// Nothing registered; any transport call is fatal
    Unset,
    /// Only a blocking handler; non-blocking calls are adapted
    Blocking,
    /// Only a non-blocking handler; blocking calls are adapted
    NonBlocking,
    /// Both registered; every call goes to its native handler
    Dual,
}

/// Identity of the module object behind a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ModuleKey(usize);

impl ModuleKey {
    pub(crate) fn of<M>(module: &Rc<M>) -> Self {
        Self(Rc::as_ptr(module).cast::<()>() as usize)
    }
}

/// A registered handler together with the tag passed on every call.
pub(crate) struct Registered<H: ?Sized, T> {
    pub(crate) handler: Rc<H>,
    pub(crate) tag: T,
}

impl<H: ?Sized, T: Copy> Clone for Registered<H, T> {
    fn clone(&self) -> Self {
        Self {
            handler: Rc::clone(&self.handler),
            tag: self.tag,
        }
    }
}

pub(crate) struct HandlerTable<T: SocketTag> {
    owner: Option<ModuleKey>,
    pub(crate) non_blocking: Option<Registered<dyn NonBlockingTarget<T>, T>>,
    pub(crate) blocking: Option<Registered<dyn BlockingTarget<T>, T>>,
    pub(crate) debug: Option<Registered<dyn DebugTarget<T>, T>>,
    pub(crate) direct_memory: Option<Registered<dyn DirectMemoryTarget<T>, T>>,
}

impl<T: SocketTag> HandlerTable<T> {
    pub(crate) fn new() -> Self {
        Self {
            owner: None,
            non_blocking: None,
            blocking: None,
            debug: None,
            direct_memory: None,
        }
    }

    pub(crate) fn mode(&self) -> ForwardMode {
        match (self.blocking.is_some(), self.non_blocking.is_some()) {
            (false, false) => ForwardMode::Unset,
            (true, false) => ForwardMode::Blocking,
            (false, true) => ForwardMode::NonBlocking,
            (true, true) => ForwardMode::Dual,
        }
    }

    pub(crate) fn is_set(&self, kind: HandlerKind) -> bool {
        match kind {
            HandlerKind::NonBlocking => self.non_blocking.is_some(),
            HandlerKind::Blocking => self.blocking.is_some(),
            HandlerKind::Debug => self.debug.is_some(),
            HandlerKind::DirectMemory => self.direct_memory.is_some(),
        }
    }

    /// Record the module behind the first registration; later registrations
    /// must come from the same module.
    pub(crate) fn claim_owner(
        &mut self,
        key: ModuleKey,
        kind: HandlerKind,
        socket: &str,
    ) -> BridgeResult<()> {
        match self.owner {
            Some(owner) if owner != key => Err(BridgeError::ForeignModule {
                socket: socket.to_string(),
                kind,
            }),
            _ => {
                self.owner = Some(key);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{Phase, SyncStatus, Transaction};
    use std::time::Duration;

    struct Echo;

    impl NonBlockingTarget for Echo {
        fn nb_transport_fw(
            &self,
            _tag: (),
            _trans: &Transaction,
            _phase: &mut Phase,
            _delay: &mut Duration,
        ) -> BridgeResult<SyncStatus> {
            Ok(SyncStatus::Completed)
        }
    }

    #[test]
    fn empty_table_is_unset() {
        let table: HandlerTable<()> = HandlerTable::new();
        assert_eq!(table.mode(), ForwardMode::Unset);
        assert!(!table.is_set(HandlerKind::Debug));
    }

    #[test]
    fn non_blocking_registration_sets_mode() {
        let mut table: HandlerTable<()> = HandlerTable::new();
        let echo = Rc::new(Echo);
        table.non_blocking = Some(Registered {
            handler: echo,
            tag: (),
        });
        assert_eq!(table.mode(), ForwardMode::NonBlocking);
        assert!(table.is_set(HandlerKind::NonBlocking));
    }

    #[test]
    fn claim_owner_rejects_second_module() {
        let mut table: HandlerTable<i32> = HandlerTable::new();
        let first = Rc::new(Echo);
        let second = Rc::new(Echo);

        table
            .claim_owner(ModuleKey::of(&first), HandlerKind::NonBlocking, "sock")
            .expect("first module claims the socket");
        table
            .claim_owner(ModuleKey::of(&first), HandlerKind::Debug, "sock")
            .expect("same module may register more handlers");

        let err = table
            .claim_owner(ModuleKey::of(&second), HandlerKind::Blocking, "sock")
            .unwrap_err();
        assert_eq!(
            err,
            BridgeError::ForeignModule {
                socket: "sock".to_string(),
                kind: HandlerKind::Blocking
            }
        );
    }
}
