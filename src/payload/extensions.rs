//! Typed extension slots attached to a transaction.
//!
//! One slot per extension type. Extensions installed as "auto" belong to the
//! current ownership episode and are dropped by `Transaction::reset()`.

use std::any::{Any, TypeId};
use std::collections::HashMap;

struct Slot {
    value: Box<dyn Any>,
    auto: bool,
}

/// Extension storage keyed by the extension's type.
#[derive(Default)]
pub struct Extensions {
    slots: HashMap<TypeId, Slot>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install an extension, returning the previous one of the same type.
    pub fn insert<E: Any>(&mut self, ext: E) -> Option<E> {
        self.insert_slot(ext, false)
    }

    /// Install an extension that `clear_auto()` will drop.
    pub fn insert_auto<E: Any>(&mut self, ext: E) -> Option<E> {
        self.insert_slot(ext, true)
    }

    fn insert_slot<E: Any>(&mut self, ext: E, auto: bool) -> Option<E> {
        let previous = self.slots.insert(
            TypeId::of::<E>(),
            Slot {
                value: Box::new(ext),
                auto,
            },
        );
        previous.and_then(|slot| slot.value.downcast::<E>().ok().map(|boxed| *boxed))
    }

    pub fn get<E: Any>(&self) -> Option<&E> {
        self.slots
            .get(&TypeId::of::<E>())
            .and_then(|slot| slot.value.downcast_ref::<E>())
    }

    pub fn get_mut<E: Any>(&mut self) -> Option<&mut E> {
        self.slots
            .get_mut(&TypeId::of::<E>())
            .and_then(|slot| slot.value.downcast_mut::<E>())
    }

    pub fn remove<E: Any>(&mut self) -> Option<E> {
        self.slots
            .remove(&TypeId::of::<E>())
            .and_then(|slot| slot.value.downcast::<E>().ok().map(|boxed| *boxed))
    }

    pub fn contains<E: Any>(&self) -> bool {
        self.slots.contains_key(&TypeId::of::<E>())
    }

    /// Drop every auto extension. Returns how many were dropped.
    pub fn clear_auto(&mut self) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, slot| !slot.auto);
        before - self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl std::fmt::Debug for Extensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extensions")
            .field("len", &self.slots.len())
            .finish()
    }
}
