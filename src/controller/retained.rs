use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use thiserror::Error;

/// Object kept alive by a controller across every transition until it is destroyed.
pub trait Retained: 'static {
    /// Invoked exactly once, when the owning controller reaches `Destroyed`.
    fn on_cleared(&self) {}
}

struct Slot {
    type_id: TypeId,
    value: Box<dyn Any>,
    on_cleared: Box<dyn Fn()>,
}

/// Per-controller store of retained objects, keyed by their type.
///
/// Each type appears at most once. Objects are released in insertion order
/// when the store is cleared; a cleared store accepts nothing new.
#[derive(Default)]
pub struct RetainedStore {
    slots: RefCell<Vec<Slot>>,
    cleared: Cell<bool>,
}

impl RetainedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Retained>(&self, value: T) -> Result<Rc<T>, RetainedError> {
        self.ensure_open()?;
        if self.contains::<T>() {
            return Err(RetainedError::AlreadyExists(std::any::type_name::<T>()));
        }
        Ok(self.push(Rc::new(value)))
    }

    pub fn get<T: Retained>(&self) -> Option<Rc<T>> {
        self.slots
            .borrow()
            .iter()
            .find(|slot| slot.type_id == TypeId::of::<T>())
            .and_then(|slot| slot.value.downcast_ref::<Rc<T>>().cloned())
    }

    /// Fetch the stored `T`, creating it with `make` on first use.
    ///
    /// `make` runs without the store borrowed, so it may itself use the store.
    pub fn get_or_insert_with<T, F>(&self, make: F) -> Result<Rc<T>, RetainedError>
    where
        T: Retained,
        F: FnOnce() -> T,
    {
        if let Some(existing) = self.get::<T>() {
            return Ok(existing);
        }
        self.ensure_open()?;
        let value = Rc::new(make());
        if let Some(existing) = self.get::<T>() {
            return Ok(existing);
        }
        Ok(self.push(value))
    }

    pub fn contains<T: Retained>(&self) -> bool {
        self.slots
            .borrow()
            .iter()
            .any(|slot| slot.type_id == TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }

    pub fn is_cleared(&self) -> bool {
        self.cleared.get()
    }

    /// Release every object, running `on_cleared` hooks in insertion order.
    pub(crate) fn clear(&self) {
        if self.cleared.replace(true) {
            return;
        }
        let slots = std::mem::take(&mut *self.slots.borrow_mut());
        for slot in slots {
            (slot.on_cleared)();
        }
    }

    fn push<T: Retained>(&self, value: Rc<T>) -> Rc<T> {
        let hook = Rc::clone(&value);
        self.slots.borrow_mut().push(Slot {
            type_id: TypeId::of::<T>(),
            value: Box::new(Rc::clone(&value)),
            on_cleared: Box::new(move || hook.on_cleared()),
        });
        value
    }

    fn ensure_open(&self) -> Result<(), RetainedError> {
        if self.cleared.get() {
            Err(RetainedError::Cleared)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Error)]
pub enum RetainedError {
    #[error("retained object `{0}` already exists")]
    AlreadyExists(&'static str),
    #[error("retained store was cleared when its controller was destroyed")]
    Cleared,
}
