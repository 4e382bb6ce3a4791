use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::error::{ControllerError, Result};

use super::state::{LifecycleState, Transition};

/// Callback notified with every committed transition of a signal.
pub type ObserverFn = dyn Fn(Transition) -> Result<()>;

/// Handle returned by [`LifecycleSignal::add_observer`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverToken(u64);

#[derive(Clone)]
struct ObserverEntry {
    token: ObserverToken,
    callback: Rc<ObserverFn>,
}

struct SignalInner {
    label: String,
    state: Cell<LifecycleState>,
    observers: RefCell<Vec<ObserverEntry>>,
    next_token: Cell<u64>,
    notifying: Cell<bool>,
    pending: Cell<Option<LifecycleState>>,
}

/// Observable, owner-driven lifecycle state holder.
///
/// Notification walks a snapshot of the observer list taken when the
/// transition is committed: forward transitions visit observers in
/// registration order, backward transitions in reverse registration order.
/// Observers removed while a notification is running are skipped; observers
/// added while it runs are not visited by it.
///
/// `advance_to` from inside an observer does not nest. The newest requested
/// state is parked and committed once the running notification has reached
/// every observer, so no observer ever sees two transitions interleaved.
#[derive(Clone)]
pub struct LifecycleSignal {
    inner: Rc<SignalInner>,
}

impl LifecycleSignal {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                label: label.into(),
                state: Cell::new(LifecycleState::Uninitialized),
                observers: RefCell::new(Vec::new()),
                next_token: Cell::new(0),
                notifying: Cell::new(false),
                pending: Cell::new(None),
            }),
        }
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn current_state(&self) -> LifecycleState {
        self.inner.state.get()
    }

    pub fn add_observer<F>(&self, observer: F) -> ObserverToken
    where
        F: Fn(Transition) -> Result<()> + 'static,
    {
        let token = ObserverToken(self.inner.next_token.get());
        self.inner.next_token.set(token.0 + 1);
        self.inner.observers.borrow_mut().push(ObserverEntry {
            token,
            callback: Rc::new(observer),
        });
        token
    }

    /// Unsubscribe an observer. Returns `false` if the token was not registered.
    pub fn remove_observer(&self, token: ObserverToken) -> bool {
        let mut observers = self.inner.observers.borrow_mut();
        let before = observers.len();
        observers.retain(|entry| entry.token != token);
        observers.len() != before
    }

    pub fn has_observer(&self, token: ObserverToken) -> bool {
        self.inner
            .observers
            .borrow()
            .iter()
            .any(|entry| entry.token == token)
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.borrow().len()
    }

    pub fn is_notifying(&self) -> bool {
        self.inner.notifying.get()
    }

    /// Drive the signal to `state`, notifying observers of the change.
    ///
    /// Leaving `Destroyed` fails with `IllegalTransition`. Errors raised by an
    /// observer stop the notification and are returned; the committed state
    /// is kept.
    pub fn advance_to(&self, state: LifecycleState) -> Result<()> {
        if self.inner.notifying.get() {
            self.inner.pending.set(Some(state));
            return Ok(());
        }

        let _guard = NotifyGuard::enter(&self.inner);
        let mut target = state;
        loop {
            self.commit(target)?;
            match self.inner.pending.take() {
                Some(next) => target = next,
                None => return Ok(()),
            }
        }
    }

    fn commit(&self, to: LifecycleState) -> Result<()> {
        let from = self.inner.state.get();
        if from == to {
            return Ok(());
        }
        if from == LifecycleState::Destroyed {
            return Err(ControllerError::IllegalTransition { from, to });
        }

        self.inner.state.set(to);
        let transition = Transition::new(from, to);
        let snapshot: Vec<ObserverEntry> = self.inner.observers.borrow().clone();

        if transition.is_forward() {
            for entry in snapshot.iter() {
                self.notify(entry, transition)?;
            }
        } else {
            for entry in snapshot.iter().rev() {
                self.notify(entry, transition)?;
            }
        }
        Ok(())
    }

    fn notify(&self, entry: &ObserverEntry, transition: Transition) -> Result<()> {
        if !self.has_observer(entry.token) {
            return Ok(());
        }
        (entry.callback)(transition)
    }
}

impl fmt::Debug for LifecycleSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleSignal")
            .field("label", &self.inner.label)
            .field("state", &self.inner.state.get())
            .field("observers", &self.observer_count())
            .finish()
    }
}

/// Clears the notifying flag and any parked state when a drive ends,
/// including when an observer error unwinds it early.
struct NotifyGuard<'a> {
    inner: &'a SignalInner,
}

impl<'a> NotifyGuard<'a> {
    fn enter(inner: &'a SignalInner) -> Self {
        inner.notifying.set(true);
        Self { inner }
    }
}

impl Drop for NotifyGuard<'_> {
    fn drop(&mut self) {
        self.inner.notifying.set(false);
        self.inner.pending.set(None);
    }
}
