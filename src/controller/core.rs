use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::json;

use crate::error::{ControllerError, Result};
use crate::lifecycle::{
    LifecycleEvent, LifecycleSignal, LifecycleState, ObserverToken, Transition,
};
use crate::logging::{LogLevel, json_str};
use crate::runtime::RuntimeContext;
use crate::runtime::audit::{LifecycleAuditEventBuilder, LifecycleAuditStage};
use crate::surface::{ProviderSurfaceHost, Surface, SurfaceHost};

use super::behavior::{ControllerBehavior, ControllerContext, dispatch};
use super::manager::{Container, ControllerManager};
use super::retained::RetainedStore;

const LOG_TARGET: &str = "room::controller";

static NEXT_CONTROLLER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControllerId(u64);

impl ControllerId {
    fn next() -> Self {
        Self(NEXT_CONTROLLER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vc#{}", self.0)
    }
}

/// Everything a controller receives from the manager that adopts it.
struct Attachment {
    context: RuntimeContext,
    container: Option<Surface>,
    children: ControllerManager,
    parent: ParentLink,
}

/// Non-owning link from a child to the controller whose manager adopted it.
#[derive(Clone, Default)]
pub(super) struct ParentLink(Weak<ControllerInner>);

impl ParentLink {
    fn upgrade(&self) -> Option<Controller> {
        self.0.upgrade().map(|inner| Controller { inner })
    }
}

struct ControllerInner {
    id: ControllerId,
    behavior: Rc<dyn ControllerBehavior>,
    signal: LifecycleSignal,
    retained: RetainedStore,
    attachment: RefCell<Option<Attachment>>,
    owned_surface: RefCell<Option<Surface>>,
    stepping: Cell<bool>,
    // Walks in flight anywhere below this controller.
    descendant_walks: Cell<usize>,
    pending_target: Cell<Option<LifecycleState>>,
}

/// Handle to a lifecycle-aware unit of UI logic.
///
/// Clones share the same controller; equality is identity. A controller is
/// passive until a [`ControllerManager`] adopts it, after which its state is
/// driven entirely by the lifecycle it is registered on. It moves one
/// adjacent step at a time and fires exactly one hook per step.
#[derive(Clone)]
pub struct Controller {
    inner: Rc<ControllerInner>,
}

impl Controller {
    pub fn new(behavior: impl ControllerBehavior) -> Self {
        Self::from_behavior(Rc::new(behavior))
    }

    /// Build a controller over a behaviour the caller keeps a handle to.
    pub fn from_behavior(behavior: Rc<dyn ControllerBehavior>) -> Self {
        let id = ControllerId::next();
        let inner = Rc::new_cyclic(|weak: &Weak<ControllerInner>| {
            let signal = LifecycleSignal::new(format!("{id}:{}", behavior.name()));
            // Registered first: runs before child observers going forward and
            // after them going backward.
            let hooks = weak.clone();
            signal.add_observer(move |transition| match hooks.upgrade() {
                Some(inner) => Controller { inner }.on_transition(transition),
                None => Ok(()),
            });
            ControllerInner {
                id,
                behavior,
                signal,
                retained: RetainedStore::new(),
                attachment: RefCell::new(None),
                owned_surface: RefCell::new(None),
                stepping: Cell::new(false),
                descendant_walks: Cell::new(0),
                pending_target: Cell::new(None),
            }
        });
        Self { inner }
    }

    pub fn id(&self) -> ControllerId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        self.inner.behavior.name()
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.signal.current_state()
    }

    pub fn ptr_eq(&self, other: &Controller) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn is_attached(&self) -> bool {
        self.inner.attachment.borrow().is_some()
    }

    pub fn runtime(&self) -> Option<RuntimeContext> {
        self.inner
            .attachment
            .borrow()
            .as_ref()
            .map(|attachment| attachment.context.clone())
    }

    pub fn retained(&self) -> &RetainedStore {
        &self.inner.retained
    }

    /// Container surface this controller was attached with, if any.
    pub fn container(&self) -> Option<Surface> {
        self.inner
            .attachment
            .borrow()
            .as_ref()
            .and_then(|attachment| attachment.container.clone())
    }

    pub fn owned_surface(&self) -> Option<Surface> {
        self.inner.owned_surface.borrow().clone()
    }

    /// Observe this controller's lifecycle alongside its children.
    ///
    /// The observer takes part in the same ordering as child controllers:
    /// notified after earlier registrations going forward, before them going
    /// backward.
    pub fn observe<F>(&self, observer: F) -> ObserverToken
    where
        F: Fn(Transition) -> Result<()> + 'static,
    {
        self.inner.signal.add_observer(observer)
    }

    pub fn unobserve(&self, token: ObserverToken) -> bool {
        self.inner.signal.remove_observer(token)
    }

    /// Manager for this controller's children. Fails until it is attached.
    pub fn child_manager(&self) -> Result<ControllerManager> {
        self.attached_children()
            .ok_or(ControllerError::InvalidLifecycleState {
                state: self.state(),
                operation: "child_manager",
            })
    }

    pub fn children(&self) -> Vec<Controller> {
        self.attached_children()
            .map(|manager| manager.controllers())
            .unwrap_or_default()
    }

    pub fn add_child(&self, child: &Controller) -> Result<()> {
        self.add_child_to(Container::Detached, child)
    }

    /// Register `child` under this controller. An unattached controller has
    /// never been created, so it fails like any add before `Created`.
    pub fn add_child_to(&self, container: impl Into<Container>, child: &Controller) -> Result<()> {
        self.attached_children()
            .ok_or(ControllerError::InvalidLifecycleState {
                state: self.state(),
                operation: "add",
            })?
            .add(container, child)
    }

    pub fn remove_child(&self, child: &Controller) -> Result<()> {
        self.attached_children()
            .ok_or(ControllerError::NotRegistered(child.id()))?
            .remove(child)
    }

    fn attached_children(&self) -> Option<ControllerManager> {
        self.inner
            .attachment
            .borrow()
            .as_ref()
            .map(|attachment| attachment.children.clone())
    }

    fn parent(&self) -> Option<Controller> {
        self.inner
            .attachment
            .borrow()
            .as_ref()
            .and_then(|attachment| attachment.parent.upgrade())
    }

    fn ancestors(&self) -> impl Iterator<Item = Controller> {
        std::iter::successors(self.parent(), Controller::parent)
    }

    /// Build and insert this controller's surface into its container.
    ///
    /// `factory` receives the container. A surface installed earlier is
    /// detached once the new one is in place. The surface becomes the root
    /// that this controller's children resolve their containers against.
    pub fn set_owned_surface<F>(&self, factory: F) -> Result<Surface>
    where
        F: FnOnce(&Surface) -> Surface,
    {
        let state = self.state();
        if state == LifecycleState::Destroyed {
            return Err(ControllerError::InvalidLifecycleState {
                state,
                operation: "set_owned_surface",
            });
        }
        let container = self
            .container()
            .ok_or(ControllerError::NotAttachedToContainer(self.id()))?;

        let surface = factory(&container);
        container.add_child(&surface)?;
        let previous = self.inner.owned_surface.replace(Some(surface.clone()));
        if let Some(previous) = previous {
            if !previous.ptr_eq(&surface) {
                previous.detach();
            }
        }
        Ok(surface)
    }

    /// Adopt the runtime context and container handed down by a manager.
    pub(super) fn attach(
        &self,
        context: RuntimeContext,
        container: Option<Surface>,
        parent: ParentLink,
    ) -> Result<()> {
        if self.is_attached() {
            return Err(ControllerError::AlreadyAttached(self.id()));
        }
        let state = self.state();
        if state != LifecycleState::Uninitialized {
            return Err(ControllerError::InvalidLifecycleState {
                state,
                operation: "attach",
            });
        }

        let owner = Rc::downgrade(&self.inner);
        let surfaces: Rc<dyn SurfaceHost> = Rc::new(ProviderSurfaceHost::new(move || {
            owner
                .upgrade()
                .and_then(|inner| inner.owned_surface.borrow().clone())
        }));
        let children = ControllerManager::owned_by(
            self.inner.signal.clone(),
            Some(surfaces),
            context.clone(),
            ParentLink(Rc::downgrade(&self.inner)),
        );

        context.log(
            LogLevel::Info,
            LOG_TARGET,
            "controller_attached",
            [
                json_str("controller", self.id().to_string()),
                json_str("name", self.name()),
                (
                    String::from("container"),
                    json!(container.as_ref().map(|c| c.to_string())),
                ),
            ],
        );
        context.audit(
            LifecycleAuditEventBuilder::new(LifecycleAuditStage::ControllerAttached)
                .controller(self.id())
                .detail("name", json!(self.name()))
                .detail("container", json!(container.as_ref().map(|c| c.to_string())))
                .finish(),
        );
        *self.inner.attachment.borrow_mut() = Some(Attachment {
            context,
            container,
            children,
            parent,
        });
        Ok(())
    }

    /// Walk one adjacent step at a time until `target` is reached.
    ///
    /// A request arriving while this controller or any of its descendants is
    /// mid-walk is parked. A controller that is stepping picks it up once its
    /// current step has been dispatched; otherwise it resumes when the last
    /// walk below it completes. A parked `Destroyed` is never overridden.
    pub(crate) fn set_target_state(&self, target: LifecycleState) -> Result<()> {
        self.state().check_reachable(target)?;

        if self.is_busy() {
            self.park(target);
            return Ok(());
        }

        match self.walk(target) {
            Ok(()) => self.resume_parked_ancestor(),
            Err(err) => {
                self.discard_parked_ancestors();
                Err(err)
            }
        }
    }

    fn is_busy(&self) -> bool {
        self.inner.stepping.get() || self.inner.descendant_walks.get() > 0
    }

    fn park(&self, target: LifecycleState) {
        let parked = match self.inner.pending_target.get() {
            Some(LifecycleState::Destroyed) => LifecycleState::Destroyed,
            _ => target,
        };
        self.inner.pending_target.set(Some(parked));
        if let Some(context) = self.runtime() {
            context.record_metric(|metrics| metrics.record_deferred_target());
            context.audit(
                LifecycleAuditEventBuilder::new(LifecycleAuditStage::TargetDeferred)
                    .controller(self.id())
                    .detail("target", json!(parked))
                    .finish(),
            );
        }
    }

    /// Hand a target parked on an ancestor back to it once nothing below it
    /// is walking. Ancestors above a busy one are busy too.
    fn resume_parked_ancestor(&self) -> Result<()> {
        for ancestor in self.ancestors() {
            if ancestor.is_busy() {
                return Ok(());
            }
            if let Some(parked) = ancestor.inner.pending_target.take() {
                return ancestor.set_target_state(parked);
            }
        }
        Ok(())
    }

    fn discard_parked_ancestors(&self) {
        for ancestor in self.ancestors() {
            if ancestor.is_busy() {
                return;
            }
            ancestor.inner.pending_target.set(None);
        }
    }

    fn walk(&self, target: LifecycleState) -> Result<()> {
        let _guard = WalkGuard::enter(self);
        let mut target = target;
        loop {
            if let Some(parked) = self.inner.pending_target.take() {
                if target != LifecycleState::Destroyed {
                    target = parked;
                }
            }
            let current = self.state();
            match current.step_towards(target)? {
                Some(next) => self.commit_step(current, next)?,
                None => return Ok(()),
            }
        }
    }

    fn commit_step(&self, from: LifecycleState, to: LifecycleState) -> Result<()> {
        if let Some(context) = self.runtime() {
            context.log(
                LogLevel::Debug,
                LOG_TARGET,
                "lifecycle.step",
                [
                    json_str("controller", self.id().to_string()),
                    json_str("name", self.name()),
                    (String::from("from"), json!(from)),
                    (String::from("to"), json!(to)),
                ],
            );
            context.record_metric(|metrics| metrics.record_step());
            context.audit(
                LifecycleAuditEventBuilder::new(LifecycleAuditStage::StepCommitted)
                    .controller(self.id())
                    .detail("from", json!(from))
                    .detail("to", json!(to))
                    .finish(),
            );
        }
        self.inner.signal.advance_to(to)
    }

    fn on_transition(&self, transition: Transition) -> Result<()> {
        let Some(event) = transition.event() else {
            return Err(ControllerError::IllegalTransition {
                from: transition.from,
                to: transition.to,
            });
        };

        if event == LifecycleEvent::Destroy {
            self.finalize();
        }

        let context = self.runtime();
        // Recorded on entry so nested hooks land after the one that caused them.
        if let Some(context) = &context {
            context.record_metric(|metrics| metrics.record_hook());
            context.audit(
                LifecycleAuditEventBuilder::new(LifecycleAuditStage::HookDispatched)
                    .controller(self.id())
                    .event(event)
                    .finish(),
            );
        }

        let ctx = ControllerContext::new(self, event);
        dispatch(self.inner.behavior.as_ref(), &ctx)?;

        if let Some(context) = context {
            if event == LifecycleEvent::Destroy {
                context.record_metric(|metrics| metrics.record_destroyed());
                context.audit(
                    LifecycleAuditEventBuilder::new(LifecycleAuditStage::ControllerDestroyed)
                        .controller(self.id())
                        .finish(),
                );
                context.log(
                    LogLevel::Info,
                    LOG_TARGET,
                    "controller_destroyed",
                    [
                        json_str("controller", self.id().to_string()),
                        json_str("name", self.name()),
                    ],
                );
            }
        }
        Ok(())
    }

    /// Release everything the controller holds before `on_destroy` runs.
    ///
    /// Children have already been driven to `Destroyed` by this point, since
    /// backward notification reaches them before this controller's hooks.
    fn finalize(&self) {
        if let Ok(children) = self.child_manager() {
            children.release();
        }
        self.inner.retained.clear();
        let owned = self.inner.owned_surface.borrow_mut().take();
        if let Some(surface) = owned {
            surface.detach();
        }
    }
}

impl PartialEq for Controller {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Controller {}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("state", &self.state())
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Marks a controller as stepping and every ancestor as having a walk in
/// flight below it, for as long as the walk runs.
struct WalkGuard<'a> {
    inner: &'a ControllerInner,
    ancestors: Vec<Controller>,
}

impl<'a> WalkGuard<'a> {
    fn enter(controller: &'a Controller) -> Self {
        let ancestors: Vec<Controller> = controller.ancestors().collect();
        for ancestor in &ancestors {
            let walks = &ancestor.inner.descendant_walks;
            walks.set(walks.get() + 1);
        }
        controller.inner.stepping.set(true);
        Self {
            inner: &controller.inner,
            ancestors,
        }
    }
}

impl Drop for WalkGuard<'_> {
    fn drop(&mut self) {
        self.inner.stepping.set(false);
        self.inner.pending_target.set(None);
        for ancestor in &self.ancestors {
            let walks = &ancestor.inner.descendant_walks;
            walks.set(walks.get().saturating_sub(1));
        }
    }
}
