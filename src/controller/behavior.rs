use crate::error::Result;
use crate::lifecycle::{LifecycleEvent, LifecycleState};
use crate::runtime::RuntimeContext;
use crate::surface::Surface;

use super::core::{Controller, ControllerId};
use super::manager::Container;
use super::retained::RetainedStore;

/// Lifecycle callbacks of a controller.
///
/// Every hook has a no-op default; there is no base behaviour to call
/// through to. The controller's own bookkeeping (clearing retained objects,
/// detaching its owned surface, releasing children) has already run when
/// `on_destroy` is invoked.
///
/// Hooks take `&self` because they run re-entrantly: a hook may add or
/// remove controllers, which fires other hooks before it returns. Keep
/// mutable state behind `Cell`/`RefCell`.
pub trait ControllerBehavior: 'static {
    fn name(&self) -> &str {
        "controller"
    }

    fn on_create(&self, _ctx: &ControllerContext<'_>) -> Result<()> {
        Ok(())
    }

    fn on_start(&self, _ctx: &ControllerContext<'_>) -> Result<()> {
        Ok(())
    }

    fn on_resume(&self, _ctx: &ControllerContext<'_>) -> Result<()> {
        Ok(())
    }

    fn on_pause(&self, _ctx: &ControllerContext<'_>) -> Result<()> {
        Ok(())
    }

    fn on_stop(&self, _ctx: &ControllerContext<'_>) -> Result<()> {
        Ok(())
    }

    fn on_destroy(&self, _ctx: &ControllerContext<'_>) -> Result<()> {
        Ok(())
    }
}

pub(crate) fn dispatch(behavior: &dyn ControllerBehavior, ctx: &ControllerContext<'_>) -> Result<()> {
    match ctx.event() {
        LifecycleEvent::Create => behavior.on_create(ctx),
        LifecycleEvent::Start => behavior.on_start(ctx),
        LifecycleEvent::Resume => behavior.on_resume(ctx),
        LifecycleEvent::Pause => behavior.on_pause(ctx),
        LifecycleEvent::Stop => behavior.on_stop(ctx),
        LifecycleEvent::Destroy => behavior.on_destroy(ctx),
    }
}

/// View of the controller handed to its own hooks.
pub struct ControllerContext<'a> {
    controller: &'a Controller,
    event: LifecycleEvent,
}

impl<'a> ControllerContext<'a> {
    pub(crate) fn new(controller: &'a Controller, event: LifecycleEvent) -> Self {
        Self { controller, event }
    }

    pub fn controller(&self) -> &'a Controller {
        self.controller
    }

    pub fn event(&self) -> LifecycleEvent {
        self.event
    }

    pub fn id(&self) -> ControllerId {
        self.controller.id()
    }

    pub fn state(&self) -> LifecycleState {
        self.controller.state()
    }

    pub fn runtime(&self) -> Option<RuntimeContext> {
        self.controller.runtime()
    }

    pub fn retained(&self) -> &'a RetainedStore {
        self.controller.retained()
    }

    pub fn add_child(&self, child: &Controller) -> Result<()> {
        self.controller.add_child(child)
    }

    pub fn add_child_to(&self, container: impl Into<Container>, child: &Controller) -> Result<()> {
        self.controller.add_child_to(container, child)
    }

    pub fn remove_child(&self, child: &Controller) -> Result<()> {
        self.controller.remove_child(child)
    }

    pub fn set_owned_surface<F>(&self, factory: F) -> Result<Surface>
    where
        F: FnOnce(&Surface) -> Surface,
    {
        self.controller.set_owned_surface(factory)
    }

    pub fn owned_surface(&self) -> Option<Surface> {
        self.controller.owned_surface()
    }
}

type HookFn = Box<dyn Fn(&ControllerContext<'_>) -> Result<()>>;

/// Behaviour assembled from closures, one optional slot per hook.
///
/// ```
/// use room_controllers::{Controller, FnBehavior};
///
/// let banner = Controller::new(
///     FnBehavior::named("banner").on_create(|ctx| {
///         ctx.retained().len();
///         Ok(())
///     }),
/// );
/// assert_eq!(banner.name(), "banner");
/// ```
pub struct FnBehavior {
    name: String,
    hooks: [Option<HookFn>; 6],
}

impl FnBehavior {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hooks: Default::default(),
        }
    }

    pub fn on(
        mut self,
        event: LifecycleEvent,
        hook: impl Fn(&ControllerContext<'_>) -> Result<()> + 'static,
    ) -> Self {
        self.hooks[event.index()] = Some(Box::new(hook));
        self
    }

    pub fn on_create(self, hook: impl Fn(&ControllerContext<'_>) -> Result<()> + 'static) -> Self {
        self.on(LifecycleEvent::Create, hook)
    }

    pub fn on_start(self, hook: impl Fn(&ControllerContext<'_>) -> Result<()> + 'static) -> Self {
        self.on(LifecycleEvent::Start, hook)
    }

    pub fn on_resume(self, hook: impl Fn(&ControllerContext<'_>) -> Result<()> + 'static) -> Self {
        self.on(LifecycleEvent::Resume, hook)
    }

    pub fn on_pause(self, hook: impl Fn(&ControllerContext<'_>) -> Result<()> + 'static) -> Self {
        self.on(LifecycleEvent::Pause, hook)
    }

    pub fn on_stop(self, hook: impl Fn(&ControllerContext<'_>) -> Result<()> + 'static) -> Self {
        self.on(LifecycleEvent::Stop, hook)
    }

    pub fn on_destroy(self, hook: impl Fn(&ControllerContext<'_>) -> Result<()> + 'static) -> Self {
        self.on(LifecycleEvent::Destroy, hook)
    }

    fn run(&self, ctx: &ControllerContext<'_>) -> Result<()> {
        match &self.hooks[ctx.event().index()] {
            Some(hook) => hook(ctx),
            None => Ok(()),
        }
    }
}

impl ControllerBehavior for FnBehavior {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_create(&self, ctx: &ControllerContext<'_>) -> Result<()> {
        self.run(ctx)
    }

    fn on_start(&self, ctx: &ControllerContext<'_>) -> Result<()> {
        self.run(ctx)
    }

    fn on_resume(&self, ctx: &ControllerContext<'_>) -> Result<()> {
        self.run(ctx)
    }

    fn on_pause(&self, ctx: &ControllerContext<'_>) -> Result<()> {
        self.run(ctx)
    }

    fn on_stop(&self, ctx: &ControllerContext<'_>) -> Result<()> {
        self.run(ctx)
    }

    fn on_destroy(&self, ctx: &ControllerContext<'_>) -> Result<()> {
        self.run(ctx)
    }
}
