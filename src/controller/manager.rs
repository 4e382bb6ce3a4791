use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::json;

use crate::error::{ControllerError, Result};
use crate::lifecycle::{LifecycleSignal, LifecycleState, ObserverToken};
use crate::logging::{LogLevel, json_kv, json_str};
use crate::runtime::RuntimeContext;
use crate::runtime::audit::{LifecycleAuditEventBuilder, LifecycleAuditStage};
use crate::surface::{Surface, SurfaceHost, SurfaceId};

use super::core::{Controller, ControllerId, ParentLink};

const LOG_TARGET: &str = "room::manager";

/// Where a child controller's surface will live.
#[derive(Debug, Clone, Default)]
pub enum Container {
    /// Logic-only child with no surface.
    #[default]
    Detached,
    /// Surface looked up by id in the manager's surface host.
    Id(SurfaceId),
    /// Surface supplied directly; must belong to the manager's surface host.
    Surface(Surface),
}

impl From<Surface> for Container {
    fn from(surface: Surface) -> Self {
        Container::Surface(surface)
    }
}

impl From<&Surface> for Container {
    fn from(surface: &Surface) -> Self {
        Container::Surface(surface.clone())
    }
}

impl From<&str> for Container {
    fn from(id: &str) -> Self {
        Container::Id(id.to_string())
    }
}

impl From<String> for Container {
    fn from(id: String) -> Self {
        Container::Id(id)
    }
}

struct Registration {
    controller: Controller,
    token: ObserverToken,
}

struct ManagerInner {
    host: LifecycleSignal,
    surfaces: Option<Rc<dyn SurfaceHost>>,
    context: RuntimeContext,
    owner: ParentLink,
    registrations: RefCell<HashMap<ControllerId, Registration>>,
}

/// Registry binding child controllers to a host lifecycle.
///
/// Each registered child is subscribed to the host signal and follows it
/// one step at a time. Children are caught up to the host's state when they
/// are added and driven to `Destroyed` when they are removed.
#[derive(Clone)]
pub struct ControllerManager {
    inner: Rc<ManagerInner>,
}

impl ControllerManager {
    pub fn new(
        host: LifecycleSignal,
        surfaces: Option<Rc<dyn SurfaceHost>>,
        context: RuntimeContext,
    ) -> Self {
        Self::owned_by(host, surfaces, context, ParentLink::default())
    }

    /// Manager for the children of the controller behind `owner`.
    pub(super) fn owned_by(
        host: LifecycleSignal,
        surfaces: Option<Rc<dyn SurfaceHost>>,
        context: RuntimeContext,
        owner: ParentLink,
    ) -> Self {
        Self {
            inner: Rc::new(ManagerInner {
                host,
                surfaces,
                context,
                owner,
                registrations: RefCell::new(HashMap::new()),
            }),
        }
    }

    pub fn host_state(&self) -> LifecycleState {
        self.inner.host.current_state()
    }

    pub fn context(&self) -> &RuntimeContext {
        &self.inner.context
    }

    /// Register `child` and bring it up to the host's current state.
    ///
    /// Hooks fired by the catch-up run before this returns, and any of them
    /// may add or remove controllers on this or other managers.
    pub fn add(&self, container: impl Into<Container>, child: &Controller) -> Result<()> {
        let state = self.host_state();
        if !state.is_alive() {
            return Err(ControllerError::InvalidLifecycleState {
                state,
                operation: "add",
            });
        }
        if self.contains(child) {
            return Err(ControllerError::AlreadyRegistered(child.id()));
        }
        let container = self.resolve(container.into())?;
        let container_label = container.as_ref().map(|surface| surface.to_string());
        child.attach(
            self.inner.context.clone(),
            container,
            self.inner.owner.clone(),
        )?;

        let follower = child.clone();
        let token = self
            .inner
            .host
            .add_observer(move |transition| follower.set_target_state(transition.to));
        self.inner.registrations.borrow_mut().insert(
            child.id(),
            Registration {
                controller: child.clone(),
                token,
            },
        );

        let context = &self.inner.context;
        context.log(
            LogLevel::Info,
            LOG_TARGET,
            "child_added",
            [
                json_str("lifecycle", self.inner.host.label()),
                json_str("child", child.id().to_string()),
                json_str("name", child.name()),
                (String::from("container"), json!(container_label)),
                (String::from("state"), json!(state)),
            ],
        );
        context.record_metric(|metrics| metrics.record_child_added());

        child.set_target_state(self.host_state())?;

        context.audit(
            LifecycleAuditEventBuilder::new(LifecycleAuditStage::ChildAdded)
                .controller(child.id())
                .detail("host", json!(self.inner.host.label()))
                .detail("state", json!(child.state()))
                .finish(),
        );
        Ok(())
    }

    /// Unregister `child` and drive it to `Destroyed`.
    pub fn remove(&self, child: &Controller) -> Result<()> {
        let registration = self
            .inner
            .registrations
            .borrow_mut()
            .remove(&child.id())
            .ok_or(ControllerError::NotRegistered(child.id()))?;
        self.inner.host.remove_observer(registration.token);

        let context = &self.inner.context;
        context.log(
            LogLevel::Info,
            LOG_TARGET,
            "child_removed",
            [
                json_str("lifecycle", self.inner.host.label()),
                json_str("child", child.id().to_string()),
                json_str("name", child.name()),
                (String::from("state"), json!(child.state())),
            ],
        );
        context.record_metric(|metrics| metrics.record_child_removed());

        registration
            .controller
            .set_target_state(LifecycleState::Destroyed)?;

        context.audit(
            LifecycleAuditEventBuilder::new(LifecycleAuditStage::ChildRemoved)
                .controller(child.id())
                .detail("host", json!(self.inner.host.label()))
                .finish(),
        );
        Ok(())
    }

    pub fn contains(&self, child: &Controller) -> bool {
        self.inner
            .registrations
            .borrow()
            .get(&child.id())
            .is_some_and(|registration| registration.controller.ptr_eq(child))
    }

    pub fn len(&self) -> usize {
        self.inner.registrations.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.registrations.borrow().is_empty()
    }

    /// Registered children in registration order.
    pub fn controllers(&self) -> Vec<Controller> {
        let registrations = self.inner.registrations.borrow();
        let mut ordered: Vec<&Registration> = registrations.values().collect();
        ordered.sort_by_key(|registration| registration.token);
        ordered
            .into_iter()
            .map(|registration| registration.controller.clone())
            .collect()
    }

    /// Drop every registration without driving the children.
    ///
    /// Called once the host has reached `Destroyed`, when every child has
    /// already followed it there.
    pub(crate) fn release(&self) {
        let released: Vec<Registration> = self
            .inner
            .registrations
            .borrow_mut()
            .drain()
            .map(|(_, registration)| registration)
            .collect();
        for registration in &released {
            self.inner.host.remove_observer(registration.token);
        }
        if !released.is_empty() {
            self.inner.context.log(
                LogLevel::Debug,
                LOG_TARGET,
                "registrations_released",
                [
                    json_str("lifecycle", self.inner.host.label()),
                    json_kv("count", released.len()),
                ],
            );
        }
    }

    fn resolve(&self, container: Container) -> Result<Option<Surface>> {
        match container {
            Container::Detached => Ok(None),
            Container::Id(id) => self
                .inner
                .surfaces
                .as_ref()
                .and_then(|surfaces| surfaces.find_by_id(&id))
                .map(Some)
                .ok_or(ControllerError::ContainerNotFound(id)),
            Container::Surface(surface) => match self.inner.surfaces.as_ref() {
                Some(surfaces) if surfaces.contains(&surface) => Ok(Some(surface)),
                _ => Err(ControllerError::ContainerNotOwned(surface.to_string())),
            },
        }
    }
}

impl fmt::Debug for ControllerManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerManager")
            .field("host", &self.inner.host)
            .field("children", &self.len())
            .field("surface_host", &self.inner.surfaces.is_some())
            .finish()
    }
}
