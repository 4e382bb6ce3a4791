//! Hosts that own a lifecycle and the manager bound to it.
//!
//! [`ControllerHost`] is the top of a controller tree: whoever embeds it
//! drives its signal. [`ViewScopedHost`] follows a longer-lived parent
//! lifecycle but only for as long as a view exists, so controllers added
//! while a view is up are destroyed with that view even though the parent
//! lives on.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::json;

use crate::controller::{Container, Controller, ControllerManager};
use crate::error::{ControllerError, Result};
use crate::lifecycle::{LifecycleSignal, LifecycleState, ObserverToken};
use crate::logging::{LogLevel, json_str};
use crate::runtime::{RuntimeConfig, RuntimeContext};
use crate::surface::{RootSurfaceHost, Surface, SurfaceHost};

const LOG_TARGET: &str = "room::host";

/// Root of a controller tree with a caller-driven lifecycle.
#[derive(Clone)]
pub struct ControllerHost {
    signal: LifecycleSignal,
    manager: ControllerManager,
    root: Option<Surface>,
    context: RuntimeContext,
}

impl ControllerHost {
    /// Host with no surface tree; children must be added without a container.
    pub fn new(config: RuntimeConfig) -> Self {
        Self::from_context(RuntimeContext::new(config), None)
    }

    /// Host whose children resolve containers inside `root`.
    pub fn with_root(config: RuntimeConfig, root: Surface) -> Self {
        Self::from_context(RuntimeContext::new(config), Some(root))
    }

    pub fn from_context(context: RuntimeContext, root: Option<Surface>) -> Self {
        let signal = LifecycleSignal::new(context.host_label().to_string());
        let surfaces = root
            .clone()
            .map(|root| Rc::new(RootSurfaceHost::new(root)) as Rc<dyn SurfaceHost>);
        let manager = ControllerManager::new(signal.clone(), surfaces, context.clone());
        Self {
            signal,
            manager,
            root,
            context,
        }
    }

    pub fn signal(&self) -> &LifecycleSignal {
        &self.signal
    }

    pub fn state(&self) -> LifecycleState {
        self.signal.current_state()
    }

    pub fn manager(&self) -> &ControllerManager {
        &self.manager
    }

    pub fn root(&self) -> Option<&Surface> {
        self.root.as_ref()
    }

    pub fn context(&self) -> &RuntimeContext {
        &self.context
    }

    /// Drive the host to `state`; every registered child follows step by step.
    pub fn advance_to(&self, state: LifecycleState) -> Result<()> {
        let from = self.state();
        self.context.log(
            LogLevel::Info,
            LOG_TARGET,
            "host.advance",
            [
                (String::from("from"), json!(from)),
                (String::from("to"), json!(state)),
            ],
        );
        self.signal.advance_to(state)?;
        if self.state() == LifecycleState::Destroyed {
            self.manager.release();
        }
        Ok(())
    }

    pub fn add(&self, child: &Controller) -> Result<()> {
        self.manager.add(Container::Detached, child)
    }

    pub fn add_to(&self, container: impl Into<Container>, child: &Controller) -> Result<()> {
        self.manager.add(container, child)
    }

    pub fn remove(&self, child: &Controller) -> Result<()> {
        self.manager.remove(child)
    }
}

impl fmt::Debug for ControllerHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerHost")
            .field("signal", &self.signal)
            .field("children", &self.manager.len())
            .field("root", &self.root)
            .finish()
    }
}

struct ScopedView {
    host: ControllerHost,
    token: ObserverToken,
}

/// Manager source for a container whose view lifetime is shorter than its
/// logical lifetime, such as a page kept alive in a pager while its view is
/// recycled.
///
/// Each view gets a fresh [`ControllerHost`] that mirrors the parent
/// lifecycle until the view is destroyed or the parent reaches `Destroyed`.
pub struct ViewScopedHost {
    parent: LifecycleSignal,
    context: RuntimeContext,
    view: RefCell<Option<ScopedView>>,
}

impl ViewScopedHost {
    pub fn new(parent: LifecycleSignal, context: RuntimeContext) -> Self {
        Self {
            parent,
            context,
            view: RefCell::new(None),
        }
    }

    /// Bind a new view lifetime rooted at `root`.
    ///
    /// A view still bound from earlier is destroyed first. The returned
    /// manager starts at the parent's current state.
    pub fn view_created(&self, root: Surface) -> Result<ControllerManager> {
        let state = self.parent.current_state();
        if !state.is_alive() {
            return Err(ControllerError::InvalidLifecycleState {
                state,
                operation: "view_created",
            });
        }
        self.view_destroyed()?;

        let host = ControllerHost::from_context(self.context.clone(), Some(root));
        host.advance_to(state)?;
        let mirror = host.clone();
        let token = self
            .parent
            .add_observer(move |transition| mirror.advance_to(transition.to));
        let manager = host.manager().clone();

        self.context.log(
            LogLevel::Debug,
            LOG_TARGET,
            "view_created",
            [
                json_str("parent", self.parent.label()),
                (String::from("state"), json!(state)),
            ],
        );
        *self.view.borrow_mut() = Some(ScopedView { host, token });
        Ok(manager)
    }

    /// Destroy every controller added during the current view lifetime.
    ///
    /// Does nothing when no view is bound.
    pub fn view_destroyed(&self) -> Result<()> {
        let Some(view) = self.view.borrow_mut().take() else {
            return Ok(());
        };
        self.parent.remove_observer(view.token);
        self.context.log(
            LogLevel::Debug,
            LOG_TARGET,
            "view_destroyed",
            [
                json_str("parent", self.parent.label()),
                (
                    String::from("children"),
                    json!(view.host.manager().len()),
                ),
            ],
        );
        if view.host.state() == LifecycleState::Uninitialized {
            return Ok(());
        }
        view.host.advance_to(LifecycleState::Destroyed)
    }

    pub fn has_view(&self) -> bool {
        self.view.borrow().is_some()
    }

    /// Manager of the current view. Fails when no view is bound.
    pub fn manager(&self) -> Result<ControllerManager> {
        self.view
            .borrow()
            .as_ref()
            .map(|view| view.host.manager().clone())
            .ok_or(ControllerError::InvalidLifecycleState {
                state: self.parent.current_state(),
                operation: "manager",
            })
    }
}

impl fmt::Debug for ViewScopedHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewScopedHost")
            .field("parent", &self.parent)
            .field("has_view", &self.has_view())
            .finish()
    }
}
