use thiserror::Error;

use crate::controller::{ControllerId, RetainedError};
use crate::lifecycle::{LifecycleEvent, LifecycleState};
use crate::surface::{SurfaceError, SurfaceId};

/// Unified result type for the controller runtime.
pub type Result<T> = std::result::Result<T, ControllerError>;

/// Errors surfaced by controllers, managers and lifecycle signals.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("illegal lifecycle transition {from:?} -> {to:?}")]
    IllegalTransition {
        from: LifecycleState,
        to: LifecycleState,
    },
    #[error("`{operation}` is not allowed while the host is {state:?}")]
    InvalidLifecycleState {
        state: LifecycleState,
        operation: &'static str,
    },
    #[error("controller {0} is already registered")]
    AlreadyRegistered(ControllerId),
    #[error("controller {0} is not registered")]
    NotRegistered(ControllerId),
    #[error("container `{0}` not found")]
    ContainerNotFound(SurfaceId),
    #[error("container {0} is not part of the host surface tree")]
    ContainerNotOwned(String),
    #[error("controller {0} was attached without a container")]
    NotAttachedToContainer(ControllerId),
    #[error("controller {0} has already been attached")]
    AlreadyAttached(ControllerId),
    #[error("surface error: {0}")]
    Surface(#[from] SurfaceError),
    #[error("retained store error: {0}")]
    Retained(#[from] RetainedError),
    #[error("controller {controller} failed in {event:?}: {message}")]
    Hook {
        controller: ControllerId,
        event: LifecycleEvent,
        message: String,
    },
}

impl ControllerError {
    /// Wrap a failure raised by user code inside a lifecycle hook.
    pub fn hook(
        controller: ControllerId,
        event: LifecycleEvent,
        message: impl Into<String>,
    ) -> Self {
        Self::Hook {
            controller,
            event,
            message: message.into(),
        }
    }
}
