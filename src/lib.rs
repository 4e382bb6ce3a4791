//! Lifecycle-aware controllers for composing UI logic into trees.
//!
//! A host drives a [`LifecycleSignal`]; a [`ControllerManager`] bound to it
//! steps every registered [`Controller`] through the same states, one
//! adjacent step at a time, and each controller manages its own children the
//! same way. Hooks may add or remove controllers while the tree is being
//! dispatched; every hook still fires exactly once per step.

pub mod controller;
pub mod error;
pub mod geometry;
pub mod host;
pub mod layout;
pub mod lifecycle;
pub mod logging;
pub mod metrics;
pub mod runtime;
pub mod surface;
pub mod width;

pub use controller::{
    Container, Controller, ControllerBehavior, ControllerContext, ControllerId, ControllerManager,
    FnBehavior, Retained, RetainedError, RetainedStore,
};
pub use error::{ControllerError, Result};
pub use geometry::{Rect, Size};
pub use host::{ControllerHost, ViewScopedHost};
pub use layout::{FlowLayout, FlowLine};
pub use lifecycle::{LifecycleEvent, LifecycleSignal, LifecycleState, ObserverToken, Transition};
pub use logging::{
    FileSink, LogEvent, LogFields, LogLevel, LogSink, Logger, LoggingError, LoggingResult,
    MemorySink,
};
pub use metrics::{LifecycleMetrics, MetricSnapshot};
pub use runtime::audit::{
    LifecycleAudit, LifecycleAuditEvent, LifecycleAuditEventBuilder, LifecycleAuditStage,
    NullLifecycleAudit, RecordingAudit,
};
pub use runtime::{RuntimeConfig, RuntimeContext};
pub use surface::{ProviderSurfaceHost, RootSurfaceHost, Surface, SurfaceError, SurfaceHost, SurfaceId};
pub use width::{display_width, text_extent};
