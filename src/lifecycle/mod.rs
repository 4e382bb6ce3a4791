//! Lifecycle module orchestrator.
//!
//! `state` holds the ordered state set and its step table; `signal` holds the
//! observable state source that hosts drive and controllers step.

mod signal;
mod state;

pub use signal::{LifecycleSignal, ObserverFn, ObserverToken};
pub use state::{LifecycleEvent, LifecycleState, Transition};
