//! Controller module orchestrator.
//!
//! `core` holds the controller handle and its stepping walk, `manager` the
//! registry that binds children to a host lifecycle, `behavior` the hook
//! trait, and `retained` the per-controller object store.

mod behavior;
mod core;
mod manager;
mod retained;

pub use self::behavior::{ControllerBehavior, ControllerContext, FnBehavior};
pub use self::core::{Controller, ControllerId};
pub use self::manager::{Container, ControllerManager};
pub use self::retained::{Retained, RetainedError, RetainedStore};

#[cfg(test)]
mod tests;
