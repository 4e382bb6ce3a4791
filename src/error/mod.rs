//! Error module orchestrator.
//!
//! Every failure in this crate is a caller contract violation surfaced at the
//! call site; there is no transient category and nothing is retried.

mod types;

pub use types::{ControllerError, Result};
