//! Layout module orchestrator.
//!
//! Layouts read preferred sizes from a surface's children and write back
//! frames; they never add or remove surfaces.

mod flow;

pub use flow::{FlowLayout, FlowLine};
