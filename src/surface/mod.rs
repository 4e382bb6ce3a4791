//! Surface module orchestrator.
//!
//! Concrete drawing and measurement live outside this crate; surfaces here
//! carry only what controllers need: identity, ids, containment, and a
//! preferred size for flow layout.

mod core;
mod host;

pub use self::core::{Surface, SurfaceError, SurfaceId};
pub use self::host::{ProviderSurfaceHost, RootSurfaceHost, SurfaceHost, is_descendant};
