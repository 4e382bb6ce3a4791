//! Display width helpers used when measuring text surfaces.

mod utils;

pub use utils::{display_width, text_extent};
