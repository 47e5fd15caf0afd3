//! Patch application for both container kinds.

mod container;
mod flat;
mod log;

pub use container::patch_container;
pub use flat::patch_flat;
pub use log::*;
