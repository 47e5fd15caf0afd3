//! Prelude module for convenient imports
//!
//! ```ignore
//! use shinyrom::prelude::*;
//! ```

// Pipeline
pub use crate::batch::BatchReport;
pub use crate::patcher::{PatchOutcome, Patcher, PatcherConfig};

// Error handling
pub use crate::error::{Error, Result};

// ROM types
pub use crate::rom::{ContainerKind, GameIdentity, RomContainer};

// Thresholds
pub use crate::threshold::{PatchByte, calculate_threshold, parse_odds};
