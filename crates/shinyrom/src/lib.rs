//! # shinyrom
//!
//! Shiny-odds patcher for Pokémon cartridge images.
//!
//! This crate provides:
//! - ROM classification for flat GBA binaries and NDS containers
//! - Odds to threshold-byte conversion
//! - Offset resolution via signature scanning, an offset table, or a default
//! - NDS container handling (ARM9 extraction, BLZ decompression, rebuild)
//! - Single-file and batch patching with a human-readable log

pub mod batch;
pub mod error;
pub mod offset;
pub mod patch;
pub mod patcher;
pub mod prelude;
pub mod rom;
pub mod threshold;

pub use batch::BatchReport;
pub use error::{Error, Result};
pub use offset::{
    GameEntry, OffsetResolver, OffsetSet, OffsetSource, OffsetTable, Signature,
    builtin_offset_table, builtin_signature, format_pattern, load_offset_table, parse_pattern,
    save_offset_table,
};
pub use patch::PatchLog;
pub use patcher::{PatchOutcome, Patcher, PatcherConfig, PatcherConfigBuilder};
pub use rom::{ContainerKind, GameIdentity, NdsRom, RomContainer, classify};
pub use threshold::{DEFAULT_PATCH_BYTE, ODDS_NUMERATOR, PatchByte, calculate_threshold, parse_odds};
