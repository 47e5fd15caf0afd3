//! Conversion from "1 in N" encounter odds to the patch byte.
//!
//! The supported games compare a 16-bit value derived from the trainer and
//! personality IDs against a small immediate. Raising that immediate raises
//! the shiny rate: a byte of `v` gives odds of `65536 / v`.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Size of the value space the shiny check samples from.
pub const ODDS_NUMERATOR: u32 = 65536;

/// Patch byte used when the odds input cannot be parsed (the stock 1 in 8192).
pub const DEFAULT_PATCH_BYTE: u8 = 8;

/// A patch byte in `[1, 255]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PatchByte(u8);

impl PatchByte {
    pub const MAX: PatchByte = PatchByte(u8::MAX);
    pub const DEFAULT: PatchByte = PatchByte(DEFAULT_PATCH_BYTE);

    /// Returns `None` for zero, which would disable the check entirely.
    pub fn new(value: u8) -> Option<Self> {
        (value != 0).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Odds the patched check actually yields ("1 in N", rounded down).
    pub fn effective_odds(self) -> u32 {
        ODDS_NUMERATOR / u32::from(self.0)
    }
}

impl Default for PatchByte {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u8> for PatchByte {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| "patch byte must be between 1 and 255".to_string())
    }
}

impl From<PatchByte> for u8 {
    fn from(byte: PatchByte) -> Self {
        byte.0
    }
}

impl fmt::Display for PatchByte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// Convert "1 in `odds`" into the byte written into the ROM.
///
/// `odds <= 1` is an explicit short-circuit to the maximum byte; every other
/// value is `65536 / odds` clamped to `[1, 255]`.
pub fn calculate_threshold(odds: u32) -> PatchByte {
    if odds <= 1 {
        return PatchByte::MAX;
    }

    let value = (ODDS_NUMERATOR / odds).clamp(1, u32::from(u8::MAX));
    PatchByte(value as u8)
}

/// Parse user-supplied odds text.
///
/// Malformed input never fails: it falls back to [`DEFAULT_PATCH_BYTE`].
pub fn parse_odds(input: &str) -> PatchByte {
    match input.trim().parse::<i64>() {
        Ok(odds) if odds <= 1 => PatchByte::MAX,
        Ok(odds) => calculate_threshold(u32::try_from(odds).unwrap_or(u32::MAX)),
        Err(e) => {
            warn!(
                "Invalid odds value {:?} ({}), using default patch byte {}",
                input, e, PatchByte::DEFAULT
            );
            PatchByte::DEFAULT
        }
    }
}
