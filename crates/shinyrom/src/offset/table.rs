//! Static offset table
//!
//! Maps game codes to the byte offset of the shiny check immediate. For
//! flat binaries the offset is a file offset; for structured containers it
//! is an offset into the decompressed ARM9 binary.
//!
//! Built once at startup, either from the builtin constants or from a JSON
//! file, and never mutated afterwards.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::Signature;
use crate::error::Result;
use crate::rom::ContainerKind;

/// Version tag of the builtin table
pub const BUILTIN_TABLE_VERSION: &str = "builtin-1";

/// ARM9 offset used for structured containers whose code is not in the table
pub const DEFAULT_CONTAINER_OFFSET: usize = 0x70080;

/// `eors r0, r1; lsls r0, #16; lsrs r0, #16; cmp r0, #imm`
pub const FLAT_SHINY_PATTERN: [Option<u8>; 8] = [
    Some(0x48),
    Some(0x40),
    Some(0x00),
    Some(0x04),
    Some(0x00),
    Some(0x0C),
    None,
    Some(0x28),
];

/// Index of the compare immediate within [`FLAT_SHINY_PATTERN`]
pub const FLAT_SHINY_TARGET: usize = 6;

const BUILTIN_GAMES: &[(&str, ContainerKind, usize, &str)] = &[
    ("BPRE", ContainerKind::FlatBinary, 0x39D5E, "FireRed (v1.0)"),
    ("BPEE", ContainerKind::FlatBinary, 0x6CC94, "Emerald"),
    ("IPKE", ContainerKind::StructuredContainer, 0x70080, "HeartGold (US)"),
    ("IPGE", ContainerKind::StructuredContainer, 0x70080, "SoulSilver (US)"),
];

/// Checks that only affect display (summary screen star, Pokédex sprite palette)
const BUILTIN_COSMETIC: &[(&str, &[usize])] = &[("BPEE", &[0x0D3B6A, 0x0F4C2E])];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEntry {
    pub name: String,
    pub kind: ContainerKind,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetTable {
    pub version: String,
    pub games: BTreeMap<String, GameEntry>,
    /// Secondary offsets, keyed by game code; sparse
    #[serde(default)]
    pub cosmetic: BTreeMap<String, Vec<usize>>,
    #[serde(default = "default_container_offset")]
    pub default_container_offset: usize,
    #[serde(default = "builtin_signature")]
    pub signature: Signature,
}

impl OffsetTable {
    pub fn entry(&self, code: &str) -> Option<&GameEntry> {
        self.games.get(code)
    }

    pub fn primary(&self, code: &str) -> Option<usize> {
        self.entry(code).map(|entry| entry.offset)
    }

    /// Primary offset of `code`, only when it is listed for `kind`.
    pub fn offset_for(&self, code: &str, kind: ContainerKind) -> Option<usize> {
        self.entry(code)
            .filter(|entry| entry.kind == kind)
            .map(|entry| entry.offset)
    }

    /// Whether `code` is listed for the given container kind.
    pub fn contains(&self, code: &str, kind: ContainerKind) -> bool {
        self.entry(code).is_some_and(|entry| entry.kind == kind)
    }

    pub fn cosmetic(&self, code: &str) -> &[usize] {
        self.cosmetic.get(code).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

impl Default for OffsetTable {
    fn default() -> Self {
        builtin_offset_table()
    }
}

fn default_container_offset() -> usize {
    DEFAULT_CONTAINER_OFFSET
}

pub fn builtin_signature() -> Signature {
    Signature::from_const(&FLAT_SHINY_PATTERN, FLAT_SHINY_TARGET)
}

pub fn builtin_offset_table() -> OffsetTable {
    let games = BUILTIN_GAMES
        .iter()
        .map(|&(code, kind, offset, name)| {
            (
                code.to_string(),
                GameEntry {
                    name: name.to_string(),
                    kind,
                    offset,
                },
            )
        })
        .collect();

    let cosmetic = BUILTIN_COSMETIC
        .iter()
        .map(|&(code, offsets)| (code.to_string(), offsets.to_vec()))
        .collect();

    OffsetTable {
        version: BUILTIN_TABLE_VERSION.to_string(),
        games,
        cosmetic,
        default_container_offset: DEFAULT_CONTAINER_OFFSET,
        signature: builtin_signature(),
    }
}

pub fn load_offset_table<P: AsRef<Path>>(path: P) -> Result<OffsetTable> {
    let content = fs::read_to_string(&path)?;
    let table = serde_json::from_str(&content)?;
    Ok(table)
}

pub fn save_offset_table<P: AsRef<Path>>(path: P, table: &OffsetTable) -> Result<()> {
    let content = serde_json::to_string_pretty(table)?;
    fs::write(path, content)?;
    Ok(())
}
