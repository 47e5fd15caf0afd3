//! Format classification from fixed header fields.

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};
use tracing::debug;

use super::layout::{gba, nds};
use crate::offset::OffsetTable;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, IntoStaticStr,
)]
pub enum ContainerKind {
    /// GBA image: the patch target is a direct file offset.
    #[strum(serialize = "GBA")]
    FlatBinary,
    /// NDS image: the patch target lives in the (possibly compressed) ARM9 binary.
    #[strum(serialize = "NDS")]
    StructuredContainer,
}

impl ContainerKind {
    pub fn short_name(&self) -> &'static str {
        self.into()
    }

    /// Leading letter of game codes in this family
    pub fn family_marker(&self) -> u8 {
        match self {
            Self::FlatBinary => gba::FAMILY_MARKER,
            Self::StructuredContainer => nds::FAMILY_MARKER,
        }
    }
}

/// Result of classifying a ROM buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameIdentity {
    pub kind: ContainerKind,
    pub game_code: String,
    pub title: String,
}

impl std::fmt::Display for GameIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} ({})", self.kind, self.title, self.game_code)
    }
}

/// Classify a ROM buffer by its header fields.
///
/// The NDS header location is checked first, then the GBA one. A code is
/// accepted when the offset table knows it for that container kind, or
/// (best effort) when it merely starts with the family marker letter. The
/// latter admits unlisted regional variants; the resolver still fails
/// safely on them if no offset can be found.
pub fn classify(rom: &[u8], table: &OffsetTable) -> Option<GameIdentity> {
    let candidates = [
        (
            ContainerKind::StructuredContainer,
            nds::TITLE,
            nds::TITLE_LEN,
            nds::GAME_CODE,
            nds::GAME_CODE_LEN,
        ),
        (
            ContainerKind::FlatBinary,
            gba::TITLE,
            gba::TITLE_LEN,
            gba::GAME_CODE,
            gba::GAME_CODE_LEN,
        ),
    ];

    for (kind, title_at, title_len, code_at, code_len) in candidates {
        let Some(code) = read_game_code(rom, code_at, code_len) else {
            continue;
        };

        let known = table.contains(&code, kind);
        let family = code.as_bytes().first() == Some(&kind.family_marker());
        if !known && !family {
            continue;
        }

        if !known {
            debug!(
                "Game code {} not in offset table, accepted by {} family marker",
                code, kind
            );
        }

        return Some(GameIdentity {
            kind,
            title: read_ascii(rom, title_at, title_len).unwrap_or_default(),
            game_code: code,
        });
    }

    None
}

/// Read an ASCII field, dropping non-ASCII bytes and trimming trailing
/// non-printable bytes (padding NULs, spaces, 0xFF fill).
fn read_ascii(rom: &[u8], offset: usize, len: usize) -> Option<String> {
    let field = rom.get(offset..offset + len)?;
    let text: String = field
        .iter()
        .filter(|b| b.is_ascii())
        .map(|&b| b as char)
        .collect();
    Some(text.trim_end_matches(|c: char| !c.is_ascii_graphic()).to_string())
}

/// Game codes are exactly four printable ASCII characters.
fn read_game_code(rom: &[u8], offset: usize, len: usize) -> Option<String> {
    let code = read_ascii(rom, offset, len)?;
    (code.len() == len && code.bytes().all(|b| b.is_ascii_graphic())).then_some(code)
}
