//! Offset resolution: live signature scan first, static table second.

use serde::Serialize;
use strum::Display;
use tracing::{debug, warn};

use super::OffsetTable;
use crate::error::{Error, Result};
use crate::rom::{ContainerKind, GameIdentity};

/// Where the primary offset came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum OffsetSource {
    #[strum(serialize = "signature scan")]
    Signature,
    #[strum(serialize = "offset table")]
    Table,
    #[strum(serialize = "default offset")]
    Default,
}

/// Ordered, duplicate-free patch offsets. The first entry is the primary
/// offset; any further entries are cosmetic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OffsetSet {
    offsets: Vec<usize>,
    source: OffsetSource,
}

impl OffsetSet {
    fn new(primary: usize, source: OffsetSource) -> Self {
        Self {
            offsets: vec![primary],
            source,
        }
    }

    #[cfg(test)]
    pub(crate) fn from_offsets(offsets: Vec<usize>, source: OffsetSource) -> Self {
        Self { offsets, source }
    }

    fn push_unique(&mut self, offset: usize) -> bool {
        if self.offsets.contains(&offset) {
            return false;
        }
        self.offsets.push(offset);
        true
    }

    pub fn primary(&self) -> usize {
        self.offsets[0]
    }

    pub fn secondary(&self) -> &[usize] {
        &self.offsets[1..]
    }

    pub fn source(&self) -> OffsetSource {
        self.source
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.offsets
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.offsets.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

pub struct OffsetResolver<'a> {
    table: &'a OffsetTable,
}

impl<'a> OffsetResolver<'a> {
    pub fn new(table: &'a OffsetTable) -> Self {
        Self { table }
    }

    /// Resolve offsets within `target`: the whole file for flat binaries, the
    /// decompressed executable region for structured containers.
    pub fn resolve(&self, identity: &GameIdentity, target: &[u8]) -> Result<OffsetSet> {
        match identity.kind {
            ContainerKind::FlatBinary => self.resolve_flat(identity, target),
            ContainerKind::StructuredContainer => self.resolve_container(identity, target.len()),
        }
    }

    /// Scan for the shiny check signature, falling back to the table, then
    /// append the cosmetic offsets registered for the game code.
    pub fn resolve_flat(&self, identity: &GameIdentity, rom: &[u8]) -> Result<OffsetSet> {
        let code = identity.game_code.as_str();
        let targets = self.table.signature.find_targets(rom);

        let mut offsets = match targets.first() {
            Some(&offset) => {
                if targets.len() > 1 {
                    warn!(
                        "{}: signature matched {} times ({:X?}), using the first",
                        code,
                        targets.len(),
                        &targets[..targets.len().min(5)]
                    );
                }
                if let Some(table_offset) = self.table.offset_for(code, identity.kind)
                    && table_offset != offset
                {
                    debug!(
                        "{}: scanned offset {:#x} overrides table offset {:#x}",
                        code, offset, table_offset
                    );
                }
                OffsetSet::new(offset, OffsetSource::Signature)
            }
            None => {
                let offset = self
                    .table
                    .offset_for(code, identity.kind)
                    .ok_or_else(|| Error::UnresolvedOffset {
                        code: code.to_string(),
                    })?;
                debug!(
                    "{}: signature not found, falling back to table offset {:#x}",
                    code, offset
                );
                OffsetSet::new(offset, OffsetSource::Table)
            }
        };

        for &offset in self.table.cosmetic(code) {
            if offsets.push_unique(offset) {
                debug!("{}: added cosmetic offset {:#x}", code, offset);
            }
        }

        Ok(offsets)
    }

    /// Table lookup keyed by the container's game code, bounds-checked
    /// against the decompressed region.
    pub fn resolve_container(
        &self,
        identity: &GameIdentity,
        region_len: usize,
    ) -> Result<OffsetSet> {
        let code = identity.game_code.as_str();
        let (offset, source) = match self.table.offset_for(code, identity.kind) {
            Some(offset) => (offset, OffsetSource::Table),
            None => {
                debug!(
                    "{}: not in offset table, using default offset {:#x}",
                    code, self.table.default_container_offset
                );
                (self.table.default_container_offset, OffsetSource::Default)
            }
        };

        if offset >= region_len {
            return Err(Error::OutOfBoundsOffset {
                offset,
                len: region_len,
            });
        }

        Ok(OffsetSet::new(offset, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offset::{DEFAULT_CONTAINER_OFFSET, GameEntry, builtin_offset_table};

    const SIGNATURE: [u8; 8] = [0x48, 0x40, 0x00, 0x04, 0x00, 0x0C, 0x07, 0x28];

    fn identity(kind: ContainerKind, code: &str) -> GameIdentity {
        GameIdentity {
            kind,
            game_code: code.to_string(),
            title: "POKEMON".to_string(),
        }
    }

    fn rom_with_signature_at(len: usize, index: Option<usize>) -> Vec<u8> {
        let mut rom = vec![0u8; len];
        if let Some(i) = index {
            rom[i..i + SIGNATURE.len()].copy_from_slice(&SIGNATURE);
        }
        rom
    }

    #[test]
    fn test_flat_signature_wins() {
        let table = builtin_offset_table();
        let resolver = OffsetResolver::new(&table);
        let rom = rom_with_signature_at(0x80000, Some(0x1234));

        let offsets = resolver
            .resolve(&identity(ContainerKind::FlatBinary, "BPRE"), &rom)
            .unwrap();
        assert_eq!(offsets.as_slice(), &[0x1234 + 6]);
        assert_eq!(offsets.source(), OffsetSource::Signature);
    }

    #[test]
    fn test_flat_table_fallback() {
        let table = builtin_offset_table();
        let resolver = OffsetResolver::new(&table);
        let rom = rom_with_signature_at(0x80000, None);

        let offsets = resolver
            .resolve(&identity(ContainerKind::FlatBinary, "BPRE"), &rom)
            .unwrap();
        assert_eq!(offsets.primary(), 0x39D5E);
        assert_eq!(offsets.source(), OffsetSource::Table);
    }

    #[test]
    fn test_flat_cosmetic_offsets_follow_primary() {
        let table = builtin_offset_table();
        let resolver = OffsetResolver::new(&table);
        let rom = rom_with_signature_at(0x100000, Some(0x6CC8E));

        let offsets = resolver
            .resolve(&identity(ContainerKind::FlatBinary, "BPEE"), &rom)
            .unwrap();
        assert_eq!(offsets.as_slice(), &[0x6CC94, 0x0D3B6A, 0x0F4C2E]);
        assert_eq!(offsets.secondary(), &[0x0D3B6A, 0x0F4C2E]);
    }

    #[test]
    fn test_flat_cosmetic_offsets_are_deduplicated() {
        let mut table = builtin_offset_table();
        table
            .cosmetic
            .insert("BPRE".to_string(), vec![0x39D5E, 0x500, 0x500]);
        let resolver = OffsetResolver::new(&table);
        let rom = rom_with_signature_at(0x80000, None);

        let offsets = resolver
            .resolve(&identity(ContainerKind::FlatBinary, "BPRE"), &rom)
            .unwrap();
        assert_eq!(offsets.as_slice(), &[0x39D5E, 0x500]);
    }

    #[test]
    fn test_flat_multiple_matches_uses_lowest() {
        let table = builtin_offset_table();
        let resolver = OffsetResolver::new(&table);
        let mut rom = rom_with_signature_at(0x1000, Some(0x800));
        rom[0x100..0x108].copy_from_slice(&SIGNATURE);

        let offsets = resolver
            .resolve(&identity(ContainerKind::FlatBinary, "BPRE"), &rom)
            .unwrap();
        assert_eq!(offsets.primary(), 0x106);
    }

    #[test]
    fn test_flat_unknown_code_without_signature_fails() {
        let table = builtin_offset_table();
        let resolver = OffsetResolver::new(&table);
        let rom = rom_with_signature_at(0x1000, None);

        let err = resolver
            .resolve(&identity(ContainerKind::FlatBinary, "BPGE"), &rom)
            .unwrap_err();
        assert!(matches!(err, Error::UnresolvedOffset { code } if code == "BPGE"));

        // The same unlisted code resolves once the signature is present
        let rom = rom_with_signature_at(0x1000, Some(0x10));
        let offsets = resolver
            .resolve(&identity(ContainerKind::FlatBinary, "BPGE"), &rom)
            .unwrap();
        assert_eq!(offsets.primary(), 0x16);
    }

    #[test]
    fn test_container_table_and_default() {
        let table = builtin_offset_table();
        let resolver = OffsetResolver::new(&table);

        let offsets = resolver
            .resolve_container(&identity(ContainerKind::StructuredContainer, "IPKE"), 0x100000)
            .unwrap();
        assert_eq!(offsets.as_slice(), &[0x70080]);
        assert_eq!(offsets.source(), OffsetSource::Table);

        let offsets = resolver
            .resolve_container(&identity(ContainerKind::StructuredContainer, "IPKJ"), 0x100000)
            .unwrap();
        assert_eq!(offsets.primary(), DEFAULT_CONTAINER_OFFSET);
        assert_eq!(offsets.source(), OffsetSource::Default);
    }

    #[test]
    fn test_table_offsets_are_kind_specific() {
        let mut table = builtin_offset_table();
        table.games.insert(
            "BXNE".to_string(),
            GameEntry {
                name: "Listed as NDS".to_string(),
                kind: ContainerKind::StructuredContainer,
                offset: 0x1234,
            },
        );
        let resolver = OffsetResolver::new(&table);
        let rom = rom_with_signature_at(0x4000, None);

        let err = resolver
            .resolve_flat(&identity(ContainerKind::FlatBinary, "BXNE"), &rom)
            .unwrap_err();
        assert!(matches!(err, Error::UnresolvedOffset { code } if code == "BXNE"));

        // A GBA entry is never used as an ARM9 offset
        let offsets = resolver
            .resolve_container(&identity(ContainerKind::StructuredContainer, "BPRE"), 0x100000)
            .unwrap();
        assert_eq!(offsets.primary(), DEFAULT_CONTAINER_OFFSET);
        assert_eq!(offsets.source(), OffsetSource::Default);
    }

    #[test]
    fn test_container_out_of_bounds() {
        let table = builtin_offset_table();
        let resolver = OffsetResolver::new(&table);

        let err = resolver
            .resolve_container(&identity(ContainerKind::StructuredContainer, "IPGE"), 0x70080)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::OutOfBoundsOffset {
                offset: 0x70080,
                len: 0x70080
            }
        ));
    }
}
