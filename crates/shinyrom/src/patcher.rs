//! Single-ROM patch pipeline: classify, resolve, patch.
//!
//! ## Example
//!
//! ```ignore
//! use shinyrom::{Patcher, PatcherConfig, parse_odds};
//!
//! let patcher = Patcher::new();
//! let outcome = patcher.patch_file("emerald.gba", parse_odds("4096"));
//! println!("{}", outcome.log);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::offset::{OffsetResolver, OffsetSet, OffsetTable, Signature, builtin_offset_table};
use crate::patch::{PatchLog, patch_container, patch_flat};
use crate::rom::{ContainerKind, GameIdentity, NdsRom, RomContainer, classify};
use crate::threshold::PatchByte;

/// Configuration for the [`Patcher`]
#[derive(Debug, Clone, Default)]
pub struct PatcherConfig {
    /// Offset table, signature included
    pub table: OffsetTable,
}

impl PatcherConfig {
    /// Create a new configuration builder
    pub fn builder() -> PatcherConfigBuilder {
        PatcherConfigBuilder::default()
    }
}

/// Builder for PatcherConfig
#[derive(Debug, Clone, Default)]
pub struct PatcherConfigBuilder {
    table: Option<OffsetTable>,
    signature: Option<Signature>,
    default_container_offset: Option<usize>,
}

impl PatcherConfigBuilder {
    /// Replace the builtin offset table
    pub fn offset_table(mut self, table: OffsetTable) -> Self {
        self.table = Some(table);
        self
    }

    /// Override the flat binary signature
    pub fn signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }

    /// Override the fallback offset for unlisted structured containers
    pub fn default_container_offset(mut self, offset: usize) -> Self {
        self.default_container_offset = Some(offset);
        self
    }

    /// Build the configuration
    pub fn build(self) -> PatcherConfig {
        let mut table = self.table.unwrap_or_else(builtin_offset_table);
        if let Some(signature) = self.signature {
            table.signature = signature;
        }
        if let Some(offset) = self.default_container_offset {
            table.default_container_offset = offset;
        }
        PatcherConfig { table }
    }
}

/// Result of processing one ROM
#[derive(Debug, Clone, Serialize)]
pub struct PatchOutcome {
    pub path: Option<PathBuf>,
    pub identity: Option<GameIdentity>,
    pub success: bool,
    /// Never opened, excluded by its file extension
    pub skipped: bool,
    pub offsets: Vec<usize>,
    pub log: PatchLog,
}

impl PatchOutcome {
    fn failed(identity: Option<GameIdentity>, log: PatchLog) -> Self {
        Self {
            path: None,
            identity,
            success: false,
            skipped: false,
            offsets: Vec::new(),
            log,
        }
    }

    pub(crate) fn skipped(path: &Path, reason: &str) -> Self {
        let mut outcome = Self::failed(None, PatchLog::new());
        outcome.path = Some(path.to_path_buf());
        outcome.skipped = true;
        outcome
            .log
            .info(format!("Skipped {}: {}", outcome.display_name(), reason));
        outcome
    }

    /// Whether the file was recognized as a supported ROM at all
    pub fn is_recognized(&self) -> bool {
        self.identity.is_some()
    }

    /// File name for display, falling back to the game code
    pub fn display_name(&self) -> String {
        if let Some(name) = self.path.as_deref().and_then(Path::file_name) {
            return name.to_string_lossy().into_owned();
        }
        self.identity
            .as_ref()
            .map(|identity| identity.game_code.clone())
            .unwrap_or_else(|| "<memory>".to_string())
    }
}

pub struct Patcher {
    config: PatcherConfig,
}

impl Default for Patcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Patcher {
    /// Create a patcher over the builtin offset table
    pub fn new() -> Self {
        Self::with_config(PatcherConfig::default())
    }

    pub fn with_config(config: PatcherConfig) -> Self {
        debug!(
            "Patcher using offset table {} ({} games, signature {})",
            config.table.version,
            config.table.len(),
            config.table.signature
        );
        Self { config }
    }

    pub fn config(&self) -> &PatcherConfig {
        &self.config
    }

    pub fn table(&self) -> &OffsetTable {
        &self.config.table
    }

    pub fn resolver(&self) -> OffsetResolver<'_> {
        OffsetResolver::new(&self.config.table)
    }

    /// Pure classification query; never touches the buffer.
    pub fn classify(&self, rom: &[u8]) -> Option<GameIdentity> {
        classify(rom, &self.config.table)
    }

    /// Patch a ROM held in memory. On success `rom` holds the patched image;
    /// on failure it is left untouched for structured containers.
    pub fn patch_bytes(&self, rom: &mut Vec<u8>, byte: PatchByte) -> PatchOutcome {
        let mut log = PatchLog::new();
        let Some(identity) = self.identify(rom, &mut log) else {
            return PatchOutcome::failed(None, log);
        };

        match identity.kind {
            ContainerKind::FlatBinary => {
                let result = self.patch_flat_rom(&identity, rom, byte, &mut log);
                self.finish(identity, result, byte, log)
            }
            ContainerKind::StructuredContainer => {
                let mut container = match NdsRom::parse(rom.clone()) {
                    Ok(container) => container,
                    Err(e) => return self.finish(identity, Err(e), byte, log),
                };
                log.info("Opened NDS container");

                let outcome = self.container_outcome(identity, &mut container, byte, log);
                if outcome.success {
                    *rom = container.into_bytes();
                }
                outcome
            }
        }
    }

    /// Patch through an arbitrary container implementation.
    pub fn patch_with_container<C: RomContainer + ?Sized>(
        &self,
        identity: GameIdentity,
        container: &mut C,
        byte: PatchByte,
    ) -> PatchOutcome {
        self.container_outcome(identity, container, byte, PatchLog::new())
    }

    /// Patch a file in place. The file is only rewritten on success.
    pub fn patch_file<P: AsRef<Path>>(&self, path: P, byte: PatchByte) -> PatchOutcome {
        let path = path.as_ref();
        info!("Processing {}", path.display());

        let mut rom = match fs::read(path) {
            Ok(rom) => rom,
            Err(e) => {
                let mut log = PatchLog::new();
                log.failure(format!("Failed to read {}: {}", path.display(), e));
                let mut outcome = PatchOutcome::failed(None, log);
                outcome.path = Some(path.to_path_buf());
                return outcome;
            }
        };

        let mut outcome = self.patch_bytes(&mut rom, byte);
        if outcome.success
            && let Err(e) = fs::write(path, &rom)
        {
            warn!("Failed to write {}: {}", path.display(), e);
            outcome.success = false;
            outcome
                .log
                .failure(format!("Failed to write {}: {}", path.display(), e));
        }

        outcome.path = Some(path.to_path_buf());
        outcome
    }

    fn identify(&self, rom: &[u8], log: &mut PatchLog) -> Option<GameIdentity> {
        let Some(identity) = self.classify(rom) else {
            debug!("Classification failed ({} bytes)", rom.len());
            log.failure(Error::UnrecognizedFormat.to_string());
            return None;
        };

        log.info(format!(
            "Identified {} ROM: {} ({})",
            identity.kind, identity.title, identity.game_code
        ));
        if !self.table().contains(&identity.game_code, identity.kind) {
            log.warning(format!(
                "{} is not in the offset table, attempting best-effort patch",
                identity.game_code
            ));
        }
        Some(identity)
    }

    fn patch_flat_rom(
        &self,
        identity: &GameIdentity,
        rom: &mut [u8],
        byte: PatchByte,
        log: &mut PatchLog,
    ) -> Result<OffsetSet> {
        let offsets = self.resolver().resolve_flat(identity, rom)?;
        log.info(format!(
            "Resolved {} offset(s) via {}: {}",
            offsets.len(),
            offsets.source(),
            format_offsets(&offsets)
        ));
        patch_flat(rom, &offsets, byte, log);
        Ok(offsets)
    }

    fn container_outcome<C: RomContainer + ?Sized>(
        &self,
        identity: GameIdentity,
        container: &mut C,
        byte: PatchByte,
        mut log: PatchLog,
    ) -> PatchOutcome {
        let result = patch_container(container, &self.resolver(), &identity, byte, &mut log);
        self.finish(identity, result, byte, log)
    }

    fn finish(
        &self,
        identity: GameIdentity,
        result: Result<OffsetSet>,
        byte: PatchByte,
        mut log: PatchLog,
    ) -> PatchOutcome {
        match result {
            Ok(offsets) => {
                info!(
                    "Patched {} at {} with {}",
                    identity.game_code,
                    format_offsets(&offsets),
                    byte
                );
                log.success(format!(
                    "{} patched: shiny odds now 1 in {}",
                    identity.game_code,
                    byte.effective_odds()
                ));
                PatchOutcome {
                    path: None,
                    identity: Some(identity),
                    success: true,
                    skipped: false,
                    offsets: offsets.as_slice().to_vec(),
                    log,
                }
            }
            Err(e) => {
                warn!("Failed to patch {}: {}", identity.game_code, e);
                log.failure(format!("Failed to patch {}: {}", identity.game_code, e));
                PatchOutcome::failed(Some(identity), log)
            }
        }
    }
}

fn format_offsets(offsets: &OffsetSet) -> String {
    offsets
        .iter()
        .map(|offset| format!("0x{:X}", offset))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rom::layout::gba;
    use crate::rom::nds_fixtures::{build_image, plain_arm9};
    use crate::rom::{MockContainer, MockFailure};
    use tempfile::TempDir;

    const SIGNATURE: [u8; 8] = [0x48, 0x40, 0x00, 0x04, 0x00, 0x0C, 0x07, 0x28];

    fn gba_rom(code: &[u8], signature_at: Option<usize>) -> Vec<u8> {
        let mut rom = vec![0u8; 0x80000];
        rom[gba::TITLE..gba::TITLE + 12].copy_from_slice(b"POKEMON EMER");
        rom[gba::GAME_CODE..gba::GAME_CODE + 4].copy_from_slice(code);
        if let Some(i) = signature_at {
            rom[i..i + SIGNATURE.len()].copy_from_slice(&SIGNATURE);
        }
        rom
    }

    fn hgss_image() -> Vec<u8> {
        build_image(b"POKEMON HG", b"IPKE", &plain_arm9(0x80000))
    }

    fn byte(value: u8) -> PatchByte {
        PatchByte::new(value).unwrap()
    }

    #[test]
    fn test_patch_flat_by_signature() {
        let patcher = Patcher::new();
        let original = gba_rom(b"BPRE", Some(0x2000));
        let mut rom = original.clone();

        let outcome = patcher.patch_bytes(&mut rom, byte(0x10));

        assert!(outcome.success);
        assert_eq!(outcome.offsets, vec![0x2006]);
        assert_eq!(rom[0x2006], 0x10);
        let changed: Vec<usize> = (0..rom.len()).filter(|&i| rom[i] != original[i]).collect();
        assert_eq!(changed, vec![0x2006]);
        assert!(outcome.log.mentions("Identified GBA ROM: POKEMON EMER (BPRE)"));
        assert!(outcome.log.mentions("[+] Patched 0x2006: 0x07 -> 0x10"));
    }

    #[test]
    fn test_patch_flat_with_out_of_range_cosmetic_offsets() {
        // 0x80000-byte image is too short for the Emerald cosmetic offsets
        let patcher = Patcher::new();
        let mut rom = gba_rom(b"BPEE", None);

        let outcome = patcher.patch_bytes(&mut rom, byte(0x10));

        assert!(outcome.success);
        assert_eq!(outcome.offsets, vec![0x6CC94, 0x0D3B6A, 0x0F4C2E]);
        assert_eq!(rom[0x6CC94], 0x10);
        assert!(outcome.log.mentions("[!] Skipped 0xD3B6A"));
        assert!(outcome.log.mentions("[!] Skipped 0xF4C2E"));
    }

    #[test]
    fn test_patch_does_not_change_identity() {
        let patcher = Patcher::new();
        let mut rom = gba_rom(b"BPEE", Some(0x100));
        let before = patcher.classify(&rom).unwrap();
        assert!(patcher.patch_bytes(&mut rom, PatchByte::MAX).success);
        assert_eq!(patcher.classify(&rom), Some(before));

        let mut image = hgss_image();
        let before = patcher.classify(&image).unwrap();
        assert!(patcher.patch_bytes(&mut image, PatchByte::MAX).success);
        assert_eq!(patcher.classify(&image), Some(before));
    }

    #[test]
    fn test_patch_twice_with_same_byte() {
        let patcher = Patcher::new();
        let mut rom = gba_rom(b"BPRE", Some(0x400));
        assert!(patcher.patch_bytes(&mut rom, byte(0x20)).success);
        let once = rom.clone();

        let outcome = patcher.patch_bytes(&mut rom, byte(0x20));
        assert!(outcome.success);
        assert_eq!(outcome.offsets, vec![0x406]);
        assert_eq!(rom, once);
    }

    #[test]
    fn test_unrecognized_rom_is_untouched() {
        let patcher = Patcher::new();
        let original = b"just some text that is not a cartridge image".to_vec();
        let mut rom = original.clone();

        let outcome = patcher.patch_bytes(&mut rom, byte(0x10));

        assert!(!outcome.success);
        assert!(!outcome.is_recognized());
        assert_eq!(rom, original);
        assert_eq!(outcome.log.lines(), &["[-] Unrecognized ROM format"]);
    }

    #[test]
    fn test_unresolved_flat_offset_fails() {
        let patcher = Patcher::new();
        let mut rom = gba_rom(b"BPGE", None);

        let outcome = patcher.patch_bytes(&mut rom, byte(0x10));

        assert!(!outcome.success);
        assert!(outcome.is_recognized());
        assert!(outcome.log.mentions("not in the offset table"));
        assert!(outcome.log.mentions("No patch offset found for game code BPGE"));
    }

    #[test]
    fn test_patch_nds_image() {
        let patcher = Patcher::new();
        let mut image = hgss_image();

        let outcome = patcher.patch_bytes(&mut image, byte(0x10));

        assert!(outcome.success, "{}", outcome.log);
        assert_eq!(outcome.offsets, vec![0x70080]);
        let mut container = NdsRom::parse(image).unwrap();
        assert_eq!(container.executable_region().unwrap()[0x70080], 0x10);
        assert!(outcome.log.mentions("Opened NDS container"));
        assert!(outcome.log.mentions("Rebuilt container"));
    }

    #[test]
    fn test_padded_nds_dump_changes_only_patch_and_crc() {
        let patcher = Patcher::new();
        let mut original = hgss_image();
        original.resize(0x10_0000, 0xFF);
        let mut image = original.clone();

        let outcome = patcher.patch_bytes(&mut image, byte(0x10));

        assert!(outcome.success, "{}", outcome.log);
        assert_eq!(image.len(), original.len());
        let arm9_offset = NdsRom::parse(original.clone()).unwrap().arm9_offset();
        let allowed = [
            crate::rom::layout::nds::HEADER_CRC,
            crate::rom::layout::nds::HEADER_CRC + 1,
            arm9_offset + 0x70080,
        ];
        let changed: Vec<usize> = (0..image.len()).filter(|&i| image[i] != original[i]).collect();
        assert!(changed.contains(&(arm9_offset + 0x70080)));
        assert!(changed.iter().all(|i| allowed.contains(i)), "{:X?}", changed);
    }

    #[test]
    fn test_nds_offset_beyond_region_fails() {
        let patcher = Patcher::new();
        let original = build_image(b"POKEMON SS", b"IPGE", &plain_arm9(0x1000));
        let mut image = original.clone();

        let outcome = patcher.patch_bytes(&mut image, byte(0x10));

        assert!(!outcome.success);
        assert_eq!(image, original);
        assert!(outcome.log.mentions("out of bounds"));
    }

    #[test]
    fn test_broken_nds_container_is_a_failure() {
        let patcher = Patcher::new();
        let mut image = vec![0u8; 0x100];
        image[0x0C..0x10].copy_from_slice(b"IPKE");

        let outcome = patcher.patch_bytes(&mut image, byte(0x10));
        assert!(!outcome.success);
        assert!(outcome.log.mentions("Container error"));
    }

    #[test]
    fn test_container_failure_is_logged() {
        let patcher = Patcher::new();
        let identity = GameIdentity {
            kind: ContainerKind::StructuredContainer,
            game_code: "IPGE".to_string(),
            title: "POKEMON SS".to_string(),
        };
        let mut container = MockContainer::new(vec![0; 0x80000]).failing_at(MockFailure::Rebuild);

        let outcome = patcher.patch_with_container(identity, &mut container, byte(0x10));

        assert!(!outcome.success);
        assert!(outcome.log.mentions("mock failure at Rebuild"));
    }

    #[test]
    fn test_patch_file_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("firered.gba");
        fs::write(&path, gba_rom(b"BPRE", None)).unwrap();

        let outcome = Patcher::new().patch_file(&path, byte(0x40));

        assert!(outcome.success);
        assert_eq!(outcome.display_name(), "firered.gba");
        assert_eq!(fs::read(&path).unwrap()[0x39D5E], 0x40);
    }

    #[test]
    fn test_patch_missing_file() {
        let dir = TempDir::new().unwrap();
        let outcome = Patcher::new().patch_file(dir.path().join("missing.gba"), byte(0x40));
        assert!(!outcome.success);
        assert!(outcome.log.mentions("Failed to read"));
    }

    #[test]
    fn test_config_builder_overrides() {
        let signature = Signature::parse("AA BB ?? CC", 2).unwrap();
        let config = PatcherConfig::builder()
            .signature(signature.clone())
            .default_container_offset(0x40)
            .build();
        assert_eq!(config.table.signature, signature);
        assert_eq!(config.table.default_container_offset, 0x40);
        assert_eq!(config.table.primary("BPRE"), Some(0x39D5E));

        let patcher = Patcher::with_config(config);
        let mut rom = gba_rom(b"BPRE", None);
        rom[0x500..0x504].copy_from_slice(&[0xAA, 0xBB, 0x01, 0xCC]);
        let outcome = patcher.patch_bytes(&mut rom, byte(0x30));
        assert_eq!(outcome.offsets, vec![0x502]);
    }
}
