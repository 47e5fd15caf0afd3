//! Flat binary patching: the offset is a file position.

use tracing::{debug, warn};

use super::PatchLog;
use crate::offset::OffsetSet;
use crate::threshold::PatchByte;

/// Write `byte` at every offset. Offsets past the end of the buffer are
/// logged and skipped; the rest are still written. Returns the number of
/// bytes written.
pub fn patch_flat(
    rom: &mut [u8],
    offsets: &OffsetSet,
    byte: PatchByte,
    log: &mut PatchLog,
) -> usize {
    let len = rom.len();
    let mut written = 0;

    for offset in offsets.iter() {
        match rom.get_mut(offset) {
            Some(slot) => {
                let old = *slot;
                *slot = byte.value();
                debug!("Patched 0x{:X}: 0x{:02X} -> {}", offset, old, byte);
                log.success(format!("Patched 0x{:X}: 0x{:02X} -> {}", offset, old, byte));
                written += 1;
            }
            None => {
                warn!("Offset 0x{:X} is beyond end of file (0x{:X} bytes)", offset, len);
                log.warning(format!(
                    "Skipped 0x{:X}: beyond end of file (0x{:X} bytes)",
                    offset, len
                ));
            }
        }
    }

    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offset::OffsetSource;

    #[test]
    fn test_patch_flat_touches_only_offsets() {
        let original: Vec<u8> = (0..0x200).map(|i| (i % 7) as u8).collect();
        let mut rom = original.clone();
        let offsets = OffsetSet::from_offsets(vec![0x10, 0x1FF], OffsetSource::Table);
        let mut log = PatchLog::new();

        let written = patch_flat(&mut rom, &offsets, PatchByte::new(0x10).unwrap(), &mut log);

        assert_eq!(written, 2);
        assert_eq!(rom[0x10], 0x10);
        assert_eq!(rom[0x1FF], 0x10);
        for (i, (a, b)) in original.iter().zip(&rom).enumerate() {
            if i != 0x10 && i != 0x1FF {
                assert_eq!(a, b, "byte {:#x} changed", i);
            }
        }
        assert_eq!(log.lines()[0], "[+] Patched 0x10: 0x02 -> 0x10");
    }

    #[test]
    fn test_patch_flat_skips_out_of_range_and_continues() {
        let mut rom = vec![0u8; 0x100];
        let offsets = OffsetSet::from_offsets(vec![0x400, 0x20], OffsetSource::Signature);
        let mut log = PatchLog::new();

        let written = patch_flat(&mut rom, &offsets, PatchByte::MAX, &mut log);

        assert_eq!(written, 1);
        assert_eq!(rom[0x20], 0xFF);
        assert!(log.lines()[0].starts_with("[!] Skipped 0x400"));
        assert!(log.lines()[1].starts_with("[+] Patched 0x20"));
    }

    #[test]
    fn test_patch_flat_reapplication_is_stable() {
        let mut rom = vec![0x08u8; 0x40];
        let offsets = OffsetSet::from_offsets(vec![0x30], OffsetSource::Table);
        let byte = PatchByte::new(0x20).unwrap();

        patch_flat(&mut rom, &offsets, byte, &mut PatchLog::new());
        let once = rom.clone();
        let mut log = PatchLog::new();
        patch_flat(&mut rom, &offsets, byte, &mut log);

        assert_eq!(rom, once);
        assert!(log.mentions("0x20 -> 0x20"));
    }
}
