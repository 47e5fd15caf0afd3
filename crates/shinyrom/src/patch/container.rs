//! Structured container patching through the [`RomContainer`] contract.

use tracing::debug;

use super::PatchLog;
use crate::error::{Error, Result};
use crate::offset::{OffsetResolver, OffsetSet};
use crate::rom::{GameIdentity, RomContainer};
use crate::threshold::PatchByte;

/// Extract the executable region, resolve and patch the target offset, then
/// store the region and rebuild the container.
///
/// Any failure is terminal for the ROM. The region is stored only after
/// every write succeeded.
pub fn patch_container<C: RomContainer + ?Sized>(
    container: &mut C,
    resolver: &OffsetResolver<'_>,
    identity: &GameIdentity,
    byte: PatchByte,
    log: &mut PatchLog,
) -> Result<OffsetSet> {
    let mut region = container.executable_region()?;
    log.info(format!(
        "Extracted executable region (0x{:X} bytes)",
        region.len()
    ));

    let offsets = resolver.resolve_container(identity, region.len())?;
    log.info(format!(
        "Resolved offset 0x{:X} via {}",
        offsets.primary(),
        offsets.source()
    ));

    let len = region.len();
    for offset in offsets.iter() {
        let slot = region
            .get_mut(offset)
            .ok_or(Error::OutOfBoundsOffset { offset, len })?;
        let old = *slot;
        *slot = byte.value();
        debug!("Patched region 0x{:X}: 0x{:02X} -> {}", offset, old, byte);
        log.success(format!("Patched 0x{:X}: 0x{:02X} -> {}", offset, old, byte));
    }

    container.set_executable_region(region)?;
    log.info("Stored patched executable region");

    container.rebuild()?;
    log.info("Rebuilt container");

    Ok(offsets)
}
