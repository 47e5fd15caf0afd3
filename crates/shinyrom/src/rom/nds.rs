//! NDS cartridge image exposed through [`RomContainer`].
//!
//! The executable region is the ARM9 binary. When its module parameters
//! carry a non-zero compressed static end, the binary is backward-LZ
//! compressed and gets decompressed on extraction. Rebuilding always stores
//! the ARM9 uncompressed: the compressed static end is cleared so the
//! loader skips decompression, and the binary is moved to the end of the
//! image when it no longer fits its original slot. The rebuilt image stays
//! in memory until [`NdsRom::save`] or [`NdsRom::into_bytes`].

use std::fs;
use std::path::Path;

use memchr::memmem;
use tracing::{debug, info};

use super::RomContainer;
use super::blz;
use super::layout::{nds, read_u32, write_u32};
use crate::error::{Error, Result};

/// First word of the optional footer stored after the ARM9 binary
const ARM9_FOOTER_MAGIC: [u8; 4] = [0x21, 0x06, 0xC0, 0xDE];

/// Smallest device capacity step (128 KiB)
const CAPACITY_UNIT: usize = 0x20000;

pub struct NdsRom {
    data: Vec<u8>,
    arm9_offset: usize,
    arm9_size: usize,
    ram_address: u32,
    /// Decompressed ARM9, cached after the first extraction
    arm9: Option<Vec<u8>>,
    modified: bool,
}

impl NdsRom {
    /// Validate the header and the ARM9 location.
    pub fn parse(data: Vec<u8>) -> Result<Self> {
        if data.len() < nds::HEADER_SIZE {
            return Err(Error::container(format!(
                "image too small for an NDS header ({} bytes)",
                data.len()
            )));
        }

        let field = |offset| read_u32(&data, offset).unwrap_or_default();
        let arm9_offset = field(nds::ARM9_ROM_OFFSET) as usize;
        let arm9_size = field(nds::ARM9_SIZE) as usize;
        let ram_address = field(nds::ARM9_RAM_ADDRESS);

        if arm9_size == 0 {
            return Err(Error::container("ARM9 binary is empty"));
        }
        if arm9_offset < nds::HEADER_SIZE {
            return Err(Error::container(format!(
                "ARM9 offset {:#x} overlaps the header",
                arm9_offset
            )));
        }
        let in_bounds = arm9_offset
            .checked_add(arm9_size)
            .is_some_and(|end| end <= data.len());
        if !in_bounds {
            return Err(Error::container(format!(
                "ARM9 range {:#x}+{:#x} exceeds image size {:#x}",
                arm9_offset,
                arm9_size,
                data.len()
            )));
        }

        debug!(
            "NDS image: ARM9 at {:#x}, {:#x} bytes, RAM {:#x}",
            arm9_offset, arm9_size, ram_address
        );

        Ok(Self {
            data,
            arm9_offset,
            arm9_size,
            ram_address,
            arm9: None,
            modified: false,
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::parse(fs::read(path)?)
    }

    pub fn arm9_offset(&self) -> usize {
        self.arm9_offset
    }

    pub fn arm9_size(&self) -> usize {
        self.arm9_size
    }

    /// ARM9 binary as stored in the image
    fn raw_arm9(&self) -> &[u8] {
        &self.data[self.arm9_offset..self.arm9_offset + self.arm9_size]
    }

    pub fn is_arm9_compressed(&self) -> Result<bool> {
        Ok(self.compressed_len()?.is_some())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, &self.data)?;
        Ok(())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Length of the compressed part of the stored ARM9, if compressed.
    fn compressed_len(&self) -> Result<Option<usize>> {
        let arm9 = self.raw_arm9();
        let Some(field) = compressed_end_field(arm9) else {
            debug!("ARM9 module parameters not found, treating binary as uncompressed");
            return Ok(None);
        };

        let end = read_u32(arm9, field).unwrap_or_default();
        if end == 0 {
            return Ok(None);
        }

        end.checked_sub(self.ram_address)
            .map(|len| len as usize)
            .filter(|&len| len > 0 && len <= arm9.len())
            .map(Some)
            .ok_or_else(|| {
                Error::container(format!(
                    "compressed static end {:#x} lies outside the ARM9 binary",
                    end
                ))
            })
    }

    /// Write the ARM9 location back into the header and refresh the CRC.
    ///
    /// `relocated_end` is the new end of the ARM9 data (footer included) when
    /// the binary moved. The used ROM size and device capacity only ever
    /// grow, and only then; an in-place rebuild leaves them as they were.
    fn update_header(&mut self, relocated_end: Option<usize>) -> Result<()> {
        let offset = u32::try_from(self.arm9_offset)
            .map_err(|_| Error::container("ARM9 offset exceeds 32 bits"))?;
        let size = u32::try_from(self.arm9_size)
            .map_err(|_| Error::container("ARM9 size exceeds 32 bits"))?;

        write_u32(&mut self.data, nds::ARM9_ROM_OFFSET, offset);
        write_u32(&mut self.data, nds::ARM9_SIZE, size);

        if let Some(end) = relocated_end {
            let end32 =
                u32::try_from(end).map_err(|_| Error::container("image size exceeds 32 bits"))?;
            let used = read_u32(&self.data, nds::TOTAL_USED_ROM_SIZE).unwrap_or_default();
            write_u32(&mut self.data, nds::TOTAL_USED_ROM_SIZE, used.max(end32));

            let mut capacity = 0u8;
            while capacity < 16 && (CAPACITY_UNIT << capacity) < end {
                capacity += 1;
            }
            let current = self.data[nds::DEVICE_CAPACITY];
            self.data[nds::DEVICE_CAPACITY] = current.max(capacity);
        }

        let crc = crc16(&self.data[..nds::HEADER_CRC]);
        self.data[nds::HEADER_CRC..nds::HEADER_CRC + 2].copy_from_slice(&crc.to_le_bytes());
        Ok(())
    }
}

impl RomContainer for NdsRom {
    fn executable_region(&mut self) -> Result<Vec<u8>> {
        if let Some(arm9) = &self.arm9 {
            return Ok(arm9.clone());
        }

        let region = match self.compressed_len()? {
            Some(len) => {
                let raw = self.raw_arm9();
                debug!("ARM9 is compressed up to {:#x}, decompressing", len);
                let mut region = blz::decompress(&raw[..len])?;
                region.extend_from_slice(&raw[len..]);
                region
            }
            None => self.raw_arm9().to_vec(),
        };

        self.arm9 = Some(region.clone());
        Ok(region)
    }

    fn set_executable_region(&mut self, region: Vec<u8>) -> Result<()> {
        if region.is_empty() {
            return Err(Error::container("refusing to store an empty ARM9 binary"));
        }
        self.arm9 = Some(region);
        self.modified = true;
        Ok(())
    }

    fn rebuild(&mut self) -> Result<()> {
        if !self.modified {
            return Ok(());
        }
        let Some(mut region) = self.arm9.take() else {
            return Ok(());
        };

        if let Some(field) = compressed_end_field(&region) {
            write_u32(&mut region, field, 0);
        }

        let relocated_end = if region.len() <= self.arm9_size {
            let start = self.arm9_offset;
            self.data[start..start + region.len()].copy_from_slice(&region);
            None
        } else {
            let old_end = self.arm9_offset + self.arm9_size;
            let footer = self
                .data
                .get(old_end..old_end + nds::ARM9_FOOTER_SIZE)
                .filter(|footer| footer.starts_with(&ARM9_FOOTER_MAGIC))
                .map(<[u8]>::to_vec);

            let new_offset = self.data.len().next_multiple_of(nds::ROM_ALIGNMENT);
            self.data.resize(new_offset, 0xFF);
            self.data.extend_from_slice(&region);
            if let Some(footer) = footer {
                self.data.extend_from_slice(&footer);
            }

            info!(
                "Relocated ARM9 from {:#x} to {:#x} ({:#x} -> {:#x} bytes)",
                self.arm9_offset,
                new_offset,
                self.arm9_size,
                region.len()
            );
            self.arm9_offset = new_offset;
            Some(self.data.len())
        };

        self.arm9_size = region.len();
        self.update_header(relocated_end)?;
        self.arm9 = Some(region);
        self.modified = false;
        Ok(())
    }
}

fn compressed_end_field(arm9: &[u8]) -> Option<usize> {
    memmem::find(arm9, &nds::NITROCODE)?.checked_sub(nds::COMPRESSED_END_BEFORE_NITROCODE)
}

/// CRC-16/MODBUS as used by the NDS header checksum.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0xA001
            } else {
                crc >> 1
            };
        }
    }
    crc
}
