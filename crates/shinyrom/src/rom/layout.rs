//! Header layout constants for the supported ROM containers
//!
//! Offsets are byte positions from the start of the file. Multi-byte fields
//! are little-endian.

/// Game Boy Advance cartridge header (flat binary)
pub mod gba {
    pub const TITLE: usize = 0xA0;
    pub const TITLE_LEN: usize = 12;
    pub const GAME_CODE: usize = 0xAC;
    pub const GAME_CODE_LEN: usize = 4;

    /// First letter shared by the game codes of the supported family
    pub const FAMILY_MARKER: u8 = b'B';
}

/// Nintendo DS cartridge header (structured container)
pub mod nds {
    pub const TITLE: usize = 0x00;
    pub const TITLE_LEN: usize = 12;
    pub const GAME_CODE: usize = 0x0C;
    pub const GAME_CODE_LEN: usize = 4;

    /// First letter shared by the game codes of the supported family
    pub const FAMILY_MARKER: u8 = b'I';

    /// Device capacity, `128KiB << n`
    pub const DEVICE_CAPACITY: usize = 0x14;

    pub const ARM9_ROM_OFFSET: usize = 0x20;
    pub const ARM9_ENTRY_ADDRESS: usize = 0x24;
    pub const ARM9_RAM_ADDRESS: usize = 0x28;
    pub const ARM9_SIZE: usize = 0x2C;

    pub const TOTAL_USED_ROM_SIZE: usize = 0x80;

    /// CRC16 over `0x000..HEADER_CRC`
    pub const HEADER_CRC: usize = 0x15E;
    pub const HEADER_SIZE: usize = 0x200;

    /// Alignment used when relocating the ARM9 binary
    pub const ROM_ALIGNMENT: usize = 0x200;

    /// Magic closing the ARM9 module parameters
    pub const NITROCODE: [u8; 8] = [0x21, 0x06, 0xC0, 0xDE, 0xDE, 0xC0, 0x06, 0x21];

    /// Distance from the nitrocode magic back to the compressed static end field
    pub const COMPRESSED_END_BEFORE_NITROCODE: usize = 0x08;

    /// Size of the footer that may follow the ARM9 binary in the ROM image
    pub const ARM9_FOOTER_SIZE: usize = 12;
}

/// Read a little-endian u32 at `offset`, if in bounds.
pub(crate) fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Write a little-endian u32 at `offset`. The caller guarantees bounds.
pub(crate) fn write_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}
