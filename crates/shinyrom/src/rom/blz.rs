//! Backward LZ decompression for NDS executable binaries.
//!
//! The stream is decoded from the end of the input towards the start. The
//! last eight bytes are a footer:
//!
//! ```text
//! [len-8 .. len-5]  compressed length (24 bits, measured from the end)
//! [len-5]           footer length including padding
//! [len-4 .. len]    number of bytes the output grows by
//! ```
//!
//! Bytes before the compressed part are stored verbatim.

use crate::error::{Error, Result};

use super::layout::read_u32;

const FOOTER_SIZE: usize = 8;
const MIN_MATCH: usize = 3;
const MIN_DISPLACEMENT: usize = 3;

/// Decompress a backward-LZ encoded buffer.
///
/// A buffer whose growth field is zero is returned unchanged.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let len = data.len();
    if len < FOOTER_SIZE {
        return Err(Error::container(format!(
            "compressed binary too small ({} bytes)",
            len
        )));
    }

    let footer = read_u32(data, len - FOOTER_SIZE).unwrap_or_default();
    let growth = read_u32(data, len - 4).unwrap_or_default() as usize;
    if growth == 0 {
        return Ok(data.to_vec());
    }

    let header_len = (footer >> 24) as usize;
    let compressed_len = (footer & 0x00FF_FFFF) as usize;
    if header_len < FOOTER_SIZE
        || header_len > len
        || compressed_len > len
        || compressed_len < header_len
    {
        return Err(Error::container(format!(
            "invalid compression footer (header {:#x}, compressed {:#x}, size {:#x})",
            header_len, compressed_len, len
        )));
    }

    let stop = len - compressed_len;
    let out_len = len + growth;
    let mut out = vec![0u8; out_len];
    out[..len].copy_from_slice(data);

    let mut read = len - header_len;
    let mut write = out_len;

    while read > stop {
        read -= 1;
        let mut flags = data[read];

        for _ in 0..8 {
            if read <= stop {
                break;
            }

            if flags & 0x80 != 0 {
                if read < stop + 2 {
                    return Err(Error::container("truncated back-reference"));
                }
                read -= 2;
                let lo = data[read] as usize;
                let hi = data[read + 1] as usize;
                let count = (hi >> 4) + MIN_MATCH;
                let displacement = (((hi & 0x0F) << 8) | lo) + MIN_DISPLACEMENT;

                for _ in 0..count {
                    if write <= stop || write - 1 + displacement >= out_len {
                        return Err(Error::container("back-reference out of range"));
                    }
                    write -= 1;
                    out[write] = out[write + displacement];
                }
            } else {
                if write <= stop {
                    return Err(Error::container("literal overflows output"));
                }
                read -= 1;
                write -= 1;
                out[write] = data[read];
            }

            flags <<= 1;
        }
    }

    if write != stop {
        return Err(Error::container(format!(
            "decompressed size mismatch ({:#x} bytes unfilled)",
            write - stop
        )));
    }

    Ok(out)
}
