//! Bounds-checked fixed-width field access
//!
//! Firmware structures are decoded field by field from byte slices rather
//! than overlaid as `repr(C)` structs, so every read states its width,
//! offset and byte order and fails cleanly on short buffers.

use alloc::format;

use crate::error::{Error, ErrorKind, Result};

/// Largest value a 24-bit FFS size field can hold
pub const MAX_U24: u32 = 0x00FF_FFFF;

/// Byte order of a multi-byte field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    /// Least significant byte first
    Little,
    /// Most significant byte first
    Big,
}

/// Borrow `width` bytes at `offset`, or fail with [`ErrorKind::OutOfRange`]
fn field(buf: &[u8], offset: usize, width: usize) -> Result<&[u8]> {
    offset
        .checked_add(width)
        .and_then(|end| buf.get(offset..end))
        .ok_or_else(|| {
            Error::new(
                ErrorKind::OutOfRange,
                format!(
                    "{}-byte field at {:#x} exceeds buffer of {:#x} bytes",
                    width,
                    offset,
                    buf.len()
                ),
            )
        })
}

/// Read a 16-bit unsigned integer
pub fn read_u16(buf: &[u8], offset: usize, endian: Endian) -> Result<u16> {
    let b = field(buf, offset, 2)?;
    let raw = [b[0], b[1]];
    Ok(match endian {
        Endian::Little => u16::from_le_bytes(raw),
        Endian::Big => u16::from_be_bytes(raw),
    })
}

/// Read a 32-bit unsigned integer
pub fn read_u32(buf: &[u8], offset: usize, endian: Endian) -> Result<u32> {
    let b = field(buf, offset, 4)?;
    let raw = [b[0], b[1], b[2], b[3]];
    Ok(match endian {
        Endian::Little => u32::from_le_bytes(raw),
        Endian::Big => u32::from_be_bytes(raw),
    })
}

/// Read a 24-bit little-endian size field
pub fn read_u24_le(buf: &[u8], offset: usize) -> Result<u32> {
    let b = field(buf, offset, 3)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], 0]))
}

/// Write a 24-bit little-endian size field
///
/// Values above [`MAX_U24`] are rejected before anything is written.
pub fn write_u24_le(buf: &mut [u8], offset: usize, value: u32) -> Result<()> {
    if value > MAX_U24 {
        return Err(Error::new(
            ErrorKind::InvalidParameter,
            format!("{:#x} does not fit a 24-bit size field", value),
        ));
    }
    let len = buf.len();
    let dst = offset
        .checked_add(3)
        .and_then(|end| buf.get_mut(offset..end))
        .ok_or_else(|| {
            Error::new(
                ErrorKind::OutOfRange,
                format!(
                    "3-byte field at {:#x} exceeds buffer of {:#x} bytes",
                    offset, len
                ),
            )
        })?;
    dst.copy_from_slice(&value.to_le_bytes()[..3]);
    Ok(())
}

/// Position of the first exact occurrence of `needle` in `haystack`
pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// 8-bit additive checksum
///
/// Returns the byte that brings the wrapping sum of `data` to zero.
pub fn checksum8(data: &[u8]) -> u8 {
    data.iter()
        .fold(0u8, |sum, &b| sum.wrapping_add(b))
        .wrapping_neg()
}

/// Wrapping 8-bit sum of `data`
pub fn sum8(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |sum, &b| sum.wrapping_add(b))
}
