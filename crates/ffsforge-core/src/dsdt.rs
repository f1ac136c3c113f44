//! DSDT extraction and replacement in AmiBoardInfo modules
//!
//! AMI firmware ships the platform DSDT inside the `AmiBoardInfo` DXE
//! driver, a PE32+ image. The table is found by scanning for its ACPI
//! signature; its length comes from a fixed-width field following the
//! signature.
//!
//! Replacement happens in place. A table no larger than the existing
//! one is written over it and the remainder zero filled, so every
//! other byte of the image keeps its offset. Growing the table would need
//! the PE section sizes and virtual addresses rewritten and is refused
//! with [`ErrorKind::GrowthUnsupported`].

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::bytes::{find, read_u16, read_u32, Endian};
use crate::error::{Error, ErrorKind, Result};

/// DOS executable magic, `MZ`
pub const DOS_MAGIC: [u8; 2] = *b"MZ";

/// ACPI signature of the DSDT
pub const DSDT_SIGNATURE: [u8; 4] = *b"DSDT";

/// Offset of the length field, counted from the signature
pub const DSDT_LENGTH_OFFSET: usize = 8;

/// Section name of AmiBoardInfo builds carrying an option ROM section
pub const UNPATCHABLE_MARKER: [u8; 4] = *b".ROM";

/// Where and how to find the table inside a module
///
/// The length field is always read big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DsdtLayout {
    /// First two bytes of a valid module
    pub module_magic: [u8; 2],
    /// Table signature to scan for
    pub signature: [u8; 4],
    /// Offset of the 32-bit length field past the signature start
    pub length_offset: usize,
    /// Byte sequence marking a module layout that cannot be patched
    pub unpatchable_marker: [u8; 4],
}

impl Default for DsdtLayout {
    fn default() -> Self {
        Self {
            module_magic: DOS_MAGIC,
            signature: DSDT_SIGNATURE,
            length_offset: DSDT_LENGTH_OFFSET,
            unpatchable_marker: UNPATCHABLE_MARKER,
        }
    }
}

/// Position of the table inside a module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DsdtLocation {
    /// Offset of the signature
    pub offset: usize,
    /// Declared table length in bytes
    pub size: usize,
}

/// Check the module magic
fn check_magic(module: &[u8], layout: &DsdtLayout) -> Result<()> {
    if module.get(..2) != Some(&layout.module_magic[..]) {
        return Err(Error::new(
            ErrorKind::InvalidFile,
            "not a recognized module: missing DOS header magic",
        ));
    }
    Ok(())
}

/// Find the table and validate its declared size
pub fn locate(module: &[u8], layout: &DsdtLayout) -> Result<DsdtLocation> {
    check_magic(module, layout)?;

    let offset = find(module, &layout.signature).ok_or_else(|| {
        Error::new(
            ErrorKind::SignatureNotFound,
            format!(
                "'{}' table not found in module",
                String::from_utf8_lossy(&layout.signature)
            ),
        )
    })?;

    let length_at = offset.saturating_add(layout.length_offset);
    let size = read_u32(module, length_at, Endian::Big)? as usize;
    let available = module.len() - offset;
    if size > available {
        return Err(Error::new(
            ErrorKind::InvalidParameter,
            format!(
                "declared table size {:#x} at {:#x} exceeds remaining {:#x} bytes",
                size, offset, available
            ),
        ));
    }

    log::debug!(
        "Found table at {:#x}, size {:#x} (module {:#x} bytes)",
        offset,
        size,
        module.len()
    );
    Ok(DsdtLocation { offset, size })
}

/// Borrow the table bytes
pub fn extract<'a>(module: &'a [u8], layout: &DsdtLayout) -> Result<&'a [u8]> {
    locate_and_extract(module, layout).map(|(_, table)| table)
}

/// Locate the table once, returning both its position and its bytes
pub fn locate_and_extract<'a>(
    module: &'a [u8],
    layout: &DsdtLayout,
) -> Result<(DsdtLocation, &'a [u8])> {
    let loc = locate(module, layout)?;
    Ok((loc, &module[loc.offset..loc.offset + loc.size]))
}

/// Replace the table in place, returning the patched module
///
/// The output always has the same length as `module`.
pub fn replace(module: &[u8], new_table: &[u8], layout: &DsdtLayout) -> Result<Vec<u8>> {
    let loc = locate(module, layout)?;

    if find(module, &layout.unpatchable_marker).is_some() {
        return Err(Error::new(
            ErrorKind::UnsupportedLayout,
            format!(
                "module contains a '{}' section",
                String::from_utf8_lossy(&layout.unpatchable_marker)
            ),
        ));
    }

    if new_table.len() > loc.size {
        let mut detail = format!(
            "new table is {:#x} bytes, existing slot holds {:#x}",
            new_table.len(),
            loc.size
        );
        match PeSummary::parse(module) {
            Ok(pe) => {
                log::debug!("Module headers: {}", pe);
                detail.push_str(&format!(" ({})", pe));
            }
            Err(e) => log::debug!("Module headers unreadable: {}", e),
        }
        return Err(Error::new(ErrorKind::GrowthUnsupported, detail));
    }

    let padding = loc.size - new_table.len();
    log::info!(
        "Replacing table at {:#x}: {:#x} -> {:#x} bytes, {:#x} bytes zero padding",
        loc.offset,
        loc.size,
        new_table.len(),
        padding
    );

    let mut out = Vec::with_capacity(module.len());
    out.extend_from_slice(&module[..loc.offset]);
    out.extend_from_slice(new_table);
    out.resize(out.len() + padding, 0);
    out.extend_from_slice(&module[loc.offset + loc.size..]);
    Ok(out)
}

/// `PE\0\0`
const PE_SIGNATURE: [u8; 4] = *b"PE\0\0";

/// Offset of `e_lfanew` in the DOS header
const DOS_LFANEW_OFFSET: usize = 0x3C;

/// Offset of the optional header from the PE signature
const OPTIONAL_HEADER_OFFSET: usize = 24;

/// Offset of `SizeOfImage` inside the optional header (PE32 and PE32+)
const SIZE_OF_IMAGE_OFFSET: usize = 56;

/// Headline fields of a PE image, for diagnostics
///
/// Only the COFF file header and two optional header fields are read;
/// the section table is not decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeSummary {
    /// Offset of the PE signature (`e_lfanew`)
    pub nt_offset: usize,
    /// COFF machine type
    pub machine: u16,
    /// Number of section table entries
    pub number_of_sections: u16,
    /// Optional header magic (0x10B PE32, 0x20B PE32+)
    pub optional_magic: u16,
    /// `SizeOfImage`
    pub size_of_image: u32,
}

impl PeSummary {
    /// Read the summary from a DOS-prefixed image
    pub fn parse(image: &[u8]) -> Result<Self> {
        let nt_offset = read_u32(image, DOS_LFANEW_OFFSET, Endian::Little)? as usize;
        if image.get(nt_offset..nt_offset.saturating_add(4)) != Some(&PE_SIGNATURE[..]) {
            return Err(Error::new(
                ErrorKind::InvalidFile,
                format!("no PE signature at {:#x}", nt_offset),
            ));
        }
        let optional = nt_offset + OPTIONAL_HEADER_OFFSET;
        Ok(Self {
            nt_offset,
            machine: read_u16(image, nt_offset + 4, Endian::Little)?,
            number_of_sections: read_u16(image, nt_offset + 6, Endian::Little)?,
            optional_magic: read_u16(image, optional, Endian::Little)?,
            size_of_image: read_u32(image, optional + SIZE_OF_IMAGE_OFFSET, Endian::Little)?,
        })
    }
}

impl fmt::Display for PeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PE at {:#x}, machine {:#06x}, {} sections, optional magic {:#x}, image size {:#x}",
            self.nt_offset,
            self.machine,
            self.number_of_sections,
            self.optional_magic,
            self.size_of_image
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    const DSDT_OFFSET: usize = 0x100;
    const DSDT_SIZE: usize = 0x200;

    /// Module with a DSDT at 0x100 and recognizable bytes around it
    fn make_test_module() -> Vec<u8> {
        // Odd filler bytes never spell a signature
        let mut data: Vec<u8> = (0..0x400).map(|i| (i % 251) as u8 | 0x01).collect();
        data[..2].copy_from_slice(b"MZ");
        data[DSDT_OFFSET..DSDT_OFFSET + 4].copy_from_slice(b"DSDT");
        data[DSDT_OFFSET + 8..DSDT_OFFSET + 12]
            .copy_from_slice(&(DSDT_SIZE as u32).to_be_bytes());
        data
    }

    /// Minimal PE32+ headers at 0x40
    fn add_pe_headers(data: &mut [u8]) {
        data[0x3C..0x40].copy_from_slice(&0x40u32.to_le_bytes());
        data[0x40..0x44].copy_from_slice(b"PE\0\0");
        data[0x44..0x46].copy_from_slice(&0x8664u16.to_le_bytes());
        data[0x46..0x48].copy_from_slice(&3u16.to_le_bytes());
        data[0x58..0x5A].copy_from_slice(&0x20Bu16.to_le_bytes());
        data[0x90..0x94].copy_from_slice(&0x4000u32.to_le_bytes());
    }

    #[test]
    fn test_locate_and_extract() {
        let data = make_test_module();
        let (loc, table) = locate_and_extract(&data, &DsdtLayout::default()).unwrap();
        assert_eq!(loc.offset, DSDT_OFFSET);
        assert_eq!(loc.size, DSDT_SIZE);
        assert_eq!(table, &data[DSDT_OFFSET..DSDT_OFFSET + DSDT_SIZE]);

        let err = locate_and_extract(&data[2..], &DsdtLayout::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFile);
    }

    #[test]
    fn test_extract() {
        let data = make_test_module();
        let table = extract(&data, &DsdtLayout::default()).unwrap();
        assert_eq!(table.len(), 512);
        assert_eq!(table, &data[0x100..0x300]);
        assert_eq!(
            locate(&data, &DsdtLayout::default()).unwrap(),
            DsdtLocation {
                offset: 0x100,
                size: 0x200
            }
        );
    }

    #[test]
    fn test_bad_magic() {
        let mut data = make_test_module();
        data[0] = b'X';
        let err = extract(&data, &DsdtLayout::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFile);
        let err = replace(&data, &[], &DsdtLayout::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFile);
        let err = extract(b"M", &DsdtLayout::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFile);
    }

    #[test]
    fn test_signature_not_found() {
        let mut data = make_test_module();
        data[DSDT_OFFSET] = b'X';
        let err = extract(&data, &DsdtLayout::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SignatureNotFound);
    }

    #[test]
    fn test_declared_size_too_large() {
        let mut data = make_test_module();
        // 0x300 bytes remain from 0x100
        data[DSDT_OFFSET + 8..DSDT_OFFSET + 12].copy_from_slice(&0x301u32.to_be_bytes());
        let err = extract(&data, &DsdtLayout::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);

        data[DSDT_OFFSET + 8..DSDT_OFFSET + 12].copy_from_slice(&0x300u32.to_be_bytes());
        assert_eq!(extract(&data, &DsdtLayout::default()).unwrap().len(), 0x300);
    }

    #[test]
    fn test_length_field_past_end() {
        let mut data = vec![0u8; 0x20];
        data[..2].copy_from_slice(b"MZ");
        data[0x1A..0x1E].copy_from_slice(b"DSDT");
        let err = extract(&data, &DsdtLayout::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
    }

    #[test]
    fn test_replace_smaller() {
        let data = make_test_module();
        let new_table = vec![0xEEu8; 0x180];
        let out = replace(&data, &new_table, &DsdtLayout::default()).unwrap();

        assert_eq!(out.len(), data.len());
        assert_eq!(&out[..DSDT_OFFSET], &data[..DSDT_OFFSET]);
        assert_eq!(&out[DSDT_OFFSET..DSDT_OFFSET + 0x180], &new_table[..]);
        assert!(out[DSDT_OFFSET + 0x180..DSDT_OFFSET + DSDT_SIZE]
            .iter()
            .all(|&b| b == 0));
        assert_eq!(
            &out[DSDT_OFFSET + DSDT_SIZE..],
            &data[DSDT_OFFSET + DSDT_SIZE..]
        );
    }

    #[test]
    fn test_replace_same_size() {
        let data = make_test_module();
        let new_table = vec![0x42u8; DSDT_SIZE];
        let out = replace(&data, &new_table, &DsdtLayout::default()).unwrap();
        assert_eq!(out.len(), data.len());
        assert_eq!(&out[DSDT_OFFSET..DSDT_OFFSET + DSDT_SIZE], &new_table[..]);
        assert_eq!(&out[DSDT_OFFSET + DSDT_SIZE..], &data[DSDT_OFFSET + DSDT_SIZE..]);
    }

    #[test]
    fn test_replace_growth_unsupported() {
        let mut data = make_test_module();
        add_pe_headers(&mut data);
        let new_table = vec![0x42u8; DSDT_SIZE + 1];
        let err = replace(&data, &new_table, &DsdtLayout::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GrowthUnsupported);
        assert!(err.detail().contains("3 sections"));

        // Still refused without readable PE headers
        let data = make_test_module();
        let err = replace(&data, &new_table, &DsdtLayout::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GrowthUnsupported);
    }

    #[test]
    fn test_replace_unpatchable_layout() {
        let mut data = make_test_module();
        data[0x320..0x324].copy_from_slice(b".ROM");
        let err = replace(&data, &[0u8; 4], &DsdtLayout::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedLayout);
        // Extraction does not care about the marker
        assert!(extract(&data, &DsdtLayout::default()).is_ok());
    }

    #[test]
    fn test_custom_layout() {
        let mut data = make_test_module();
        data[0x200..0x204].copy_from_slice(b"SSDT");
        data[0x204..0x208].copy_from_slice(&0x10u32.to_be_bytes());
        let layout = DsdtLayout {
            signature: *b"SSDT",
            length_offset: 4,
            ..Default::default()
        };
        assert_eq!(extract(&data, &layout).unwrap(), &data[0x200..0x210]);
    }

    #[test]
    fn test_pe_summary() {
        let mut data = make_test_module();
        add_pe_headers(&mut data);
        let pe = PeSummary::parse(&data).unwrap();
        assert_eq!(pe.nt_offset, 0x40);
        assert_eq!(pe.machine, 0x8664);
        assert_eq!(pe.number_of_sections, 3);
        assert_eq!(pe.optional_magic, 0x20B);
        assert_eq!(pe.size_of_image, 0x4000);

        let data = make_test_module();
        assert!(PeSummary::parse(&data).is_err());
    }
}
