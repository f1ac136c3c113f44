//! FFS section headers and user interface names

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use super::SECTION_HEADER_SIZE;
use crate::bytes::{read_u24_le, write_u24_le, MAX_U24};
use crate::error::{Error, ErrorKind, Result};

/// `EFI_SECTION_TYPE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionType {
    /// `EFI_SECTION_PE32` (0x10), carries the payload
    Pe32,
    /// `EFI_SECTION_USER_INTERFACE` (0x15), carries the UTF-16 name
    UserInterface,
    /// Any other section type
    Other(u8),
}

impl SectionType {
    /// Decode a raw type byte
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x10 => Self::Pe32,
            0x15 => Self::UserInterface,
            other => Self::Other(other),
        }
    }

    /// Raw type byte
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Pe32 => 0x10,
            Self::UserInterface => 0x15,
            Self::Other(other) => other,
        }
    }
}

/// `EFI_COMMON_SECTION_HEADER`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionHeader {
    /// Section type
    pub section_type: SectionType,
    /// Header plus payload size in bytes
    pub size: u32,
}

impl SectionHeader {
    /// Header for a payload of `payload_len` bytes
    ///
    /// Fails if header plus payload would not fit the 24-bit size field.
    pub fn for_payload(section_type: SectionType, payload_len: usize) -> Result<Self> {
        let size = payload_len
            .checked_add(SECTION_HEADER_SIZE)
            .filter(|&s| s <= MAX_U24 as usize)
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::InvalidParameter,
                    format!(
                        "{:?} section payload of {} bytes exceeds the 16 MiB section limit",
                        section_type, payload_len
                    ),
                )
            })?;
        Ok(Self {
            section_type,
            size: size as u32,
        })
    }

    /// Encode as `Size[3] Type[1]`
    pub fn encode(&self) -> Result<[u8; SECTION_HEADER_SIZE]> {
        let mut out = [0u8; SECTION_HEADER_SIZE];
        write_u24_le(&mut out, 0, self.size)?;
        out[3] = self.section_type.as_u8();
        Ok(out)
    }

    /// Decode from the start of `data`
    pub fn decode(data: &[u8]) -> Result<Self> {
        let size = read_u24_le(data, 0)?;
        let section_type = data
            .get(3)
            .copied()
            .map(SectionType::from_u8)
            .ok_or_else(|| Error::new(ErrorKind::OutOfRange, "truncated section header"))?;
        Ok(Self { section_type, size })
    }

    /// Payload size in bytes (zero for a malformed header smaller than itself)
    pub fn payload_len(&self) -> usize {
        (self.size as usize).saturating_sub(SECTION_HEADER_SIZE)
    }
}

/// Round `value` up to a multiple of `align` (a power of two)
pub fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

/// UTF-16LE code units of `name`, without terminator
pub fn encode_ui_name(name: &str) -> Vec<u8> {
    name.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

/// Decode a user interface section payload
///
/// A trailing NUL, as written by EDK II tools, is dropped.
pub fn decode_ui_name(payload: &[u8]) -> Result<String> {
    if payload.len() % 2 != 0 {
        return Err(Error::new(
            ErrorKind::InvalidFile,
            format!("odd user interface name length {}", payload.len()),
        ));
    }
    let mut units: Vec<u16> = payload
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    if units.last() == Some(&0) {
        units.pop();
    }
    String::from_utf16(&units)
        .map_err(|_| Error::new(ErrorKind::InvalidFile, "user interface name is not UTF-16"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_header_encoding() {
        let header = SectionHeader::for_payload(SectionType::Pe32, 0x1234).unwrap();
        assert_eq!(header.size, 0x1238);
        assert_eq!(header.encode().unwrap(), [0x38, 0x12, 0x00, 0x10]);

        let decoded = SectionHeader::decode(&[0x0C, 0x00, 0x00, 0x15, 0xAA]).unwrap();
        assert_eq!(decoded.section_type, SectionType::UserInterface);
        assert_eq!(decoded.payload_len(), 8);
    }

    #[test]
    fn test_header_size_limit() {
        let max_payload = MAX_U24 as usize - SECTION_HEADER_SIZE;
        let header = SectionHeader::for_payload(SectionType::Pe32, max_payload).unwrap();
        assert_eq!(header.size, MAX_U24);

        let err = SectionHeader::for_payload(SectionType::Pe32, max_payload + 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        let err = SectionHeader::for_payload(SectionType::Pe32, usize::MAX).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn test_section_type_mapping() {
        assert_eq!(SectionType::from_u8(0x10), SectionType::Pe32);
        assert_eq!(SectionType::from_u8(0x19), SectionType::Other(0x19));
        assert_eq!(SectionType::Other(0x19).as_u8(), 0x19);
    }

    #[test]
    fn test_ui_name() {
        let payload = encode_ui_name("Kext.Rev-1.2");
        assert_eq!(&payload[..4], &[b'K', 0, b'e', 0]);
        assert_eq!(payload.len(), 24);
        assert_eq!(decode_ui_name(&payload).unwrap(), "Kext.Rev-1.2");

        let mut terminated = payload.clone();
        terminated.extend_from_slice(&[0, 0]);
        assert_eq!(decode_ui_name(&terminated).unwrap(), "Kext.Rev-1.2");

        assert_eq!(
            decode_ui_name(&[0x41]).unwrap_err().kind(),
            ErrorKind::InvalidFile
        );
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 4), 0);
        assert_eq!(align_up(25, 4), 28);
        assert_eq!(align_up(28, 4), 28);
    }

    proptest! {
        #[test]
        fn test_size_field_round_trip(n in 0usize..=(MAX_U24 as usize - SECTION_HEADER_SIZE)) {
            let header = SectionHeader::for_payload(SectionType::Pe32, n).unwrap();
            let decoded = SectionHeader::decode(&header.encode().unwrap()).unwrap();
            prop_assert_eq!(decoded.size as usize, SECTION_HEADER_SIZE + n);
            prop_assert_eq!(decoded.payload_len(), n);
        }
    }
}
