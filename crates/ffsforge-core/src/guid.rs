//! EFI GUID codec
//!
//! A [`Guid`] holds the 16 bytes exactly as they appear on flash: the
//! first three groups of the canonical `8-4-4-4-12` text form are stored
//! little-endian, the last two in text order. Text conversion goes
//! through [`uuid::Uuid`], which knows that mixed-endian layout.

use core::fmt;
use core::str::FromStr;

use alloc::format;
use uuid::Uuid;

use crate::error::{Error, ErrorKind, Result};

/// Size of an encoded GUID in bytes
pub const GUID_SIZE: usize = 16;

/// Length of the canonical hyphenated text form
const GUID_TEXT_LEN: usize = 36;

/// Offsets of the dashes in the canonical text form
const DASH_POSITIONS: [usize; 4] = [8, 13, 18, 23];

/// A 16-byte EFI GUID in on-flash byte order
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Guid([u8; GUID_SIZE]);

impl Guid {
    /// Build a GUID from its textual field values
    pub const fn from_fields(d1: u32, d2: u16, d3: u16, d4: [u8; 8]) -> Self {
        let a = d1.to_le_bytes();
        let b = d2.to_le_bytes();
        let c = d3.to_le_bytes();
        Self([
            a[0], a[1], a[2], a[3], b[0], b[1], c[0], c[1], d4[0], d4[1], d4[2], d4[3], d4[4],
            d4[5], d4[6], d4[7],
        ])
    }

    /// Wrap raw on-flash bytes
    pub const fn from_bytes(bytes: [u8; GUID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Decode a GUID from the start of `data`
    pub fn decode(data: &[u8]) -> Result<Self> {
        let bytes: [u8; GUID_SIZE] = data
            .get(..GUID_SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::IdentifierParseFailure,
                    format!(
                        "need {} bytes for a GUID, have {}",
                        GUID_SIZE,
                        data.len()
                    ),
                )
            })?;
        Ok(Self(bytes))
    }

    /// Parse the canonical `XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX` form
    ///
    /// Only the 36-character hyphenated form is accepted; braces, URNs and
    /// the undashed 32-digit form are rejected.
    pub fn parse(text: &str) -> Result<Self> {
        let fail = |why: &str| {
            Error::new(
                ErrorKind::IdentifierParseFailure,
                format!("'{}': {}", text, why),
            )
        };

        if text.len() != GUID_TEXT_LEN {
            return Err(fail("expected 36 characters"));
        }
        for (i, c) in text.bytes().enumerate() {
            if DASH_POSITIONS.contains(&i) {
                if c != b'-' {
                    return Err(fail("misplaced dash"));
                }
            } else if !c.is_ascii_hexdigit() {
                return Err(fail("invalid hex digit"));
            }
        }

        let uuid = Uuid::try_parse(text).map_err(|_| fail("malformed GUID"))?;
        Ok(Self(uuid.to_bytes_le()))
    }

    /// Raw on-flash bytes
    pub const fn as_bytes(&self) -> &[u8; GUID_SIZE] {
        &self.0
    }

    /// Copy of this GUID with the lowest hex digit of the first group set to `index`
    ///
    /// Kext files are named `DADE100X-...` where `X` is the kext slot.
    pub fn with_index(&self, index: u8) -> Result<Self> {
        if index > 0xF {
            return Err(Error::new(
                ErrorKind::InvalidParameter,
                format!("index {} does not fit a hex digit", index),
            ));
        }
        let mut bytes = self.0;
        // First group is little-endian: its lowest digit lives in byte 0
        bytes[0] = (bytes[0] & 0xF0) | index;
        Ok(Self(bytes))
    }
}

impl FromStr for Guid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = [0u8; GUID_TEXT_LEN];
        let text = Uuid::from_bytes_le(self.0)
            .hyphenated()
            .encode_upper(&mut buf);
        f.write_str(text)
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use proptest::prelude::*;

    const TEMPLATE: &str = "DADE1000-1B31-4FE4-8557-26FCEFC78275";

    #[test]
    fn test_parse_byte_order() {
        let guid = Guid::parse(TEMPLATE).unwrap();
        assert_eq!(
            guid.as_bytes(),
            &[
                0x00, 0x10, 0xDE, 0xDA, 0x31, 0x1B, 0xE4, 0x4F, 0x85, 0x57, 0x26, 0xFC, 0xEF,
                0xC7, 0x82, 0x75
            ]
        );
        assert_eq!(
            guid,
            Guid::from_fields(
                0xDADE1000,
                0x1B31,
                0x4FE4,
                [0x85, 0x57, 0x26, 0xFC, 0xEF, 0xC7, 0x82, 0x75]
            )
        );
    }

    #[test]
    fn test_format_uppercase() {
        let guid = Guid::parse("99f2839c-57c3-411e-abc3-ade5267d960d").unwrap();
        assert_eq!(guid.to_string(), "99F2839C-57C3-411E-ABC3-ADE5267D960D");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in [
            "",
            "DADE1000-1B31-4FE4-8557-26FCEFC7827",
            "DADE1000-1B31-4FE4-8557-26FCEFC782755",
            "DADE10001B31-4FE4-8557-26FCEFC78275-",
            "DADE1000-1B31-4FE4-8557-26FCEFC7827G",
            "{ADE1000-1B31-4FE4-8557-26FCEFC7827}",
            "DADE1000113B31-4FE4-8557-26FCEFC7827",
        ] {
            let err = Guid::parse(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::IdentifierParseFailure, "{}", bad);
        }
    }

    #[test]
    fn test_decode_short_buffer() {
        let err = Guid::decode(&[0u8; 15]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IdentifierParseFailure);
        let guid = Guid::decode(&[0xAB; 20]).unwrap();
        assert_eq!(guid.as_bytes(), &[0xAB; 16]);
    }

    #[test]
    fn test_with_index() {
        let template = Guid::parse(TEMPLATE).unwrap();
        let guid = template.with_index(3).unwrap();
        assert_eq!(guid.to_string(), "DADE1003-1B31-4FE4-8557-26FCEFC78275");
        let guid = template.with_index(0xF).unwrap();
        assert_eq!(guid.to_string(), "DADE100F-1B31-4FE4-8557-26FCEFC78275");
        assert_eq!(
            template.with_index(16).unwrap_err().kind(),
            ErrorKind::InvalidParameter
        );
    }

    proptest! {
        #[test]
        fn test_text_round_trip(bytes in any::<[u8; 16]>()) {
            let guid = Guid::from_bytes(bytes);
            let text = guid.to_string();
            prop_assert_eq!(text.len(), 36);
            prop_assert_eq!(Guid::parse(&text).unwrap(), guid);
        }
    }
}
