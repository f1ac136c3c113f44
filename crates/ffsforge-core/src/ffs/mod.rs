//! Firmware File System (FFS) file support
//!
//! This module builds single FFS files of type `FREEFORM` carrying two
//! sections: a `PE32` section with the payload and a `USER_INTERFACE`
//! section with the display name. The result is ready to be dropped into
//! a firmware volume by an external assembler.
//!
//! ```text
//! +--------------------------+  0x00
//! | EFI_FFS_FILE_HEADER (24) |
//! +--------------------------+  0x18
//! | PE32 section             |
//! |   Size[3] Type[1] body   |
//! +--------------------------+
//! | zero padding to 4 bytes  |
//! +--------------------------+
//! | USER_INTERFACE section   |
//! |   Size[3] Type[1] UTF-16 |
//! +--------------------------+
//! ```
//!
//! Reference: UEFI Platform Initialization Specification, Vol. 3

mod file;
mod section;

pub use file::{file_guid, FfsBuilder, FfsFile, FileHeader, Sections};
pub use section::{
    align_up, decode_ui_name, encode_ui_name, SectionHeader, SectionType,
};

use bitflags::bitflags;

/// Size of `EFI_FFS_FILE_HEADER`
pub const FILE_HEADER_SIZE: usize = 24;

/// Size of `EFI_COMMON_SECTION_HEADER`
pub const SECTION_HEADER_SIZE: usize = 4;

/// Sections start on this boundary, relative to the start of the file
pub const SECTION_ALIGNMENT: usize = 4;

/// `EFI_FV_FILETYPE_FREEFORM`
pub const FV_FILETYPE_FREEFORM: u8 = 0x02;

/// Data checksum used by revision 1 files without `CHECKSUM` attribute
pub const FIXED_CHECKSUM_REV1: u8 = 0x5A;

/// Data checksum used by revision 0 files without `CHECKSUM` attribute
pub const FIXED_CHECKSUM_REV0: u8 = 0xAA;

bitflags! {
    /// `EFI_FFS_FILE_ATTRIBUTES`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FileAttributes: u8 {
        /// File uses the extended 32-bit size header
        const LARGE_FILE     = 0x01;
        /// 2-byte data alignment extension
        const DATA_ALIGNMENT_2 = 0x02;
        /// File must stay at a fixed address
        const FIXED          = 0x04;
        /// Data alignment field
        const DATA_ALIGNMENT = 0x38;
        /// Data checksum covers the file body
        const CHECKSUM       = 0x40;
    }
}

bitflags! {
    /// `EFI_FFS_FILE_STATE`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FileState: u8 {
        /// Header construction has begun
        const HEADER_CONSTRUCTION = 0x01;
        /// Header is complete
        const HEADER_VALID        = 0x02;
        /// File data is complete
        const DATA_VALID          = 0x04;
        /// File is being superseded
        const MARKED_FOR_UPDATE   = 0x08;
        /// File is deleted
        const DELETED             = 0x10;
        /// Header is invalid
        const HEADER_INVALID      = 0x20;
    }
}

/// FFS revision, selects the fixed data checksum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FfsRevision {
    /// Revision 0, fixed checksum `0xAA`
    #[default]
    Rev0,
    /// Revision 1, fixed checksum `0x5A`
    Rev1,
}

impl FfsRevision {
    /// Map a numeric revision, if it is one of the two supported values
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Rev0),
            1 => Some(Self::Rev1),
            _ => None,
        }
    }

    /// Data checksum stored when the `CHECKSUM` attribute is clear
    pub fn fixed_checksum(self) -> u8 {
        match self {
            Self::Rev0 => FIXED_CHECKSUM_REV0,
            Self::Rev1 => FIXED_CHECKSUM_REV1,
        }
    }
}

/// Builder settings
///
/// The default produces what firmware volumes with erase polarity 0
/// expect: no attributes, revision 0 fixed checksum, state bits set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FfsConfig {
    /// Selects the fixed data checksum
    pub revision: FfsRevision,
    /// Volume erase polarity; when set the state bits are stored inverted
    pub erase_polarity: bool,
    /// File attributes
    pub attributes: FileAttributes,
}
