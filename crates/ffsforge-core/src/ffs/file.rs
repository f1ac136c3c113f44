//! FFS file header, builder and reader

use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use super::section::{align_up, decode_ui_name, encode_ui_name, SectionHeader, SectionType};
use super::{
    FfsConfig, FfsRevision, FileAttributes, FileState, FILE_HEADER_SIZE, FV_FILETYPE_FREEFORM,
    SECTION_ALIGNMENT, SECTION_HEADER_SIZE,
};
use crate::bytes::{checksum8, read_u24_le, sum8, write_u24_le, MAX_U24};
use crate::error::{Error, ErrorKind, Result};
use crate::guid::{Guid, GUID_SIZE};

// Field offsets within EFI_FFS_FILE_HEADER
const OFF_HEADER_CHECKSUM: usize = 16;
const OFF_DATA_CHECKSUM: usize = 17;
const OFF_TYPE: usize = 18;
const OFF_ATTRIBUTES: usize = 19;
const OFF_SIZE: usize = 20;
const OFF_STATE: usize = 23;

/// `EFI_FFS_FILE_HEADER`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// File name GUID
    pub name: Guid,
    /// `IntegrityCheck.Checksum.Header`
    pub header_checksum: u8,
    /// `IntegrityCheck.Checksum.File`
    pub data_checksum: u8,
    /// `EFI_FV_FILETYPE_*`
    pub file_type: u8,
    /// File attributes
    pub attributes: FileAttributes,
    /// Header plus body size in bytes
    pub size: u32,
    /// State bits as stored (inverted on erase polarity 1 volumes)
    pub state: FileState,
}

impl FileHeader {
    /// Encode all 24 header bytes as they are
    pub fn encode(&self) -> Result<[u8; FILE_HEADER_SIZE]> {
        let mut out = [0u8; FILE_HEADER_SIZE];
        out[..GUID_SIZE].copy_from_slice(self.name.as_bytes());
        out[OFF_HEADER_CHECKSUM] = self.header_checksum;
        out[OFF_DATA_CHECKSUM] = self.data_checksum;
        out[OFF_TYPE] = self.file_type;
        out[OFF_ATTRIBUTES] = self.attributes.bits();
        write_u24_le(&mut out, OFF_SIZE, self.size)?;
        out[OFF_STATE] = self.state.bits();
        Ok(out)
    }

    /// Decode from the start of `data`
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < FILE_HEADER_SIZE {
            return Err(Error::new(
                ErrorKind::InvalidFile,
                format!(
                    "{} bytes is too short for an FFS file header",
                    data.len()
                ),
            ));
        }
        Ok(Self {
            name: Guid::decode(data)?,
            header_checksum: data[OFF_HEADER_CHECKSUM],
            data_checksum: data[OFF_DATA_CHECKSUM],
            file_type: data[OFF_TYPE],
            attributes: FileAttributes::from_bits_retain(data[OFF_ATTRIBUTES]),
            size: read_u24_le(data, OFF_SIZE)?,
            state: FileState::from_bits_retain(data[OFF_STATE]),
        })
    }

    /// Header checksum for the current field values
    ///
    /// Every other header byte takes part as stored, data checksum and
    /// state included, so the 24 encoded bytes sum to zero.
    pub fn compute_header_checksum(&self) -> Result<u8> {
        let mut bytes = self.encode()?;
        bytes[OFF_HEADER_CHECKSUM] = 0;
        Ok(checksum8(&bytes))
    }

    /// Whether the encoded header bytes sum to zero
    pub fn header_checksum_valid(&self) -> bool {
        self.encode().map(|bytes| sum8(&bytes) == 0).unwrap_or(false)
    }

    /// State bits with erase polarity removed
    pub fn logical_state(&self, erase_polarity: bool) -> FileState {
        if erase_polarity {
            FileState::from_bits_retain(!self.state.bits())
        } else {
            self.state
        }
    }
}

/// Builds FREEFORM files with a PE32 payload and a user interface name
#[derive(Debug, Clone, Copy, Default)]
pub struct FfsBuilder {
    config: FfsConfig,
}

impl FfsBuilder {
    /// Create a builder with the given settings
    pub fn new(config: FfsConfig) -> Self {
        Self { config }
    }

    /// Settings in use
    pub fn config(&self) -> &FfsConfig {
        &self.config
    }

    /// Build a file named by GUID text
    pub fn build_named(&self, body: &[u8], name: &str, display_name: &str) -> Result<Vec<u8>> {
        let guid = Guid::parse(name)?;
        self.build(body, &guid, display_name)
    }

    /// Build a complete FFS file
    ///
    /// All sizes are validated before any byte is encoded.
    pub fn build(&self, body: &[u8], name: &Guid, display_name: &str) -> Result<Vec<u8>> {
        let content = SectionHeader::for_payload(SectionType::Pe32, body.len())?;
        let ui_payload = encode_ui_name(display_name);
        let ui = SectionHeader::for_payload(SectionType::UserInterface, ui_payload.len())?;

        // Offsets are relative to the start of the file
        let content_end = FILE_HEADER_SIZE + content.size as usize;
        let ui_offset = align_up(content_end, SECTION_ALIGNMENT);
        let file_size = ui_offset + ui.size as usize;
        if file_size > MAX_U24 as usize {
            return Err(Error::new(
                ErrorKind::InvalidParameter,
                format!(
                    "file of {:#x} bytes exceeds the 24-bit FFS size field",
                    file_size
                ),
            ));
        }

        let mut out = vec![0u8; FILE_HEADER_SIZE];
        out.reserve(file_size - FILE_HEADER_SIZE);
        out.extend_from_slice(&content.encode()?);
        out.extend_from_slice(body);
        out.resize(ui_offset, 0);
        out.extend_from_slice(&ui.encode()?);
        out.extend_from_slice(&ui_payload);

        let mut state =
            FileState::HEADER_CONSTRUCTION | FileState::HEADER_VALID | FileState::DATA_VALID;
        if self.config.erase_polarity {
            state = FileState::from_bits_retain(!state.bits());
        }

        let mut header = FileHeader {
            name: *name,
            header_checksum: 0,
            data_checksum: 0,
            file_type: FV_FILETYPE_FREEFORM,
            attributes: self.config.attributes,
            size: file_size as u32,
            state,
        };
        header.data_checksum = if header.attributes.contains(FileAttributes::CHECKSUM) {
            checksum8(&out[FILE_HEADER_SIZE..])
        } else {
            self.config.revision.fixed_checksum()
        };
        // Last, once data checksum and state hold their final values
        header.header_checksum = header.compute_header_checksum()?;

        out[..FILE_HEADER_SIZE].copy_from_slice(&header.encode()?);

        log::debug!(
            "Built FFS file {} '{}': {:#x} bytes (body {:#x})",
            name,
            display_name,
            file_size,
            body.len()
        );
        Ok(out)
    }
}

/// Name GUID of the FFS file at the start of `data`
pub fn file_guid(data: &[u8]) -> Result<Guid> {
    Guid::decode(data)
}

/// A parsed view of one FFS file
#[derive(Debug, Clone, Copy)]
pub struct FfsFile<'a> {
    header: FileHeader,
    data: &'a [u8],
}

impl<'a> FfsFile<'a> {
    /// Parse the file at the start of `data`
    ///
    /// Trailing bytes past the header's size field are ignored.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let header = FileHeader::decode(data)?;
        let size = header.size as usize;
        if size < FILE_HEADER_SIZE || size > data.len() {
            return Err(Error::new(
                ErrorKind::InvalidFile,
                format!(
                    "FFS size field {:#x} does not fit buffer of {:#x} bytes",
                    size,
                    data.len()
                ),
            ));
        }
        Ok(Self {
            header,
            data: &data[..size],
        })
    }

    /// The file header
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Bytes following the header
    pub fn body(&self) -> &'a [u8] {
        &self.data[FILE_HEADER_SIZE..]
    }

    /// Whether the data checksum matches attributes and revision
    pub fn data_checksum_valid(&self, revision: FfsRevision) -> bool {
        let expected = if self.header.attributes.contains(FileAttributes::CHECKSUM) {
            checksum8(self.body())
        } else {
            revision.fixed_checksum()
        };
        expected == self.header.data_checksum
    }

    /// Iterate over the section stream
    pub fn sections(&self) -> Sections<'a> {
        Sections {
            data: self.data,
            offset: FILE_HEADER_SIZE,
            done: false,
        }
    }

    /// Name from the first user interface section, if any
    pub fn display_name(&self) -> Result<Option<String>> {
        for section in self.sections() {
            let (header, _, payload) = section?;
            if header.section_type == SectionType::UserInterface {
                return decode_ui_name(payload).map(Some);
            }
        }
        Ok(None)
    }
}

/// Iterator over `(header, offset, payload)` of each section
///
/// Offsets are relative to the start of the file. Iteration stops after
/// the first malformed section.
#[derive(Debug, Clone)]
pub struct Sections<'a> {
    data: &'a [u8],
    offset: usize,
    done: bool,
}

impl<'a> Iterator for Sections<'a> {
    type Item = Result<(SectionHeader, usize, &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let offset = align_up(self.offset, SECTION_ALIGNMENT);
        if offset + SECTION_HEADER_SIZE > self.data.len() {
            self.done = true;
            return None;
        }

        let header = match SectionHeader::decode(&self.data[offset..]) {
            Ok(header) => header,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };
        let end = offset + header.size as usize;
        if (header.size as usize) < SECTION_HEADER_SIZE || end > self.data.len() {
            self.done = true;
            return Some(Err(Error::new(
                ErrorKind::InvalidFile,
                format!(
                    "section at {:#x} has invalid size {:#x}",
                    offset, header.size
                ),
            )));
        }

        self.offset = end;
        Some(Ok((
            header,
            offset,
            &self.data[offset + SECTION_HEADER_SIZE..end],
        )))
    }
}
