//! Error types for ffsforge-core
//!
//! Every failure carries a stable [`ErrorKind`] that callers can match on
//! plus a human readable detail string. No error is fatal to the process;
//! each one is scoped to the single conversion or patch that produced it.

use alloc::string::String;
use thiserror::Error;

/// Stable failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ErrorKind {
    // File errors
    /// Input path does not exist
    #[error("file not found")]
    FileNotFound,
    /// File exists but could not be opened or read
    #[error("failed to open file")]
    FileOpenFailed,
    /// Output file could not be written completely
    #[error("failed to write file")]
    FileWriteFailed,
    /// Directory to create is already present
    #[error("directory already exists")]
    DirectoryAlreadyExists,
    /// Directory could not be created
    #[error("failed to create directory")]
    DirectoryCreateFailed,

    // Format errors
    /// Input is not the expected kind of file (bad magic, unparsable metadata)
    #[error("invalid file")]
    InvalidFile,
    /// A size, index or other parameter is out of its legal range
    #[error("invalid parameter")]
    InvalidParameter,
    /// Fixed-width field read or write past the end of a buffer
    #[error("offset out of range")]
    OutOfRange,
    /// The searched signature is not present in the buffer
    #[error("signature not found")]
    SignatureNotFound,
    /// Module carries a section layout that cannot be patched
    #[error("unsupported module layout")]
    UnsupportedLayout,
    /// Replacement table is larger than the table it replaces
    #[error("table growth unsupported")]
    GrowthUnsupported,

    // Input errors
    /// Required metadata field is missing or blank
    #[error("missing or empty metadata field")]
    MissingOrEmptyMetadataField,
    /// GUID text or bytes could not be parsed
    #[error("identifier parse failure")]
    IdentifierParseFailure,
}

/// Core error type: a kind plus detail text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {detail}")]
pub struct Error {
    kind: ErrorKind,
    detail: String,
}

impl Error {
    /// Create an error of `kind` with a detail message
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// The stable failure category
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Human readable detail
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
