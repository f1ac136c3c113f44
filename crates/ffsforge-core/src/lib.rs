//! ffsforge-core - Firmware File System builder and DSDT patcher
//!
//! This crate turns macOS kext bundles and raw blobs into UEFI Firmware
//! File System (FFS) files, and extracts or replaces the DSDT table
//! embedded in an AmiBoardInfo PE module.
//!
//! The binary codecs, the FFS builder and the DSDT patcher only need
//! `alloc`. File access, the kext pipeline and TOML profiles are gated
//! behind the `std` feature.
//!
//! # Features
//!
//! - `std` (default) - Enable file helpers, kext ingestion and profiles
//!
//! # Example
//!
//! ```ignore
//! use ffsforge_core::ffs::{FfsBuilder, FfsConfig};
//! use ffsforge_core::guid::Guid;
//!
//! let name: Guid = "DADE1003-1B31-4FE4-8557-26FCEFC78275".parse()?;
//! let file = FfsBuilder::new(FfsConfig::default()).build(&body, &name, "MyKext.Rev-1.2")?;
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

extern crate alloc;

// proptest expands to unqualified std macros
#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

pub mod bytes;
pub mod dsdt;
pub mod error;
pub mod ffs;
#[cfg(feature = "std")]
pub mod fs;
pub mod guid;
#[cfg(feature = "std")]
pub mod kext;
#[cfg(feature = "std")]
pub mod profile;

pub use error::{Error, ErrorKind, Result};
