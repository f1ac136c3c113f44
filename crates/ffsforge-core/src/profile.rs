//! TOML profiles
//!
//! A profile collects every constant the builders depend on. All keys are
//! optional; anything left out keeps its built-in default.
//!
//! ```toml
//! [ffs]
//! revision = 0
//! erase_polarity = false
//! checksum = false
//!
//! [kext]
//! guid_template = "DADE1000-1B31-4FE4-8557-26FCEFC78275"
//!
//! [defaults]
//! guid = "99F2839C-57C3-411E-ABC3-ADE5267D960D"
//! name = "OzmosisDefaults"
//!
//! [dsdt]
//! signature = "DSDT"
//! length_offset = 8
//! unpatchable_marker = ".ROM"
//! ```

use std::format;
use std::path::Path;
use std::string::String;

use crate::dsdt::DsdtLayout;
use crate::error::{Error, ErrorKind, Result};
use crate::ffs::{FfsConfig, FfsRevision, FileAttributes};
use crate::guid::Guid;
use crate::kext::{DefaultsConfig, KextConfig};

/// TOML profile file structure
#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlProfile {
    #[serde(default)]
    ffs: TomlFfs,
    #[serde(default)]
    kext: TomlKext,
    #[serde(default)]
    defaults: TomlDefaults,
    #[serde(default)]
    dsdt: TomlDsdt,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlFfs {
    revision: Option<u8>,
    erase_polarity: Option<bool>,
    checksum: Option<bool>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlKext {
    guid_template: Option<String>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlDefaults {
    guid: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlDsdt {
    signature: Option<String>,
    length_offset: Option<usize>,
    unpatchable_marker: Option<String>,
}

/// All builder and patcher settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    /// FFS builder settings
    pub ffs: FfsConfig,
    /// Kext GUID template
    pub kext: KextConfig,
    /// Name pair for plist-only files
    pub defaults: DefaultsConfig,
    /// DSDT search settings
    pub dsdt: DsdtLayout,
}

impl Profile {
    /// Parse a profile from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let raw: TomlProfile = toml::from_str(text).map_err(|e| {
            Error::new(ErrorKind::InvalidFile, format!("invalid profile: {}", e))
        })?;

        let mut profile = Self::default();

        if let Some(rev) = raw.ffs.revision {
            profile.ffs.revision = FfsRevision::from_u8(rev).ok_or_else(|| {
                Error::new(
                    ErrorKind::InvalidParameter,
                    format!("unsupported FFS revision {}", rev),
                )
            })?;
        }
        if let Some(polarity) = raw.ffs.erase_polarity {
            profile.ffs.erase_polarity = polarity;
        }
        if let Some(checksum) = raw.ffs.checksum {
            profile.ffs.attributes.set(FileAttributes::CHECKSUM, checksum);
        }

        if let Some(text) = raw.kext.guid_template {
            profile.kext.guid_template = Guid::parse(&text)?;
        }
        if let Some(text) = raw.defaults.guid {
            profile.defaults.guid = Guid::parse(&text)?;
        }
        if let Some(name) = raw.defaults.name {
            profile.defaults.name = name;
        }

        if let Some(sig) = raw.dsdt.signature {
            profile.dsdt.signature = parse_tag("dsdt.signature", &sig)?;
        }
        if let Some(offset) = raw.dsdt.length_offset {
            profile.dsdt.length_offset = offset;
        }
        if let Some(marker) = raw.dsdt.unpatchable_marker {
            profile.dsdt.unpatchable_marker = parse_tag("dsdt.unpatchable_marker", &marker)?;
        }

        Ok(profile)
    }

    /// Load a profile from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = crate::fs::read_file(path)?;
        let text = String::from_utf8(data).map_err(|_| {
            Error::new(
                ErrorKind::InvalidFile,
                format!("{} is not UTF-8", path.display()),
            )
        })?;
        let profile = Self::from_toml_str(&text)?;
        log::debug!("Loaded profile from {}", path.display());
        Ok(profile)
    }
}

/// A 4-character ASCII tag such as an ACPI signature
fn parse_tag(key: &str, value: &str) -> Result<[u8; 4]> {
    value.as_bytes().try_into().map_err(|_| {
        Error::new(
            ErrorKind::InvalidParameter,
            format!("{} must be exactly 4 bytes, got '{}'", key, value),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_profile_is_default() {
        assert_eq!(Profile::from_toml_str("").unwrap(), Profile::default());
    }

    #[test]
    fn test_full_profile() {
        let text = r#"
            [ffs]
            revision = 1
            erase_polarity = true
            checksum = true

            [kext]
            guid_template = "11111110-2222-3333-4444-555555555555"

            [defaults]
            guid = "AAAAAAAA-BBBB-CCCC-DDDD-EEEEEEEEEEEE"
            name = "Defaults"

            [dsdt]
            signature = "SSDT"
            length_offset = 4
            unpatchable_marker = ".OPR"
        "#;
        let profile = Profile::from_toml_str(text).unwrap();
        assert_eq!(profile.ffs.revision, FfsRevision::Rev1);
        assert!(profile.ffs.erase_polarity);
        assert!(profile.ffs.attributes.contains(FileAttributes::CHECKSUM));
        assert_eq!(
            profile.kext.guid_template,
            Guid::parse("11111110-2222-3333-4444-555555555555").unwrap()
        );
        assert_eq!(profile.defaults.name, "Defaults");
        assert_eq!(&profile.dsdt.signature, b"SSDT");
        assert_eq!(profile.dsdt.length_offset, 4);
        assert_eq!(&profile.dsdt.unpatchable_marker, b".OPR");
        assert_eq!(profile.dsdt.module_magic, *b"MZ");
    }

    #[test]
    fn test_invalid_profiles() {
        let err = Profile::from_toml_str("[ffs]\nrevision = 2\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);

        let err = Profile::from_toml_str("[kext]\nguid_template = \"nope\"\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IdentifierParseFailure);

        let err = Profile::from_toml_str("[dsdt]\nsignature = \"DSD\"\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);

        let err = Profile::from_toml_str("[ffs]\nbogus = 1\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFile);

        let err = Profile::from_toml_str("not toml [").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFile);
    }
}
