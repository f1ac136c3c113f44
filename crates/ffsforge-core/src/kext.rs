//! Kext bundle ingestion
//!
//! Converts a macOS kernel extension bundle into an FFS file:
//!
//! ```text
//! Foo.kext/
//!   Contents/
//!     Info.plist          -> CFBundleExecutable, CFBundleShortVersionString
//!     MacOS/<executable>
//! ```
//!
//! The PE32 section carries `Info.plist`, one NUL byte, then the
//! executable. Kexts are named `<base>.Rev-<version>` and get the GUID
//! template with the kext index as its lowest hex digit.

use std::format;
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};
use std::string::{String, ToString};
use std::vec::Vec;

use crate::error::{Error, ErrorKind, Result};
use crate::ffs::{FfsBuilder, FfsConfig};
use crate::fs::{dir_exists, is_file, read_file};
use crate::guid::Guid;
use crate::profile::Profile;

/// GUID template for kext files, `DADE100X-1B31-4FE4-8557-26FCEFC78275`
pub const KEXT_GUID_TEMPLATE: Guid = Guid::from_fields(
    0xDADE_1000,
    0x1B31,
    0x4FE4,
    [0x85, 0x57, 0x26, 0xFC, 0xEF, 0xC7, 0x82, 0x75],
);

/// GUID of the plist-only defaults file
pub const DEFAULTS_GUID: Guid = Guid::from_fields(
    0x99F2_839C,
    0x57C3,
    0x411E,
    [0xAB, 0xC3, 0xAD, 0xE5, 0x26, 0x7D, 0x96, 0x0D],
);

/// Display name of the plist-only defaults file
pub const DEFAULTS_NAME: &str = "OzmosisDefaults";

/// Highest kext index; the index must fit one hex digit
pub const MAX_KEXT_INDEX: u8 = 0xF;

const EXECUTABLE_KEY: &str = "CFBundleExecutable";
const VERSION_KEY: &str = "CFBundleShortVersionString";

/// Kext naming settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KextConfig {
    /// GUID whose lowest digit is replaced by the kext index
    pub guid_template: Guid,
}

impl Default for KextConfig {
    fn default() -> Self {
        Self {
            guid_template: KEXT_GUID_TEMPLATE,
        }
    }
}

/// Identity of the plist-only file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultsConfig {
    /// File name GUID
    pub guid: Guid,
    /// User interface name
    pub name: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            guid: DEFAULTS_GUID,
            name: DEFAULTS_NAME.to_string(),
        }
    }
}

/// The `Info.plist` fields used for conversion
///
/// Keys holding anything other than a string count as absent.
#[derive(Debug, Clone, Default)]
pub struct InfoPlist {
    executable: Option<String>,
    short_version: Option<String>,
}

impl InfoPlist {
    /// Parse an XML or binary property list with a dictionary at its root
    pub fn parse(data: &[u8]) -> Result<Self> {
        let value = plist::Value::from_reader(Cursor::new(data)).map_err(|e| {
            Error::new(
                ErrorKind::InvalidFile,
                format!("unreadable Info.plist: {}", e),
            )
        })?;
        let dict = value.as_dictionary().ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidFile,
                "Info.plist root is not a dictionary",
            )
        })?;

        let string_field = |key: &str| {
            let value = dict.get(key)?;
            if value.as_string().is_none() {
                log::debug!("Info.plist '{}' is not a string, ignoring it", key);
            }
            value.as_string().map(str::to_string)
        };
        Ok(Self {
            executable: string_field(EXECUTABLE_KEY),
            short_version: string_field(VERSION_KEY),
        })
    }

    /// Executable file name; required and non-empty
    pub fn executable_name(&self) -> Result<&str> {
        match self.executable.as_deref() {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(Error::new(
                ErrorKind::MissingOrEmptyMetadataField,
                format!("'{}' in Info.plist is missing or blank", EXECUTABLE_KEY),
            )),
        }
    }

    /// Bundle short version, if present and non-empty
    pub fn short_version(&self) -> Option<&str> {
        self.short_version.as_deref().filter(|v| !v.is_empty())
    }
}

/// A kext bundle loaded into memory
#[derive(Debug, Clone)]
pub struct KextBundle {
    path: PathBuf,
    info: InfoPlist,
    plist: Vec<u8>,
    executable: Vec<u8>,
}

impl KextBundle {
    /// Load `Info.plist` and the executable of the bundle at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = path.join("Contents");
        let macos = contents.join("MacOS");
        let plist_path = contents.join("Info.plist");

        if !dir_exists(&macos) {
            return Err(Error::new(
                ErrorKind::FileNotFound,
                format!("invalid kext {}: Contents/MacOS missing", path.display()),
            ));
        }
        if !is_file(&plist_path) {
            return Err(Error::new(
                ErrorKind::FileNotFound,
                format!("invalid kext {}: Contents/Info.plist missing", path.display()),
            ));
        }

        let plist = read_file(&plist_path)?;
        let info = InfoPlist::parse(&plist)?;
        let exec_name = info.executable_name()?;
        let mut components = Path::new(exec_name).components();
        if !matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) {
            return Err(Error::new(
                ErrorKind::InvalidFile,
                format!(
                    "invalid kext {}: executable name '{}' is not a plain file name",
                    path.display(),
                    exec_name
                ),
            ));
        }

        let exec_path = macos.join(exec_name);
        if !is_file(&exec_path) {
            return Err(Error::new(
                ErrorKind::FileNotFound,
                format!(
                    "invalid kext {}: Contents/MacOS/{} missing",
                    path.display(),
                    exec_name
                ),
            ));
        }
        let executable = read_file(&exec_path)?;

        Ok(Self {
            path: path.to_path_buf(),
            info,
            plist,
            executable,
        })
    }

    /// Bundle directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parsed metadata
    pub fn info(&self) -> &InfoPlist {
        &self.info
    }

    /// `Info.plist`, NUL, executable
    pub fn ffs_body(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(self.plist.len() + 1 + self.executable.len());
        body.extend_from_slice(&self.plist);
        body.push(0);
        body.extend_from_slice(&self.executable);
        body
    }

    /// `<base>.Rev-<version>`, or just `<base>` without a version
    pub fn section_name(&self, base_name: &str) -> String {
        match self.info.short_version() {
            Some(version) => format!("{}.Rev-{}", base_name, version),
            None => {
                log::info!(
                    "{}: no bundle version string, using '{}'",
                    self.path.display(),
                    base_name
                );
                base_name.to_string()
            }
        }
    }
}

/// Bundle name without the `.kext` extension
pub fn bundle_base_name(path: impl AsRef<Path>) -> Option<String> {
    path.as_ref()
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
}

/// Converts kext bundles and plist files to FFS files
#[derive(Debug, Clone, Default)]
pub struct KextConverter {
    builder: FfsBuilder,
    kext: KextConfig,
    defaults: DefaultsConfig,
}

impl KextConverter {
    /// Create a converter from explicit settings
    pub fn new(ffs: FfsConfig, kext: KextConfig, defaults: DefaultsConfig) -> Self {
        Self {
            builder: FfsBuilder::new(ffs),
            kext,
            defaults,
        }
    }

    /// Create a converter from a profile
    pub fn from_profile(profile: &Profile) -> Self {
        Self::new(profile.ffs, profile.kext, profile.defaults.clone())
    }

    /// File GUID for kext slot `index`
    pub fn kext_guid(&self, index: u8) -> Result<Guid> {
        if index > MAX_KEXT_INDEX {
            return Err(Error::new(
                ErrorKind::InvalidParameter,
                format!("invalid kext index {}, must be 0-{}", index, MAX_KEXT_INDEX),
            ));
        }
        self.kext.guid_template.with_index(index)
    }

    /// Convert the bundle at `bundle_path` into an FFS file
    pub fn convert_bundle(
        &self,
        bundle_path: impl AsRef<Path>,
        index: u8,
        base_name: &str,
    ) -> Result<Vec<u8>> {
        let guid = self.kext_guid(index)?;
        let bundle = KextBundle::open(bundle_path)?;
        let name = bundle.section_name(base_name);

        log::info!("Converting {} as {} ({})", bundle.path().display(), name, guid);
        self.builder.build(&bundle.ffs_body(), &guid, &name)
    }

    /// Wrap a single plist file with the well-known defaults identity
    pub fn convert_plist_only(&self, path: impl AsRef<Path>) -> Result<Vec<u8>> {
        let path = path.as_ref();
        let plist = read_file(path)?;
        log::info!(
            "Converting {} as {} ({})",
            path.display(),
            self.defaults.name,
            self.defaults.guid
        );
        self.builder
            .build(&plist, &self.defaults.guid, &self.defaults.name)
    }
}
