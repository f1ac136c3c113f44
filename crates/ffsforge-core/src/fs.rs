//! File and directory helpers
//!
//! Thin wrappers over `std::fs` that translate I/O failures into the
//! crate's error kinds, so callers see "file not found" distinctly from
//! "could not open".

use std::format;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::vec::Vec;

use crate::error::{Error, ErrorKind, Result};

/// Read a whole file
pub fn read_file(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::new(
            ErrorKind::FileNotFound,
            format!("{}", path.display()),
        ));
    }
    fs::read(path).map_err(|e| {
        let kind = match e.kind() {
            io::ErrorKind::NotFound => ErrorKind::FileNotFound,
            _ => ErrorKind::FileOpenFailed,
        };
        Error::new(kind, format!("{}: {}", path.display(), e))
    })
}

/// Write `data` to a file, replacing any existing content
pub fn write_file(path: impl AsRef<Path>, data: &[u8]) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        log::warn!("{} already exists, overwriting it", path.display());
    }

    let mut file = fs::File::create(path).map_err(|e| {
        Error::new(
            ErrorKind::FileOpenFailed,
            format!("{}: {}", path.display(), e),
        )
    })?;
    file.write_all(data)
        .and_then(|()| file.flush())
        .map_err(|e| {
            Error::new(
                ErrorKind::FileWriteFailed,
                format!("{}: {}", path.display(), e),
            )
        })?;

    log::debug!("Wrote {} bytes to {}", data.len(), path.display());
    Ok(())
}

/// Create a directory and any missing parents
///
/// Fails with [`ErrorKind::DirectoryAlreadyExists`] if it is already there.
pub fn create_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.is_dir() {
        return Err(Error::new(
            ErrorKind::DirectoryAlreadyExists,
            format!("{}", path.display()),
        ));
    }
    fs::create_dir_all(path).map_err(|e| {
        Error::new(
            ErrorKind::DirectoryCreateFailed,
            format!("{}: {}", path.display(), e),
        )
    })
}

/// Whether `path` exists
pub fn file_exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().exists()
}

/// Whether `path` is an existing regular file
pub fn is_file(path: impl AsRef<Path>) -> bool {
    path.as_ref().is_file()
}

/// Whether `path` is an existing directory
pub fn dir_exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().is_dir()
}

#[cfg(test)]
pub(crate) mod test_util {
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    /// Directory under the system temp dir, removed on drop
    pub struct ScratchDir(PathBuf);

    impl ScratchDir {
        pub fn new(tag: &str) -> Self {
            let n = COUNTER.fetch_add(1, Ordering::SeqCst);
            let path = std::env::temp_dir().join(format!(
                "ffsforge-{}-{}-{}",
                tag,
                std::process::id(),
                n
            ));
            let _ = std::fs::remove_dir_all(&path);
            std::fs::create_dir_all(&path).unwrap();
            Self(path)
        }

        pub fn path(&self) -> &Path {
            &self.0
        }
    }

    impl Drop for ScratchDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_util::ScratchDir;
    use super::*;

    #[test]
    fn test_read_missing_file() {
        let dir = ScratchDir::new("fs-read");
        let err = read_file(dir.path().join("nope.bin")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
    }

    #[test]
    fn test_write_then_read() {
        let dir = ScratchDir::new("fs-write");
        let path = dir.path().join("out.ffs");
        write_file(&path, b"first").unwrap();
        write_file(&path, b"second").unwrap();
        assert_eq!(read_file(&path).unwrap(), b"second");
        assert!(file_exists(&path));
        assert!(is_file(&path));
        assert!(!is_file(dir.path()));
    }

    #[test]
    fn test_write_into_missing_dir() {
        let dir = ScratchDir::new("fs-write-missing");
        let err = write_file(dir.path().join("no/such/dir/out.ffs"), b"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileOpenFailed);
    }

    #[test]
    fn test_create_dir() {
        let dir = ScratchDir::new("fs-mkdir");
        let sub = dir.path().join("a/b");
        assert!(!dir_exists(&sub));
        create_dir(&sub).unwrap();
        assert!(dir_exists(&sub));
        let err = create_dir(&sub).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DirectoryAlreadyExists);
    }
}
