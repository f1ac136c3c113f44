//! CLI command implementations
//!
//! Each command loads its inputs, calls into `ffsforge-core` with the active
//! profile and writes the result. Library errors are returned unchanged so
//! `main` reports them with their kind and detail.

pub mod dsdt;
pub mod ffs;
pub mod kext;

/// Human-readable size
fn format_size(bytes: usize) -> String {
    if bytes >= 1024 * 1024 {
        format!("{} MiB", bytes / (1024 * 1024))
    } else if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}
