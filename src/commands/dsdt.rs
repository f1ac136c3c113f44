//! DSDT extraction and injection commands

use ffsforge_core::dsdt;
use ffsforge_core::fs::{read_file, write_file};
use ffsforge_core::profile::Profile;
use std::path::Path;

/// Copy the DSDT out of an AmiBoardInfo module
pub fn cmd_extract(
    profile: &Profile,
    input: &Path,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let module = read_file(input)?;
    let (location, table) = dsdt::locate_and_extract(&module, &profile.dsdt)?;
    write_file(output, table)?;

    println!(
        "DSDT at {:#x}, {} bytes ({}), saved to {}",
        location.offset,
        location.size,
        super::format_size(location.size),
        output.display()
    );
    Ok(())
}

/// Replace the DSDT inside an AmiBoardInfo module
pub fn cmd_inject(
    profile: &Profile,
    input: &Path,
    table: &Path,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let module = read_file(input)?;
    let new_table = read_file(table)?;

    let location = dsdt::locate(&module, &profile.dsdt)?;
    log::info!(
        "Replacing {} byte DSDT at {:#x} with {} bytes",
        location.size,
        location.offset,
        new_table.len()
    );

    let patched = dsdt::replace(&module, &new_table, &profile.dsdt)?;
    write_file(output, &patched)?;

    println!(
        "Patched module ({}) saved to {}",
        super::format_size(patched.len()),
        output.display()
    );
    Ok(())
}
