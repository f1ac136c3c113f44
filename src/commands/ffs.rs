//! FFS file inspection

use ffsforge_core::ffs::{FfsFile, FileState};
use ffsforge_core::fs::read_file;
use ffsforge_core::profile::Profile;
use std::path::Path;

/// Print the header and section list of an FFS file
pub fn cmd_info(profile: &Profile, input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let data = read_file(input)?;
    let file = FfsFile::parse(&data)?;
    let header = file.header();
    let ffs = &profile.ffs;

    println!("FFS File Information");
    println!("====================");
    println!();
    println!("Name:            {}", header.name);
    println!("Type:            {:#04x}", header.file_type);
    println!(
        "Size:            {} bytes ({})",
        header.size,
        super::format_size(header.size as usize)
    );
    println!("Attributes:      {:?}", header.attributes);
    println!(
        "State:           {:#04x} {:?}",
        header.state.bits(),
        header.logical_state(ffs.erase_polarity)
    );
    println!(
        "Header checksum: {:#04x} ({})",
        header.header_checksum,
        validity(header.header_checksum_valid())
    );
    println!(
        "Data checksum:   {:#04x} ({})",
        header.data_checksum,
        validity(file.data_checksum_valid(ffs.revision))
    );
    if !header
        .logical_state(ffs.erase_polarity)
        .contains(FileState::DATA_VALID)
    {
        log::warn!("File is not marked data valid");
    }

    println!();
    println!("{:<16} {:>10} {:>10}", "Section", "Offset", "Size");
    println!("{}", "-".repeat(38));
    for section in file.sections() {
        let (section, offset, _) = section?;
        println!(
            "{:<16} {:>#10x} {:>10}",
            format!("{:?}", section.section_type),
            offset,
            section.size
        );
    }

    println!();
    match file.display_name()? {
        Some(name) => println!("Display name:    {}", name),
        None => println!("Display name:    (none)"),
    }

    Ok(())
}

fn validity(ok: bool) -> &'static str {
    if ok {
        "valid"
    } else {
        "INVALID"
    }
}
