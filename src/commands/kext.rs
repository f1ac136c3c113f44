//! Kext and plist conversion commands

use ffsforge_core::fs::{create_dir, write_file};
use ffsforge_core::kext::{bundle_base_name, KextConverter};
use ffsforge_core::profile::Profile;
use ffsforge_core::ErrorKind;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};

/// Convert one kext bundle
pub fn cmd_kext(
    profile: &Profile,
    bundle: &Path,
    index: u8,
    name: Option<&str>,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let base_name = match name {
        Some(name) => name.to_string(),
        None => bundle_base_name(bundle)
            .ok_or_else(|| format!("Cannot derive a name from {}", bundle.display()))?,
    };

    let converter = KextConverter::from_profile(profile);
    let file = converter.convert_bundle(bundle, index, &base_name)?;
    write_file(output, &file)?;

    println!(
        "Wrote {} ({}) to {}",
        base_name,
        super::format_size(file.len()),
        output.display()
    );
    Ok(())
}

/// Convert every `*.kext` bundle under `input`, one file per bundle
///
/// Bundles get consecutive indices starting at `start_index`. A failing
/// bundle is reported and skipped; the command fails once all bundles have
/// been tried.
pub fn cmd_kext_dir(
    profile: &Profile,
    input: &Path,
    output: &Path,
    start_index: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    match create_dir(output) {
        Ok(()) => log::debug!("Created {}", output.display()),
        Err(e) if e.kind() == ErrorKind::DirectoryAlreadyExists => {
            log::info!("Output directory {} already exists", output.display());
        }
        Err(e) => return Err(e.into()),
    }

    let bundles = find_kext_bundles(input)?;
    if bundles.is_empty() {
        log::warn!("No kext bundles found in {}", input.display());
        return Ok(());
    }
    log::info!("Found {} kext bundles in {}", bundles.len(), input.display());

    let converter = KextConverter::from_profile(profile);
    let pb = ProgressBar::new(bundles.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut failed = Vec::new();
    for (i, bundle) in bundles.iter().enumerate() {
        let base_name = bundle_base_name(bundle).unwrap_or_default();
        pb.set_message(base_name.clone());

        // Indices past u8 range are rejected by the converter like any index > 15
        let index = u8::try_from(start_index as usize + i).unwrap_or(u8::MAX);
        let out_path = output.join(format!("{}.ffs", base_name));

        let result = converter
            .convert_bundle(bundle, index, &base_name)
            .and_then(|file| write_file(&out_path, &file));
        if let Err(e) = result {
            pb.suspend(|| log::error!("{}: {}", bundle.display(), e));
            failed.push(base_name);
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");

    let converted = bundles.len() - failed.len();
    println!("Converted {} of {} kexts", converted, bundles.len());

    if failed.is_empty() {
        Ok(())
    } else {
        Err(format!("Failed to convert: {}", failed.join(", ")).into())
    }
}

/// Wrap a defaults plist
pub fn cmd_plist(
    profile: &Profile,
    input: &Path,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let converter = KextConverter::from_profile(profile);
    let file = converter.convert_plist_only(input)?;
    write_file(output, &file)?;

    println!(
        "Wrote {} ({}) to {}",
        profile.defaults.name,
        super::format_size(file.len()),
        output.display()
    );
    Ok(())
}

/// `*.kext` directories directly under `dir`, sorted by path
fn find_kext_bundles(dir: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut bundles = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_kext = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("kext"));
        if is_kext && path.is_dir() {
            bundles.push(path);
        }
    }
    bundles.sort();
    Ok(bundles)
}
