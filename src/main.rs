//! ffsforge - UEFI firmware file builder
//!
//! Packages macOS kext bundles and plist files as UEFI firmware file system
//! (FFS) files, and extracts or replaces the DSDT embedded in an
//! AmiBoardInfo module.
//!
//! All GUIDs, the FFS revision and the DSDT search parameters come from a
//! [`Profile`], either built in or loaded with `--profile`.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use ffsforge_core::profile::Profile;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let profile = match &cli.profile {
        Some(path) => {
            let profile = Profile::from_toml_file(path)?;
            log::info!("Loaded profile from {}", path.display());
            profile
        }
        None => Profile::default(),
    };

    match cli.command {
        Commands::Kext {
            bundle,
            index,
            name,
            output,
        } => commands::kext::cmd_kext(&profile, &bundle, index, name.as_deref(), &output),
        Commands::KextDir {
            input,
            output,
            start_index,
        } => commands::kext::cmd_kext_dir(&profile, &input, &output, start_index),
        Commands::Plist { input, output } => commands::kext::cmd_plist(&profile, &input, &output),
        Commands::DsdtExtract { input, output } => {
            commands::dsdt::cmd_extract(&profile, &input, &output)
        }
        Commands::DsdtInject {
            input,
            dsdt,
            output,
        } => commands::dsdt::cmd_inject(&profile, &input, &dsdt, &output),
        Commands::Info { input } => commands::ffs::cmd_info(&profile, &input),
    }
}
