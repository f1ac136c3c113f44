//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u8
fn parse_hex_u8(s: &str) -> Result<u8, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u8>().map_err(|e| format!("Invalid number: {}", e))
    }
}

#[derive(Parser)]
#[command(name = "ffsforge")]
#[command(author, version, about = "UEFI FFS file builder and DSDT patcher", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Profile overriding GUIDs, FFS revision and DSDT layout (TOML format)
    #[arg(long, global = true)]
    pub profile: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a kext bundle to an FFS file
    Kext {
        /// Kext bundle directory (e.g. FakeSMC.kext)
        #[arg(short, long)]
        bundle: PathBuf,

        /// Kext index, 0-15 (hex or decimal)
        #[arg(long, value_parser = parse_hex_u8)]
        index: u8,

        /// Base display name (defaults to the bundle name without .kext)
        #[arg(short, long)]
        name: Option<String>,

        /// Output FFS file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Convert every kext bundle in a directory
    KextDir {
        /// Directory containing *.kext bundles
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory for the .ffs files
        #[arg(short, long)]
        output: PathBuf,

        /// Index assigned to the first bundle
        #[arg(long, default_value = "0", value_parser = parse_hex_u8)]
        start_index: u8,
    },

    /// Wrap a defaults plist in an FFS file
    Plist {
        /// Input plist file
        #[arg(short, long)]
        input: PathBuf,

        /// Output FFS file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Extract the DSDT from an AmiBoardInfo module
    DsdtExtract {
        /// AmiBoardInfo PE module
        #[arg(short, long)]
        input: PathBuf,

        /// Output DSDT table
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Replace the DSDT inside an AmiBoardInfo module
    DsdtInject {
        /// AmiBoardInfo PE module
        #[arg(short, long)]
        input: PathBuf,

        /// Replacement DSDT table
        #[arg(short, long)]
        dsdt: PathBuf,

        /// Output module
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show the header and sections of an FFS file
    Info {
        /// Input FFS file
        #[arg(short, long)]
        input: PathBuf,
    },
}
