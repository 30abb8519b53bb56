//! CLI argument parsing

use crate::programmers;
use clap::{Parser, Subcommand};

/// Parse a string as a hex or decimal u8
fn parse_hex_u8(s: &str) -> Result<u8, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u8>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Generate dynamic help text for the programmer argument
fn programmer_help() -> String {
    format!(
        "Programmer to use [available: {}]",
        programmers::programmer_names_short()
    )
}

#[derive(Parser)]
#[command(name = "spixfer")]
#[command(author, version, about = "Chunked SPI transfers", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Bus options shared across transfer commands
#[derive(clap::Args, Debug, Clone)]
pub struct BusArgs {
    /// Programmer to use
    #[arg(short, long, help = programmer_help())]
    pub programmer: String,

    /// Register address sent ahead of the data (hex with 0x prefix, or decimal)
    #[arg(short, long, value_parser = parse_hex_u8)]
    pub reg: Option<u8>,

    /// Maximum bytes per native transfer (0 = default)
    #[arg(long)]
    pub chunk: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write bytes to the device
    Write {
        #[command(flatten)]
        bus: BusArgs,

        /// Data as hex bytes (e.g. "de ad be ef" or "0xdeadbeef")
        #[arg(required = true)]
        data: Vec<String>,
    },

    /// Read bytes from the device
    Read {
        #[command(flatten)]
        bus: BusArgs,

        /// Number of bytes to read
        #[arg(short, long)]
        len: usize,
    },

    /// Full-duplex write and read
    Transfer {
        #[command(flatten)]
        bus: BusArgs,

        /// Number of bytes to read (defaults to the write length)
        #[arg(short, long)]
        len: Option<usize>,

        /// Data as hex bytes; shorter than --len is padded with zeros
        #[arg(required = true)]
        data: Vec<String>,
    },

    /// List available programmers
    ListProgrammers,
}
