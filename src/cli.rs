//! Command-line argument parsing
//!
//! Thin layer over clap: the flags here map one-to-one onto the engine's
//! `SearchRequest` fields plus the output path the save callback uses.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::engine::SecretFormat;
use crate::pattern::{AddressKind, MatchPosition};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Parallel vanity Bitcoin address search", long_about = None)]
pub struct Args {
    /// Vanity pattern to search for (empty accepts every address)
    #[arg(short = 'p', long = "pattern", default_value = "")]
    pub pattern: String,

    /// Where the pattern must occur in the address body
    #[arg(long, value_enum, default_value_t = CliPosition::Prefix)]
    pub position: CliPosition,

    /// Address type to generate and match against
    #[arg(short = 'a', long = "address-type", value_enum, default_value_t = CliAddressKind::P2wpkh)]
    pub address_type: CliAddressKind,

    /// Number of matches to find before stopping
    #[arg(short = 'n', long = "count", default_value_t = 1)]
    pub count: u64,

    /// Number of search threads (default: all cores)
    #[arg(short = 't', long = "threads", value_name = "N")]
    pub threads: Option<usize>,

    /// File of addresses to skip, one per line (# comments allowed)
    #[arg(long = "exclude", value_name = "FILE")]
    pub exclude: Option<PathBuf>,

    /// Secret representation written for matched keys
    #[arg(long = "secret-format", value_enum, default_value_t = CliSecretFormat::Wif)]
    pub secret_format: CliSecretFormat,

    /// Output file for matched records (JSON)
    #[arg(short = 'o', long = "output", default_value = "matches.json")]
    pub output: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliPosition {
    Prefix,
    Suffix,
    Anywhere,
}

impl From<CliPosition> for MatchPosition {
    fn from(position: CliPosition) -> Self {
        match position {
            CliPosition::Prefix => MatchPosition::Prefix,
            CliPosition::Suffix => MatchPosition::Suffix,
            CliPosition::Anywhere => MatchPosition::Anywhere,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliAddressKind {
    P2pkh,
    P2sh,
    P2wpkh,
}

impl From<CliAddressKind> for AddressKind {
    fn from(kind: CliAddressKind) -> Self {
        match kind {
            CliAddressKind::P2pkh => AddressKind::P2pkh,
            CliAddressKind::P2sh => AddressKind::P2sh,
            CliAddressKind::P2wpkh => AddressKind::P2wpkh,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliSecretFormat {
    Wif,
    Hex,
}

impl From<CliSecretFormat> for SecretFormat {
    fn from(format: CliSecretFormat) -> Self {
        match format {
            CliSecretFormat::Wif => SecretFormat::Wif,
            CliSecretFormat::Hex => SecretFormat::Hex,
        }
    }
}

/// Format number with thousands separator
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    let chars: Vec<char> = s.chars().collect();

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }

    result
}
