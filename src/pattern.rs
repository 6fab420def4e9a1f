//! Vanity pattern matching and exclusion list loading
//!
//! A pattern is matched against the encoded address string, after the
//! fixed prelude every address of that type shares (`1`, `3`, `bc1q`).
//! Bech32 addresses are matched case-insensitively; Base58 addresses are
//! case-sensitive because the alphabet distinguishes case.
//!
//! Patterns are charset-validated at construction so an impossible
//! pattern is rejected before any worker is spawned.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use fxhash::FxHashSet;

use crate::error::{EngineError, Result};

/// Bitcoin Base58 alphabet (no 0, O, I, l)
const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Bech32 data charset (no 1, b, i, o)
const BECH32_ALPHABET: &str = "qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// Supported address types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    /// Legacy (1...)
    P2pkh,
    /// Nested SegWit (3...)
    P2sh,
    /// Native SegWit Bech32 (bc1q...)
    P2wpkh,
}

impl AddressKind {
    /// Length of the fixed prelude a vanity pattern can never influence
    pub fn prelude_len(self) -> usize {
        match self {
            Self::P2pkh | Self::P2sh => 1,
            Self::P2wpkh => 4, // "bc1q"
        }
    }

    /// Alphabet the pattern characters must come from
    fn alphabet(self) -> &'static str {
        match self {
            Self::P2pkh | Self::P2sh => BASE58_ALPHABET,
            Self::P2wpkh => BECH32_ALPHABET,
        }
    }

    /// Bech32 addresses are case-insensitive by definition
    fn case_insensitive(self) -> bool {
        matches!(self, Self::P2wpkh)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::P2pkh => "P2PKH",
            Self::P2sh => "P2SH",
            Self::P2wpkh => "P2WPKH",
        }
    }
}

/// Where in the address body the pattern must occur
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPosition {
    Prefix,
    Suffix,
    Anywhere,
}

/// Validated vanity match predicate
///
/// An empty needle accepts every address (used by plain key generation,
/// where parallel search adds no value).
#[derive(Debug, Clone)]
pub struct Pattern {
    needle: String,
    position: MatchPosition,
    kind: AddressKind,
}

impl Pattern {
    pub fn new(needle: &str, position: MatchPosition, kind: AddressKind) -> Result<Self> {
        let needle = if kind.case_insensitive() {
            needle.to_lowercase()
        } else {
            needle.to_string()
        };

        let alphabet = kind.alphabet();
        for c in needle.chars() {
            if !alphabet.contains(c) {
                return Err(EngineError::InvalidConfig(format!(
                    "pattern character '{}' is not valid in a {} address",
                    c,
                    kind.as_str()
                )));
            }
        }

        Ok(Self {
            needle,
            position,
            kind,
        })
    }

    /// Pattern that accepts every address
    pub fn accept_all(kind: AddressKind) -> Self {
        Self {
            needle: String::new(),
            position: MatchPosition::Prefix,
            kind,
        }
    }

    pub fn accepts_all(&self) -> bool {
        self.needle.is_empty()
    }

    pub fn kind(&self) -> AddressKind {
        self.kind
    }

    pub fn needle(&self) -> &str {
        &self.needle
    }

    /// Check an encoded address against the pattern
    pub fn matches(&self, address: &str) -> bool {
        if self.needle.is_empty() {
            return true;
        }

        let prelude = self.kind.prelude_len();
        if address.len() < prelude {
            return false;
        }
        let body = &address[prelude..];

        // Bech32 addresses arrive lowercase from the encoder, so the
        // lowercased needle compares directly in every mode.
        match self.position {
            MatchPosition::Prefix => body.starts_with(&self.needle),
            MatchPosition::Suffix => body.ends_with(&self.needle),
            MatchPosition::Anywhere => body.contains(&self.needle),
        }
    }
}

/// Load an exclusion list: one address per line, `#` comments allowed.
///
/// Entries are case-normalized (lowercased) so membership checks do not
/// depend on how the file was written. Uses FxHashSet for fast lookups
/// on the hot generation path.
pub fn load_exclusions<P: AsRef<Path>>(path: P) -> Result<FxHashSet<String>> {
    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);

    let mut set = FxHashSet::default();
    for line in reader.lines() {
        let line = line?;
        let entry = line.trim();
        if entry.is_empty() || entry.starts_with('#') {
            continue;
        }
        set.insert(entry.to_lowercase());
    }

    Ok(set)
}
