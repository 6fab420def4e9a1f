//! Candidate generation: random secp256k1 keys with encoded addresses
//!
//! The engine consumes this through the `CandidateGenerator` trait and
//! never sees any of the cryptography. Keys come from OS entropy via
//! `rand::thread_rng()` (backed by getrandom); the public key is
//! compressed SEC1, hashed with HASH160, and encoded per address type:
//!
//! - P2PKH: Base58Check(0x00 || HASH160(pubkey))
//! - P2SH:  Base58Check(0x05 || HASH160(OP_0 PUSH20 <pubkey_hash>))
//! - P2WPKH: bech32(bc, 0, pubkey_hash)

use bech32::{ToBase32, Variant};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::SecretKey;
use rand::RngCore;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::engine::{Candidate, CandidateGenerator, SecretFormat};
use crate::pattern::{AddressKind, Pattern};

/// Generates random key candidates and evaluates the vanity predicate
pub struct VanityGenerator {
    kind: AddressKind,
    pattern: Pattern,
}

impl VanityGenerator {
    pub fn new(pattern: Pattern) -> Self {
        Self {
            kind: pattern.kind(),
            pattern,
        }
    }
}

impl CandidateGenerator for VanityGenerator {
    fn candidate(&self) -> Candidate {
        let mut rng = rand::thread_rng();
        loop {
            let mut key = [0u8; 32];
            rng.fill_bytes(&mut key);

            // Rejection sampling: zero and values >= the curve order are
            // invalid keys (roughly 1 in 2^128, but still checked).
            let Ok(secret) = SecretKey::from_slice(&key) else {
                continue;
            };

            let point = secret.public_key().to_encoded_point(true);
            let pubkey_hash = hash160(point.as_bytes());
            let address = encode_address(self.kind, &pubkey_hash);
            return Candidate { address, key };
        }
    }

    fn matches(&self, address: &str) -> bool {
        self.pattern.matches(address)
    }

    fn render_secret(&self, key: &[u8; 32], format: SecretFormat) -> String {
        match format {
            SecretFormat::Wif => to_wif(key),
            SecretFormat::Hex => hex::encode(key),
        }
    }
}

/// HASH160 = RIPEMD160(SHA256(data))
pub fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(Sha256::digest(data)).into()
}

fn double_sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(Sha256::digest(data)).into()
}

/// Encode a 20-byte pubkey hash as an address of the requested type
pub fn encode_address(kind: AddressKind, pubkey_hash: &[u8; 20]) -> String {
    match kind {
        AddressKind::P2pkh => base58check(0x00, pubkey_hash),
        AddressKind::P2sh => base58check(0x05, &p2sh_script_hash(pubkey_hash)),
        AddressKind::P2wpkh => encode_p2wpkh(pubkey_hash),
    }
}

/// P2SH witness script: OP_0 PUSH20 <pubkey_hash>
fn p2sh_script_hash(pubkey_hash: &[u8; 20]) -> [u8; 20] {
    let mut script = [0u8; 22];
    script[0] = 0x00; // OP_0
    script[1] = 0x14; // PUSH 20
    script[2..22].copy_from_slice(pubkey_hash);
    hash160(&script)
}

fn base58check(version: u8, payload: &[u8; 20]) -> String {
    let mut data = Vec::with_capacity(25);
    data.push(version);
    data.extend_from_slice(payload);

    let checksum = double_sha256(&data);
    data.extend_from_slice(&checksum[..4]);

    bs58::encode(data).into_string()
}

fn encode_p2wpkh(pubkey_hash: &[u8; 20]) -> String {
    // Witness version 0 + pubkey hash in base32
    let mut data = vec![bech32::u5::try_from_u8(0).unwrap()];
    data.extend(pubkey_hash.to_base32());

    bech32::encode("bc", data, Variant::Bech32).unwrap_or_default()
}

/// Private key to WIF (compressed)
pub fn to_wif(key: &[u8; 32]) -> String {
    let mut data = Vec::with_capacity(38);
    data.push(0x80);
    data.extend_from_slice(key);
    data.push(0x01); // compressed

    let checksum = double_sha256(&data);
    data.extend_from_slice(&checksum[..4]);

    bs58::encode(data).into_string()
}
