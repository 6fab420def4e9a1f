//! vanityhunt: parallel vanity Bitcoin key search
//!
//! Architecture:
//! - `engine`: worker pool, coordinator, and the buffered result sink
//!   (the search machinery; knows nothing about cryptography)
//! - `keygen`: candidate generation (secp256k1 keys, address encoding)
//! - `pattern`: vanity predicates and exclusion lists
//! - `cli`: argument parsing shared with the binary
//!
//! The engine consumes key generation through the `CandidateGenerator`
//! trait, so tests (and other embeddings) can swap in deterministic
//! generators without touching the orchestration code.

pub mod cli;
pub mod engine;
pub mod error;
pub mod keygen;
pub mod pattern;
