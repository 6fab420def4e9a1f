//! Shared test fixtures: deterministic generators and fast configs

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use fxhash::FxHashSet;
use vanityhunt::engine::{
    Candidate, CandidateGenerator, EngineConfig, SearchRequest, SecretFormat,
};
use vanityhunt::pattern::{AddressKind, MatchPosition, Pattern};

/// Deterministic generator producing addresses `1t0`, `1t1`, ...
///
/// `accept_every` controls the predicate: 0 accepts nothing, 1 accepts
/// everything, k accepts every k-th candidate. `fault_once` makes the
/// first `candidate()` call panic, exercising the restart path.
pub struct DeterministicGenerator {
    counter: AtomicUsize,
    accept_every: usize,
    fault_once: AtomicBool,
}

impl DeterministicGenerator {
    pub fn new(accept_every: usize) -> Self {
        Self {
            counter: AtomicUsize::new(0),
            accept_every,
            fault_once: AtomicBool::new(false),
        }
    }

    pub fn with_fault_once(accept_every: usize) -> Self {
        let generator = Self::new(accept_every);
        generator.fault_once.store(true, Ordering::SeqCst);
        generator
    }
}

impl CandidateGenerator for DeterministicGenerator {
    fn candidate(&self) -> Candidate {
        if self.fault_once.swap(false, Ordering::SeqCst) {
            panic!("injected generation fault");
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let mut key = [0u8; 32];
        key[..8].copy_from_slice(&(n as u64).to_le_bytes());
        Candidate {
            address: format!("1t{n}"),
            key,
        }
    }

    fn matches(&self, address: &str) -> bool {
        match self.accept_every {
            0 => false,
            1 => true,
            k => address[2..]
                .parse::<usize>()
                .map(|n| n % k == 0)
                .unwrap_or(false),
        }
    }

    fn render_secret(&self, key: &[u8; 32], _format: SecretFormat) -> String {
        hex::encode(key)
    }
}

/// Tight timings so lifecycle tests run in tens of milliseconds
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        batch_size: 16,
        progress_interval: Duration::from_millis(10),
        restart_backoff: Duration::from_millis(50),
        shutdown_timeout: Duration::from_secs(2),
        tick: Duration::from_millis(5),
        flush_threshold: 64,
        flush_debounce: Duration::from_millis(25),
    }
}

pub fn accept_all_request(target: u64) -> SearchRequest {
    SearchRequest::new(
        Pattern::accept_all(AddressKind::P2pkh),
        target,
        1,
        FxHashSet::default(),
        SecretFormat::Hex,
    )
    .unwrap()
}

/// A conditional request: the engine-side pattern only matters for the
/// accept-all normalization, so any non-empty pattern does here; the
/// deterministic generator owns the real predicate.
pub fn conditional_request(target: u64, threads: usize) -> SearchRequest {
    SearchRequest::new(
        Pattern::new("z", MatchPosition::Prefix, AddressKind::P2pkh).unwrap(),
        target,
        threads,
        FxHashSet::default(),
        SecretFormat::Hex,
    )
    .unwrap()
}
