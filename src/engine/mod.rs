//! Parallel vanity search engine
//!
//! The engine owns no cryptography: candidates come from an injected
//! [`CandidateGenerator`], and everything downstream of generation is
//! message passing between three kinds of threads:
//!
//! - N search workers running the generate-check-emit loop
//! - one coordinator aggregating progress and deciding completion
//! - one sink writer serializing durable writes
//!
//! All shared state (worker registry, accepted list, write buffer) lives
//! in the coordinator thread, so none of it needs locks.

mod coordinator;
mod messages;
mod pool;
mod sink;
mod worker;

pub use coordinator::{SearchCoordinator, SearchHandle, SearchInterrupter};
pub use messages::SearchEvent;
pub use pool::WorkerStatus;
pub use sink::{write_atomic, FlushTicket, ResultSink, SaveCallback};

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use fxhash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::pattern::Pattern;

/// Which secret representation a matched record carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretFormat {
    /// Wallet Import Format (the raw representation wallets expect)
    Wif,
    /// Bare hex-encoded key bytes
    Hex,
}

/// One generated candidate: the public identifier plus raw key bytes.
///
/// The key bytes are opaque to the engine; only the generator knows how
/// to turn them into a displayable secret.
#[derive(Clone)]
pub struct Candidate {
    pub address: String,
    pub key: [u8; 32],
}

/// Candidate generation capability, injected by the embedding layer.
///
/// Implementations must be pure and stateless: workers on different
/// threads share one instance through an `Arc`.
pub trait CandidateGenerator: Send + Sync {
    /// Generate one candidate
    fn candidate(&self) -> Candidate;

    /// Evaluate the match predicate against an identifier
    fn matches(&self, address: &str) -> bool;

    /// Render the secret in the requested representation
    fn render_secret(&self, key: &[u8; 32], format: SecretFormat) -> String;
}

/// A matched record as persisted and reported to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub address: String,
    pub secret: String,
    pub found_at: DateTime<Utc>,
}

impl ResultRecord {
    pub fn new(address: String, secret: String) -> Self {
        Self {
            address,
            secret,
            found_at: Utc::now(),
        }
    }
}

/// Immutable search configuration, validated before anything spawns
#[derive(Clone)]
pub struct SearchRequest {
    pattern: Pattern,
    target: u64,
    threads: usize,
    exclusions: Arc<FxHashSet<String>>,
    secret_format: SecretFormat,
}

impl SearchRequest {
    /// Validate and normalize a request.
    ///
    /// Rejects a zero target or thread count up front so no partial pool
    /// is ever created. An accept-all pattern is forced down to a single
    /// thread: parallelism adds nothing when every candidate matches.
    pub fn new(
        pattern: Pattern,
        target: u64,
        threads: usize,
        exclusions: FxHashSet<String>,
        secret_format: SecretFormat,
    ) -> Result<Self> {
        if target == 0 {
            return Err(EngineError::InvalidConfig(
                "target match count must be positive".to_string(),
            ));
        }
        if threads == 0 {
            return Err(EngineError::InvalidConfig(
                "thread count must be positive".to_string(),
            ));
        }

        let threads = if pattern.accepts_all() { 1 } else { threads };

        Ok(Self {
            pattern,
            target,
            threads,
            exclusions: Arc::new(exclusions),
            secret_format,
        })
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn target(&self) -> u64 {
        self.target
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn exclusions(&self) -> &Arc<FxHashSet<String>> {
        &self.exclusions
    }

    pub fn secret_format(&self) -> SecretFormat {
        self.secret_format
    }
}

/// Engine tunables with production defaults
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Candidates processed between stop-flag checks
    pub batch_size: usize,
    /// Interval between per-worker progress reports
    pub progress_interval: Duration,
    /// Delay before a failed worker slot is restarted
    pub restart_backoff: Duration,
    /// Bounded wait for a worker to exit before it is detached
    pub shutdown_timeout: Duration,
    /// Coordinator wake-up granularity (debounce/restart timers)
    pub tick: Duration,
    /// Buffered records that force an immediate flush
    pub flush_threshold: usize,
    /// Idle period after the last buffered record before a flush fires
    pub flush_debounce: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            progress_interval: Duration::from_secs(1),
            restart_backoff: Duration::from_secs(1),
            shutdown_timeout: Duration::from_secs(5),
            tick: Duration::from_millis(50),
            flush_threshold: 8,
            flush_debounce: Duration::from_millis(500),
        }
    }
}

/// Point-in-time view of a running search
#[derive(Debug, Clone, Default)]
pub struct SearchStats {
    pub total_generated: u64,
    pub matches_found: u64,
    pub elapsed_secs: f64,
}

impl SearchStats {
    pub fn keys_per_second(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.total_generated as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }
}

/// Final outcome of a search run
#[derive(Debug, Clone)]
pub struct SearchSummary {
    pub total_generated: u64,
    pub matches_found: u64,
    pub elapsed_secs: f64,
    /// False when the run was interrupted before reaching the target
    pub completed: bool,
}

impl SearchSummary {
    pub fn keys_per_second(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.total_generated as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }
}
