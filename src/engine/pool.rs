//! Worker pool: spawn, monitor, restart, drain
//!
//! The pool owns the id -> handle registry and is only ever touched from
//! the coordinator thread; workers never see each other's handles.
//! A failed worker slot is restarted with the same id after a fixed
//! backoff, with no cap on attempts. Shutdown waits a bounded time per
//! worker and detaches stragglers rather than hanging.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;

use super::messages::WorkerMessage;
use super::worker::{run_worker, WorkerContext};
use super::{CandidateGenerator, EngineConfig, SearchRequest};

/// Per-slot lifecycle: Starting -> Running -> {Stopping -> Stopped |
/// Restarting -> Starting}. Stopped is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    Starting,
    Running,
    Restarting,
    Stopping,
    Stopped,
}

/// Registry entry for one worker slot
pub struct WorkerHandle {
    pub id: usize,
    pub status: WorkerStatus,
    /// Last reported cumulative generated count
    pub generated: u64,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

struct PendingRestart {
    id: usize,
    due: Instant,
}

pub struct WorkerPool {
    request: SearchRequest,
    config: EngineConfig,
    generator: Arc<dyn CandidateGenerator>,
    tx: Sender<WorkerMessage>,
    registry: HashMap<usize, WorkerHandle>,
    pending_restarts: Vec<PendingRestart>,
    /// Counts carried over from retired (failed) handles so the grand
    /// total never moves backwards across a restart.
    retired_generated: u64,
    shutting_down: bool,
}

impl WorkerPool {
    pub fn new(
        request: SearchRequest,
        config: EngineConfig,
        generator: Arc<dyn CandidateGenerator>,
        tx: Sender<WorkerMessage>,
    ) -> Self {
        Self {
            request,
            config,
            generator,
            tx,
            registry: HashMap::new(),
            pending_restarts: Vec::new(),
            retired_generated: 0,
            shutting_down: false,
        }
    }

    /// Spawn the full complement of workers
    pub fn spawn_all(&mut self) {
        for id in 0..self.request.threads() {
            self.spawn_worker(id);
        }
    }

    fn spawn_worker(&mut self, id: usize) {
        let stop = Arc::new(AtomicBool::new(false));
        let ctx = WorkerContext::from_request(
            id,
            &self.request,
            &self.config,
            Arc::clone(&self.generator),
            Arc::clone(&stop),
            self.tx.clone(),
        );

        let thread = thread::spawn(move || run_worker(ctx));
        self.registry.insert(
            id,
            WorkerHandle {
                id,
                status: WorkerStatus::Starting,
                generated: 0,
                stop,
                thread: Some(thread),
            },
        );
    }

    /// Record a cumulative progress report (overwrite, not add)
    pub fn record_progress(&mut self, id: usize, generated: u64) {
        if let Some(handle) = self.registry.get_mut(&id) {
            if handle.status == WorkerStatus::Starting {
                handle.status = WorkerStatus::Running;
            }
            handle.generated = generated;
        }
    }

    /// Grand total: retired counts plus every tracked worker's last
    /// report. Recomputed on demand, never cached.
    pub fn total_generated(&self) -> u64 {
        self.retired_generated + self.registry.values().map(|h| h.generated).sum::<u64>()
    }

    /// Retire a failed slot and schedule a same-id replacement after the
    /// fixed backoff. No-op once shutdown has begun.
    pub fn handle_failure(&mut self, id: usize) {
        if self.shutting_down {
            return;
        }
        let Some(mut handle) = self.registry.remove(&id) else {
            return;
        };

        handle.status = WorkerStatus::Restarting;
        self.retired_generated += handle.generated;
        // A retired slot must never keep generating behind our back.
        handle.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = handle.thread.take() {
            // The thread exits right after reporting the fault; reap it
            // if it is already done, otherwise let it finish detached.
            if thread.is_finished() {
                let _ = thread.join();
            }
        }

        self.pending_restarts.push(PendingRestart {
            id,
            due: Instant::now() + self.config.restart_backoff,
        });
    }

    /// Restart every slot whose backoff has elapsed
    pub fn poll_restarts(&mut self) {
        if self.shutting_down || self.pending_restarts.is_empty() {
            return;
        }
        let now = Instant::now();
        let due: Vec<usize> = self
            .pending_restarts
            .iter()
            .filter(|p| now >= p.due)
            .map(|p| p.id)
            .collect();
        if due.is_empty() {
            return;
        }
        self.pending_restarts.retain(|p| now < p.due);
        for id in due {
            self.spawn_worker(id);
        }
    }

    /// Catch workers whose thread died without a `Failed` message.
    /// A clean exit sets its own stop flag first and is left alone.
    pub fn check_liveness(&mut self) -> Vec<usize> {
        if self.shutting_down {
            return Vec::new();
        }
        let dead: Vec<usize> = self
            .registry
            .values()
            .filter(|h| {
                h.thread.as_ref().is_some_and(|t| t.is_finished())
                    && !h.stop.load(Ordering::Relaxed)
            })
            .map(|h| h.id)
            .collect();
        for id in &dead {
            self.handle_failure(*id);
        }
        dead
    }

    /// Idempotent graceful shutdown: signal every live worker, wait a
    /// bounded time for each, detach the ones that will not stop. No new
    /// workers are created once this has begun.
    pub fn shutdown(&mut self) {
        if self.shutting_down {
            return;
        }
        self.shutting_down = true;
        self.pending_restarts.clear();

        for handle in self.registry.values_mut() {
            handle.status = WorkerStatus::Stopping;
            handle.stop.store(true, Ordering::Relaxed);
        }

        // Handles stay in the registry (marked Stopped) so their counts
        // keep contributing to the grand total after the drain.
        let timeout = self.config.shutdown_timeout;
        for (id, handle) in self.registry.iter_mut() {
            if let Some(thread) = handle.thread.take() {
                let deadline = Instant::now() + timeout;
                while !thread.is_finished() && Instant::now() < deadline {
                    thread::sleep(Duration::from_millis(5));
                }
                if thread.is_finished() {
                    let _ = thread.join();
                } else {
                    // Threads cannot be force-killed; detaching keeps the
                    // shutdown bounded. Logged, not escalated.
                    eprintln!("[!] worker {id} did not stop within {timeout:?}; detaching");
                }
            }
            handle.status = WorkerStatus::Stopped;
        }
    }

    /// Workers that have not reached the terminal state
    pub fn worker_count(&self) -> usize {
        self.registry
            .values()
            .filter(|h| h.status != WorkerStatus::Stopped)
            .count()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down
    }

    pub fn status_of(&self, id: usize) -> Option<WorkerStatus> {
        self.registry.get(&id).map(|h| h.status)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
