//! Search coordinator: the single owner of all cross-worker state
//!
//! Runs on its own thread, consuming the worker message stream and
//! driving the pool's restart timers and the sink's debounce from the
//! same loop. Accepted results, the registry, and the write buffer are
//! only ever touched here, so none of them needs a lock.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use once_cell::sync::Lazy;

use super::messages::{self, SearchEvent, WorkerMessage};
use super::pool::WorkerPool;
use super::sink::{FlushTicket, ResultSink};
use super::{CandidateGenerator, EngineConfig, SearchRequest, SearchStats, SearchSummary};
use crate::error::{EngineError, Result};

/// Global reference instant for lock-free elapsed-time calculation;
/// timestamps are stored as nanoseconds since this point.
static INSTANT_REFERENCE: Lazy<Instant> = Lazy::new(Instant::now);

/// State shared between the coordinator thread and its handle.
/// Atomics only: `stats()` must never contend with the hot loop.
struct EngineShared {
    interrupt: AtomicBool,
    total_generated: AtomicU64,
    matches_found: AtomicU64,
    start_nanos: AtomicU64,
}

/// Cloneable interrupt trigger, safe to hand to a signal handler
#[derive(Clone)]
pub struct SearchInterrupter {
    shared: Arc<EngineShared>,
}

impl SearchInterrupter {
    pub fn interrupt(&self) {
        self.shared.interrupt.store(true, Ordering::SeqCst);
    }
}

/// Live handle on a running search
pub struct SearchHandle {
    events: Receiver<SearchEvent>,
    shared: Arc<EngineShared>,
    thread: Option<JoinHandle<SearchSummary>>,
}

impl SearchHandle {
    /// The single progress/result event stream. Closes when the run ends.
    pub fn events(&self) -> &Receiver<SearchEvent> {
        &self.events
    }

    pub fn interrupter(&self) -> SearchInterrupter {
        SearchInterrupter {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn interrupt(&self) {
        self.shared.interrupt.store(true, Ordering::SeqCst);
    }

    /// Lock-free snapshot; callable from any thread at any frequency
    pub fn stats(&self) -> SearchStats {
        let start_nanos = self.shared.start_nanos.load(Ordering::Acquire);
        let now_nanos = Instant::now()
            .duration_since(*INSTANT_REFERENCE)
            .as_nanos() as u64;
        let elapsed_secs = now_nanos.saturating_sub(start_nanos) as f64 / 1_000_000_000.0;

        SearchStats {
            total_generated: self.shared.total_generated.load(Ordering::Relaxed),
            matches_found: self.shared.matches_found.load(Ordering::Relaxed),
            elapsed_secs,
        }
    }

    /// Wait for the run to finish and return the final summary
    pub fn join(mut self) -> Result<SearchSummary> {
        let thread = self
            .thread
            .take()
            .ok_or_else(|| EngineError::Worker("search already joined".to_string()))?;
        thread
            .join()
            .map_err(|_| EngineError::Worker("search coordinator panicked".to_string()))
    }
}

pub struct SearchCoordinator;

impl SearchCoordinator {
    /// Spawn the coordinator thread and hand back its handle.
    ///
    /// The request is validated at construction, so by the time we get
    /// here spawning cannot half-fail: either the thread starts and the
    /// full pool comes up, or nothing does.
    pub fn start(
        request: SearchRequest,
        config: EngineConfig,
        generator: Arc<dyn CandidateGenerator>,
        sink: ResultSink,
    ) -> SearchHandle {
        // Seeded here so stats() is meaningful even before the
        // coordinator thread has stored its own start time.
        let now_nanos = Instant::now()
            .duration_since(*INSTANT_REFERENCE)
            .as_nanos() as u64;
        let shared = Arc::new(EngineShared {
            interrupt: AtomicBool::new(false),
            total_generated: AtomicU64::new(0),
            matches_found: AtomicU64::new(0),
            start_nanos: AtomicU64::new(now_nanos),
        });
        let (events_tx, events_rx) = messages::event_channel();

        let thread_shared = Arc::clone(&shared);
        let thread = thread::spawn(move || {
            run_coordinator(request, config, generator, sink, thread_shared, events_tx)
        });

        SearchHandle {
            events: events_rx,
            shared,
            thread: Some(thread),
        }
    }
}

fn run_coordinator(
    request: SearchRequest,
    config: EngineConfig,
    generator: Arc<dyn CandidateGenerator>,
    mut sink: ResultSink,
    shared: Arc<EngineShared>,
    events: crossbeam_channel::Sender<SearchEvent>,
) -> SearchSummary {
    let start = Instant::now();
    let start_nanos = start.duration_since(*INSTANT_REFERENCE).as_nanos() as u64;
    shared.start_nanos.store(start_nanos, Ordering::Release);

    let target = request.target();
    let (worker_tx, worker_rx) = messages::worker_channel();
    let mut pool = WorkerPool::new(request, config.clone(), generator, worker_tx);
    pool.spawn_all();

    let mut accepted: u64 = 0;
    let mut completing = false;
    let mut interrupted = false;
    let mut pending_writes: Vec<FlushTicket> = Vec::new();

    loop {
        match worker_rx.recv_timeout(config.tick) {
            Ok(WorkerMessage::Progress {
                worker_id,
                generated,
            }) => {
                pool.record_progress(worker_id, generated);
                let total = pool.total_generated();
                shared.total_generated.store(total, Ordering::Relaxed);
                if !completing {
                    let _ = events.send(SearchEvent::Progress {
                        worker_id,
                        generated,
                        total,
                    });
                }
            }
            Ok(WorkerMessage::Found { record, .. }) => {
                // Duplicate or late results past the target are dropped;
                // completion begins exactly once.
                if !completing && accepted < target {
                    accepted += 1;
                    shared.matches_found.store(accepted, Ordering::Relaxed);
                    if let Some(ticket) = sink.push(record.clone()) {
                        pending_writes.push(ticket);
                    }
                    let _ = events.send(SearchEvent::Match { record });

                    if accepted >= target {
                        completing = true;
                        if let Err(e) = sink.force_flush_blocking() {
                            eprintln!("[✗] persistence failure on final flush: {e}");
                        }
                        pool.shutdown();
                        break;
                    }
                }
            }
            Ok(WorkerMessage::Failed { worker_id, message }) => {
                eprintln!("[!] worker {worker_id} fault: {message}; scheduling restart");
                pool.handle_failure(worker_id);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if shared.interrupt.load(Ordering::SeqCst) {
            // Interrupted run: stop reporting, flush whatever is
            // buffered so no accepted match is lost, then drain the pool.
            interrupted = true;
            completing = true;
            if let Err(e) = sink.force_flush_blocking() {
                eprintln!("[✗] persistence failure on interrupt flush: {e}");
            }
            pool.shutdown();
            break;
        }

        if let Some(ticket) = sink.tick() {
            pending_writes.push(ticket);
        }
        surface_write_failures(&mut pending_writes, false);
        pool.poll_restarts();
        for id in pool.check_liveness() {
            eprintln!("[!] worker {id} exited unexpectedly; scheduling restart");
        }
    }

    // Workers send one last cumulative report as they stop; fold the
    // remaining queued messages in so the summary reflects them.
    for msg in worker_rx.try_iter() {
        if let WorkerMessage::Progress {
            worker_id,
            generated,
        } = msg
        {
            pool.record_progress(worker_id, generated);
        }
    }

    surface_write_failures(&mut pending_writes, true);
    sink.close();

    let total = pool.total_generated();
    shared.total_generated.store(total, Ordering::Relaxed);

    SearchSummary {
        total_generated: total,
        matches_found: accepted,
        elapsed_secs: start.elapsed().as_secs_f64(),
        completed: !interrupted && accepted >= target,
    }
}

/// Report failed flushes without retrying them: ordering is preserved,
/// the failure is surfaced, and the queue has already moved on.
fn surface_write_failures(pending: &mut Vec<FlushTicket>, block: bool) {
    pending.retain(|ticket| {
        let outcome = if block {
            ticket.recv().map_err(|_| TryRecvError::Disconnected)
        } else {
            ticket.try_recv()
        };
        match outcome {
            Ok(Err(e)) => {
                eprintln!("[✗] persistence failure: {e}");
                false
            }
            Ok(Ok(())) => false,
            Err(TryRecvError::Empty) => true,
            Err(TryRecvError::Disconnected) => false,
        }
    });
}
