//! Search worker: the generate-check-emit loop
//!
//! Each worker owns nothing but its context: the shared generator, the
//! exclusion set, a stop flag, and the sender half of the coordinator
//! channel. Cancellation is cooperative and only observed at batch
//! boundaries, which bounds shutdown latency to one batch of compute.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::Sender;
use fxhash::FxHashSet;

use super::messages::WorkerMessage;
use super::{CandidateGenerator, EngineConfig, ResultRecord, SearchRequest, SecretFormat};

/// Everything a worker thread needs, moved in at spawn time
pub struct WorkerContext {
    pub id: usize,
    pub generator: Arc<dyn CandidateGenerator>,
    pub exclusions: Arc<FxHashSet<String>>,
    pub secret_format: SecretFormat,
    pub batch_size: usize,
    pub progress_interval: std::time::Duration,
    /// In accept-all mode the worker stops itself after emitting its
    /// share of the target; conditional searches run until told to stop.
    pub match_quota: Option<u64>,
    pub stop: Arc<AtomicBool>,
    pub tx: Sender<WorkerMessage>,
}

impl WorkerContext {
    pub fn from_request(
        id: usize,
        request: &SearchRequest,
        config: &EngineConfig,
        generator: Arc<dyn CandidateGenerator>,
        stop: Arc<AtomicBool>,
        tx: Sender<WorkerMessage>,
    ) -> Self {
        let match_quota = if request.pattern().accepts_all() {
            // Single worker in this mode, so its share is the whole target.
            Some(request.target())
        } else {
            None
        };

        Self {
            id,
            generator,
            exclusions: Arc::clone(request.exclusions()),
            secret_format: request.secret_format(),
            batch_size: config.batch_size,
            progress_interval: config.progress_interval,
            match_quota,
            stop,
            tx,
        }
    }
}

/// Thread entry point: run the loop, converting a panic into a
/// `Failed` message so the pool (not the worker) decides about restart.
pub fn run_worker(ctx: WorkerContext) {
    let id = ctx.id;
    let tx = ctx.tx.clone();

    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| worker_loop(&ctx))) {
        let _ = tx.send(WorkerMessage::Failed {
            worker_id: id,
            message: panic_message(payload),
        });
    }
}

fn worker_loop(ctx: &WorkerContext) {
    let mut generated: u64 = 0;
    let mut emitted: u64 = 0;
    let mut last_report = Instant::now();
    let check_exclusions = !ctx.exclusions.is_empty();

    while !ctx.stop.load(Ordering::Relaxed) {
        for _ in 0..ctx.batch_size {
            let candidate = ctx.generator.candidate();
            generated += 1;

            // Excluded candidates still count toward the generated total.
            if check_exclusions && ctx.exclusions.contains(&candidate.address.to_lowercase()) {
                continue;
            }

            if !ctx.generator.matches(&candidate.address) {
                continue;
            }

            let secret = ctx
                .generator
                .render_secret(&candidate.key, ctx.secret_format);
            let record = ResultRecord::new(candidate.address, secret);
            if ctx
                .tx
                .send(WorkerMessage::Found {
                    worker_id: ctx.id,
                    record,
                })
                .is_err()
            {
                // Coordinator is gone; nothing left to work for.
                return;
            }

            emitted += 1;
            if ctx.match_quota.is_some_and(|quota| emitted >= quota) {
                // Mark the clean exit so the liveness sweep does not
                // mistake it for a crash.
                ctx.stop.store(true, Ordering::Relaxed);
                report_progress(ctx, generated);
                return;
            }
        }

        if last_report.elapsed() >= ctx.progress_interval {
            report_progress(ctx, generated);
            last_report = Instant::now();
        }
    }

    // Final cumulative count so the coordinator sees the full tally.
    report_progress(ctx, generated);
}

fn report_progress(ctx: &WorkerContext, generated: u64) {
    let _ = ctx.tx.send(WorkerMessage::Progress {
        worker_id: ctx.id,
        generated,
    });
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
