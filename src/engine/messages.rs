//! Message protocol between workers, coordinator, and the embedding layer
//!
//! Closed enums, matched exhaustively: adding a message kind is a
//! compile-time-checked change everywhere it is consumed.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use super::ResultRecord;

/// Worker pipeline depth: progress and result messages in flight before
/// a worker blocks on the coordinator.
const WORKER_CHANNEL_DEPTH: usize = 1024;

/// Everything a worker can tell the coordinator
#[derive(Debug)]
pub enum WorkerMessage {
    /// Cumulative generated count for one worker (not a delta)
    Progress { worker_id: usize, generated: u64 },
    /// A candidate passed the match predicate
    Found {
        worker_id: usize,
        record: ResultRecord,
    },
    /// The worker's loop faulted; the pool decides what happens next
    Failed { worker_id: usize, message: String },
}

/// Events re-exposed to the embedding layer on a single stream
#[derive(Debug, Clone)]
pub enum SearchEvent {
    Progress {
        worker_id: usize,
        generated: u64,
        total: u64,
    },
    Match {
        record: ResultRecord,
    },
}

/// Worker -> coordinator channel
pub fn worker_channel() -> (Sender<WorkerMessage>, Receiver<WorkerMessage>) {
    bounded(WORKER_CHANNEL_DEPTH)
}

/// Coordinator -> embedding layer channel.
///
/// Unbounded so a slow consumer can never stall the coordinator loop;
/// event volume is bounded by the progress interval and the target.
pub fn event_channel() -> (Sender<SearchEvent>, Receiver<SearchEvent>) {
    unbounded()
}
