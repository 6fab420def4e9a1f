//! Result sink: buffered, strictly ordered, crash-safe persistence
//!
//! All durable writes funnel through one writer thread consuming a FIFO
//! operation queue, so a given destination has exactly one active writer
//! no matter how many callers enqueue concurrently. Matched records are
//! batched in an in-memory buffer that flushes on a size threshold or
//! after a debounce idle period, whichever comes first.
//!
//! Known gap, kept deliberately: records buffered but not yet flushed
//! are lost if the process dies inside the debounce window. There is no
//! write-ahead log for that window; completion and interrupt paths call
//! [`ResultSink::force_flush`] to close it at the edges that matter.

use std::fs::{self, File};
use std::io::{self, Write};
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use super::{EngineConfig, ResultRecord};

/// Persistence hook supplied by the embedding layer. The engine decides
/// when and with which grouping it fires; the callback decides path and
/// format.
pub type SaveCallback =
    Arc<dyn Fn(&[ResultRecord]) -> std::result::Result<(), String> + Send + Sync>;

/// A queued write operation
type WriteOp = Box<dyn FnOnce() -> std::result::Result<(), String> + Send>;

/// Handle on one enqueued operation's eventual outcome
pub type FlushTicket = Receiver<std::result::Result<(), String>>;

struct QueuedOp {
    op: WriteOp,
    outcome: Sender<std::result::Result<(), String>>,
}

/// Buffered sequential-write queue with a single writer thread
pub struct ResultSink {
    ops_tx: Option<Sender<QueuedOp>>,
    writer: Option<JoinHandle<()>>,
    buffer: Vec<ResultRecord>,
    flush_threshold: usize,
    debounce: Duration,
    /// Armed by `push`, reset on every append, cleared by any flush
    deadline: Option<Instant>,
    save: Option<SaveCallback>,
}

impl ResultSink {
    pub fn new(config: &EngineConfig) -> Self {
        let (ops_tx, ops_rx) = unbounded::<QueuedOp>();

        // One writer, strict submission order: the next operation starts
        // only after the previous outcome is resolved.
        let writer = thread::spawn(move || {
            for queued in ops_rx {
                let result = (queued.op)();
                let _ = queued.outcome.send(result);
            }
        });

        Self {
            ops_tx: Some(ops_tx),
            writer: Some(writer),
            buffer: Vec::new(),
            flush_threshold: config.flush_threshold,
            debounce: config.flush_debounce,
            deadline: None,
            save: None,
        }
    }

    pub fn set_save_callback(&mut self, callback: SaveCallback) {
        self.save = Some(callback);
    }

    /// Submit an operation to the FIFO queue.
    ///
    /// A failed operation rejects its ticket and the queue proceeds to
    /// the next one; failed batches are not retried.
    pub fn enqueue(&self, op: WriteOp) -> FlushTicket {
        let (outcome_tx, outcome_rx) = bounded(1);
        match &self.ops_tx {
            Some(tx) => {
                if tx.send(QueuedOp {
                    op,
                    outcome: outcome_tx,
                }).is_err()
                {
                    return closed_ticket();
                }
            }
            None => return closed_ticket(),
        }
        outcome_rx
    }

    /// Buffer one record. Flushes immediately at the size threshold,
    /// otherwise re-arms the debounce deadline.
    pub fn push(&mut self, record: ResultRecord) -> Option<FlushTicket> {
        self.buffer.push(record);
        if self.buffer.len() >= self.flush_threshold {
            Some(self.flush())
        } else {
            self.deadline = Some(Instant::now() + self.debounce);
            None
        }
    }

    /// Fire the debounced flush once the idle period has elapsed.
    /// Called from the coordinator loop on every tick.
    pub fn tick(&mut self) -> Option<FlushTicket> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline && !self.buffer.is_empty() => {
                Some(self.flush())
            }
            _ => None,
        }
    }

    /// Cancel any pending debounce and flush whatever is buffered now.
    /// Used at normal completion and at interrupt-driven shutdown.
    pub fn force_flush(&mut self) -> FlushTicket {
        self.flush()
    }

    /// Force-flush and block until the write outcome is known
    pub fn force_flush_blocking(&mut self) -> std::result::Result<(), String> {
        self.force_flush()
            .recv()
            .unwrap_or_else(|_| Err("sink writer thread is gone".to_string()))
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Detach the buffer (an atomic swap, never copy-then-clear) and hand
    /// it to the save callback through the operation queue.
    fn flush(&mut self) -> FlushTicket {
        self.deadline = None;
        if self.buffer.is_empty() {
            // Nothing buffered: resolve immediately, write nothing.
            let (tx, rx) = bounded(1);
            let _ = tx.send(Ok(()));
            return rx;
        }

        let drained = mem::take(&mut self.buffer);
        let save = self.save.clone();
        self.enqueue(Box::new(move || match save {
            Some(callback) => callback(&drained),
            None => Ok(()),
        }))
    }

    /// Stop accepting operations and wait for the queue to drain.
    ///
    /// Does NOT flush the buffer: callers that care run `force_flush`
    /// first. Dropping a sink with a non-empty buffer models the
    /// debounce-window loss described in the module docs.
    pub fn close(&mut self) {
        self.ops_tx.take();
        if let Some(writer) = self.writer.take() {
            let _ = writer.join();
        }
    }
}

impl Drop for ResultSink {
    fn drop(&mut self) {
        self.close();
    }
}

fn closed_ticket() -> FlushTicket {
    let (tx, rx) = bounded(1);
    let _ = tx.send(Err("sink is closed".to_string()));
    rx
}

/// Crash-safe file replacement: write the full content to a temporary
/// sibling, fsync it, then rename over the destination. The destination
/// is always either the old complete content or the new complete
/// content, never a partial write. On any failure the temporary is
/// removed and the error propagated.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = tmp_path(path);

    let mut file = File::create(&tmp)?;
    let written = file.write_all(bytes).and_then(|_| file.sync_all());
    drop(file);

    match written {
        Ok(()) => fs::rename(&tmp, path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            e
        }),
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            Err(e)
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}
