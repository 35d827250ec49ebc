use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::models::{now_millis, SyncOperation};

/// A queued sync operation together with its retry bookkeeping.
#[derive(Debug, Clone)]
pub struct PendingOperation {
    /// `{KIND}_{millis}_{seq}`; regenerated on every re-enqueue.
    pub id: String,
    pub operation: SyncOperation,
    /// Failed attempts so far.
    pub attempts: u32,
    /// Earliest instant the operation may be retried.
    pub not_before: Option<Instant>,
    pub last_error: Option<String>,
}

impl PendingOperation {
    pub fn is_due(&self, now: Instant) -> bool {
        self.not_before.map_or(true, |at| at <= now)
    }
}

/// Pending-operation queue shared by enqueuers and the drain.
///
/// Entries are keyed by a monotonically increasing sequence so iteration
/// follows enqueue order. Draining swaps the whole map out under the lock, so
/// operations enqueued concurrently land in the next batch instead of being lost.
#[derive(Debug, Default)]
pub struct PendingQueue {
    entries: Mutex<BTreeMap<u64, PendingOperation>>,
    next_seq: AtomicU64,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&self, operation: &SyncOperation) -> (u64, String) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let id = format!("{}_{}_{}", operation.kind(), now_millis(), seq);
        (seq, id)
    }

    pub fn push(&self, operation: SyncOperation) -> String {
        self.requeue(PendingOperation {
            id: String::new(),
            operation,
            attempts: 0,
            not_before: None,
            last_error: None,
        })
    }

    /// Puts an entry back at the tail under a fresh id, keeping its retry state.
    pub fn requeue(&self, mut entry: PendingOperation) -> String {
        let (seq, id) = self.allocate(&entry.operation);
        entry.id = id.clone();
        self.entries.lock().insert(seq, entry);
        id
    }

    /// Atomically removes and returns every entry in enqueue order.
    pub fn take_all(&self) -> Vec<PendingOperation> {
        let batch = std::mem::take(&mut *self.entries.lock());
        batch.into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn snapshot(&self) -> Vec<PendingOperation> {
        self.entries.lock().values().cloned().collect()
    }

    /// Earliest backoff deadline among waiting entries.
    pub fn next_retry_at(&self) -> Option<Instant> {
        self.entries.lock().values().filter_map(|e| e.not_before).min()
    }
}
