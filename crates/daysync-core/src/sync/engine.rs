use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{watch, Notify};
use tokio::time::Instant;

use crate::error::CoreError;
use crate::models::{LocalId, SyncConfig, SyncOperation, SyncState, Task};
use crate::remote::{document, RemoteStore};
use crate::store::LocalStore;
use crate::sync::merge::plan_merge;
use crate::sync::queue::{PendingOperation, PendingQueue};

/// Outcome of one [`SyncEngine::drain_pending`] pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DrainReport {
    pub applied: usize,
    pub requeued: usize,
    /// Entries still inside their backoff window, carried over untouched.
    pub deferred: usize,
    pub dead_lettered: usize,
    /// Entries discarded because no user was signed in.
    pub skipped_unauthenticated: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub inserted: usize,
    pub updated: usize,
    /// Remote documents that failed to parse.
    pub skipped: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PushReport {
    pub uploaded: usize,
    pub failed: usize,
}

/// Remote document ids handed out during one pass, keyed by local id.
type AssignedIds = HashMap<LocalId, String>;

/// Keeps the local store and the remote store eventually consistent.
///
/// Local reads and writes never wait on the engine: mutations only
/// [`enqueue`](SyncEngine::enqueue) an operation, and the remote side is
/// reconciled later by a drain, a full push or a pull.
pub struct SyncEngine<L, R> {
    local: Arc<L>,
    remote: Arc<R>,
    config: SyncConfig,
    queue: PendingQueue,
    dead_letters: Mutex<Vec<PendingOperation>>,
    state: watch::Sender<SyncState>,
    drain_lock: tokio::sync::Mutex<()>,
    pull_lock: tokio::sync::Mutex<()>,
    wake: Notify,
}

impl<L: LocalStore, R: RemoteStore> SyncEngine<L, R> {
    pub fn new(local: Arc<L>, remote: Arc<R>, config: SyncConfig) -> Self {
        let (state, _) = watch::channel(SyncState::Idle);
        Self {
            local,
            remote,
            config,
            queue: PendingQueue::new(),
            dead_letters: Mutex::new(Vec::new()),
            state,
            drain_lock: tokio::sync::Mutex::new(()),
            pull_lock: tokio::sync::Mutex::new(()),
            wake: Notify::new(),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn state(&self) -> SyncState {
        self.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    pub fn pending(&self) -> Vec<PendingOperation> {
        self.queue.snapshot()
    }

    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }

    pub fn dead_letters(&self) -> Vec<PendingOperation> {
        self.dead_letters.lock().clone()
    }

    pub(crate) fn wake(&self) -> &Notify {
        &self.wake
    }

    pub(crate) fn next_retry_at(&self) -> Option<Instant> {
        self.queue.next_retry_at()
    }

    fn set_state(&self, state: SyncState) {
        tracing::debug!(%state, "sync state changed");
        self.state.send_replace(state);
    }

    /// Queues an operation and wakes the background worker. Never blocks.
    pub fn enqueue(&self, operation: SyncOperation) -> String {
        let id = self.queue.push(operation);
        tracing::debug!(operation = %id, "queued sync operation");
        self.wake.notify_one();
        id
    }

    /// Drops every queued and dead-lettered operation and returns to `Idle`.
    pub fn reset(&self) {
        self.queue.clear();
        self.dead_letters.lock().clear();
        self.set_state(SyncState::Idle);
    }

    /// Applies the current batch of queued operations to the remote store in order.
    ///
    /// Only one drain runs at a time; a call made while another is in flight
    /// returns an empty report and its operations are picked up by the next
    /// pass. A failing operation is re-queued with backoff (or dead-lettered
    /// once its attempts are exhausted) and never aborts the rest of the batch.
    pub async fn drain_pending(&self) -> DrainReport {
        let mut report = DrainReport::default();
        let Ok(_guard) = self.drain_lock.try_lock() else {
            tracing::debug!("drain already in flight");
            return report;
        };

        let batch = self.queue.take_all();
        if batch.is_empty() {
            return report;
        }

        if self.remote.user_id().is_none() {
            tracing::warn!(count = batch.len(), "no authenticated user, discarding queued sync operations");
            report.skipped_unauthenticated = batch.len();
            self.set_state(SyncState::Synced);
            return report;
        }

        let now = Instant::now();
        let (due, waiting): (Vec<_>, Vec<_>) = batch.into_iter().partition(|e| e.is_due(now));
        report.deferred = waiting.len();
        for entry in waiting {
            self.queue.requeue(entry);
        }
        if due.is_empty() {
            return report;
        }

        self.set_state(SyncState::SyncingToRemote);
        let mut assigned = AssignedIds::new();
        let mut last_failure = None;

        for mut entry in due {
            match self.apply(&entry.operation, &mut assigned).await {
                Ok(()) => report.applied += 1,
                Err(e) => {
                    entry.attempts += 1;
                    entry.last_error = Some(e.to_string());
                    last_failure = Some(e.to_string());

                    if self.config.is_exhausted(entry.attempts) {
                        tracing::warn!(
                            operation = %entry.id,
                            attempts = entry.attempts,
                            error = %e,
                            "sync operation exhausted its retries"
                        );
                        report.dead_lettered += 1;
                        self.dead_letters.lock().push(entry);
                    } else {
                        let delay = self.config.backoff_for(entry.attempts);
                        entry.not_before = Some(Instant::now() + delay);
                        let failed_id = entry.id.clone();
                        let retry_id = self.queue.requeue(entry);
                        tracing::warn!(
                            operation = %failed_id,
                            retry = %retry_id,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "sync operation failed, re-queued"
                        );
                        report.requeued += 1;
                    }
                }
            }
        }

        match last_failure {
            Some(message) => self.set_state(SyncState::Error(format!("Failed to sync to remote: {}", message))),
            None => self.set_state(SyncState::Synced),
        }
        tracing::info!(
            applied = report.applied,
            requeued = report.requeued,
            dead_lettered = report.dead_lettered,
            "drained pending sync operations"
        );
        report
    }

    async fn apply(&self, operation: &SyncOperation, assigned: &mut AssignedIds) -> Result<(), CoreError> {
        match operation {
            SyncOperation::Insert(task) | SyncOperation::Update(task) => {
                // Upload the row as it is now; an edit queued after this one
                // will upload the same state again.
                match self.local.find_by_id(task.local_id).await? {
                    Some(current) => {
                        self.upload(&current, assigned).await?;
                    }
                    None => {
                        tracing::debug!(local_id = task.local_id, "task deleted locally, dropping obsolete upload");
                    }
                }
                Ok(())
            }
            SyncOperation::Delete(task) => {
                let doc_id = task
                    .remote_id
                    .clone()
                    .or_else(|| assigned.get(&task.local_id).cloned());
                match doc_id {
                    Some(doc_id) => {
                        self.remote.delete(&doc_id).await?;
                        tracing::debug!(document = %doc_id, title = %task.title, "deleted remote task");
                    }
                    None => {
                        tracing::debug!(title = %task.title, "task never reached the remote, nothing to delete");
                    }
                }
                Ok(())
            }
        }
    }

    /// Upserts `task`, allocating and recording a document id on first upload.
    async fn upload(&self, task: &Task, assigned: &mut AssignedIds) -> Result<String, CoreError> {
        let existing = task
            .remote_id
            .clone()
            .or_else(|| assigned.get(&task.local_id).cloned());
        let is_new = existing.is_none();
        let doc_id = existing.unwrap_or_else(|| self.remote.new_document_id());

        let outgoing = Task {
            remote_id: Some(doc_id.clone()),
            ..task.clone()
        };
        self.remote.upsert(&doc_id, &outgoing).await?;
        tracing::debug!(document = %doc_id, title = %task.title, "uploaded task");

        if is_new {
            assigned.insert(task.local_id, doc_id.clone());
            match self.local.set_remote_id(task.local_id, &doc_id).await {
                Ok(()) => {}
                Err(CoreError::NotFound(_)) => {
                    // Deleted while the upload was in flight; don't leave an orphan behind.
                    tracing::debug!(document = %doc_id, "row vanished during upload, removing remote copy");
                    self.remote.delete(&doc_id).await?;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(doc_id)
    }

    /// Uploads every local row. Used for an explicit "sync to cloud".
    pub async fn push_all(&self) -> Result<PushReport, CoreError> {
        let mut report = PushReport::default();
        if self.remote.user_id().is_none() {
            tracing::warn!("no authenticated user, skipping full upload");
            self.set_state(SyncState::Synced);
            return Ok(report);
        }

        self.set_state(SyncState::SyncingToRemote);
        let tasks = match self.local.query_all().await {
            Ok(tasks) => tasks,
            Err(e) => {
                self.set_state(SyncState::Error(format!("Failed to sync to remote: {}", e)));
                return Err(e);
            }
        };

        let mut assigned = AssignedIds::new();
        let mut last_failure = None;
        for task in &tasks {
            match self.upload(task, &mut assigned).await {
                Ok(_) => report.uploaded += 1,
                Err(e) => {
                    tracing::warn!(local_id = task.local_id, error = %e, "failed to upload task");
                    report.failed += 1;
                    last_failure = Some(e.to_string());
                }
            }
        }

        match last_failure {
            Some(message) => self.set_state(SyncState::Error(format!("Failed to sync to remote: {}", message))),
            None => self.set_state(SyncState::Synced),
        }
        tracing::info!(uploaded = report.uploaded, failed = report.failed, "full upload finished");
        Ok(report)
    }

    /// Fetches the remote snapshot and folds it into the local store.
    ///
    /// Documents that fail to parse are logged and skipped. Local rows with no
    /// remote counterpart are never removed. Concurrent pulls run one after
    /// the other, so the second one plans against the rows the first inserted.
    pub async fn pull_and_merge(&self) -> Result<MergeReport, CoreError> {
        let _guard = self.pull_lock.lock().await;
        if self.remote.user_id().is_none() {
            tracing::warn!("no authenticated user, skipping remote pull");
            self.set_state(SyncState::Synced);
            return Ok(MergeReport::default());
        }

        self.set_state(SyncState::SyncingFromRemote);
        let documents = match self.remote.fetch_all_ordered_by_creation().await {
            Ok(documents) => documents,
            Err(e) => {
                self.set_state(SyncState::Error(format!("Failed to sync from remote: {}", e)));
                return Err(e.into());
            }
        };
        tracing::debug!(count = documents.len(), "fetched remote snapshot");

        let mut skipped = 0;
        let remote_tasks: Vec<Task> = documents
            .iter()
            .filter_map(|doc| match document::decode(doc) {
                Ok(task) => Some(task),
                Err(e) => {
                    tracing::warn!(document = %doc.id, error = %e, "skipping unparseable remote document");
                    skipped += 1;
                    None
                }
            })
            .collect();

        match self.merge_into_local(&remote_tasks).await {
            Ok(mut report) => {
                report.skipped = skipped;
                self.set_state(SyncState::Synced);
                tracing::info!(
                    inserted = report.inserted,
                    updated = report.updated,
                    skipped = report.skipped,
                    "merged remote snapshot"
                );
                Ok(report)
            }
            Err(e) => {
                self.set_state(SyncState::Error(format!("Failed to sync from remote: {}", e)));
                Err(e)
            }
        }
    }

    async fn merge_into_local(&self, remote_tasks: &[Task]) -> Result<MergeReport, CoreError> {
        let local_tasks = self.local.query_all().await?;
        let plan = plan_merge(&local_tasks, remote_tasks);
        let mut report = MergeReport::default();

        for task in &plan.inserts {
            let local_id = self.local.insert(task).await?;
            tracing::debug!(local_id, title = %task.title, "inserted task from remote");
            report.inserted += 1;
        }

        for task in &plan.updates {
            // The row may have been edited since the snapshot was read.
            let Some(current) = self.local.find_by_id(task.local_id).await? else {
                continue;
            };
            if current.updated_at >= task.updated_at {
                continue;
            }
            self.local.update(task).await?;
            tracing::debug!(local_id = task.local_id, title = %task.title, "updated task from remote");
            report.updated += 1;
        }

        Ok(report)
    }
}
