//! Local persistent store: the authoritative source for every read the UI makes.

use crate::db::DbPool;
use crate::error::CoreError;
use crate::models::{LocalId, Task};
use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::watch;

pub mod live;
pub mod tasks;
pub mod watermark;

pub use live::{LiveQuery, TaskQuery};

/// Persistent, queryable table of tasks keyed by a locally assigned id.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Stores a new row and returns its freshly assigned local id.
    /// Any `local_id` already present on `task` is ignored.
    async fn insert(&self, task: &Task) -> Result<LocalId, CoreError>;
    /// Overwrites the row. A `None` remote id keeps the stored one, so a copy
    /// read before its first upload finished cannot unlink the document.
    async fn update(&self, task: &Task) -> Result<(), CoreError>;
    async fn delete(&self, local_id: LocalId) -> Result<(), CoreError>;
    async fn find_by_id(&self, local_id: LocalId) -> Result<Option<Task>, CoreError>;
    /// Records the remote document id without touching `updated_at`.
    async fn set_remote_id(&self, local_id: LocalId, remote_id: &str) -> Result<(), CoreError>;
    async fn query_all(&self) -> Result<Vec<Task>, CoreError>;
    /// Tasks dated in the half-open range `[start, end)`.
    async fn query_by_day_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Task>, CoreError>;
    async fn query_by_completion(&self, date: NaiveDate, done: bool) -> Result<Vec<Task>, CoreError>;
    async fn query_by_date(&self, date: NaiveDate) -> Result<Vec<Task>, CoreError>;
    async fn clear(&self) -> Result<(), CoreError>;
    /// Generation counter bumped after every successful write.
    fn changes(&self) -> watch::Receiver<u64>;
}

/// Persistence for the recurrence materializer's watermark.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    async fn load_watermark(&self) -> Result<Option<NaiveDate>, CoreError>;
    async fn store_watermark(&self, date: NaiveDate) -> Result<(), CoreError>;
}

/// SQLite implementation of the local store
pub struct SqliteLocalStore {
    pool: DbPool,
    changes: watch::Sender<u64>,
}

impl SqliteLocalStore {
    pub fn new(pool: DbPool) -> Self {
        let (changes, _) = watch::channel(0);
        Self { pool, changes }
    }

    /// Get a reference to the database pool for internal use across modules
    pub(crate) fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub(crate) fn notify_changed(&self) {
        self.changes.send_modify(|generation| *generation += 1);
    }
}
