#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use daysync_core::db::establish_connection;
use daysync_core::error::RemoteError;
use daysync_core::models::Task;
use daysync_core::remote::{MemoryRemoteStore, RemoteDocument, RemoteStore};
use daysync_core::store::SqliteLocalStore;
use parking_lot::Mutex;
use tempfile::TempDir;

/// Fresh SQLite-backed local store in a temporary directory.
pub async fn setup_store() -> (Arc<SqliteLocalStore>, TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");
    let pool = establish_connection(&db_path)
        .await
        .expect("Failed to establish test database connection");
    (Arc::new(SqliteLocalStore::new(pool)), temp_dir)
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn task(title: &str, date: NaiveDate) -> Task {
    Task {
        title: title.to_string(),
        date,
        ..Default::default()
    }
}

/// Remote double that records every call and fails on demand.
#[derive(Default)]
pub struct ScriptedRemote {
    pub inner: MemoryRemoteStore,
    calls: Mutex<Vec<String>>,
    failing_titles: Mutex<HashSet<String>>,
    fail_fetch: Mutex<bool>,
    fetch_delay: Mutex<Option<std::time::Duration>>,
}

impl ScriptedRemote {
    pub fn signed_in(user: &str) -> Self {
        let remote = Self::default();
        remote.inner.sign_in(user);
        remote
    }

    /// Upserts of tasks with this title fail until [`ScriptedRemote::recover`].
    pub fn fail_title(&self, title: &str) {
        self.failing_titles.lock().insert(title.to_string());
    }

    pub fn recover(&self) {
        self.failing_titles.lock().clear();
        *self.fail_fetch.lock() = false;
    }

    pub fn fail_fetch(&self) {
        *self.fail_fetch.lock() = true;
    }

    /// Every later fetch sleeps for `delay` before answering.
    pub fn slow_fetch(&self, delay: std::time::Duration) {
        *self.fetch_delay.lock() = Some(delay);
    }

    /// Calls so far, as `upsert:<title>` or `delete:<doc id>`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl RemoteStore for ScriptedRemote {
    fn user_id(&self) -> Option<String> {
        self.inner.user_id()
    }

    async fn upsert(&self, doc_id: &str, task: &Task) -> Result<(), RemoteError> {
        if self.failing_titles.lock().contains(&task.title) {
            return Err(RemoteError::Unavailable(format!("refusing '{}'", task.title)));
        }
        self.calls.lock().push(format!("upsert:{}", task.title));
        self.inner.upsert(doc_id, task).await
    }

    async fn delete(&self, doc_id: &str) -> Result<(), RemoteError> {
        self.calls.lock().push(format!("delete:{}", doc_id));
        self.inner.delete(doc_id).await
    }

    async fn fetch_all_ordered_by_creation(&self) -> Result<Vec<RemoteDocument>, RemoteError> {
        if *self.fail_fetch.lock() {
            return Err(RemoteError::Unavailable("network down".to_string()));
        }
        let delay = *self.fetch_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.fetch_all_ordered_by_creation().await
    }
}
