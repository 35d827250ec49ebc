use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::watch;

use crate::error::CoreError;
use crate::models::Task;
use crate::store::LocalStore;

/// Selector for a live-updating task list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskQuery {
    All,
    /// Half-open day range `[start, end)`.
    DayRange { start: NaiveDate, end: NaiveDate },
    Completion { date: NaiveDate, done: bool },
}

impl TaskQuery {
    pub fn day(date: NaiveDate) -> Self {
        TaskQuery::DayRange {
            start: date,
            end: date.succ_opt().unwrap_or(date),
        }
    }

    pub async fn fetch<L: LocalStore + ?Sized>(&self, store: &L) -> Result<Vec<Task>, CoreError> {
        match self {
            TaskQuery::All => store.query_all().await,
            TaskQuery::DayRange { start, end } => store.query_by_day_range(*start, *end).await,
            TaskQuery::Completion { date, done } => store.query_by_completion(*date, *done).await,
        }
    }
}

/// A query result stream that re-emits whenever the underlying store changes.
///
/// The first call to [`LiveQuery::next`] yields immediately; later calls wait
/// for the next write. Several writes between two calls collapse into one
/// emission.
pub struct LiveQuery<L: ?Sized> {
    store: Arc<L>,
    query: TaskQuery,
    changes: watch::Receiver<u64>,
    /// Set until a fetch completes; survives a cancelled `next()`.
    stale: bool,
}

impl<L: LocalStore + ?Sized> LiveQuery<L> {
    pub fn new(store: Arc<L>, query: TaskQuery) -> Self {
        let changes = store.changes();
        Self {
            store,
            query,
            changes,
            stale: true,
        }
    }

    pub fn query(&self) -> &TaskQuery {
        &self.query
    }

    /// Current result without waiting for a change.
    pub async fn current(&self) -> Result<Vec<Task>, CoreError> {
        self.query.fetch(&*self.store).await
    }

    /// Next emission, or `None` once the store's change feed has closed.
    ///
    /// Cancel safe: a call dropped before its fetch finished leaves the change
    /// pending, and the following call emits it.
    pub async fn next(&mut self) -> Option<Result<Vec<Task>, CoreError>> {
        if !self.stale {
            if self.changes.changed().await.is_err() {
                return None;
            }
            self.stale = true;
        }
        // Writes up to this point are covered by the fetch below.
        let _ = self.changes.borrow_and_update();
        let result = self.query.fetch(&*self.store).await;
        self.stale = false;
        Some(result)
    }
}
