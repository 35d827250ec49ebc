//! The surface the UI layer talks to.
//!
//! Every mutation writes the local store first and only then queues the remote
//! side, so a call that returns `Ok` is already visible to every live query.

use std::sync::Arc;

use chrono::NaiveDate;
use chrono_tz::Tz;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::error::CoreError;
use crate::models::{LocalId, NewTask, SyncConfig, SyncOperation, SyncState, Task, DEFAULT_EXPECTED_HOURS};
use crate::recurrence::{MaterializationReport, RecurrenceMaterializer};
use crate::remote::RemoteStore;
use crate::store::{LiveQuery, LocalStore, TaskQuery, WatermarkStore};
use crate::sync::{DrainReport, MergeReport, PushReport, SyncEngine, SyncWorker};
use crate::timezone;

pub struct TaskService<L, R> {
    local: Arc<L>,
    engine: Arc<SyncEngine<L, R>>,
    materializer: RecurrenceMaterializer<L>,
    timezone: Tz,
    errors: watch::Sender<Option<String>>,
    worker: Mutex<Option<SyncWorker>>,
}

impl<L, R> TaskService<L, R>
where
    L: LocalStore + WatermarkStore + 'static,
    R: RemoteStore + 'static,
{
    pub fn new(local: Arc<L>, remote: Arc<R>, config: SyncConfig, timezone: Tz) -> Self {
        let engine = Arc::new(SyncEngine::new(local.clone(), remote, config));
        let (errors, _) = watch::channel(None);
        Self {
            materializer: RecurrenceMaterializer::new(local.clone()),
            local,
            engine,
            timezone,
            errors,
            worker: Mutex::new(None),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn today(&self) -> NaiveDate {
        timezone::today_in(self.timezone)
    }

    pub fn engine(&self) -> &Arc<SyncEngine<L, R>> {
        &self.engine
    }

    /// Catches up recurring tasks, then starts the background sync worker.
    pub async fn start(&self) -> Result<MaterializationReport, CoreError> {
        let report = self.trigger_recurrence_check().await?;
        let mut worker = self.worker.lock();
        if worker.as_ref().map_or(true, SyncWorker::is_finished) {
            *worker = Some(SyncWorker::spawn(self.engine.clone()));
        }
        Ok(report)
    }

    /// Stops the background worker, if one is running.
    pub async fn shutdown(&self) {
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            worker.shutdown().await;
        }
    }

    /// Records a local failure on the error signal before handing it back.
    fn surface<T>(&self, result: Result<T, CoreError>) -> Result<T, CoreError> {
        if let Err(e) = &result {
            if !matches!(e, CoreError::Remote(_)) {
                tracing::error!(error = %e, "task operation failed");
                self.errors.send_replace(Some(e.to_string()));
            }
        }
        result
    }

    async fn existing(&self, local_id: LocalId) -> Result<Task, CoreError> {
        self.local
            .find_by_id(local_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("local task {}", local_id)))
    }

    /// Materialization triggered by an edit must not fail the edit itself.
    async fn refresh_recurrence(&self) {
        if let Err(e) = self.trigger_recurrence_check().await {
            tracing::warn!(error = %e, "recurrence check after edit failed");
            self.errors.send_replace(Some(e.to_string()));
        }
    }

    pub async fn add_task(&self, new_task: NewTask) -> Result<Task, CoreError> {
        let result = async {
            let mut task = Task {
                title: new_task.title.trim().to_string(),
                description: new_task.description.filter(|d| !d.trim().is_empty()),
                date: new_task.date.unwrap_or_else(|| self.today()),
                recurrence: new_task.recurrence,
                expected_hours: new_task.expected_hours.unwrap_or(DEFAULT_EXPECTED_HOURS),
                ..Default::default()
            };
            task.validate()?;
            task.local_id = self.local.insert(&task).await?;
            Ok::<_, CoreError>(task)
        }
        .await;
        let task = self.surface(result)?;

        self.engine.enqueue(SyncOperation::Insert(task.clone()));
        tracing::info!(local_id = task.local_id, title = %task.title, "added task");
        if task.is_recurring() {
            self.refresh_recurrence().await;
        }
        Ok(task)
    }

    /// Saves an edited task, bumping `updated_at` past its stored value.
    pub async fn update_task(&self, task: Task) -> Result<Task, CoreError> {
        let result = async {
            let previous = self.existing(task.local_id).await?;
            let mut task = Task {
                title: task.title.trim().to_string(),
                // A copy read before the first upload must not erase the assigned id.
                remote_id: task.remote_id.or_else(|| previous.remote_id.clone()),
                updated_at: task.updated_at.max(previous.updated_at),
                ..task
            };
            task.validate()?;
            task.touch();
            self.local.update(&task).await?;
            Ok::<_, CoreError>((previous, task))
        }
        .await;
        let (previous, task) = self.surface(result)?;

        self.engine.enqueue(SyncOperation::Update(task.clone()));
        tracing::info!(local_id = task.local_id, title = %task.title, "updated task");
        if task.is_recurring() && previous.recurrence != task.recurrence {
            self.refresh_recurrence().await;
        }
        Ok(task)
    }

    pub async fn set_done(&self, local_id: LocalId, done: bool) -> Result<Task, CoreError> {
        let result = async {
            let mut task = self.existing(local_id).await?;
            task.is_done = done;
            task.touch();
            self.local.update(&task).await?;
            Ok::<_, CoreError>(task)
        }
        .await;
        let task = self.surface(result)?;

        self.engine.enqueue(SyncOperation::Update(task.clone()));
        tracing::info!(local_id, done, "changed task completion");
        Ok(task)
    }

    /// Removes the row locally and queues the remote delete. Returns the removed task.
    pub async fn delete_task(&self, local_id: LocalId) -> Result<Task, CoreError> {
        let result = async {
            let task = self.existing(local_id).await?;
            self.local.delete(local_id).await?;
            Ok::<_, CoreError>(task)
        }
        .await;
        let task = self.surface(result)?;

        self.engine.enqueue(SyncOperation::Delete(task.clone()));
        tracing::info!(local_id, title = %task.title, "deleted task");
        Ok(task)
    }

    /// Wipes local data and the sync queue. Used on sign-out.
    pub async fn clear_all_data(&self) -> Result<(), CoreError> {
        let result = self.local.clear().await;
        self.surface(result)?;
        self.engine.reset();
        self.errors.send_replace(None);
        Ok(())
    }

    pub async fn task(&self, local_id: LocalId) -> Result<Option<Task>, CoreError> {
        let result = self.local.find_by_id(local_id).await;
        self.surface(result)
    }

    /// One-shot read of a single day.
    pub async fn tasks_on(&self, date: NaiveDate) -> Result<Vec<Task>, CoreError> {
        let result = self.local.query_by_date(date).await;
        self.surface(result)
    }

    /// Last day recurring tasks were materialized through.
    pub async fn recurrence_watermark(&self) -> Result<Option<NaiveDate>, CoreError> {
        let result = self.local.load_watermark().await;
        self.surface(result)
    }

    pub async fn push_all(&self) -> Result<PushReport, CoreError> {
        let result = self.engine.push_all().await;
        self.surface(result)
    }

    pub async fn pull_and_merge(&self) -> Result<MergeReport, CoreError> {
        let result = self.engine.pull_and_merge().await;
        self.surface(result)
    }

    /// Drains queued operations right away instead of waiting for the worker.
    pub async fn sync_now(&self) -> DrainReport {
        self.engine.drain_pending().await
    }

    pub async fn trigger_recurrence_check(&self) -> Result<MaterializationReport, CoreError> {
        self.trigger_recurrence_check_for(self.today()).await
    }

    /// Materializes recurring instances through `today`, queueing an upload for each.
    pub async fn trigger_recurrence_check_for(&self, today: NaiveDate) -> Result<MaterializationReport, CoreError> {
        let engine = &self.engine;
        let result = self
            .materializer
            .run(today, |created| {
                engine.enqueue(SyncOperation::Insert(created.clone()));
            })
            .await;
        self.surface(result)
    }

    pub fn tasks_for_day(&self, date: NaiveDate) -> LiveQuery<L> {
        LiveQuery::new(self.local.clone(), TaskQuery::day(date))
    }

    pub fn tasks_for_today(&self) -> LiveQuery<L> {
        self.tasks_for_day(self.today())
    }

    pub fn completed_for(&self, date: NaiveDate) -> LiveQuery<L> {
        LiveQuery::new(self.local.clone(), TaskQuery::Completion { date, done: true })
    }

    pub fn pending_for(&self, date: NaiveDate) -> LiveQuery<L> {
        LiveQuery::new(self.local.clone(), TaskQuery::Completion { date, done: false })
    }

    pub fn all_tasks(&self) -> LiveQuery<L> {
        LiveQuery::new(self.local.clone(), TaskQuery::All)
    }

    pub fn sync_state(&self) -> watch::Receiver<SyncState> {
        self.engine.subscribe_state()
    }

    /// Latest user-visible error, `None` once dismissed.
    pub fn errors(&self) -> watch::Receiver<Option<String>> {
        self.errors.subscribe()
    }

    pub fn clear_error(&self) {
        self.errors.send_replace(None);
    }
}
