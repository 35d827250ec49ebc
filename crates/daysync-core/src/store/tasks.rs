use crate::error::CoreError;
use crate::models::{LocalId, Millis, Recurrence, Task};
use crate::store::{LocalStore, SqliteLocalStore};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::FromRow;
use tokio::sync::watch;

/// Raw `tasks` row; the recurrence column holds the JSON form of [`Recurrence`].
#[derive(Debug, FromRow)]
struct TaskRow {
    local_id: i64,
    remote_id: Option<String>,
    title: String,
    description: Option<String>,
    date: NaiveDate,
    is_done: bool,
    created_at: Millis,
    updated_at: Millis,
    recurrence: Option<String>,
    expected_hours: f64,
}

impl TryFrom<TaskRow> for Task {
    type Error = CoreError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let recurrence = row
            .recurrence
            .as_deref()
            .map(serde_json::from_str::<Recurrence>)
            .transpose()?;
        Ok(Task {
            local_id: row.local_id,
            remote_id: row.remote_id,
            title: row.title,
            description: row.description,
            date: row.date,
            is_done: row.is_done,
            created_at: row.created_at,
            updated_at: row.updated_at,
            recurrence,
            expected_hours: row.expected_hours,
        })
    }
}

fn recurrence_column(task: &Task) -> Result<Option<String>, CoreError> {
    Ok(task.recurrence.as_ref().map(serde_json::to_string).transpose()?)
}

fn into_tasks(rows: Vec<TaskRow>) -> Result<Vec<Task>, CoreError> {
    rows.into_iter().map(Task::try_from).collect()
}

#[async_trait]
impl LocalStore for SqliteLocalStore {
    async fn insert(&self, task: &Task) -> Result<LocalId, CoreError> {
        let result = sqlx::query(
            r#"INSERT INTO tasks (remote_id, title, description, date, is_done, created_at, updated_at, recurrence, expected_hours)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
        )
        .bind(&task.remote_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.date)
        .bind(task.is_done)
        .bind(task.created_at)
        .bind(task.updated_at)
        .bind(recurrence_column(task)?)
        .bind(task.expected_hours)
        .execute(self.pool())
        .await?;

        let local_id = result.last_insert_rowid();
        self.notify_changed();
        tracing::debug!(local_id, title = %task.title, date = %task.date, "inserted local task");
        Ok(local_id)
    }

    async fn update(&self, task: &Task) -> Result<(), CoreError> {
        let result = sqlx::query(
            r#"UPDATE tasks
            SET remote_id = COALESCE($1, remote_id), title = $2, description = $3, date = $4, is_done = $5,
                created_at = $6, updated_at = $7, recurrence = $8, expected_hours = $9
            WHERE local_id = $10"#,
        )
        .bind(&task.remote_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.date)
        .bind(task.is_done)
        .bind(task.created_at)
        .bind(task.updated_at)
        .bind(recurrence_column(task)?)
        .bind(task.expected_hours)
        .bind(task.local_id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("local task {}", task.local_id)));
        }
        self.notify_changed();
        Ok(())
    }

    async fn delete(&self, local_id: LocalId) -> Result<(), CoreError> {
        let result = sqlx::query("DELETE FROM tasks WHERE local_id = $1")
            .bind(local_id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("local task {}", local_id)));
        }
        self.notify_changed();
        Ok(())
    }

    async fn find_by_id(&self, local_id: LocalId) -> Result<Option<Task>, CoreError> {
        let row: Option<TaskRow> = sqlx::query_as("SELECT * FROM tasks WHERE local_id = $1")
            .bind(local_id)
            .fetch_optional(self.pool())
            .await?;
        row.map(Task::try_from).transpose()
    }

    async fn set_remote_id(&self, local_id: LocalId, remote_id: &str) -> Result<(), CoreError> {
        let result = sqlx::query("UPDATE tasks SET remote_id = $1 WHERE local_id = $2")
            .bind(remote_id)
            .bind(local_id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("local task {}", local_id)));
        }
        self.notify_changed();
        Ok(())
    }

    async fn query_all(&self) -> Result<Vec<Task>, CoreError> {
        let rows: Vec<TaskRow> = sqlx::query_as("SELECT * FROM tasks ORDER BY date, created_at, local_id")
            .fetch_all(self.pool())
            .await?;
        into_tasks(rows)
    }

    async fn query_by_day_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Task>, CoreError> {
        let rows: Vec<TaskRow> = sqlx::query_as(
            r#"SELECT * FROM tasks
            WHERE date >= $1 AND date < $2
            ORDER BY date, created_at, local_id"#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(self.pool())
        .await?;
        into_tasks(rows)
    }

    async fn query_by_completion(&self, date: NaiveDate, done: bool) -> Result<Vec<Task>, CoreError> {
        let rows: Vec<TaskRow> = sqlx::query_as(
            r#"SELECT * FROM tasks
            WHERE is_done = $1 AND date = $2
            ORDER BY created_at, local_id"#,
        )
        .bind(done)
        .bind(date)
        .fetch_all(self.pool())
        .await?;
        into_tasks(rows)
    }

    async fn query_by_date(&self, date: NaiveDate) -> Result<Vec<Task>, CoreError> {
        let rows: Vec<TaskRow> = sqlx::query_as("SELECT * FROM tasks WHERE date = $1 ORDER BY created_at, local_id")
            .bind(date)
            .fetch_all(self.pool())
            .await?;
        into_tasks(rows)
    }

    async fn clear(&self) -> Result<(), CoreError> {
        let mut tx = self.pool().begin().await?;
        sqlx::query("DELETE FROM tasks").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM app_meta").execute(&mut *tx).await?;
        tx.commit().await?;

        self.notify_changed();
        tracing::info!("cleared local task store");
        Ok(())
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }
}
