use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RemoteError;
use crate::models::{LocalId, Millis, Recurrence, Task, DEFAULT_EXPECTED_HOURS};
use crate::remote::RemoteDocument;

/// Wire shape of a task in the remote collection.
///
/// The document id is not part of the body; it is attached on fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDocument {
    #[serde(default)]
    pub local_id: Option<LocalId>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Epoch millis of the task's day at UTC midnight.
    pub date: Millis,
    #[serde(default)]
    pub is_done: bool,
    pub created_at: Millis,
    pub updated_at: Millis,
    #[serde(default)]
    pub recurrence: Option<Recurrence>,
    #[serde(default = "default_expected_hours")]
    pub expected_hours: f64,
}

fn default_expected_hours() -> f64 {
    DEFAULT_EXPECTED_HOURS
}

pub fn date_to_millis(date: NaiveDate) -> Millis {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
        .timestamp_millis()
}

/// Day containing `millis`, in UTC. Non-midnight values are truncated.
pub fn millis_to_date(millis: Millis) -> Option<NaiveDate> {
    Utc.timestamp_millis_opt(millis).single().map(|dt| dt.date_naive())
}

impl TaskDocument {
    pub fn from_task(task: &Task) -> Self {
        Self {
            local_id: (task.local_id != 0).then_some(task.local_id),
            title: task.title.clone(),
            description: task.description.clone(),
            date: date_to_millis(task.date),
            is_done: task.is_done,
            created_at: task.created_at,
            updated_at: task.updated_at,
            recurrence: task.recurrence.clone(),
            expected_hours: task.expected_hours,
        }
    }

    /// Converts into a task carrying `remote_id`. The task's `local_id` is
    /// the originating device's id, or `0` when the document has none.
    pub fn into_task(self, remote_id: &str) -> Result<Task, RemoteError> {
        let date = millis_to_date(self.date)
            .ok_or_else(|| RemoteError::InvalidDocument(format!("date {} out of range", self.date)))?;
        let task = Task {
            local_id: self.local_id.unwrap_or(0),
            remote_id: Some(remote_id.to_string()),
            title: self.title,
            description: self.description,
            date,
            is_done: self.is_done,
            created_at: self.created_at,
            updated_at: self.updated_at,
            recurrence: self.recurrence,
            expected_hours: self.expected_hours,
        };
        task.validate()
            .map_err(|e| RemoteError::InvalidDocument(format!("{}: {}", remote_id, e)))?;
        Ok(task)
    }
}

pub fn encode(task: &Task) -> Result<Value, RemoteError> {
    Ok(serde_json::to_value(TaskDocument::from_task(task))?)
}

pub fn decode(document: &RemoteDocument) -> Result<Task, RemoteError> {
    let body: TaskDocument = serde_json::from_value(document.data.clone())?;
    body.into_task(&document.id)
}
