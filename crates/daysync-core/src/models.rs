use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::error::CoreError;

/// Identifier assigned by the local store. `0` means the row has not been stored yet.
pub type LocalId = i64;

/// Milliseconds since the Unix epoch.
pub type Millis = i64;

pub fn now_millis() -> Millis {
    Utc::now().timestamp_millis()
}

/// A scheduled piece of work for one calendar day.
///
/// Rows carrying a [`Recurrence`] act as templates for the materializer; the
/// instances it creates carry the same recurrence as provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub local_id: LocalId,
    pub remote_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub is_done: bool,
    pub created_at: Millis,
    pub updated_at: Millis,
    pub recurrence: Option<Recurrence>,
    pub expected_hours: f64,
}

impl Default for Task {
    fn default() -> Self {
        let now = now_millis();
        Self {
            local_id: 0,
            remote_id: None,
            title: String::new(),
            description: None,
            date: Utc::now().date_naive(),
            is_done: false,
            created_at: now,
            updated_at: now,
            recurrence: None,
            expected_hours: DEFAULT_EXPECTED_HOURS,
        }
    }
}

pub const DEFAULT_EXPECTED_HOURS: f64 = 1.0;

impl Task {
    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    /// Bumps `updated_at` so it is strictly greater than its previous value.
    pub fn touch(&mut self) {
        self.updated_at = now_millis().max(self.updated_at + 1);
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.title.trim().is_empty() {
            return Err(CoreError::InvalidInput("Task title cannot be empty".to_string()));
        }
        if !self.expected_hours.is_finite() || self.expected_hours <= 0.0 {
            return Err(CoreError::InvalidInput(format!(
                "Expected hours must be positive, got {}",
                self.expected_hours
            )));
        }
        if let Some(recurrence) = &self.recurrence {
            recurrence.validate()?;
        }
        Ok(())
    }
}

/// Input for creating a task through the service facade.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    /// Defaults to today in the service's timezone.
    pub date: Option<NaiveDate>,
    pub recurrence: Option<Recurrence>,
    pub expected_hours: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecurrenceKind {
    Daily,
    Weekly,
    Custom,
}

impl fmt::Display for RecurrenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecurrenceKind::Daily => write!(f, "DAILY"),
            RecurrenceKind::Weekly => write!(f, "WEEKLY"),
            RecurrenceKind::Custom => write!(f, "CUSTOM"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid recurrence type: {0}")]
pub struct ParseRecurrenceKindError(String);

impl FromStr for RecurrenceKind {
    type Err = ParseRecurrenceKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(RecurrenceKind::Daily),
            "weekly" => Ok(RecurrenceKind::Weekly),
            "custom" => Ok(RecurrenceKind::Custom),
            _ => Err(ParseRecurrenceKindError(s.to_string())),
        }
    }
}

/// Recurrence pattern attached to a template task.
///
/// Weekday numbers run from 1 (Sunday) to 7 (Saturday). Day sets are kept
/// sorted and deduplicated so two patterns compare equal structurally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recurrence {
    #[serde(rename = "type")]
    pub kind: RecurrenceKind,
    #[serde(default, deserialize_with = "normalized_days")]
    pub days_of_week: Option<Vec<u8>>,
    #[serde(default)]
    pub interval: Option<u32>,
}

impl Recurrence {
    pub fn daily() -> Self {
        Self {
            kind: RecurrenceKind::Daily,
            days_of_week: None,
            interval: None,
        }
    }

    pub fn weekly(days: impl IntoIterator<Item = u8>) -> Self {
        Self {
            kind: RecurrenceKind::Weekly,
            days_of_week: Some(normalize(days.into_iter().collect())),
            interval: None,
        }
    }

    pub fn every_n_days(interval: u32) -> Self {
        Self {
            kind: RecurrenceKind::Custom,
            days_of_week: None,
            interval: Some(interval),
        }
    }

    /// Interval in days for custom recurrences; a missing interval means every day.
    pub fn interval_days(&self) -> i64 {
        i64::from(self.interval.unwrap_or(1).max(1))
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        match self.kind {
            RecurrenceKind::Daily => Ok(()),
            RecurrenceKind::Weekly => {
                let days = self.days_of_week.as_deref().unwrap_or_default();
                if days.is_empty() {
                    return Err(CoreError::InvalidInput(
                        "Weekly recurrence needs at least one day".to_string(),
                    ));
                }
                if let Some(day) = days.iter().find(|d| !(1..=7).contains(*d)) {
                    return Err(CoreError::InvalidInput(format!(
                        "Weekday number {} is out of range 1..=7",
                        day
                    )));
                }
                Ok(())
            }
            RecurrenceKind::Custom => match self.interval {
                Some(0) => Err(CoreError::InvalidInput(
                    "Custom recurrence interval must be at least 1 day".to_string(),
                )),
                _ => Ok(()),
            },
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            RecurrenceKind::Daily => write!(f, "daily"),
            RecurrenceKind::Weekly => {
                let days = self.days_of_week.as_deref().unwrap_or_default();
                let labels: Vec<&str> = days.iter().map(|d| weekday_label(*d)).collect();
                write!(f, "weekly on {}", labels.join(", "))
            }
            RecurrenceKind::Custom => write!(f, "every {} days", self.interval_days()),
        }
    }
}

fn normalize(mut days: Vec<u8>) -> Vec<u8> {
    days.sort_unstable();
    days.dedup();
    days
}

fn normalized_days<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<u8>>::deserialize(deserializer)?.map(normalize))
}

pub fn weekday_label(day: u8) -> &'static str {
    match day {
        1 => "Sun",
        2 => "Mon",
        3 => "Tue",
        4 => "Wed",
        5 => "Thu",
        6 => "Fri",
        7 => "Sat",
        _ => "?",
    }
}

/// Intent queued for the remote store.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOperation {
    Insert(Task),
    Update(Task),
    Delete(Task),
}

impl SyncOperation {
    pub fn kind(&self) -> &'static str {
        match self {
            SyncOperation::Insert(_) => "INSERT",
            SyncOperation::Update(_) => "UPDATE",
            SyncOperation::Delete(_) => "DELETE",
        }
    }

    pub fn task(&self) -> &Task {
        match self {
            SyncOperation::Insert(task) | SyncOperation::Update(task) | SyncOperation::Delete(task) => {
                task
            }
        }
    }
}

/// Process-wide synchronization status, written only by the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    SyncingToRemote,
    SyncingFromRemote,
    Synced,
    Error(String),
}

impl SyncState {
    pub fn is_error(&self) -> bool {
        matches!(self, SyncState::Error(_))
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Idle => write!(f, "idle"),
            SyncState::SyncingToRemote => write!(f, "uploading"),
            SyncState::SyncingFromRemote => write!(f, "downloading"),
            SyncState::Synced => write!(f, "synced"),
            SyncState::Error(message) => write!(f, "error: {}", message),
        }
    }
}

/// Retry and scheduling knobs for the sync engine.
///
/// Front ends keep their own serializable settings and convert into this.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Failed attempts before an operation is dead-lettered; `0` retries forever
    pub max_attempts: u32,
    /// Delay before the first retry, doubled on each further failure
    pub base_backoff: Duration,
    /// Upper bound for the retry delay
    pub max_backoff: Duration,
    /// How often the worker pulls the remote snapshot; `None` disables polling
    pub pull_interval: Option<Duration>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_backoff: Duration::from_secs(5),
            max_backoff: Duration::from_secs(300),
            pull_interval: Some(Duration::from_secs(300)),
        }
    }
}

impl SyncConfig {
    /// Retry delay after `attempts` consecutive failures.
    pub fn backoff_for(&self, attempts: u32) -> Duration {
        if attempts == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempts - 1);
        self.base_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    pub fn is_exhausted(&self, attempts: u32) -> bool {
        self.max_attempts != 0 && attempts >= self.max_attempts
    }
}
