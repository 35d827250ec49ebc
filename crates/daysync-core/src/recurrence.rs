use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};

use crate::error::CoreError;
use crate::models::{now_millis, Millis, Recurrence, RecurrenceKind, Task};
use crate::store::{LocalStore, WatermarkStore};

/// Template identity: instances are matched to their template by title and
/// recurrence value, there is no stronger link.
type SeriesKey = (String, Recurrence);

fn series_key(task: &Task) -> Option<SeriesKey> {
    task.recurrence
        .as_ref()
        .map(|recurrence| (task.title.clone(), recurrence.clone()))
}

/// Whether `recurrence` yields an instance on `day`.
///
/// `last_instance` is the latest known date for the series; it anchors custom
/// intervals and is ignored by the other kinds.
pub fn is_applicable(recurrence: &Recurrence, day: NaiveDate, last_instance: NaiveDate) -> bool {
    match recurrence.kind {
        RecurrenceKind::Daily => true,
        RecurrenceKind::Weekly => {
            let weekday = day.weekday().number_from_sunday() as u8;
            recurrence
                .days_of_week
                .as_deref()
                .is_some_and(|days| days.contains(&weekday))
        }
        RecurrenceKind::Custom => {
            let elapsed = (day - last_instance).num_days();
            elapsed > 0 && elapsed % recurrence.interval_days() == 0
        }
    }
}

/// Computes the instances missing between `watermark` (exclusive) and `today`
/// (inclusive).
///
/// Templates are the recurring rows dated on or after the watermark; rows
/// sharing a title and recurrence collapse into the earliest one. A day gets
/// an instance only when it falls after the template's own date, the pattern
/// applies, and no row with the same (title, date, recurrence) exists yet.
pub fn plan_instances(tasks: &[Task], watermark: NaiveDate, today: NaiveDate, now: Millis) -> Vec<Task> {
    let mut templates: HashMap<SeriesKey, &Task> = HashMap::new();
    for task in tasks.iter().filter(|t| t.date >= watermark) {
        if let Some(key) = series_key(task) {
            templates
                .entry(key)
                .and_modify(|kept| {
                    if task.date < kept.date {
                        *kept = task;
                    }
                })
                .or_insert(task);
        }
    }
    if templates.is_empty() {
        return Vec::new();
    }

    let mut existing: HashSet<(SeriesKey, NaiveDate)> = HashSet::new();
    let mut last_instance: HashMap<SeriesKey, NaiveDate> = HashMap::new();
    for task in tasks {
        if let Some(key) = series_key(task) {
            last_instance
                .entry(key.clone())
                .and_modify(|date| *date = (*date).max(task.date))
                .or_insert(task.date);
            existing.insert((key, task.date));
        }
    }

    // Deterministic output order regardless of hash iteration.
    let mut ordered: Vec<(SeriesKey, &Task)> = templates.into_iter().collect();
    ordered.sort_by(|(_, a), (_, b)| a.date.cmp(&b.date).then_with(|| a.title.cmp(&b.title)));

    let mut created = Vec::new();
    let mut day = watermark;
    while day < today {
        let Some(next) = day.succ_opt() else { break };
        day = next;

        for (key, template) in &ordered {
            if day <= template.date {
                continue;
            }
            let last = last_instance.get(key).copied().unwrap_or(template.date);
            if !is_applicable(&key.1, day, last) {
                continue;
            }
            if !existing.insert((key.clone(), day)) {
                continue;
            }
            last_instance.insert(key.clone(), last.max(day));
            created.push(Task {
                local_id: 0,
                remote_id: None,
                title: template.title.clone(),
                description: template.description.clone(),
                date: day,
                is_done: false,
                created_at: now,
                updated_at: now,
                recurrence: template.recurrence.clone(),
                expected_hours: template.expected_hours,
            });
        }
    }
    created
}

/// Outcome of one materialization pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MaterializationReport {
    /// Newly stored instances, with their assigned local ids.
    pub created: Vec<Task>,
    pub watermark: NaiveDate,
}

/// Expands recurring templates into dated instances up to a given day, exactly once.
pub struct RecurrenceMaterializer<L> {
    local: Arc<L>,
}

impl<L: LocalStore + WatermarkStore> RecurrenceMaterializer<L> {
    pub fn new(local: Arc<L>) -> Self {
        Self { local }
    }

    /// Backfills instances for every day after the stored watermark through `today`.
    ///
    /// `on_created` sees each instance right after it is stored. The watermark
    /// is written only once every day has been processed, so an interrupted
    /// run re-checks the same range next time instead of skipping days.
    pub async fn run<F>(&self, today: NaiveDate, mut on_created: F) -> Result<MaterializationReport, CoreError>
    where
        F: FnMut(&Task) + Send,
    {
        let watermark = self.local.load_watermark().await?.unwrap_or(today);
        tracing::debug!(%watermark, %today, "checking recurring tasks");

        if watermark > today {
            tracing::warn!(%watermark, %today, "watermark is ahead of today, leaving it in place");
            return Ok(MaterializationReport {
                created: Vec::new(),
                watermark,
            });
        }

        let mut created = Vec::new();
        if watermark < today {
            let tasks = self.local.query_all().await?;
            for mut instance in plan_instances(&tasks, watermark, today, now_millis()) {
                instance.local_id = self.local.insert(&instance).await?;
                on_created(&instance);
                created.push(instance);
            }
        }

        self.local.store_watermark(today).await?;
        if !created.is_empty() {
            tracing::info!(count = created.len(), %today, "materialized recurring task instances");
        }
        Ok(MaterializationReport {
            created,
            watermark: today,
        })
    }
}
