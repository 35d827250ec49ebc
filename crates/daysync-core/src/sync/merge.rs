//! Inbound reconciliation of a remote snapshot against the local table.
//!
//! The plan is additive and corrective only: remote records either become new
//! local rows or overwrite a matched row when strictly newer. Local rows the
//! remote has never seen are never touched.

use std::collections::HashMap;

use crate::models::{LocalId, Task};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct MergePlan {
    /// Remote records with no local counterpart, `local_id` reset to `0`.
    pub inserts: Vec<Task>,
    /// Remote records that win over a local row, carrying that row's `local_id`.
    pub updates: Vec<Task>,
}

impl MergePlan {
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty()
    }
}

/// Finds the local row a remote record refers to.
///
/// A remote id match wins. Otherwise the record's originating local id is
/// tried, but only against a row that has not been bound to a different
/// remote document, since that row is a different task.
fn find_match<'a>(
    remote: &Task,
    by_remote_id: &HashMap<&str, &'a Task>,
    by_local_id: &HashMap<LocalId, &'a Task>,
) -> Option<&'a Task> {
    if let Some(found) = remote.remote_id.as_deref().and_then(|id| by_remote_id.get(id)) {
        return Some(found);
    }
    if remote.local_id == 0 {
        return None;
    }
    by_local_id
        .get(&remote.local_id)
        .copied()
        .filter(|local| local.remote_id.is_none() || local.remote_id == remote.remote_id)
}

/// Last-write-wins plan: remote replaces local only when strictly newer.
pub fn plan_merge(local: &[Task], remote: &[Task]) -> MergePlan {
    let by_local_id: HashMap<LocalId, &Task> = local.iter().map(|t| (t.local_id, t)).collect();
    let by_remote_id: HashMap<&str, &Task> = local
        .iter()
        .filter_map(|t| t.remote_id.as_deref().map(|id| (id, t)))
        .collect();

    let mut plan = MergePlan::default();
    for record in remote {
        match find_match(record, &by_remote_id, &by_local_id) {
            None => plan.inserts.push(Task {
                local_id: 0,
                ..record.clone()
            }),
            Some(existing) if existing.updated_at < record.updated_at => plan.updates.push(Task {
                local_id: existing.local_id,
                ..record.clone()
            }),
            Some(_) => {}
        }
    }
    plan
}
