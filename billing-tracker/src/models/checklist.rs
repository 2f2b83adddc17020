use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A recurring operational check for one area on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistTask {
    pub id: String,
    pub area: String,
    pub date: DateTime<Utc>,
    pub task_name: String,
    pub description: String,
    pub is_completed: bool,
    pub checked_by: Option<String>,
    pub checked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ChecklistTask {
    pub fn new(area: &str, date: DateTime<Utc>, task_name: String, description: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            area: area.trim().to_string(),
            date,
            task_name,
            description,
            is_completed: false,
            checked_by: None,
            checked_at: None,
            created_at: Utc::now(),
        }
    }

    /// Mark complete (stamping who and when) or clear both stamps.
    pub fn set_completion(&mut self, completed: bool, checked_by: Option<String>) {
        let (checked_by, checked_at) = completion_stamp(completed, checked_by);
        self.is_completed = completed;
        self.checked_by = checked_by;
        self.checked_at = checked_at;
    }
}

/// `checkedBy` / `checkedAt` for a completion change. Completing without a
/// name records `Unknown`; un-completing clears both.
pub fn completion_stamp(
    completed: bool,
    checked_by: Option<String>,
) -> (Option<String>, Option<DateTime<Utc>>) {
    if !completed {
        return (None, None);
    }
    let name = checked_by
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());
    (Some(name), Some(Utc::now()))
}

/// Resolved checklist list filter. `date_from` is inclusive, `date_until` exclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChecklistQuery {
    pub area: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_until: Option<DateTime<Utc>>,
}

impl ChecklistQuery {
    pub fn matches(&self, task: &ChecklistTask) -> bool {
        self.area.as_ref().map_or(true, |area| &task.area == area)
            && self.date_from.map_or(true, |from| task.date >= from)
            && self.date_until.map_or(true, |until| task.date < until)
    }
}

/// Newest day first, then most recently created.
pub fn sort_newest_first(tasks: &mut [ChecklistTask]) {
    tasks.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}
