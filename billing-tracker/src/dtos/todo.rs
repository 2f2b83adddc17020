use crate::billing::dates;
use crate::models::{TodoPriority, TodoQuery, TodoStatus, TodoUpdate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use service_core::error::AppError;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoRequest {
    #[validate(length(max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub status: Option<TodoStatus>,
    pub priority: Option<TodoPriority>,
    pub assigned_to: Option<String>,
    pub due_date: Option<String>,
    #[validate(length(max = 20))]
    pub tags: Option<Vec<String>>,
}

/// Partial update. For `assignedTo` and `dueDate`, an explicit `null` clears
/// the field while omitting it leaves it untouched.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodoRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub status: Option<TodoStatus>,
    pub priority: Option<TodoPriority>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub assigned_to: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub due_date: Option<Option<String>>,
    #[validate(length(max = 20))]
    pub tags: Option<Vec<String>>,
}

fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl UpdateTodoRequest {
    pub fn into_update(self) -> Result<TodoUpdate, AppError> {
        let due_date = match self.due_date {
            Some(Some(raw)) => Some(parse_due_date(&raw)?),
            Some(None) => Some(None),
            None => None,
        };
        Ok(TodoUpdate {
            title: self.title,
            description: self.description,
            status: self.status,
            priority: self.priority,
            assigned_to: self.assigned_to.map(|assignee| assignee.filter(|id| !id.is_empty())),
            due_date,
            tags: self.tags,
        })
    }
}

/// Blank due dates clear the field.
pub fn parse_due_date(raw: &str) -> Result<Option<DateTime<Utc>>, AppError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(raw.trim()) {
        return Ok(Some(at.with_timezone(&Utc)));
    }
    Ok(Some(dates::start_of_day(dates::parse_day(raw)?)))
}

#[derive(Debug, Default, Deserialize)]
pub struct TodoListParams {
    pub status: Option<String>,
    pub priority: Option<String>,
}

impl TodoListParams {
    pub fn resolve(&self) -> Result<TodoQuery, AppError> {
        let status = super::checklist::present(&self.status)
            .map(str::parse::<TodoStatus>)
            .transpose()
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?;
        let priority = super::checklist::present(&self.priority)
            .map(str::parse::<TodoPriority>)
            .transpose()
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?;
        Ok(TodoQuery { status, priority })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_and_missing_fields_differ() {
        let cleared: UpdateTodoRequest =
            serde_json::from_str(r#"{"assignedTo": null}"#).unwrap();
        assert_eq!(cleared.assigned_to, Some(None));

        let untouched: UpdateTodoRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(untouched.assigned_to, None);
    }

    #[test]
    fn due_dates_accept_days_and_timestamps() {
        let day = parse_due_date("2024-03-05").unwrap().unwrap();
        assert_eq!(day.to_rfc3339(), "2024-03-05T00:00:00+00:00");

        let stamp = parse_due_date("2024-03-05T10:30:00Z").unwrap().unwrap();
        assert_eq!(stamp.to_rfc3339(), "2024-03-05T10:30:00+00:00");

        assert!(parse_due_date("").unwrap().is_none());
        assert!(parse_due_date("soon").is_err());
    }

    #[test]
    fn list_params_reject_unknown_status() {
        let params = TodoListParams {
            status: Some("blocked".to_string()),
            priority: None,
        };
        assert!(params.resolve().is_err());

        let blank = TodoListParams {
            status: Some(String::new()),
            priority: Some("HIGH".to_string()),
        };
        let query = blank.resolve().unwrap();
        assert_eq!(query.status, None);
        assert_eq!(query.priority, Some(TodoPriority::High));
    }
}
