use crate::billing::{dates, BillingError};
use crate::models::ChecklistQuery;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateChecklistTaskRequest {
    #[validate(length(max = 100))]
    pub area: Option<String>,
    pub date: Option<String>,
    #[validate(length(max = 200))]
    pub task_name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistListParams {
    pub area: Option<String>,
    pub date: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl ChecklistListParams {
    /// `date` selects one day; otherwise `startDate`/`endDate` bound the
    /// range with the end day fully included.
    pub fn resolve(&self) -> Result<ChecklistQuery, BillingError> {
        let mut query = ChecklistQuery {
            area: present(&self.area).map(str::to_string),
            ..Default::default()
        };

        if let Some(date) = present(&self.date) {
            let day = dates::parse_day(date)?;
            query.date_from = Some(dates::start_of_day(day));
            query.date_until = Some(dates::start_of_day(dates::next_day(day)?));
            return Ok(query);
        }

        if let Some(start) = present(&self.start_date) {
            query.date_from = Some(dates::start_of_day(dates::parse_day(start)?));
        }
        if let Some(end) = present(&self.end_date) {
            let day = dates::parse_day(end)?;
            query.date_until = Some(dates::start_of_day(dates::next_day(day)?));
        }
        Ok(query)
    }

    /// Scope label used in export filenames.
    pub fn scope(&self) -> &str {
        present(&self.area).unwrap_or("all")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCompletionRequest {
    pub is_completed: bool,
    pub checked_by: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
