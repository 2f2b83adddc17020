use super::attachment;
use crate::billing::dates;
use crate::billing::export::{download_filename, SHORT_DATE_FORMAT};
use crate::dtos::{
    ChecklistListParams, CreateChecklistTaskRequest, MessageResponse, UpdateCompletionRequest,
};
use crate::middleware::Principal;
use crate::models::{ChecklistTask, Resource};
use crate::services::record_export;
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use service_core::error::AppError;
use service_core::utils::{JsonBody, ValidatedJson};

const CHECKLIST_HEADERS: [&str; 7] = [
    "Date",
    "Area",
    "Task Name",
    "Description",
    "Completed",
    "Checked By",
    "Checked At",
];
const CHECKED_AT_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

fn required(value: Option<String>, field: &str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Missing required field: {}", field)))
}

fn task_not_found(id: &str) -> AppError {
    AppError::NotFound(anyhow::anyhow!("Task not found: {}", id))
}

#[tracing::instrument(skip(state, principal, req))]
pub async fn add_task(
    State(state): State<AppState>,
    principal: Principal,
    ValidatedJson(req): ValidatedJson<CreateChecklistTaskRequest>,
) -> Result<Json<ChecklistTask>, AppError> {
    principal.require_write(&Resource::Checklist)?;

    let area = required(req.area, "area")?;
    let raw_date = required(req.date, "date")?;
    let task_name = required(req.task_name, "taskName")?;
    let date = dates::start_of_day(dates::parse_day(&raw_date)?);

    let task = ChecklistTask::new(&area, date, task_name, req.description.unwrap_or_default());
    let task = state.checklist.insert(task).await?;
    tracing::info!(task_id = %task.id, area = %task.area, "Checklist task added");

    Ok(Json(task))
}

#[tracing::instrument(skip(state, principal))]
pub async fn list_tasks(
    State(state): State<AppState>,
    principal: Principal,
    Query(params): Query<ChecklistListParams>,
) -> Result<Json<Vec<ChecklistTask>>, AppError> {
    principal.require_read(&Resource::Checklist)?;
    let tasks = state.checklist.list(&params.resolve()?).await?;
    Ok(Json(tasks))
}

#[tracing::instrument(skip(state, principal, req))]
pub async fn update_completion(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateCompletionRequest>,
) -> Result<Json<ChecklistTask>, AppError> {
    principal.require_write(&Resource::Checklist)?;
    let task = state
        .checklist
        .set_completion(&id, req.is_completed, req.checked_by)
        .await?
        .ok_or_else(|| task_not_found(&id))?;
    Ok(Json(task))
}

#[tracing::instrument(skip(state, principal))]
pub async fn delete_task(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    principal.require_write(&Resource::Checklist)?;
    if !state.checklist.delete(&id).await? {
        return Err(task_not_found(&id));
    }
    Ok(Json(MessageResponse {
        message: "Task deleted successfully".to_string(),
    }))
}

#[tracing::instrument(skip(state, principal))]
pub async fn list_areas(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<String>>, AppError> {
    principal.require_read(&Resource::Checklist)?;
    Ok(Json(state.checklist.areas().await?))
}

#[tracing::instrument(skip(state, principal))]
pub async fn export_checklist_csv(
    State(state): State<AppState>,
    principal: Principal,
    Query(params): Query<ChecklistListParams>,
) -> Result<Response, AppError> {
    principal.require_read(&Resource::Checklist)?;
    let tasks = state.checklist.list(&params.resolve()?).await?;
    let body = write_checklist_csv(&tasks)?;
    let filename = download_filename("checklist", params.scope(), "csv");

    record_export("checklist_csv");
    attachment("text/csv; charset=utf-8", &filename, body)
}

/// Encode tasks as CSV, header first.
pub fn write_checklist_csv(tasks: &[ChecklistTask]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(CHECKLIST_HEADERS).map_err(csv_failed)?;
    for task in tasks {
        writer.write_record([
            task.date.format(SHORT_DATE_FORMAT).to_string(),
            task.area.clone(),
            task.task_name.clone(),
            task.description.clone(),
            (if task.is_completed { "Yes" } else { "No" }).to_string(),
            task.checked_by.clone().unwrap_or_default(),
            task.checked_at
                .map(|at| at.format(CHECKED_AT_FORMAT).to_string())
                .unwrap_or_default(),
        ])
        .map_err(csv_failed)?;
    }

    writer
        .into_inner()
        .map_err(|e| csv_failed(e.into_error().into()))
}

fn csv_failed(e: csv::Error) -> AppError {
    AppError::InternalError(anyhow::anyhow!("Failed to write checklist CSV: {}", e))
}
