use crate::dtos::todo::parse_due_date;
use crate::dtos::{CreateTodoRequest, MessageResponse, TodoListParams, UpdateTodoRequest};
use crate::middleware::Principal;
use crate::models::{Resource, TodoTask};
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use service_core::error::AppError;
use service_core::utils::ValidatedJson;

fn todo_not_found(id: &str) -> AppError {
    AppError::NotFound(anyhow::anyhow!("Todo not found: {}", id))
}

#[tracing::instrument(skip(state, principal, req))]
pub async fn create_todo(
    State(state): State<AppState>,
    principal: Principal,
    ValidatedJson(req): ValidatedJson<CreateTodoRequest>,
) -> Result<Json<TodoTask>, AppError> {
    principal.require_write(&Resource::Kanban)?;

    let title = req
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Title is required")))?;

    let mut task = TodoTask::new(title);
    task.description = req.description.unwrap_or_default();
    task.status = req.status.unwrap_or_default();
    task.priority = req.priority.unwrap_or_default();
    task.assign(
        req.assigned_to.filter(|id| !id.is_empty()),
        principal.user_id(),
    );
    task.due_date = match req.due_date {
        Some(raw) => parse_due_date(&raw)?,
        None => None,
    };
    task.tags = req.tags.unwrap_or_default();

    let task = state.todos.insert(task).await?;
    tracing::info!(todo_id = %task.id, user_id = %principal.user_id(), "Todo created");
    Ok(Json(task))
}

#[tracing::instrument(skip(state, principal))]
pub async fn list_todos(
    State(state): State<AppState>,
    principal: Principal,
    Query(params): Query<TodoListParams>,
) -> Result<Json<Vec<TodoTask>>, AppError> {
    principal.require_read(&Resource::Kanban)?;
    Ok(Json(state.todos.list(&params.resolve()?).await?))
}

#[tracing::instrument(skip(state, principal))]
pub async fn get_todo(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<TodoTask>, AppError> {
    principal.require_read(&Resource::Kanban)?;
    let task = state
        .todos
        .get(&id)
        .await?
        .ok_or_else(|| todo_not_found(&id))?;
    Ok(Json(task))
}

#[tracing::instrument(skip(state, principal, req))]
pub async fn update_todo(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateTodoRequest>,
) -> Result<Json<TodoTask>, AppError> {
    principal.require_write(&Resource::Kanban)?;

    let update = req.into_update()?;
    let task = state
        .todos
        .update(&id, update, principal.user_id())
        .await?
        .ok_or_else(|| todo_not_found(&id))?;
    Ok(Json(task))
}

#[tracing::instrument(skip(state, principal))]
pub async fn delete_todo(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    principal.require_write(&Resource::Kanban)?;
    if !state.todos.delete(&id).await? {
        return Err(todo_not_found(&id));
    }
    Ok(Json(MessageResponse {
        message: "Todo deleted successfully".to_string(),
    }))
}
