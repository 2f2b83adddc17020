pub mod auth;
pub mod billing;
pub mod checklist;
pub mod health;
pub mod instance;
pub mod todo;

pub use auth::{list_users, me, signin, signup, update_permissions};
pub use billing::{
    add_record, breakdown, delete_records, export_csv, export_excel, raw_records, summary,
};
pub use checklist::{
    add_task, delete_task, export_checklist_csv, list_areas, list_tasks, update_completion,
};
pub use health::{health_check, metrics_handler, readiness_check};
pub use instance::calculate;
pub use todo::{create_todo, delete_todo, get_todo, list_todos, update_todo};

use axum::{
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use service_core::error::AppError;

/// A complete file download. The body is fully built before any header is sent.
pub(crate) fn attachment(
    content_type: &'static str,
    filename: &str,
    body: Vec<u8>,
) -> Result<Response, AppError> {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Invalid filename header: {}", e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
