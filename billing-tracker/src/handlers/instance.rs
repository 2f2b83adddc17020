use crate::dtos::{CalculateRequest, CalculateResponse};
use axum::Json;
use service_core::error::AppError;
use service_core::utils::JsonBody;

/// Average CPU and RAM per hour over a run of the given duration.
pub async fn calculate(
    JsonBody(req): JsonBody<CalculateRequest>,
) -> Result<Json<CalculateResponse>, AppError> {
    let hours = req
        .duration_value
        .map(|value| req.duration_unit.to_hours(value))
        .filter(|hours| hours.is_finite() && *hours > 0.0)
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Invalid duration")))?;

    Ok(Json(CalculateResponse {
        duration_hours: format!("{:.2}", hours),
        average_cpu: format!("{:.2}", req.cpu_usage / hours),
        average_ram: format!("{:.2}", req.ram_usage / hours),
    }))
}
