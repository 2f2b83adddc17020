use super::attachment;
use crate::billing::{
    aggregate_by_resource_type, export_filename, write_csv, write_workbook, BillingFilter,
    ExportFormat, PeriodSummary, ResolvedFilter, ResourceBreakdown,
};
use crate::dtos::{BillingRecordResponse, DeleteRecordsResponse, SummaryParams};
use crate::middleware::Principal;
use crate::models::{BillingRecord, NewBillingRecord, Resource};
use crate::services::{record_export, record_inserted};
use crate::startup::AppState;
use axum::{
    extract::{Query, State},
    response::Response,
    Json,
};
use service_core::error::AppError;
use service_core::utils::JsonBody;

/// Resolve filters and check the caller may read the service.
fn authorize_read(principal: &Principal, filter: &BillingFilter) -> Result<ResolvedFilter, AppError> {
    let resolved = filter.resolve()?;
    principal.require_read(&Resource::Service(resolved.query.service.clone()))?;
    Ok(resolved)
}

#[tracing::instrument(skip(state, principal, input))]
pub async fn add_record(
    State(state): State<AppState>,
    principal: Principal,
    JsonBody(input): JsonBody<NewBillingRecord>,
) -> Result<Json<BillingRecord>, AppError> {
    let record = BillingRecord::from_new(input)?;
    principal.require_write(&Resource::Service(record.service.clone()))?;

    let record = state.records.insert(record).await?;
    record_inserted(&record.service, record.entry_type.as_str());
    tracing::info!(
        record_id = %record.id,
        service = %record.service,
        entry_type = %record.entry_type,
        "Billing record added"
    );

    Ok(Json(record))
}

/// Store-level period aggregation for the summary cards and trend chart.
#[tracing::instrument(skip(state, principal))]
pub async fn summary(
    State(state): State<AppState>,
    principal: Principal,
    Query(params): Query<SummaryParams>,
) -> Result<Json<Vec<PeriodSummary>>, AppError> {
    let resolved = authorize_read(&principal, &params.filter)?;
    let periods = state
        .records
        .aggregate_by_period(&resolved.query, params.granularity())
        .await?;
    Ok(Json(periods))
}

#[tracing::instrument(skip(state, principal))]
pub async fn raw_records(
    State(state): State<AppState>,
    principal: Principal,
    Query(filter): Query<BillingFilter>,
) -> Result<Json<Vec<BillingRecordResponse>>, AppError> {
    let resolved = authorize_read(&principal, &filter)?;
    let records = state.records.query(&resolved.query).await?;
    Ok(Json(
        records.into_iter().map(BillingRecordResponse::from).collect(),
    ))
}

/// Discounted cost per resource type per period.
#[tracing::instrument(skip(state, principal))]
pub async fn breakdown(
    State(state): State<AppState>,
    principal: Principal,
    Query(params): Query<SummaryParams>,
) -> Result<Json<ResourceBreakdown>, AppError> {
    let resolved = authorize_read(&principal, &params.filter)?;
    let records = state.records.query(&resolved.query).await?;
    Ok(Json(aggregate_by_resource_type(
        &records,
        params.granularity(),
    )))
}

async fn export_records(
    state: &AppState,
    principal: &Principal,
    filter: &BillingFilter,
) -> Result<(String, Vec<BillingRecord>), AppError> {
    let resolved = authorize_read(principal, filter)?;
    let records = state.records.query(&resolved.query).await?;
    Ok((resolved.query.service, resolved.window.apply(records)))
}

#[tracing::instrument(skip(state, principal))]
pub async fn export_csv(
    State(state): State<AppState>,
    principal: Principal,
    Query(filter): Query<BillingFilter>,
) -> Result<Response, AppError> {
    let (service, records) = export_records(&state, &principal, &filter).await?;
    let body = write_csv(&records)?;
    let filename = export_filename(&service, ExportFormat::Csv);

    record_export("csv");
    tracing::info!(service = %service, rows = records.len(), filename = %filename, "CSV export generated");
    attachment(ExportFormat::Csv.content_type(), &filename, body)
}

#[tracing::instrument(skip(state, principal))]
pub async fn export_excel(
    State(state): State<AppState>,
    principal: Principal,
    Query(filter): Query<BillingFilter>,
) -> Result<Response, AppError> {
    let (service, records) = export_records(&state, &principal, &filter).await?;
    let body = write_workbook(&records, &service)?;
    let filename = export_filename(&service, ExportFormat::Xlsx);

    record_export("xlsx");
    tracing::info!(service = %service, rows = records.len(), filename = %filename, "Spreadsheet export generated");
    attachment(ExportFormat::Xlsx.content_type(), &filename, body)
}

/// Administrative bulk delete of matching records.
#[tracing::instrument(skip(state, principal))]
pub async fn delete_records(
    State(state): State<AppState>,
    principal: Principal,
    Query(filter): Query<BillingFilter>,
) -> Result<Json<DeleteRecordsResponse>, AppError> {
    principal.require_write(&Resource::Administration)?;
    let resolved = filter.resolve()?;

    let deleted = state.records.delete_matching(&resolved.query).await?;
    tracing::warn!(
        user_id = %principal.user_id(),
        service = %resolved.query.service,
        deleted,
        "Billing records deleted"
    );

    Ok(Json(DeleteRecordsResponse { deleted }))
}
