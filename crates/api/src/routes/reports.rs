//! Report routes: definition CRUD, execution, results, export, and schedules.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::export;
use domain::models::{
    CreateReportRequest, CreateScheduleRequest, ExportFormat, ReportDefinition, ReportExecution,
    ScheduledReport, UpdateReportRequest, UpdateScheduleRequest,
};
use domain::services::{ReportStore, ScheduleStore};

/// Build the reports router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_reports).post(create_report))
        .route("/categories", get(get_categories))
        .route(
            "/:id",
            get(get_report).put(update_report).delete(delete_report),
        )
        .route("/:id/execute", post(execute_report))
        .route("/:id/executions", get(get_report_executions))
        .route("/:id/schedules", get(list_schedules).post(create_schedule))
        .route(
            "/:id/schedules/:schedule_id",
            axum::routing::put(update_schedule).delete(delete_schedule),
        )
        .route("/executions/:id/status", get(get_execution_status))
        .route("/executions/:id/results", get(get_execution_results))
        .route("/executions/:id/export", get(export_execution))
        .route("/executions/:id/cancel", post(cancel_execution))
}

/// Get all reports.
async fn list_reports(
    State(state): State<AppState>,
) -> Result<Json<Vec<ReportDefinition>>, ApiError> {
    Ok(Json(state.reports.list_reports().await?))
}

/// Get a report by id.
async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReportDefinition>, ApiError> {
    let report = state
        .reports
        .report_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Report with id {id} not found")))?;
    Ok(Json(report))
}

/// Create a new report.
async fn create_report(
    State(state): State<AppState>,
    Json(request): Json<CreateReportRequest>,
) -> Result<(StatusCode, Json<ReportDefinition>), ApiError> {
    request.validate()?;

    let now = Utc::now();
    let report = ReportDefinition {
        report_id: Uuid::new_v4(),
        report_name: request.report_name,
        description: request.description,
        category: request.category,
        owner: request.owner,
        query: request.query,
        created_at: now,
        updated_at: now,
    };

    state.reports.create_report(&report).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// Update an existing report.
async fn update_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateReportRequest>,
) -> Result<StatusCode, ApiError> {
    request.validate()?;

    if id != request.report_id {
        return Err(ApiError::Validation(
            "Report id in path does not match report id in body".to_string(),
        ));
    }

    let existing = state
        .reports
        .report_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Report with id {id} not found")))?;

    let updated = ReportDefinition {
        report_id: id,
        report_name: request.report_name,
        description: request.description,
        category: request.category,
        owner: existing.owner,
        query: request.query,
        created_at: existing.created_at,
        updated_at: Utc::now(),
    };

    if !state.reports.update_report(&updated).await? {
        return Err(ApiError::NotFound(format!("Report with id {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a report.
async fn delete_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !state.reports.delete_report(id).await? {
        return Err(ApiError::NotFound(format!("Report with id {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Get all report categories.
async fn get_categories(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.reports.categories().await?))
}

/// Execute a report asynchronously; answers 202 with the new execution id.
async fn execute_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Option<Json<serde_json::Value>>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let parameters = body.map(|Json(v)| v).unwrap_or_else(|| serde_json::json!({}));
    let user_id = headers
        .get("X-User-Id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("anonymous");

    let execution_id = state.engine.execute_report(id, parameters, user_id).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "execution_id": execution_id })),
    ))
}

/// Get the status of a report execution. Cheap and safe to poll.
async fn get_execution_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReportExecution>, ApiError> {
    Ok(Json(state.engine.execution_status(id).await?))
}

/// Get the results of a succeeded report execution.
async fn get_execution_results(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    Ok(Json(state.engine.execution_results(id).await?))
}

/// Cancel a non-terminal execution.
async fn cancel_execution(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.engine.cancel_execution(id).await?;
    Ok(StatusCode::ACCEPTED)
}

/// Get the execution history for a report.
async fn get_report_executions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ReportExecution>>, ApiError> {
    Ok(Json(state.engine.executions_for_report(id).await?))
}

#[derive(Debug, Deserialize)]
struct ExportQuery {
    format: Option<String>,
}

/// Download a succeeded execution's result set as CSV or JSON.
async fn export_execution(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let format_param = query.format.as_deref().unwrap_or("csv");
    let format = ExportFormat::parse(format_param).ok_or_else(|| {
        ApiError::Validation(format!(
            "Unsupported export format: {format_param}. Valid values are: csv, json"
        ))
    })?;

    let results = state.engine.execution_results(id).await?;
    let rendered = export::render(&results, format)
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    let filename = format!("execution_{id}.{}", format.as_str());
    Response::builder()
        .header(header::CONTENT_TYPE, format.content_type())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from(rendered))
        .map_err(|err| {
            tracing::error!(error = %err, "Failed to build export response");
            ApiError::Internal("Failed to build export response".to_string())
        })
}

/// List the schedules attached to a report.
async fn list_schedules(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ScheduledReport>>, ApiError> {
    require_report(&state, id).await?;
    Ok(Json(state.schedules.schedules_for_report(id).await?))
}

/// Attach a new schedule to a report.
async fn create_schedule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<ScheduledReport>), ApiError> {
    request.validate()?;
    require_report(&state, id).await?;

    let schedule = ScheduledReport {
        schedule_id: Uuid::new_v4(),
        report_id: id,
        schedule: request.schedule,
        format: request.format,
        recipients: request.recipients,
        subject: request.subject,
        enabled: request.enabled,
        last_run_date: None,
        // Picked up by the next scheduler scan.
        next_run_date: None,
        created_at: Utc::now(),
    };

    state.schedules.create_schedule(&schedule).await?;
    Ok((StatusCode::CREATED, Json(schedule)))
}

/// Update a schedule.
async fn update_schedule(
    State(state): State<AppState>,
    Path((id, schedule_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateScheduleRequest>,
) -> Result<StatusCode, ApiError> {
    request.validate()?;

    let existing = state
        .schedules
        .schedule_by_id(id, schedule_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Schedule with id {schedule_id} not found")))?;

    let updated = ScheduledReport {
        schedule: request.schedule,
        format: request.format,
        recipients: request.recipients,
        subject: request.subject,
        enabled: request.enabled,
        ..existing
    };

    if !state.schedules.update_schedule(&updated).await? {
        return Err(ApiError::NotFound(format!(
            "Schedule with id {schedule_id} not found"
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Detach a schedule from a report.
async fn delete_schedule(
    State(state): State<AppState>,
    Path((id, schedule_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    if !state.schedules.delete_schedule(id, schedule_id).await? {
        return Err(ApiError::NotFound(format!(
            "Schedule with id {schedule_id} not found"
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn require_report(state: &AppState, id: Uuid) -> Result<(), ApiError> {
    state
        .reports
        .report_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Report with id {id} not found")))?;
    Ok(())
}
