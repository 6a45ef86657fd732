//! Dashboard routes: dashboard CRUD plus widget sub-resources.
//!
//! Widget lifecycle is independent CRUD; adding, updating, or removing a widget
//! never cascades into report executions.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use domain::models::{
    CreateDashboardRequest, CreateWidgetRequest, DashboardDefinition, DashboardWidget,
    UpdateDashboardRequest, UpdateWidgetRequest, WidgetTypeInfo,
};

/// Build the dashboards router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_dashboards).post(create_dashboard))
        .route("/widgets", get(get_widget_types))
        .route(
            "/:id",
            get(get_dashboard)
                .put(update_dashboard)
                .delete(delete_dashboard),
        )
        .route("/:id/widgets", post(add_widget))
        .route(
            "/:id/widgets/:widget_id",
            put(update_widget).delete(delete_widget),
        )
}

/// Get all dashboards.
async fn list_dashboards(
    State(state): State<AppState>,
) -> Result<Json<Vec<DashboardDefinition>>, ApiError> {
    Ok(Json(state.dashboards.list_dashboards().await?))
}

/// Get a dashboard by id, widgets included.
async fn get_dashboard(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DashboardDefinition>, ApiError> {
    let dashboard = state
        .dashboards
        .dashboard_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Dashboard with id {id} not found")))?;
    Ok(Json(dashboard))
}

/// Create a new dashboard.
async fn create_dashboard(
    State(state): State<AppState>,
    Json(request): Json<CreateDashboardRequest>,
) -> Result<(StatusCode, Json<DashboardDefinition>), ApiError> {
    request.validate()?;
    let dashboard = state.dashboards.create_dashboard(&request).await?;
    Ok((StatusCode::CREATED, Json(dashboard)))
}

/// Update an existing dashboard.
async fn update_dashboard(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateDashboardRequest>,
) -> Result<StatusCode, ApiError> {
    request.validate()?;

    if id != request.dashboard_id {
        return Err(ApiError::Validation(
            "Dashboard id in path does not match dashboard id in body".to_string(),
        ));
    }

    if !state.dashboards.update_dashboard(&request).await? {
        return Err(ApiError::NotFound(format!(
            "Dashboard with id {id} not found"
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a dashboard and its widgets.
async fn delete_dashboard(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !state.dashboards.delete_dashboard(id).await? {
        return Err(ApiError::NotFound(format!(
            "Dashboard with id {id} not found"
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// The fixed catalog of available widget types.
async fn get_widget_types() -> Json<Vec<WidgetTypeInfo>> {
    Json(WidgetTypeInfo::catalog())
}

/// Add a widget to a dashboard.
async fn add_widget(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateWidgetRequest>,
) -> Result<(StatusCode, Json<DashboardWidget>), ApiError> {
    request.validate()?;

    let widget = state
        .dashboards
        .add_widget(id, &request)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Dashboard with id {id} not found")))?;
    Ok((StatusCode::CREATED, Json(widget)))
}

/// Update a widget on a dashboard.
async fn update_widget(
    State(state): State<AppState>,
    Path((id, widget_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateWidgetRequest>,
) -> Result<StatusCode, ApiError> {
    request.validate()?;

    if !state.dashboards.update_widget(id, widget_id, &request).await? {
        return Err(ApiError::NotFound(format!(
            "Widget with id {widget_id} not found"
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Remove a widget from a dashboard.
async fn delete_widget(
    State(state): State<AppState>,
    Path((id, widget_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    if !state.dashboards.delete_widget(id, widget_id).await? {
        return Err(ApiError::NotFound(format!(
            "Widget with id {widget_id} not found"
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}
