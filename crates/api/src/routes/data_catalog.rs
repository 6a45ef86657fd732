//! Data catalog routes: browse sources, fields, and relationships.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::error::ApiError;
use domain::models::{DataFieldCatalog, DataRelationship, DataSourceDetails, DataSourceInfo};

/// Build the data catalog router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_data_sources))
        .route("/fields", get(get_data_fields))
        .route("/relationships", get(get_data_relationships))
        .route("/:id", get(get_data_source_details))
}

/// Browse available data sources.
async fn get_data_sources(
    State(state): State<AppState>,
) -> Result<Json<Vec<DataSourceInfo>>, ApiError> {
    Ok(Json(state.catalog.data_sources().await?))
}

/// Get details about a specific data source.
async fn get_data_source_details(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DataSourceDetails>, ApiError> {
    Ok(Json(state.catalog.source_details(&id).await?))
}

#[derive(Debug, Deserialize)]
struct FieldsQuery {
    source: Option<String>,
}

/// Get available data fields across one or all sources.
async fn get_data_fields(
    State(state): State<AppState>,
    Query(query): Query<FieldsQuery>,
) -> Result<Json<Vec<DataFieldCatalog>>, ApiError> {
    Ok(Json(
        state.catalog.data_fields(query.source.as_deref()).await?,
    ))
}

/// Get declared relationships between entities.
async fn get_data_relationships(
    State(state): State<AppState>,
) -> Result<Json<Vec<DataRelationship>>, ApiError> {
    Ok(Json(state.catalog.relationships().await?))
}
