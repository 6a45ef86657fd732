//! Advanced analytics routes: KPIs, trends, forecasts, comparisons, ad-hoc
//! queries, insights, and domain recommendations.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::error::ApiError;
use domain::models::{
    AdHocQueryRequest, AdHocQueryResult, CompareWith, ComparisonResult,
    CustomerChurnPrediction, ForecastRequest, ForecastResult, Insight,
    InventoryRecommendation, KpiResult, TimeFrame, TrendResult,
};

/// Build the analytics router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/kpis", get(get_kpis))
        .route("/trends/:metric_id", get(get_trend_analysis))
        .route("/forecast", post(generate_forecast))
        .route("/comparisons", get(get_period_comparison))
        .route("/ad-hoc", post(execute_ad_hoc_query))
        .route("/insights", get(get_insights))
        .route("/recommendations/inventory", get(get_inventory_recommendations))
        .route("/predictions/customer-churn", get(get_churn_predictions))
}

#[derive(Debug, Deserialize)]
struct KpiQuery {
    department: Option<String>,
}

/// KPIs for a department, or all departments.
async fn get_kpis(
    State(state): State<AppState>,
    Query(query): Query<KpiQuery>,
) -> Result<Json<Vec<KpiResult>>, ApiError> {
    let department = query.department.as_deref().unwrap_or("all");
    Ok(Json(state.analytics.kpis(department).await?))
}

#[derive(Debug, Deserialize)]
struct TrendQuery {
    time_frame: Option<String>,
    compare_with: Option<String>,
}

/// Trend analysis for one metric.
async fn get_trend_analysis(
    State(state): State<AppState>,
    Path(metric_id): Path<String>,
    Query(query): Query<TrendQuery>,
) -> Result<Json<TrendResult>, ApiError> {
    let time_frame_param = query.time_frame.as_deref().unwrap_or("month");
    let time_frame = TimeFrame::parse(time_frame_param).ok_or_else(|| {
        ApiError::Validation(format!(
            "Invalid time frame: {time_frame_param}. Valid values are: day, week, month, quarter, year"
        ))
    })?;

    let compare_with = match query.compare_with.as_deref() {
        Some(value) => Some(CompareWith::parse(value).ok_or_else(|| {
            ApiError::Validation(format!(
                "Invalid comparison: {value}. Valid values are: previous-period, previous-year"
            ))
        })?),
        None => None,
    };

    Ok(Json(
        state
            .analytics
            .trend_analysis(&metric_id, time_frame, compare_with)
            .await?,
    ))
}

/// Generate a forecast for a metric.
async fn generate_forecast(
    State(state): State<AppState>,
    Json(request): Json<ForecastRequest>,
) -> Result<Json<ForecastResult>, ApiError> {
    Ok(Json(state.analytics.generate_forecast(&request).await?))
}

#[derive(Debug, Deserialize)]
struct ComparisonQuery {
    metric_group: String,
    current_period: String,
    previous_period: String,
}

/// Period-over-period comparison for a metric group.
async fn get_period_comparison(
    State(state): State<AppState>,
    Query(query): Query<ComparisonQuery>,
) -> Result<Json<ComparisonResult>, ApiError> {
    Ok(Json(
        state
            .analytics
            .period_comparison(
                &query.metric_group,
                &query.current_period,
                &query.previous_period,
            )
            .await?,
    ))
}

/// Execute an ad-hoc query against a data mart.
async fn execute_ad_hoc_query(
    State(state): State<AppState>,
    Json(request): Json<AdHocQueryRequest>,
) -> Result<Json<AdHocQueryResult>, ApiError> {
    Ok(Json(state.analytics.ad_hoc_query(&request).await?))
}

#[derive(Debug, Deserialize)]
struct InsightsQuery {
    area: Option<String>,
    max_results: Option<usize>,
}

/// Automated insights, ranked by significance.
async fn get_insights(
    State(state): State<AppState>,
    Query(query): Query<InsightsQuery>,
) -> Result<Json<Vec<Insight>>, ApiError> {
    let area = query.area.as_deref().unwrap_or("all");
    let max_results = query.max_results.unwrap_or(10);
    if max_results == 0 {
        return Err(ApiError::Validation(
            "max_results must be at least 1".to_string(),
        ));
    }

    Ok(Json(
        state.analytics.automated_insights(area, max_results).await?,
    ))
}

/// Inventory rebalancing recommendations.
async fn get_inventory_recommendations(
    State(state): State<AppState>,
) -> Result<Json<Vec<InventoryRecommendation>>, ApiError> {
    Ok(Json(state.analytics.inventory_recommendations().await?))
}

#[derive(Debug, Deserialize)]
struct ChurnQuery {
    min_risk_score: Option<f64>,
}

/// Customer churn predictions above a risk threshold.
async fn get_churn_predictions(
    State(state): State<AppState>,
    Query(query): Query<ChurnQuery>,
) -> Result<Json<Vec<CustomerChurnPrediction>>, ApiError> {
    let min_risk_score = query.min_risk_score.unwrap_or(0.5);
    Ok(Json(
        state.analytics.churn_predictions(min_risk_score).await?,
    ))
}
