use axum::{middleware, routing::get, Router};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use domain::services::{
    AdvancedAnalyticsService, ConnectorRegistry, DataCatalog, EngineConfig,
    ReportExecutionEngine,
};
use persistence::repositories::{
    AnalyticsRepository, DashboardRepository, DataMartRepository, ReportRepository,
    ScheduleRepository,
};

use crate::config::Config;
use crate::connectors::{
    CrmDataConnector, FinancialDataConnector, PartsDataConnector, SalesDataConnector,
    ServiceDataConnector,
};
use crate::middleware::{metrics_handler, metrics_middleware, trace_id};
use crate::routes::{analytics, dashboards, data_catalog, health, reports};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub connectors: Arc<ConnectorRegistry>,
    pub catalog: Arc<DataCatalog>,
    pub engine: Arc<ReportExecutionEngine>,
    pub analytics: Arc<AdvancedAnalyticsService>,
    pub reports: Arc<ReportRepository>,
    pub schedules: Arc<ScheduleRepository>,
    pub dashboards: DashboardRepository,
}

/// Builds the connector registry from configured module base URLs.
pub fn build_registry(config: &Config) -> ConnectorRegistry {
    let timeout_ms = config.engine.connector_timeout_ms;
    let connections = &config.module_connections;

    let mut registry = ConnectorRegistry::new();
    registry.register(Arc::new(CrmDataConnector::new(
        &connections.crm.api_base_url,
        timeout_ms,
    )));
    registry.register(Arc::new(FinancialDataConnector::new(
        &connections.financial_management.api_base_url,
        timeout_ms,
    )));
    registry.register(Arc::new(PartsDataConnector::new(
        &connections.parts_management.api_base_url,
        timeout_ms,
    )));
    registry.register(Arc::new(ServiceDataConnector::new(
        &connections.service_management.api_base_url,
        timeout_ms,
    )));
    registry.register(Arc::new(SalesDataConnector::new(
        &connections.sales_management.api_base_url,
        timeout_ms,
    )));
    registry
}

/// Wires repositories, connectors, and the core services into the shared state.
pub fn build_state(config: Config, pool: PgPool) -> AppState {
    let config = Arc::new(config);
    let connectors = Arc::new(build_registry(&config));

    let marts = Arc::new(DataMartRepository::new(pool.clone()));
    let reports = Arc::new(ReportRepository::new(pool.clone()));
    let schedules = Arc::new(ScheduleRepository::new(pool.clone()));
    let analytics_store = Arc::new(AnalyticsRepository::new(pool.clone()));

    let catalog = Arc::new(DataCatalog::new(Arc::clone(&connectors), marts.clone()));

    let engine = Arc::new(ReportExecutionEngine::new(
        reports.clone(),
        reports.clone(),
        Arc::clone(&connectors),
        marts.clone(),
        EngineConfig {
            execution_timeout: Duration::from_secs(config.engine.execution_timeout_secs),
        },
    ));

    let analytics = Arc::new(AdvancedAnalyticsService::new(analytics_store, marts));

    AppState {
        dashboards: DashboardRepository::new(pool.clone()),
        pool,
        config,
        connectors,
        catalog,
        engine,
        analytics,
        reports,
        schedules,
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let api_routes = Router::new()
        .nest("/api/data-catalog", data_catalog::router())
        .nest("/api/reports", reports::router())
        .nest("/api/dashboards", dashboards::router())
        .nest("/api/analytics", analytics::router());

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
