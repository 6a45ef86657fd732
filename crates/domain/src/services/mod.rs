//! Core services: connector registry, data catalog, report execution engine, and
//! advanced analytics.

pub mod analytics;
pub mod catalog;
pub mod connector;
pub mod execution;

pub use analytics::{AdvancedAnalyticsService, AnalyticsError, AnalyticsStore};
pub use catalog::{CatalogError, DataCatalog, DataMartStore};
pub use connector::{ConnectorRegistry, DataExtractionError, ModuleDataConnector};
pub use execution::{
    EngineConfig, ExecutionError, ExecutionStore, ReportExecutionEngine, ReportStore,
    ScheduleStore,
};

use thiserror::Error;

/// Error produced by a storage backend behind one of the store traits.
#[derive(Debug, Error)]
#[error("storage backend error: {0}")]
pub struct StoreError(#[from] pub anyhow::Error);

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError(err.into())
    }
}
