//! Domain models for the reporting and analytics backend.

pub mod analytics;
pub mod catalog;
pub mod dashboard;
pub mod data_mart;
pub mod report;
pub mod schedule;

pub use analytics::{
    AdHocQueryRequest, AdHocQueryResult, ChurnRiskBand, CompareWith, ComparisonResult,
    CustomerChurnPrediction, ForecastPoint, ForecastRequest, ForecastResult, Insight,
    InsightDataPoint, InventoryRecommendation, KpiResult, MetricComparison, StockAction,
    TimeFrame, TimeGranularity, TrendDirection, TrendPoint, TrendResult,
};
pub use catalog::{
    DataEntityMetadata, DataFieldCatalog, DataFieldMetadata, DataRelationship,
    DataSourceDetails, DataSourceInfo, FieldType, RelationshipKind, SourceKind,
};
pub use dashboard::{
    CreateDashboardRequest, CreateWidgetRequest, DashboardDefinition, DashboardWidget,
    UpdateDashboardRequest, UpdateWidgetRequest, WidgetType, WidgetTypeInfo,
};
pub use data_mart::{DataColumnSchema, DataMartDefinition, DataMartStatus};
pub use report::{
    CreateReportRequest, ExecutionResultSet, ExecutionStatus, ExportFormat, ReportDefinition,
    ReportExecution, ReportQuery, UpdateReportRequest,
};
pub use schedule::{CreateScheduleRequest, ScheduledReport, UpdateScheduleRequest};
