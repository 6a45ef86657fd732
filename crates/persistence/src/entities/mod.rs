//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod dashboard;
pub mod data_mart;
pub mod report;
pub mod schedule;

pub use dashboard::{DashboardEntity, DashboardWidgetEntity};
pub use data_mart::{DataMartColumnEntity, DataMartEntity, DataRelationshipEntity};
pub use report::{ReportEntity, ReportExecutionEntity};
pub use schedule::ScheduledReportEntity;
