//! Repository implementations for database operations.

pub mod analytics;
pub mod dashboard;
pub mod data_mart;
pub mod report;
pub mod schedule;

pub use analytics::AnalyticsRepository;
pub use dashboard::DashboardRepository;
pub use data_mart::DataMartRepository;
pub use report::ReportRepository;
pub use schedule::ScheduleRepository;
