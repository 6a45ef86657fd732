//! Scheduled report entity.

use chrono::{DateTime, Utc};
use domain::models::{ExportFormat, ScheduledReport};
use sqlx::FromRow;
use uuid::Uuid;

/// Scheduled report entity.
#[derive(Debug, Clone, FromRow)]
pub struct ScheduledReportEntity {
    pub schedule_id: Uuid,
    pub report_id: Uuid,
    pub schedule: String,
    pub format: String,
    pub recipients: serde_json::Value,
    pub subject: Option<String>,
    pub enabled: bool,
    pub last_run_date: Option<DateTime<Utc>>,
    pub next_run_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<ScheduledReportEntity> for ScheduledReport {
    fn from(entity: ScheduledReportEntity) -> Self {
        ScheduledReport {
            schedule_id: entity.schedule_id,
            report_id: entity.report_id,
            schedule: entity.schedule,
            format: ExportFormat::parse(&entity.format).unwrap_or(ExportFormat::Csv),
            recipients: entity.recipients,
            subject: entity.subject,
            enabled: entity.enabled,
            last_run_date: entity.last_run_date,
            next_run_date: entity.next_run_date,
            created_at: entity.created_at,
        }
    }
}
