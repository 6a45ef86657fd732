//! Scheduled report domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::report::ExportFormat;

/// A recurring execution schedule for a report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ScheduledReport {
    pub schedule_id: Uuid,
    pub report_id: Uuid,
    /// Cron expression controlling when the report runs.
    pub schedule: String,
    pub format: ExportFormat,
    /// Delivery targets, stored opaquely (email addresses, webhook URLs).
    pub recipients: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub enabled: bool,
    pub last_run_date: Option<DateTime<Utc>>,
    pub next_run_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Request body for creating a schedule.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateScheduleRequest {
    #[validate(length(min = 1, max = 100, message = "Schedule expression is required"))]
    pub schedule: String,
    pub format: ExportFormat,
    #[serde(default = "default_recipients")]
    pub recipients: serde_json::Value,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// Request body for updating a schedule.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateScheduleRequest {
    #[validate(length(min = 1, max = 100, message = "Schedule expression is required"))]
    pub schedule: String,
    pub format: ExportFormat,
    #[serde(default = "default_recipients")]
    pub recipients: serde_json::Value,
    #[serde(default)]
    pub subject: Option<String>,
    pub enabled: bool,
}

fn default_recipients() -> serde_json::Value {
    serde_json::json!([])
}

fn default_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_schedule_request_validation() {
        let request: CreateScheduleRequest =
            serde_json::from_str(r#"{"schedule": "0 6 * * 1", "format": "csv"}"#).unwrap();
        assert!(validator::Validate::validate(&request).is_ok());
        assert!(request.enabled);
        assert_eq!(request.recipients, serde_json::json!([]));

        let request: CreateScheduleRequest =
            serde_json::from_str(r#"{"schedule": "", "format": "json"}"#).unwrap();
        assert!(validator::Validate::validate(&request).is_err());
    }
}
