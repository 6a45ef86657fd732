//! Report definition and execution domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::validation::{validate_description, validate_display_name};
use uuid::Uuid;
use validator::Validate;

/// The parameterized query a report runs against catalog entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReportQuery {
    /// Catalog source id (lowercased module name or `mart_<name>`).
    pub source_id: String,
    /// Target entity within the source.
    pub entity_name: String,
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub measures: Vec<String>,
    /// Opaque filter expression forwarded to the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

/// A stored report definition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ReportDefinition {
    pub report_id: Uuid,
    pub report_name: String,
    pub description: String,
    pub category: String,
    pub owner: String,
    pub query: ReportQuery,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a report.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReportRequest {
    #[validate(custom(function = "validate_display_name"))]
    pub report_name: String,
    #[serde(default)]
    #[validate(custom(function = "validate_description"))]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub owner: String,
    pub query: ReportQuery,
}

/// Request body for updating a report. The `report_id` must match the path id.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateReportRequest {
    pub report_id: Uuid,
    #[validate(custom(function = "validate_display_name"))]
    pub report_name: String,
    #[serde(default)]
    #[validate(custom(function = "validate_description"))]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub query: ReportQuery,
}

/// Status of one report execution.
///
/// Transitions are monotonic: `Queued -> Running -> {Succeeded, Failed, Cancelled}`.
/// Terminal states are immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Queued => "queued",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Succeeded => "succeeded",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Succeeded | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }
}

impl From<&str> for ExecutionStatus {
    fn from(s: &str) -> Self {
        match s {
            "running" => ExecutionStatus::Running,
            "succeeded" => ExecutionStatus::Succeeded,
            "failed" => ExecutionStatus::Failed,
            "cancelled" => ExecutionStatus::Cancelled,
            _ => ExecutionStatus::Queued,
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One asynchronous run of a report definition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ReportExecution {
    pub execution_id: Uuid,
    pub report_id: Uuid,
    pub user_id: String,
    pub parameters: serde_json::Value,
    pub status: ExecutionStatus,
    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ReportExecution {
    /// Creates a fresh queued execution record for a report run.
    pub fn queued(report_id: Uuid, parameters: serde_json::Value, user_id: &str) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            report_id,
            user_id: user_id.to_string(),
            parameters,
            status: ExecutionStatus::Queued,
            queued_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error_message: None,
        }
    }
}

/// The materialized result set of a succeeded execution.
///
/// Row shape is defined by the originating entity's schema, not by this core;
/// rows are kept as opaque JSON objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExecutionResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Value>,
    pub row_count: usize,
}

/// Supported export formats for execution results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_status_terminal() {
        assert!(!ExecutionStatus::Queued.is_terminal());
        assert!(!ExecutionStatus::Running.is_terminal());
        assert!(ExecutionStatus::Succeeded.is_terminal());
        assert!(ExecutionStatus::Failed.is_terminal());
        assert!(ExecutionStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_execution_status_roundtrip() {
        for status in [
            ExecutionStatus::Queued,
            ExecutionStatus::Running,
            ExecutionStatus::Succeeded,
            ExecutionStatus::Failed,
            ExecutionStatus::Cancelled,
        ] {
            assert_eq!(ExecutionStatus::from(status.as_str()), status);
        }
    }

    #[test]
    fn test_queued_execution_defaults() {
        let report_id = Uuid::new_v4();
        let execution =
            ReportExecution::queued(report_id, serde_json::json!({"year": 2024}), "jdoe");
        assert_eq!(execution.report_id, report_id);
        assert_eq!(execution.status, ExecutionStatus::Queued);
        assert!(execution.started_at.is_none());
        assert!(execution.completed_at.is_none());
        assert!(execution.error_message.is_none());
    }

    #[test]
    fn test_distinct_execution_ids() {
        let report_id = Uuid::new_v4();
        let a = ReportExecution::queued(report_id, serde_json::Value::Null, "jdoe");
        let b = ReportExecution::queued(report_id, serde_json::Value::Null, "jdoe");
        assert_ne!(a.execution_id, b.execution_id);
    }

    #[test]
    fn test_export_format_parse() {
        assert_eq!(ExportFormat::parse("csv"), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::parse("JSON"), Some(ExportFormat::Json));
        assert_eq!(ExportFormat::parse("xlsx"), None);
    }

    #[test]
    fn test_create_report_request_validation() {
        let request = CreateReportRequest {
            report_name: "".to_string(),
            description: String::new(),
            category: "sales".to_string(),
            owner: "jdoe".to_string(),
            query: ReportQuery {
                source_id: "crm".to_string(),
                entity_name: "Customers".to_string(),
                dimensions: vec![],
                measures: vec![],
                filter: None,
            },
        };
        assert!(validator::Validate::validate(&request).is_err());
    }
}
