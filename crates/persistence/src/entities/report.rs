//! Report and execution entities.

use chrono::{DateTime, Utc};
use domain::models::{ExecutionStatus, ReportDefinition, ReportExecution, ReportQuery};
use sqlx::FromRow;
use uuid::Uuid;

/// Report definition entity.
#[derive(Debug, Clone, FromRow)]
pub struct ReportEntity {
    pub report_id: Uuid,
    pub report_name: String,
    pub description: String,
    pub category: String,
    pub owner: String,
    pub query: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ReportEntity> for ReportDefinition {
    type Error = serde_json::Error;

    fn try_from(entity: ReportEntity) -> Result<Self, Self::Error> {
        let query: ReportQuery = serde_json::from_value(entity.query)?;
        Ok(ReportDefinition {
            report_id: entity.report_id,
            report_name: entity.report_name,
            description: entity.description,
            category: entity.category,
            owner: entity.owner,
            query,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        })
    }
}

/// Report execution entity.
#[derive(Debug, Clone, FromRow)]
pub struct ReportExecutionEntity {
    pub execution_id: Uuid,
    pub report_id: Uuid,
    pub user_id: String,
    pub parameters: serde_json::Value,
    pub status: String,
    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl From<ReportExecutionEntity> for ReportExecution {
    fn from(entity: ReportExecutionEntity) -> Self {
        ReportExecution {
            execution_id: entity.execution_id,
            report_id: entity.report_id,
            user_id: entity.user_id,
            parameters: entity.parameters,
            status: ExecutionStatus::from(entity.status.as_str()),
            queued_at: entity.queued_at,
            started_at: entity.started_at,
            completed_at: entity.completed_at,
            error_message: entity.error_message,
        }
    }
}
