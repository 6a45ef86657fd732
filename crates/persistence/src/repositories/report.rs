//! Report repository: definitions, execution history, and result payloads.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::{ExecutionStatus, ReportDefinition, ReportExecution};
use domain::services::{ExecutionStore, ReportStore, StoreError};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::entities::{ReportEntity, ReportExecutionEntity};

/// Repository for report definitions and execution records.
#[derive(Clone)]
pub struct ReportRepository {
    pool: PgPool,
}

impl ReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportStore for ReportRepository {
    async fn list_reports(&self) -> Result<Vec<ReportDefinition>, StoreError> {
        let entities = sqlx::query_as::<_, ReportEntity>(
            r#"
            SELECT report_id, report_name, description, category, owner, query,
                   created_at, updated_at
            FROM reports
            ORDER BY report_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        entities
            .into_iter()
            .map(|e| ReportDefinition::try_from(e).map_err(|err| StoreError(err.into())))
            .collect()
    }

    async fn report_by_id(&self, id: Uuid) -> Result<Option<ReportDefinition>, StoreError> {
        let entity = sqlx::query_as::<_, ReportEntity>(
            r#"
            SELECT report_id, report_name, description, category, owner, query,
                   created_at, updated_at
            FROM reports
            WHERE report_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        entity
            .map(|e| ReportDefinition::try_from(e).map_err(|err| StoreError(err.into())))
            .transpose()
    }

    async fn create_report(&self, report: &ReportDefinition) -> Result<(), StoreError> {
        let query =
            serde_json::to_value(&report.query).map_err(|err| StoreError(err.into()))?;

        sqlx::query(
            r#"
            INSERT INTO reports (report_id, report_name, description, category, owner,
                                 query, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(report.report_id)
        .bind(&report.report_name)
        .bind(&report.description)
        .bind(&report.category)
        .bind(&report.owner)
        .bind(query)
        .bind(report.created_at)
        .bind(report.updated_at)
        .execute(&self.pool)
        .await?;

        tracing::info!(report_id = %report.report_id, name = %report.report_name, "Created report");
        Ok(())
    }

    async fn update_report(&self, report: &ReportDefinition) -> Result<bool, StoreError> {
        let query =
            serde_json::to_value(&report.query).map_err(|err| StoreError(err.into()))?;

        let result = sqlx::query(
            r#"
            UPDATE reports
            SET report_name = $2, description = $3, category = $4, query = $5,
                updated_at = $6
            WHERE report_id = $1
            "#,
        )
        .bind(report.report_id)
        .bind(&report.report_name)
        .bind(&report.description)
        .bind(&report.category)
        .bind(query)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_report(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM reports WHERE report_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn categories(&self) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query(
            "SELECT DISTINCT category FROM reports WHERE category <> '' ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| row.get("category")).collect())
    }
}

#[async_trait]
impl ExecutionStore for ReportRepository {
    async fn insert_execution(&self, execution: &ReportExecution) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO report_executions (execution_id, report_id, user_id, parameters,
                                           status, queued_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(execution.execution_id)
        .bind(execution.report_id)
        .bind(&execution.user_id)
        .bind(&execution.parameters)
        .bind(execution.status.as_str())
        .bind(execution.queued_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn execution_by_id(&self, id: Uuid) -> Result<Option<ReportExecution>, StoreError> {
        let entity = sqlx::query_as::<_, ReportExecutionEntity>(
            r#"
            SELECT execution_id, report_id, user_id, parameters, status, queued_at,
                   started_at, completed_at, error_message
            FROM report_executions
            WHERE execution_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entity.map(ReportExecution::from))
    }

    async fn executions_for_report(
        &self,
        report_id: Uuid,
    ) -> Result<Vec<ReportExecution>, StoreError> {
        let entities = sqlx::query_as::<_, ReportExecutionEntity>(
            r#"
            SELECT execution_id, report_id, user_id, parameters, status, queued_at,
                   started_at, completed_at, error_message
            FROM report_executions
            WHERE report_id = $1
            ORDER BY queued_at DESC
            "#,
        )
        .bind(report_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entities.into_iter().map(ReportExecution::from).collect())
    }

    async fn mark_running(
        &self,
        id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        // Conditional on the queued state so a cancelled record is never revived.
        let result = sqlx::query(
            r#"
            UPDATE report_executions
            SET status = 'running', started_at = $2
            WHERE execution_id = $1 AND status = 'queued'
            "#,
        )
        .bind(id)
        .bind(started_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_terminal(
        &self,
        id: Uuid,
        status: ExecutionStatus,
        completed_at: DateTime<Utc>,
        error_message: Option<&str>,
    ) -> Result<bool, StoreError> {
        // Terminal states are immutable; only non-terminal rows transition.
        let result = sqlx::query(
            r#"
            UPDATE report_executions
            SET status = $2, completed_at = $3, error_message = $4
            WHERE execution_id = $1 AND status IN ('queued', 'running')
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(completed_at)
        .bind(error_message)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn store_results(
        &self,
        id: Uuid,
        results: &serde_json::Value,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE report_executions SET results = $2 WHERE execution_id = $1")
            .bind(id)
            .bind(results)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn results_by_id(&self, id: Uuid) -> Result<Option<serde_json::Value>, StoreError> {
        let row = sqlx::query("SELECT results FROM report_executions WHERE execution_id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.and_then(|r| r.get::<Option<serde_json::Value>, _>("results")))
    }
}
