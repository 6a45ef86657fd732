//! Scheduled report repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::ScheduledReport;
use domain::services::{ScheduleStore, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::ScheduledReportEntity;

/// Repository for scheduled report database operations.
#[derive(Clone)]
pub struct ScheduleRepository {
    pool: PgPool,
}

impl ScheduleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScheduleStore for ScheduleRepository {
    async fn schedules_for_report(
        &self,
        report_id: Uuid,
    ) -> Result<Vec<ScheduledReport>, StoreError> {
        let entities = sqlx::query_as::<_, ScheduledReportEntity>(
            r#"
            SELECT schedule_id, report_id, schedule, format, recipients, subject,
                   enabled, last_run_date, next_run_date, created_at
            FROM scheduled_reports
            WHERE report_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(report_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entities.into_iter().map(ScheduledReport::from).collect())
    }

    async fn schedule_by_id(
        &self,
        report_id: Uuid,
        schedule_id: Uuid,
    ) -> Result<Option<ScheduledReport>, StoreError> {
        let entity = sqlx::query_as::<_, ScheduledReportEntity>(
            r#"
            SELECT schedule_id, report_id, schedule, format, recipients, subject,
                   enabled, last_run_date, next_run_date, created_at
            FROM scheduled_reports
            WHERE schedule_id = $2 AND report_id = $1
            "#,
        )
        .bind(report_id)
        .bind(schedule_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entity.map(ScheduledReport::from))
    }

    async fn create_schedule(&self, schedule: &ScheduledReport) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO scheduled_reports (schedule_id, report_id, schedule, format,
                                           recipients, subject, enabled, last_run_date,
                                           next_run_date, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(schedule.schedule_id)
        .bind(schedule.report_id)
        .bind(&schedule.schedule)
        .bind(schedule.format.as_str())
        .bind(&schedule.recipients)
        .bind(&schedule.subject)
        .bind(schedule.enabled)
        .bind(schedule.last_run_date)
        .bind(schedule.next_run_date)
        .bind(schedule.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_schedule(&self, schedule: &ScheduledReport) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE scheduled_reports
            SET schedule = $3, format = $4, recipients = $5, subject = $6, enabled = $7,
                next_run_date = $8
            WHERE schedule_id = $2 AND report_id = $1
            "#,
        )
        .bind(schedule.report_id)
        .bind(schedule.schedule_id)
        .bind(&schedule.schedule)
        .bind(schedule.format.as_str())
        .bind(&schedule.recipients)
        .bind(&schedule.subject)
        .bind(schedule.enabled)
        .bind(schedule.next_run_date)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_schedule(
        &self,
        report_id: Uuid,
        schedule_id: Uuid,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "DELETE FROM scheduled_reports WHERE schedule_id = $2 AND report_id = $1",
        )
        .bind(report_id)
        .bind(schedule_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn schedules_due(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScheduledReport>, StoreError> {
        let entities = sqlx::query_as::<_, ScheduledReportEntity>(
            r#"
            SELECT schedule_id, report_id, schedule, format, recipients, subject,
                   enabled, last_run_date, next_run_date, created_at
            FROM scheduled_reports
            WHERE enabled AND (next_run_date IS NULL OR next_run_date <= $1)
            ORDER BY next_run_date NULLS FIRST
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(entities.into_iter().map(ScheduledReport::from).collect())
    }

    async fn update_run_dates(
        &self,
        schedule_id: Uuid,
        last_run: DateTime<Utc>,
        next_run: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE scheduled_reports
            SET last_run_date = $2, next_run_date = $3
            WHERE schedule_id = $1
            "#,
        )
        .bind(schedule_id)
        .bind(last_run)
        .bind(next_run)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
