//! Scheduled report execution job.
//!
//! Scans for due schedules, runs each through the execution engine, waits
//! (bounded) for a terminal state, renders the export, and advances the next
//! run time. A failure on one schedule never blocks the others.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, warn};

use domain::models::ExecutionStatus;
use domain::services::{ReportExecutionEngine, ScheduleStore};

use super::{Job, JobFrequency};
use crate::services::export;

/// Longest the job waits for one scheduled execution to finish.
const COMPLETION_WAIT: StdDuration = StdDuration::from_secs(120);

/// Poll cadence while waiting for completion.
const COMPLETION_POLL: StdDuration = StdDuration::from_secs(2);

pub struct ScheduledReportsJob {
    engine: Arc<ReportExecutionEngine>,
    schedules: Arc<dyn ScheduleStore>,
    interval_secs: u64,
}

impl ScheduledReportsJob {
    pub fn new(
        engine: Arc<ReportExecutionEngine>,
        schedules: Arc<dyn ScheduleStore>,
        interval_secs: u64,
    ) -> Self {
        Self {
            engine,
            schedules,
            interval_secs,
        }
    }

    /// Next run after a completed one.
    ///
    /// Cron expressions are stored but not yet evaluated here; schedules run on
    /// a daily cadence until the evaluator lands.
    // TODO: evaluate the stored cron expression instead of the daily fallback.
    fn next_run_after(now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::hours(24)
    }

    async fn wait_for_completion(&self, execution_id: uuid::Uuid) -> Option<ExecutionStatus> {
        let deadline = tokio::time::Instant::now() + COMPLETION_WAIT;
        loop {
            match self.engine.execution_status(execution_id).await {
                Ok(execution) if execution.status.is_terminal() => {
                    return Some(execution.status);
                }
                Ok(_) => {}
                Err(err) => {
                    error!(%execution_id, error = %err, "Failed to poll scheduled execution");
                    return None;
                }
            }
            if tokio::time::Instant::now() >= deadline {
                warn!(%execution_id, "Scheduled execution did not finish in time");
                return None;
            }
            tokio::time::sleep(COMPLETION_POLL).await;
        }
    }
}

#[async_trait::async_trait]
impl Job for ScheduledReportsJob {
    fn name(&self) -> &'static str {
        "scheduled_reports"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(self.interval_secs)
    }

    async fn execute(&self) -> Result<(), String> {
        let now = Utc::now();
        let due = self
            .schedules
            .schedules_due(now)
            .await
            .map_err(|err| err.to_string())?;

        if due.is_empty() {
            return Ok(());
        }
        info!(count = due.len(), "Processing due report schedules");

        for schedule in due {
            let result: Result<(), String> = async {
                info!(
                    schedule_id = %schedule.schedule_id,
                    report_id = %schedule.report_id,
                    "Executing scheduled report"
                );

                let execution_id = self
                    .engine
                    .execute_report(schedule.report_id, serde_json::json!({}), "scheduler")
                    .await
                    .map_err(|err| err.to_string())?;

                match self.wait_for_completion(execution_id).await {
                    Some(ExecutionStatus::Succeeded) => {
                        let results = self
                            .engine
                            .execution_results(execution_id)
                            .await
                            .map_err(|err| err.to_string())?;
                        let rendered = export::render(&results, schedule.format)
                            .map_err(|err| err.to_string())?;
                        // Delivery to the stored recipients is handled by the
                        // notification pipeline; this job only materializes the
                        // document.
                        info!(
                            schedule_id = %schedule.schedule_id,
                            %execution_id,
                            bytes = rendered.len(),
                            format = schedule.format.as_str(),
                            "Scheduled report rendered"
                        );
                    }
                    Some(status) => {
                        warn!(
                            schedule_id = %schedule.schedule_id,
                            %execution_id,
                            status = %status,
                            "Scheduled report did not succeed"
                        );
                    }
                    None => {}
                }

                self.schedules
                    .update_run_dates(
                        schedule.schedule_id,
                        now,
                        Some(Self::next_run_after(now)),
                    )
                    .await
                    .map_err(|err| err.to_string())
            }
            .await;

            if let Err(err) = result {
                error!(
                    schedule_id = %schedule.schedule_id,
                    error = %err,
                    "Error processing scheduled report"
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_next_run_is_a_day_out() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 6, 0, 0).unwrap();
        let next = ScheduledReportsJob::next_run_after(now);
        assert_eq!(next - now, Duration::hours(24));
    }
}
