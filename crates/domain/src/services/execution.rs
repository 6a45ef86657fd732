//! Report execution engine.
//!
//! Executions move through `Queued -> Running -> {Succeeded, Failed, Cancelled}`.
//! `execute_report` persists a queued record and returns its id immediately; the
//! actual run happens on a spawned task. Every code path out of the worker —
//! success, extraction failure, timeout, cancellation — records exactly one
//! terminal transition, so no record is ever left `Running` indefinitely.
//!
//! The execution record is the only shared mutable resource. The store is the
//! single writer per execution id: transitions are conditional on the current
//! status, so a completing worker and a concurrent cancel cannot both win.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info};
use uuid::Uuid;

use super::catalog::DataMartStore;
use super::connector::ConnectorRegistry;
use super::StoreError;
use crate::models::{
    AdHocQueryRequest, ExecutionResultSet, ExecutionStatus, ReportDefinition, ReportExecution,
    ReportQuery, ScheduledReport,
};

/// Storage abstraction over report definitions.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn list_reports(&self) -> Result<Vec<ReportDefinition>, StoreError>;

    async fn report_by_id(&self, id: Uuid) -> Result<Option<ReportDefinition>, StoreError>;

    async fn create_report(&self, report: &ReportDefinition) -> Result<(), StoreError>;

    /// Returns false when the report does not exist.
    async fn update_report(&self, report: &ReportDefinition) -> Result<bool, StoreError>;

    /// Returns false when the report does not exist.
    async fn delete_report(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn categories(&self) -> Result<Vec<String>, StoreError>;
}

/// Storage abstraction over execution records and their result payloads.
///
/// The two conditional transitions return `false` when the record was not in the
/// expected state, which is how lost races (e.g. cancel vs. completion) are
/// detected without a second writer ever clobbering a terminal state.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    async fn insert_execution(&self, execution: &ReportExecution) -> Result<(), StoreError>;

    async fn execution_by_id(&self, id: Uuid) -> Result<Option<ReportExecution>, StoreError>;

    async fn executions_for_report(
        &self,
        report_id: Uuid,
    ) -> Result<Vec<ReportExecution>, StoreError>;

    /// `Queued -> Running`. Returns false if the record is no longer queued.
    async fn mark_running(
        &self,
        id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Non-terminal -> terminal. Returns false if the record is already terminal.
    async fn mark_terminal(
        &self,
        id: Uuid,
        status: ExecutionStatus,
        completed_at: DateTime<Utc>,
        error_message: Option<&str>,
    ) -> Result<bool, StoreError>;

    async fn store_results(
        &self,
        id: Uuid,
        results: &serde_json::Value,
    ) -> Result<(), StoreError>;

    async fn results_by_id(&self, id: Uuid) -> Result<Option<serde_json::Value>, StoreError>;
}

/// Storage abstraction over report schedules.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn schedules_for_report(
        &self,
        report_id: Uuid,
    ) -> Result<Vec<ScheduledReport>, StoreError>;

    async fn schedule_by_id(
        &self,
        report_id: Uuid,
        schedule_id: Uuid,
    ) -> Result<Option<ScheduledReport>, StoreError>;

    async fn create_schedule(&self, schedule: &ScheduledReport) -> Result<(), StoreError>;

    /// Returns false when the schedule does not exist.
    async fn update_schedule(&self, schedule: &ScheduledReport) -> Result<bool, StoreError>;

    /// Returns false when the schedule does not exist.
    async fn delete_schedule(&self, report_id: Uuid, schedule_id: Uuid)
        -> Result<bool, StoreError>;

    /// Enabled schedules whose next run is at or before `now`.
    async fn schedules_due(&self, now: DateTime<Utc>)
        -> Result<Vec<ScheduledReport>, StoreError>;

    async fn update_run_dates(
        &self,
        schedule_id: Uuid,
        last_run: DateTime<Utc>,
        next_run: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;
}

/// Errors surfaced by engine operations.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Report {0} not found")]
    ReportNotFound(Uuid),

    #[error("Execution {0} not found")]
    ExecutionNotFound(Uuid),

    #[error("Execution {id} has not completed (status: {status})")]
    NotReady { id: Uuid, status: ExecutionStatus },

    #[error("Execution {id} failed: {message}")]
    Failed { id: Uuid, message: String },

    #[error("Execution {0} has already finished")]
    AlreadyTerminal(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Hard ceiling on one execution's wall-clock time.
    pub execution_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            execution_timeout: Duration::from_secs(300),
        }
    }
}

/// Worker-internal failure while running a report.
#[derive(Debug, Error)]
enum RunError {
    #[error("Data source '{0}' is not registered")]
    UnknownSource(String),

    #[error(transparent)]
    Extraction(#[from] super::connector::DataExtractionError),

    #[error("Extraction payload for {entity} is not valid JSON: {source}")]
    MalformedPayload {
        entity: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The asynchronous report execution engine.
pub struct ReportExecutionEngine {
    reports: Arc<dyn ReportStore>,
    executions: Arc<dyn ExecutionStore>,
    connectors: Arc<ConnectorRegistry>,
    marts: Arc<dyn DataMartStore>,
    config: EngineConfig,
    /// Cancellation signals for in-flight executions.
    cancel_handles: Arc<Mutex<HashMap<Uuid, watch::Sender<bool>>>>,
}

impl ReportExecutionEngine {
    pub fn new(
        reports: Arc<dyn ReportStore>,
        executions: Arc<dyn ExecutionStore>,
        connectors: Arc<ConnectorRegistry>,
        marts: Arc<dyn DataMartStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            reports,
            executions,
            connectors,
            marts,
            config,
            cancel_handles: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Enqueues an execution of `report_id` and returns the new execution id.
    ///
    /// The run itself happens on a spawned task; callers poll
    /// [`execution_status`](Self::execution_status) until a terminal state.
    pub async fn execute_report(
        &self,
        report_id: Uuid,
        parameters: serde_json::Value,
        user_id: &str,
    ) -> Result<Uuid, ExecutionError> {
        let report = self
            .reports
            .report_by_id(report_id)
            .await?
            .ok_or(ExecutionError::ReportNotFound(report_id))?;

        let execution = ReportExecution::queued(report_id, parameters, user_id);
        let execution_id = execution.execution_id;
        self.executions.insert_execution(&execution).await?;

        info!(%execution_id, %report_id, user_id, "Queued report execution");

        let (cancel_tx, cancel_rx) = watch::channel(false);
        self.cancel_handles
            .lock()
            .expect("cancel handle lock poisoned")
            .insert(execution_id, cancel_tx);

        let executions = Arc::clone(&self.executions);
        let connectors = Arc::clone(&self.connectors);
        let marts = Arc::clone(&self.marts);
        let cancel_handles = Arc::clone(&self.cancel_handles);
        let timeout = self.config.execution_timeout;
        let parameters = execution.parameters.clone();

        tokio::spawn(async move {
            Self::run_to_terminal(
                executions,
                connectors,
                marts,
                report,
                execution_id,
                parameters,
                timeout,
                cancel_rx,
            )
            .await;

            cancel_handles
                .lock()
                .expect("cancel handle lock poisoned")
                .remove(&execution_id);
        });

        Ok(execution_id)
    }

    /// Current state of one execution. Safe to poll: read-only and cheap.
    pub async fn execution_status(&self, id: Uuid) -> Result<ReportExecution, ExecutionError> {
        self.executions
            .execution_by_id(id)
            .await?
            .ok_or(ExecutionError::ExecutionNotFound(id))
    }

    /// The stored result payload of a succeeded execution.
    ///
    /// Non-terminal executions answer not-ready; failed executions surface the
    /// recorded error instead of a success payload.
    pub async fn execution_results(&self, id: Uuid) -> Result<serde_json::Value, ExecutionError> {
        let execution = self.execution_status(id).await?;

        match execution.status {
            ExecutionStatus::Succeeded => self
                .executions
                .results_by_id(id)
                .await?
                .ok_or(ExecutionError::ExecutionNotFound(id)),
            ExecutionStatus::Failed | ExecutionStatus::Cancelled => Err(ExecutionError::Failed {
                id,
                message: execution
                    .error_message
                    .unwrap_or_else(|| "execution did not produce results".to_string()),
            }),
            status => Err(ExecutionError::NotReady { id, status }),
        }
    }

    /// Requests cancellation of a non-terminal execution.
    ///
    /// Queued records are cancelled directly; running workers are signalled and
    /// record the terminal state themselves. Whichever writer transitions first
    /// wins — the other sees the conditional update fail and backs off.
    pub async fn cancel_execution(&self, id: Uuid) -> Result<(), ExecutionError> {
        let execution = self.execution_status(id).await?;
        if execution.status.is_terminal() {
            return Err(ExecutionError::AlreadyTerminal(id));
        }

        let signalled = {
            let handles = self
                .cancel_handles
                .lock()
                .expect("cancel handle lock poisoned");
            handles.get(&id).map(|tx| tx.send(true).is_ok()).unwrap_or(false)
        };

        if !signalled {
            // No live worker (still queued, or the worker is gone): transition here.
            let cancelled = self
                .executions
                .mark_terminal(
                    id,
                    ExecutionStatus::Cancelled,
                    Utc::now(),
                    Some("Execution cancelled"),
                )
                .await?;
            if !cancelled {
                return Err(ExecutionError::AlreadyTerminal(id));
            }
            metrics::counter!("report_executions_total", "status" => "cancelled").increment(1);
        }

        info!(execution_id = %id, "Cancellation requested");
        Ok(())
    }

    /// Execution history for a report, newest first.
    pub async fn executions_for_report(
        &self,
        report_id: Uuid,
    ) -> Result<Vec<ReportExecution>, ExecutionError> {
        self.reports
            .report_by_id(report_id)
            .await?
            .ok_or(ExecutionError::ReportNotFound(report_id))?;
        Ok(self.executions.executions_for_report(report_id).await?)
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_to_terminal(
        executions: Arc<dyn ExecutionStore>,
        connectors: Arc<ConnectorRegistry>,
        marts: Arc<dyn DataMartStore>,
        report: ReportDefinition,
        execution_id: Uuid,
        parameters: serde_json::Value,
        timeout: Duration,
        mut cancel_rx: watch::Receiver<bool>,
    ) {
        match executions.mark_running(execution_id, Utc::now()).await {
            Ok(true) => {}
            Ok(false) => {
                // Cancelled before the worker picked it up.
                return;
            }
            Err(err) => {
                error!(%execution_id, error = %err, "Failed to mark execution running");
                return;
            }
        }

        let run = Self::run_report(&connectors, &marts, &report.query, &parameters);

        let (status, error_message) = tokio::select! {
            result = tokio::time::timeout(timeout, run) => match result {
                Ok(Ok(results)) => match executions.store_results(execution_id, &results).await {
                    Ok(()) => (ExecutionStatus::Succeeded, None),
                    Err(err) => (
                        ExecutionStatus::Failed,
                        Some(format!("failed to store results: {err}")),
                    ),
                },
                Ok(Err(err)) => (ExecutionStatus::Failed, Some(err.to_string())),
                Err(_) => (
                    ExecutionStatus::Failed,
                    Some(format!(
                        "Execution timed out after {}s",
                        timeout.as_secs()
                    )),
                ),
            },
            _ = cancel_rx.changed() => {
                (ExecutionStatus::Cancelled, Some("Execution cancelled".to_string()))
            }
        };

        match executions
            .mark_terminal(execution_id, status, Utc::now(), error_message.as_deref())
            .await
        {
            Ok(true) => {
                metrics::counter!("report_executions_total", "status" => status.as_str())
                    .increment(1);
                info!(%execution_id, status = %status, "Execution reached terminal state");
            }
            Ok(false) => {
                // Another writer (a cancel) transitioned first.
                info!(%execution_id, "Execution was already terminal");
            }
            Err(err) => {
                error!(%execution_id, error = %err, "Failed to record terminal state");
            }
        }
    }

    /// Runs the report's query against its source and materializes a result set.
    async fn run_report(
        connectors: &ConnectorRegistry,
        marts: &Arc<dyn DataMartStore>,
        query: &ReportQuery,
        parameters: &serde_json::Value,
    ) -> Result<serde_json::Value, RunError> {
        // Per-execution parameters may override the stored filter and set the
        // incremental watermark.
        let filter = parameters
            .get("filter")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or_else(|| query.filter.clone());
        let changed_since = parameters
            .get("changed_since")
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        if let Some(mart_name) = query.source_id.strip_prefix("mart_") {
            let result = marts
                .ad_hoc_query(&AdHocQueryRequest {
                    mart_name: mart_name.to_string(),
                    dimensions: query.dimensions.clone(),
                    measures: query.measures.clone(),
                    filter,
                    sort_by: None,
                    limit: None,
                })
                .await?;
            let result_set = ExecutionResultSet {
                row_count: result.rows.len(),
                columns: result.columns,
                rows: result.rows,
            };
            return Ok(serde_json::to_value(result_set).expect("result set serializes"));
        }

        let connector = connectors
            .get(&query.source_id)
            .ok_or_else(|| RunError::UnknownSource(query.source_id.clone()))?;

        let payload = connector
            .extract_data(&query.entity_name, filter.as_deref(), changed_since)
            .await?;

        let raw: serde_json::Value =
            serde_json::from_str(&payload).map_err(|err| RunError::MalformedPayload {
                entity: query.entity_name.clone(),
                source: err,
            })?;

        let rows = match raw {
            serde_json::Value::Array(rows) => rows,
            other => vec![other],
        };

        Ok(serde_json::to_value(Self::project(rows, query)).expect("result set serializes"))
    }

    /// Projects raw rows onto the report's selected columns.
    fn project(rows: Vec<serde_json::Value>, query: &ReportQuery) -> ExecutionResultSet {
        let mut columns: Vec<String> = query.dimensions.clone();
        columns.extend(query.measures.iter().cloned());

        if columns.is_empty() {
            // No explicit selection: take the column set from the first row,
            // sorted for a stable header order.
            if let Some(serde_json::Value::Object(first)) = rows.first() {
                columns = first.keys().cloned().collect();
                columns.sort();
            }
        }

        let projected: Vec<serde_json::Value> = rows
            .into_iter()
            .map(|row| match row {
                serde_json::Value::Object(fields) => {
                    let mut out = serde_json::Map::new();
                    for column in &columns {
                        out.insert(
                            column.clone(),
                            fields.get(column).cloned().unwrap_or(serde_json::Value::Null),
                        );
                    }
                    serde_json::Value::Object(out)
                }
                other => other,
            })
            .collect();

        ExecutionResultSet {
            row_count: projected.len(),
            columns,
            rows: projected,
        }
    }
}
