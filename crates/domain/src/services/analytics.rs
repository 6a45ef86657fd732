//! Advanced analytics service.
//!
//! Independent read-oriented computations over catalog/mart data: KPIs, trend
//! series, forecasts, period comparisons, ad-hoc queries, automated insights, and
//! the domain recommendation endpoints. No cross-call shared mutable state, and
//! identical inputs always produce identical outputs.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, Utc};
use thiserror::Error;
use tracing::info;

use super::catalog::DataMartStore;
use super::StoreError;
use crate::models::{
    AdHocQueryRequest, AdHocQueryResult, ChurnRiskBand, CompareWith, ComparisonResult,
    CustomerChurnPrediction, ForecastPoint, ForecastRequest, ForecastResult, Insight,
    InsightDataPoint, InventoryRecommendation, KpiResult, MetricComparison, StockAction,
    TimeFrame, TimeGranularity, TrendDirection, TrendPoint, TrendResult,
};
use shared::periods::{add_months, month_start, parse_period, quarter_start, week_start};

/// Changes within this band (percent) are classified flat rather than
/// noise-driven up/down.
const TREND_DEADBAND_PERCENT: f64 = 1.0;

/// Minimum absolute month-over-month change (percent) for an insight to be
/// considered interesting.
const INSIGHT_MIN_CHANGE_PERCENT: f64 = 5.0;

/// Stock delta beyond which a rebalancing action is recommended.
const STOCK_ACTION_THRESHOLD: i32 = 2;

/// Maximum forecast horizon in periods.
const MAX_FORECAST_PERIODS: i32 = 365;

/// KPI row as computed by the marts: current plus previous-period value.
#[derive(Debug, Clone)]
pub struct KpiRow {
    pub kpi_id: String,
    pub name: String,
    pub unit: String,
    pub department: String,
    pub current_value: f64,
    pub previous_value: Option<f64>,
}

/// Inventory stock position for one model line.
#[derive(Debug, Clone)]
pub struct InventoryStockRow {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub current_stock: i32,
    pub recommended_stock: i32,
    pub sales_velocity: f64,
    pub days_supply: i32,
}

/// Churn model output for one customer.
#[derive(Debug, Clone)]
pub struct ChurnModelRow {
    pub customer_id: String,
    pub customer_name: String,
    pub churn_probability: f64,
    pub lifetime_value: f64,
    pub days_since_last_purchase: i32,
    pub churn_factors: Vec<String>,
    pub recommended_actions: Vec<String>,
}

/// Storage abstraction over the analytics marts.
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    /// KPI rows for a department, or every department for `"all"`.
    async fn kpi_rows(&self, department: &str) -> Result<Vec<KpiRow>, StoreError>;

    async fn metric_exists(&self, metric_id: &str) -> Result<bool, StoreError>;

    async fn metric_display_name(&self, metric_id: &str)
        -> Result<Option<String>, StoreError>;

    /// Daily observations for a metric over an inclusive date range, ascending.
    async fn metric_series(
        &self,
        metric_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TrendPoint>, StoreError>;

    /// Aggregate value of a metric over an inclusive date range. `None` when the
    /// metric has no observations in the range.
    async fn metric_value(
        &self,
        metric_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Option<f64>, StoreError>;

    /// Metric ids in a named group; empty for unknown groups.
    async fn metric_group(&self, group: &str) -> Result<Vec<String>, StoreError>;

    async fn inventory_rows(&self) -> Result<Vec<InventoryStockRow>, StoreError>;

    /// Churn rows with probability at or above `min_risk`.
    async fn churn_rows(&self, min_risk: f64) -> Result<Vec<ChurnModelRow>, StoreError>;
}

/// Errors surfaced by analytics operations.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Metric '{0}' not found")]
    MetricNotFound(String),

    #[error("Data mart '{0}' not found")]
    MartNotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The advanced analytics service.
pub struct AdvancedAnalyticsService {
    store: Arc<dyn AnalyticsStore>,
    marts: Arc<dyn DataMartStore>,
}

impl AdvancedAnalyticsService {
    pub fn new(store: Arc<dyn AnalyticsStore>, marts: Arc<dyn DataMartStore>) -> Self {
        Self { store, marts }
    }

    /// KPIs for a department (`"all"` for every department).
    pub async fn kpis(&self, department: &str) -> Result<Vec<KpiResult>, AnalyticsError> {
        info!(department, "Computing KPIs");
        let rows = self.store.kpi_rows(department).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let (change_percent, trend) =
                    change_and_trend(row.current_value, row.previous_value);
                KpiResult {
                    kpi_id: row.kpi_id,
                    name: row.name,
                    value: row.current_value,
                    previous_value: row.previous_value,
                    change_percent,
                    trend,
                    unit: row.unit,
                    department: row.department,
                }
            })
            .collect())
    }

    /// Trend series for one metric, optionally with an aligned comparison overlay.
    pub async fn trend_analysis(
        &self,
        metric_id: &str,
        time_frame: TimeFrame,
        compare_with: Option<CompareWith>,
    ) -> Result<TrendResult, AnalyticsError> {
        self.trend_analysis_as_of(metric_id, time_frame, compare_with, today())
            .await
    }

    /// Like [`trend_analysis`](Self::trend_analysis) with an explicit reference
    /// date, so results are reproducible.
    pub async fn trend_analysis_as_of(
        &self,
        metric_id: &str,
        time_frame: TimeFrame,
        compare_with: Option<CompareWith>,
        as_of: NaiveDate,
    ) -> Result<TrendResult, AnalyticsError> {
        if !self.store.metric_exists(metric_id).await? {
            return Err(AnalyticsError::MetricNotFound(metric_id.to_string()));
        }

        let metric_name = self
            .store
            .metric_display_name(metric_id)
            .await?
            .unwrap_or_else(|| metric_id.to_string());

        let buckets = bucket_sequence(as_of, time_frame);
        let raw = self
            .store
            .metric_series(metric_id, buckets[0], as_of)
            .await?;
        let points = align_to_buckets(&raw, &buckets, time_frame);

        let comparison_points = match compare_with {
            Some(mode) => {
                let comparison_end = match (mode, time_frame) {
                    (CompareWith::PreviousYear, _) => add_months(as_of, -12),
                    (CompareWith::PreviousPeriod, TimeFrame::Day) => as_of - Duration::days(30),
                    (CompareWith::PreviousPeriod, TimeFrame::Week) => as_of - Duration::weeks(12),
                    (CompareWith::PreviousPeriod, TimeFrame::Month) => add_months(as_of, -12),
                    (CompareWith::PreviousPeriod, TimeFrame::Quarter) => add_months(as_of, -24),
                    (CompareWith::PreviousPeriod, TimeFrame::Year) => add_months(as_of, -60),
                };
                // The overlay is bucketed natively in its own window so both
                // series have identical cardinality.
                let comparison_buckets = bucket_sequence(comparison_end, time_frame);
                let raw = self
                    .store
                    .metric_series(metric_id, comparison_buckets[0], comparison_end)
                    .await?;
                Some(align_to_buckets(&raw, &comparison_buckets, time_frame))
            }
            None => None,
        };

        Ok(TrendResult {
            metric_id: metric_id.to_string(),
            metric_name,
            time_frame,
            points,
            comparison_points,
        })
    }

    /// Projects future points for a metric from its historical series.
    pub async fn generate_forecast(
        &self,
        request: &ForecastRequest,
    ) -> Result<ForecastResult, AnalyticsError> {
        self.generate_forecast_as_of(request, today()).await
    }

    /// Like [`generate_forecast`](Self::generate_forecast) with an explicit
    /// reference date.
    pub async fn generate_forecast_as_of(
        &self,
        request: &ForecastRequest,
        as_of: NaiveDate,
    ) -> Result<ForecastResult, AnalyticsError> {
        if request.periods <= 0 || request.periods > MAX_FORECAST_PERIODS {
            return Err(AnalyticsError::InvalidArgument(format!(
                "Invalid number of periods: {}. Must be between 1 and {MAX_FORECAST_PERIODS}",
                request.periods
            )));
        }

        if !self.store.metric_exists(&request.metric_id).await? {
            return Err(AnalyticsError::MetricNotFound(request.metric_id.clone()));
        }

        // Historical window per granularity.
        let (time_frame, bucket_count) = match request.granularity {
            TimeGranularity::Day => (TimeFrame::Day, 90),
            TimeGranularity::Week => (TimeFrame::Week, 26),
            TimeGranularity::Month => (TimeFrame::Month, 24),
        };
        let buckets = bucket_sequence_n(as_of, time_frame, bucket_count);
        let raw = self
            .store
            .metric_series(&request.metric_id, buckets[0], as_of)
            .await?;
        if raw.is_empty() {
            return Err(AnalyticsError::InvalidArgument(format!(
                "No historical data found for metric {}",
                request.metric_id
            )));
        }
        // Fit only observed buckets: padding a lagging series with zeros would
        // poison the trend.
        let history = aggregate_observed(&raw, time_frame);

        let fit = LinearFit::of(&history);
        let last_date = history.last().expect("history is non-empty").date;
        let n = history.len() as f64;

        let points = (1..=request.periods)
            .map(|i| {
                let date = match request.granularity {
                    TimeGranularity::Day => last_date + Duration::days(i as i64),
                    TimeGranularity::Week => last_date + Duration::weeks(i as i64),
                    TimeGranularity::Month => add_months(last_date, i),
                };
                let value = (fit.intercept + fit.slope * (n - 1.0 + i as f64)).max(0.0);
                // Uncertainty widens with the horizon.
                let margin = 1.96 * fit.residual_std * (i as f64).sqrt();
                ForecastPoint {
                    date,
                    value,
                    lower_bound: Some((value - margin).max(0.0)),
                    upper_bound: Some(value + margin),
                }
            })
            .collect();

        Ok(ForecastResult {
            metric_id: request.metric_id.clone(),
            granularity: request.granularity,
            points,
            confidence_level: 0.5 + 0.45 * fit.r_squared,
        })
    }

    /// Period-over-period comparison for every metric in a named group.
    pub async fn period_comparison(
        &self,
        metric_group: &str,
        current_period: &str,
        previous_period: &str,
    ) -> Result<ComparisonResult, AnalyticsError> {
        self.period_comparison_as_of(metric_group, current_period, previous_period, today())
            .await
    }

    /// Like [`period_comparison`](Self::period_comparison) with an explicit
    /// reference date for `YTD`/`MTD` resolution.
    pub async fn period_comparison_as_of(
        &self,
        metric_group: &str,
        current_period: &str,
        previous_period: &str,
        as_of: NaiveDate,
    ) -> Result<ComparisonResult, AnalyticsError> {
        let current = parse_period(current_period, as_of)
            .map_err(|err| AnalyticsError::InvalidArgument(err.to_string()))?;
        let previous = parse_period(previous_period, as_of)
            .map_err(|err| AnalyticsError::InvalidArgument(err.to_string()))?;

        let metric_ids = self.store.metric_group(metric_group).await?;
        if metric_ids.is_empty() {
            return Err(AnalyticsError::InvalidArgument(format!(
                "Unknown metric group: {metric_group}"
            )));
        }

        let mut metrics = Vec::with_capacity(metric_ids.len());
        for metric_id in metric_ids {
            let current_value = self
                .store
                .metric_value(&metric_id, current.start, current.end)
                .await?
                .unwrap_or(0.0);
            let previous_value = self
                .store
                .metric_value(&metric_id, previous.start, previous.end)
                .await?;
            let metric_name = self
                .store
                .metric_display_name(&metric_id)
                .await?
                .unwrap_or_else(|| metric_id.clone());

            let (change_percent, trend) = change_and_trend(current_value, previous_value);
            metrics.push(MetricComparison {
                metric_id,
                metric_name,
                current_value,
                previous_value,
                change_percent,
                trend,
            });
        }

        Ok(ComparisonResult {
            metric_group: metric_group.to_string(),
            current_period: current_period.to_string(),
            previous_period: previous_period.to_string(),
            metrics,
        })
    }

    /// Validates and runs an ad-hoc query against a data mart.
    ///
    /// Dimensions must be groupable and measures must exist per the mart's stored
    /// column schema; anything invalid is reported by name before any query runs.
    pub async fn ad_hoc_query(
        &self,
        request: &AdHocQueryRequest,
    ) -> Result<AdHocQueryResult, AnalyticsError> {
        if request.dimensions.is_empty() {
            return Err(AnalyticsError::InvalidArgument(
                "At least one dimension must be specified".to_string(),
            ));
        }
        if request.measures.is_empty() {
            return Err(AnalyticsError::InvalidArgument(
                "At least one measure must be specified".to_string(),
            ));
        }

        self.marts
            .mart_by_name(&request.mart_name)
            .await?
            .ok_or_else(|| AnalyticsError::MartNotFound(request.mart_name.clone()))?;

        let schema = self.marts.mart_schema(&request.mart_name).await?;
        let mut invalid = Vec::new();

        for dimension in &request.dimensions {
            match schema.iter().find(|c| &c.name == dimension) {
                None => invalid.push(format!("dimension '{dimension}' is unknown")),
                Some(column) if !column.is_groupable => {
                    invalid.push(format!("dimension '{dimension}' is not groupable"))
                }
                Some(_) => {}
            }
        }
        for measure in &request.measures {
            if !schema.iter().any(|c| &c.name == measure) {
                invalid.push(format!("measure '{measure}' is unknown"));
            }
        }

        if !invalid.is_empty() {
            return Err(AnalyticsError::InvalidArgument(format!(
                "Invalid query fields: {}",
                invalid.join(", ")
            )));
        }

        Ok(self.marts.ad_hoc_query(request).await?)
    }

    /// Deterministic ranked insights for an area (`"all"` for every area).
    pub async fn automated_insights(
        &self,
        area: &str,
        max_results: usize,
    ) -> Result<Vec<Insight>, AnalyticsError> {
        self.automated_insights_as_of(area, max_results, today())
            .await
    }

    /// Like [`automated_insights`](Self::automated_insights) with an explicit
    /// reference date.
    pub async fn automated_insights_as_of(
        &self,
        area: &str,
        max_results: usize,
        as_of: NaiveDate,
    ) -> Result<Vec<Insight>, AnalyticsError> {
        const AREAS: [&str; 4] = ["sales", "service", "inventory", "financial"];

        let areas: Vec<&str> = if area == "all" {
            AREAS.to_vec()
        } else if AREAS.contains(&area) {
            vec![area]
        } else {
            return Err(AnalyticsError::InvalidArgument(format!(
                "Unknown insight area: {area}"
            )));
        };

        // Month-to-date vs. the same span of the previous month.
        let current_start = month_start(as_of);
        let previous_start = add_months(current_start, -1);
        let previous_end = previous_start + (as_of - current_start);

        let mut insights = Vec::new();
        for group in areas {
            for metric_id in self.store.metric_group(group).await? {
                let current = self
                    .store
                    .metric_value(&metric_id, current_start, as_of)
                    .await?
                    .unwrap_or(0.0);
                let previous = self
                    .store
                    .metric_value(&metric_id, previous_start, previous_end)
                    .await?;

                let (change_percent, _) = change_and_trend(current, previous);
                let Some(pct) = change_percent else { continue };
                if pct.abs() < INSIGHT_MIN_CHANGE_PERCENT {
                    continue;
                }

                let name = self
                    .store
                    .metric_display_name(&metric_id)
                    .await?
                    .unwrap_or_else(|| metric_id.clone());
                let direction = if pct > 0.0 { "up" } else { "down" };

                insights.push(Insight {
                    insight_id: format!("{group}_{metric_id}_mtd"),
                    title: format!("{name} {direction} {:.1}% month over month", pct.abs()),
                    description: format!(
                        "{name} is at {current:.1} month-to-date, {direction} {:.1}% from {:.1} \
                         over the same span of the previous month.",
                        pct.abs(),
                        previous.unwrap_or(0.0),
                    ),
                    category: group.to_string(),
                    significance: (pct.abs() / 100.0).min(1.0),
                    data_points: vec![
                        InsightDataPoint {
                            label: "Previous period".to_string(),
                            value: previous.unwrap_or(0.0),
                        },
                        InsightDataPoint {
                            label: "Current period".to_string(),
                            value: current,
                        },
                    ],
                    recommended_action: (pct < 0.0)
                        .then(|| format!("Investigate the decline in {name}.")),
                });
            }
        }

        insights.sort_by(|a, b| {
            b.significance
                .partial_cmp(&a.significance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.insight_id.cmp(&b.insight_id))
        });
        insights.truncate(max_results);
        Ok(insights)
    }

    /// Inventory rebalancing recommendations, largest imbalance first.
    pub async fn inventory_recommendations(
        &self,
    ) -> Result<Vec<InventoryRecommendation>, AnalyticsError> {
        let rows = self.store.inventory_rows().await?;

        let mut recommendations: Vec<InventoryRecommendation> = rows
            .into_iter()
            .map(|row| {
                let stock_delta = row.recommended_stock - row.current_stock;
                let action = if stock_delta > STOCK_ACTION_THRESHOLD {
                    StockAction::Increase
                } else if stock_delta < -STOCK_ACTION_THRESHOLD {
                    StockAction::Decrease
                } else {
                    StockAction::Maintain
                };
                InventoryRecommendation {
                    make: row.make,
                    model: row.model,
                    year: row.year,
                    current_stock: row.current_stock,
                    recommended_stock: row.recommended_stock,
                    stock_delta,
                    action,
                    sales_velocity: row.sales_velocity,
                    days_supply: row.days_supply,
                }
            })
            .collect();

        recommendations.sort_by(|a, b| {
            b.stock_delta
                .abs()
                .cmp(&a.stock_delta.abs())
                .then_with(|| a.make.cmp(&b.make))
                .then_with(|| a.model.cmp(&b.model))
        });
        Ok(recommendations)
    }

    /// Customer churn predictions with risk at or above `min_risk_score`.
    pub async fn churn_predictions(
        &self,
        min_risk_score: f64,
    ) -> Result<Vec<CustomerChurnPrediction>, AnalyticsError> {
        if !(0.0..=1.0).contains(&min_risk_score) {
            return Err(AnalyticsError::InvalidArgument(format!(
                "Invalid minimum risk score: {min_risk_score}. Must be between 0 and 1"
            )));
        }

        let rows = self.store.churn_rows(min_risk_score).await?;

        let mut predictions: Vec<CustomerChurnPrediction> = rows
            .into_iter()
            .map(|row| {
                let score = row.churn_probability.clamp(0.0, 1.0);
                CustomerChurnPrediction {
                    customer_id: row.customer_id,
                    customer_name: row.customer_name,
                    churn_risk_score: score,
                    risk_category: ChurnRiskBand::from_score(score),
                    lifetime_value: row.lifetime_value,
                    days_since_last_purchase: row.days_since_last_purchase,
                    churn_factors: row.churn_factors,
                    recommended_actions: row.recommended_actions,
                }
            })
            .collect();

        predictions.sort_by(|a, b| {
            b.churn_risk_score
                .partial_cmp(&a.churn_risk_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.customer_id.cmp(&b.customer_id))
        });
        Ok(predictions)
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Change percent and trend classification with the divide-by-zero guard.
///
/// A missing previous value (new metric) and a zero previous value both yield no
/// change percent and a flat trend; absence is never conflated with zero in the
/// returned `previous_value`, only in the derivation.
fn change_and_trend(current: f64, previous: Option<f64>) -> (Option<f64>, TrendDirection) {
    match previous {
        None => (None, TrendDirection::Flat),
        Some(p) if p == 0.0 => (None, TrendDirection::Flat),
        Some(p) => {
            let pct = (current - p) / p * 100.0;
            let trend = if pct.abs() <= TREND_DEADBAND_PERCENT {
                TrendDirection::Flat
            } else if pct > 0.0 {
                TrendDirection::Up
            } else {
                TrendDirection::Down
            };
            (Some(pct), trend)
        }
    }
}

/// Start of the bucket containing `date` for the given time frame.
fn bucket_date(date: NaiveDate, time_frame: TimeFrame) -> NaiveDate {
    match time_frame {
        TimeFrame::Day => date,
        TimeFrame::Week => week_start(date),
        TimeFrame::Month => month_start(date),
        TimeFrame::Quarter => quarter_start(date),
        TimeFrame::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap(),
    }
}

/// Ascending bucket starts ending with the bucket containing `end`.
fn bucket_sequence(end: NaiveDate, time_frame: TimeFrame) -> Vec<NaiveDate> {
    bucket_sequence_n(end, time_frame, time_frame.bucket_count())
}

fn bucket_sequence_n(end: NaiveDate, time_frame: TimeFrame, count: usize) -> Vec<NaiveDate> {
    let last = bucket_date(end, time_frame);
    let mut buckets: Vec<NaiveDate> = (0..count)
        .map(|i| {
            let back = (count - 1 - i) as i32;
            match time_frame {
                TimeFrame::Day => last - Duration::days(back as i64),
                TimeFrame::Week => last - Duration::weeks(back as i64),
                TimeFrame::Month => add_months(last, -back),
                TimeFrame::Quarter => add_months(last, -3 * back),
                TimeFrame::Year => add_months(last, -12 * back),
            }
        })
        .collect();
    buckets.dedup();
    buckets
}

/// Sums daily observations into buckets, keeping only buckets that actually have
/// observations, ascending.
fn aggregate_observed(raw: &[TrendPoint], time_frame: TimeFrame) -> Vec<TrendPoint> {
    let mut by_bucket: std::collections::BTreeMap<NaiveDate, f64> = std::collections::BTreeMap::new();
    for point in raw {
        *by_bucket.entry(bucket_date(point.date, time_frame)).or_insert(0.0) += point.value;
    }
    by_bucket
        .into_iter()
        .map(|(date, value)| TrendPoint { date, value })
        .collect()
}

/// Sums daily observations into the given buckets, emitting every bucket even
/// when it has no observations.
fn align_to_buckets(
    raw: &[TrendPoint],
    buckets: &[NaiveDate],
    time_frame: TimeFrame,
) -> Vec<TrendPoint> {
    buckets
        .iter()
        .map(|bucket| {
            let value = raw
                .iter()
                .filter(|p| bucket_date(p.date, time_frame) == *bucket)
                .map(|p| p.value)
                .sum();
            TrendPoint {
                date: *bucket,
                value,
            }
        })
        .collect()
}

/// Least-squares linear fit over an evenly spaced series.
struct LinearFit {
    slope: f64,
    intercept: f64,
    residual_std: f64,
    r_squared: f64,
}

impl LinearFit {
    fn of(points: &[TrendPoint]) -> Self {
        let n = points.len() as f64;
        if points.len() < 2 {
            return Self {
                slope: 0.0,
                intercept: points.first().map(|p| p.value).unwrap_or(0.0),
                residual_std: 0.0,
                r_squared: 1.0,
            };
        }

        let mean_x = (n - 1.0) / 2.0;
        let mean_y = points.iter().map(|p| p.value).sum::<f64>() / n;

        let mut ss_xy = 0.0;
        let mut ss_xx = 0.0;
        for (i, point) in points.iter().enumerate() {
            let dx = i as f64 - mean_x;
            ss_xy += dx * (point.value - mean_y);
            ss_xx += dx * dx;
        }

        let slope = if ss_xx == 0.0 { 0.0 } else { ss_xy / ss_xx };
        let intercept = mean_y - slope * mean_x;

        let mut ss_res = 0.0;
        let mut ss_tot = 0.0;
        for (i, point) in points.iter().enumerate() {
            let predicted = intercept + slope * i as f64;
            ss_res += (point.value - predicted).powi(2);
            ss_tot += (point.value - mean_y).powi(2);
        }

        Self {
            slope,
            intercept,
            residual_std: (ss_res / n).sqrt(),
            r_squared: if ss_tot == 0.0 {
                1.0
            } else {
                (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalog::test_support::StubMartStore;
    use std::collections::HashMap;

    /// Scriptable in-memory analytics store.
    #[derive(Default)]
    struct StubAnalyticsStore {
        kpis: Vec<KpiRow>,
        /// metric id -> daily observations
        series: HashMap<String, Vec<TrendPoint>>,
        /// group name -> metric ids
        groups: HashMap<String, Vec<String>>,
        inventory: Vec<InventoryStockRow>,
        churn: Vec<ChurnModelRow>,
    }

    impl StubAnalyticsStore {
        fn with_metric(metric_id: &str, points: Vec<TrendPoint>) -> Self {
            let mut store = Self::default();
            store.series.insert(metric_id.to_string(), points);
            store
        }
    }

    #[async_trait]
    impl AnalyticsStore for StubAnalyticsStore {
        async fn kpi_rows(&self, department: &str) -> Result<Vec<KpiRow>, StoreError> {
            Ok(self
                .kpis
                .iter()
                .filter(|row| department == "all" || row.department == department)
                .cloned()
                .collect())
        }

        async fn metric_exists(&self, metric_id: &str) -> Result<bool, StoreError> {
            Ok(self.series.contains_key(metric_id))
        }

        async fn metric_display_name(
            &self,
            _metric_id: &str,
        ) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        async fn metric_series(
            &self,
            metric_id: &str,
            from: NaiveDate,
            to: NaiveDate,
        ) -> Result<Vec<TrendPoint>, StoreError> {
            Ok(self
                .series
                .get(metric_id)
                .map(|points| {
                    points
                        .iter()
                        .filter(|p| p.date >= from && p.date <= to)
                        .copied()
                        .collect()
                })
                .unwrap_or_default())
        }

        async fn metric_value(
            &self,
            metric_id: &str,
            from: NaiveDate,
            to: NaiveDate,
        ) -> Result<Option<f64>, StoreError> {
            let points = self.metric_series(metric_id, from, to).await?;
            if points.is_empty() {
                Ok(None)
            } else {
                Ok(Some(points.iter().map(|p| p.value).sum()))
            }
        }

        async fn metric_group(&self, group: &str) -> Result<Vec<String>, StoreError> {
            Ok(self.groups.get(group).cloned().unwrap_or_default())
        }

        async fn inventory_rows(&self) -> Result<Vec<InventoryStockRow>, StoreError> {
            Ok(self.inventory.clone())
        }

        async fn churn_rows(&self, min_risk: f64) -> Result<Vec<ChurnModelRow>, StoreError> {
            Ok(self
                .churn
                .iter()
                .filter(|row| row.churn_probability >= min_risk)
                .cloned()
                .collect())
        }
    }

    fn service(store: StubAnalyticsStore) -> AdvancedAnalyticsService {
        AdvancedAnalyticsService::new(
            Arc::new(store),
            Arc::new(StubMartStore::with_sales_mart()),
        )
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn daily_series(start: NaiveDate, values: &[f64]) -> Vec<TrendPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| TrendPoint {
                date: start + Duration::days(i as i64),
                value: *v,
            })
            .collect()
    }

    #[test]
    fn test_change_and_trend_zero_guards() {
        // Missing previous: no percent, flat, no division.
        assert_eq!(change_and_trend(100.0, None), (None, TrendDirection::Flat));
        // Zero previous: same, even when current is nonzero.
        assert_eq!(
            change_and_trend(100.0, Some(0.0)),
            (None, TrendDirection::Flat)
        );
        assert_eq!(
            change_and_trend(0.0, Some(0.0)),
            (None, TrendDirection::Flat)
        );
    }

    #[test]
    fn test_change_and_trend_deadband() {
        let (pct, trend) = change_and_trend(100.5, Some(100.0));
        assert!((pct.unwrap() - 0.5).abs() < 1e-9);
        assert_eq!(trend, TrendDirection::Flat);

        let (_, trend) = change_and_trend(110.0, Some(100.0));
        assert_eq!(trend, TrendDirection::Up);

        let (_, trend) = change_and_trend(90.0, Some(100.0));
        assert_eq!(trend, TrendDirection::Down);
    }

    #[tokio::test]
    async fn test_kpis_carry_guarded_change_percent() {
        let mut store = StubAnalyticsStore::default();
        store.kpis = vec![
            KpiRow {
                kpi_id: "sales_total_mtd".to_string(),
                name: "Total Sales MTD".to_string(),
                unit: "currency".to_string(),
                department: "sales".to_string(),
                current_value: 1_250_000.0,
                previous_value: Some(1_150_000.0),
            },
            KpiRow {
                kpi_id: "sales_new_metric".to_string(),
                name: "New Metric".to_string(),
                unit: "count".to_string(),
                department: "sales".to_string(),
                current_value: 42.0,
                previous_value: None,
            },
        ];

        let kpis = service(store).kpis("sales").await.unwrap();
        assert_eq!(kpis.len(), 2);

        assert_eq!(kpis[0].trend, TrendDirection::Up);
        assert!(kpis[0].change_percent.is_some());

        assert!(kpis[1].previous_value.is_none());
        assert!(kpis[1].change_percent.is_none());
        assert_eq!(kpis[1].trend, TrendDirection::Flat);
    }

    #[tokio::test]
    async fn test_trend_analysis_unknown_metric_is_not_found() {
        let err = service(StubAnalyticsStore::default())
            .trend_analysis_as_of("unknown-metric-id", TimeFrame::Month, None, d(2024, 6, 15))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::MetricNotFound(_)));
    }

    #[tokio::test]
    async fn test_trend_analysis_buckets_and_aligns_comparison() {
        let as_of = d(2024, 6, 15);
        // Eighteen months of daily observations at 1.0/day.
        let store = StubAnalyticsStore::with_metric(
            "sales_revenue",
            daily_series(d(2023, 1, 1), &vec![1.0; 540]),
        );

        let result = service(store)
            .trend_analysis_as_of(
                "sales_revenue",
                TimeFrame::Month,
                Some(CompareWith::PreviousPeriod),
                as_of,
            )
            .await
            .unwrap();

        assert_eq!(result.points.len(), 12);
        let comparison = result.comparison_points.unwrap();
        // The overlay must have the same cardinality or it cannot be charted.
        assert_eq!(comparison.len(), result.points.len());

        // Points are ordered and aligned to month starts.
        for window in result.points.windows(2) {
            assert!(window[0].date < window[1].date);
            assert_eq!(window[1].date.day(), 1);
        }

        // A full month sums its daily observations.
        let may = result
            .points
            .iter()
            .find(|p| p.date == d(2024, 5, 1))
            .unwrap();
        assert!((may.value - 31.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_forecast_rejects_bad_period_counts() {
        let store = StubAnalyticsStore::with_metric(
            "sales_revenue",
            daily_series(d(2024, 1, 1), &vec![10.0; 120]),
        );
        let service = service(store);

        for periods in [0, -3, 400] {
            let err = service
                .generate_forecast_as_of(
                    &ForecastRequest {
                        metric_id: "sales_revenue".to_string(),
                        granularity: TimeGranularity::Day,
                        periods,
                        filter: None,
                    },
                    d(2024, 6, 15),
                )
                .await
                .unwrap_err();
            assert!(
                matches!(err, AnalyticsError::InvalidArgument(_)),
                "periods = {periods} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_forecast_is_deterministic_with_expected_shape() {
        let as_of = d(2024, 6, 15);
        // Steadily climbing series: 100, 101, 102, ...
        let values: Vec<f64> = (0..120).map(|i| 100.0 + i as f64).collect();
        let store =
            StubAnalyticsStore::with_metric("sales_revenue", daily_series(d(2024, 1, 1), &values));
        let service = service(store);

        let request = ForecastRequest {
            metric_id: "sales_revenue".to_string(),
            granularity: TimeGranularity::Day,
            periods: 14,
            filter: None,
        };

        let first = service
            .generate_forecast_as_of(&request, as_of)
            .await
            .unwrap();
        let second = service
            .generate_forecast_as_of(&request, as_of)
            .await
            .unwrap();

        assert_eq!(first.points.len(), 14);
        assert!((0.0..=1.0).contains(&first.confidence_level));

        // Identical inputs, identical outputs.
        for (a, b) in first.points.iter().zip(second.points.iter()) {
            assert_eq!(a.date, b.date);
            assert_eq!(a.value, b.value);
            assert_eq!(a.lower_bound, b.lower_bound);
            assert_eq!(a.upper_bound, b.upper_bound);
        }

        // A rising series keeps rising, and the bounds widen with the horizon.
        assert!(first.points[13].value > first.points[0].value);
        let width = |p: &ForecastPoint| p.upper_bound.unwrap() - p.lower_bound.unwrap();
        assert!(width(&first.points[13]) >= width(&first.points[0]));
    }

    #[tokio::test]
    async fn test_period_comparison_applies_zero_guard() {
        let mut store = StubAnalyticsStore::with_metric(
            "sales_revenue",
            daily_series(d(2024, 5, 1), &vec![100.0; 61]),
        );
        store.groups.insert(
            "sales".to_string(),
            vec!["sales_revenue".to_string(), "sales_new".to_string()],
        );
        store.series.insert(
            "sales_new".to_string(),
            daily_series(d(2024, 6, 1), &vec![5.0; 30]),
        );

        let result = service(store)
            .period_comparison_as_of("sales", "2024-06", "2024-05", d(2024, 7, 1))
            .await
            .unwrap();

        assert_eq!(result.metrics.len(), 2);

        let revenue = &result.metrics[0];
        assert!(revenue.previous_value.is_some());
        assert!(revenue.change_percent.is_some());

        // No observations in the previous period: previous is absent, not zero.
        let fresh = &result.metrics[1];
        assert!(fresh.previous_value.is_none());
        assert!(fresh.change_percent.is_none());
        assert_eq!(fresh.trend, TrendDirection::Flat);
    }

    #[tokio::test]
    async fn test_period_comparison_rejects_bad_period_and_group() {
        let mut store = StubAnalyticsStore::default();
        store
            .groups
            .insert("sales".to_string(), vec!["sales_revenue".to_string()]);
        let service = service(store);

        let err = service
            .period_comparison_as_of("sales", "whenever", "2024-05", d(2024, 7, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidArgument(_)));

        let err = service
            .period_comparison_as_of("logistics", "2024-06", "2024-05", d(2024, 7, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_ad_hoc_query_names_invalid_fields() {
        let service = service(StubAnalyticsStore::default());

        let err = service
            .ad_hoc_query(&AdHocQueryRequest {
                mart_name: "sales_analytics".to_string(),
                // gross_profit is groupable in the stub schema; sale_date is
                // groupable; "vin" does not exist.
                dimensions: vec!["vin".to_string(), "sale_date".to_string()],
                measures: vec!["margin".to_string()],
                filter: None,
                sort_by: None,
                limit: None,
            })
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("vin"));
        assert!(message.contains("margin"));
        assert!(!message.contains("sale_date"));
    }

    #[tokio::test]
    async fn test_ad_hoc_query_requires_dimensions_and_measures() {
        let service = service(StubAnalyticsStore::default());

        let err = service
            .ad_hoc_query(&AdHocQueryRequest {
                mart_name: "sales_analytics".to_string(),
                dimensions: vec![],
                measures: vec!["gross_profit".to_string()],
                filter: None,
                sort_by: None,
                limit: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_ad_hoc_query_unknown_mart_is_not_found() {
        let service = service(StubAnalyticsStore::default());

        let err = service
            .ad_hoc_query(&AdHocQueryRequest {
                mart_name: "wholesale".to_string(),
                dimensions: vec!["sale_date".to_string()],
                measures: vec!["gross_profit".to_string()],
                filter: None,
                sort_by: None,
                limit: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::MartNotFound(_)));
    }

    #[tokio::test]
    async fn test_ad_hoc_query_executes_when_valid() {
        let service = service(StubAnalyticsStore::default());

        let result = service
            .ad_hoc_query(&AdHocQueryRequest {
                mart_name: "sales_analytics".to_string(),
                dimensions: vec!["sale_date".to_string()],
                measures: vec!["gross_profit".to_string()],
                filter: None,
                sort_by: None,
                limit: None,
            })
            .await
            .unwrap();
        assert_eq!(result.columns, vec!["sale_date", "gross_profit"]);
    }

    #[tokio::test]
    async fn test_insights_are_ranked_capped_and_deterministic() {
        let as_of = d(2024, 6, 15);
        let mut store = StubAnalyticsStore::default();
        store.groups.insert(
            "sales".to_string(),
            vec![
                "sales_surge".to_string(),
                "sales_slump".to_string(),
                "sales_steady".to_string(),
            ],
        );
        // Surge: 10/day in May, 30/day in June (+200%).
        store.series.insert(
            "sales_surge".to_string(),
            [
                daily_series(d(2024, 5, 1), &vec![10.0; 31]),
                daily_series(d(2024, 6, 1), &vec![30.0; 15]),
            ]
            .concat(),
        );
        // Slump: 20/day in May, 10/day in June (-50%).
        store.series.insert(
            "sales_slump".to_string(),
            [
                daily_series(d(2024, 5, 1), &vec![20.0; 31]),
                daily_series(d(2024, 6, 1), &vec![10.0; 15]),
            ]
            .concat(),
        );
        // Steady: no interesting change.
        store.series.insert(
            "sales_steady".to_string(),
            daily_series(d(2024, 5, 1), &vec![10.0; 46]),
        );

        let service = service(store);
        let insights = service
            .automated_insights_as_of("sales", 10, as_of)
            .await
            .unwrap();

        assert_eq!(insights.len(), 2);
        assert!(insights[0].insight_id.contains("sales_surge"));
        assert!(insights[0].significance >= insights[1].significance);
        assert!(insights[1].recommended_action.is_some());

        // Cap respected.
        let capped = service
            .automated_insights_as_of("sales", 1, as_of)
            .await
            .unwrap();
        assert_eq!(capped.len(), 1);

        // Identical inputs rank identically.
        let again = service
            .automated_insights_as_of("sales", 10, as_of)
            .await
            .unwrap();
        let ids: Vec<_> = insights.iter().map(|i| &i.insight_id).collect();
        let ids_again: Vec<_> = again.iter().map(|i| &i.insight_id).collect();
        assert_eq!(ids, ids_again);
    }

    #[tokio::test]
    async fn test_insights_unknown_area_is_invalid() {
        let err = service(StubAnalyticsStore::default())
            .automated_insights_as_of("marketing", 5, d(2024, 6, 15))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_inventory_actions_use_fixed_threshold() {
        let mut store = StubAnalyticsStore::default();
        store.inventory = vec![
            InventoryStockRow {
                make: "Toyota".to_string(),
                model: "RAV4".to_string(),
                year: 2024,
                current_stock: 12,
                recommended_stock: 18,
                sales_velocity: 0.9,
                days_supply: 13,
            },
            InventoryStockRow {
                make: "Honda".to_string(),
                model: "Civic".to_string(),
                year: 2024,
                current_stock: 15,
                recommended_stock: 10,
                sales_velocity: 0.5,
                days_supply: 30,
            },
            InventoryStockRow {
                make: "Ford".to_string(),
                model: "F-150".to_string(),
                year: 2024,
                current_stock: 9,
                recommended_stock: 10,
                sales_velocity: 0.7,
                days_supply: 16,
            },
        ];

        let recommendations = service(store).inventory_recommendations().await.unwrap();

        // Sorted by absolute imbalance, largest first.
        assert_eq!(recommendations[0].model, "RAV4");
        assert_eq!(recommendations[0].action, StockAction::Increase);
        assert_eq!(recommendations[0].stock_delta, 6);

        assert_eq!(recommendations[1].model, "Civic");
        assert_eq!(recommendations[1].action, StockAction::Decrease);

        assert_eq!(recommendations[2].model, "F-150");
        assert_eq!(recommendations[2].action, StockAction::Maintain);
    }

    #[tokio::test]
    async fn test_churn_predictions_filter_band_and_sort() {
        let mut store = StubAnalyticsStore::default();
        store.churn = vec![
            ChurnModelRow {
                customer_id: "C1001".to_string(),
                customer_name: "John Smith".to_string(),
                churn_probability: 0.87,
                lifetime_value: 45_000.0,
                days_since_last_purchase: 180,
                churn_factors: vec!["Limited service visits".to_string()],
                recommended_actions: vec!["Personal call from manager".to_string()],
            },
            ChurnModelRow {
                customer_id: "C1254".to_string(),
                customer_name: "Jane Doe".to_string(),
                churn_probability: 0.52,
                lifetime_value: 32_000.0,
                days_since_last_purchase: 145,
                churn_factors: vec![],
                recommended_actions: vec![],
            },
            ChurnModelRow {
                customer_id: "C1300".to_string(),
                customer_name: "Ann Lee".to_string(),
                churn_probability: 0.2,
                lifetime_value: 12_000.0,
                days_since_last_purchase: 30,
                churn_factors: vec![],
                recommended_actions: vec![],
            },
        ];

        let service = service(store);
        let predictions = service.churn_predictions(0.5).await.unwrap();

        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[0].customer_id, "C1001");
        assert_eq!(predictions[0].risk_category, ChurnRiskBand::High);
        assert_eq!(predictions[1].risk_category, ChurnRiskBand::Medium);
        assert!(predictions[0].churn_risk_score >= predictions[1].churn_risk_score);
        for prediction in &predictions {
            assert!((0.0..=1.0).contains(&prediction.churn_risk_score));
        }

        let err = service.churn_predictions(1.5).await.unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidArgument(_)));
    }

    #[test]
    fn test_linear_fit_on_perfect_line() {
        let points = daily_series(d(2024, 1, 1), &[1.0, 2.0, 3.0, 4.0, 5.0]);
        let fit = LinearFit::of(&points);
        assert!((fit.slope - 1.0).abs() < 1e-9);
        assert!((fit.intercept - 1.0).abs() < 1e-9);
        assert!(fit.residual_std < 1e-9);
        assert!((fit.r_squared - 1.0).abs() < 1e-9);
    }
}
