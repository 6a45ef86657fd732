//! Analytics value objects.
//!
//! These are pure computation outputs of the advanced analytics service; none of
//! them are persisted entities.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Direction of a metric's movement between two periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

/// A single KPI with its current and previous-period values.
///
/// `previous_value == None` means the metric is new; that is distinct from a real
/// decline to zero, and in both cases `change_percent` stays `None` rather than
/// dividing by zero.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct KpiResult {
    pub kpi_id: String,
    pub name: String,
    pub value: f64,
    pub previous_value: Option<f64>,
    pub change_percent: Option<f64>,
    pub trend: TrendDirection,
    pub unit: String,
    pub department: String,
}

/// Time frame for trend analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFrame {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl TimeFrame {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFrame::Day => "day",
            TimeFrame::Week => "week",
            TimeFrame::Month => "month",
            TimeFrame::Quarter => "quarter",
            TimeFrame::Year => "year",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "day" => Some(TimeFrame::Day),
            "week" => Some(TimeFrame::Week),
            "month" => Some(TimeFrame::Month),
            "quarter" => Some(TimeFrame::Quarter),
            "year" => Some(TimeFrame::Year),
            _ => None,
        }
    }

    /// Number of buckets a trend series spans for this time frame.
    pub fn bucket_count(&self) -> usize {
        match self {
            TimeFrame::Day => 30,
            TimeFrame::Week => 12,
            TimeFrame::Month => 12,
            TimeFrame::Quarter => 8,
            TimeFrame::Year => 5,
        }
    }
}

/// Bucket granularity for forecasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeGranularity {
    Day,
    Week,
    Month,
}

impl TimeGranularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeGranularity::Day => "day",
            TimeGranularity::Week => "week",
            TimeGranularity::Month => "month",
        }
    }
}

/// Comparison overlay selection for trend analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompareWith {
    PreviousPeriod,
    PreviousYear,
}

impl CompareWith {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "previous-period" => Some(CompareWith::PreviousPeriod),
            "previous-year" => Some(CompareWith::PreviousYear),
            _ => None,
        }
    }
}

/// One point of a time series, aligned to a bucket start date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Trend analysis result: an ordered series plus an optional aligned comparison
/// series of equal length.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TrendResult {
    pub metric_id: String,
    pub metric_name: String,
    pub time_frame: TimeFrame,
    pub points: Vec<TrendPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison_points: Option<Vec<TrendPoint>>,
}

/// Request for a forecast projection.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastRequest {
    pub metric_id: String,
    pub granularity: TimeGranularity,
    pub periods: i32,
    #[serde(default)]
    pub filter: Option<String>,
}

/// One projected point with optional confidence bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<f64>,
}

/// A forecast projection over future periods.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ForecastResult {
    pub metric_id: String,
    pub granularity: TimeGranularity,
    pub points: Vec<ForecastPoint>,
    /// Overall confidence in the projection, 0-1.
    pub confidence_level: f64,
}

/// Period-over-period comparison for every metric in a group.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ComparisonResult {
    pub metric_group: String,
    pub current_period: String,
    pub previous_period: String,
    pub metrics: Vec<MetricComparison>,
}

/// Comparison of one metric across two periods.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct MetricComparison {
    pub metric_id: String,
    pub metric_name: String,
    pub current_value: f64,
    pub previous_value: Option<f64>,
    pub change_percent: Option<f64>,
    pub trend: TrendDirection,
}

/// Request for an ad-hoc query against a data mart.
#[derive(Debug, Clone, Deserialize)]
pub struct AdHocQueryRequest {
    pub mart_name: String,
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub measures: Vec<String>,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub sort_by: Option<Vec<String>>,
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Result of an ad-hoc query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AdHocQueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Value>,
    pub total_count: i64,
}

/// An automatically derived, ranked observation about the data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Insight {
    pub insight_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    /// Ranking weight, 0-1. Deterministic for identical inputs.
    pub significance: f64,
    pub data_points: Vec<InsightDataPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_action: Option<String>,
}

/// A labeled value supporting an insight.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct InsightDataPoint {
    pub label: String,
    pub value: f64,
}

/// Stocking action recommended for a model line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StockAction {
    Increase,
    Decrease,
    Maintain,
}

/// Inventory rebalancing recommendation for one model line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct InventoryRecommendation {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub current_stock: i32,
    pub recommended_stock: i32,
    pub stock_delta: i32,
    pub action: StockAction,
    pub sales_velocity: f64,
    pub days_supply: i32,
}

/// Churn risk band with fixed score boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChurnRiskBand {
    High,
    Medium,
    Low,
}

/// Scores at or above this value are classified `High`.
pub const HIGH_RISK_THRESHOLD: f64 = 0.7;
/// Scores at or above this value (and below the high threshold) are `Medium`.
pub const MEDIUM_RISK_THRESHOLD: f64 = 0.4;

impl ChurnRiskBand {
    /// Buckets a risk score in `[0, 1]` into its band.
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_RISK_THRESHOLD {
            ChurnRiskBand::High
        } else if score >= MEDIUM_RISK_THRESHOLD {
            ChurnRiskBand::Medium
        } else {
            ChurnRiskBand::Low
        }
    }
}

/// Churn risk prediction for one customer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CustomerChurnPrediction {
    pub customer_id: String,
    pub customer_name: String,
    /// Bounded risk score in `[0, 1]`.
    pub churn_risk_score: f64,
    pub risk_category: ChurnRiskBand,
    pub lifetime_value: f64,
    pub days_since_last_purchase: i32,
    pub churn_factors: Vec<String>,
    pub recommended_actions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_frame_parse() {
        assert_eq!(TimeFrame::parse("month"), Some(TimeFrame::Month));
        assert_eq!(TimeFrame::parse("fortnight"), None);
    }

    #[test]
    fn test_compare_with_parse() {
        assert_eq!(
            CompareWith::parse("previous-period"),
            Some(CompareWith::PreviousPeriod)
        );
        assert_eq!(
            CompareWith::parse("previous-year"),
            Some(CompareWith::PreviousYear)
        );
        assert_eq!(CompareWith::parse("last-week"), None);
    }

    #[test]
    fn test_churn_band_boundaries() {
        assert_eq!(ChurnRiskBand::from_score(0.7), ChurnRiskBand::High);
        assert_eq!(ChurnRiskBand::from_score(0.95), ChurnRiskBand::High);
        assert_eq!(ChurnRiskBand::from_score(0.69), ChurnRiskBand::Medium);
        assert_eq!(ChurnRiskBand::from_score(0.4), ChurnRiskBand::Medium);
        assert_eq!(ChurnRiskBand::from_score(0.39), ChurnRiskBand::Low);
        assert_eq!(ChurnRiskBand::from_score(0.0), ChurnRiskBand::Low);
    }

    #[test]
    fn test_trend_direction_serde() {
        assert_eq!(
            serde_json::to_string(&TrendDirection::Flat).unwrap(),
            "\"flat\""
        );
    }

    #[test]
    fn test_forecast_request_deserializes_granularity() {
        let request: ForecastRequest = serde_json::from_str(
            r#"{"metric_id": "sales_revenue", "granularity": "week", "periods": 8}"#,
        )
        .unwrap();
        assert_eq!(request.granularity, TimeGranularity::Week);
        assert_eq!(request.periods, 8);

        // Unknown granularity is rejected at the boundary.
        let result: Result<ForecastRequest, _> = serde_json::from_str(
            r#"{"metric_id": "sales_revenue", "granularity": "hour", "periods": 8}"#,
        );
        assert!(result.is_err());
    }
}
