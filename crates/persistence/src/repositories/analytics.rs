//! Analytics repository over the metric and prediction marts.
//!
//! Reads the `marts` metric tables and the `analytics` model-output tables; all
//! of them are populated by the external ETL and model pipelines.

use async_trait::async_trait;
use chrono::NaiveDate;
use domain::models::TrendPoint;
use domain::services::analytics::{AnalyticsStore, ChurnModelRow, InventoryStockRow, KpiRow};
use domain::services::StoreError;
use sqlx::{PgPool, Row};

/// Repository for mart-backed analytics reads.
#[derive(Clone)]
pub struct AnalyticsRepository {
    pool: PgPool,
}

impl AnalyticsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn string_list(value: serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

#[async_trait]
impl AnalyticsStore for AnalyticsRepository {
    async fn kpi_rows(&self, department: &str) -> Result<Vec<KpiRow>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT kpi_id, name, unit, department, current_value, previous_value
            FROM marts.kpi_snapshots
            WHERE $1 = 'all' OR department = $1
            ORDER BY department, kpi_id
            "#,
        )
        .bind(department)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| KpiRow {
                kpi_id: row.get("kpi_id"),
                name: row.get("name"),
                unit: row.get("unit"),
                department: row.get("department"),
                current_value: row.get("current_value"),
                previous_value: row.get("previous_value"),
            })
            .collect())
    }

    async fn metric_exists(&self, metric_id: &str) -> Result<bool, StoreError> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM marts.metric_registry WHERE metric_id = $1) AS present",
        )
        .bind(metric_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("present"))
    }

    async fn metric_display_name(
        &self,
        metric_id: &str,
    ) -> Result<Option<String>, StoreError> {
        let row = sqlx::query(
            "SELECT display_name FROM marts.metric_registry WHERE metric_id = $1",
        )
        .bind(metric_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get("display_name")))
    }

    async fn metric_series(
        &self,
        metric_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TrendPoint>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT observed_date, SUM(value)::float8 AS value
            FROM marts.metric_observations
            WHERE metric_id = $1 AND observed_date BETWEEN $2 AND $3
            GROUP BY observed_date
            ORDER BY observed_date
            "#,
        )
        .bind(metric_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| TrendPoint {
                date: row.get("observed_date"),
                value: row.get("value"),
            })
            .collect())
    }

    async fn metric_value(
        &self,
        metric_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Option<f64>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT SUM(value)::float8 AS value
            FROM marts.metric_observations
            WHERE metric_id = $1 AND observed_date BETWEEN $2 AND $3
            "#,
        )
        .bind(metric_id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<Option<f64>, _>("value"))
    }

    async fn metric_group(&self, group: &str) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query(
            "SELECT metric_id FROM marts.metric_registry WHERE metric_group = $1 ORDER BY metric_id",
        )
        .bind(group)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| row.get("metric_id")).collect())
    }

    async fn inventory_rows(&self) -> Result<Vec<InventoryStockRow>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT make, model, year, current_stock, recommended_stock,
                   sales_velocity, days_supply
            FROM analytics.inventory_recommendations
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InventoryStockRow {
                make: row.get("make"),
                model: row.get("model"),
                year: row.get("year"),
                current_stock: row.get("current_stock"),
                recommended_stock: row.get("recommended_stock"),
                sales_velocity: row.get("sales_velocity"),
                days_supply: row.get("days_supply"),
            })
            .collect())
    }

    async fn churn_rows(&self, min_risk: f64) -> Result<Vec<ChurnModelRow>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT customer_id, customer_name, churn_probability, lifetime_value,
                   days_since_last_purchase, churn_factors, recommended_actions
            FROM analytics.customer_churn_predictions
            WHERE churn_probability >= $1
            ORDER BY churn_probability DESC
            "#,
        )
        .bind(min_risk)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ChurnModelRow {
                customer_id: row.get("customer_id"),
                customer_name: row.get("customer_name"),
                churn_probability: row.get("churn_probability"),
                lifetime_value: row.get("lifetime_value"),
                days_since_last_purchase: row.get("days_since_last_purchase"),
                churn_factors: string_list(row.get("churn_factors")),
                recommended_actions: string_list(row.get("recommended_actions")),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_list_conversion() {
        let value = serde_json::json!(["a", "b", 3]);
        assert_eq!(string_list(value), vec!["a".to_string(), "b".to_string()]);
        assert!(string_list(serde_json::Value::Null).is_empty());
    }
}
