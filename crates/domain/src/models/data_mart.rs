//! Data mart domain models.
//!
//! Data marts are precomputed, periodically refreshed denormalized datasets built
//! by an external ETL process. The analytics core treats them as read-only: a
//! mart goes stale until its next refresh, and nothing here invalidates it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a data mart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataMartStatus {
    Active,
    Inactive,
    Refreshing,
    Failed,
}

impl DataMartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataMartStatus::Active => "active",
            DataMartStatus::Inactive => "inactive",
            DataMartStatus::Refreshing => "refreshing",
            DataMartStatus::Failed => "failed",
        }
    }
}

impl From<&str> for DataMartStatus {
    fn from(s: &str) -> Self {
        match s {
            "active" => DataMartStatus::Active,
            "refreshing" => DataMartStatus::Refreshing,
            "failed" => DataMartStatus::Failed,
            _ => DataMartStatus::Inactive,
        }
    }
}

/// Definition of a data mart: a named, periodically refreshed dataset.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DataMartDefinition {
    pub mart_id: Uuid,
    pub mart_name: String,
    pub description: String,
    pub status: DataMartStatus,
    /// Cron-style refresh schedule, owned by the ETL process.
    pub refresh_schedule: String,
    pub last_refresh_date: Option<DateTime<Utc>>,
}

impl DataMartDefinition {
    /// A mart is queryable only while its stored status is `Active`.
    pub fn is_available(&self) -> bool {
        self.status == DataMartStatus::Active
    }
}

/// Column schema for a data mart.
///
/// The capability flags are set explicitly per column by the mart's author; they
/// are never derived from the data type (unlike module fields).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DataColumnSchema {
    pub name: String,
    pub data_type: String,
    pub description: String,
    pub is_nullable: bool,
    pub is_filterable: bool,
    pub is_sortable: bool,
    pub is_groupable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mart_status_roundtrip() {
        for status in [
            DataMartStatus::Active,
            DataMartStatus::Inactive,
            DataMartStatus::Refreshing,
            DataMartStatus::Failed,
        ] {
            assert_eq!(DataMartStatus::from(status.as_str()), status);
        }
    }

    #[test]
    fn test_unknown_status_defaults_to_inactive() {
        assert_eq!(DataMartStatus::from("archived"), DataMartStatus::Inactive);
    }

    #[test]
    fn test_mart_availability_tracks_active_status() {
        let mut mart = DataMartDefinition {
            mart_id: Uuid::new_v4(),
            mart_name: "sales_analytics".to_string(),
            description: "Denormalized sales facts".to_string(),
            status: DataMartStatus::Active,
            refresh_schedule: "0 2 * * *".to_string(),
            last_refresh_date: None,
        };
        assert!(mart.is_available());

        mart.status = DataMartStatus::Refreshing;
        assert!(!mart.is_available());
    }
}
