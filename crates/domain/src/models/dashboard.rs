//! Dashboard and widget domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::validation::{validate_description, validate_display_name};
use uuid::Uuid;
use validator::Validate;

/// The fixed set of widget types a dashboard can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetType {
    KpiCard,
    LineChart,
    BarChart,
    PieChart,
    Table,
    Gauge,
}

impl WidgetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetType::KpiCard => "kpi_card",
            WidgetType::LineChart => "line_chart",
            WidgetType::BarChart => "bar_chart",
            WidgetType::PieChart => "pie_chart",
            WidgetType::Table => "table",
            WidgetType::Gauge => "gauge",
        }
    }

    pub fn all() -> &'static [WidgetType] {
        &[
            WidgetType::KpiCard,
            WidgetType::LineChart,
            WidgetType::BarChart,
            WidgetType::PieChart,
            WidgetType::Table,
            WidgetType::Gauge,
        ]
    }
}

impl From<&str> for WidgetType {
    fn from(s: &str) -> Self {
        match s {
            "line_chart" => WidgetType::LineChart,
            "bar_chart" => WidgetType::BarChart,
            "pie_chart" => WidgetType::PieChart,
            "table" => WidgetType::Table,
            "gauge" => WidgetType::Gauge,
            _ => WidgetType::KpiCard,
        }
    }
}

/// Catalog entry describing an available widget type.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct WidgetTypeInfo {
    pub widget_type: WidgetType,
    pub name: String,
    pub description: String,
}

impl WidgetTypeInfo {
    pub fn catalog() -> Vec<WidgetTypeInfo> {
        WidgetType::all()
            .iter()
            .map(|wt| {
                let (name, description) = match wt {
                    WidgetType::KpiCard => ("KPI Card", "Single metric with trend indicator"),
                    WidgetType::LineChart => ("Line Chart", "Time series over one or more metrics"),
                    WidgetType::BarChart => ("Bar Chart", "Categorical comparison"),
                    WidgetType::PieChart => ("Pie Chart", "Proportional breakdown"),
                    WidgetType::Table => ("Table", "Tabular result set"),
                    WidgetType::Gauge => ("Gauge", "Progress toward a target value"),
                };
                WidgetTypeInfo {
                    widget_type: *wt,
                    name: name.to_string(),
                    description: description.to_string(),
                }
            })
            .collect()
    }
}

/// A widget placed on a dashboard.
///
/// The query configuration delegates to the same catalog/execution primitives as
/// reports; it is stored opaquely here.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DashboardWidget {
    pub widget_id: Uuid,
    pub dashboard_id: Uuid,
    pub widget_type: WidgetType,
    pub title: String,
    pub position: serde_json::Value,
    pub size: serde_json::Value,
    pub configuration: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// A stored dashboard definition owning an ordered collection of widgets.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DashboardDefinition {
    pub dashboard_id: Uuid,
    pub dashboard_name: String,
    pub description: String,
    pub owner: String,
    pub layout: serde_json::Value,
    pub widgets: Vec<DashboardWidget>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a dashboard.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateDashboardRequest {
    #[validate(custom(function = "validate_display_name"))]
    pub dashboard_name: String,
    #[serde(default)]
    #[validate(custom(function = "validate_description"))]
    pub description: String,
    pub owner: String,
    #[serde(default = "default_layout")]
    pub layout: serde_json::Value,
}

/// Request body for updating a dashboard. The `dashboard_id` must match the path id.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateDashboardRequest {
    pub dashboard_id: Uuid,
    #[validate(custom(function = "validate_display_name"))]
    pub dashboard_name: String,
    #[serde(default)]
    #[validate(custom(function = "validate_description"))]
    pub description: String,
    #[serde(default = "default_layout")]
    pub layout: serde_json::Value,
}

/// Request body for adding a widget to a dashboard.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateWidgetRequest {
    pub widget_type: WidgetType,
    #[validate(custom(function = "validate_display_name"))]
    pub title: String,
    #[serde(default = "default_layout")]
    pub position: serde_json::Value,
    #[serde(default = "default_layout")]
    pub size: serde_json::Value,
    #[serde(default = "default_layout")]
    pub configuration: serde_json::Value,
}

/// Request body for updating a widget.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateWidgetRequest {
    pub widget_type: WidgetType,
    #[validate(custom(function = "validate_display_name"))]
    pub title: String,
    #[serde(default = "default_layout")]
    pub position: serde_json::Value,
    #[serde(default = "default_layout")]
    pub size: serde_json::Value,
    #[serde(default = "default_layout")]
    pub configuration: serde_json::Value,
}

fn default_layout() -> serde_json::Value {
    serde_json::json!({})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widget_type_roundtrip() {
        for wt in WidgetType::all() {
            assert_eq!(WidgetType::from(wt.as_str()), *wt);
        }
    }

    #[test]
    fn test_widget_type_catalog_covers_all_types() {
        let catalog = WidgetTypeInfo::catalog();
        assert_eq!(catalog.len(), WidgetType::all().len());
    }

    #[test]
    fn test_create_dashboard_request_validation() {
        let request = CreateDashboardRequest {
            dashboard_name: "Sales Overview".to_string(),
            description: "Daily sales pulse".to_string(),
            owner: "jdoe".to_string(),
            layout: serde_json::json!({}),
        };
        assert!(validator::Validate::validate(&request).is_ok());

        let request = CreateDashboardRequest {
            dashboard_name: " ".to_string(),
            description: String::new(),
            owner: "jdoe".to_string(),
            layout: serde_json::json!({}),
        };
        assert!(validator::Validate::validate(&request).is_err());
    }
}
