//! Dashboard and widget entities.

use chrono::{DateTime, Utc};
use domain::models::{DashboardDefinition, DashboardWidget, WidgetType};
use sqlx::FromRow;
use uuid::Uuid;

/// Dashboard entity.
#[derive(Debug, Clone, FromRow)]
pub struct DashboardEntity {
    pub dashboard_id: Uuid,
    pub dashboard_name: String,
    pub description: String,
    pub owner: String,
    pub layout: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DashboardEntity {
    /// Combines the dashboard row with its widget rows into the domain model.
    pub fn into_definition(self, widgets: Vec<DashboardWidgetEntity>) -> DashboardDefinition {
        DashboardDefinition {
            dashboard_id: self.dashboard_id,
            dashboard_name: self.dashboard_name,
            description: self.description,
            owner: self.owner,
            layout: self.layout,
            widgets: widgets.into_iter().map(DashboardWidget::from).collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Dashboard widget entity.
#[derive(Debug, Clone, FromRow)]
pub struct DashboardWidgetEntity {
    pub widget_id: Uuid,
    pub dashboard_id: Uuid,
    pub widget_type: String,
    pub title: String,
    pub position: serde_json::Value,
    pub size: serde_json::Value,
    pub configuration: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<DashboardWidgetEntity> for DashboardWidget {
    fn from(entity: DashboardWidgetEntity) -> Self {
        DashboardWidget {
            widget_id: entity.widget_id,
            dashboard_id: entity.dashboard_id,
            widget_type: WidgetType::from(entity.widget_type.as_str()),
            title: entity.title,
            position: entity.position,
            size: entity.size,
            configuration: entity.configuration,
            created_at: entity.created_at,
        }
    }
}
