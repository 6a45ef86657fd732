//! Dashboard repository for dashboard and widget storage.

use chrono::Utc;
use domain::models::{
    CreateDashboardRequest, CreateWidgetRequest, DashboardDefinition, DashboardWidget,
    UpdateDashboardRequest, UpdateWidgetRequest,
};
use domain::services::StoreError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{DashboardEntity, DashboardWidgetEntity};

/// Repository for dashboard database operations.
#[derive(Clone)]
pub struct DashboardRepository {
    pool: PgPool,
}

impl DashboardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_dashboards(&self) -> Result<Vec<DashboardDefinition>, StoreError> {
        let entities = sqlx::query_as::<_, DashboardEntity>(
            r#"
            SELECT dashboard_id, dashboard_name, description, owner, layout,
                   created_at, updated_at
            FROM dashboards
            ORDER BY dashboard_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut dashboards = Vec::with_capacity(entities.len());
        for entity in entities {
            let widgets = self.widgets_for(entity.dashboard_id).await?;
            dashboards.push(entity.into_definition(widgets));
        }
        Ok(dashboards)
    }

    pub async fn dashboard_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<DashboardDefinition>, StoreError> {
        let entity = sqlx::query_as::<_, DashboardEntity>(
            r#"
            SELECT dashboard_id, dashboard_name, description, owner, layout,
                   created_at, updated_at
            FROM dashboards
            WHERE dashboard_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match entity {
            Some(entity) => {
                let widgets = self.widgets_for(entity.dashboard_id).await?;
                Ok(Some(entity.into_definition(widgets)))
            }
            None => Ok(None),
        }
    }

    pub async fn create_dashboard(
        &self,
        request: &CreateDashboardRequest,
    ) -> Result<DashboardDefinition, StoreError> {
        let now = Utc::now();
        let dashboard_id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO dashboards (dashboard_id, dashboard_name, description, owner,
                                    layout, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            "#,
        )
        .bind(dashboard_id)
        .bind(&request.dashboard_name)
        .bind(&request.description)
        .bind(&request.owner)
        .bind(&request.layout)
        .bind(now)
        .execute(&self.pool)
        .await?;

        tracing::info!(%dashboard_id, name = %request.dashboard_name, "Created dashboard");

        Ok(DashboardDefinition {
            dashboard_id,
            dashboard_name: request.dashboard_name.clone(),
            description: request.description.clone(),
            owner: request.owner.clone(),
            layout: request.layout.clone(),
            widgets: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns false when the dashboard does not exist.
    pub async fn update_dashboard(
        &self,
        request: &UpdateDashboardRequest,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE dashboards
            SET dashboard_name = $2, description = $3, layout = $4, updated_at = $5
            WHERE dashboard_id = $1
            "#,
        )
        .bind(request.dashboard_id)
        .bind(&request.dashboard_name)
        .bind(&request.description)
        .bind(&request.layout)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Returns false when the dashboard does not exist. Widgets are removed by
    /// the foreign key cascade.
    pub async fn delete_dashboard(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM dashboards WHERE dashboard_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Adds a widget; returns `None` when the dashboard does not exist.
    pub async fn add_widget(
        &self,
        dashboard_id: Uuid,
        request: &CreateWidgetRequest,
    ) -> Result<Option<DashboardWidget>, StoreError> {
        if self.dashboard_exists(dashboard_id).await?.is_none() {
            return Ok(None);
        }

        let now = Utc::now();
        let widget_id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO dashboard_widgets (widget_id, dashboard_id, widget_type, title,
                                           position, size, configuration, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(widget_id)
        .bind(dashboard_id)
        .bind(request.widget_type.as_str())
        .bind(&request.title)
        .bind(&request.position)
        .bind(&request.size)
        .bind(&request.configuration)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Some(DashboardWidget {
            widget_id,
            dashboard_id,
            widget_type: request.widget_type,
            title: request.title.clone(),
            position: request.position.clone(),
            size: request.size.clone(),
            configuration: request.configuration.clone(),
            created_at: now,
        }))
    }

    /// Returns false when the widget does not exist on that dashboard.
    pub async fn update_widget(
        &self,
        dashboard_id: Uuid,
        widget_id: Uuid,
        request: &UpdateWidgetRequest,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE dashboard_widgets
            SET widget_type = $3, title = $4, position = $5, size = $6, configuration = $7
            WHERE widget_id = $2 AND dashboard_id = $1
            "#,
        )
        .bind(dashboard_id)
        .bind(widget_id)
        .bind(request.widget_type.as_str())
        .bind(&request.title)
        .bind(&request.position)
        .bind(&request.size)
        .bind(&request.configuration)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Returns false when the widget does not exist on that dashboard.
    pub async fn delete_widget(
        &self,
        dashboard_id: Uuid,
        widget_id: Uuid,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "DELETE FROM dashboard_widgets WHERE widget_id = $2 AND dashboard_id = $1",
        )
        .bind(dashboard_id)
        .bind(widget_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn dashboard_exists(&self, id: Uuid) -> Result<Option<Uuid>, StoreError> {
        let row: Option<(Uuid,)> =
            sqlx::query_as("SELECT dashboard_id FROM dashboards WHERE dashboard_id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|r| r.0))
    }

    async fn widgets_for(
        &self,
        dashboard_id: Uuid,
    ) -> Result<Vec<DashboardWidgetEntity>, StoreError> {
        Ok(sqlx::query_as::<_, DashboardWidgetEntity>(
            r#"
            SELECT widget_id, dashboard_id, widget_type, title, position, size,
                   configuration, created_at
            FROM dashboard_widgets
            WHERE dashboard_id = $1
            ORDER BY created_at, widget_id
            "#,
        )
        .bind(dashboard_id)
        .fetch_all(&self.pool)
        .await?)
    }
}
