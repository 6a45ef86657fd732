//! Data mart repository: definitions, column schemas, sample rows, relationships,
//! and ad-hoc aggregation over mart content tables.
//!
//! Mart content lives in the `marts` schema under the mart's own name; those
//! tables are created and refreshed by the external ETL process, never by this
//! service.

use async_trait::async_trait;
use domain::models::{
    AdHocQueryRequest, AdHocQueryResult, DataColumnSchema, DataMartDefinition, DataRelationship,
};
use domain::services::{DataMartStore, StoreError};
use sqlx::{PgPool, Row};

use crate::entities::{DataMartColumnEntity, DataMartEntity, DataRelationshipEntity};

/// Default row cap for ad-hoc queries without an explicit limit.
const DEFAULT_QUERY_LIMIT: i64 = 100;

/// Repository for data mart metadata and content.
#[derive(Clone)]
pub struct DataMartRepository {
    pool: PgPool,
}

impl DataMartRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Quotes an identifier for interpolation into mart queries.
///
/// Mart and column names come from stored metadata or are validated against it
/// before execution; this is a second line of defense for the dynamic SQL that
/// mart access requires.
fn quote_ident(name: &str) -> Result<String, StoreError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(StoreError(anyhow::anyhow!(
            "invalid identifier: {name:?}"
        )));
    }
    Ok(format!("\"{name}\""))
}

#[async_trait]
impl DataMartStore for DataMartRepository {
    async fn list_marts(&self) -> Result<Vec<DataMartDefinition>, StoreError> {
        let entities = sqlx::query_as::<_, DataMartEntity>(
            r#"
            SELECT mart_id, mart_name, description, status, refresh_schedule,
                   last_refresh_date
            FROM data_marts
            ORDER BY mart_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(entities.into_iter().map(DataMartDefinition::from).collect())
    }

    async fn mart_by_name(&self, name: &str) -> Result<Option<DataMartDefinition>, StoreError> {
        let entity = sqlx::query_as::<_, DataMartEntity>(
            r#"
            SELECT mart_id, mart_name, description, status, refresh_schedule,
                   last_refresh_date
            FROM data_marts
            WHERE mart_name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entity.map(DataMartDefinition::from))
    }

    async fn mart_schema(&self, name: &str) -> Result<Vec<DataColumnSchema>, StoreError> {
        let entities = sqlx::query_as::<_, DataMartColumnEntity>(
            r#"
            SELECT mart_name, column_name, data_type, description, is_nullable,
                   is_filterable, is_sortable, is_groupable, ordinal
            FROM data_mart_columns
            WHERE mart_name = $1
            ORDER BY ordinal
            "#,
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        Ok(entities.into_iter().map(DataColumnSchema::from).collect())
    }

    async fn mart_sample(
        &self,
        name: &str,
        limit: i64,
    ) -> Result<Vec<serde_json::Value>, StoreError> {
        let table = quote_ident(name)?;
        let sql = format!("SELECT row_to_json(t) AS row FROM marts.{table} t LIMIT $1");

        let rows = sqlx::query(&sql).bind(limit).fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|row| row.get::<serde_json::Value, _>("row"))
            .collect())
    }

    async fn relationships(&self) -> Result<Vec<DataRelationship>, StoreError> {
        let entities = sqlx::query_as::<_, DataRelationshipEntity>(
            r#"
            SELECT relationship_id, source_entity, source_field, target_entity,
                   target_field, relationship_type, description
            FROM data_relationships
            ORDER BY relationship_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(entities.into_iter().map(DataRelationship::from).collect())
    }

    async fn ad_hoc_query(
        &self,
        request: &AdHocQueryRequest,
    ) -> Result<AdHocQueryResult, StoreError> {
        let table = quote_ident(&request.mart_name)?;

        let mut select_parts = Vec::new();
        let mut group_parts = Vec::new();
        for dimension in &request.dimensions {
            let ident = quote_ident(dimension)?;
            select_parts.push(ident.clone());
            group_parts.push(ident);
        }
        for measure in &request.measures {
            let ident = quote_ident(measure)?;
            select_parts.push(format!("SUM({ident}) AS {ident}"));
        }

        let mut sql = format!(
            "SELECT {} FROM marts.{table}",
            select_parts.join(", ")
        );
        if let Some(filter) = &request.filter {
            // The filter is an opaque expression owned by the caller's report
            // definition, matching the module extraction contract.
            sql.push_str(&format!(" WHERE {filter}"));
        }
        if !group_parts.is_empty() {
            sql.push_str(&format!(" GROUP BY {}", group_parts.join(", ")));
        }
        if let Some(sort_by) = &request.sort_by {
            let mut order_parts = Vec::new();
            for column in sort_by {
                // Sorting is restricted to selected columns.
                if request.dimensions.contains(column) || request.measures.contains(column) {
                    order_parts.push(quote_ident(column)?);
                }
            }
            if !order_parts.is_empty() {
                sql.push_str(&format!(" ORDER BY {}", order_parts.join(", ")));
            }
        }
        let limit = request.limit.unwrap_or(DEFAULT_QUERY_LIMIT);
        sql.push_str(&format!(" LIMIT {limit}"));

        let wrapped = format!("SELECT row_to_json(q) AS row FROM ({sql}) q");
        let rows = sqlx::query(&wrapped).fetch_all(&self.pool).await?;

        let mut columns = request.dimensions.clone();
        columns.extend(request.measures.iter().cloned());

        let rows: Vec<serde_json::Value> = rows
            .into_iter()
            .map(|row| row.get::<serde_json::Value, _>("row"))
            .collect();

        Ok(AdHocQueryResult {
            total_count: rows.len() as i64,
            columns,
            rows,
        })
    }
}
