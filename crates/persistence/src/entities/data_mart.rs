//! Data mart metadata entities.

use chrono::{DateTime, Utc};
use domain::models::{
    DataColumnSchema, DataMartDefinition, DataMartStatus, DataRelationship, RelationshipKind,
};
use sqlx::FromRow;
use uuid::Uuid;

/// Data mart definition entity.
#[derive(Debug, Clone, FromRow)]
pub struct DataMartEntity {
    pub mart_id: Uuid,
    pub mart_name: String,
    pub description: String,
    pub status: String,
    pub refresh_schedule: String,
    pub last_refresh_date: Option<DateTime<Utc>>,
}

impl From<DataMartEntity> for DataMartDefinition {
    fn from(entity: DataMartEntity) -> Self {
        DataMartDefinition {
            mart_id: entity.mart_id,
            mart_name: entity.mart_name,
            description: entity.description,
            status: DataMartStatus::from(entity.status.as_str()),
            refresh_schedule: entity.refresh_schedule,
            last_refresh_date: entity.last_refresh_date,
        }
    }
}

/// Column schema entity for one mart column.
#[derive(Debug, Clone, FromRow)]
pub struct DataMartColumnEntity {
    pub mart_name: String,
    pub column_name: String,
    pub data_type: String,
    pub description: String,
    pub is_nullable: bool,
    pub is_filterable: bool,
    pub is_sortable: bool,
    pub is_groupable: bool,
    pub ordinal: i32,
}

impl From<DataMartColumnEntity> for DataColumnSchema {
    fn from(entity: DataMartColumnEntity) -> Self {
        DataColumnSchema {
            name: entity.column_name,
            data_type: entity.data_type,
            description: entity.description,
            is_nullable: entity.is_nullable,
            is_filterable: entity.is_filterable,
            is_sortable: entity.is_sortable,
            is_groupable: entity.is_groupable,
        }
    }
}

/// Declared entity relationship entity.
#[derive(Debug, Clone, FromRow)]
pub struct DataRelationshipEntity {
    pub relationship_id: String,
    pub source_entity: String,
    pub source_field: String,
    pub target_entity: String,
    pub target_field: String,
    pub relationship_type: String,
    pub description: String,
}

impl From<DataRelationshipEntity> for DataRelationship {
    fn from(entity: DataRelationshipEntity) -> Self {
        DataRelationship {
            relationship_id: entity.relationship_id,
            source_entity: entity.source_entity,
            source_field: entity.source_field,
            target_entity: entity.target_entity,
            target_field: entity.target_field,
            kind: RelationshipKind::from(entity.relationship_type.as_str()),
            description: entity.description,
        }
    }
}
