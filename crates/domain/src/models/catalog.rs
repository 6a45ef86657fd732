//! Data catalog domain models.
//!
//! The catalog describes what is queryable across the federated sources: live
//! business modules (reached through connectors) and precomputed data marts.

use serde::{Deserialize, Serialize};

/// Declared semantic type of a field exposed by a module connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Int,
    Decimal,
    Date,
    DateTime,
    Boolean,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Decimal => "decimal",
            FieldType::Date => "date",
            FieldType::DateTime => "datetime",
            FieldType::Boolean => "boolean",
        }
    }

    /// Whether fields of this type can be sorted on.
    ///
    /// Module fields derive this from their declared type; mart columns carry an
    /// explicit flag instead. The asymmetry is intentional: marts are curated,
    /// live modules are not.
    pub fn is_orderable(&self) -> bool {
        matches!(
            self,
            FieldType::Int | FieldType::Decimal | FieldType::Date | FieldType::DateTime
        )
    }

    /// Whether fields of this type can be grouped by.
    pub fn is_groupable(&self) -> bool {
        matches!(
            self,
            FieldType::String
                | FieldType::Int
                | FieldType::Date
                | FieldType::DateTime
                | FieldType::Boolean
        )
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata for a single field exposed by a module entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DataFieldMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub description: String,
}

impl DataFieldMetadata {
    pub fn new(name: &str, field_type: FieldType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            description: description.to_string(),
        }
    }
}

/// Metadata for one queryable entity served by a module connector.
///
/// Authoritative only for the call that returned it; connectors may disclose a
/// different schema on the next call (schema drift is expected, not an error).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DataEntityMetadata {
    pub entity_name: String,
    pub description: String,
    pub fields: Vec<DataFieldMetadata>,
    /// Whether the entity supports incremental extraction bounded by a watermark.
    pub supports_incremental: bool,
    /// The field used as the incremental watermark, when supported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark_field: Option<String>,
}

/// Kind of data source surfaced by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Module,
    #[serde(rename = "datamart")]
    DataMart,
}

/// Summary entry in the data source listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DataSourceInfo {
    pub source_id: String,
    pub name: String,
    pub kind: SourceKind,
    pub description: String,
    pub is_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_refresh_date: Option<chrono::DateTime<chrono::Utc>>,
}

/// Detailed view of a single data source.
///
/// Modules expose entity metadata; marts expose their column schema and a small
/// sample of rows for preview.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DataSourceDetails {
    #[serde(flatten)]
    pub info: DataSourceInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<DataEntityMetadata>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Vec<super::DataColumnSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rows: Option<Vec<serde_json::Value>>,
}

/// One row of the flattened field catalog.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DataFieldCatalog {
    pub source_id: String,
    pub source_name: String,
    pub source_kind: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
    pub field_name: String,
    pub data_type: String,
    pub description: String,
    pub is_filterable: bool,
    pub is_sortable: bool,
    pub is_groupable: bool,
}

/// Cardinality of a declared relationship between entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationshipKind {
    OneToOne,
    OneToMany,
    ManyToMany,
}

impl RelationshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::OneToOne => "one-to-one",
            RelationshipKind::OneToMany => "one-to-many",
            RelationshipKind::ManyToMany => "many-to-many",
        }
    }
}

impl From<&str> for RelationshipKind {
    fn from(s: &str) -> Self {
        match s {
            "one-to-one" => RelationshipKind::OneToOne,
            "many-to-many" => RelationshipKind::ManyToMany,
            _ => RelationshipKind::OneToMany,
        }
    }
}

/// A declared foreign-key-like link between two entities, enabling join-aware
/// query building.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DataRelationship {
    pub relationship_id: String,
    pub source_entity: String,
    pub source_field: String,
    pub target_entity: String,
    pub target_field: String,
    pub kind: RelationshipKind,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_orderable_classes() {
        assert!(FieldType::Int.is_orderable());
        assert!(FieldType::Decimal.is_orderable());
        assert!(FieldType::Date.is_orderable());
        assert!(FieldType::DateTime.is_orderable());
        assert!(!FieldType::String.is_orderable());
        assert!(!FieldType::Boolean.is_orderable());
    }

    #[test]
    fn test_field_type_groupable_classes() {
        assert!(FieldType::String.is_groupable());
        assert!(FieldType::Int.is_groupable());
        assert!(FieldType::Date.is_groupable());
        assert!(FieldType::DateTime.is_groupable());
        assert!(FieldType::Boolean.is_groupable());
        assert!(!FieldType::Decimal.is_groupable());
    }

    #[test]
    fn test_field_type_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&FieldType::DateTime).unwrap(),
            "\"datetime\""
        );
        let parsed: FieldType = serde_json::from_str("\"decimal\"").unwrap();
        assert_eq!(parsed, FieldType::Decimal);
    }

    #[test]
    fn test_source_kind_serde() {
        assert_eq!(
            serde_json::to_string(&SourceKind::DataMart).unwrap(),
            "\"datamart\""
        );
        assert_eq!(
            serde_json::to_string(&SourceKind::Module).unwrap(),
            "\"module\""
        );
    }

    #[test]
    fn test_relationship_kind_roundtrip() {
        for kind in [
            RelationshipKind::OneToOne,
            RelationshipKind::OneToMany,
            RelationshipKind::ManyToMany,
        ] {
            assert_eq!(RelationshipKind::from(kind.as_str()), kind);
        }
    }
}
