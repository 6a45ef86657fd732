//! Data catalog service.
//!
//! Presents a unified, browsable inventory of every data source — live modules
//! reached through connectors, plus stored data marts — without executing any
//! analytical query itself.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use super::connector::ConnectorRegistry;
use super::StoreError;
use crate::models::{
    AdHocQueryRequest, AdHocQueryResult, DataColumnSchema, DataFieldCatalog, DataMartDefinition,
    DataRelationship, DataSourceDetails, DataSourceInfo, SourceKind,
};

/// Prefix distinguishing data mart source ids from module source ids.
const MART_ID_PREFIX: &str = "mart_";

/// Number of sample rows returned with mart details.
const SAMPLE_ROW_LIMIT: i64 = 5;

/// Storage abstraction over data mart metadata and content.
#[async_trait]
pub trait DataMartStore: Send + Sync {
    async fn list_marts(&self) -> Result<Vec<DataMartDefinition>, StoreError>;

    async fn mart_by_name(&self, name: &str) -> Result<Option<DataMartDefinition>, StoreError>;

    async fn mart_schema(&self, name: &str) -> Result<Vec<DataColumnSchema>, StoreError>;

    async fn mart_sample(
        &self,
        name: &str,
        limit: i64,
    ) -> Result<Vec<serde_json::Value>, StoreError>;

    async fn relationships(&self) -> Result<Vec<DataRelationship>, StoreError>;

    /// Runs a validated ad-hoc aggregation against one mart. Validation of the
    /// requested fields happens in the analytics service before this is called.
    async fn ad_hoc_query(
        &self,
        request: &AdHocQueryRequest,
    ) -> Result<AdHocQueryResult, StoreError>;
}

/// Errors surfaced by catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Data source '{0}' not found")]
    SourceNotFound(String),

    /// The source exists but its module is currently unreachable. Distinct from
    /// not-found so the API can answer 503 instead of 404.
    #[error("Data source '{0}' is currently unavailable")]
    SourceUnavailable(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The data catalog over all registered connectors and stored marts.
pub struct DataCatalog {
    connectors: Arc<ConnectorRegistry>,
    marts: Arc<dyn DataMartStore>,
}

impl DataCatalog {
    pub fn new(connectors: Arc<ConnectorRegistry>, marts: Arc<dyn DataMartStore>) -> Self {
        Self { connectors, marts }
    }

    /// Lists every data source with its availability.
    ///
    /// A connector failing its probe degrades to `is_available = false`; it never
    /// aborts the aggregate listing.
    pub async fn data_sources(&self) -> Result<Vec<DataSourceInfo>, CatalogError> {
        let mut sources = Vec::new();

        for connector in self.connectors.iter() {
            let name = connector.module_name();
            sources.push(DataSourceInfo {
                source_id: name.to_lowercase(),
                name: name.to_string(),
                kind: SourceKind::Module,
                description: format!("{name} module data"),
                is_available: connector.is_available().await,
                last_refresh_date: None,
            });
        }

        for mart in self.marts.list_marts().await? {
            sources.push(DataSourceInfo {
                source_id: format!("{MART_ID_PREFIX}{}", mart.mart_name.to_lowercase()),
                name: mart.mart_name.clone(),
                kind: SourceKind::DataMart,
                description: mart.description.clone(),
                is_available: mart.is_available(),
                last_refresh_date: mart.last_refresh_date,
            });
        }

        Ok(sources)
    }

    /// Details for one source: entity metadata for modules, schema plus a bounded
    /// sample for marts.
    pub async fn source_details(&self, id: &str) -> Result<DataSourceDetails, CatalogError> {
        if let Some(mart_name) = id.strip_prefix(MART_ID_PREFIX) {
            let mart = self
                .marts
                .mart_by_name(mart_name)
                .await?
                .ok_or_else(|| CatalogError::SourceNotFound(id.to_string()))?;

            let schema = self.marts.mart_schema(&mart.mart_name).await?;
            let sample = self
                .marts
                .mart_sample(&mart.mart_name, SAMPLE_ROW_LIMIT)
                .await?;

            return Ok(DataSourceDetails {
                info: DataSourceInfo {
                    source_id: id.to_string(),
                    name: mart.mart_name.clone(),
                    kind: SourceKind::DataMart,
                    description: mart.description.clone(),
                    is_available: mart.is_available(),
                    last_refresh_date: mart.last_refresh_date,
                },
                entities: None,
                schema: Some(schema),
                sample_rows: Some(sample),
            });
        }

        let connector = self
            .connectors
            .get(id)
            .ok_or_else(|| CatalogError::SourceNotFound(id.to_string()))?;

        if !connector.is_available().await {
            return Err(CatalogError::SourceUnavailable(id.to_string()));
        }

        let name = connector.module_name();
        Ok(DataSourceDetails {
            info: DataSourceInfo {
                source_id: id.to_string(),
                name: name.to_string(),
                kind: SourceKind::Module,
                description: format!("{name} module data"),
                is_available: true,
                last_refresh_date: None,
            },
            entities: Some(connector.available_entities().await),
            schema: None,
            sample_rows: None,
        })
    }

    /// Flattens fields across one or all sources into a single catalog row per
    /// field.
    ///
    /// Mart columns carry their stored capability flags verbatim; module fields
    /// are always filterable, with sortable/groupable derived from the declared
    /// type. The asymmetry is deliberate: mart schemas are curated, module
    /// schemas are not.
    pub async fn data_fields(
        &self,
        source: Option<&str>,
    ) -> Result<Vec<DataFieldCatalog>, CatalogError> {
        let mut fields = Vec::new();

        match source {
            Some(id) if id.starts_with(MART_ID_PREFIX) => {
                let mart_name = &id[MART_ID_PREFIX.len()..];
                let mart = self
                    .marts
                    .mart_by_name(mart_name)
                    .await?
                    .ok_or_else(|| CatalogError::SourceNotFound(id.to_string()))?;
                self.collect_mart_fields(&mart, &mut fields).await?;
            }
            Some(id) => {
                let connector = self
                    .connectors
                    .get(id)
                    .ok_or_else(|| CatalogError::SourceNotFound(id.to_string()))?;
                Self::collect_module_fields(connector.as_ref(), &mut fields).await;
            }
            None => {
                for mart in self.marts.list_marts().await? {
                    self.collect_mart_fields(&mart, &mut fields).await?;
                }
                for connector in self.connectors.iter() {
                    if !connector.is_available().await {
                        warn!(
                            module = connector.module_name(),
                            "Skipping unavailable module in field catalog"
                        );
                        continue;
                    }
                    Self::collect_module_fields(connector.as_ref(), &mut fields).await;
                }
            }
        }

        Ok(fields)
    }

    /// Declared links between entities, enabling join-aware query building.
    pub async fn relationships(&self) -> Result<Vec<DataRelationship>, CatalogError> {
        Ok(self.marts.relationships().await?)
    }

    async fn collect_mart_fields(
        &self,
        mart: &DataMartDefinition,
        out: &mut Vec<DataFieldCatalog>,
    ) -> Result<(), CatalogError> {
        let schema = self.marts.mart_schema(&mart.mart_name).await?;
        for column in schema {
            out.push(DataFieldCatalog {
                source_id: format!("{MART_ID_PREFIX}{}", mart.mart_name.to_lowercase()),
                source_name: mart.mart_name.clone(),
                source_kind: SourceKind::DataMart,
                entity_name: None,
                field_name: column.name,
                data_type: column.data_type,
                description: column.description,
                is_filterable: column.is_filterable,
                is_sortable: column.is_sortable,
                is_groupable: column.is_groupable,
            });
        }
        Ok(())
    }

    async fn collect_module_fields(
        connector: &dyn super::ModuleDataConnector,
        out: &mut Vec<DataFieldCatalog>,
    ) {
        let source_id = connector.module_name().to_lowercase();
        for entity in connector.available_entities().await {
            for field in entity.fields {
                out.push(DataFieldCatalog {
                    source_id: source_id.clone(),
                    source_name: connector.module_name().to_string(),
                    source_kind: SourceKind::Module,
                    entity_name: Some(entity.entity_name.clone()),
                    field_name: field.name,
                    data_type: field.field_type.as_str().to_string(),
                    description: field.description,
                    is_filterable: true,
                    is_sortable: field.field_type.is_orderable(),
                    is_groupable: field.field_type.is_groupable(),
                });
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Mart store stub shared by the catalog, engine, and analytics tests.

    use super::*;
    use crate::models::{DataMartStatus, RelationshipKind};
    use chrono::Utc;
    use uuid::Uuid;

    /// In-memory mart store with one curated sales mart.
    pub(crate) struct StubMartStore {
        pub marts: Vec<DataMartDefinition>,
        pub schema: Vec<DataColumnSchema>,
        pub sample: Vec<serde_json::Value>,
        pub relationships: Vec<DataRelationship>,
    }

    impl StubMartStore {
        pub(crate) fn with_sales_mart() -> Self {
            Self {
                marts: vec![DataMartDefinition {
                    mart_id: Uuid::new_v4(),
                    mart_name: "sales_analytics".to_string(),
                    description: "Denormalized sales facts".to_string(),
                    status: DataMartStatus::Active,
                    refresh_schedule: "0 2 * * *".to_string(),
                    last_refresh_date: Some(Utc::now()),
                }],
                schema: vec![
                    DataColumnSchema {
                        name: "sale_date".to_string(),
                        data_type: "date".to_string(),
                        description: "Date of sale".to_string(),
                        is_nullable: false,
                        is_filterable: true,
                        is_sortable: true,
                        is_groupable: true,
                    },
                    DataColumnSchema {
                        name: "gross_profit".to_string(),
                        data_type: "decimal".to_string(),
                        description: "Gross profit".to_string(),
                        is_nullable: true,
                        // Curated flags that differ from what type derivation
                        // would produce.
                        is_filterable: false,
                        is_sortable: false,
                        is_groupable: true,
                    },
                ],
                sample: vec![serde_json::json!({"sale_date": "2024-05-01", "gross_profit": 3250.0})],
                relationships: vec![DataRelationship {
                    relationship_id: "rel_customer_sales".to_string(),
                    source_entity: "customers".to_string(),
                    source_field: "CustomerId".to_string(),
                    target_entity: "sales".to_string(),
                    target_field: "CustomerId".to_string(),
                    kind: RelationshipKind::OneToMany,
                    description: "Customer to sales".to_string(),
                }],
            }
        }
    }

    #[async_trait]
    impl DataMartStore for StubMartStore {
        async fn list_marts(&self) -> Result<Vec<DataMartDefinition>, StoreError> {
            Ok(self.marts.clone())
        }

        async fn mart_by_name(
            &self,
            name: &str,
        ) -> Result<Option<DataMartDefinition>, StoreError> {
            Ok(self.marts.iter().find(|m| m.mart_name == name).cloned())
        }

        async fn mart_schema(&self, _name: &str) -> Result<Vec<DataColumnSchema>, StoreError> {
            Ok(self.schema.clone())
        }

        async fn mart_sample(
            &self,
            _name: &str,
            limit: i64,
        ) -> Result<Vec<serde_json::Value>, StoreError> {
            Ok(self.sample.iter().take(limit as usize).cloned().collect())
        }

        async fn relationships(&self) -> Result<Vec<DataRelationship>, StoreError> {
            Ok(self.relationships.clone())
        }

        async fn ad_hoc_query(
            &self,
            request: &AdHocQueryRequest,
        ) -> Result<AdHocQueryResult, StoreError> {
            let mut columns = request.dimensions.clone();
            columns.extend(request.measures.clone());
            Ok(AdHocQueryResult {
                columns,
                rows: self.sample.clone(),
                total_count: self.sample.len() as i64,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::StubMartStore;
    use super::*;
    use crate::models::{RelationshipKind, SourceKind};
    use crate::services::connector::test_support::StubConnector;

    fn catalog_with(connectors: Vec<StubConnector>) -> DataCatalog {
        let mut registry = ConnectorRegistry::new();
        for connector in connectors {
            registry.register(Arc::new(connector));
        }
        DataCatalog::new(
            Arc::new(registry),
            Arc::new(StubMartStore::with_sales_mart()),
        )
    }

    #[tokio::test]
    async fn test_data_sources_lists_modules_and_marts() {
        let mut down = StubConnector::new("PartsManagement");
        down.available = false;
        let catalog = catalog_with(vec![StubConnector::new("CRM"), down]);

        let sources = catalog.data_sources().await.unwrap();
        assert_eq!(sources.len(), 3);

        let crm = sources.iter().find(|s| s.source_id == "crm").unwrap();
        assert!(crm.is_available);
        assert_eq!(crm.kind, SourceKind::Module);

        // An unreachable connector degrades its own entry, nothing else.
        let parts = sources
            .iter()
            .find(|s| s.source_id == "partsmanagement")
            .unwrap();
        assert!(!parts.is_available);

        let mart = sources
            .iter()
            .find(|s| s.source_id == "mart_sales_analytics")
            .unwrap();
        assert!(mart.is_available);
        assert_eq!(mart.kind, SourceKind::DataMart);
        assert!(mart.last_refresh_date.is_some());
    }

    #[tokio::test]
    async fn test_source_details_for_module() {
        let catalog = catalog_with(vec![StubConnector::new("CRM")]);
        let details = catalog.source_details("crm").await.unwrap();
        assert_eq!(details.info.name, "CRM");
        assert!(details.entities.is_some());
        assert!(details.schema.is_none());
    }

    #[tokio::test]
    async fn test_source_details_for_mart_includes_bounded_sample() {
        let catalog = catalog_with(vec![]);
        let details = catalog.source_details("mart_sales_analytics").await.unwrap();
        assert!(details.schema.is_some());
        let sample = details.sample_rows.unwrap();
        assert!(sample.len() <= 5);
    }

    #[tokio::test]
    async fn test_source_details_unknown_id_is_not_found() {
        let catalog = catalog_with(vec![StubConnector::new("CRM")]);
        let err = catalog.source_details("telemetry").await.unwrap_err();
        assert!(matches!(err, CatalogError::SourceNotFound(_)));

        let err = catalog.source_details("mart_missing").await.unwrap_err();
        assert!(matches!(err, CatalogError::SourceNotFound(_)));
    }

    #[tokio::test]
    async fn test_source_details_unreachable_module_is_unavailable_not_missing() {
        let mut down = StubConnector::new("CRM");
        down.available = false;
        let catalog = catalog_with(vec![down]);

        let err = catalog.source_details("crm").await.unwrap_err();
        assert!(matches!(err, CatalogError::SourceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_mart_fields_keep_stored_flags_verbatim() {
        let catalog = catalog_with(vec![]);
        let fields = catalog
            .data_fields(Some("mart_sales_analytics"))
            .await
            .unwrap();

        let profit = fields
            .iter()
            .find(|f| f.field_name == "gross_profit")
            .unwrap();
        // Stored flags, not derived: a decimal column that the author marked
        // groupable and non-sortable stays exactly that way.
        assert!(!profit.is_filterable);
        assert!(!profit.is_sortable);
        assert!(profit.is_groupable);
    }

    #[tokio::test]
    async fn test_module_fields_derive_flags_from_type() {
        let catalog = catalog_with(vec![StubConnector::new("CRM")]);
        let fields = catalog.data_fields(Some("crm")).await.unwrap();

        let ltv = fields.iter().find(|f| f.field_name == "LTV").unwrap();
        assert_eq!(ltv.data_type, "decimal");
        assert!(ltv.is_filterable);
        assert!(ltv.is_sortable);
        assert!(!ltv.is_groupable);

        let id = fields.iter().find(|f| f.field_name == "CustomerId").unwrap();
        assert_eq!(id.data_type, "string");
        assert!(!id.is_sortable);
        assert!(id.is_groupable);
    }

    #[tokio::test]
    async fn test_all_fields_skip_unavailable_modules() {
        let mut down = StubConnector::new("PartsManagement");
        down.available = false;
        let catalog = catalog_with(vec![StubConnector::new("CRM"), down]);

        let fields = catalog.data_fields(None).await.unwrap();
        assert!(fields.iter().any(|f| f.source_id == "crm"));
        assert!(!fields.iter().any(|f| f.source_id == "partsmanagement"));
        assert!(fields.iter().any(|f| f.source_id == "mart_sales_analytics"));
    }

    #[tokio::test]
    async fn test_relationships_pass_through() {
        let catalog = catalog_with(vec![]);
        let relationships = catalog.relationships().await.unwrap();
        assert_eq!(relationships.len(), 1);
        assert_eq!(relationships[0].kind, RelationshipKind::OneToMany);
    }
}
