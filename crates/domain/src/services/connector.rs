//! Module data connector contract and registry.
//!
//! Every business module (CRM, financial management, parts, service, sales) is an
//! independently versioned service. A connector isolates the analytics core from
//! that module's internal data model: the catalog only knows what the connector
//! chooses to disclose, and the module can evolve freely behind it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::DataEntityMetadata;

/// Error raised when an extraction call fails.
///
/// Extraction is all-or-nothing per call: a failed transport never yields a
/// partial payload, it yields this error wrapping the underlying cause and naming
/// the entity that was being extracted.
#[derive(Debug, Error)]
pub enum DataExtractionError {
    #[error("Failed to extract {entity} data from the {module} module: {source}")]
    Transport {
        module: String,
        entity: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Entity {entity} is not exposed by the {module} module")]
    UnknownEntity { module: String, entity: String },
}

impl DataExtractionError {
    pub fn transport(
        module: &str,
        entity: &str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DataExtractionError::Transport {
            module: module.to_string(),
            entity: entity.to_string(),
            source: Box::new(source),
        }
    }
}

/// Capability interface implemented once per source module.
#[async_trait]
pub trait ModuleDataConnector: Send + Sync {
    /// Stable, unique identifier for the owning module.
    fn module_name(&self) -> &str;

    /// Lightweight reachability probe. Availability is advisory: any transport
    /// failure yields `false`, never an error.
    async fn is_available(&self) -> bool;

    /// The entities this connector can currently serve. Authoritative for this
    /// call only; the list may change between calls.
    async fn available_entities(&self) -> Vec<DataEntityMetadata>;

    /// Extracts raw rows for one entity as a serialized JSON payload, optionally
    /// constrained by an opaque filter expression and/or bounded to rows changed
    /// since `changed_since` (incremental extraction).
    async fn extract_data(
        &self,
        entity_name: &str,
        filter: Option<&str>,
        changed_since: Option<DateTime<Utc>>,
    ) -> Result<String, DataExtractionError>;
}

/// Registry of connectors keyed by lowercased module name.
///
/// Insertion order is preserved so catalog listings are stable across calls.
#[derive(Default)]
pub struct ConnectorRegistry {
    ordered: Vec<Arc<dyn ModuleDataConnector>>,
    by_name: HashMap<String, Arc<dyn ModuleDataConnector>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connector. A later registration under the same module name
    /// replaces the earlier one.
    pub fn register(&mut self, connector: Arc<dyn ModuleDataConnector>) {
        let key = connector.module_name().to_lowercase();
        if self.by_name.insert(key, connector.clone()).is_some() {
            self.ordered
                .retain(|c| !c.module_name().eq_ignore_ascii_case(connector.module_name()));
        }
        self.ordered.push(connector);
    }

    /// Looks up a connector by module name, case-insensitively.
    pub fn get(&self, module_name: &str) -> Option<&Arc<dyn ModuleDataConnector>> {
        self.by_name.get(&module_name.to_lowercase())
    }

    /// Iterates connectors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ModuleDataConnector>> {
        self.ordered.iter()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Connector stubs shared by the catalog and engine tests.

    use super::*;
    use crate::models::{DataFieldMetadata, FieldType};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A scriptable in-memory connector.
    pub struct StubConnector {
        pub name: String,
        pub available: bool,
        pub entities: Vec<DataEntityMetadata>,
        pub payload: Result<String, String>,
        pub extract_delay_ms: u64,
        pub extract_calls: AtomicUsize,
    }

    impl StubConnector {
        pub fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                available: true,
                entities: vec![DataEntityMetadata {
                    entity_name: "Customers".to_string(),
                    description: "Customer master records".to_string(),
                    fields: vec![
                        DataFieldMetadata::new("CustomerId", FieldType::String, "Identifier"),
                        DataFieldMetadata::new("CustomerScore", FieldType::Int, "Loyalty score"),
                        DataFieldMetadata::new("LTV", FieldType::Decimal, "Lifetime value"),
                    ],
                    supports_incremental: true,
                    watermark_field: Some("LastUpdatedDate".to_string()),
                }],
                payload: Ok(r#"[{"CustomerId":"C1","CustomerScore":7,"LTV":42000.0}]"#.to_string()),
                extract_delay_ms: 0,
                extract_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ModuleDataConnector for StubConnector {
        fn module_name(&self) -> &str {
            &self.name
        }

        async fn is_available(&self) -> bool {
            self.available
        }

        async fn available_entities(&self) -> Vec<DataEntityMetadata> {
            self.entities.clone()
        }

        async fn extract_data(
            &self,
            entity_name: &str,
            _filter: Option<&str>,
            _changed_since: Option<DateTime<Utc>>,
        ) -> Result<String, DataExtractionError> {
            self.extract_calls.fetch_add(1, Ordering::SeqCst);
            if self.extract_delay_ms > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(self.extract_delay_ms)).await;
            }
            match &self.payload {
                Ok(payload) => Ok(payload.clone()),
                Err(message) => Err(DataExtractionError::transport(
                    &self.name,
                    entity_name,
                    std::io::Error::new(std::io::ErrorKind::Other, message.clone()),
                )),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::StubConnector;
    use super::*;

    #[test]
    fn test_registry_lookup_is_case_insensitive() {
        let mut registry = ConnectorRegistry::new();
        registry.register(Arc::new(StubConnector::new("CRM")));

        assert!(registry.get("crm").is_some());
        assert!(registry.get("CRM").is_some());
        assert!(registry.get("parts").is_none());
    }

    #[test]
    fn test_registry_preserves_insertion_order() {
        let mut registry = ConnectorRegistry::new();
        for name in ["CRM", "FinancialManagement", "PartsManagement"] {
            registry.register(Arc::new(StubConnector::new(name)));
        }

        let names: Vec<_> = registry.iter().map(|c| c.module_name().to_string()).collect();
        assert_eq!(names, ["CRM", "FinancialManagement", "PartsManagement"]);
    }

    #[test]
    fn test_registry_replaces_duplicate_registration() {
        let mut registry = ConnectorRegistry::new();
        registry.register(Arc::new(StubConnector::new("CRM")));

        let mut replacement = StubConnector::new("CRM");
        replacement.available = false;
        registry.register(Arc::new(replacement));

        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_extraction_error_names_entity_and_module() {
        let mut connector = StubConnector::new("CRM");
        connector.payload = Err("connection refused".to_string());

        let err = connector
            .extract_data("Customers", None, None)
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Customers"));
        assert!(message.contains("CRM"));
    }
}
