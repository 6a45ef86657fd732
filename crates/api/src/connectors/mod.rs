//! HTTP module data connectors.
//!
//! One connector per source business module. Each probes `{base}/health` for
//! availability and extracts entity payloads from
//! `{base}/api/reporting/{entity}` with optional `filter` and `changedSince`
//! query parameters. Entity metadata is hardcoded per connector, reflecting each
//! module's stable reporting schema.

mod crm;
mod financial;
mod parts;
mod sales;
mod service;

pub use crm::CrmDataConnector;
pub use financial::FinancialDataConnector;
pub use parts::PartsDataConnector;
pub use sales::SalesDataConnector;
pub use service::ServiceDataConnector;

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use domain::models::{DataEntityMetadata, DataFieldMetadata};
use domain::services::DataExtractionError;
use reqwest::Client;
use tracing::warn;

/// Shared HTTP plumbing for the concrete connectors.
pub(crate) struct HttpConnectorCore {
    client: Client,
    base_url: String,
    module: &'static str,
}

impl HttpConnectorCore {
    pub(crate) fn new(module: &'static str, base_url: &str, timeout_ms: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            module,
        }
    }

    /// Health probe. Availability is advisory: any failure is `false`, never an
    /// error.
    pub(crate) async fn probe(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                warn!(module = self.module, error = %err, "Failed to reach module health endpoint");
                false
            }
        }
    }

    /// Fetches one entity's payload. All-or-nothing: any transport or status
    /// failure becomes a `DataExtractionError` naming the entity.
    pub(crate) async fn fetch_entity(
        &self,
        entity_name: &str,
        filter: Option<&str>,
        changed_since: Option<DateTime<Utc>>,
    ) -> Result<String, DataExtractionError> {
        let url = format!("{}/api/reporting/{entity_name}", self.base_url);

        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(filter) = filter {
            query.push(("filter", filter.to_string()));
        }
        if let Some(watermark) = changed_since {
            query.push((
                "changedSince",
                watermark.to_rfc3339_opts(SecondsFormat::Secs, true),
            ));
        }

        let mut request = self.client.get(&url);
        if !query.is_empty() {
            request = request.query(&query);
        }

        let response = request
            .send()
            .await
            .map_err(|err| DataExtractionError::transport(self.module, entity_name, err))?
            .error_for_status()
            .map_err(|err| DataExtractionError::transport(self.module, entity_name, err))?;

        response
            .text()
            .await
            .map_err(|err| DataExtractionError::transport(self.module, entity_name, err))
    }
}

/// Shorthand for building an entity's metadata block.
pub(crate) fn entity(
    name: &str,
    description: &str,
    watermark_field: Option<&str>,
    fields: Vec<DataFieldMetadata>,
) -> DataEntityMetadata {
    DataEntityMetadata {
        entity_name: name.to_string(),
        description: description.to_string(),
        fields,
        supports_incremental: watermark_field.is_some(),
        watermark_field: watermark_field.map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::services::ModuleDataConnector;

    #[tokio::test]
    async fn test_probe_unreachable_host_is_false_not_error() {
        // Port 9 (discard) is not listening; the probe must degrade, not fail.
        let core = HttpConnectorCore::new("CRM", "http://127.0.0.1:9", 500);
        assert!(!core.probe().await);
    }

    #[tokio::test]
    async fn test_unknown_entity_is_rejected_before_any_request() {
        let connector = CrmDataConnector::new("http://127.0.0.1:9", 500);
        let err = connector
            .extract_data("NotAnEntity", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DataExtractionError::UnknownEntity { .. }));
        assert!(err.to_string().contains("NotAnEntity"));
    }

    #[tokio::test]
    async fn test_extraction_against_dead_host_wraps_transport_error() {
        let connector = CrmDataConnector::new("http://127.0.0.1:9", 500);
        let err = connector
            .extract_data("Customers", None, None)
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Customers"));
        assert!(message.contains("CRM"));
    }

    #[test]
    fn test_every_connector_discloses_entities() {
        let base = "http://127.0.0.1:9";
        let connectors: Vec<Box<dyn ModuleDataConnector>> = vec![
            Box::new(CrmDataConnector::new(base, 500)),
            Box::new(FinancialDataConnector::new(base, 500)),
            Box::new(PartsDataConnector::new(base, 500)),
            Box::new(ServiceDataConnector::new(base, 500)),
            Box::new(SalesDataConnector::new(base, 500)),
        ];

        let names: Vec<&str> = connectors.iter().map(|c| c.module_name()).collect();
        assert_eq!(
            names,
            [
                "CRM",
                "FinancialManagement",
                "PartsManagement",
                "ServiceManagement",
                "SalesManagement"
            ]
        );
    }
}
