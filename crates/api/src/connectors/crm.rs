//! Connector for the Customer Relationship Management (CRM) module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::{DataEntityMetadata, DataFieldMetadata, FieldType};
use domain::services::{DataExtractionError, ModuleDataConnector};

use super::{entity, HttpConnectorCore};

const MODULE: &str = "CRM";

/// Connector for retrieving data from the CRM module.
pub struct CrmDataConnector {
    core: HttpConnectorCore,
}

impl CrmDataConnector {
    pub fn new(base_url: &str, timeout_ms: u64) -> Self {
        Self {
            core: HttpConnectorCore::new(MODULE, base_url, timeout_ms),
        }
    }

    fn entities() -> Vec<DataEntityMetadata> {
        use FieldType::*;
        vec![
            entity(
                "Customers",
                "Customer master records",
                Some("LastUpdatedDate"),
                vec![
                    DataFieldMetadata::new("CustomerId", String, "Unique identifier for the customer"),
                    DataFieldMetadata::new("CustomerType", String, "Type of customer (Individual, Business)"),
                    DataFieldMetadata::new("FirstName", String, "Customer's first name"),
                    DataFieldMetadata::new("LastName", String, "Customer's last name"),
                    DataFieldMetadata::new("CompanyName", String, "Company name for business customers"),
                    DataFieldMetadata::new("Email", String, "Primary email address"),
                    DataFieldMetadata::new("Phone", String, "Primary phone number"),
                    DataFieldMetadata::new("City", String, "City"),
                    DataFieldMetadata::new("State", String, "State/Province"),
                    DataFieldMetadata::new("PostalCode", String, "Postal/Zip code"),
                    DataFieldMetadata::new("CreatedDate", DateTime, "Date customer record was created"),
                    DataFieldMetadata::new("LastUpdatedDate", DateTime, "Date customer record was last updated"),
                    DataFieldMetadata::new("CustomerScore", Int, "Customer loyalty/value score"),
                ],
            ),
            entity(
                "Leads",
                "Sales lead information",
                Some("CreatedDate"),
                vec![
                    DataFieldMetadata::new("LeadId", String, "Unique identifier for the lead"),
                    DataFieldMetadata::new("LeadSource", String, "Source of the lead"),
                    DataFieldMetadata::new("AssignedTo", String, "Sales rep assigned to the lead"),
                    DataFieldMetadata::new("Status", String, "Current status of the lead"),
                    DataFieldMetadata::new("CreatedDate", DateTime, "Date lead was created"),
                    DataFieldMetadata::new("QualificationDate", DateTime, "Date lead was qualified"),
                    DataFieldMetadata::new("ConversionDate", DateTime, "Date lead was converted to opportunity"),
                    DataFieldMetadata::new("InterestLevel", String, "Indicated level of interest"),
                    DataFieldMetadata::new("ProductInterest", String, "Products of interest"),
                ],
            ),
            entity(
                "Opportunities",
                "Sales opportunities",
                Some("LastUpdatedDate"),
                vec![
                    DataFieldMetadata::new("OpportunityId", String, "Unique identifier for the opportunity"),
                    DataFieldMetadata::new("CustomerId", String, "Associated customer ID"),
                    DataFieldMetadata::new("LeadId", String, "Original lead ID, if applicable"),
                    DataFieldMetadata::new("SalesRepId", String, "Sales rep handling the opportunity"),
                    DataFieldMetadata::new("EstimatedValue", Decimal, "Estimated value of the opportunity"),
                    DataFieldMetadata::new("Probability", Decimal, "Probability of closing (%)"),
                    DataFieldMetadata::new("ExpectedCloseDate", Date, "Expected close date"),
                    DataFieldMetadata::new("Status", String, "Current stage in sales pipeline"),
                    DataFieldMetadata::new("CreatedDate", DateTime, "Date opportunity was created"),
                    DataFieldMetadata::new("LastUpdatedDate", DateTime, "Date opportunity was last updated"),
                    DataFieldMetadata::new("CloseDate", DateTime, "Actual close date"),
                    DataFieldMetadata::new("CloseReason", String, "Reason for closing (won/lost)"),
                ],
            ),
            entity(
                "CustomerInteractions",
                "History of interactions with customers",
                Some("InteractionDate"),
                vec![
                    DataFieldMetadata::new("InteractionId", String, "Unique identifier for the interaction"),
                    DataFieldMetadata::new("CustomerId", String, "Associated customer ID"),
                    DataFieldMetadata::new("EmployeeId", String, "Employee who had the interaction"),
                    DataFieldMetadata::new("InteractionType", String, "Type of interaction (call, email, visit)"),
                    DataFieldMetadata::new("InteractionDate", DateTime, "Date and time of interaction"),
                    DataFieldMetadata::new("Duration", Int, "Duration in minutes"),
                    DataFieldMetadata::new("OutcomeCode", String, "Code indicating the outcome"),
                ],
            ),
            entity(
                "CustomerSegments",
                "Customer segmentation data",
                None,
                vec![
                    DataFieldMetadata::new("CustomerId", String, "Customer identifier"),
                    DataFieldMetadata::new("SegmentId", String, "Segment identifier"),
                    DataFieldMetadata::new("SegmentName", String, "Name of the segment"),
                    DataFieldMetadata::new("LTV", Decimal, "Lifetime value estimate"),
                    DataFieldMetadata::new("LastPurchaseDate", Date, "Date of last purchase"),
                    DataFieldMetadata::new("PurchaseFrequency", Decimal, "Average purchases per year"),
                    DataFieldMetadata::new("RecencyScore", Int, "Recency score (1-10)"),
                    DataFieldMetadata::new("FrequencyScore", Int, "Frequency score (1-10)"),
                    DataFieldMetadata::new("MonetaryScore", Int, "Monetary score (1-10)"),
                    DataFieldMetadata::new("ChurnRisk", Decimal, "Risk of customer churn (0-1)"),
                ],
            ),
        ]
    }
}

#[async_trait]
impl ModuleDataConnector for CrmDataConnector {
    fn module_name(&self) -> &str {
        MODULE
    }

    async fn is_available(&self) -> bool {
        self.core.probe().await
    }

    async fn available_entities(&self) -> Vec<DataEntityMetadata> {
        Self::entities()
    }

    async fn extract_data(
        &self,
        entity_name: &str,
        filter: Option<&str>,
        changed_since: Option<DateTime<Utc>>,
    ) -> Result<String, DataExtractionError> {
        if !Self::entities().iter().any(|e| e.entity_name == entity_name) {
            return Err(DataExtractionError::UnknownEntity {
                module: MODULE.to_string(),
                entity: entity_name.to_string(),
            });
        }
        self.core
            .fetch_entity(entity_name, filter, changed_since)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crm_entity_catalog() {
        let entities = CrmDataConnector::entities();
        let names: Vec<&str> = entities.iter().map(|e| e.entity_name.as_str()).collect();
        assert_eq!(
            names,
            [
                "Customers",
                "Leads",
                "Opportunities",
                "CustomerInteractions",
                "CustomerSegments"
            ]
        );

        let customers = &entities[0];
        assert!(customers.supports_incremental);
        assert_eq!(customers.watermark_field.as_deref(), Some("LastUpdatedDate"));

        // Segments are rebuilt wholesale, never extracted incrementally.
        let segments = &entities[4];
        assert!(!segments.supports_incremental);
        assert!(segments.watermark_field.is_none());
    }
}
