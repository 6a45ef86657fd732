//! Connector for the parts management module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::{DataEntityMetadata, DataFieldMetadata, FieldType};
use domain::services::{DataExtractionError, ModuleDataConnector};

use super::{entity, HttpConnectorCore};

const MODULE: &str = "PartsManagement";

pub struct PartsDataConnector {
    core: HttpConnectorCore,
}

impl PartsDataConnector {
    pub fn new(base_url: &str, timeout_ms: u64) -> Self {
        Self {
            core: HttpConnectorCore::new(MODULE, base_url, timeout_ms),
        }
    }

    fn entities() -> Vec<DataEntityMetadata> {
        use FieldType::*;
        vec![
            entity(
                "PartsInventory",
                "Current stock position per part",
                None,
                vec![
                    DataFieldMetadata::new("PartId", String, "Unique identifier for the part"),
                    DataFieldMetadata::new("PartNumber", String, "Manufacturer part number"),
                    DataFieldMetadata::new("Description", String, "Part description"),
                    DataFieldMetadata::new("Category", String, "Part category"),
                    DataFieldMetadata::new("QuantityOnHand", Int, "Units currently in stock"),
                    DataFieldMetadata::new("QuantityAllocated", Int, "Units reserved for open orders"),
                    DataFieldMetadata::new("ReorderPoint", Int, "Stock level that triggers reorder"),
                    DataFieldMetadata::new("OptimalStock", Int, "Target stock level"),
                    DataFieldMetadata::new("CostPrice", Decimal, "Unit cost"),
                    DataFieldMetadata::new("RetailPrice", Decimal, "Unit retail price"),
                ],
            ),
            entity(
                "PartTransactions",
                "Stock movements per part",
                Some("TransactionDate"),
                vec![
                    DataFieldMetadata::new("TransactionId", String, "Unique identifier for the movement"),
                    DataFieldMetadata::new("PartId", String, "Part"),
                    DataFieldMetadata::new("TransactionType", String, "Receipt, sale, adjustment"),
                    DataFieldMetadata::new("ReferenceId", String, "Originating document id"),
                    DataFieldMetadata::new("ReferenceType", String, "Originating document type"),
                    DataFieldMetadata::new("Quantity", Int, "Units moved"),
                    DataFieldMetadata::new("TransactionDate", DateTime, "Date of the movement"),
                    DataFieldMetadata::new("UnitPrice", Decimal, "Unit price at the time"),
                    DataFieldMetadata::new("TotalValue", Decimal, "Total movement value"),
                ],
            ),
            entity(
                "PartUsage",
                "Monthly usage aggregates per part",
                Some("Month"),
                vec![
                    DataFieldMetadata::new("PartId", String, "Part"),
                    DataFieldMetadata::new("Month", Date, "Usage month"),
                    DataFieldMetadata::new("QuantitySold", Int, "Units sold over the counter"),
                    DataFieldMetadata::new("QuantityUsedInService", Int, "Units consumed by service orders"),
                    DataFieldMetadata::new("TurnoverRate", Decimal, "Stock turnover rate"),
                    DataFieldMetadata::new("ProfitMargin", Decimal, "Average margin"),
                ],
            ),
            entity(
                "PartSuppliers",
                "Supplier options per part",
                None,
                vec![
                    DataFieldMetadata::new("PartId", String, "Part"),
                    DataFieldMetadata::new("SupplierId", String, "Supplier"),
                    DataFieldMetadata::new("SupplierName", String, "Supplier name"),
                    DataFieldMetadata::new("LeadTime", Int, "Lead time in days"),
                    DataFieldMetadata::new("SupplierPartNumber", String, "Supplier's part number"),
                    DataFieldMetadata::new("UnitCost", Decimal, "Unit cost from this supplier"),
                    DataFieldMetadata::new("IsPreferredSupplier", Boolean, "Preferred supplier flag"),
                ],
            ),
        ]
    }
}

#[async_trait]
impl ModuleDataConnector for PartsDataConnector {
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
    fn test_parts_entity_catalog() {
        let entities = PartsDataConnector::entities();
        let names: Vec<&str> = entities.iter().map(|e| e.entity_name.as_str()).collect();
        assert_eq!(
            names,
            ["PartsInventory", "PartTransactions", "PartUsage", "PartSuppliers"]
        );

        // The inventory snapshot is always extracted in full.
        assert!(!entities[0].supports_incremental);
        assert!(entities[1].supports_incremental);
    }
}
