//! Connector for the sales management module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::{DataEntityMetadata, DataFieldMetadata, FieldType};
use domain::services::{DataExtractionError, ModuleDataConnector};

use super::{entity, HttpConnectorCore};

const MODULE: &str = "SalesManagement";

pub struct SalesDataConnector {
    core: HttpConnectorCore,
}

impl SalesDataConnector {
    pub fn new(base_url: &str, timeout_ms: u64) -> Self {
        Self {
            core: HttpConnectorCore::new(MODULE, base_url, timeout_ms),
        }
    }

    fn entities() -> Vec<DataEntityMetadata> {
        use FieldType::*;
        vec![
            entity(
                "VehicleSales",
                "Completed vehicle sale transactions",
                Some("SaleDate"),
                vec![
                    DataFieldMetadata::new("SaleId", String, "Unique identifier for the sale"),
                    DataFieldMetadata::new("VehicleId", String, "Vehicle sold"),
                    DataFieldMetadata::new("CustomerId", String, "Buying customer"),
                    DataFieldMetadata::new("SalesPersonId", String, "Salesperson who closed the deal"),
                    DataFieldMetadata::new("SaleDate", DateTime, "Date the sale closed"),
                    DataFieldMetadata::new("SaleType", String, "New, used, or fleet"),
                    DataFieldMetadata::new("SalePrice", Decimal, "Final sale price"),
                    DataFieldMetadata::new("CostBasis", Decimal, "Dealer cost of the vehicle"),
                    DataFieldMetadata::new("GrossProfit", Decimal, "Front-end gross profit"),
                    DataFieldMetadata::new("FinanceType", String, "Cash, finance, or lease"),
                    DataFieldMetadata::new("TradeInValue", Decimal, "Trade-in allowance, if any"),
                ],
            ),
            entity(
                "VehicleInventory",
                "Vehicles currently in stock",
                None,
                vec![
                    DataFieldMetadata::new("VehicleId", String, "Unique identifier for the vehicle"),
                    DataFieldMetadata::new("Vin", String, "Vehicle identification number"),
                    DataFieldMetadata::new("Make", String, "Manufacturer"),
                    DataFieldMetadata::new("Model", String, "Model"),
                    DataFieldMetadata::new("Year", Int, "Model year"),
                    DataFieldMetadata::new("Trim", String, "Trim level"),
                    DataFieldMetadata::new("Status", String, "In stock, in transit, sold"),
                    DataFieldMetadata::new("AcquisitionDate", Date, "Date acquired"),
                    DataFieldMetadata::new("AcquisitionCost", Decimal, "Acquisition cost"),
                    DataFieldMetadata::new("ListPrice", Decimal, "Current list price"),
                    DataFieldMetadata::new("DaysInStock", Int, "Days on the lot"),
                ],
            ),
            entity(
                "SalesPersons",
                "Sales staff",
                None,
                vec![
                    DataFieldMetadata::new("SalesPersonId", String, "Unique identifier for the salesperson"),
                    DataFieldMetadata::new("FirstName", String, "First name"),
                    DataFieldMetadata::new("LastName", String, "Last name"),
                    DataFieldMetadata::new("TeamId", String, "Sales team"),
                    DataFieldMetadata::new("HireDate", Date, "Hire date"),
                    DataFieldMetadata::new("IsActive", Boolean, "Whether currently employed"),
                ],
            ),
        ]
    }
}

#[async_trait]
impl ModuleDataConnector for SalesDataConnector {
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
    fn test_sales_entity_catalog() {
        let entities = SalesDataConnector::entities();
        let names: Vec<&str> = entities.iter().map(|e| e.entity_name.as_str()).collect();
        assert_eq!(names, ["VehicleSales", "VehicleInventory", "SalesPersons"]);
        assert_eq!(entities[0].watermark_field.as_deref(), Some("SaleDate"));
    }
}
