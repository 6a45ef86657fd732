//! Connector for the service management module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::{DataEntityMetadata, DataFieldMetadata, FieldType};
use domain::services::{DataExtractionError, ModuleDataConnector};

use super::{entity, HttpConnectorCore};

const MODULE: &str = "ServiceManagement";

pub struct ServiceDataConnector {
    core: HttpConnectorCore,
}

impl ServiceDataConnector {
    pub fn new(base_url: &str, timeout_ms: u64) -> Self {
        Self {
            core: HttpConnectorCore::new(MODULE, base_url, timeout_ms),
        }
    }

    fn entities() -> Vec<DataEntityMetadata> {
        use FieldType::*;
        vec![
            entity(
                "ServiceOrders",
                "Repair orders",
                Some("CreatedDate"),
                vec![
                    DataFieldMetadata::new("ServiceOrderId", String, "Unique identifier for the repair order"),
                    DataFieldMetadata::new("VehicleId", String, "Vehicle being serviced"),
                    DataFieldMetadata::new("CustomerId", String, "Customer"),
                    DataFieldMetadata::new("TechnicianId", String, "Assigned technician"),
                    DataFieldMetadata::new("CreatedDate", DateTime, "Date the order was opened"),
                    DataFieldMetadata::new("CompletedDate", DateTime, "Date the order was completed"),
                    DataFieldMetadata::new("Status", String, "Current order status"),
                    DataFieldMetadata::new("TotalCost", Decimal, "Total order cost"),
                    DataFieldMetadata::new("LaborCost", Decimal, "Labor portion of the cost"),
                    DataFieldMetadata::new("PartsCost", Decimal, "Parts portion of the cost"),
                ],
            ),
            entity(
                "ServiceLines",
                "Individual lines on repair orders",
                None,
                vec![
                    DataFieldMetadata::new("ServiceLineId", String, "Unique identifier for the line"),
                    DataFieldMetadata::new("ServiceOrderId", String, "Parent repair order"),
                    DataFieldMetadata::new("ServiceType", String, "Type of work performed"),
                    DataFieldMetadata::new("Description", String, "Work description"),
                    DataFieldMetadata::new("LaborHours", Decimal, "Labor hours booked"),
                    DataFieldMetadata::new("PartId", String, "Part used, if any"),
                    DataFieldMetadata::new("Quantity", Int, "Part quantity used"),
                    DataFieldMetadata::new("Cost", Decimal, "Line cost"),
                ],
            ),
            entity(
                "TechnicianPerformance",
                "Daily technician productivity aggregates",
                Some("Date"),
                vec![
                    DataFieldMetadata::new("TechnicianId", String, "Technician"),
                    DataFieldMetadata::new("Date", Date, "Work date"),
                    DataFieldMetadata::new("JobsCompleted", Int, "Jobs completed that day"),
                    DataFieldMetadata::new("LaborHours", Decimal, "Hours clocked"),
                    DataFieldMetadata::new("BillableHours", Decimal, "Hours billed"),
                    DataFieldMetadata::new("Efficiency", Decimal, "Billable over clocked ratio"),
                ],
            ),
        ]
    }
}

#[async_trait]
impl ModuleDataConnector for ServiceDataConnector {
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
    fn test_service_entity_catalog() {
        let entities = ServiceDataConnector::entities();
        let names: Vec<&str> = entities.iter().map(|e| e.entity_name.as_str()).collect();
        assert_eq!(names, ["ServiceOrders", "ServiceLines", "TechnicianPerformance"]);
    }
}
