//! Connector for the financial management module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::{DataEntityMetadata, DataFieldMetadata, FieldType};
use domain::services::{DataExtractionError, ModuleDataConnector};

use super::{entity, HttpConnectorCore};

const MODULE: &str = "FinancialManagement";

pub struct FinancialDataConnector {
    core: HttpConnectorCore,
}

impl FinancialDataConnector {
    pub fn new(base_url: &str, timeout_ms: u64) -> Self {
        Self {
            core: HttpConnectorCore::new(MODULE, base_url, timeout_ms),
        }
    }

    fn entities() -> Vec<DataEntityMetadata> {
        use FieldType::*;
        vec![
            entity(
                "Transactions",
                "General ledger transactions",
                Some("TransactionDate"),
                vec![
                    DataFieldMetadata::new("TransactionId", String, "Unique identifier for the transaction"),
                    DataFieldMetadata::new("TransactionDate", DateTime, "Date the transaction occurred"),
                    DataFieldMetadata::new("PostingDate", Date, "Date the transaction was posted"),
                    DataFieldMetadata::new("TransactionType", String, "Type of transaction"),
                    DataFieldMetadata::new("AccountId", String, "Ledger account"),
                    DataFieldMetadata::new("DepartmentId", String, "Department the transaction belongs to"),
                    DataFieldMetadata::new("Amount", Decimal, "Transaction amount"),
                    DataFieldMetadata::new("Description", String, "Transaction description"),
                    DataFieldMetadata::new("ReferenceNumber", String, "External reference number"),
                    DataFieldMetadata::new("EnteredBy", String, "User who entered the transaction"),
                ],
            ),
            entity(
                "GeneralLedgerAccounts",
                "Chart of accounts",
                Some("LastModifiedDate"),
                vec![
                    DataFieldMetadata::new("AccountId", String, "Unique identifier for the account"),
                    DataFieldMetadata::new("AccountNumber", String, "Account number"),
                    DataFieldMetadata::new("AccountName", String, "Account name"),
                    DataFieldMetadata::new("AccountType", String, "Asset, liability, income, or expense"),
                    DataFieldMetadata::new("ParentAccountId", String, "Parent account, if any"),
                    DataFieldMetadata::new("IsActive", Boolean, "Whether the account is active"),
                    DataFieldMetadata::new("CreatedDate", DateTime, "Date the account was created"),
                    DataFieldMetadata::new("LastModifiedDate", DateTime, "Date the account was last modified"),
                ],
            ),
            entity(
                "Departments",
                "Dealership departments",
                None,
                vec![
                    DataFieldMetadata::new("DepartmentId", String, "Unique identifier for the department"),
                    DataFieldMetadata::new("DepartmentCode", String, "Short department code"),
                    DataFieldMetadata::new("DepartmentName", String, "Department name"),
                    DataFieldMetadata::new("ManagerId", String, "Department manager"),
                    DataFieldMetadata::new("IsActive", Boolean, "Whether the department is active"),
                    DataFieldMetadata::new("CostCenter", String, "Cost center code"),
                ],
            ),
            entity(
                "FinancialPeriods",
                "Fiscal calendar periods",
                None,
                vec![
                    DataFieldMetadata::new("PeriodId", String, "Unique identifier for the period"),
                    DataFieldMetadata::new("PeriodName", String, "Period display name"),
                    DataFieldMetadata::new("StartDate", Date, "First day of the period"),
                    DataFieldMetadata::new("EndDate", Date, "Last day of the period"),
                    DataFieldMetadata::new("IsClosed", Boolean, "Whether the period is closed"),
                    DataFieldMetadata::new("FiscalYear", Int, "Fiscal year"),
                    DataFieldMetadata::new("FiscalQuarter", Int, "Fiscal quarter"),
                    DataFieldMetadata::new("FiscalMonth", Int, "Fiscal month"),
                ],
            ),
            entity(
                "DepartmentBudgets",
                "Budget amounts per department and period",
                Some("LastModifiedDate"),
                vec![
                    DataFieldMetadata::new("BudgetId", String, "Unique identifier for the budget line"),
                    DataFieldMetadata::new("DepartmentId", String, "Department"),
                    DataFieldMetadata::new("AccountId", String, "Ledger account"),
                    DataFieldMetadata::new("PeriodId", String, "Fiscal period"),
                    DataFieldMetadata::new("Amount", Decimal, "Budgeted amount"),
                    DataFieldMetadata::new("Notes", String, "Budget notes"),
                    DataFieldMetadata::new("LastModifiedBy", String, "User who last modified the line"),
                    DataFieldMetadata::new("LastModifiedDate", DateTime, "Date of last modification"),
                ],
            ),
            entity(
                "FinancialStatements",
                "Computed financial statement lines",
                None,
                vec![
                    DataFieldMetadata::new("StatementId", String, "Unique identifier for the statement"),
                    DataFieldMetadata::new("StatementType", String, "Income statement, balance sheet"),
                    DataFieldMetadata::new("PeriodId", String, "Fiscal period"),
                    DataFieldMetadata::new("DepartmentId", String, "Department"),
                    DataFieldMetadata::new("LineItemKey", String, "Stable key of the line item"),
                    DataFieldMetadata::new("LineItemName", String, "Line item display name"),
                    DataFieldMetadata::new("Amount", Decimal, "Line amount"),
                    DataFieldMetadata::new("Order", Int, "Presentation order"),
                    DataFieldMetadata::new("Level", Int, "Indentation level"),
                    DataFieldMetadata::new("IsTotal", Boolean, "Whether the line is a total"),
                ],
            ),
        ]
    }
}

#[async_trait]
impl ModuleDataConnector for FinancialDataConnector {
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
    fn test_financial_entity_catalog() {
        let entities = FinancialDataConnector::entities();
        let names: Vec<&str> = entities.iter().map(|e| e.entity_name.as_str()).collect();
        assert_eq!(
            names,
            [
                "Transactions",
                "GeneralLedgerAccounts",
                "Departments",
                "FinancialPeriods",
                "DepartmentBudgets",
                "FinancialStatements"
            ]
        );

        let transactions = &entities[0];
        assert_eq!(
            transactions.watermark_field.as_deref(),
            Some("TransactionDate")
        );
    }
}
