//! Infrastructure layer: record store, ledger and transfer services,
//! reconciliation, configuration.

pub mod config;
pub mod error;
pub mod ledger;
pub mod reconciliation;
pub mod store;
pub mod workflow;

#[cfg(test)]
mod integration_tests;

pub use config::{LedgerConfig, ReconciliationConfig, StockflowConfig};
pub use error::{StockError, StockResult};
pub use ledger::InventoryLedger;
pub use reconciliation::{
    Audit, AuditFailure, AuditReport, AuditSummary, Finding, ReconciliationEngine,
};
pub use store::{
    CanonicalWrite, DepartmentFilter, InMemoryRecordStore, RecordStore, StoreError,
    StoreSnapshot, UnitOfWork,
};
pub use workflow::{TRANSFER_AGGREGATE_TYPE, TransferEnvelope, TransferRequest, TransferWorkflow};
