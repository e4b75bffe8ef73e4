//! Record store boundary.
//!
//! Departments, catalog items, ledger rows and transfers live behind
//! `RecordStore`. Multi-record writes go through a `UnitOfWork` that the
//! store applies atomically under optimistic version checks.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::{InMemoryRecordStore, StoreSnapshot};
pub use r#trait::{CanonicalWrite, DepartmentFilter, RecordStore, StoreError, UnitOfWork};
