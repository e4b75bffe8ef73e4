use std::sync::Arc;

use thiserror::Error;

use stockflow_core::{AggregateRoot, DepartmentId, ExpectedVersion, InventoryItemId, TransferId};
use stockflow_departments::Department;
use stockflow_inventory::{InventoryItem, LedgerKey, LedgerRow};
use stockflow_transfers::DepartmentTransfer;

/// Record store operation error.
///
/// These are **infrastructure errors** (storage, concurrency) as opposed to
/// domain errors (validation, invariants).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Conflict(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Filter for department lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepartmentFilter {
    pub active_only: bool,
}

impl DepartmentFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn active() -> Self {
        Self { active_only: true }
    }

    pub fn matches(&self, department: &Department) -> bool {
        !self.active_only || department.is_active
    }
}

/// Conditional write of an item's canonical quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalWrite {
    pub item_id: InventoryItemId,
    /// Value the writer read; `None` writes unconditionally.
    pub expected: Option<i64>,
    pub quantity: i64,
}

/// A set of writes that commit together or not at all.
///
/// Every write carries the version (or value) its author read. The store
/// rejects the whole unit with `StoreError::Conflict` if any of them moved in
/// the meantime.
#[derive(Debug, Clone, Default)]
pub struct UnitOfWork {
    rows: Vec<(LedgerRow, ExpectedVersion)>,
    canonical: Vec<CanonicalWrite>,
    transfers: Vec<(DepartmentTransfer, ExpectedVersion)>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a row whose `version` was already bumped from the one read.
    pub fn put_row(&mut self, row: LedgerRow) -> &mut Self {
        let expected = ExpectedVersion::Exact(row.version.saturating_sub(1));
        self.rows.push((row, expected));
        self
    }

    pub fn put_canonical(&mut self, write: CanonicalWrite) -> &mut Self {
        self.canonical.push(write);
        self
    }

    /// Store a transfer snapshot, expecting the stored copy to be at
    /// `expected` (`Exact(0)` for a new transfer).
    pub fn put_transfer(
        &mut self,
        transfer: DepartmentTransfer,
        expected: ExpectedVersion,
    ) -> &mut Self {
        self.transfers.push((transfer, expected));
        self
    }

    /// Store a transfer that was just advanced by `applied_events` events.
    pub fn advance_transfer(
        &mut self,
        transfer: DepartmentTransfer,
        applied_events: u64,
    ) -> &mut Self {
        let expected = ExpectedVersion::Exact(transfer.version().saturating_sub(applied_events));
        self.put_transfer(transfer, expected)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.canonical.is_empty() && self.transfers.is_empty()
    }

    pub fn rows(&self) -> &[(LedgerRow, ExpectedVersion)] {
        &self.rows
    }

    pub fn canonical(&self) -> &[CanonicalWrite] {
        &self.canonical
    }

    pub fn transfers(&self) -> &[(DepartmentTransfer, ExpectedVersion)] {
        &self.transfers
    }

    pub fn into_parts(
        self,
    ) -> (
        Vec<(LedgerRow, ExpectedVersion)>,
        Vec<CanonicalWrite>,
        Vec<(DepartmentTransfer, ExpectedVersion)>,
    ) {
        (self.rows, self.canonical, self.transfers)
    }
}

/// Persisted records the stock core reads and writes.
///
/// Departments and items are provisioned by other parts of the system; the
/// `put_*` methods exist for provisioning, fixtures and snapshot loading.
/// Stock mutations go exclusively through [`RecordStore::commit`].
///
/// Implementations must:
/// - apply a `UnitOfWork` atomically (all writes or none)
/// - reject the unit if any expected version/value does not match
/// - serialize concurrent commits touching the same key
pub trait RecordStore: Send + Sync {
    fn department(&self, id: DepartmentId) -> Result<Option<Department>, StoreError>;

    fn departments(&self, filter: &DepartmentFilter) -> Result<Vec<Department>, StoreError>;

    fn put_department(&self, department: Department) -> Result<(), StoreError>;

    fn item(&self, id: InventoryItemId) -> Result<Option<InventoryItem>, StoreError>;

    /// All catalog items, in a stable order.
    fn items(&self) -> Result<Vec<InventoryItem>, StoreError>;

    fn put_item(&self, item: InventoryItem) -> Result<(), StoreError>;

    fn ledger_row(&self, key: &LedgerKey) -> Result<Option<LedgerRow>, StoreError>;

    fn ledger_rows_for_item(&self, item_id: InventoryItemId) -> Result<Vec<LedgerRow>, StoreError>;

    fn transfer(&self, id: TransferId) -> Result<Option<DepartmentTransfer>, StoreError>;

    fn transfers(&self) -> Result<Vec<DepartmentTransfer>, StoreError>;

    fn commit(&self, unit: UnitOfWork) -> Result<(), StoreError>;
}

impl<S> RecordStore for Arc<S>
where
    S: RecordStore + ?Sized,
{
    fn department(&self, id: DepartmentId) -> Result<Option<Department>, StoreError> {
        (**self).department(id)
    }

    fn departments(&self, filter: &DepartmentFilter) -> Result<Vec<Department>, StoreError> {
        (**self).departments(filter)
    }

    fn put_department(&self, department: Department) -> Result<(), StoreError> {
        (**self).put_department(department)
    }

    fn item(&self, id: InventoryItemId) -> Result<Option<InventoryItem>, StoreError> {
        (**self).item(id)
    }

    fn items(&self) -> Result<Vec<InventoryItem>, StoreError> {
        (**self).items()
    }

    fn put_item(&self, item: InventoryItem) -> Result<(), StoreError> {
        (**self).put_item(item)
    }

    fn ledger_row(&self, key: &LedgerKey) -> Result<Option<LedgerRow>, StoreError> {
        (**self).ledger_row(key)
    }

    fn ledger_rows_for_item(&self, item_id: InventoryItemId) -> Result<Vec<LedgerRow>, StoreError> {
        (**self).ledger_rows_for_item(item_id)
    }

    fn transfer(&self, id: TransferId) -> Result<Option<DepartmentTransfer>, StoreError> {
        (**self).transfer(id)
    }

    fn transfers(&self) -> Result<Vec<DepartmentTransfer>, StoreError> {
        (**self).transfers()
    }

    fn commit(&self, unit: UnitOfWork) -> Result<(), StoreError> {
        (**self).commit(unit)
    }
}
