//! Department stock ledger service.
//!
//! Every stock mutation funnels through here. Writes are optimistic: read the
//! row, compute the new row, commit with the version that was read, and retry
//! on a lost race up to `LedgerConfig::max_commit_attempts`.

use tracing::{debug, info, warn};

use stockflow_core::{DepartmentId, DomainError, InventoryItemId};
use stockflow_departments::Department;
use stockflow_inventory::{InventoryItem, LedgerKey, LedgerRow, StockAdjustment, net_adjustments};

use crate::config::LedgerConfig;
use crate::error::{StockError, StockResult};
use crate::store::{CanonicalWrite, RecordStore, UnitOfWork};

#[derive(Debug)]
pub struct InventoryLedger<S> {
    store: S,
    config: LedgerConfig,
}

impl<S> InventoryLedger<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, LedgerConfig::default())
    }

    pub fn with_config(store: S, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }
}

impl<S> InventoryLedger<S>
where
    S: RecordStore,
{
    /// Quantity held by a department (or one of its sections). 0 if no row.
    pub fn get_quantity(
        &self,
        department_id: DepartmentId,
        item_id: InventoryItemId,
        section_id: Option<&str>,
    ) -> StockResult<i64> {
        let key = LedgerKey::new(department_id, item_id, section_id.map(str::to_string));
        Ok(self.row(&key)?.quantity)
    }

    /// Stored row under `key`, or the implicit absent row.
    pub fn row(&self, key: &LedgerKey) -> StockResult<LedgerRow> {
        Ok(self
            .store
            .ledger_row(key)?
            .unwrap_or_else(|| LedgerRow::absent(key.clone())))
    }

    /// Apply a signed delta to one row and return the new quantity.
    ///
    /// The row is created on first write (a zero delta creates it too). A
    /// delta that would take the row below zero fails with
    /// `InsufficientStock` and writes nothing.
    pub fn adjust(
        &self,
        department_id: DepartmentId,
        item_id: InventoryItemId,
        delta: i64,
        section_id: Option<&str>,
    ) -> StockResult<i64> {
        let department = self.require_department(department_id)?;
        if !department.tracks_inventory {
            return Err(DomainError::validation(format!(
                "department {} does not track inventory",
                department.code
            ))
            .into());
        }
        self.require_item(item_id)?;

        let key = LedgerKey::new(department_id, item_id, section_id.map(str::to_string));
        let result = self.with_retry("adjust", || {
            let next = self.row(&key)?.adjusted(delta)?;
            let quantity = next.quantity;
            let mut unit = UnitOfWork::new();
            unit.put_row(next);
            self.store.commit(unit)?;
            Ok(quantity)
        });

        match &result {
            Ok(quantity) => debug!(
                department = %department.code,
                item_id = %item_id,
                delta,
                quantity,
                "ledger row adjusted"
            ),
            Err(e) => warn!(
                department = %department.code,
                item_id = %item_id,
                delta,
                error = %e,
                "ledger adjustment rejected"
            ),
        }
        result
    }

    /// Canonical item-level total.
    pub fn global_quantity(&self, item_id: InventoryItemId) -> StockResult<i64> {
        Ok(self.require_item(item_id)?.quantity)
    }

    /// Overwrite the canonical total.
    pub fn set_global_quantity(&self, item_id: InventoryItemId, quantity: i64) -> StockResult<()> {
        InventoryItem::ensure_valid_quantity(quantity)?;
        let item = self.require_item(item_id)?;

        let mut unit = UnitOfWork::new();
        unit.put_canonical(CanonicalWrite {
            item_id,
            expected: None,
            quantity,
        });
        self.store.commit(unit)?;

        info!(
            item_id = %item_id,
            sku = %item.sku,
            previous = item.quantity,
            quantity,
            "canonical quantity set"
        );
        Ok(())
    }

    /// Every stored row for an item, across departments and sections.
    pub fn rows_for_item(&self, item_id: InventoryItemId) -> StockResult<Vec<LedgerRow>> {
        Ok(self.store.ledger_rows_for_item(item_id)?)
    }

    /// Sum of all ledger rows for an item.
    pub fn summed_quantity(&self, item_id: InventoryItemId) -> StockResult<i64> {
        let rows = self.rows_for_item(item_id)?;
        sum_rows(&rows)
    }

    /// Add the rows produced by `adjustments` to `unit`.
    ///
    /// Adjustments on the same key are netted first, so the stock check runs
    /// once per row against the combined delta. Nothing is written until the
    /// caller commits `unit`; the returned rows are what it will write.
    pub fn stage(
        &self,
        unit: &mut UnitOfWork,
        adjustments: impl IntoIterator<Item = StockAdjustment>,
    ) -> StockResult<Vec<LedgerRow>> {
        let mut staged = Vec::new();
        for adjustment in net_adjustments(adjustments)? {
            let next = self.row(&adjustment.key)?.adjusted(adjustment.delta)?;
            unit.put_row(next.clone());
            staged.push(next);
        }
        Ok(staged)
    }

    /// Run `attempt` until it succeeds, fails with something other than a
    /// conflict, or the attempt budget is spent.
    pub(crate) fn with_retry<T>(
        &self,
        operation: &str,
        mut attempt: impl FnMut() -> StockResult<T>,
    ) -> StockResult<T> {
        let max_attempts = self.config.max_commit_attempts.max(1);
        let mut tries = 1;
        loop {
            match attempt() {
                Err(e) if e.is_conflict() && tries < max_attempts => {
                    debug!(operation, attempt = tries, error = %e, "optimistic conflict, retrying");
                    tries += 1;
                }
                other => return other,
            }
        }
    }

    pub(crate) fn require_department(&self, id: DepartmentId) -> StockResult<Department> {
        self.store
            .department(id)?
            .ok_or_else(|| StockError::from(DomainError::not_found(format!("department {id}"))))
    }

    pub(crate) fn require_item(&self, id: InventoryItemId) -> StockResult<InventoryItem> {
        self.store
            .item(id)?
            .ok_or_else(|| StockError::from(DomainError::not_found(format!("inventory item {id}"))))
    }
}

pub(crate) fn sum_rows(rows: &[LedgerRow]) -> StockResult<i64> {
    rows.iter()
        .try_fold(0i64, |acc, row| acc.checked_add(row.quantity))
        .ok_or_else(|| DomainError::validation("ledger sum overflow").into())
}
