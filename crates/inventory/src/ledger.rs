//! Department ledger rows.
//!
//! A row is keyed by (department, optional section, item) and holds a
//! non-negative quantity. Rows are created lazily on first write and never
//! deleted, only zeroed. `version` is the optimistic concurrency token the
//! store checks on commit; 0 means the row does not exist yet.

use serde::{Deserialize, Serialize};

use stockflow_core::{DepartmentId, DomainError, DomainResult, InventoryItemId};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerKey {
    pub department_id: DepartmentId,
    #[serde(default)]
    pub section_id: Option<String>,
    pub inventory_item_id: InventoryItemId,
}

impl LedgerKey {
    pub fn new(
        department_id: DepartmentId,
        inventory_item_id: InventoryItemId,
        section_id: Option<String>,
    ) -> Self {
        Self {
            department_id,
            section_id,
            inventory_item_id,
        }
    }

    pub fn department(department_id: DepartmentId, inventory_item_id: InventoryItemId) -> Self {
        Self::new(department_id, inventory_item_id, None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRow {
    #[serde(flatten)]
    pub key: LedgerKey,
    pub quantity: i64,
    #[serde(default)]
    pub version: u64,
}

impl LedgerRow {
    /// The implicit zero row read when nothing is stored under `key`.
    pub fn absent(key: LedgerKey) -> Self {
        Self {
            key,
            quantity: 0,
            version: 0,
        }
    }

    pub fn exists(&self) -> bool {
        self.version > 0
    }

    /// The row as it would be after applying `delta`.
    ///
    /// Fails with `InsufficientStock` when the result would be negative; the
    /// receiver is left untouched either way.
    pub fn adjusted(&self, delta: i64) -> DomainResult<LedgerRow> {
        let quantity = self
            .quantity
            .checked_add(delta)
            .ok_or_else(|| DomainError::validation("ledger quantity overflow"))?;
        if quantity < 0 {
            return Err(DomainError::insufficient_stock(self.quantity, requested(delta)?));
        }
        Ok(LedgerRow {
            key: self.key.clone(),
            quantity,
            version: self.version + 1,
        })
    }
}

/// The removal size reported for a negative `delta`.
pub(crate) fn requested(delta: i64) -> DomainResult<i64> {
    delta
        .checked_neg()
        .ok_or_else(|| DomainError::validation("requested quantity overflow"))
}

/// A requested signed change to one ledger row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockAdjustment {
    pub key: LedgerKey,
    pub delta: i64,
}

impl StockAdjustment {
    pub fn new(key: LedgerKey, delta: i64) -> Self {
        Self { key, delta }
    }
}

/// Combine adjustments that target the same row, keeping first-seen order.
///
/// A transfer listing the same item twice is checked against stock once, for
/// its total.
pub fn net_adjustments(
    adjustments: impl IntoIterator<Item = StockAdjustment>,
) -> DomainResult<Vec<StockAdjustment>> {
    let mut netted: Vec<StockAdjustment> = Vec::new();
    for adj in adjustments {
        match netted.iter_mut().find(|n| n.key == adj.key) {
            Some(existing) => {
                existing.delta = existing
                    .delta
                    .checked_add(adj.delta)
                    .ok_or_else(|| DomainError::validation("netted adjustment overflow"))?;
            }
            None => netted.push(adj),
        }
    }
    Ok(netted)
}
