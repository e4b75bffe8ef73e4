use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use stockflow_core::{AggregateRoot, DepartmentId, Entity, InventoryItemId, TransferId};
use stockflow_departments::Department;
use stockflow_inventory::{InventoryItem, LedgerKey, LedgerRow};
use stockflow_transfers::DepartmentTransfer;

use super::r#trait::{DepartmentFilter, RecordStore, StoreError, UnitOfWork};

/// Serializable image of every record the store holds.
///
/// This is the format the operational CLI loads from disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    #[serde(default)]
    pub departments: Vec<Department>,
    #[serde(default)]
    pub items: Vec<InventoryItem>,
    #[serde(default)]
    pub ledger: Vec<LedgerRow>,
    #[serde(default)]
    pub transfers: Vec<DepartmentTransfer>,
}

#[derive(Debug, Default)]
struct Records {
    departments: BTreeMap<DepartmentId, Department>,
    items: BTreeMap<InventoryItemId, InventoryItem>,
    ledger: BTreeMap<LedgerKey, LedgerRow>,
    transfers: BTreeMap<TransferId, DepartmentTransfer>,
}

impl Records {
    fn row_version(&self, key: &LedgerKey) -> u64 {
        self.ledger.get(key).map(|r| r.version).unwrap_or(0)
    }

    fn transfer_version(&self, id: TransferId) -> u64 {
        self.transfers.get(&id).map(|t| t.version()).unwrap_or(0)
    }

    /// Check every expectation in `unit` against current state without
    /// writing anything.
    fn validate(&self, unit: &UnitOfWork) -> Result<(), StoreError> {
        let mut seen = BTreeSet::new();
        for (row, expected) in unit.rows() {
            if !seen.insert(&row.key) {
                return Err(StoreError::InvalidRecord(format!(
                    "ledger row {:?} written twice in one unit",
                    row.key
                )));
            }
            if row.quantity < 0 {
                return Err(StoreError::InvalidRecord(format!(
                    "ledger row {:?} has negative quantity {}",
                    row.key, row.quantity
                )));
            }
            let current = self.row_version(&row.key);
            if !expected.matches(current) {
                return Err(StoreError::Conflict(format!(
                    "ledger row {:?}: expected {expected:?}, found {current}",
                    row.key
                )));
            }
        }

        for write in unit.canonical() {
            let item = self
                .items
                .get(&write.item_id)
                .ok_or_else(|| StoreError::NotFound(format!("inventory item {}", write.item_id)))?;
            if write.quantity < 0 {
                return Err(StoreError::InvalidRecord(format!(
                    "inventory item {} has negative canonical quantity {}",
                    write.item_id, write.quantity
                )));
            }
            if let Some(expected) = write.expected {
                if item.quantity != expected {
                    return Err(StoreError::Conflict(format!(
                        "inventory item {}: expected canonical {expected}, found {}",
                        write.item_id, item.quantity
                    )));
                }
            }
        }

        for (transfer, expected) in unit.transfers() {
            let current = self.transfer_version(transfer.id_typed());
            if !expected.matches(current) {
                return Err(StoreError::Conflict(format!(
                    "transfer {}: expected {expected:?}, found {current}",
                    transfer.id_typed()
                )));
            }
        }

        Ok(())
    }
}

/// Later duplicates replace earlier ones.
fn index_by_id<E>(entities: Vec<E>) -> BTreeMap<E::Id, E>
where
    E: Entity,
    E::Id: Ord,
{
    entities
        .into_iter()
        .map(|entity| (entity.id().clone(), entity))
        .collect()
}

/// In-memory record store.
///
/// Intended for tests, the CLI and dev. One lock guards all tables so a
/// `UnitOfWork` is validated and applied as a single critical section.
/// Ordered maps keep listings deterministic.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<Records>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a snapshot.
    ///
    /// Loaded ledger rows count as existing, so a stored version of 0 is
    /// raised to 1. Negative quantities are rejected.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self, StoreError> {
        if let Some(item) = snapshot.items.iter().find(|i| i.quantity < 0) {
            return Err(StoreError::InvalidRecord(format!(
                "inventory item {} has negative canonical quantity {}",
                item.id, item.quantity
            )));
        }

        let mut records = Records {
            departments: index_by_id(snapshot.departments),
            items: index_by_id(snapshot.items),
            ..Records::default()
        };
        for mut row in snapshot.ledger {
            if row.quantity < 0 {
                return Err(StoreError::InvalidRecord(format!(
                    "ledger row {:?} has negative quantity {}",
                    row.key, row.quantity
                )));
            }
            row.version = row.version.max(1);
            records.ledger.insert(row.key.clone(), row);
        }
        for transfer in snapshot.transfers {
            records.transfers.insert(transfer.id_typed(), transfer);
        }

        Ok(Self {
            records: RwLock::new(records),
        })
    }

    /// Current contents, in the same shape `from_snapshot` accepts.
    pub fn snapshot(&self) -> Result<StoreSnapshot, StoreError> {
        let records = self.read()?;
        Ok(StoreSnapshot {
            departments: records.departments.values().cloned().collect(),
            items: records.items.values().cloned().collect(),
            ledger: records.ledger.values().cloned().collect(),
            transfers: records.transfers.values().cloned().collect(),
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Records>, StoreError> {
        self.records.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Records>, StoreError> {
        self.records.write().map_err(|_| StoreError::Poisoned)
    }
}

impl RecordStore for InMemoryRecordStore {
    fn department(&self, id: DepartmentId) -> Result<Option<Department>, StoreError> {
        Ok(self.read()?.departments.get(&id).cloned())
    }

    fn departments(&self, filter: &DepartmentFilter) -> Result<Vec<Department>, StoreError> {
        Ok(self
            .read()?
            .departments
            .values()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect())
    }

    fn put_department(&self, department: Department) -> Result<(), StoreError> {
        self.write()?.departments.insert(department.id, department);
        Ok(())
    }

    fn item(&self, id: InventoryItemId) -> Result<Option<InventoryItem>, StoreError> {
        Ok(self.read()?.items.get(&id).cloned())
    }

    fn items(&self) -> Result<Vec<InventoryItem>, StoreError> {
        Ok(self.read()?.items.values().cloned().collect())
    }

    fn put_item(&self, item: InventoryItem) -> Result<(), StoreError> {
        if item.quantity < 0 {
            return Err(StoreError::InvalidRecord(format!(
                "inventory item {} has negative canonical quantity {}",
                item.id, item.quantity
            )));
        }
        self.write()?.items.insert(item.id, item);
        Ok(())
    }

    fn ledger_row(&self, key: &LedgerKey) -> Result<Option<LedgerRow>, StoreError> {
        Ok(self.read()?.ledger.get(key).cloned())
    }

    fn ledger_rows_for_item(&self, item_id: InventoryItemId) -> Result<Vec<LedgerRow>, StoreError> {
        Ok(self
            .read()?
            .ledger
            .values()
            .filter(|r| r.key.inventory_item_id == item_id)
            .cloned()
            .collect())
    }

    fn transfer(&self, id: TransferId) -> Result<Option<DepartmentTransfer>, StoreError> {
        Ok(self.read()?.transfers.get(&id).cloned())
    }

    fn transfers(&self) -> Result<Vec<DepartmentTransfer>, StoreError> {
        Ok(self.read()?.transfers.values().cloned().collect())
    }

    fn commit(&self, unit: UnitOfWork) -> Result<(), StoreError> {
        if unit.is_empty() {
            return Ok(());
        }

        let mut records = self.write()?;
        records.validate(&unit)?;

        let (rows, canonical, transfers) = unit.into_parts();
        for (row, _) in rows {
            records.ledger.insert(row.key.clone(), row);
        }
        for write in canonical {
            if let Some(item) = records.items.get_mut(&write.item_id) {
                item.quantity = write.quantity;
            }
        }
        for (transfer, _) in transfers {
            records.transfers.insert(transfer.id_typed(), transfer);
        }

        Ok(())
    }
}
