//! Ledger reconciliation: compare summed department rows with canonical
//! item totals and explain the difference.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, warn};

use stockflow_core::{Category, DepartmentId, DomainError, InventoryItemId};
use stockflow_departments::DepartmentRegistry;
use stockflow_inventory::InventoryItem;

use crate::config::ReconciliationConfig;
use crate::error::{StockError, StockResult};
use crate::ledger::{InventoryLedger, sum_rows};
use crate::store::{DepartmentFilter, RecordStore};

/// A probable cause for an item's drift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Finding {
    /// An active department of the item's category holds no row for it.
    MissingLedgerRow {
        department_id: DepartmentId,
        department_code: String,
    },
    /// Every mapped department has a row; the totals simply disagree.
    QuantityDrift { delta: i64 },
}

/// Audit outcome for one item. Neither side is assumed correct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub item_id: InventoryItemId,
    pub name: String,
    pub sku: String,
    pub category: Category,
    /// Sum of every ledger row for the item.
    pub summed: i64,
    /// The item's canonical total.
    pub canonical: i64,
    /// `summed - canonical`.
    pub drift: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnosis: Vec<Finding>,
}

impl AuditReport {
    pub fn is_drifting(&self) -> bool {
        self.drift != 0
    }
}

/// An item whose audit could not be computed.
#[derive(Debug, Error, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("audit of item {item_id} failed: {error}")]
pub struct AuditFailure {
    pub item_id: InventoryItemId,
    #[serde(serialize_with = "serialize_display")]
    pub error: StockError,
}

fn serialize_display<S: Serializer>(error: &StockError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Totals over one full pass of [`Audit`].
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummary {
    pub items_scanned: usize,
    /// Sum of every reported drift.
    pub net_drift: i64,
    pub reports: Vec<AuditReport>,
    pub failures: Vec<AuditFailure>,
}

impl AuditSummary {
    pub fn drifting(&self) -> usize {
        self.reports.len()
    }

    pub fn is_clean(&self) -> bool {
        self.reports.is_empty() && self.failures.is_empty()
    }
}

/// Read-only drift detector.
///
/// The engine never writes. It reads rows and canonical totals separately,
/// so an audit running between two commits of *different* units of work can
/// observe a transient mismatch that disappears on the next pass; each single
/// approval is atomic, but audits are not serialized against them.
#[derive(Debug)]
pub struct ReconciliationEngine<S> {
    ledger: InventoryLedger<S>,
    config: ReconciliationConfig,
}

impl<S> ReconciliationEngine<S> {
    pub fn new(ledger: InventoryLedger<S>) -> Self {
        Self::with_config(ledger, ReconciliationConfig::default())
    }

    pub fn with_config(ledger: InventoryLedger<S>, config: ReconciliationConfig) -> Self {
        Self { ledger, config }
    }

    pub fn ledger(&self) -> &InventoryLedger<S> {
        &self.ledger
    }
}

impl<S> ReconciliationEngine<S>
where
    S: RecordStore,
{
    /// Compare one item's ledger sum with its canonical total.
    ///
    /// Always returns a report, drifting or not. Diagnosis is attached to
    /// drifting reports when `diagnose_drift` is enabled.
    pub fn audit_item(&self, item_id: InventoryItemId) -> StockResult<AuditReport> {
        let item = self.ledger.require_item(item_id)?;
        let rows = self.ledger.rows_for_item(item_id)?;
        let summed = sum_rows(&rows)?;
        let drift = summed
            .checked_sub(item.quantity)
            .ok_or_else(|| DomainError::validation("drift overflow"))?;

        let diagnosis = if drift != 0 && self.config.diagnose_drift {
            self.diagnose_item(&item, drift)?
        } else {
            Vec::new()
        };

        Ok(AuditReport {
            item_id,
            name: item.name,
            sku: item.sku,
            category: item.category,
            summed,
            canonical: item.quantity,
            drift,
            diagnosis,
        })
    }

    /// Explain a drift of `drift` units for one item. Empty for zero drift.
    pub fn diagnose(&self, item_id: InventoryItemId, drift: i64) -> StockResult<Vec<Finding>> {
        let item = self.ledger.require_item(item_id)?;
        self.diagnose_item(&item, drift)
    }

    /// Iterate drifting items.
    ///
    /// The item list is read when this is called; each item is audited when
    /// the iterator reaches it. Calling again starts a fresh pass over current
    /// state.
    pub fn audit_all(&self) -> StockResult<Audit<'_, S>> {
        let pending: Vec<InventoryItemId> = self
            .ledger
            .store()
            .items()?
            .into_iter()
            .map(|item| item.id)
            .collect();
        Ok(Audit {
            engine: self,
            pending: pending.into_iter(),
            scanned: 0,
        })
    }

    fn diagnose_item(&self, item: &InventoryItem, drift: i64) -> StockResult<Vec<Finding>> {
        if drift == 0 {
            return Ok(Vec::new());
        }

        let registry = DepartmentRegistry::new(
            self.ledger.store().departments(&DepartmentFilter::active())?,
        );
        let holders: BTreeSet<DepartmentId> = self
            .ledger
            .rows_for_item(item.id)?
            .into_iter()
            .map(|row| row.key.department_id)
            .collect();

        let findings: Vec<Finding> = registry
            .active_in_category(item.category)
            .into_iter()
            .filter(|d| d.tracks_inventory && !holders.contains(&d.id))
            .map(|d| Finding::MissingLedgerRow {
                department_id: d.id,
                department_code: d.code.clone(),
            })
            .collect();

        if findings.is_empty() {
            return Ok(vec![Finding::QuantityDrift { delta: drift }]);
        }
        Ok(findings)
    }
}

/// Lazy pass over every catalog item, yielding drifting reports and
/// per-item failures.
pub struct Audit<'a, S> {
    engine: &'a ReconciliationEngine<S>,
    pending: std::vec::IntoIter<InventoryItemId>,
    scanned: usize,
}

impl<S: RecordStore> Audit<'_, S> {
    /// Drain the pass into totals.
    pub fn summarize(mut self) -> AuditSummary {
        let mut summary = AuditSummary::default();
        for outcome in self.by_ref() {
            match outcome {
                Ok(report) => {
                    summary.net_drift = summary.net_drift.saturating_add(report.drift);
                    summary.reports.push(report);
                }
                Err(failure) => summary.failures.push(failure),
            }
        }
        summary.items_scanned = self.scanned;
        summary
    }
}

impl<S: RecordStore> Iterator for Audit<'_, S> {
    type Item = Result<AuditReport, AuditFailure>;

    fn next(&mut self) -> Option<Self::Item> {
        for item_id in self.pending.by_ref() {
            self.scanned += 1;
            match self.engine.audit_item(item_id) {
                Ok(report) if report.is_drifting() => {
                    debug!(item_id = %item_id, drift = report.drift, "drift detected");
                    return Some(Ok(report));
                }
                Ok(_) => continue,
                Err(error) => {
                    warn!(item_id = %item_id, error = %error, "item audit failed");
                    return Some(Err(AuditFailure { item_id, error }));
                }
            }
        }
        None
    }
}
