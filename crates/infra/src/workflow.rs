//! Transfer workflow: create, approve, reject.
//!
//! Each step loads the transfer, lets the aggregate decide, then commits the
//! new transfer state (and for approval, every ledger and canonical write) in
//! one `UnitOfWork`. Events are published only after the commit succeeds.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use stockflow_core::{
    Aggregate, AggregateId, AggregateRoot, DepartmentId, DomainError, ExpectedVersion,
    InventoryItemId, TransferId,
};
use stockflow_events::{EventBus, EventEnvelope};
use stockflow_inventory::{LedgerKey, StockAdjustment};
use stockflow_transfers::{
    CompleteTransfer, CreateTransfer, DepartmentTransfer, RejectTransfer, TransferCommand,
    TransferEvent, TransferLine, TransferStatus,
};

use crate::error::{StockError, StockResult};
use crate::ledger::InventoryLedger;
use crate::store::{CanonicalWrite, RecordStore, UnitOfWork};

/// Aggregate type stamped on published transfer envelopes.
pub const TRANSFER_AGGREGATE_TYPE: &str = "department.transfer";

pub type TransferEnvelope = EventEnvelope<TransferEvent>;

/// Transfer creation input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub from_department_id: DepartmentId,
    pub to_department_id: DepartmentId,
    pub items: Vec<TransferLine>,
}

#[derive(Debug)]
pub struct TransferWorkflow<S, B> {
    ledger: InventoryLedger<S>,
    bus: B,
}

impl<S, B> TransferWorkflow<S, B> {
    pub fn new(ledger: InventoryLedger<S>, bus: B) -> Self {
        Self { ledger, bus }
    }

    pub fn ledger(&self) -> &InventoryLedger<S> {
        &self.ledger
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<S, B> TransferWorkflow<S, B>
where
    S: RecordStore,
    B: EventBus<TransferEnvelope>,
{
    /// Persist a new `pending` transfer.
    pub fn create(&self, request: TransferRequest) -> StockResult<DepartmentTransfer> {
        let TransferRequest {
            from_department_id,
            to_department_id,
            items,
        } = request;

        DepartmentTransfer::validate_request(from_department_id, to_department_id, &items)?;

        let from = self.ledger.require_department(from_department_id)?;
        let to = self.ledger.require_department(to_department_id)?;
        if !from.tracks_inventory && !to.tracks_inventory {
            return Err(DomainError::invalid_transfer(format!(
                "neither {} nor {} tracks inventory",
                from.code, to.code
            ))
            .into());
        }
        for line in &items {
            self.ledger.require_item(line.product_id)?;
        }

        let transfer_id = TransferId::new();
        let mut transfer = DepartmentTransfer::empty(transfer_id);
        let events = transfer.handle(&TransferCommand::Create(CreateTransfer {
            transfer_id,
            from_department_id,
            to_department_id,
            items,
            occurred_at: Utc::now(),
        }))?;
        for event in &events {
            transfer.apply(event);
        }

        let mut unit = UnitOfWork::new();
        unit.put_transfer(transfer.clone(), ExpectedVersion::Exact(0));
        self.ledger.store().commit(unit)?;

        info!(
            transfer_id = %transfer_id,
            from = %from.code,
            to = %to.code,
            lines = transfer.items().len(),
            "transfer created"
        );
        self.publish(transfer_id, 0, events);
        Ok(transfer)
    }

    /// Move stock for every line and mark the transfer `completed`.
    ///
    /// All ledger rows, any canonical-quantity changes and the status change
    /// commit together. If any row lacks stock nothing is written and the
    /// transfer stays `pending`.
    pub fn approve(&self, transfer_id: TransferId) -> StockResult<DepartmentTransfer> {
        let result = self.ledger.with_retry("approve", || {
            let mut transfer = self.get(transfer_id)?;
            let from_version = transfer.version();
            let events = transfer.handle(&TransferCommand::Complete(CompleteTransfer {
                transfer_id,
                occurred_at: Utc::now(),
            }))?;

            let mut unit = UnitOfWork::new();
            self.stage_stock_movement(&mut unit, &transfer)?;

            for event in &events {
                transfer.apply(event);
            }
            unit.advance_transfer(transfer.clone(), events.len() as u64);
            self.ledger.store().commit(unit)?;
            Ok((transfer, from_version, events))
        });

        match result {
            Ok((transfer, from_version, events)) => {
                info!(
                    transfer_id = %transfer_id,
                    from = %transfer.from_department_id(),
                    to = %transfer.to_department_id(),
                    "transfer completed"
                );
                self.publish(transfer_id, from_version, events);
                Ok(transfer)
            }
            Err(e) => {
                warn!(transfer_id = %transfer_id, error = %e, "transfer approval rejected");
                Err(e)
            }
        }
    }

    /// Mark a pending transfer `rejected`. The ledger is not touched.
    pub fn reject(&self, transfer_id: TransferId, reason: &str) -> StockResult<DepartmentTransfer> {
        let (transfer, from_version, events) = self.ledger.with_retry("reject", || {
            let mut transfer = self.get(transfer_id)?;
            let from_version = transfer.version();
            let events = transfer.handle(&TransferCommand::Reject(RejectTransfer {
                transfer_id,
                reason: reason.to_string(),
                occurred_at: Utc::now(),
            }))?;
            for event in &events {
                transfer.apply(event);
            }

            let mut unit = UnitOfWork::new();
            unit.advance_transfer(transfer.clone(), events.len() as u64);
            self.ledger.store().commit(unit)?;
            Ok((transfer, from_version, events))
        })?;

        info!(
            transfer_id = %transfer_id,
            reason = transfer.rejection_reason().unwrap_or_default(),
            "transfer rejected"
        );
        self.publish(transfer_id, from_version, events);
        Ok(transfer)
    }

    pub fn get(&self, transfer_id: TransferId) -> StockResult<DepartmentTransfer> {
        self.ledger
            .store()
            .transfer(transfer_id)?
            .ok_or_else(|| {
                StockError::from(DomainError::not_found(format!("transfer {transfer_id}")))
            })
    }

    /// Stored transfers, optionally only those in `status`.
    pub fn list(&self, status: Option<TransferStatus>) -> StockResult<Vec<DepartmentTransfer>> {
        let transfers = self.ledger.store().transfers()?;
        Ok(transfers
            .into_iter()
            .filter(|t| status.is_none_or(|s| t.status() == s))
            .collect())
    }

    /// Stage ledger rows and canonical writes for moving every line.
    ///
    /// Tracked departments move stock between ledger rows. A side that does
    /// not track inventory has no rows; stock crossing that boundary enters
    /// or leaves the canonical total instead.
    fn stage_stock_movement(
        &self,
        unit: &mut UnitOfWork,
        transfer: &DepartmentTransfer,
    ) -> StockResult<()> {
        let from = self.ledger.require_department(transfer.from_department_id())?;
        let to = self.ledger.require_department(transfer.to_department_id())?;

        let mut adjustments = Vec::new();
        let mut canonical: BTreeMap<InventoryItemId, i64> = BTreeMap::new();
        for line in transfer.items() {
            if from.tracks_inventory {
                adjustments.push(StockAdjustment::new(
                    LedgerKey::department(from.id, line.product_id),
                    -line.quantity,
                ));
            }
            if to.tracks_inventory {
                adjustments.push(StockAdjustment::new(
                    LedgerKey::department(to.id, line.product_id),
                    line.quantity,
                ));
            }

            let crossing = match (from.tracks_inventory, to.tracks_inventory) {
                (true, false) => -line.quantity,
                (false, true) => line.quantity,
                _ => 0,
            };
            if crossing != 0 {
                let total = canonical.entry(line.product_id).or_insert(0);
                *total = total
                    .checked_add(crossing)
                    .ok_or_else(|| DomainError::validation("transfer quantity overflow"))?;
            }
        }

        self.ledger.stage(unit, adjustments)?;

        for (item_id, delta) in canonical {
            let item = self.ledger.require_item(item_id)?;
            let quantity = item.canonical_after(delta)?;
            unit.put_canonical(CanonicalWrite {
                item_id,
                expected: Some(item.quantity),
                quantity,
            });
        }

        Ok(())
    }

    /// Best-effort: the commit already happened, so a failed publish is
    /// logged rather than surfaced.
    fn publish(&self, transfer_id: TransferId, from_version: u64, events: Vec<TransferEvent>) {
        let aggregate_id = AggregateId::from(transfer_id);
        for (offset, event) in (1u64..).zip(events) {
            let envelope = EventEnvelope::wrap(
                aggregate_id,
                TRANSFER_AGGREGATE_TYPE,
                from_version + offset,
                event,
            );
            if let Err(e) = self.bus.publish(envelope) {
                warn!(transfer_id = %transfer_id, error = ?e, "failed to publish transfer event");
            }
        }
    }
}
