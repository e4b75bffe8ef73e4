//! Integration tests for the stock pipeline.
//!
//! Tests: TransferWorkflow → RecordStore → ReconciliationEngine, with events
//! observed on the bus.
//!
//! Verifies:
//! - Approvals move stock atomically and keep audits balanced
//! - Failed approvals leave no trace
//! - Concurrent writers never lose updates

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use stockflow_core::{Category, DepartmentId, DomainError, InventoryItemId, TransferId};
    use stockflow_departments::{Department, DepartmentRegistry};
    use stockflow_events::{EventBus, InMemoryEventBus};
    use stockflow_inventory::InventoryItem;
    use stockflow_transfers::{TransferLine, TransferStatus};

    use crate::config::LedgerConfig;
    use crate::ledger::InventoryLedger;
    use crate::reconciliation::{AuditReport, ReconciliationEngine};
    use crate::store::{DepartmentFilter, InMemoryRecordStore, RecordStore};
    use crate::workflow::{TransferEnvelope, TransferRequest, TransferWorkflow};

    type Store = Arc<InMemoryRecordStore>;
    type Bus = Arc<InMemoryEventBus<TransferEnvelope>>;

    struct Harness {
        store: Store,
        bus: Bus,
        workflow: TransferWorkflow<Store, Bus>,
        engine: ReconciliationEngine<Store>,
        a: DepartmentId,
        b: DepartmentId,
        item: InventoryItemId,
    }

    /// Department A (bar) holds 50 units; B (club) holds none; canonical 50.
    fn setup(max_commit_attempts: u32) -> Harness {
        let store: Store = Arc::new(InMemoryRecordStore::new());
        let bus: Bus = Arc::new(InMemoryEventBus::new());

        let a = Department::new(DepartmentId::new(), "bar:main", "Main Bar");
        let b = Department::new(DepartmentId::new(), "club:lounge", "Club Lounge");
        let item = InventoryItem::new(InventoryItemId::new(), "SKU-GIN", "Gin", Category::Drinks)
            .with_quantity(50);
        let ids = (a.id, b.id, item.id);
        store.put_department(a).unwrap();
        store.put_department(b).unwrap();
        store.put_item(item).unwrap();

        let config = LedgerConfig {
            max_commit_attempts,
        };
        let ledger = InventoryLedger::with_config(store.clone(), config.clone());
        ledger.adjust(ids.0, ids.2, 50, None).unwrap();
        // B must hold a row so a balanced item diagnoses nothing.
        ledger.adjust(ids.1, ids.2, 0, None).unwrap();

        Harness {
            workflow: TransferWorkflow::new(ledger, bus.clone()),
            engine: ReconciliationEngine::new(InventoryLedger::with_config(store.clone(), config)),
            store,
            bus,
            a: ids.0,
            b: ids.1,
            item: ids.2,
        }
    }

    fn request(
        h: &Harness,
        from: DepartmentId,
        to: DepartmentId,
        quantity: i64,
    ) -> TransferRequest {
        TransferRequest {
            from_department_id: from,
            to_department_id: to,
            items: vec![TransferLine::new("inventory", h.item, quantity)],
        }
    }

    fn quantity(h: &Harness, dept: DepartmentId) -> i64 {
        h.workflow.ledger().get_quantity(dept, h.item, None).unwrap()
    }

    fn drifting(h: &Harness) -> Vec<AuditReport> {
        h.engine
            .audit_all()
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn approved_transfer_moves_stock_and_keeps_audit_clean() {
        let h = setup(5);
        let transfer = h.workflow.create(request(&h, h.a, h.b, 10)).unwrap();
        h.workflow.approve(transfer.id_typed()).unwrap();

        assert_eq!(quantity(&h, h.a), 40);
        assert_eq!(quantity(&h, h.b), 10);
        assert_eq!(h.workflow.ledger().global_quantity(h.item).unwrap(), 50);

        let report = h.engine.audit_item(h.item).unwrap();
        assert_eq!((report.summed, report.canonical, report.drift), (50, 50, 0));
        assert!(drifting(&h).is_empty());
    }

    #[test]
    fn insufficient_stock_leaves_rows_and_status_untouched() {
        let h = setup(5);
        h.workflow.ledger().adjust(h.a, h.item, -45, None).unwrap();
        let transfer = h.workflow.create(request(&h, h.a, h.b, 10)).unwrap();

        let err = h.workflow.approve(transfer.id_typed()).unwrap_err();
        assert_eq!(err.as_domain(), Some(&DomainError::insufficient_stock(5, 10)));
        assert_eq!(quantity(&h, h.a), 5);
        assert_eq!(quantity(&h, h.b), 0);
        assert_eq!(
            h.workflow.get(transfer.id_typed()).unwrap().status(),
            TransferStatus::Pending
        );
    }

    #[test]
    fn audit_all_is_idempotent_without_mutation() {
        let h = setup(5);
        h.workflow.ledger().adjust(h.b, h.item, 7, None).unwrap();

        let first = drifting(&h);
        let second = drifting(&h);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].drift, 7);
        assert_eq!(first, second);
    }

    #[test]
    fn published_events_follow_commits() {
        let h = setup(5);
        let sub = h.bus.subscribe();

        let id = h.workflow.create(request(&h, h.a, h.b, 3)).unwrap().id_typed();
        h.workflow.approve(id).unwrap();
        let failed = h.workflow.create(request(&h, h.a, h.b, 500)).unwrap().id_typed();
        assert!(h.workflow.approve(failed).is_err());

        let events: Vec<(String, u64)> = sub
            .drain()
            .into_iter()
            .map(|env| (env.event_type().to_string(), env.sequence_number()))
            .collect();
        assert_eq!(
            events,
            vec![
                ("transfer.created".to_string(), 1),
                ("transfer.completed".to_string(), 2),
                ("transfer.created".to_string(), 1),
            ]
        );
    }

    #[test]
    fn untracked_crossings_keep_sum_and_canonical_aligned() {
        let h = setup(5);
        let pool = Department::new(DepartmentId::new(), "pool", "Pool").untracked();
        let pool_id = pool.id;
        h.store.put_department(pool).unwrap();

        let out = h.workflow.create(request(&h, h.a, pool_id, 8)).unwrap().id_typed();
        h.workflow.approve(out).unwrap();
        assert_eq!(h.workflow.ledger().global_quantity(h.item).unwrap(), 42);

        let back = h.workflow.create(request(&h, pool_id, h.b, 3)).unwrap().id_typed();
        h.workflow.approve(back).unwrap();
        assert_eq!(h.workflow.ledger().global_quantity(h.item).unwrap(), 45);
        assert_eq!(quantity(&h, h.a), 42);
        assert_eq!(quantity(&h, h.b), 3);
        assert!(drifting(&h).is_empty());
    }

    #[test]
    fn parallel_approvals_on_the_same_rows_never_lose_updates() {
        let h = setup(1_000);
        let ids: Vec<TransferId> = (0..20)
            .map(|_| h.workflow.create(request(&h, h.a, h.b, 2)).unwrap().id_typed())
            .collect();

        thread::scope(|scope| {
            for chunk in ids.chunks(5) {
                let workflow = &h.workflow;
                scope.spawn(move || {
                    for id in chunk {
                        workflow.approve(*id).unwrap();
                    }
                });
            }
        });

        assert_eq!(quantity(&h, h.a), 10);
        assert_eq!(quantity(&h, h.b), 40);
        assert_eq!(h.workflow.list(Some(TransferStatus::Completed)).unwrap().len(), 20);
        assert!(drifting(&h).is_empty());
    }

    #[test]
    fn racing_approvals_of_one_transfer_apply_it_once() {
        let h = setup(1_000);
        let id = h.workflow.create(request(&h, h.a, h.b, 10)).unwrap().id_typed();

        let outcomes: Vec<bool> = thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let workflow = &h.workflow;
                    scope.spawn(move || workflow.approve(id).is_ok())
                })
                .collect();
            handles.into_iter().map(|t| t.join().unwrap()).collect()
        });

        assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
        assert_eq!(quantity(&h, h.a), 40);
        assert_eq!(quantity(&h, h.b), 10);
    }

    #[test]
    fn parallel_adjustments_sum_exactly() {
        let h = setup(1_000);
        let ledger = h.workflow.ledger();

        thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..25 {
                        ledger.adjust(h.b, h.item, 1, None).unwrap();
                    }
                });
            }
        });

        assert_eq!(quantity(&h, h.b), 200);
    }

    #[test]
    fn terminals_come_from_stored_section_departments() {
        let h = setup(5);
        h.store
            .put_department(Department::new(DepartmentId::new(), "spa", "Spa"))
            .unwrap();

        let departments = h.store.departments(&DepartmentFilter::all()).unwrap();
        let registry = DepartmentRegistry::new(departments);
        let mut codes: Vec<String> = registry.terminals().into_iter().map(|t| t.id).collect();
        codes.sort();
        assert_eq!(codes, vec!["bar:main".to_string(), "club:lounge".to_string()]);
    }
}
