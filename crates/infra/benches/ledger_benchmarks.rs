use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::sync::Arc;

use stockflow_core::{Category, DepartmentId, InventoryItemId};
use stockflow_departments::Department;
use stockflow_events::InMemoryEventBus;
use stockflow_infra::{
    InMemoryRecordStore, InventoryLedger, ReconciliationEngine, RecordStore, TransferEnvelope,
    TransferRequest, TransferWorkflow,
};
use stockflow_inventory::InventoryItem;
use stockflow_transfers::TransferLine;

struct Seeded {
    store: Arc<InMemoryRecordStore>,
    departments: Vec<DepartmentId>,
    items: Vec<InventoryItemId>,
}

/// `departments` tracked departments, `items` drinks items, every row at 1_000.
fn seed(departments: usize, items: usize) -> Seeded {
    let store = Arc::new(InMemoryRecordStore::new());
    let department_ids: Vec<DepartmentId> = (0..departments)
        .map(|i| {
            let dept =
                Department::new(DepartmentId::new(), format!("bar:s{i}"), format!("Bar {i}"));
            let id = dept.id;
            store.put_department(dept).unwrap();
            id
        })
        .collect();

    let ledger = InventoryLedger::new(store.clone());
    let item_ids: Vec<InventoryItemId> = (0..items)
        .map(|i| {
            let item = InventoryItem::new(
                InventoryItemId::new(),
                format!("SKU-{i}"),
                format!("Item {i}"),
                Category::Drinks,
            )
            .with_quantity(1_000 * departments as i64);
            let id = item.id;
            store.put_item(item).unwrap();
            for dept in &department_ids {
                ledger.adjust(*dept, id, 1_000, None).unwrap();
            }
            id
        })
        .collect();

    Seeded {
        store,
        departments: department_ids,
        items: item_ids,
    }
}

fn bench_adjust_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger_adjust");
    group.sample_size(1000);

    let seeded = seed(2, 1);
    let ledger = InventoryLedger::new(seeded.store.clone());
    let (dept, item) = (seeded.departments[0], seeded.items[0]);

    group.bench_function("adjust_existing_row", |b| {
        let mut sign = 1;
        b.iter(|| {
            sign = -sign;
            black_box(ledger.adjust(dept, item, black_box(sign), None).unwrap());
        });
    });

    group.bench_function("get_quantity", |b| {
        b.iter(|| black_box(ledger.get_quantity(dept, item, None).unwrap()));
    });

    group.finish();
}

fn bench_transfer_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("transfer_workflow");

    for lines in [1usize, 10, 50].iter() {
        let seeded = seed(2, *lines);
        let workflow = TransferWorkflow::new(
            InventoryLedger::new(seeded.store.clone()),
            InMemoryEventBus::<TransferEnvelope>::new(),
        );
        let (a, b_dept) = (seeded.departments[0], seeded.departments[1]);

        group.throughput(Throughput::Elements(*lines as u64));
        group.bench_with_input(BenchmarkId::new("create_and_approve", lines), lines, |b, _| {
            let mut forward = true;
            b.iter(|| {
                let (from, to) = if forward { (a, b_dept) } else { (b_dept, a) };
                forward = !forward;
                let request = TransferRequest {
                    from_department_id: from,
                    to_department_id: to,
                    items: seeded
                        .items
                        .iter()
                        .map(|id| TransferLine::new("inventory", *id, 1))
                        .collect(),
                };
                let transfer = workflow.create(request).unwrap();
                black_box(workflow.approve(transfer.id_typed()).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_audit_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconciliation");

    for items in [10usize, 100, 1000].iter() {
        let seeded = seed(5, *items);
        // Every tenth item drifts so the diagnosis path is exercised too.
        let ledger = InventoryLedger::new(seeded.store.clone());
        for item in seeded.items.iter().step_by(10) {
            ledger.adjust(seeded.departments[0], *item, 3, None).unwrap();
        }
        let engine = ReconciliationEngine::new(ledger);

        group.throughput(Throughput::Elements(*items as u64));
        group.bench_with_input(BenchmarkId::new("audit_all", items), items, |b, _| {
            b.iter(|| black_box(engine.audit_all().unwrap().summarize()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_adjust_latency,
    bench_transfer_round_trip,
    bench_audit_all
);
criterion_main!(benches);
