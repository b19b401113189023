use backoffice_core::{
    project,
    types::{EntityId, EntryType, LedgerEntry},
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_decimal::Decimal;

fn ledger(rows: usize, products: usize) -> Vec<LedgerEntry> {
    let types = [EntryType::In, EntryType::Out, EntryType::Reserve, EntryType::Release];
    (0..rows)
        .map(|i| LedgerEntry {
            id: EntityId::new(i.to_string()),
            date: None,
            product_id: EntityId::new(format!("sku-{}", i % products)),
            entry_type: types[i % types.len()],
            qty: Decimal::from((i % 17 + 1) as i64),
            note: None,
        })
        .collect()
}

fn bench_projection(c: &mut Criterion) {
    let mut group = c.benchmark_group("project");
    // 20k rows is the largest ledger document the store accepts
    for rows in [1_000usize, 20_000] {
        let entries = ledger(rows, 500);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &entries, |b, entries| {
            b.iter(|| project(black_box(entries)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_projection);
criterion_main!(benches);
