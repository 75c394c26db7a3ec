//! Benchmarks for the two aggregation strategies
//!
//! Each iteration stores one trade and renders a report, the same work the
//! driver does per aggregated message:
//! - recomputing store: O(window) per report
//! - incremental store: O(1) per report
//!
//! Platform: Cross-platform (synthetic ticks, CI-safe)

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::{Value, json};
use std::hint::black_box;
use vwapfeed::aggregation::{IncrementalStore, RecomputingStore, VwapStore};
use vwapfeed::config::FieldNames;

const TICKS: usize = 10_000;

fn match_fields() -> FieldNames {
    FieldNames { type_value: "match".into(), quantity_field: "quantity".into(), ..FieldNames::default() }
}

/// Deterministic pseudo-random ticks for ETH-BTC.
fn synthetic_ticks(count: usize) -> Vec<Value> {
    let mut state = 0x2545_F491_4F6C_DD1Du64;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state >> 11) as f64 / (1u64 << 53) as f64
    };

    (0..count)
        .map(|_| {
            json!({
                "type": "match",
                "product_id": "ETH-BTC",
                "price": 0.03 + next() * 0.03,
                "quantity": next(),
            })
        })
        .collect()
}

fn run<S: VwapStore>(mut store: S, ticks: &[Value]) -> String {
    for tick in ticks {
        black_box(store.store(tick).ok());
        black_box(store.report(true));
    }
    store.report(true)
}

fn bench_store_and_report(c: &mut Criterion) {
    let ticks = synthetic_ticks(TICKS);

    let mut group = c.benchmark_group("store_and_report");
    group.throughput(Throughput::Elements(TICKS as u64));

    for capacity in [50usize, 200, 1000] {
        group.bench_with_input(BenchmarkId::new("recomputing", capacity), &capacity, |b, &cap| {
            b.iter(|| run(RecomputingStore::new(["ETH-BTC"], match_fields(), cap), &ticks))
        });
        group.bench_with_input(BenchmarkId::new("incremental", capacity), &capacity, |b, &cap| {
            b.iter(|| run(IncrementalStore::new(["ETH-BTC"], match_fields(), cap), &ticks))
        });
    }

    group.finish();
}

fn bench_report_only(c: &mut Criterion) {
    let ticks = synthetic_ticks(200);
    let mut slow = RecomputingStore::new(["ETH-BTC"], match_fields(), 200);
    let mut fast = IncrementalStore::new(["ETH-BTC"], match_fields(), 200);
    for tick in &ticks {
        slow.store(tick).ok();
        fast.store(tick).ok();
    }

    let mut group = c.benchmark_group("report_full_window");
    group.bench_function("recomputing", |b| b.iter(|| black_box(slow.report(false))));
    group.bench_function("incremental", |b| b.iter(|| black_box(fast.report(false))));
    group.finish();
}

criterion_group!(benches, bench_store_and_report, bench_report_only);
criterion_main!(benches);
