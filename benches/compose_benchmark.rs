use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use serde_json::json;
use surql_middleware::prelude::*;
use surql_middleware::results::shape_results;
use surql_middleware::test_utils::organisation_row;

fn get_benchmark_items() -> usize {
    std::env::var("BENCH_ITEMS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(100)
}

fn build_items(n: usize) -> Vec<TransactionItem> {
    (0..n)
        .map(|i| match i % 3 {
            0 => TransactionItem::new(
                create("organisation")
                    .set("name", format!("org-{i}"))
                    .set("isEnabled", i % 2 == 0)
                    .set("createdAt", time_now()),
            )
            .schema(Schema::any()),
            1 => TransactionItem::new(
                select(&["id", "name"])
                    .from("organisation")
                    .where_eq([("isEnabled", true)]),
            ),
            _ => TransactionItem::new(count("organisation")),
        })
        .collect()
}

fn build_response(n: usize) -> Vec<serde_json::Value> {
    (0..n)
        .map(|i| match i % 3 {
            2 => json!([{"count": i}]),
            _ => json!([organisation_row(u32::try_from(i).unwrap_or(0), "bench", true)]),
        })
        .collect()
}

fn bench_compose(c: &mut Criterion) {
    let max = get_benchmark_items();
    let mut group = c.benchmark_group("transaction");
    for n in [1, max / 10, max].into_iter().filter(|n| *n > 0) {
        group.throughput(Throughput::Elements(n as u64));
        let items = build_items(n);
        let response = build_response(n);

        group.bench_with_input(BenchmarkId::new("compose", n), &items, |b, items| {
            b.iter(|| compose(black_box(items)).expect("compose"));
        });
        group.bench_with_input(BenchmarkId::new("build_and_compose", n), &n, |b, &n| {
            b.iter(|| compose(&build_items(black_box(n))).expect("compose"));
        });

        let composed = compose(&items).expect("compose");
        group.bench_with_input(BenchmarkId::new("shape", n), &response, |b, response| {
            b.iter(|| {
                shape_results(&composed, &items, black_box(response.clone())).expect("shape")
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compose);
criterion_main!(benches);
