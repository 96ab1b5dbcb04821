//! Benchmarks for fingerprinting and change detection.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use stagewatch::core::ResultRecord;
use stagewatch::diff::diff;
use stagewatch::fingerprint::fingerprint;

fn records(count: usize) -> Vec<ResultRecord> {
    (0..count)
        .map(|i| {
            ResultRecord::new(
                format!("record-{i}"),
                format!("title {i}"),
                "2024-06-01",
                format!("a moderately long description for record number {i}"),
            )
        })
        .collect()
}

fn fingerprint_benchmark(c: &mut Criterion) {
    let record = ResultRecord::new(
        "record-0",
        "title 0",
        "2024-06-01",
        "a moderately long description for record number 0",
    );

    c.bench_function("fingerprint_single", |b| {
        b.iter(|| fingerprint(black_box(&record)))
    });
}

fn diff_benchmark(c: &mut Criterion) {
    let previous = records(500);
    let mut current = records(500);
    current.extend(records(10).into_iter().map(|mut r| {
        r.name = format!("new-{}", r.name);
        r
    }));

    c.bench_function("diff_500_plus_10_new", |b| {
        b.iter(|| diff(black_box(Some(&previous)), black_box(&current)))
    });

    c.bench_function("diff_first_sight_500", |b| {
        b.iter(|| diff(black_box(None), black_box(&current)))
    });
}

criterion_group!(benches, fingerprint_benchmark, diff_benchmark);
criterion_main!(benches);
