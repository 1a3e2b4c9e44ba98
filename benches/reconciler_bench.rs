//! Benchmarks for the decode + reconcile path
//!
//! Run with: cargo bench

use chartfeed::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn metric_events(count: usize, scrambled: bool) -> Vec<Event> {
    (0..count)
        .map(|i| {
            // Every fourth point arrives late by a few ticks
            let t = if scrambled && i % 4 == 3 { i as i64 - 3 } else { i as i64 };
            Event::metric("cpu", t, i as f64)
        })
        .collect()
}

fn bench_reconciler(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconciler");

    for size in [1_000, 10_000] {
        group.throughput(Throughput::Elements(size as u64));

        let in_order = metric_events(size, false);
        group.bench_function(format!("apply_in_order_{}", size), |b| {
            b.iter(|| {
                let mut reconciler = Reconciler::new(ReconcilerOptions::default());
                for event in &in_order {
                    reconciler.apply(black_box(event));
                }
            })
        });

        let late = metric_events(size, true);
        group.bench_function(format!("apply_out_of_order_{}", size), |b| {
            b.iter(|| {
                let mut reconciler = Reconciler::new(ReconcilerOptions::default());
                for event in &late {
                    reconciler.apply(black_box(event));
                }
            })
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    let frame = r#"{"kind":"metric","series":"mem","t":1700000000,"v":70.25}"#;
    let snapshot = format!(
        r#"{{"kind":"snapshot","series":"mem","points":[{}]}}"#,
        (0..150).map(|i| format!("[{},{}]", i, i)).collect::<Vec<_>>().join(",")
    );

    group.bench_function("metric", |b| b.iter(|| decode(black_box(frame)).unwrap()));
    group.bench_function("snapshot_150", |b| b.iter(|| decode(black_box(&snapshot)).unwrap()));

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let frames: Vec<String> = (0..1_000)
        .map(|i| format!(r#"{{"kind":"metric","series":"s{}","t":{},"v":{}}}"#, i % 8, i, i))
        .collect();

    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Elements(frames.len() as u64));
    group.bench_function("process_1000", |b| {
        b.iter(|| {
            let mut pipeline = FeedPipeline::new(Reconciler::new(ReconcilerOptions::default()));
            for frame in &frames {
                pipeline.process(black_box(frame));
            }
        })
    });
    group.finish();
}

criterion_group!(benches, bench_reconciler, bench_decode, bench_pipeline);
criterion_main!(benches);
