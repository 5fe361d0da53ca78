//! Streaming Classifier Benchmarks
//!
//! Measures per-sample overhead of the smoothing pipeline with a model-free
//! engine, so the numbers exclude actual inference cost.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use proxi_core::{ClassifierConfig, ConstantEngine, StreamingClassifier};
use std::time::Duration;

/// Synthetic proximity trace: slow oscillation with periodic saturated spikes
fn generate_readings(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let base = 50.0 + 40.0 * (i as f64 * 0.05).sin();
            if i % 97 == 0 {
                250.0
            } else {
                base
            }
        })
        .collect()
}

fn bench_ingest_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest_throughput");
    group.measurement_time(Duration::from_secs(5));

    for window_len in [20usize, 60, 200].iter() {
        let readings = generate_readings(10_000);
        let config = ClassifierConfig {
            window_len: *window_len,
            ..Default::default()
        };

        group.bench_with_input(
            BenchmarkId::new("constant_engine", window_len),
            &readings,
            |b, readings| {
                b.iter(|| {
                    let mut clf =
                        StreamingClassifier::new(ConstantEngine::new(150.0), config.clone())
                            .unwrap();
                    for &r in readings {
                        black_box(clf.ingest(black_box(r)).unwrap());
                    }
                    clf.edge_count()
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_ingest_throughput);
criterion_main!(benches);
