use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use riskfold::cv::partition;
use riskfold::ml::MetricsEngine;

const SIZES: [usize; 3] = [100, 1_000, 10_000];

/// Labels with roughly a third positives and noisy scores that lean towards them.
fn scored_labels(n: usize) -> (Vec<f64>, Vec<u8>) {
    let mut rng = StdRng::seed_from_u64(11);
    let labels: Vec<u8> = (0..n).map(|i| u8::from(i % 3 == 0)).collect();
    let scores = labels
        .iter()
        .map(|&label| (0.3 * f64::from(label) + 0.7 * rng.random::<f64>()).min(1.0))
        .collect();
    (scores, labels)
}

fn bench_evaluate(c: &mut Criterion) {
    let engine = MetricsEngine::default();
    for n in SIZES {
        let input = scored_labels(n);
        c.bench_with_input(BenchmarkId::new("evaluate", n), &input, |b, (scores, labels)| {
            b.iter(|| {
                engine
                    .evaluate(black_box(scores), black_box(labels))
                    .expect("evaluate")
            });
        });
    }
}

fn bench_partition(c: &mut Criterion) {
    for n in SIZES {
        let (_, labels) = scored_labels(n);
        c.bench_with_input(BenchmarkId::new("partition_k10", n), &labels, |b, labels| {
            b.iter(|| partition(black_box(labels), 10, 42).expect("partition"));
        });
    }
}

criterion_group!(benches, bench_evaluate, bench_partition);
criterion_main!(benches);
