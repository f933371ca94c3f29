//! Criterion benchmarks for `clue-math`.
//!
//! Kernels used by reliability beliefs and advice posteriors.

use clue_math::math::beta::{beta_cdf, beta_credible_interval};
use clue_math::math::prob::normalize;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_beta_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("beta");

    // Reliability posteriors early and late in a run.
    for (name, alpha, beta) in [
        ("prior", 1.0, 1.0),
        ("unreliable", 3.0, 12.0),
        ("reliable", 40.0, 4.0),
        ("long_run", 900.0, 100.0),
    ] {
        group.bench_with_input(
            BenchmarkId::new("beta_cdf", name),
            &(alpha, beta),
            |b, &(a, bta)| {
                b.iter(|| black_box(beta_cdf(black_box(0.7), black_box(a), black_box(bta))));
            },
        );

        group.bench_with_input(
            BenchmarkId::new("credible_interval", name),
            &(alpha, beta),
            |b, &(a, bta)| {
                b.iter(|| {
                    black_box(beta_credible_interval(
                        black_box(a),
                        black_box(bta),
                        black_box(0.95),
                    ))
                });
            },
        );
    }

    group.finish();
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("posterior");
    for size in [4usize, 64, 1024] {
        let weights: Vec<f64> = (0..size).map(|i| 1.0 + (i % 7) as f64).collect();
        group.bench_with_input(BenchmarkId::new("normalize", size), &weights, |b, w| {
            b.iter(|| black_box(normalize(black_box(w))));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_beta_kernels, bench_normalize);
criterion_main!(benches);
