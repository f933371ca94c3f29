//! Criterion benchmarks for `clue-core`.
//!
//! Decision-network solving and the oracle queries experts make every trial.

use clue_common::{assignment, Assignment, Value};
use clue_core::{DecisionNetwork, DiagramBuilder, InfluenceDiagram, Oracle};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::rc::Rc;

/// Chain of `n` boolean chance variables observed by one decision at the end.
fn chain(n: usize) -> InfluenceDiagram {
    let names: Vec<String> = (0..n).map(|i| format!("X{}", i)).collect();
    let mut builder = DiagramBuilder::new()
        .chance(&names[0], Value::boolean_domain())
        .cpt(&names[0], &[], vec![0.4, 0.6]);
    for pair in names.windows(2) {
        builder = builder
            .chance(&pair[1], Value::boolean_domain())
            .cpt(&pair[1], &[pair[0].as_str()], vec![0.7, 0.3, 0.2, 0.8]);
    }
    let last = names[n - 1].as_str();
    builder
        .decision("D", Value::boolean_domain(), &[last])
        .utility(&[last, "D"], vec![2.0, -1.0, -3.0, 4.0])
        .build()
        .expect("benchmark diagram is valid")
}

fn bench_solve(c: &mut Criterion) {
    let mut group = c.benchmark_group("ve_dn");
    for n in [2usize, 8, 16] {
        let diagram = chain(n);
        group.bench_with_input(BenchmarkId::new("solve", n), &diagram, |b, d| {
            b.iter(|| black_box(DecisionNetwork::new(d).solve(&Assignment::new())));
        });
        let evidence = assignment([("X0", true)]);
        group.bench_with_input(BenchmarkId::new("solve_observed", n), &diagram, |b, d| {
            b.iter(|| black_box(DecisionNetwork::new(d).solve(black_box(&evidence))));
        });
    }
    group.finish();
}

fn bench_oracle(c: &mut Criterion) {
    let mut group = c.benchmark_group("oracle");
    let oracle = Oracle::new(Rc::new(chain(6))).expect("benchmark diagram solves");
    let states: Vec<Assignment> = oracle.state_layout().iter().collect();
    let action = assignment([("D", true)]);

    group.bench_function("act_cached", |b| {
        b.iter(|| {
            for state in &states {
                black_box(oracle.act(state).ok());
            }
        });
    });
    group.bench_function("expected_utility_cached", |b| {
        b.iter(|| {
            for state in &states {
                black_box(oracle.expected_utility(state, &action).ok());
            }
        });
    });
    group.finish();
}

criterion_group!(benches, bench_solve, bench_oracle);
criterion_main!(benches);
