//! Property-based tests for table addressing, inference, and reliability.

use clue_common::{assignment, Assignment, Value};
use clue_config::PriorCounts;
use clue_core::model::{DiagramBuilder, InfluenceDiagram, Scope};
use clue_core::{ReliabilityBelief, TableLayout, VariableElimination};
use proptest::prelude::*;

fn int_domain(card: usize) -> Vec<Value> {
    (0..card as i64).map(Value::Int).collect()
}

/// Independent chance variables `V0..Vn` with uniform tables.
fn independent_diagram(cards: &[usize]) -> InfluenceDiagram {
    let mut builder = DiagramBuilder::new();
    for (i, &card) in cards.iter().enumerate() {
        let name = format!("V{}", i);
        builder = builder
            .chance(&name, int_domain(card))
            .cpt(&name, &[], vec![1.0 / card as f64; card]);
    }
    builder
        .utility(&["V0"], vec![0.0; cards[0]])
        .build()
        .unwrap()
}

fn normalized(weights: &[f64]) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    weights.iter().map(|w| w / total).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn layout_index_bijection(cards in prop::collection::vec(1usize..5, 0..5)) {
        let layout = TableLayout::new(
            cards.iter().enumerate().map(|(i, &c)| (format!("V{}", i), int_domain(c))),
        ).unwrap();
        prop_assert_eq!(layout.size(), cards.iter().product::<usize>());
        for i in 0..layout.size() {
            let a = layout.assignment_at(i).unwrap();
            prop_assert_eq!(layout.index_of(&a).unwrap(), i);
        }
        prop_assert!(layout.assignment_at(layout.size()).is_err());
    }

    #[test]
    fn scope_index_bijection(cards in prop::collection::vec(1usize..5, 1..5)) {
        let diagram = independent_diagram(&cards);
        let scope = Scope::new(diagram.variables().to_vec()).unwrap();
        for i in 0..scope.size() {
            let a = scope.index_to_assignment(i).unwrap();
            prop_assert_eq!(scope.assignment_to_index(&a).unwrap(), i);
        }
    }

    #[test]
    fn chain_query_matches_enumeration(
        prior in prop::collection::vec(0.05..1.0f64, 2),
        given_false in prop::collection::vec(0.05..1.0f64, 3),
        given_true in prop::collection::vec(0.05..1.0f64, 3),
    ) {
        let p_a = normalized(&prior);
        let p_b0 = normalized(&given_false);
        let p_b1 = normalized(&given_true);
        let mut cpt_b = p_b0.clone();
        cpt_b.extend(&p_b1);
        let diagram = DiagramBuilder::new()
            .chance("A", Value::boolean_domain())
            .chance("B", int_domain(3))
            .cpt("A", &[], p_a.clone())
            .cpt("B", &["A"], cpt_b)
            .utility(&["B"], vec![0.0, 1.0, 2.0])
            .build()
            .unwrap();
        let ve = VariableElimination::new(&diagram);

        let marginal = ve.query("B", &Assignment::new(), None).unwrap();
        let total: f64 = marginal.distribution().iter().map(|(_, p)| p).sum();
        prop_assert!((total - 1.0).abs() < 1e-9);
        for b in 0..3 {
            let brute = p_a[0] * p_b0[b] + p_a[1] * p_b1[b];
            prop_assert!((marginal.probability(&Value::Int(b as i64)) - brute).abs() < 1e-9);
        }

        let posterior = ve.query("A", &assignment([("B", 2i64)]), None).unwrap();
        let joint_false = p_a[0] * p_b0[2];
        let joint_true = p_a[1] * p_b1[2];
        let expected = joint_true / (joint_false + joint_true);
        prop_assert!((posterior.probability(&Value::Bool(true)) - expected).abs() < 1e-9);
    }

    #[test]
    fn window_depends_only_on_recent_outcomes(
        first in prop::collection::vec(any::<bool>(), 0..20),
        second in prop::collection::vec(any::<bool>(), 0..20),
        recent in prop::collection::vec(any::<bool>(), 1..8),
    ) {
        let window = recent.len();
        let mut a = ReliabilityBelief::new(PriorCounts::default(), Some(window), None);
        let mut b = ReliabilityBelief::new(PriorCounts::default(), Some(window), None);
        for &o in first.iter().chain(&recent) {
            a.record(o);
        }
        for &o in second.iter().chain(&recent) {
            b.record(o);
        }
        prop_assert_eq!(a.rho(), b.rho());
        prop_assert_eq!(a.counts(), b.counts());
    }

    #[test]
    fn always_optimal_expert_is_monotone(
        optimal in 0.0..20.0f64,
        suboptimal in 0.1..20.0f64,
        n in 1usize..200,
    ) {
        let mut belief = ReliabilityBelief::new(PriorCounts { optimal, suboptimal }, None, None);
        let mut last = belief.rho();
        for _ in 0..n {
            belief.record(true);
            let rho = belief.rho();
            prop_assert!(rho >= last);
            last = rho;
        }
        prop_assert!(last <= 1.0);
    }
}

#[test]
fn always_optimal_expert_converges_to_one() {
    let mut belief = ReliabilityBelief::new(
        PriorCounts {
            optimal: 1.0,
            suboptimal: 5.0,
        },
        None,
        None,
    );
    for _ in 0..2000 {
        belief.record(true);
    }
    assert!(belief.rho() > 0.99);
}
