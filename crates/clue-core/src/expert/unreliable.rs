//! Expert that knows the optimal policy but only reports it with
//! probability ρ.

use super::{DisclosureGate, Expert};
use crate::error::CoreResult;
use crate::logging::{event_names, Stage};
use crate::oracle::Oracle;
use crate::table::TableLayout;
use clue_common::{Assignment, ExpertId};
use clue_config::validate::validate_expert;
use clue_config::ExpertConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::rc::Rc;
use tracing::debug;

/// Advises the oracle's action with probability `reliability`, otherwise a
/// uniformly chosen non-optimal joint action.
///
/// With a degrade factor the reliability is multiplied by it after every
/// deliberation, modelling an expert whose knowledge goes stale.
#[derive(Debug)]
pub struct UnreliableExpert {
    id: ExpertId,
    oracle: Rc<Oracle>,
    initial_reliability: f64,
    reliability: f64,
    degrade_factor: Option<f64>,
    gate: DisclosureGate,
    seed: u64,
    rng: StdRng,
}

impl UnreliableExpert {
    pub fn new(config: &ExpertConfig, oracle: Rc<Oracle>, seed: u64) -> CoreResult<Self> {
        validate_expert("expert", config)?;
        Ok(Self {
            id: ExpertId::new(config.display_name()),
            oracle,
            initial_reliability: config.reliability,
            reliability: config.reliability,
            degrade_factor: config.degrade_factor,
            gate: DisclosureGate::new(config.disclosure),
            seed,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Current probability of advising the optimal action.
    pub fn reliability(&self) -> f64 {
        self.reliability
    }

    pub fn gate(&self) -> &DisclosureGate {
        &self.gate
    }
}

/// `optimal` with probability `reliability`, otherwise a uniformly chosen
/// other joint action.
pub(crate) fn noisy_advice(
    rng: &mut StdRng,
    actions: &TableLayout,
    optimal: Assignment,
    reliability: f64,
) -> CoreResult<Assignment> {
    if rng.random::<f64>() < reliability {
        return Ok(optimal);
    }
    let size = actions.size();
    if size < 2 {
        return Ok(optimal);
    }
    let best = actions.index_of(&optimal)?;
    let pick = rng.random_range(0..size - 1);
    let index = if pick >= best { pick + 1 } else { pick };
    Ok(actions.assignment_at(index)?)
}

impl Expert for UnreliableExpert {
    fn id(&self) -> &ExpertId {
        &self.id
    }

    fn advise(&mut self, state: &Assignment) -> CoreResult<Assignment> {
        let optimal = self.oracle.act(state)?;
        noisy_advice(&mut self.rng, self.oracle.action_layout(), optimal, self.reliability)
    }

    fn deliberate(
        &mut self,
        state: &Assignment,
        action: &Assignment,
        _reward: f64,
    ) -> CoreResult<Option<Assignment>> {
        let optimal_eu = self.oracle.best_expected_utility(state)?;
        let agent_eu = self.oracle.expected_utility(state, action)?;
        let advice = if self.gate.observe(optimal_eu, agent_eu) {
            let advice = self.advise(state)?;
            debug!(
                event = event_names::EXPERT_DISCLOSED,
                stage = %Stage::Advise,
                expert = %self.id,
                reliability = self.reliability,
                "expert disclosed advice"
            );
            Some(advice)
        } else {
            None
        };
        if let Some(factor) = self.degrade_factor {
            self.reliability *= factor;
        }
        Ok(advice)
    }

    fn reset(&mut self) {
        self.reliability = self.initial_reliability;
        self.gate.reset();
        self.rng = StdRng::seed_from_u64(self.seed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DiagramBuilder;
    use clue_common::{assignment, Value};
    use clue_config::DisclosureConfig;

    fn three_way_oracle() -> Rc<Oracle> {
        let diagram = DiagramBuilder::new()
            .chance("C", Value::boolean_domain())
            .decision("D", vec![Value::Int(0), Value::Int(1), Value::Int(2)], &["C"])
            .cpt("C", &[], vec![0.5, 0.5])
            .utility(&["C", "D"], vec![1.0, 0.0, 0.0, 0.0, 0.0, 1.0])
            .build()
            .unwrap();
        Rc::new(Oracle::new(Rc::new(diagram)).unwrap())
    }

    fn expert(reliability: f64, degrade: Option<f64>) -> UnreliableExpert {
        let config = ExpertConfig {
            name: None,
            reliability,
            disclosure: DisclosureConfig::always(),
            degrade_factor: degrade,
        };
        UnreliableExpert::new(&config, three_way_oracle(), 7).unwrap()
    }

    #[test]
    fn test_perfect_expert_always_optimal() {
        let mut e = expert(1.0, None);
        let state = assignment([("C", true)]);
        for _ in 0..50 {
            assert_eq!(e.advise(&state).unwrap(), assignment([("D", Value::Int(2))]));
        }
    }

    #[test]
    fn test_worthless_expert_never_optimal_and_covers_rest() {
        let mut e = expert(0.0, None);
        let state = assignment([("C", false)]);
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..200 {
            let advice = e.advise(&state).unwrap();
            assert_ne!(advice, assignment([("D", Value::Int(0))]));
            seen.insert(advice["D"].clone());
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_degrading_reliability_restored_on_reset() {
        let mut e = expert(0.8, Some(0.5));
        let state = assignment([("C", true)]);
        let action = assignment([("D", Value::Int(2))]);
        e.deliberate(&state, &action, 1.0).unwrap();
        e.deliberate(&state, &action, 1.0).unwrap();
        assert!((e.reliability() - 0.2).abs() < 1e-12);
        e.reset();
        assert_eq!(e.reliability(), 0.8);
    }

    #[test]
    fn test_reset_replays_same_advice() {
        let mut e = expert(0.5, None);
        let state = assignment([("C", true)]);
        let first: Vec<_> = (0..20).map(|_| e.advise(&state).unwrap()).collect();
        e.reset();
        let second: Vec<_> = (0..20).map(|_| e.advise(&state).unwrap()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_reliability_rejected() {
        let config = ExpertConfig::with_reliability(1.5);
        assert!(UnreliableExpert::new(&config, three_way_oracle(), 0).is_err());
    }
}
