//! Expert whose reliability depends on the region of the state space.

use super::unreliable::noisy_advice;
use super::{DisclosureGate, Expert};
use crate::error::CoreResult;
use crate::logging::{event_names, Stage};
use crate::oracle::Oracle;
use crate::table::StateTable;
use clue_common::{Assignment, ExpertId};
use clue_config::validate::{
    validate_disclosure, validate_known_names, validate_regions, validate_reliabilities,
};
use clue_config::DisclosureConfig;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::rc::Rc;
use tracing::debug;

/// Like [`super::UnreliableExpert`], but ρ is looked up per state:
/// `regions` maps each state to an index into `reliabilities`.
///
/// The region table may cover a subset of the chance variables.
#[derive(Debug)]
pub struct NonuniformUnreliableExpert {
    id: ExpertId,
    oracle: Rc<Oracle>,
    reliabilities: Vec<f64>,
    regions: StateTable<usize>,
    gate: DisclosureGate,
    seed: u64,
    rng: StdRng,
}

impl NonuniformUnreliableExpert {
    pub fn new(
        name: impl Into<String>,
        reliabilities: Vec<f64>,
        regions: StateTable<usize>,
        oracle: Rc<Oracle>,
        disclosure: DisclosureConfig,
        seed: u64,
    ) -> CoreResult<Self> {
        validate_reliabilities("reliabilities", &reliabilities)?;
        validate_known_names("regions", regions.layout().names(), oracle.state_layout().names())?;
        validate_regions("regions", regions.values(), reliabilities.len())?;
        validate_disclosure("disclosure", &disclosure)?;
        Ok(Self {
            id: ExpertId::new(name),
            oracle,
            reliabilities,
            regions,
            gate: DisclosureGate::new(disclosure),
            seed,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Probability of advising the optimal action in `state`.
    pub fn reliability(&self, state: &Assignment) -> CoreResult<f64> {
        let region = *self.regions.get(state)?;
        Ok(self.reliabilities[region])
    }

    pub fn reliabilities(&self) -> &[f64] {
        &self.reliabilities
    }
}

impl Expert for NonuniformUnreliableExpert {
    fn id(&self) -> &ExpertId {
        &self.id
    }

    fn advise(&mut self, state: &Assignment) -> CoreResult<Assignment> {
        let reliability = self.reliability(state)?;
        let optimal = self.oracle.act(state)?;
        noisy_advice(&mut self.rng, self.oracle.action_layout(), optimal, reliability)
    }

    fn deliberate(
        &mut self,
        state: &Assignment,
        action: &Assignment,
        _reward: f64,
    ) -> CoreResult<Option<Assignment>> {
        let optimal_eu = self.oracle.best_expected_utility(state)?;
        let agent_eu = self.oracle.expected_utility(state, action)?;
        if !self.gate.observe(optimal_eu, agent_eu) {
            return Ok(None);
        }
        let advice = self.advise(state)?;
        debug!(
            event = event_names::EXPERT_DISCLOSED,
            stage = %Stage::Advise,
            expert = %self.id,
            reliability = self.reliability(state)?,
            "expert disclosed advice"
        );
        Ok(Some(advice))
    }

    fn reset(&mut self) {
        self.gate.reset();
        self.rng = StdRng::seed_from_u64(self.seed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::model::DiagramBuilder;
    use crate::table::TableLayout;
    use clue_common::{assignment, Value};
    use clue_config::ValidationError;

    fn oracle() -> Rc<Oracle> {
        let diagram = DiagramBuilder::new()
            .chance("C", Value::boolean_domain())
            .decision("D", Value::boolean_domain(), &["C"])
            .cpt("C", &[], vec![0.5, 0.5])
            .utility(&["C", "D"], vec![1.0, -1.0, -1.0, 1.0])
            .build()
            .unwrap();
        Rc::new(Oracle::new(Rc::new(diagram)).unwrap())
    }

    fn by_c(false_region: usize, true_region: usize) -> StateTable<usize> {
        let mut regions = StateTable::new(
            TableLayout::new([("C", Value::boolean_domain())]).unwrap(),
            0,
        );
        regions.set(&assignment([("C", false)]), false_region).unwrap();
        regions.set(&assignment([("C", true)]), true_region).unwrap();
        regions
    }

    #[test]
    fn test_reliability_follows_region() {
        let mut e = NonuniformUnreliableExpert::new(
            "split",
            vec![1.0, 0.0],
            by_c(0, 1),
            oracle(),
            DisclosureConfig::always(),
            3,
        )
        .unwrap();
        let sure = assignment([("C", false)]);
        let wrong = assignment([("C", true)]);
        assert_eq!(e.reliability(&sure).unwrap(), 1.0);
        assert_eq!(e.reliability(&wrong).unwrap(), 0.0);
        for _ in 0..30 {
            assert_eq!(e.advise(&sure).unwrap(), assignment([("D", false)]));
            assert_eq!(e.advise(&wrong).unwrap(), assignment([("D", false)]));
        }
    }

    #[test]
    fn test_gate_uses_oracle_utilities() {
        let mut e = NonuniformUnreliableExpert::new(
            "quiet",
            vec![1.0],
            by_c(0, 0),
            oracle(),
            DisclosureConfig {
                interval: 1,
                tolerance: 0.5,
            },
            3,
        )
        .unwrap();
        let state = assignment([("C", true)]);
        let good = e.deliberate(&state, &assignment([("D", true)]), 1.0).unwrap();
        assert!(good.is_none());
        let bad = e.deliberate(&state, &assignment([("D", false)]), -1.0).unwrap();
        assert_eq!(bad, Some(assignment([("D", true)])));
    }

    #[test]
    fn test_region_out_of_range_rejected() {
        let err = NonuniformUnreliableExpert::new(
            "broken",
            vec![0.5, 0.9],
            by_c(0, 2),
            oracle(),
            DisclosureConfig::default(),
            0,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Config(ValidationError::InvalidValue { ref field, .. }) if field == "regions[1]"
        ));
    }

    #[test]
    fn test_bad_reliability_or_layout_rejected() {
        let bad_rho = NonuniformUnreliableExpert::new(
            "a",
            vec![1.5],
            by_c(0, 0),
            oracle(),
            DisclosureConfig::default(),
            0,
        );
        assert!(bad_rho.is_err());
        let regions = StateTable::new(
            TableLayout::new([("Weather", Value::boolean_domain())]).unwrap(),
            0,
        );
        let foreign = NonuniformUnreliableExpert::new(
            "b",
            vec![0.5],
            regions,
            oracle(),
            DisclosureConfig::default(),
            0,
        );
        assert!(foreign.is_err());
    }
}
