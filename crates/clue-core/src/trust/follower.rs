//! Baseline that trusts every expert unconditionally.

use crate::agent::{ActionScorer, Agent, Trial};
use crate::error::{CoreError, CoreResult};
use crate::expert::AdviceBundle;
use crate::table::StateTable;
use clue_common::{Assignment, ExpertId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

/// Acts on remembered advice whenever any exists for the state, picking
/// uniformly among the experts that advised it. Defers to the base agent
/// otherwise.
#[derive(Debug)]
pub struct NaiveAdviceFollower<B> {
    base: B,
    memory: BTreeMap<ExpertId, StateTable<Option<Assignment>>>,
    seed: u64,
    rng: StdRng,
}

impl<B: Agent + ActionScorer> NaiveAdviceFollower<B> {
    pub fn new(base: B, seed: u64) -> Self {
        Self {
            base,
            memory: BTreeMap::new(),
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn base(&self) -> &B {
        &self.base
    }
}

impl<B: Agent + ActionScorer> Agent for NaiveAdviceFollower<B> {
    fn name(&self) -> &str {
        "Advice Follower"
    }

    fn act(&mut self, state: &Assignment, explore: bool) -> CoreResult<Assignment> {
        let mut advised = Vec::new();
        for table in self.memory.values() {
            if let Some(advice) = table.get(state)? {
                advised.push(advice);
            }
        }
        if advised.is_empty() {
            return self.base.act(state, explore);
        }
        let pick = self.rng.random_range(0..advised.len());
        Ok(advised[pick].clone())
    }

    fn learn(&mut self, trial: &Trial, advice: &AdviceBundle) -> CoreResult<()> {
        for (id, given) in advice.given() {
            let table = self
                .memory
                .get_mut(id)
                .ok_or_else(|| CoreError::UnknownExpert(id.to_string()))?;
            table.set(&trial.state, Some(given.clone()))?;
        }
        self.base.learn(trial, advice)
    }

    fn reset(&mut self, experts: &[ExpertId]) {
        self.base.reset(experts);
        self.rng = StdRng::seed_from_u64(self.seed);
        let layout = self.base.state_layout().clone();
        self.memory = experts
            .iter()
            .map(|id| (id.clone(), StateTable::new(layout.clone(), None)))
            .collect();
    }

    fn takes_advice(&self) -> bool {
        true
    }
}
