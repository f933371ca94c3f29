//! Tabular action-value learning.
//!
//! `ActionValues` keeps one estimate per (state, joint action) pair in a
//! [`StateTable`] whose layout is the state layout joined with the action
//! layout, so every action of a state occupies one contiguous block.
//!
//! Update rule: `Q ← Q + α (r − Q)` with `α = 1/n` for the n-th visit unless
//! a fixed learning rate is configured.

use crate::agent::{ActionScorer, Agent, Trial};
use crate::error::CoreResult;
use crate::expert::AdviceBundle;
use crate::model::{InfluenceDiagram, VarId, Variable};
use crate::table::{StateTable, TableLayout};
use clue_common::{Assignment, ExpertId};
use clue_config::validate::{validate_learner, validate_trials};
use clue_config::{AspirationConfig, LearnerConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::rc::Rc;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct ActionValues {
    state_layout: TableLayout,
    action_layout: TableLayout,
    values: StateTable<f64>,
    visits: StateTable<u64>,
    initial_value: f64,
    learning_rate: Option<f64>,
}

impl ActionValues {
    pub fn new(
        state_layout: TableLayout,
        action_layout: TableLayout,
        config: &LearnerConfig,
    ) -> CoreResult<Self> {
        validate_learner(config)?;
        let joint = state_layout.join(&action_layout)?;
        Ok(Self {
            values: StateTable::new(joint.clone(), config.initial_value),
            visits: StateTable::new(joint, 0),
            state_layout,
            action_layout,
            initial_value: config.initial_value,
            learning_rate: config.learning_rate,
        })
    }

    pub fn state_layout(&self) -> &TableLayout {
        &self.state_layout
    }

    pub fn action_layout(&self) -> &TableLayout {
        &self.action_layout
    }

    fn cell(&self, state: &Assignment, action: &Assignment) -> CoreResult<usize> {
        let s = self.state_layout.index_of(state)?;
        let a = self.action_layout.index_of(action)?;
        Ok(s * self.action_layout.size() + a)
    }

    /// Fold `reward` into the estimate for `(state, action)`; returns the new
    /// estimate.
    pub fn update(
        &mut self,
        state: &Assignment,
        action: &Assignment,
        reward: f64,
    ) -> CoreResult<f64> {
        let i = self.cell(state, action)?;
        let n = match self.visits.at_mut(i) {
            Some(visits) => {
                *visits += 1;
                *visits
            }
            None => 1,
        };
        let alpha = self.learning_rate.unwrap_or(1.0 / n as f64);
        let q = self.values.at_mut(i).map_or(self.initial_value, |q| {
            *q += alpha * (reward - *q);
            *q
        });
        Ok(q)
    }

    pub fn value(&self, state: &Assignment, action: &Assignment) -> CoreResult<f64> {
        let i = self.cell(state, action)?;
        Ok(self.values.at(i).copied().unwrap_or(self.initial_value))
    }

    pub fn visits(&self, state: &Assignment, action: &Assignment) -> CoreResult<u64> {
        let i = self.cell(state, action)?;
        Ok(self.visits.at(i).copied().unwrap_or(0))
    }

    /// Values of every joint action in `state`, in action index order.
    pub fn state_values(&self, state: &Assignment) -> CoreResult<&[f64]> {
        let width = self.action_layout.size();
        let start = self.state_layout.index_of(state)? * width;
        Ok(&self.values.values()[start..start + width])
    }

    pub fn score_state(&self, state: &Assignment) -> CoreResult<Vec<(Assignment, f64)>> {
        let values = self.state_values(state)?;
        Ok(self
            .action_layout
            .iter()
            .zip(values.iter().copied())
            .collect())
    }

    /// First action with the highest value, and that value.
    pub fn greedy(&self, state: &Assignment) -> CoreResult<(Assignment, f64)> {
        let values = self.state_values(state)?;
        let best = clue_math::argmax_first(values).unwrap_or(0);
        let action = self.action_layout.assignment_at(best)?;
        Ok((action, values.get(best).copied().unwrap_or(self.initial_value)))
    }

    pub fn reset(&mut self) {
        self.values.fill(self.initial_value);
        self.visits.fill(0);
    }
}

/// Greedy tabular learner with an aspiration level.
///
/// While exploring it follows its greedy action only if that action's value
/// beats the aspiration `z(t)`, otherwise it acts uniformly at random. `z`
/// decays linearly, so the learner grows greedier as trials accumulate.
#[derive(Debug, Clone)]
pub struct GreedyLearner {
    values: ActionValues,
    aspiration: AspirationConfig,
    trials: usize,
    learned: usize,
    seed: u64,
    rng: StdRng,
}

impl GreedyLearner {
    pub fn new(
        state_layout: TableLayout,
        action_layout: TableLayout,
        config: &LearnerConfig,
        trials: usize,
        seed: u64,
    ) -> CoreResult<Self> {
        validate_trials(trials)?;
        Ok(Self {
            values: ActionValues::new(state_layout, action_layout, config)?,
            aspiration: config.aspiration,
            trials,
            learned: 0,
            seed,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Learner over a diagram's chance variables (state) and decisions (action).
    pub fn for_diagram(
        diagram: &InfluenceDiagram,
        config: &LearnerConfig,
        trials: usize,
        seed: u64,
    ) -> CoreResult<Self> {
        let pick = |ids: Vec<VarId>| -> Vec<Rc<Variable>> {
            ids.into_iter()
                .filter_map(|id| diagram.variable(id).cloned())
                .collect()
        };
        let states = TableLayout::from_variables(&pick(diagram.chance_order()))?;
        let actions = TableLayout::from_variables(&pick(diagram.decision_order()))?;
        Self::new(states, actions, config, trials, seed)
    }

    pub fn values(&self) -> &ActionValues {
        &self.values
    }

    /// Current aspiration level.
    pub fn aspiration(&self) -> f64 {
        let AspirationConfig {
            start,
            end,
            decay_fraction,
        } = self.aspiration;
        let horizon = decay_fraction * self.trials as f64;
        let progress = if horizon > 0.0 {
            (self.learned as f64 / horizon).min(1.0)
        } else {
            1.0
        };
        start + progress * (end - start)
    }

    /// Uniformly random joint action.
    pub fn random_action(&mut self) -> CoreResult<Assignment> {
        let size = self.values.action_layout().size();
        let index = self.rng.random_range(0..size);
        Ok(self.values.action_layout().assignment_at(index)?)
    }
}

impl Agent for GreedyLearner {
    fn name(&self) -> &str {
        "Greedy"
    }

    fn act(&mut self, state: &Assignment, explore: bool) -> CoreResult<Assignment> {
        let (greedy, value) = self.values.greedy(state)?;
        if !explore {
            return Ok(greedy);
        }
        let z = self.aspiration();
        if value > z {
            Ok(greedy)
        } else {
            trace!(value, aspiration = z, "greedy value below aspiration");
            self.random_action()
        }
    }

    fn learn(&mut self, trial: &Trial, _advice: &AdviceBundle) -> CoreResult<()> {
        self.learned += 1;
        self.values.update(&trial.state, &trial.action, trial.reward)?;
        Ok(())
    }

    fn reset(&mut self, _experts: &[ExpertId]) {
        self.values.reset();
        self.learned = 0;
        self.rng = StdRng::seed_from_u64(self.seed);
    }
}

impl ActionScorer for GreedyLearner {
    fn state_layout(&self) -> &TableLayout {
        self.values.state_layout()
    }

    fn action_layout(&self) -> &TableLayout {
        self.values.action_layout()
    }

    fn score_state(&self, state: &Assignment) -> CoreResult<Vec<(Assignment, f64)>> {
        self.values.score_state(state)
    }

    fn score(&self, state: &Assignment, action: &Assignment) -> CoreResult<f64> {
        self.values.value(state, action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use clue_common::{assignment, Value};
    use clue_config::ValidationError;

    fn layouts() -> (TableLayout, TableLayout) {
        (
            TableLayout::new([("C", Value::boolean_domain())]).unwrap(),
            TableLayout::new([("D", vec![Value::Int(0), Value::Int(1), Value::Int(2)])]).unwrap(),
        )
    }

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_sample_average_update() {
        let (s, a) = layouts();
        let mut q = ActionValues::new(s, a, &LearnerConfig::default()).unwrap();
        let state = assignment([("C", true)]);
        let action = assignment([("D", Value::Int(1))]);
        q.update(&state, &action, 1.0).unwrap();
        q.update(&state, &action, 0.0).unwrap();
        q.update(&state, &action, 2.0).unwrap();
        assert!(approx_eq(q.value(&state, &action).unwrap(), 1.0));
        assert_eq!(q.visits(&state, &action).unwrap(), 3);
    }

    #[test]
    fn test_fixed_rate_update() {
        let (s, a) = layouts();
        let config = LearnerConfig {
            learning_rate: Some(0.5),
            initial_value: 2.0,
            ..LearnerConfig::default()
        };
        let mut q = ActionValues::new(s, a, &config).unwrap();
        let state = assignment([("C", false)]);
        let action = assignment([("D", Value::Int(0))]);
        assert!(approx_eq(q.update(&state, &action, 0.0).unwrap(), 1.0));
        q.reset();
        assert!(approx_eq(q.value(&state, &action).unwrap(), 2.0));
    }

    #[test]
    fn test_greedy_first_max_and_scores_in_order() {
        let (s, a) = layouts();
        let mut q = ActionValues::new(s, a, &LearnerConfig::default()).unwrap();
        let state = assignment([("C", true)]);
        q.update(&state, &assignment([("D", Value::Int(1))]), 3.0).unwrap();
        q.update(&state, &assignment([("D", Value::Int(2))]), 3.0).unwrap();
        let (best, value) = q.greedy(&state).unwrap();
        assert_eq!(best, assignment([("D", Value::Int(1))]));
        assert_eq!(value, 3.0);
        let scores: Vec<f64> = q
            .score_state(&state)
            .unwrap()
            .into_iter()
            .map(|(_, v)| v)
            .collect();
        assert_eq!(scores, vec![0.0, 3.0, 3.0]);
    }

    #[test]
    fn test_aspiration_schedule() {
        let (s, a) = layouts();
        let mut learner = GreedyLearner::new(s, a, &LearnerConfig::default(), 10, 3).unwrap();
        assert_eq!(learner.aspiration(), 1.0);
        let trial = Trial {
            state: assignment([("C", true)]),
            action: assignment([("D", Value::Int(0))]),
            reward: 0.0,
        };
        for _ in 0..4 {
            learner.learn(&trial, &AdviceBundle::new()).unwrap();
        }
        assert!(approx_eq(learner.aspiration(), 0.0));
        for _ in 0..10 {
            learner.learn(&trial, &AdviceBundle::new()).unwrap();
        }
        assert_eq!(learner.aspiration(), -1.0);
    }

    #[test]
    fn test_explore_false_is_greedy() {
        let (s, a) = layouts();
        let mut learner = GreedyLearner::new(s, a, &LearnerConfig::default(), 100, 3).unwrap();
        let state = assignment([("C", false)]);
        let good = assignment([("D", Value::Int(2))]);
        learner
            .learn(
                &Trial {
                    state: state.clone(),
                    action: good.clone(),
                    reward: 0.5,
                },
                &AdviceBundle::new(),
            )
            .unwrap();
        for _ in 0..20 {
            assert_eq!(learner.act(&state, false).unwrap(), good);
        }
    }

    #[test]
    fn test_low_value_explores_uniformly() {
        let (s, a) = layouts();
        let mut learner = GreedyLearner::new(s, a, &LearnerConfig::default(), 100, 11).unwrap();
        let state = assignment([("C", true)]);
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..100 {
            seen.insert(learner.act(&state, true).unwrap()["D"].clone());
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_invalid_learning_rate_rejected() {
        let (s, a) = layouts();
        let config = LearnerConfig {
            learning_rate: Some(0.0),
            ..LearnerConfig::default()
        };
        assert!(ActionValues::new(s, a, &config).is_err());
    }

    #[test]
    fn test_zero_trials_rejected() {
        let (s, a) = layouts();
        let err = GreedyLearner::new(s, a, &LearnerConfig::default(), 0, 1).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Config(ValidationError::InvalidValue { ref field, .. }) if field == "trials"
        ));
    }
}
