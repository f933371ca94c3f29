//! Cautious learning with unreliable experts.
//!
//! `ClueAgent` wraps a value-learning base agent. When it exploits, it acts
//! exactly as the base agent would. When it explores, it consults the
//! advice each expert last gave for the current state and decides whether
//! to follow it.
//!
//! # Bayesian mode
//!
//! Every advising expert e is modeled as naming the optimal action with
//! probability ρ_e and otherwise a uniformly chosen other action:
//!
//! ```text
//! L(a) = Π_e  ρ_e                  if advice_e == a
//!             (1 − ρ_e) / (|A| − 1) otherwise
//! P(a) = L(a) / Σ L
//! ```
//!
//! With `a* = argmax P`, advice is rejected if `P(a*)` is below the trust
//! threshold; otherwise `a*` is adopted with probability `P(a*)`. Rejection
//! means a uniformly random action.
//!
//! # Naive mode
//!
//! Follow the most reliable advising expert with probability ρ.
//!
//! # Learning
//!
//! After the base agent learns, each expert's advice for the state (fresh,
//! or remembered when regular updates are on) is judged optimal if its value
//! under the base agent is at least the best value in that state.

use super::ReliabilityBelief;
use crate::agent::{ActionScorer, Agent, ReliabilityHistory, ReliabilityReport, Trial};
use crate::error::{CoreError, CoreResult};
use crate::expert::AdviceBundle;
use crate::logging::{event_names, Stage};
use crate::table::StateTable;
use clue_common::{Assignment, ExpertId};
use clue_config::validate::{validate_trials, validate_trust};
use clue_config::{TrustConfig, TrustMode};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Credible level of the intervals in [`Agent::reliability_report`].
pub const REPORT_CREDIBLE_LEVEL: f64 = 0.9;

#[derive(Debug)]
struct ExpertState {
    belief: ReliabilityBelief,
    memory: StateTable<Option<Assignment>>,
}

/// Advice-trust engine around a base learner `B`.
#[derive(Debug)]
pub struct ClueAgent<B> {
    name: String,
    base: B,
    config: TrustConfig,
    trials: usize,
    learned: usize,
    experts: BTreeMap<ExpertId, ExpertState>,
    history: ReliabilityHistory,
    rng: StdRng,
}

impl<B: Agent + ActionScorer> ClueAgent<B> {
    /// `trials` sets the exploration schedule's horizon.
    pub fn new(base: B, config: TrustConfig, trials: usize) -> CoreResult<Self> {
        validate_trust(&config)?;
        validate_trials(trials)?;
        let name = match config.mode {
            TrustMode::Bayesian => "CLUE",
            TrustMode::Naive => "Naive CLUE",
        };
        Ok(Self {
            name: name.to_string(),
            rng: StdRng::seed_from_u64(config.seed),
            base,
            config,
            trials,
            learned: 0,
            experts: BTreeMap::new(),
            history: ReliabilityHistory::new(),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn base(&self) -> &B {
        &self.base
    }

    pub fn config(&self) -> &TrustConfig {
        &self.config
    }

    /// Exploration probability for the next action.
    pub fn epsilon(&self) -> f64 {
        let schedule = &self.config.exploration;
        let horizon = schedule.decay_fraction * self.trials as f64;
        let progress = if horizon > 0.0 {
            (self.learned as f64 / horizon).min(1.0)
        } else {
            1.0
        };
        schedule.start + progress * (schedule.end - schedule.start)
    }

    /// Current reliability estimate for `expert`.
    pub fn rho(&self, expert: &ExpertId) -> Option<f64> {
        self.experts.get(expert).map(|e| e.belief.rho())
    }

    pub fn belief(&self, expert: &ExpertId) -> Option<&ReliabilityBelief> {
        self.experts.get(expert).map(|e| &e.belief)
    }

    /// Advice `expert` last gave for `state`.
    pub fn remembered_advice(
        &self,
        expert: &ExpertId,
        state: &Assignment,
    ) -> CoreResult<Option<&Assignment>> {
        match self.experts.get(expert) {
            Some(e) => Ok(e.memory.get(state)?.as_ref()),
            None => Err(CoreError::UnknownExpert(expert.to_string())),
        }
    }

    /// Posterior over joint actions (index order) from remembered advice.
    ///
    /// `None` when no expert has advice for `state` or the likelihood
    /// vanishes everywhere.
    pub fn advice_posterior(&self, state: &Assignment) -> CoreResult<Option<Vec<f64>>> {
        let actions = self.base.action_layout();
        let n = actions.size();
        let mut likelihood = vec![1.0; n];
        let mut any = false;
        for expert in self.experts.values() {
            let Some(advice) = expert.memory.get(state)? else {
                continue;
            };
            any = true;
            let advised = actions.index_of(advice)?;
            let rho = expert.belief.rho();
            let miss = if n > 1 { (1.0 - rho) / (n - 1) as f64 } else { 0.0 };
            for (a, l) in likelihood.iter_mut().enumerate() {
                *l *= if a == advised { rho } else { miss };
            }
        }
        if !any {
            return Ok(None);
        }
        Ok(clue_math::normalize(&likelihood))
    }

    fn random_action(&mut self) -> CoreResult<Assignment> {
        let actions = self.base.action_layout();
        let index = self.rng.random_range(0..actions.size());
        Ok(actions.assignment_at(index)?)
    }

    fn act_bayesian(&mut self, state: &Assignment) -> CoreResult<Assignment> {
        let Some(posterior) = self.advice_posterior(state)? else {
            if self.has_advice(state)? {
                warn!(
                    event = event_names::TRUST_DEGENERATE,
                    stage = %Stage::Act,
                    "advice likelihood vanished; acting without trust"
                );
            }
            return self.random_action();
        };
        let actions = self.base.action_layout();
        let best = clue_math::argmax_first(&posterior).unwrap_or(0);
        let confidence = posterior[best];
        let threshold = self.config.threshold_for(actions.size());
        if confidence < threshold {
            debug!(
                event = event_names::TRUST_REJECTED,
                stage = %Stage::Act,
                confidence,
                threshold,
                "advice posterior below threshold"
            );
            return self.random_action();
        }
        let action = actions.assignment_at(best)?;
        if self.rng.random::<f64>() < confidence {
            debug!(
                event = event_names::TRUST_ADOPTED,
                stage = %Stage::Act,
                confidence,
                "following advice"
            );
            Ok(action)
        } else {
            self.random_action()
        }
    }

    fn act_naive(&mut self, state: &Assignment) -> CoreResult<Assignment> {
        let mut chosen: Option<(f64, Assignment)> = None;
        for expert in self.experts.values() {
            if let Some(advice) = expert.memory.get(state)? {
                let rho = expert.belief.rho();
                if chosen.as_ref().map_or(true, |(best, _)| rho > *best) {
                    chosen = Some((rho, advice.clone()));
                }
            }
        }
        match chosen {
            Some((rho, advice)) if self.rng.random::<f64>() < rho => {
                debug!(
                    event = event_names::TRUST_ADOPTED,
                    stage = %Stage::Act,
                    rho,
                    "following most reliable expert"
                );
                Ok(advice)
            }
            _ => self.random_action(),
        }
    }

    fn has_advice(&self, state: &Assignment) -> CoreResult<bool> {
        for expert in self.experts.values() {
            if expert.memory.get(state)?.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl<B: Agent + ActionScorer> Agent for ClueAgent<B> {
    fn name(&self) -> &str {
        &self.name
    }

    fn act(&mut self, state: &Assignment, explore: bool) -> CoreResult<Assignment> {
        for (id, expert) in &self.experts {
            if let Some(trace) = self.history.get_mut(id) {
                trace.push(expert.belief.rho());
            }
        }
        if !explore || self.rng.random::<f64>() >= self.epsilon() {
            return self.base.act(state, false);
        }
        if self.base.action_layout().size() == 1 {
            return Ok(self.base.action_layout().assignment_at(0)?);
        }
        match self.config.mode {
            TrustMode::Bayesian => self.act_bayesian(state),
            TrustMode::Naive => self.act_naive(state),
        }
    }

    fn learn(&mut self, trial: &Trial, advice: &AdviceBundle) -> CoreResult<()> {
        if let Some(unknown) = advice.experts().find(|id| !self.experts.contains_key(*id)) {
            return Err(CoreError::UnknownExpert(unknown.to_string()));
        }
        self.learned += 1;
        self.base.learn(trial, advice)?;

        let mut best: Option<f64> = None;
        for (id, expert) in self.experts.iter_mut() {
            let given = advice.get(id);
            if let Some(fresh) = given {
                expert.memory.set(&trial.state, Some(fresh.clone()))?;
            }
            let judged = if self.config.regular_update {
                expert.memory.get(&trial.state)?.clone()
            } else {
                given.cloned()
            };
            let Some(judged) = judged else {
                continue;
            };
            let top = match best {
                Some(v) => v,
                None => {
                    let scores = self.base.score_state(&trial.state)?;
                    let v = scores
                        .iter()
                        .map(|(_, v)| *v)
                        .fold(f64::NEG_INFINITY, f64::max);
                    best = Some(v);
                    v
                }
            };
            let value = self.base.score(&trial.state, &judged)?;
            expert.belief.record(value >= top);
        }
        Ok(())
    }

    fn reset(&mut self, experts: &[ExpertId]) {
        self.base.reset(experts);
        self.learned = 0;
        self.rng = StdRng::seed_from_u64(self.config.seed);
        let layout = self.base.state_layout().clone();
        self.experts = experts
            .iter()
            .map(|id| {
                (
                    id.clone(),
                    ExpertState {
                        belief: ReliabilityBelief::from_config(&self.config),
                        memory: StateTable::new(layout.clone(), None),
                    },
                )
            })
            .collect();
        self.history = experts.iter().map(|id| (id.clone(), Vec::new())).collect();
    }

    fn takes_advice(&self) -> bool {
        true
    }

    fn reliability_history(&self) -> Option<&ReliabilityHistory> {
        Some(&self.history)
    }

    fn reliability_report(&self) -> Option<ReliabilityReport> {
        Some(
            self.experts
                .iter()
                .map(|(id, e)| (id.clone(), e.belief.summary(REPORT_CREDIBLE_LEVEL)))
                .collect(),
        )
    }
}
