//! Per-expert reliability belief.
//!
//! The belief is a pair of pseudo-counts (optimal, suboptimal) seeded from a
//! prior, read as a Beta posterior with mean
//!
//! ```text
//! ρ = optimal / (optimal + suboptimal)
//! ```
//!
//! Two variants change what the counts cover:
//! - sliding window `W`: counts come from the last `W` outcomes only, and the
//!   prior applies only until the first outcome arrives
//! - recency `λ`: ρ is an exponential moving average,
//!   `ρ ← (1 − λ) ρ + λ · [outcome was optimal]`, started at the prior mean

use clue_config::{PriorCounts, TrustConfig};
use serde::Serialize;
use std::collections::VecDeque;

/// Reliability belief at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReliabilitySummary {
    pub rho: f64,
    pub evaluations: u64,
    /// Equal-tailed credible interval over ρ, when the counts allow one.
    pub interval: Option<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReliabilityBelief {
    prior: PriorCounts,
    optimal: f64,
    suboptimal: f64,
    window: Option<(usize, VecDeque<bool>)>,
    recency: Option<f64>,
    recent: f64,
    evaluations: u64,
}

impl ReliabilityBelief {
    pub fn new(prior: PriorCounts, sliding_window: Option<usize>, recency: Option<f64>) -> Self {
        let mut belief = Self {
            prior,
            optimal: prior.optimal,
            suboptimal: prior.suboptimal,
            window: sliding_window.map(|w| (w, VecDeque::with_capacity(w))),
            recency,
            recent: 0.0,
            evaluations: 0,
        };
        belief.recent = belief.prior_mean();
        belief
    }

    pub fn from_config(config: &TrustConfig) -> Self {
        Self::new(config.prior, config.sliding_window, config.recency)
    }

    fn prior_mean(&self) -> f64 {
        clue_math::count_ratio(self.prior.optimal, self.prior.suboptimal, 0.5)
    }

    /// Record whether one piece of advice was judged optimal.
    pub fn record(&mut self, optimal: bool) {
        self.evaluations += 1;
        match &mut self.window {
            Some((size, outcomes)) => {
                if outcomes.len() == *size {
                    outcomes.pop_front();
                }
                outcomes.push_back(optimal);
                let hits = outcomes.iter().filter(|o| **o).count();
                self.optimal = hits as f64;
                self.suboptimal = (outcomes.len() - hits) as f64;
            }
            None if optimal => self.optimal += 1.0,
            None => self.suboptimal += 1.0,
        }
        if let Some(lambda) = self.recency {
            let observation = if optimal { 1.0 } else { 0.0 };
            self.recent = clue_math::ema(self.recent, observation, lambda);
        }
    }

    /// Current reliability estimate ρ.
    pub fn rho(&self) -> f64 {
        match self.recency {
            Some(_) => self.recent.max(0.0),
            None => clue_math::count_ratio(self.optimal, self.suboptimal, self.prior_mean()),
        }
    }

    /// `(optimal, suboptimal)` counts currently in effect.
    pub fn counts(&self) -> (f64, f64) {
        (self.optimal, self.suboptimal)
    }

    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// Equal-tailed Beta credible interval over ρ for the counts in effect.
    ///
    /// `None` when the counts do not define a proper Beta distribution.
    pub fn credible_interval(&self, level: f64) -> Option<(f64, f64)> {
        clue_math::beta_credible_interval(self.optimal, self.suboptimal, level)
    }

    pub fn summary(&self, level: f64) -> ReliabilitySummary {
        ReliabilitySummary {
            rho: self.rho(),
            evaluations: self.evaluations,
            interval: self.credible_interval(level),
        }
    }

    pub fn reset(&mut self) {
        let window = self.window.as_ref().map(|(w, _)| *w);
        *self = Self::new(self.prior, window, self.recency);
    }
}
