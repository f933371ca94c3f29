//! Tabular action-value learner configuration.

use serde::{Deserialize, Serialize};

/// Value threshold the greedy action must beat while exploring.
///
/// Decays linearly from `start` to `end` over `decay_fraction` of the trials,
/// so early on the learner mostly acts at random and later mostly greedily.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AspirationConfig {
    pub start: f64,
    pub end: f64,
    pub decay_fraction: f64,
}

impl Default for AspirationConfig {
    fn default() -> Self {
        Self {
            start: 1.0,
            end: -1.0,
            decay_fraction: 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LearnerConfig {
    /// Value of every (state, action) pair before it is visited.
    pub initial_value: f64,

    /// Fixed step size. `None` uses the sample average (1/n).
    pub learning_rate: Option<f64>,

    pub aspiration: AspirationConfig,
}
