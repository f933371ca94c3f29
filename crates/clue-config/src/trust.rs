//! Advice-trust engine configuration.

use serde::{Deserialize, Serialize};

/// How the trust engine combines available advice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrustMode {
    /// Posterior over joint actions from every advising expert.
    #[default]
    Bayesian,
    /// Follow the single most reliable advising expert.
    Naive,
}

/// Pseudo-counts seeding each expert's reliability belief.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorCounts {
    pub optimal: f64,
    pub suboptimal: f64,
}

impl Default for PriorCounts {
    fn default() -> Self {
        Self {
            optimal: 1.0,
            suboptimal: 1.0,
        }
    }
}

/// Linear exploration schedule from `start` to `end`.
///
/// The schedule reaches `end` after `decay_fraction` of the total trials.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationConfig {
    pub start: f64,
    pub end: f64,
    pub decay_fraction: f64,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            start: 1.0,
            end: 0.0,
            decay_fraction: 0.8,
        }
    }
}

/// Advice-trust engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    pub prior: PriorCounts,
    pub exploration: ExplorationConfig,

    /// Minimum posterior mass on the best action before advice is trusted.
    /// `None` uses `min(2/|A|, 0.5)`.
    pub threshold: Option<f64>,

    pub mode: TrustMode,

    /// Re-evaluate remembered advice for a state even when none was given
    /// this trial.
    pub regular_update: bool,

    /// Only the last `n` evaluated outcomes count toward reliability.
    pub sliding_window: Option<usize>,

    /// Exponential recency weight λ for the reliability estimate.
    pub recency: Option<f64>,

    pub seed: u64,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            prior: PriorCounts::default(),
            exploration: ExplorationConfig::default(),
            threshold: None,
            mode: TrustMode::Bayesian,
            regular_update: true,
            sliding_window: None,
            recency: None,
            seed: 0,
        }
    }
}

impl TrustConfig {
    /// Naive variant with otherwise default settings.
    pub fn naive() -> Self {
        Self {
            mode: TrustMode::Naive,
            ..Self::default()
        }
    }

    /// Trust threshold for an action space of `action_count` joint actions.
    pub fn threshold_for(&self, action_count: usize) -> f64 {
        self.threshold
            .unwrap_or_else(|| default_threshold(action_count))
    }
}

/// `min(2/|A|, 0.5)`; an empty action space gets 0.5.
pub fn default_threshold(action_count: usize) -> f64 {
    if action_count == 0 {
        return 0.5;
    }
    (2.0 / action_count as f64).min(0.5)
}
