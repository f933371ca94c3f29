//! Expert and panel configuration.

use serde::{Deserialize, Serialize};

/// Regret-driven disclosure: an expert speaks at most once per `interval`
/// trials, and only when average regret since its last advice reaches
/// `tolerance`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisclosureConfig {
    pub interval: u64,
    pub tolerance: f64,
}

impl Default for DisclosureConfig {
    fn default() -> Self {
        Self {
            interval: 10,
            tolerance: 0.01,
        }
    }
}

impl DisclosureConfig {
    /// Disclose on every trial.
    pub fn always() -> Self {
        Self {
            interval: 1,
            tolerance: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpertConfig {
    #[serde(default)]
    pub name: Option<String>,

    /// Probability of advising the optimal action.
    pub reliability: f64,

    #[serde(default)]
    pub disclosure: DisclosureConfig,

    /// Multiplier applied to reliability after each deliberation.
    #[serde(default)]
    pub degrade_factor: Option<f64>,
}

impl ExpertConfig {
    pub fn with_reliability(reliability: f64) -> Self {
        Self {
            name: None,
            reliability,
            disclosure: DisclosureConfig::default(),
            degrade_factor: None,
        }
    }

    /// Explicit name, or the reliability itself (`"0.9"`).
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{}", self.reliability))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelConfig {
    pub name: String,
    #[serde(default)]
    pub experts: Vec<ExpertConfig>,
}

impl PanelConfig {
    /// Panel of default-disclosure experts with the given reliabilities.
    pub fn from_reliabilities(name: impl Into<String>, reliabilities: &[f64]) -> Self {
        Self {
            name: name.into(),
            experts: reliabilities
                .iter()
                .map(|&r| ExpertConfig::with_reliability(r))
                .collect(),
        }
    }
}
