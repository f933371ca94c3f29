//! Experiment configuration: trial counts, seeds, and expert panels.

use crate::expert::PanelConfig;
use crate::learner::LearnerConfig;
use crate::trust::TrustConfig;
use crate::validate::{ValidationError, ValidationResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A batch of independent runs of a trust-engine agent against one or more
/// expert panels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub schema_version: String,

    #[serde(default = "default_trials")]
    pub trials: usize,

    #[serde(default = "default_runs")]
    pub runs: usize,

    #[serde(default)]
    pub seed: u64,

    #[serde(default)]
    pub trust: TrustConfig,

    #[serde(default)]
    pub learner: LearnerConfig,

    #[serde(default)]
    pub panels: Vec<PanelConfig>,

    /// Also run the base learner without any experts.
    #[serde(default)]
    pub include_baseline: bool,
}

fn default_trials() -> usize {
    1000
}

fn default_runs() -> usize {
    1
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            trials: default_trials(),
            runs: default_runs(),
            seed: 0,
            trust: TrustConfig::default(),
            learner: LearnerConfig::default(),
            panels: Vec::new(),
            include_baseline: false,
        }
    }
}

impl ExperimentConfig {
    /// Parse an experiment from a JSON string (no semantic validation).
    pub fn from_json_str(json: &str) -> ValidationResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| ValidationError::ParseError(format!("Invalid JSON: {}", e)))
    }

    /// Load an experiment from a JSON file (no semantic validation).
    pub fn from_file(path: &Path) -> ValidationResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }

    /// Seed for run `run` of panel `panel`, derived from the experiment seed.
    pub fn run_seed(&self, panel: usize, run: usize) -> u64 {
        self.seed
            .wrapping_add((panel as u64).wrapping_mul(1_000_003))
            .wrapping_add(run as u64)
    }
}

/// Load and semantically validate an experiment configuration file.
pub fn load_experiment_config(path: &Path) -> ValidationResult<ExperimentConfig> {
    let config = ExperimentConfig::from_file(path)?;
    crate::validate::validate_experiment(&config)?;
    Ok(config)
}
