//! CLUE configuration loading and validation.
//!
//! This crate provides:
//! - Typed structs for the trust engine, learner, experts, and experiments
//! - Documented defaults through `Default` and `#[serde(default)]`
//! - JSON loading and semantic validation

pub mod experiment;
pub mod expert;
pub mod learner;
pub mod trust;
pub mod validate;

pub use experiment::{load_experiment_config, ExperimentConfig};
pub use expert::{DisclosureConfig, ExpertConfig, PanelConfig};
pub use learner::{AspirationConfig, LearnerConfig};
pub use trust::{ExplorationConfig, PriorCounts, TrustConfig, TrustMode};
pub use validate::{ValidationError, ValidationResult};

/// Schema version for experiment configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
