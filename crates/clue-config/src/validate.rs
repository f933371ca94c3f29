//! Configuration validation errors and semantic validation.

use crate::expert::{DisclosureConfig, ExpertConfig, PanelConfig};
use crate::experiment::ExperimentConfig;
use crate::learner::LearnerConfig;
use crate::trust::TrustConfig;
use std::collections::HashSet;
use thiserror::Error;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::SemanticError(_) => 10,
            ValidationError::InvalidValue { .. } => 11,
            ValidationError::VersionMismatch { .. } => 12,
        }
    }
}

impl From<ValidationError> for clue_common::Error {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidValue { field, message } => {
                clue_common::Error::InvalidParameter { field, message }
            }
            other => clue_common::Error::Config(other.to_string()),
        }
    }
}

fn invalid(field: impl Into<String>, message: String) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        message,
    }
}

fn check_unit(field: &str, value: f64) -> ValidationResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid(field, format!("Must be in [0, 1], got {}", value)));
    }
    Ok(())
}

fn check_half_open_unit(field: &str, value: f64) -> ValidationResult<()> {
    if !(value > 0.0 && value <= 1.0) {
        return Err(invalid(field, format!("Must be in (0, 1], got {}", value)));
    }
    Ok(())
}

/// Validate a trial count: runs and exploration schedules need at least one.
pub fn validate_trials(trials: usize) -> ValidationResult<()> {
    if trials == 0 {
        return Err(invalid("trials", "Must be at least 1".to_string()));
    }
    Ok(())
}

/// Validate a non-empty list of per-region reliabilities under `field`.
pub fn validate_reliabilities(field: &str, reliabilities: &[f64]) -> ValidationResult<()> {
    if reliabilities.is_empty() {
        return Err(invalid(field, "Must list at least one reliability".to_string()));
    }
    for (i, &r) in reliabilities.iter().enumerate() {
        check_unit(&format!("{}[{}]", field, i), r)?;
    }
    Ok(())
}

/// Validate a region map: every region must index into `count` reliabilities.
pub fn validate_regions(field: &str, regions: &[usize], count: usize) -> ValidationResult<()> {
    match regions.iter().position(|&r| r >= count) {
        Some(i) => Err(invalid(
            format!("{}[{}]", field, i),
            format!("Region {} out of range for {} reliabilities", regions[i], count),
        )),
        None => Ok(()),
    }
}

/// Validate that every name in `names` is one of `known`.
pub fn validate_known_names<S: AsRef<str>>(
    field: &str,
    names: &[S],
    known: &[String],
) -> ValidationResult<()> {
    for name in names {
        let name = name.as_ref();
        if !known.iter().any(|k| k == name) {
            return Err(invalid(field, format!("Unknown variable '{}'", name)));
        }
    }
    Ok(())
}

/// Validate trust engine settings.
pub fn validate_trust(trust: &TrustConfig) -> ValidationResult<()> {
    let prior = &trust.prior;
    if !(prior.optimal >= 0.0) {
        return Err(invalid(
            "trust.prior.optimal",
            format!("Must be non-negative, got {}", prior.optimal),
        ));
    }
    if !(prior.suboptimal >= 0.0) {
        return Err(invalid(
            "trust.prior.suboptimal",
            format!("Must be non-negative, got {}", prior.suboptimal),
        ));
    }
    if prior.optimal + prior.suboptimal <= 0.0 {
        return Err(ValidationError::SemanticError(
            "trust.prior counts must not both be zero".to_string(),
        ));
    }

    check_unit("trust.exploration.start", trust.exploration.start)?;
    check_unit("trust.exploration.end", trust.exploration.end)?;
    if !(trust.exploration.decay_fraction > 0.0) || !trust.exploration.decay_fraction.is_finite() {
        return Err(invalid(
            "trust.exploration.decay_fraction",
            format!("Must be positive, got {}", trust.exploration.decay_fraction),
        ));
    }

    if let Some(threshold) = trust.threshold {
        check_unit("trust.threshold", threshold)?;
    }
    if trust.sliding_window == Some(0) {
        return Err(invalid(
            "trust.sliding_window",
            "Must be at least 1".to_string(),
        ));
    }
    if let Some(recency) = trust.recency {
        check_half_open_unit("trust.recency", recency)?;
    }
    Ok(())
}

/// Validate learner settings.
pub fn validate_learner(learner: &LearnerConfig) -> ValidationResult<()> {
    if !learner.initial_value.is_finite() {
        return Err(invalid(
            "learner.initial_value",
            format!("Must be finite, got {}", learner.initial_value),
        ));
    }
    if let Some(rate) = learner.learning_rate {
        check_half_open_unit("learner.learning_rate", rate)?;
    }
    let aspiration = &learner.aspiration;
    if !aspiration.start.is_finite() || !aspiration.end.is_finite() {
        return Err(invalid(
            "learner.aspiration",
            format!(
                "Bounds must be finite, got start={} end={}",
                aspiration.start, aspiration.end
            ),
        ));
    }
    if !(aspiration.decay_fraction > 0.0) || !aspiration.decay_fraction.is_finite() {
        return Err(invalid(
            "learner.aspiration.decay_fraction",
            format!("Must be positive, got {}", aspiration.decay_fraction),
        ));
    }
    Ok(())
}

/// Validate disclosure settings under `field`.
pub fn validate_disclosure(field: &str, disclosure: &DisclosureConfig) -> ValidationResult<()> {
    if disclosure.interval == 0 {
        return Err(invalid(
            format!("{}.interval", field),
            "Must be at least 1".to_string(),
        ));
    }
    if !(disclosure.tolerance >= 0.0) {
        return Err(invalid(
            format!("{}.tolerance", field),
            format!("Must be non-negative, got {}", disclosure.tolerance),
        ));
    }
    Ok(())
}

/// Validate one expert under `field`.
pub fn validate_expert(field: &str, expert: &ExpertConfig) -> ValidationResult<()> {
    check_unit(&format!("{}.reliability", field), expert.reliability)?;
    validate_disclosure(&format!("{}.disclosure", field), &expert.disclosure)?;
    if let Some(factor) = expert.degrade_factor {
        check_half_open_unit(&format!("{}.degrade_factor", field), factor)?;
    }
    Ok(())
}

/// Validate a panel: non-empty name, valid experts with unique names.
pub fn validate_panel(panel: &PanelConfig) -> ValidationResult<()> {
    if panel.name.trim().is_empty() {
        return Err(ValidationError::SemanticError(
            "panel name must not be empty".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    for (i, expert) in panel.experts.iter().enumerate() {
        validate_expert(&format!("panels.{}.experts[{}]", panel.name, i), expert)?;
        let name = expert.display_name();
        if !seen.insert(name.clone()) {
            return Err(ValidationError::SemanticError(format!(
                "duplicate expert name '{}' in panel '{}'",
                name, panel.name
            )));
        }
    }
    Ok(())
}

/// Validate a complete experiment configuration.
pub fn validate_experiment(config: &ExperimentConfig) -> ValidationResult<()> {
    if config.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }
    validate_trials(config.trials)?;
    if config.runs == 0 {
        return Err(invalid("runs", "Must be at least 1".to_string()));
    }
    validate_trust(&config.trust)?;
    validate_learner(&config.learner)?;
    let mut names = HashSet::new();
    for panel in &config.panels {
        validate_panel(panel)?;
        if !names.insert(panel.name.as_str()) {
            return Err(ValidationError::SemanticError(format!(
                "duplicate panel name '{}'",
                panel.name
            )));
        }
    }
    Ok(())
}
