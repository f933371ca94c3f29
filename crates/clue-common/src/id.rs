//! Expert and run identity types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an expert within a panel.
///
/// Panels built from reliabilities alone name experts after their true
/// reliability (`"0.9"`), matching how experiment results are keyed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpertId(pub String);

impl ExpertId {
    pub fn new(name: impl Into<String>) -> Self {
        ExpertId(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExpertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ExpertId {
    fn from(s: &str) -> Self {
        ExpertId(s.to_string())
    }
}

/// Identifier of one experimental run, used to correlate log lines.
///
/// Format: `run-<12 hex chars>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a fresh random run id.
    pub fn generate() -> Self {
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        RunId(format!("run-{}", &uuid[..12]))
    }

    /// Parse an existing run id string.
    pub fn parse(s: &str) -> Option<Self> {
        let suffix = s.strip_prefix("run-")?;
        if suffix.len() != 12 || !suffix.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(RunId(s.to_string()))
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_generate_parses() {
        let id = RunId::generate();
        assert_eq!(id.0.len(), 16);
        assert_eq!(RunId::parse(&id.0), Some(id));
    }

    #[test]
    fn test_run_id_rejects_malformed() {
        assert!(RunId::parse("run-xyz").is_none());
        assert!(RunId::parse("pt-0123456789ab").is_none());
        assert!(RunId::parse("run-0123456789ag").is_none());
    }

    #[test]
    fn test_expert_id_serde_transparent() {
        let id = ExpertId::from("0.75");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""0.75""#);
        assert_eq!(id.to_string(), "0.75");
    }
}
