//! Stable event names and pipeline stages.
//!
//! Log call sites attach `event = event_names::X` and `stage = %Stage::Y`
//! so JSON output can be filtered without parsing messages.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Decision-network solving and oracle queries.
    Solve,
    /// Agent action selection.
    Act,
    /// Agent and trust-belief updates.
    Learn,
    /// Expert deliberation and disclosure.
    Advise,
    /// Experiment run lifecycle.
    Run,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Solve => "solve",
            Stage::Act => "act",
            Stage::Learn => "learn",
            Stage::Advise => "advise",
            Stage::Run => "run",
        })
    }
}

pub mod event_names {
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    pub const SOLVE_FINISHED: &str = "solve.finished";

    pub const TRUST_ADOPTED: &str = "trust.adopted";
    pub const TRUST_REJECTED: &str = "trust.rejected";
    pub const TRUST_DEGENERATE: &str = "trust.degenerate";

    pub const EXPERT_DISCLOSED: &str = "expert.disclosed";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_serde_matches_display() {
        for stage in [Stage::Solve, Stage::Act, Stage::Learn, Stage::Advise, Stage::Run] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage));
        }
    }

    #[test]
    fn test_event_names_are_dotted() {
        for name in [
            event_names::RUN_STARTED,
            event_names::RUN_FINISHED,
            event_names::SOLVE_FINISHED,
            event_names::TRUST_ADOPTED,
            event_names::TRUST_REJECTED,
            event_names::TRUST_DEGENERATE,
            event_names::EXPERT_DISCLOSED,
        ] {
            let (stage, what) = name.split_once('.').unwrap();
            assert!(!stage.is_empty() && !what.is_empty());
        }
    }
}
