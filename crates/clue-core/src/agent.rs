//! The agent contract shared by every policy in an experiment.

use crate::error::CoreResult;
use crate::expert::AdviceBundle;
use crate::table::TableLayout;
use crate::trust::ReliabilitySummary;
use clue_common::{Assignment, ExpertId};
use std::collections::BTreeMap;

/// One completed interaction: the sampled state, the action taken, and the
/// reward the environment returned.
#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    pub state: Assignment,
    pub action: Assignment,
    pub reward: f64,
}

/// Per-expert reliability estimate, one entry per call to `act`.
pub type ReliabilityHistory = BTreeMap<ExpertId, Vec<f64>>;

/// Per-expert reliability belief as it stands now.
pub type ReliabilityReport = BTreeMap<ExpertId, ReliabilitySummary>;

pub trait Agent {
    fn name(&self) -> &str;

    /// Choose a joint action. With `explore == false` the agent acts purely
    /// on what it has learned.
    fn act(&mut self, state: &Assignment, explore: bool) -> CoreResult<Assignment>;

    /// Update from a finished trial and whatever advice the panel gave.
    fn learn(&mut self, trial: &Trial, advice: &AdviceBundle) -> CoreResult<()>;

    /// Forget everything learned and prepare for a run with `experts`.
    fn reset(&mut self, experts: &[ExpertId]);

    fn takes_advice(&self) -> bool {
        false
    }

    fn reliability_history(&self) -> Option<&ReliabilityHistory> {
        None
    }

    fn reliability_report(&self) -> Option<ReliabilityReport> {
        None
    }
}

/// Agents exposing action-value estimates, which the trust engine uses to
/// judge advice.
pub trait ActionScorer {
    fn state_layout(&self) -> &TableLayout;

    fn action_layout(&self) -> &TableLayout;

    /// Every joint action with its current value, in action index order.
    fn score_state(&self, state: &Assignment) -> CoreResult<Vec<(Assignment, f64)>>;

    fn score(&self, state: &Assignment, action: &Assignment) -> CoreResult<f64>;
}
