//! CLUE core library
//!
//! This library provides the decision-theoretic core of CLUE:
//! - Influence-diagram model and exact inference (VE, VE-DN)
//! - The oracle policy and its state-indexed caches
//! - Action-value learning and the agent contract
//! - Unreliable experts, panels, and the disclosure protocol
//! - The advice-trust engine
//! - Environments and the experiment loop

pub mod agent;
pub mod env;
pub mod error;
pub mod experiment;
pub mod expert;
pub mod inference;
pub mod learner;
pub mod logging;
pub mod model;
pub mod oracle;
pub mod table;
pub mod trust;

pub use agent::{ActionScorer, Agent, ReliabilityHistory, ReliabilityReport, Trial};
pub use env::{DiagramEnvironment, Environment};
pub use error::{CoreError, CoreResult};
pub use experiment::{run_experiment, run_panel, run_standard, ExperimentReport, RunRecord};
pub use expert::{
    AdviceBundle, DisclosureGate, Expert, NonuniformUnreliableExpert, Panel,
    PartiallyReliableExpert, UnreliableExpert,
};
pub use inference::{DecisionNetwork, EliminationOrder, Solution, VariableElimination};
pub use learner::{ActionValues, GreedyLearner};
pub use model::{DiagramBuilder, InfluenceDiagram};
pub use oracle::{Oracle, OracleAgent};
pub use table::{StateTable, TableLayout};
pub use trust::{ClueAgent, NaiveAdviceFollower, ReliabilityBelief, ReliabilitySummary};
