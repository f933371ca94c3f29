//! Exact inference over influence diagrams.
//!
//! - [`ve`]: sum-product variable elimination for marginal queries
//! - [`dn`]: max/sum elimination producing decision rules and the
//!   maximum expected utility
//! - [`order`]: elimination orders consistent with information sets

pub mod dn;
pub mod order;
pub mod ve;

pub use dn::{DecisionNetwork, DecisionRule, Solution};
pub use order::EliminationOrder;
pub use ve::{Marginal, VariableElimination};

use crate::model::ModelError;
use thiserror::Error;

/// Errors from queries and decision-network solving.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("{0} is not a chance variable")]
    NotChance(String),

    #[error("observations have zero probability")]
    ZeroEvidence,

    #[error("elimination order left {remaining} uneliminated")]
    IncompleteOrder { remaining: String },

    #[error("illegal elimination order at {at}: {reason}")]
    IllegalOrder { at: String, reason: String },
}
