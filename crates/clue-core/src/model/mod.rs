//! Influence-diagram model: variables, factors, and the validated diagram.
//!
//! A diagram holds chance variables with conditional probability tables,
//! decision variables with information sets, and exactly one utility table.
//! Every table is a dense [`Factor`] addressed with a mixed-radix index whose
//! first variable is most significant.

pub mod diagram;
pub mod factor;
pub mod variable;

pub use diagram::{DiagramBuilder, InfluenceDiagram};
pub use factor::{Factor, FactorId, FactorRole, IdAllocator, Scope};
pub use variable::{Slots, VarId, VarKind, Variable};

use thiserror::Error;

/// Errors from diagram construction and table addressing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("duplicate variable name: {0}")]
    DuplicateVariable(String),

    #[error("variable {0} has an empty domain")]
    EmptyDomain(String),

    #[error("value {value} appears twice in the domain of {variable}")]
    DuplicateValue { variable: String, value: String },

    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    #[error("value {value} is not in the domain of {variable}")]
    UnknownValue { variable: String, value: String },

    #[error("{0} is not a chance variable")]
    NotChance(String),

    #[error("decision {decision} cannot be a parent of chance variable {child}")]
    DecisionParentOfChance { decision: String, child: String },

    #[error("chance variable {0} has no conditional probability table")]
    MissingCpt(String),

    #[error("chance variable {0} has more than one conditional probability table")]
    DuplicateCpt(String),

    #[error("variable {0} appears more than once in one table")]
    RepeatedInScope(String),

    #[error("table {table} has {actual} entries, expected {expected}")]
    TableSize {
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error("row {row} of the table for {variable} sums to {sum}, expected 1")]
    RowSum {
        variable: String,
        row: usize,
        sum: f64,
    },

    #[error("table for {variable} has a negative or non-finite entry at index {index}")]
    InvalidProbability { variable: String, index: usize },

    #[error("utility table has a non-finite entry at index {index}")]
    InvalidUtility { index: usize },

    #[error("diagram has no utility table")]
    MissingUtility,

    #[error("diagram has more than one utility table")]
    DuplicateUtility,

    #[error("diagram contains a cycle through {0}")]
    Cycle(String),

    #[error("table over {0} exceeds the addressable size")]
    ScopeTooLarge(String),

    #[error("assignment is missing variable {0}")]
    MissingAssignment(String),

    #[error("index {index} is out of range for size {size}")]
    IndexOutOfRange { index: usize, size: usize },

    #[error("factor {0} is not a conditional probability table")]
    NotConditional(String),
}
