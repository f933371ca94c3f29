//! Error type for the core crate.
//!
//! Module errors convert into [`CoreError`] with `?`; callers that want the
//! categorized, coded form convert once more into [`clue_common::Error`].

use crate::inference::InferenceError;
use crate::model::ModelError;
use crate::table::TableError;
use clue_config::ValidationError;
use thiserror::Error;

pub type CoreResult<T> = std::result::Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Config(#[from] ValidationError),

    #[error("unknown expert: {0}")]
    UnknownExpert(String),

    #[error("{agent}: {message}")]
    Agent { agent: String, message: String },
}

impl From<CoreError> for clue_common::Error {
    fn from(err: CoreError) -> Self {
        use clue_common::Error;
        match err {
            CoreError::Model(ModelError::UnknownVariable(name)) => Error::UnknownVariable { name },
            CoreError::Model(ModelError::UnknownValue { variable, value })
            | CoreError::Table(TableError::UnknownValue { variable, value }) => {
                Error::UnknownValue { variable, value }
            }
            CoreError::Model(e) => Error::Model(e.to_string()),
            CoreError::Table(e) => Error::Model(e.to_string()),
            CoreError::Inference(InferenceError::Model(e)) => CoreError::Model(e).into(),
            CoreError::Inference(InferenceError::ZeroEvidence) => Error::ZeroEvidence,
            CoreError::Inference(e @ InferenceError::IllegalOrder { .. }) => {
                Error::IllegalOrder(e.to_string())
            }
            CoreError::Inference(e) => Error::Inference(e.to_string()),
            CoreError::Config(e) => e.into(),
            CoreError::UnknownExpert(name) => Error::Expert(format!("unknown expert: {}", name)),
            CoreError::Agent { agent, message } => Error::Agent(format!("{}: {}", agent, message)),
        }
    }
}
