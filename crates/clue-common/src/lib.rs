//! CLUE common types, IDs, and errors.
//!
//! Foundational types shared by the config and core crates:
//! - Domain values and named assignments
//! - Expert and run identifiers
//! - The categorized error type

pub mod error;
pub mod id;
pub mod value;

pub use error::{Error, ErrorCategory, ErrorReport, Result};
pub use id::{ExpertId, RunId};
pub use value::{assignment, merged, Assignment, Value};
