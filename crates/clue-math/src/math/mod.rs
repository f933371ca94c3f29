//! Core math modules.

pub mod beta;
pub mod prob;
pub mod stable;
