//! CLUE math utilities.

pub mod math;

pub use math::beta::*;
pub use math::prob::*;
pub use math::stable::*;
