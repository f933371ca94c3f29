//! Deciding when to act on expert advice.

pub mod engine;
pub mod follower;
pub mod reliability;

pub use engine::ClueAgent;
pub use follower::NaiveAdviceFollower;
pub use reliability::{ReliabilityBelief, ReliabilitySummary};
