//! Experts: simulated advisors with known ground-truth reliability.
//!
//! An expert answers two questions each trial. `advise` returns what it
//! would recommend in a state. `deliberate` sees what the agent did and
//! decides, through its [`DisclosureGate`], whether to speak up at all.

pub mod disclosure;
pub mod nonuniform;
pub mod panel;
pub mod partial;
pub mod unreliable;

pub use disclosure::DisclosureGate;
pub use nonuniform::NonuniformUnreliableExpert;
pub use panel::{AdviceBundle, Panel};
pub use partial::PartiallyReliableExpert;
pub use unreliable::UnreliableExpert;

use crate::error::CoreResult;
use clue_common::{Assignment, ExpertId};

pub trait Expert {
    fn id(&self) -> &ExpertId;

    /// Recommended joint action for `state`.
    fn advise(&mut self, state: &Assignment) -> CoreResult<Assignment>;

    /// Advice for this trial, or `None` when the expert stays silent.
    fn deliberate(
        &mut self,
        state: &Assignment,
        action: &Assignment,
        reward: f64,
    ) -> CoreResult<Option<Assignment>>;

    fn reset(&mut self);
}
