//! Expert that cannot observe some chance variables.

use super::{DisclosureGate, Expert};
use crate::error::CoreResult;
use crate::logging::{event_names, Stage};
use crate::oracle::Oracle;
use crate::table::{StateTable, TableLayout};
use clue_common::{merged, Assignment, ExpertId};
use clue_config::validate::{validate_disclosure, validate_known_names};
use clue_config::DisclosureConfig;
use std::rc::Rc;
use tracing::debug;

/// Always advises the action that is optimal given only the visible part of
/// the state.
///
/// Hidden chance variables are marginalized out. The disclosure gate runs on
/// the expert's own valuations, so it only speaks up about regret it can
/// see.
#[derive(Debug)]
pub struct PartiallyReliableExpert {
    id: ExpertId,
    oracle: Rc<Oracle>,
    hidden: Vec<String>,
    visible: TableLayout,
    values: StateTable<Option<f64>>,
    gate: DisclosureGate,
}

impl PartiallyReliableExpert {
    pub fn new<S: AsRef<str>>(
        name: impl Into<String>,
        hidden: &[S],
        oracle: Rc<Oracle>,
        disclosure: DisclosureConfig,
    ) -> CoreResult<Self> {
        let states = oracle.state_layout();
        validate_known_names("hidden", hidden, states.names())?;
        validate_disclosure("disclosure", &disclosure)?;
        let hidden: Vec<String> = hidden.iter().map(|h| h.as_ref().to_string()).collect();
        let visible = TableLayout::new(
            states
                .names()
                .iter()
                .zip(states.domains())
                .filter(|(name, _)| !hidden.iter().any(|h| h == *name))
                .map(|(name, domain)| (name.clone(), domain.clone())),
        )?;
        let values = StateTable::new(visible.join(oracle.action_layout())?, None);
        Ok(Self {
            id: ExpertId::new(name),
            oracle,
            hidden,
            visible,
            values,
            gate: DisclosureGate::new(disclosure),
        })
    }

    pub fn hidden(&self) -> &[String] {
        &self.hidden
    }

    /// `E[U | visible part of state, action]`, memoized.
    pub fn value(&mut self, state: &Assignment, action: &Assignment) -> CoreResult<f64> {
        let visible = self.visible.restrict(state);
        let key = merged(&visible, action);
        if let Some(cached) = self.values.get(&key)? {
            return Ok(*cached);
        }
        let value = self.oracle.expected_utility(&visible, action)?;
        self.values.set(&key, Some(value))?;
        Ok(value)
    }

    /// Best action under the visible state with its value; ties go to the
    /// earliest action.
    fn best(&mut self, state: &Assignment) -> CoreResult<(Assignment, f64)> {
        let actions: Vec<Assignment> = self.oracle.action_layout().iter().collect();
        let mut best: Option<(Assignment, f64)> = None;
        for action in actions {
            let value = self.value(state, &action)?;
            if best.as_ref().map_or(true, |(_, b)| value > *b) {
                best = Some((action, value));
            }
        }
        match best {
            Some(best) => Ok(best),
            None => Ok((Assignment::new(), 0.0)),
        }
    }
}

impl Expert for PartiallyReliableExpert {
    fn id(&self) -> &ExpertId {
        &self.id
    }

    fn advise(&mut self, state: &Assignment) -> CoreResult<Assignment> {
        Ok(self.best(state)?.0)
    }

    fn deliberate(
        &mut self,
        state: &Assignment,
        action: &Assignment,
        _reward: f64,
    ) -> CoreResult<Option<Assignment>> {
        let (advice, own_eu) = self.best(state)?;
        let agent_eu = self.value(state, action)?;
        if !self.gate.observe(own_eu, agent_eu) {
            return Ok(None);
        }
        debug!(
            event = event_names::EXPERT_DISCLOSED,
            stage = %Stage::Advise,
            expert = %self.id,
            hidden = self.hidden.len(),
            "expert disclosed advice"
        );
        Ok(Some(advice))
    }

    fn reset(&mut self) {
        self.gate.reset();
    }
}
