//! Optimal policy for a fully specified diagram.
//!
//! The oracle solves the diagram once and answers two questions for every
//! other component: which joint action is optimal in a state, and what a
//! given action is worth in a state. Answers for complete states are cached
//! in [`StateTable`]s; partial states are answered without caching.

use crate::agent::{Agent, Trial};
use crate::error::CoreResult;
use crate::expert::AdviceBundle;
use crate::inference::{DecisionNetwork, Solution};
use crate::logging::{event_names, Stage};
use crate::model::{InfluenceDiagram, VarId};
use crate::table::{StateTable, TableLayout};
use clue_common::{merged, Assignment, ExpertId};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::info;

#[derive(Debug)]
pub struct Oracle {
    diagram: Rc<InfluenceDiagram>,
    solution: Solution,
    state_layout: TableLayout,
    action_layout: TableLayout,
    policy: RefCell<StateTable<Option<Assignment>>>,
    utilities: RefCell<StateTable<Option<f64>>>,
}

impl Oracle {
    pub fn new(diagram: Rc<InfluenceDiagram>) -> CoreResult<Self> {
        let solution = DecisionNetwork::new(&diagram).solve(&Assignment::new())?;
        let state_vars: Vec<_> = diagram
            .chance_order()
            .into_iter()
            .filter_map(|id| diagram.variable(id).cloned())
            .collect();
        let action_vars: Vec<_> = diagram
            .decision_order()
            .into_iter()
            .filter_map(|id| diagram.variable(id).cloned())
            .collect();
        let state_layout = TableLayout::from_variables(&state_vars)?;
        let action_layout = TableLayout::from_variables(&action_vars)?;
        let joint = state_layout.join(&action_layout)?;
        info!(
            event = event_names::SOLVE_FINISHED,
            stage = %Stage::Solve,
            expected_utility = solution.expected_utility(),
            decisions = solution.rules().len(),
            states = state_layout.size(),
            actions = action_layout.size(),
            "oracle solved diagram"
        );
        Ok(Self {
            policy: RefCell::new(StateTable::new(state_layout.clone(), None)),
            utilities: RefCell::new(StateTable::new(joint, None)),
            diagram,
            solution,
            state_layout,
            action_layout,
        })
    }

    pub fn diagram(&self) -> &Rc<InfluenceDiagram> {
        &self.diagram
    }

    pub fn solution(&self) -> &Solution {
        &self.solution
    }

    /// Expected utility of the optimal policy before anything is observed.
    pub fn max_expected_utility(&self) -> f64 {
        self.solution.expected_utility()
    }

    /// Chance variables in topological order.
    pub fn state_layout(&self) -> &TableLayout {
        &self.state_layout
    }

    /// Decision variables in temporal order.
    pub fn action_layout(&self) -> &TableLayout {
        &self.action_layout
    }

    /// Optimal joint action in `state`.
    pub fn act(&self, state: &Assignment) -> CoreResult<Assignment> {
        let index = self.state_layout.index_of(state).ok();
        if let Some(i) = index {
            if let Some(Some(cached)) = self.policy.borrow().at(i) {
                return Ok(cached.clone());
            }
        }
        let action = self.compute_action(state)?;
        if let Some(i) = index {
            if let Some(cell) = self.policy.borrow_mut().at_mut(i) {
                *cell = Some(action.clone());
            }
        }
        Ok(action)
    }

    fn compute_action(&self, state: &Assignment) -> CoreResult<Assignment> {
        let mut slots = self.diagram.slots_from(&self.state_layout.restrict(state))?;
        let chosen = self.solution.act(&mut slots)?;
        let decisions: Vec<VarId> = chosen.iter().map(|(id, _)| *id).collect();
        Ok(self.diagram.assignment_from(&slots, &decisions)?)
    }

    /// `E[U | state, action]`.
    pub fn expected_utility(&self, state: &Assignment, action: &Assignment) -> CoreResult<f64> {
        let key = merged(state, action);
        let index = self.utilities.borrow().layout().index_of(&key).ok();
        if let Some(i) = index {
            if let Some(Some(cached)) = self.utilities.borrow().at(i) {
                return Ok(*cached);
            }
        }
        let value = DecisionNetwork::new(&self.diagram)
            .solve(&key)?
            .expected_utility();
        if let Some(i) = index {
            if let Some(cell) = self.utilities.borrow_mut().at_mut(i) {
                *cell = Some(value);
            }
        }
        Ok(value)
    }

    /// Expected utility of the optimal action in `state`.
    pub fn best_expected_utility(&self, state: &Assignment) -> CoreResult<f64> {
        let action = self.act(state)?;
        self.expected_utility(state, &action)
    }
}

/// The oracle as an agent: always plays the optimal policy, learns nothing.
#[derive(Debug, Clone)]
pub struct OracleAgent {
    oracle: Rc<Oracle>,
}

impl OracleAgent {
    pub fn new(oracle: Rc<Oracle>) -> Self {
        Self { oracle }
    }
}

impl Agent for OracleAgent {
    fn name(&self) -> &str {
        "True Policy"
    }

    fn act(&mut self, state: &Assignment, _explore: bool) -> CoreResult<Assignment> {
        self.oracle.act(state)
    }

    fn learn(&mut self, _trial: &Trial, _advice: &AdviceBundle) -> CoreResult<()> {
        Ok(())
    }

    fn reset(&mut self, _experts: &[ExpertId]) {}
}
