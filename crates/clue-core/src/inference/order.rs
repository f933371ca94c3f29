//! Elimination orders.
//!
//! For a decision problem the order must eliminate, before each decision,
//! only chance variables the decision cannot observe. Building it backwards
//! from the last decision:
//!
//! ```text
//! for j = k..1:
//!     emit remaining chance variables not observed by any of d1..dj
//!     emit dj
//! emit the remaining chance variables
//! ```
//!
//! Chance variables that cannot influence the utility or the evidence are
//! filtered out up front.

use crate::model::{InfluenceDiagram, ModelError, Slots, VarId};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EliminationOrder(Vec<VarId>);

impl EliminationOrder {
    pub fn new(ids: Vec<VarId>) -> Self {
        EliminationOrder(ids)
    }

    pub fn from_names(diagram: &InfluenceDiagram, names: &[&str]) -> Result<Self, ModelError> {
        names
            .iter()
            .map(|name| diagram.lookup(name).map(|v| v.id()))
            .collect::<Result<Vec<_>, _>>()
            .map(EliminationOrder)
    }

    pub fn ids(&self) -> &[VarId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self, diagram: &InfluenceDiagram) -> Vec<String> {
        self.0
            .iter()
            .filter_map(|id| diagram.variable(*id).map(|v| v.name().to_string()))
            .collect()
    }

    /// Order for solving the diagram without observations.
    pub fn for_decisions(diagram: &InfluenceDiagram) -> Self {
        Self::for_evidence(diagram, &Slots::new(diagram.num_variables()))
    }

    /// Order for solving the diagram with `observed` variables fixed.
    ///
    /// Observed variables are left out; they are not eliminated.
    pub fn for_evidence(diagram: &InfluenceDiagram, observed: &Slots) -> Self {
        let requisite = diagram.requisite_chance(observed);
        let mut pending: Vec<VarId> = diagram
            .chance_order()
            .into_iter()
            .rev()
            .filter(|id| requisite[id.index()] && !observed.is_assigned(*id))
            .collect();
        let decisions: Vec<VarId> = diagram
            .decision_order()
            .into_iter()
            .filter(|id| !observed.is_assigned(*id))
            .collect();

        let mut order = Vec::with_capacity(pending.len() + decisions.len());
        for j in (0..decisions.len()).rev() {
            let observable: HashSet<VarId> = decisions[..=j]
                .iter()
                .filter_map(|d| diagram.variable(*d))
                .flat_map(|d| d.parents().iter().copied())
                .collect();
            let (now, later): (Vec<VarId>, Vec<VarId>) =
                pending.into_iter().partition(|v| !observable.contains(v));
            order.extend(now);
            order.push(decisions[j]);
            pending = later;
        }
        order.extend(pending);
        EliminationOrder(order)
    }

    /// Children-first order over every chance variable.
    pub fn reverse_topological(diagram: &InfluenceDiagram) -> Self {
        EliminationOrder(diagram.chance_order().into_iter().rev().collect())
    }
}
