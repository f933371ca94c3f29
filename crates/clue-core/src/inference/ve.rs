//! Sum-product variable elimination.
//!
//! A query projects every relevant conditional table onto the evidence,
//! sums the hidden variables out one at a time in the given order, and
//! normalizes the product of what remains over the query variable.
//!
//! Relevance is ancestral: a table matters only if its child is the query
//! variable, an observed variable, or an ancestor of one of them. All other
//! tables sum to one and are skipped.

use super::{EliminationOrder, InferenceError};
use crate::model::{Factor, InfluenceDiagram, Slots, VarId, Variable};
use clue_common::{Assignment, Value};
use std::rc::Rc;
use tracing::trace;

/// Posterior distribution of one variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Marginal {
    variable: String,
    distribution: Vec<(Value, f64)>,
}

impl Marginal {
    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// `(value, probability)` pairs in domain order.
    pub fn distribution(&self) -> &[(Value, f64)] {
        &self.distribution
    }

    pub fn probability(&self, value: &Value) -> f64 {
        self.distribution
            .iter()
            .find(|(v, _)| v == value)
            .map(|(_, p)| *p)
            .unwrap_or(0.0)
    }

    /// Most probable value; the first in domain order on ties.
    pub fn mode(&self) -> Option<&Value> {
        let probs: Vec<f64> = self.distribution.iter().map(|(_, p)| *p).collect();
        clue_math::argmax_first(&probs).map(|i| &self.distribution[i].0)
    }
}

/// Variable-elimination engine bound to one diagram.
#[derive(Debug, Clone, Copy)]
pub struct VariableElimination<'a> {
    diagram: &'a InfluenceDiagram,
}

impl<'a> VariableElimination<'a> {
    pub fn new(diagram: &'a InfluenceDiagram) -> Self {
        Self { diagram }
    }

    /// `P(var | observations)`.
    ///
    /// Without an explicit order, hidden variables are eliminated children
    /// first. An observed query variable yields an indicator distribution.
    pub fn query(
        &self,
        var: &str,
        observations: &Assignment,
        order: Option<&EliminationOrder>,
    ) -> Result<Marginal, InferenceError> {
        let target = Rc::clone(self.diagram.lookup(var)?);
        if target.is_decision() {
            return Err(InferenceError::NotChance(var.to_string()));
        }
        let evidence = self.diagram.slots_from(observations)?;

        if let Some(observed) = evidence.get(target.id()) {
            let distribution = target
                .domain()
                .iter()
                .enumerate()
                .map(|(i, v)| (v.clone(), if i == observed { 1.0 } else { 0.0 }))
                .collect();
            return Ok(Marginal {
                variable: var.to_string(),
                distribution,
            });
        }

        let relevant = self.diagram.ancestors(
            std::iter::once(target.id()).chain(evidence.assigned().map(|(id, _)| id)),
        );
        let mut factors = self.project(
            self.diagram
                .probability_factors()
                .filter(|f| f.child().is_some_and(|c| relevant[c.index()])),
            &evidence,
        )?;

        let default_order;
        let order = match order {
            Some(order) => order,
            None => {
                default_order = EliminationOrder::reverse_topological(self.diagram);
                &default_order
            }
        };
        for &id in order.ids() {
            if id == target.id() || evidence.is_assigned(id) {
                continue;
            }
            let Some(hidden) = self.diagram.variable(id) else {
                continue;
            };
            if !relevant[id.index()] || hidden.is_decision() {
                continue;
            }
            factors = self.eliminate_var(factors, hidden)?;
        }

        if let Some(leftover) = factors
            .iter()
            .flat_map(|f| f.scope().vars())
            .find(|v| v.id() != target.id())
        {
            return Err(InferenceError::IncompleteOrder {
                remaining: leftover.name().to_string(),
            });
        }

        let mut slots = Slots::new(self.diagram.num_variables());
        let mut weights = Vec::with_capacity(target.card());
        for pos in 0..target.card() {
            slots.set(target.id(), Some(pos));
            let mut w = 1.0;
            for f in &factors {
                w *= f.value(&mut slots)?;
            }
            weights.push(w);
        }
        let probs = clue_math::normalize(&weights).ok_or(InferenceError::ZeroEvidence)?;
        Ok(Marginal {
            variable: var.to_string(),
            distribution: target.domain().iter().cloned().zip(probs).collect(),
        })
    }

    /// Replace the factors mentioning `var` by one lazy factor summing it out.
    pub fn eliminate_var(
        &self,
        factors: Vec<Rc<Factor>>,
        var: &Rc<Variable>,
    ) -> Result<Vec<Rc<Factor>>, InferenceError> {
        let (mentioning, mut rest): (Vec<_>, Vec<_>) =
            factors.into_iter().partition(|f| f.mentions(var.id()));
        if mentioning.is_empty() {
            return Ok(rest);
        }
        let summed = Factor::sum_out(self.diagram.ids().next_id(), Rc::clone(var), mentioning)?;
        trace!(var = var.name(), factor = %summed, "summed out");
        rest.push(Rc::new(summed));
        Ok(rest)
    }

    /// Restrict `factors` to the observed positions in `evidence`.
    ///
    /// Factors that mention no observed variable are shared, not wrapped.
    pub fn project<'f>(
        &self,
        factors: impl IntoIterator<Item = &'f Rc<Factor>>,
        evidence: &Slots,
    ) -> Result<Vec<Rc<Factor>>, InferenceError> {
        factors
            .into_iter()
            .map(|f| {
                if f.scope().ids().any(|id| evidence.is_assigned(id)) {
                    let restricted =
                        Factor::observed(self.diagram.ids().next_id(), Rc::clone(f), evidence)?;
                    Ok(Rc::new(restricted))
                } else {
                    Ok(Rc::clone(f))
                }
            })
            .collect()
    }

    /// Joint probability of the observed chance variables in `evidence`.
    ///
    /// Observed decisions carry no table and do not contribute.
    pub fn evidence_probability(&self, evidence: &Slots) -> Result<f64, InferenceError> {
        let observed: Vec<VarId> = evidence
            .assigned()
            .map(|(id, _)| id)
            .filter(|id| self.diagram.cpt(*id).is_some())
            .collect();
        if observed.is_empty() {
            return Ok(1.0);
        }
        let relevant = self.diagram.ancestors(observed);
        let mut factors = self.project(
            self.diagram
                .probability_factors()
                .filter(|f| f.child().is_some_and(|c| relevant[c.index()])),
            evidence,
        )?;
        for id in self.diagram.chance_order().into_iter().rev() {
            if !relevant[id.index()] || evidence.is_assigned(id) {
                continue;
            }
            if let Some(hidden) = self.diagram.variable(id) {
                factors = self.eliminate_var(factors, hidden)?;
            }
        }
        let mut slots = Slots::new(self.diagram.num_variables());
        let mut p = 1.0;
        for f in &factors {
            p *= f.value(&mut slots)?;
        }
        Ok(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DiagramBuilder;
    use clue_common::assignment;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn sprinkler() -> InfluenceDiagram {
        DiagramBuilder::new()
            .chance("Rain", Value::boolean_domain())
            .chance("Sprinkler", Value::boolean_domain())
            .chance("Wet", Value::boolean_domain())
            .cpt("Rain", &[], vec![0.8, 0.2])
            .cpt("Sprinkler", &["Rain"], vec![0.6, 0.4, 0.99, 0.01])
            .cpt(
                "Wet",
                &["Rain", "Sprinkler"],
                vec![1.0, 0.0, 0.1, 0.9, 0.2, 0.8, 0.01, 0.99],
            )
            .utility(&["Wet"], vec![0.0, 1.0])
            .build()
            .unwrap()
    }

    #[test]
    fn test_prior_marginal() {
        let d = sprinkler();
        let ve = VariableElimination::new(&d);
        let m = ve.query("Rain", &Assignment::new(), None).unwrap();
        assert!(approx_eq(m.probability(&Value::Bool(true)), 0.2));
        assert_eq!(m.mode(), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_posterior_given_child() {
        let d = sprinkler();
        let ve = VariableElimination::new(&d);
        let m = ve
            .query("Rain", &assignment([("Wet", true)]), None)
            .unwrap();
        // P(R, W=T) = 0.2 * (0.99*0.8 + 0.01*0.99) = 0.160380
        // P(~R, W=T) = 0.8 * (0.6*0 + 0.4*0.9) = 0.288
        let expected = 0.16038 / (0.16038 + 0.288);
        assert!(approx_eq(m.probability(&Value::Bool(true)), expected));
        let total: f64 = m.distribution().iter().map(|(_, p)| p).sum();
        assert!(approx_eq(total, 1.0));
    }

    #[test]
    fn test_observed_query_is_indicator() {
        let d = sprinkler();
        let ve = VariableElimination::new(&d);
        let m = ve
            .query("Wet", &assignment([("Wet", false)]), None)
            .unwrap();
        assert_eq!(m.probability(&Value::Bool(false)), 1.0);
        assert_eq!(m.probability(&Value::Bool(true)), 0.0);
    }

    #[test]
    fn test_impossible_evidence() {
        let d = DiagramBuilder::new()
            .chance("A", Value::boolean_domain())
            .chance("B", Value::boolean_domain())
            .cpt("A", &[], vec![1.0, 0.0])
            .cpt("B", &["A"], vec![1.0, 0.0, 0.0, 1.0])
            .utility(&["B"], vec![0.0, 1.0])
            .build()
            .unwrap();
        let ve = VariableElimination::new(&d);
        let obs = assignment([("B", true)]);
        assert_eq!(
            ve.query("A", &obs, None).unwrap_err(),
            InferenceError::ZeroEvidence
        );
        let slots = d.slots_from(&obs).unwrap();
        assert_eq!(ve.evidence_probability(&slots).unwrap(), 0.0);
    }

    #[test]
    fn test_incomplete_order_reported() {
        let d = sprinkler();
        let ve = VariableElimination::new(&d);
        let order = EliminationOrder::from_names(&d, &["Sprinkler"]).unwrap();
        let err = ve
            .query("Wet", &Assignment::new(), Some(&order))
            .unwrap_err();
        assert_eq!(
            err,
            InferenceError::IncompleteOrder {
                remaining: "Rain".into()
            }
        );
    }

    #[test]
    fn test_decision_query_rejected() {
        let d = DiagramBuilder::new()
            .chance("C", Value::boolean_domain())
            .decision("D", Value::boolean_domain(), &["C"])
            .cpt("C", &[], vec![0.5, 0.5])
            .utility(&["C", "D"], vec![1.0, 0.0, 0.0, 1.0])
            .build()
            .unwrap();
        let ve = VariableElimination::new(&d);
        assert_eq!(
            ve.query("D", &Assignment::new(), None).unwrap_err(),
            InferenceError::NotChance("D".into())
        );
    }
}
