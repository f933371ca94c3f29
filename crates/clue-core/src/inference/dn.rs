//! Decision-network solving by interleaved sum and max elimination.
//!
//! Chance variables are summed out and decisions maxed out in the given
//! order. Maxing out a decision is legal only when exactly one factor
//! mentions it and that factor depends on nothing outside the decision's
//! information set; the resulting max factor is the decision rule. A
//! decision no factor mentions cannot affect the utility and gets a
//! constant rule choosing its first value.
//!
//! Construction is lazy: solving builds the factor graph, checks legality,
//! and evaluates only the final scalar. Rules compute cells on demand.

use super::{EliminationOrder, InferenceError, VariableElimination};
use crate::model::{Factor, InfluenceDiagram, ModelError, Slots, VarId, Variable};
use clue_common::{Assignment, Value};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, trace};

/// Optimal policy for one decision as a function of its inputs.
#[derive(Debug, Clone)]
pub struct DecisionRule {
    decision: Rc<Variable>,
    factor: Option<Rc<Factor>>,
}

impl DecisionRule {
    fn constant(decision: Rc<Variable>) -> Self {
        Self {
            decision,
            factor: None,
        }
    }

    pub fn decision(&self) -> &Rc<Variable> {
        &self.decision
    }

    /// Variables the rule reads. Empty for a constant rule.
    pub fn inputs(&self) -> &[Rc<Variable>] {
        match &self.factor {
            Some(f) => f.scope().vars(),
            None => &[],
        }
    }

    /// Max factor backing the rule; `None` for a constant rule.
    pub fn factor(&self) -> Option<&Rc<Factor>> {
        self.factor.as_ref()
    }

    /// Domain position of the optimal choice for the inputs in `slots`.
    pub fn choose(&self, slots: &mut Slots) -> Result<usize, InferenceError> {
        match &self.factor {
            Some(f) => Ok(f.argmax(slots)?.unwrap_or(0)),
            None => Ok(0),
        }
    }

    /// Optimal value given named inputs. Extra entries are ignored.
    pub fn choose_for(&self, inputs: &Assignment) -> Result<Value, InferenceError> {
        let mut slots = Slots::default();
        for var in self.inputs() {
            let value = inputs
                .get(var.name())
                .ok_or_else(|| ModelError::MissingAssignment(var.name().to_string()))?;
            let pos = var.position(value).ok_or_else(|| ModelError::UnknownValue {
                variable: var.name().to_string(),
                value: value.to_string(),
            })?;
            slots.set(var.id(), Some(pos));
        }
        let pos = self.choose(&mut slots)?;
        Ok(self.decision.domain()[pos].clone())
    }

    /// The full rule as `(inputs, choice)` rows in index order.
    pub fn materialize(&self) -> Result<Vec<(Assignment, Value)>, InferenceError> {
        let Some(factor) = &self.factor else {
            return Ok(vec![(Assignment::new(), self.decision.domain()[0].clone())]);
        };
        let scope = factor.scope();
        let mut slots = Slots::default();
        let mut rows = Vec::with_capacity(scope.size());
        for index in 0..scope.size() {
            scope.fill_slots(index, &mut slots)?;
            let pos = self.choose(&mut slots)?;
            rows.push((
                scope.index_to_assignment(index)?,
                self.decision.domain()[pos].clone(),
            ));
        }
        Ok(rows)
    }
}

/// Result of solving a decision network.
#[derive(Debug, Clone)]
pub struct Solution {
    expected_utility: f64,
    rules: Vec<DecisionRule>,
}

impl Solution {
    /// Maximum expected utility given the observations.
    pub fn expected_utility(&self) -> f64 {
        self.expected_utility
    }

    /// Rules for the unobserved decisions, in temporal order.
    pub fn rules(&self) -> &[DecisionRule] {
        &self.rules
    }

    pub fn rule(&self, decision: &str) -> Option<&DecisionRule> {
        self.rules.iter().find(|r| r.decision.name() == decision)
    }

    /// Choose every decision in temporal order.
    ///
    /// `slots` must hold the observed inputs of the first decision; each
    /// choice is written back so later rules can read it.
    pub fn act(&self, slots: &mut Slots) -> Result<Vec<(VarId, usize)>, InferenceError> {
        let mut chosen = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            let pos = rule.choose(slots)?;
            slots.set(rule.decision.id(), Some(pos));
            chosen.push((rule.decision.id(), pos));
        }
        Ok(chosen)
    }
}

/// Decision-network solver bound to one diagram.
#[derive(Debug, Clone, Copy)]
pub struct DecisionNetwork<'a> {
    diagram: &'a InfluenceDiagram,
}

impl<'a> DecisionNetwork<'a> {
    pub fn new(diagram: &'a InfluenceDiagram) -> Self {
        Self { diagram }
    }

    pub fn diagram(&self) -> &'a InfluenceDiagram {
        self.diagram
    }

    /// Solve with the order from [`EliminationOrder::for_evidence`].
    pub fn solve(&self, observations: &Assignment) -> Result<Solution, InferenceError> {
        let evidence = self.diagram.slots_from(observations)?;
        let order = EliminationOrder::for_evidence(self.diagram, &evidence);
        self.optimize(&order, observations)
    }

    /// Maximum expected utility and decision rules given `observations`.
    ///
    /// Every unobserved decision and every requisite unobserved chance
    /// variable must appear in `order` exactly once. Observed and barren
    /// variables in the order are skipped.
    pub fn optimize(
        &self,
        order: &EliminationOrder,
        observations: &Assignment,
    ) -> Result<Solution, InferenceError> {
        let diagram = self.diagram;
        let evidence = diagram.slots_from(observations)?;
        let requisite = diagram.requisite_chance(&evidence);
        self.check_order(order, &evidence, &requisite)?;

        let ve = VariableElimination::new(diagram);
        let mut factors = ve.project(
            diagram
                .probability_factors()
                .filter(|f| f.child().is_some_and(|c| requisite[c.index()]))
                .chain(std::iter::once(diagram.utility())),
            &evidence,
        )?;

        let mut rules: HashMap<VarId, DecisionRule> = HashMap::new();
        for &id in order.ids() {
            let Some(var) = diagram.variable(id) else {
                continue;
            };
            if evidence.is_assigned(id) {
                continue;
            }
            if !var.is_decision() {
                if requisite[id.index()] {
                    factors = ve.eliminate_var(factors, var)?;
                }
                continue;
            }

            let (mentioning, mut rest): (Vec<_>, Vec<_>) =
                factors.into_iter().partition(|f| f.mentions(id));
            let mut mentioning = mentioning.into_iter();
            let (base, extra) = (mentioning.next(), mentioning.next());
            match (base, extra) {
                (None, _) => {
                    rules.insert(id, DecisionRule::constant(Rc::clone(var)));
                }
                (Some(base), None) => {
                    if let Some(outside) = base
                        .scope()
                        .vars()
                        .iter()
                        .find(|v| v.id() != id && !var.parents().contains(&v.id()))
                    {
                        return Err(InferenceError::IllegalOrder {
                            at: var.name().to_string(),
                            reason: format!(
                                "{} depends on {}, which is outside the information set",
                                base,
                                outside.name()
                            ),
                        });
                    }
                    let max = Rc::new(Factor::max_out(
                        diagram.ids().next_id(),
                        Rc::clone(var),
                        base,
                    )?);
                    trace!(decision = var.name(), factor = %max, "maxed out");
                    rules.insert(
                        id,
                        DecisionRule {
                            decision: Rc::clone(var),
                            factor: Some(Rc::clone(&max)),
                        },
                    );
                    rest.push(max);
                }
                (Some(_), Some(_)) => {
                    return Err(InferenceError::IllegalOrder {
                        at: var.name().to_string(),
                        reason: format!("{} factors mention it", 2 + mentioning.len()),
                    });
                }
            }
            factors = rest;
        }

        if let Some(open) = factors.iter().find(|f| !f.scope().is_empty()) {
            return Err(InferenceError::IllegalOrder {
                at: "end of order".to_string(),
                reason: format!("{} still has free variables", open),
            });
        }
        let carrying = factors.iter().filter(|f| f.carries_utility()).count();
        if carrying != 1 {
            return Err(InferenceError::IllegalOrder {
                at: "end of order".to_string(),
                reason: format!("{} residual factors carry utility, expected 1", carrying),
            });
        }

        let mut slots = Slots::new(diagram.num_variables());
        let mut joint = 1.0;
        for f in &factors {
            joint *= f.value(&mut slots)?;
        }
        let expected_utility = if evidence.assigned().next().is_some() {
            let p = ve.evidence_probability(&evidence)?;
            if p <= 0.0 || !p.is_finite() {
                return Err(InferenceError::ZeroEvidence);
            }
            joint / p
        } else {
            joint
        };
        debug!(
            expected_utility,
            residuals = factors.len(),
            derived = diagram.ids().issued(),
            "decision network solved"
        );

        let rules = diagram
            .decision_order()
            .into_iter()
            .filter_map(|id| rules.remove(&id))
            .collect();
        Ok(Solution {
            expected_utility,
            rules,
        })
    }

    fn check_order(
        &self,
        order: &EliminationOrder,
        evidence: &Slots,
        requisite: &[bool],
    ) -> Result<(), InferenceError> {
        let diagram = self.diagram;
        let mut position: Vec<Option<usize>> = vec![None; diagram.num_variables()];
        for (at, &id) in order.ids().iter().enumerate() {
            let var = diagram
                .variable(id)
                .ok_or_else(|| InferenceError::IllegalOrder {
                    at: id.to_string(),
                    reason: "unknown variable".to_string(),
                })?;
            if position[id.index()].replace(at).is_some() {
                return Err(InferenceError::IllegalOrder {
                    at: var.name().to_string(),
                    reason: "listed more than once".to_string(),
                });
            }
        }
        for var in diagram.variables() {
            let id = var.id();
            let needed =
                !evidence.is_assigned(id) && (var.is_decision() || requisite[id.index()]);
            if needed && position[id.index()].is_none() {
                return Err(InferenceError::IllegalOrder {
                    at: var.name().to_string(),
                    reason: "missing from the elimination order".to_string(),
                });
            }
        }
        // Whatever a decision observes must still be present when it is maxed out.
        for var in diagram.variables().iter().filter(|v| v.is_decision()) {
            let Some(at) = position[var.id().index()] else {
                continue;
            };
            for &parent in var.parents() {
                let relevant = diagram
                    .variable(parent)
                    .is_some_and(|p| p.is_decision() || requisite[parent.index()]);
                if !relevant || evidence.is_assigned(parent) {
                    continue;
                }
                if position[parent.index()].is_some_and(|p| p < at) {
                    let name = diagram.variable(parent).map_or("", |p| p.name());
                    return Err(InferenceError::IllegalOrder {
                        at: var.name().to_string(),
                        reason: format!("observed variable {} is eliminated first", name),
                    });
                }
            }
        }
        Ok(())
    }
}
