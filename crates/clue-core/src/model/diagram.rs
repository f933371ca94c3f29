//! Influence diagram construction and validation.
//!
//! # Example
//!
//! ```rust
//! use clue_common::Value;
//! use clue_core::model::DiagramBuilder;
//!
//! // Reward +1 when the decision matches the coin, -1 otherwise.
//! let diagram = DiagramBuilder::new()
//!     .chance("C", Value::boolean_domain())
//!     .decision("D", Value::boolean_domain(), &["C"])
//!     .cpt("C", &[], vec![0.5, 0.5])
//!     .utility(&["C", "D"], vec![1.0, -1.0, -1.0, 1.0])
//!     .build()
//!     .unwrap();
//! assert_eq!(diagram.decision_order().len(), 1);
//! ```

use super::factor::{Factor, FactorRole, IdAllocator, Scope};
use super::variable::{Slots, VarId, VarKind, Variable};
use super::ModelError;
use clue_common::{Assignment, Value};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;

/// Tolerance for CPT rows summing to one.
pub const ROW_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone)]
struct PendingVariable {
    name: String,
    kind: VarKind,
    domain: Vec<Value>,
    info: Vec<String>,
}

#[derive(Debug, Clone)]
struct PendingTable {
    child: Option<String>,
    scope: Vec<String>,
    values: Vec<f64>,
}

/// Collects variables and tables; [`DiagramBuilder::build`] validates them.
#[derive(Debug, Clone, Default)]
pub struct DiagramBuilder {
    variables: Vec<PendingVariable>,
    cpts: Vec<PendingTable>,
    utilities: Vec<PendingTable>,
}

impl DiagramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chance(mut self, name: &str, domain: Vec<Value>) -> Self {
        self.variables.push(PendingVariable {
            name: name.to_string(),
            kind: VarKind::Chance,
            domain,
            info: Vec::new(),
        });
        self
    }

    /// Decision variable observing `info` before it is chosen.
    pub fn decision(mut self, name: &str, domain: Vec<Value>, info: &[&str]) -> Self {
        self.variables.push(PendingVariable {
            name: name.to_string(),
            kind: VarKind::Decision,
            domain,
            info: info.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    /// Conditional table of `child` given `parents`.
    ///
    /// Cells are ordered parents first, child last (least significant), so
    /// each consecutive run of `|child|` cells is one conditional distribution.
    pub fn cpt(mut self, child: &str, parents: &[&str], values: Vec<f64>) -> Self {
        let mut scope: Vec<String> = parents.iter().map(|s| s.to_string()).collect();
        scope.push(child.to_string());
        self.cpts.push(PendingTable {
            child: Some(child.to_string()),
            scope,
            values,
        });
        self
    }

    /// The utility table over `scope`.
    pub fn utility(mut self, scope: &[&str], values: Vec<f64>) -> Self {
        self.utilities.push(PendingTable {
            child: None,
            scope: scope.iter().map(|s| s.to_string()).collect(),
            values,
        });
        self
    }

    pub fn build(self) -> Result<InfluenceDiagram, ModelError> {
        let mut by_name: HashMap<String, VarId> = HashMap::new();
        for (i, pending) in self.variables.iter().enumerate() {
            if by_name.contains_key(&pending.name) {
                return Err(ModelError::DuplicateVariable(pending.name.clone()));
            }
            if pending.domain.is_empty() {
                return Err(ModelError::EmptyDomain(pending.name.clone()));
            }
            let mut seen = HashSet::new();
            for value in &pending.domain {
                if !seen.insert(value) {
                    return Err(ModelError::DuplicateValue {
                        variable: pending.name.clone(),
                        value: value.to_string(),
                    });
                }
            }
            by_name.insert(pending.name.clone(), VarId(i as u32));
        }
        let resolve = |name: &str| -> Result<VarId, ModelError> {
            by_name
                .get(name)
                .copied()
                .ok_or_else(|| ModelError::UnknownVariable(name.to_string()))
        };

        // Parents of each variable: CPT parents for chance, info sets for decisions.
        let mut parents: Vec<Option<Vec<VarId>>> = vec![None; self.variables.len()];
        let mut cpt_for: Vec<Option<&PendingTable>> = vec![None; self.variables.len()];
        for table in &self.cpts {
            let child_name = table.child.as_deref().unwrap_or_default();
            let child = resolve(child_name)?;
            if self.variables[child.index()].kind != VarKind::Chance {
                return Err(ModelError::NotChance(child_name.to_string()));
            }
            if cpt_for[child.index()].is_some() {
                return Err(ModelError::DuplicateCpt(child_name.to_string()));
            }
            let mut ids = Vec::with_capacity(table.scope.len() - 1);
            for name in &table.scope[..table.scope.len() - 1] {
                let parent = resolve(name.as_str())?;
                if self.variables[parent.index()].kind == VarKind::Decision {
                    return Err(ModelError::DecisionParentOfChance {
                        decision: name.clone(),
                        child: child_name.to_string(),
                    });
                }
                ids.push(parent);
            }
            parents[child.index()] = Some(ids);
            cpt_for[child.index()] = Some(table);
        }
        for (i, pending) in self.variables.iter().enumerate() {
            match pending.kind {
                VarKind::Chance if cpt_for[i].is_none() => {
                    return Err(ModelError::MissingCpt(pending.name.clone()));
                }
                VarKind::Decision => {
                    let ids = pending
                        .info
                        .iter()
                        .map(|name| resolve(name.as_str()))
                        .collect::<Result<Vec<_>, _>>()?;
                    parents[i] = Some(ids);
                }
                VarKind::Chance => {}
            }
        }

        let variables: Vec<Rc<Variable>> = self
            .variables
            .iter()
            .zip(parents)
            .enumerate()
            .map(|(i, (pending, parents))| {
                Rc::new(Variable::new(
                    VarId(i as u32),
                    pending.name.clone(),
                    pending.kind,
                    pending.domain.clone(),
                    parents.unwrap_or_default(),
                ))
            })
            .collect();

        let topological = topological_sort(&variables)?;

        let utility_table = match self.utilities.as_slice() {
            [] => return Err(ModelError::MissingUtility),
            [table] => table,
            _ => return Err(ModelError::DuplicateUtility),
        };

        let ids = IdAllocator::new();
        let mut cpts: Vec<Option<Rc<Factor>>> = vec![None; variables.len()];
        for (i, table) in cpt_for.iter().enumerate() {
            let Some(table) = table else { continue };
            let scope = scope_of(&variables, &table.scope, &resolve)?;
            let child = &variables[i];
            check_cpt(child, &table.values)?;
            let factor = Factor::table(
                ids.next_id(),
                scope,
                table.values.clone(),
                FactorRole::Probability { child: child.id() },
            )?;
            cpts[i] = Some(Rc::new(factor));
        }

        if let Some(index) = utility_table.values.iter().position(|v| !v.is_finite()) {
            return Err(ModelError::InvalidUtility { index });
        }
        let scope = scope_of(&variables, &utility_table.scope, &resolve)?;
        let utility = Rc::new(Factor::table(
            ids.next_id(),
            scope,
            utility_table.values.clone(),
            FactorRole::Utility,
        )?);

        Ok(InfluenceDiagram {
            variables,
            by_name,
            cpts,
            utility,
            topological,
            ids,
        })
    }
}

fn scope_of(
    variables: &[Rc<Variable>],
    names: &[String],
    resolve: &impl Fn(&str) -> Result<VarId, ModelError>,
) -> Result<Scope, ModelError> {
    let vars = names
        .iter()
        .map(|name| resolve(name.as_str()).map(|id| Rc::clone(&variables[id.index()])))
        .collect::<Result<Vec<_>, _>>()?;
    Scope::new(vars)
}

fn check_cpt(child: &Variable, values: &[f64]) -> Result<(), ModelError> {
    if let Some(index) = values.iter().position(|v| !v.is_finite() || *v < 0.0) {
        return Err(ModelError::InvalidProbability {
            variable: child.name().to_string(),
            index,
        });
    }
    // Size mismatches are reported by Factor::table.
    if values.len() % child.card() != 0 {
        return Ok(());
    }
    for (row, chunk) in values.chunks(child.card()).enumerate() {
        let sum: f64 = chunk.iter().sum();
        if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
            return Err(ModelError::RowSum {
                variable: child.name().to_string(),
                row,
                sum,
            });
        }
    }
    Ok(())
}

/// Kahn's algorithm over parent arcs; ties resolve by declaration order.
fn topological_sort(variables: &[Rc<Variable>]) -> Result<Vec<VarId>, ModelError> {
    let mut remaining: Vec<usize> = variables.iter().map(|v| v.parents().len()).collect();
    let mut children: Vec<Vec<VarId>> = vec![Vec::new(); variables.len()];
    for var in variables {
        for parent in var.parents() {
            children[parent.index()].push(var.id());
        }
    }
    let mut ready: BTreeSet<VarId> = variables
        .iter()
        .filter(|v| v.parents().is_empty())
        .map(|v| v.id())
        .collect();
    let mut order = Vec::with_capacity(variables.len());
    while let Some(next) = ready.pop_first() {
        order.push(next);
        for child in &children[next.index()] {
            remaining[child.index()] -= 1;
            if remaining[child.index()] == 0 {
                ready.insert(*child);
            }
        }
    }
    if order.len() < variables.len() {
        let stuck = remaining
            .iter()
            .position(|r| *r > 0)
            .map(|i| variables[i].name().to_string())
            .unwrap_or_default();
        return Err(ModelError::Cycle(stuck));
    }
    Ok(order)
}

/// A validated influence diagram: chance variables with CPTs, decision
/// variables with information sets, and one utility table.
#[derive(Debug)]
pub struct InfluenceDiagram {
    variables: Vec<Rc<Variable>>,
    by_name: HashMap<String, VarId>,
    cpts: Vec<Option<Rc<Factor>>>,
    utility: Rc<Factor>,
    topological: Vec<VarId>,
    ids: IdAllocator,
}

impl InfluenceDiagram {
    pub fn builder() -> DiagramBuilder {
        DiagramBuilder::new()
    }

    pub fn variables(&self) -> &[Rc<Variable>] {
        &self.variables
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn variable(&self, id: VarId) -> Option<&Rc<Variable>> {
        self.variables.get(id.index())
    }

    pub fn lookup(&self, name: &str) -> Result<&Rc<Variable>, ModelError> {
        self.by_name
            .get(name)
            .map(|id| &self.variables[id.index()])
            .ok_or_else(|| ModelError::UnknownVariable(name.to_string()))
    }

    /// All variables, parents before children.
    pub fn topological_order(&self) -> &[VarId] {
        &self.topological
    }

    /// Chance variables in topological order.
    pub fn chance_order(&self) -> Vec<VarId> {
        self.filter_topological(VarKind::Chance)
    }

    /// Decision variables in temporal (topological) order.
    pub fn decision_order(&self) -> Vec<VarId> {
        self.filter_topological(VarKind::Decision)
    }

    fn filter_topological(&self, kind: VarKind) -> Vec<VarId> {
        self.topological
            .iter()
            .copied()
            .filter(|id| self.variables[id.index()].kind() == kind)
            .collect()
    }

    /// Conditional probability table of a chance variable.
    pub fn cpt(&self, id: VarId) -> Option<&Rc<Factor>> {
        self.cpts.get(id.index()).and_then(|f| f.as_ref())
    }

    pub fn cpt_of(&self, name: &str) -> Result<&Rc<Factor>, ModelError> {
        let var = self.lookup(name)?;
        self.cpt(var.id())
            .ok_or_else(|| ModelError::NotChance(name.to_string()))
    }

    pub fn probability_factors(&self) -> impl Iterator<Item = &Rc<Factor>> + '_ {
        self.cpts.iter().flatten()
    }

    pub fn utility(&self) -> &Rc<Factor> {
        &self.utility
    }

    /// Factor id allocator; engines draw ids for derived factors from it.
    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    /// Domain positions of a named assignment.
    pub fn slots_from(&self, assignment: &Assignment) -> Result<Slots, ModelError> {
        let mut slots = Slots::new(self.variables.len());
        for (name, value) in assignment {
            let var = self.lookup(name)?;
            let pos = var.position(value).ok_or_else(|| ModelError::UnknownValue {
                variable: name.clone(),
                value: value.to_string(),
            })?;
            slots.set(var.id(), Some(pos));
        }
        Ok(slots)
    }

    /// Named assignment of `vars` read from `slots`.
    pub fn assignment_from(&self, slots: &Slots, vars: &[VarId]) -> Result<Assignment, ModelError> {
        vars.iter()
            .map(|&id| {
                let var = &self.variables[id.index()];
                let value = slots
                    .get(id)
                    .and_then(|p| var.value_at(p))
                    .ok_or_else(|| ModelError::MissingAssignment(var.name().to_string()))?;
                Ok((var.name().to_string(), value.clone()))
            })
            .collect()
    }

    /// `targets` and everything upstream of them through parent arcs.
    pub fn ancestors(&self, targets: impl IntoIterator<Item = VarId>) -> Vec<bool> {
        let mut marked = vec![false; self.variables.len()];
        let mut stack: Vec<VarId> = targets.into_iter().collect();
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut marked[id.index()], true) {
                continue;
            }
            stack.extend(self.variables[id.index()].parents().iter().copied());
        }
        marked
    }

    /// Chance variables whose tables can affect the utility or the evidence.
    ///
    /// The remaining chance variables are barren: summing them out yields 1.
    pub fn requisite_chance(&self, observed: &Slots) -> Vec<bool> {
        let targets: Vec<VarId> = self
            .utility
            .scope()
            .ids()
            .chain(observed.assigned().map(|(id, _)| id))
            .collect();
        let mut marked = self.ancestors(targets);
        for var in &self.variables {
            if var.is_decision() {
                marked[var.id().index()] = false;
            }
        }
        marked
    }
}
