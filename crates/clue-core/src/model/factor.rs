//! Dense and lazily evaluated factors.
//!
//! # Indexing
//!
//! A factor over `(X1, ..., Xn)` with domain sizes `(k1, ..., kn)` stores
//! `k1 * ... * kn` cells. The cell for positions `(x1, ..., xn)` is
//!
//! ```text
//! index = x1 * s1 + ... + xn * sn,   sn = 1,   si = s(i+1) * k(i+1)
//! ```
//!
//! so the first variable is most significant and the last least significant.
//!
//! # Lazy factors
//!
//! Elimination never materializes intermediate tables. A sum factor computes
//! a cell only on first lookup and memoizes it; the memo is a map, so an
//! absent key means "not computed" and a computed zero is stored like any
//! other value.

use super::variable::{Slots, VarId, Variable};
use super::ModelError;
use clue_common::{Assignment, Value};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Identifier of a factor, unique within one diagram and its engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactorId(pub u64);

/// Hands out factor ids. Owned by the diagram; inference engines continue
/// its sequence when they create derived factors.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: Cell<u64>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> FactorId {
        let id = self.next.get();
        self.next.set(id + 1);
        FactorId(id)
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.next.get()
    }
}

/// Ordered variable tuple with mixed-radix strides.
#[derive(Debug, Clone)]
pub struct Scope {
    vars: Vec<Rc<Variable>>,
    strides: Vec<usize>,
    size: usize,
}

impl Scope {
    pub fn new(vars: Vec<Rc<Variable>>) -> Result<Self, ModelError> {
        for (i, var) in vars.iter().enumerate() {
            if vars[..i].iter().any(|v| v.id() == var.id()) {
                return Err(ModelError::RepeatedInScope(var.name().to_string()));
            }
        }
        let mut strides = vec![1usize; vars.len()];
        let mut size = 1usize;
        for i in (0..vars.len()).rev() {
            strides[i] = size;
            size = size
                .checked_mul(vars[i].card())
                .ok_or_else(|| ModelError::ScopeTooLarge(names_of(&vars)))?;
        }
        Ok(Self {
            vars,
            strides,
            size,
        })
    }

    pub fn empty() -> Self {
        Self {
            vars: Vec::new(),
            strides: Vec::new(),
            size: 1,
        }
    }

    pub fn vars(&self) -> &[Rc<Variable>] {
        &self.vars
    }

    pub fn ids(&self) -> impl Iterator<Item = VarId> + '_ {
        self.vars.iter().map(|v| v.id())
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Number of cells, the product of the domain sizes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn contains(&self, var: VarId) -> bool {
        self.vars.iter().any(|v| v.id() == var)
    }

    pub fn position_of(&self, var: VarId) -> Option<usize> {
        self.vars.iter().position(|v| v.id() == var)
    }

    pub fn without(&self, var: VarId) -> Result<Scope, ModelError> {
        Scope::new(
            self.vars
                .iter()
                .filter(|v| v.id() != var)
                .cloned()
                .collect(),
        )
    }

    /// Variables of `scopes` in first-seen order, minus `excluded`.
    pub fn union<'a>(
        scopes: impl IntoIterator<Item = &'a Scope>,
        excluded: &[VarId],
    ) -> Result<Scope, ModelError> {
        let mut vars: Vec<Rc<Variable>> = Vec::new();
        for scope in scopes {
            for var in &scope.vars {
                if !excluded.contains(&var.id()) && !vars.iter().any(|v| v.id() == var.id()) {
                    vars.push(Rc::clone(var));
                }
            }
        }
        Scope::new(vars)
    }

    /// Cell index for domain positions listed in scope order.
    pub fn index_of_positions(&self, positions: &[usize]) -> Option<usize> {
        if positions.len() != self.vars.len() {
            return None;
        }
        let mut index = 0;
        for ((pos, stride), var) in positions.iter().zip(&self.strides).zip(&self.vars) {
            if *pos >= var.card() {
                return None;
            }
            index += pos * stride;
        }
        Some(index)
    }

    /// Domain positions, in scope order, of cell `index`.
    pub fn positions_at(&self, index: usize) -> Option<Vec<usize>> {
        if index >= self.size {
            return None;
        }
        Some(
            self.vars
                .iter()
                .zip(&self.strides)
                .map(|(var, stride)| (index / stride) % var.card())
                .collect(),
        )
    }

    /// Cell index of the assignment held in `slots`.
    pub fn index_from_slots(&self, slots: &Slots) -> Result<usize, ModelError> {
        let mut index = 0;
        for (var, stride) in self.vars.iter().zip(&self.strides) {
            let pos = slots
                .get(var.id())
                .ok_or_else(|| ModelError::MissingAssignment(var.name().to_string()))?;
            index += pos * stride;
        }
        Ok(index)
    }

    /// Write the positions of cell `index` into `slots`.
    pub fn fill_slots(&self, index: usize, slots: &mut Slots) -> Result<(), ModelError> {
        let positions = self.positions_at(index).ok_or(ModelError::IndexOutOfRange {
            index,
            size: self.size,
        })?;
        for (var, pos) in self.vars.iter().zip(positions) {
            slots.set(var.id(), Some(pos));
        }
        Ok(())
    }

    /// Map a named assignment to its cell index.
    ///
    /// Extra entries are ignored; a missing scope variable is an error.
    pub fn assignment_to_index(&self, assignment: &Assignment) -> Result<usize, ModelError> {
        let mut index = 0;
        for (var, stride) in self.vars.iter().zip(&self.strides) {
            let value = assignment
                .get(var.name())
                .ok_or_else(|| ModelError::MissingAssignment(var.name().to_string()))?;
            let pos = var.position(value).ok_or_else(|| ModelError::UnknownValue {
                variable: var.name().to_string(),
                value: value.to_string(),
            })?;
            index += pos * stride;
        }
        Ok(index)
    }

    /// Inverse of [`Scope::assignment_to_index`].
    pub fn index_to_assignment(&self, index: usize) -> Result<Assignment, ModelError> {
        let positions = self.positions_at(index).ok_or(ModelError::IndexOutOfRange {
            index,
            size: self.size,
        })?;
        Ok(self
            .vars
            .iter()
            .zip(positions)
            .map(|(var, pos)| (var.name().to_string(), var.domain()[pos].clone()))
            .collect())
    }

    fn max_var_index(&self) -> usize {
        self.vars.iter().map(|v| v.id().index() + 1).max().unwrap_or(0)
    }
}

fn names_of(vars: &[Rc<Variable>]) -> String {
    vars.iter()
        .map(|v| v.name())
        .collect::<Vec<_>>()
        .join(",")
}

/// What a factor represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorRole {
    /// Conditional table of `child` given the other scope variables.
    Probability { child: VarId },
    /// The diagram's utility table.
    Utility,
    /// Produced by elimination; `carries_utility` if the utility table is
    /// one of its inputs.
    Derived { carries_utility: bool },
}

#[derive(Debug)]
enum FactorKind {
    Table(Vec<f64>),
    Observed {
        base: Rc<Factor>,
        evidence: Vec<(VarId, usize)>,
    },
    Sum {
        var: Rc<Variable>,
        parts: Vec<Rc<Factor>>,
        cache: RefCell<HashMap<usize, f64>>,
    },
    Max {
        var: Rc<Variable>,
        base: Rc<Factor>,
        cache: RefCell<HashMap<usize, (f64, usize)>>,
    },
}

/// A function from joint assignments of its scope to reals.
#[derive(Debug)]
pub struct Factor {
    id: FactorId,
    scope: Scope,
    role: FactorRole,
    kind: FactorKind,
}

impl Factor {
    /// Dense table over `scope`. `values.len()` must equal the scope size.
    pub fn table(
        id: FactorId,
        scope: Scope,
        values: Vec<f64>,
        role: FactorRole,
    ) -> Result<Self, ModelError> {
        if values.len() != scope.size() {
            return Err(ModelError::TableSize {
                table: format!("f{}({})", id.0, names_of(scope.vars())),
                expected: scope.size(),
                actual: values.len(),
            });
        }
        Ok(Self {
            id,
            scope,
            role,
            kind: FactorKind::Table(values),
        })
    }

    /// Restriction of `base` to the observed positions in `evidence`.
    ///
    /// The wrapper looks cells up in `base` with the observed variables
    /// substituted; nothing is copied.
    pub fn observed(id: FactorId, base: Rc<Factor>, evidence: &Slots) -> Result<Self, ModelError> {
        let fixed: Vec<(VarId, usize)> = base
            .scope
            .ids()
            .filter_map(|v| evidence.get(v).map(|p| (v, p)))
            .collect();
        let excluded: Vec<VarId> = fixed.iter().map(|(v, _)| *v).collect();
        let scope = Scope::union([&base.scope], &excluded)?;
        Ok(Self {
            id,
            scope,
            role: base.role,
            kind: FactorKind::Observed {
                base,
                evidence: fixed,
            },
        })
    }

    /// Σ over `var` of the product of `parts`.
    pub fn sum_out(
        id: FactorId,
        var: Rc<Variable>,
        parts: Vec<Rc<Factor>>,
    ) -> Result<Self, ModelError> {
        let scope = Scope::union(parts.iter().map(|f| &f.scope), &[var.id()])?;
        let carries_utility = parts.iter().any(|f| f.carries_utility());
        Ok(Self {
            id,
            scope,
            role: FactorRole::Derived { carries_utility },
            kind: FactorKind::Sum {
                var,
                parts,
                cache: RefCell::new(HashMap::new()),
            },
        })
    }

    /// max over `var` of `base`, remembering the maximizing position.
    pub fn max_out(id: FactorId, var: Rc<Variable>, base: Rc<Factor>) -> Result<Self, ModelError> {
        let scope = base.scope.without(var.id())?;
        let carries_utility = base.carries_utility();
        Ok(Self {
            id,
            scope,
            role: FactorRole::Derived { carries_utility },
            kind: FactorKind::Max {
                var,
                base,
                cache: RefCell::new(HashMap::new()),
            },
        })
    }

    pub fn id(&self) -> FactorId {
        self.id
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn role(&self) -> FactorRole {
        self.role
    }

    pub fn mentions(&self, var: VarId) -> bool {
        self.scope.contains(var)
    }

    pub fn carries_utility(&self) -> bool {
        match self.role {
            FactorRole::Utility => true,
            FactorRole::Probability { .. } => false,
            FactorRole::Derived { carries_utility } => carries_utility,
        }
    }

    /// Child variable, if this is (a restriction of) a probability table.
    pub fn child(&self) -> Option<VarId> {
        match self.role {
            FactorRole::Probability { child } => Some(child),
            _ => None,
        }
    }

    pub fn assignment_to_index(&self, assignment: &Assignment) -> Result<usize, ModelError> {
        self.scope.assignment_to_index(assignment)
    }

    pub fn index_to_assignment(&self, index: usize) -> Result<Assignment, ModelError> {
        self.scope.index_to_assignment(index)
    }

    /// Value of the cell selected by `slots`.
    ///
    /// `slots` is restored to its original content before returning.
    pub fn value(&self, slots: &mut Slots) -> Result<f64, ModelError> {
        match &self.kind {
            FactorKind::Table(values) => {
                let index = self.scope.index_from_slots(slots)?;
                Ok(values[index])
            }
            FactorKind::Observed { base, evidence } => {
                let saved: Vec<(VarId, Option<usize>)> = evidence
                    .iter()
                    .map(|&(var, pos)| (var, slots.set(var, Some(pos))))
                    .collect();
                let out = base.value(slots);
                for (var, prev) in saved.into_iter().rev() {
                    slots.set(var, prev);
                }
                out
            }
            FactorKind::Sum { var, parts, cache } => {
                let key = self.scope.index_from_slots(slots)?;
                if let Some(&cached) = cache.borrow().get(&key) {
                    return Ok(cached);
                }
                let prev = slots.get(var.id());
                let mut total = 0.0;
                let mut outcome = Ok(());
                for pos in 0..var.card() {
                    slots.set(var.id(), Some(pos));
                    match product(parts, slots) {
                        Ok(p) => total += p,
                        Err(e) => {
                            outcome = Err(e);
                            break;
                        }
                    }
                }
                slots.set(var.id(), prev);
                outcome?;
                cache.borrow_mut().insert(key, total);
                Ok(total)
            }
            FactorKind::Max { .. } => Ok(self.max_cell(slots)?.0),
        }
    }

    /// Maximizing domain position for a max factor; `None` for other kinds.
    ///
    /// Ties resolve to the first position in domain order.
    pub fn argmax(&self, slots: &mut Slots) -> Result<Option<usize>, ModelError> {
        match self.kind {
            FactorKind::Max { .. } => Ok(Some(self.max_cell(slots)?.1)),
            _ => Ok(None),
        }
    }

    fn max_cell(&self, slots: &mut Slots) -> Result<(f64, usize), ModelError> {
        let FactorKind::Max { var, base, cache } = &self.kind else {
            return Ok((self.value(slots)?, 0));
        };
        let key = self.scope.index_from_slots(slots)?;
        if let Some(&cached) = cache.borrow().get(&key) {
            return Ok(cached);
        }
        let prev = slots.get(var.id());
        let mut best: Option<(f64, usize)> = None;
        let mut outcome = Ok(());
        for pos in 0..var.card() {
            slots.set(var.id(), Some(pos));
            match base.value(slots) {
                Ok(v) => {
                    if best.map_or(true, |(b, _)| v > b) {
                        best = Some((v, pos));
                    }
                }
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }
        slots.set(var.id(), prev);
        outcome?;
        let cell = best.unwrap_or((f64::NEG_INFINITY, 0));
        cache.borrow_mut().insert(key, cell);
        Ok(cell)
    }

    /// Value of the cell selected by a named assignment.
    pub fn value_at(&self, assignment: &Assignment) -> Result<f64, ModelError> {
        let mut slots = self.slots_for(assignment)?;
        self.value(&mut slots)
    }

    /// Every cell in index order. Forces evaluation of lazy factors.
    pub fn materialize(&self) -> Result<Vec<f64>, ModelError> {
        if let FactorKind::Table(values) = &self.kind {
            return Ok(values.clone());
        }
        let mut slots = Slots::new(self.scope.max_var_index());
        (0..self.scope.size())
            .map(|i| {
                self.scope.fill_slots(i, &mut slots)?;
                self.value(&mut slots)
            })
            .collect()
    }

    /// Distribution of the child given a parent assignment.
    pub fn cond_dist(&self, parents: &Assignment) -> Result<Vec<(Value, f64)>, ModelError> {
        let slots = self.slots_for_parents(parents)?;
        let row = self.cpt_row(&slots)?;
        let child = self.child_variable()?;
        Ok(child.domain().iter().cloned().zip(row.iter().copied()).collect())
    }

    /// `P(child = value | parents)`.
    pub fn cond_prob(&self, parents: &Assignment, value: &Value) -> Result<f64, ModelError> {
        let slots = self.slots_for_parents(parents)?;
        let row = self.cpt_row(&slots)?;
        let child = self.child_variable()?;
        let pos = child.position(value).ok_or_else(|| ModelError::UnknownValue {
            variable: child.name().to_string(),
            value: value.to_string(),
        })?;
        Ok(row[pos])
    }

    /// Row of a probability table for the parent positions in `slots`.
    pub(crate) fn cpt_row(&self, slots: &Slots) -> Result<&[f64], ModelError> {
        let FactorKind::Table(values) = &self.kind else {
            return Err(ModelError::NotConditional(self.to_string()));
        };
        let child = self.child_variable()?;
        let mut base = 0;
        for (var, stride) in self.scope.vars.iter().zip(&self.scope.strides) {
            if var.id() == child.id() {
                continue;
            }
            let pos = slots
                .get(var.id())
                .ok_or_else(|| ModelError::MissingAssignment(var.name().to_string()))?;
            base += pos * stride;
        }
        Ok(&values[base..base + child.card()])
    }

    fn child_variable(&self) -> Result<&Rc<Variable>, ModelError> {
        // Probability tables list the child last.
        match (self.role, self.scope.vars.last()) {
            (FactorRole::Probability { child }, Some(last)) if last.id() == child => Ok(last),
            _ => Err(ModelError::NotConditional(self.to_string())),
        }
    }

    fn slots_for(&self, assignment: &Assignment) -> Result<Slots, ModelError> {
        let mut slots = Slots::new(self.scope.max_var_index());
        for var in &self.scope.vars {
            let value = assignment
                .get(var.name())
                .ok_or_else(|| ModelError::MissingAssignment(var.name().to_string()))?;
            let pos = var.position(value).ok_or_else(|| ModelError::UnknownValue {
                variable: var.name().to_string(),
                value: value.to_string(),
            })?;
            slots.set(var.id(), Some(pos));
        }
        Ok(slots)
    }

    fn slots_for_parents(&self, parents: &Assignment) -> Result<Slots, ModelError> {
        let child = self.child_variable()?.id();
        let mut slots = Slots::new(self.scope.max_var_index());
        for var in self.scope.vars.iter().filter(|v| v.id() != child) {
            let value = parents
                .get(var.name())
                .ok_or_else(|| ModelError::MissingAssignment(var.name().to_string()))?;
            let pos = var.position(value).ok_or_else(|| ModelError::UnknownValue {
                variable: var.name().to_string(),
                value: value.to_string(),
            })?;
            slots.set(var.id(), Some(pos));
        }
        Ok(slots)
    }
}

fn product(parts: &[Rc<Factor>], slots: &mut Slots) -> Result<f64, ModelError> {
    let mut acc = 1.0;
    for part in parts {
        acc *= part.value(slots)?;
        if acc == 0.0 {
            break;
        }
    }
    Ok(acc)
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}({})", self.id.0, names_of(self.scope.vars()))
    }
}
