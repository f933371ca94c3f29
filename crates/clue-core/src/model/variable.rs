//! Discrete chance and decision variables.

use clue_common::Value;
use std::collections::HashMap;
use std::fmt;

/// Dense identifier of a variable within one influence diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

impl VarId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Chance,
    Decision,
}

/// A named variable with a finite, ordered domain.
///
/// For chance variables `parents` are the conditioning variables of the CPT;
/// for decision variables they are the information set.
#[derive(Debug, Clone)]
pub struct Variable {
    id: VarId,
    name: String,
    kind: VarKind,
    domain: Vec<Value>,
    positions: HashMap<Value, usize>,
    parents: Vec<VarId>,
}

impl Variable {
    pub(crate) fn new(
        id: VarId,
        name: String,
        kind: VarKind,
        domain: Vec<Value>,
        parents: Vec<VarId>,
    ) -> Self {
        let positions = domain
            .iter()
            .enumerate()
            .map(|(i, v)| (v.clone(), i))
            .collect();
        Self {
            id,
            name,
            kind,
            domain,
            positions,
            parents,
        }
    }

    pub fn id(&self) -> VarId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> VarKind {
        self.kind
    }

    pub fn is_decision(&self) -> bool {
        self.kind == VarKind::Decision
    }

    pub fn domain(&self) -> &[Value] {
        &self.domain
    }

    /// Domain size.
    pub fn card(&self) -> usize {
        self.domain.len()
    }

    pub fn parents(&self) -> &[VarId] {
        &self.parents
    }

    /// Position of `value` in the domain.
    pub fn position(&self, value: &Value) -> Option<usize> {
        self.positions.get(value).copied()
    }

    pub fn value_at(&self, position: usize) -> Option<&Value> {
        self.domain.get(position)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Partial assignment of domain positions, indexed by [`VarId`].
///
/// Inference evaluates factor cells against one shared `Slots`, setting and
/// restoring entries as it recurses instead of copying assignments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Slots(Vec<Option<usize>>);

impl Slots {
    pub fn new(len: usize) -> Self {
        Slots(vec![None; len])
    }

    pub fn get(&self, var: VarId) -> Option<usize> {
        self.0.get(var.index()).copied().flatten()
    }

    /// Set (or clear) a slot, returning its previous content.
    pub fn set(&mut self, var: VarId, position: Option<usize>) -> Option<usize> {
        let i = var.index();
        if i >= self.0.len() {
            self.0.resize(i + 1, None);
        }
        std::mem::replace(&mut self.0[i], position)
    }

    pub fn is_assigned(&self, var: VarId) -> bool {
        self.get(var).is_some()
    }

    /// Assigned variables in id order.
    pub fn assigned(&self) -> impl Iterator<Item = (VarId, usize)> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.map(|p| (VarId(i as u32), p)))
    }
}
