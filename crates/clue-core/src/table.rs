//! Dense tables keyed by named assignments.
//!
//! A [`TableLayout`] fixes an ordered list of `(name, domain)` pairs and maps
//! joint assignments to `[0, size)` with the same mixed-radix convention as
//! factors: the first name is most significant. Unlike factors, layouts key
//! on names only, so they can describe state spaces, action spaces, and their
//! products without reference to a diagram.
//!
//! [`StateTable`] stores one cell per index. Every cell is constructed
//! independently; a mutable default is cloned or produced by a factory per
//! cell, never shared.

use crate::model::Variable;
use clue_common::{Assignment, Value};
use std::rc::Rc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("duplicate table variable: {0}")]
    DuplicateName(String),

    #[error("table variable {0} has an empty domain")]
    EmptyDomain(String),

    #[error("assignment is missing table variable {0}")]
    MissingVariable(String),

    #[error("value {value} is not in the domain of table variable {variable}")]
    UnknownValue { variable: String, value: String },

    #[error("index {index} is out of range for table of size {size}")]
    IndexOutOfRange { index: usize, size: usize },

    #[error("table over {0} exceeds the addressable size")]
    TooLarge(String),
}

/// Ordered named domains with mixed-radix strides.
#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    names: Vec<String>,
    domains: Vec<Vec<Value>>,
    strides: Vec<usize>,
    size: usize,
}

impl TableLayout {
    pub fn new<I, N>(vars: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = (N, Vec<Value>)>,
        N: Into<String>,
    {
        let (names, domains): (Vec<String>, Vec<Vec<Value>>) =
            vars.into_iter().map(|(n, d)| (n.into(), d)).unzip();
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(TableError::DuplicateName(name.clone()));
            }
            if domains[i].is_empty() {
                return Err(TableError::EmptyDomain(name.clone()));
            }
        }
        let mut strides = vec![1usize; names.len()];
        let mut size = 1usize;
        for i in (0..names.len()).rev() {
            strides[i] = size;
            size = size
                .checked_mul(domains[i].len())
                .ok_or_else(|| TableError::TooLarge(names.join(",")))?;
        }
        Ok(Self {
            names,
            domains,
            strides,
            size,
        })
    }

    /// Layout over diagram variables, in the given order.
    pub fn from_variables(vars: &[Rc<Variable>]) -> Result<Self, TableError> {
        Self::new(
            vars.iter()
                .map(|v| (v.name().to_string(), v.domain().to_vec())),
        )
    }

    /// Layout with no variables: a single cell keyed by the empty assignment.
    pub fn unit() -> Self {
        Self {
            names: Vec::new(),
            domains: Vec::new(),
            strides: Vec::new(),
            size: 1,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn domains(&self) -> &[Vec<Value>] {
        &self.domains
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Number of cells, the product of the domain sizes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Index of the cell selected by `assignment`.
    ///
    /// Entries for names outside the layout are ignored.
    pub fn index_of(&self, assignment: &Assignment) -> Result<usize, TableError> {
        let mut index = 0;
        for ((name, domain), stride) in self.names.iter().zip(&self.domains).zip(&self.strides) {
            let value = assignment
                .get(name)
                .ok_or_else(|| TableError::MissingVariable(name.clone()))?;
            let pos = domain
                .iter()
                .position(|v| v == value)
                .ok_or_else(|| TableError::UnknownValue {
                    variable: name.clone(),
                    value: value.to_string(),
                })?;
            index += pos * stride;
        }
        Ok(index)
    }

    /// Inverse of [`TableLayout::index_of`].
    pub fn assignment_at(&self, index: usize) -> Result<Assignment, TableError> {
        if index >= self.size {
            return Err(TableError::IndexOutOfRange {
                index,
                size: self.size,
            });
        }
        Ok(self
            .names
            .iter()
            .zip(&self.domains)
            .zip(&self.strides)
            .map(|((name, domain), stride)| {
                (name.clone(), domain[(index / stride) % domain.len()].clone())
            })
            .collect())
    }

    /// Concatenation of two layouts; `self` stays most significant.
    pub fn join(&self, other: &TableLayout) -> Result<TableLayout, TableError> {
        TableLayout::new(
            self.names
                .iter()
                .chain(&other.names)
                .cloned()
                .zip(self.domains.iter().chain(&other.domains).cloned()),
        )
    }

    /// The part of `assignment` covered by this layout.
    pub fn restrict(&self, assignment: &Assignment) -> Assignment {
        assignment
            .iter()
            .filter(|(name, _)| self.contains(name))
            .map(|(n, v)| (n.clone(), v.clone()))
            .collect()
    }

    /// Every assignment in index order.
    pub fn iter(&self) -> impl Iterator<Item = Assignment> + '_ {
        (0..self.size).filter_map(move |i| self.assignment_at(i).ok())
    }
}

/// One value per joint assignment of a [`TableLayout`].
#[derive(Debug, Clone, PartialEq)]
pub struct StateTable<T> {
    layout: TableLayout,
    cells: Vec<T>,
}

impl<T: Clone> StateTable<T> {
    /// Table with every cell a clone of `default`.
    pub fn new(layout: TableLayout, default: T) -> Self {
        let cells = vec![default; layout.size()];
        Self { layout, cells }
    }

    /// Overwrite every cell with a clone of `value`.
    pub fn fill(&mut self, value: T) {
        self.cells.iter_mut().for_each(|c| *c = value.clone());
    }
}

impl<T> StateTable<T> {
    /// Table whose cells are produced one by one by `factory`.
    pub fn with_factory(layout: TableLayout, mut factory: impl FnMut() -> T) -> Self {
        let cells = (0..layout.size()).map(|_| factory()).collect();
        Self { layout, cells }
    }

    pub fn layout(&self) -> &TableLayout {
        &self.layout
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn get(&self, key: &Assignment) -> Result<&T, TableError> {
        let index = self.layout.index_of(key)?;
        Ok(&self.cells[index])
    }

    pub fn get_mut(&mut self, key: &Assignment) -> Result<&mut T, TableError> {
        let index = self.layout.index_of(key)?;
        Ok(&mut self.cells[index])
    }

    /// Store `value`, returning the previous content of the cell.
    pub fn set(&mut self, key: &Assignment, value: T) -> Result<T, TableError> {
        let index = self.layout.index_of(key)?;
        Ok(std::mem::replace(&mut self.cells[index], value))
    }

    pub fn at(&self, index: usize) -> Option<&T> {
        self.cells.get(index)
    }

    pub fn at_mut(&mut self, index: usize) -> Option<&mut T> {
        self.cells.get_mut(index)
    }

    pub fn values(&self) -> &[T] {
        &self.cells
    }

    /// `(assignment, cell)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (Assignment, &T)> + '_ {
        self.layout.iter().zip(self.cells.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clue_common::assignment;

    fn weather() -> TableLayout {
        TableLayout::new([
            ("Sky", vec![Value::from("sun"), Value::from("cloud"), Value::from("rain")]),
            ("Wind", Value::boolean_domain()),
        ])
        .unwrap()
    }

    #[test]
    fn test_size_and_index_order() {
        let layout = weather();
        assert_eq!(layout.size(), 6);
        let key = assignment([("Sky", Value::from("rain")), ("Wind", Value::Bool(false))]);
        assert_eq!(layout.index_of(&key).unwrap(), 4);
        assert_eq!(layout.assignment_at(4).unwrap(), key);
    }

    #[test]
    fn test_extra_keys_ignored_missing_rejected() {
        let layout = weather();
        let key = assignment([
            ("Sky", Value::from("sun")),
            ("Wind", Value::Bool(true)),
            ("Other", Value::Int(7)),
        ]);
        assert_eq!(layout.index_of(&key).unwrap(), 1);
        let partial = assignment([("Sky", Value::from("sun"))]);
        assert_eq!(
            layout.index_of(&partial).unwrap_err(),
            TableError::MissingVariable("Wind".into())
        );
    }

    #[test]
    fn test_unknown_value_and_range() {
        let layout = weather();
        let key = assignment([("Sky", Value::from("fog")), ("Wind", Value::Bool(true))]);
        assert!(matches!(
            layout.index_of(&key),
            Err(TableError::UnknownValue { .. })
        ));
        assert!(layout.assignment_at(6).is_err());
    }

    #[test]
    fn test_duplicate_and_empty_rejected() {
        assert_eq!(
            TableLayout::new([("A", Value::boolean_domain()), ("A", Value::boolean_domain())])
                .unwrap_err(),
            TableError::DuplicateName("A".into())
        );
        assert_eq!(
            TableLayout::new([("A", Vec::new())]).unwrap_err(),
            TableError::EmptyDomain("A".into())
        );
    }

    #[test]
    fn test_join_keeps_left_most_significant() {
        let state = TableLayout::new([("C", Value::boolean_domain())]).unwrap();
        let action = TableLayout::new([("D", Value::boolean_domain())]).unwrap();
        let joint = state.join(&action).unwrap();
        assert_eq!(joint.names(), &["C".to_string(), "D".to_string()]);
        let key = assignment([("C", true), ("D", false)]);
        assert_eq!(joint.index_of(&key).unwrap(), 2);
        assert!(state.join(&state).is_err());
    }

    #[test]
    fn test_cells_are_independent() {
        let mut table: StateTable<Vec<u32>> = StateTable::new(weather(), Vec::new());
        let key = assignment([("Sky", Value::from("sun")), ("Wind", Value::Bool(false))]);
        table.get_mut(&key).unwrap().push(3);
        assert_eq!(table.get(&key).unwrap(), &vec![3]);
        assert_eq!(table.values().iter().filter(|c| c.is_empty()).count(), 5);

        let mut counter = 0;
        let numbered = StateTable::with_factory(weather(), || {
            counter += 1;
            counter
        });
        assert_eq!(numbered.values(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_set_returns_previous() {
        let mut table = StateTable::new(weather(), 0.0);
        let key = assignment([("Sky", Value::from("cloud")), ("Wind", Value::Bool(true))]);
        assert_eq!(table.set(&key, 2.5).unwrap(), 0.0);
        assert_eq!(table.set(&key, 4.0).unwrap(), 2.5);
        assert_eq!(table.at(3), Some(&4.0));
        table.fill(1.0);
        assert!(table.values().iter().all(|v| *v == 1.0));
    }

    #[test]
    fn test_unit_layout_single_cell() {
        let unit = TableLayout::unit();
        assert_eq!(unit.size(), 1);
        assert_eq!(unit.index_of(&Assignment::new()).unwrap(), 0);
        assert_eq!(unit.iter().count(), 1);
    }
}
