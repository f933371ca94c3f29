//! Domain values and named assignments.
//!
//! Variables in a decision problem range over small, ordered, finite domains.
//! Environments, experts, and agents exchange states and actions as
//! [`Assignment`]s: name → value maps with deterministic iteration order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single value in a variable's domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl Value {
    /// Boolean domain `[false, true]`, the most common domain in SSDPs.
    pub fn boolean_domain() -> Vec<Value> {
        vec![Value::Bool(false), Value::Bool(true)]
    }

    /// Returns the boolean payload, if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// Joint assignment of values to named variables.
pub type Assignment = BTreeMap<String, Value>;

/// Build an assignment from `(name, value)` pairs.
pub fn assignment<N, V, I>(pairs: I) -> Assignment
where
    N: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (N, V)>,
{
    pairs
        .into_iter()
        .map(|(name, value)| (name.into(), value.into()))
        .collect()
}

/// Union of two assignments; entries of `overlay` win on conflict.
pub fn merged(base: &Assignment, overlay: &Assignment) -> Assignment {
    let mut out = base.clone();
    for (name, value) in overlay {
        out.insert(name.clone(), value.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_untagged_serde() {
        let values = vec![Value::Bool(true), Value::Int(3), Value::from("low")];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[true,3,"low"]"#);
        let back: Vec<Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn test_assignment_builder_and_merge() {
        let state = assignment([("C", true)]);
        let action = assignment([("D", false)]);
        let joint = merged(&state, &action);
        assert_eq!(joint.len(), 2);
        assert_eq!(joint["C"], Value::Bool(true));
        assert_eq!(joint["D"], Value::Bool(false));
    }

    #[test]
    fn test_boolean_domain_order() {
        let domain = Value::boolean_domain();
        assert_eq!(domain[0].as_bool(), Some(false));
        assert_eq!(domain[1].as_bool(), Some(true));
    }
}
