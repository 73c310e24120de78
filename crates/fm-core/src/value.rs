//! Context payload values.
//!
//! Core modules deposit derived data into the evaluation context as named
//! [`Value`] entries; likelihood modules read them back, and diagnostic blobs
//! are written in the same currency. Keeping the payload a closed enum (rather
//! than type-erased boxes) is what makes mapping-equality — and with it the
//! determinism contract of the build path — directly testable.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named data map used for context entries and blob storage.
///
/// A `BTreeMap` so iteration (and debug output) is deterministic.
pub type DataMap = BTreeMap<String, Value>;

/// A single derived-data entry.
///
/// Serialized untagged, so JSON documents read naturally: `3.0`, `[...]` or
/// `[[...]]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Scalar quantity.
    Scalar(f64),
    /// 1-D array, e.g. a binned power spectrum.
    Vector(Vec<f64>),
    /// 2-D array, outer index first, e.g. a (frequency, k) grid.
    Matrix(Vec<Vec<f64>>),
}

impl Value {
    /// Scalar payload, if this is a [`Value::Scalar`].
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(x) => Some(*x),
            _ => None,
        }
    }

    /// Borrow the 1-D payload, if this is a [`Value::Vector`].
    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            Value::Vector(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow the 2-D payload, if this is a [`Value::Matrix`].
    pub fn as_matrix(&self) -> Option<&[Vec<f64>]> {
        match self {
            Value::Matrix(m) => Some(m),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Scalar(x)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Vector(v)
    }
}

impl From<&[f64]> for Value {
    fn from(v: &[f64]) -> Self {
        Value::Vector(v.to_vec())
    }
}

impl From<Vec<Vec<f64>>> for Value {
    fn from(m: Vec<Vec<f64>>) -> Self {
        Value::Matrix(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let s = Value::from(2.5);
        assert_eq!(s.as_scalar(), Some(2.5));
        assert!(s.as_vector().is_none());

        let v = Value::from(vec![1.0, 2.0]);
        assert_eq!(v.as_vector(), Some(&[1.0, 2.0][..]));
        assert!(v.as_scalar().is_none());

        let m = Value::from(vec![vec![1.0], vec![2.0]]);
        assert_eq!(m.as_matrix().map(|m| m.len()), Some(2));
    }

    #[test]
    fn test_untagged_json() {
        let v: Value = serde_json::from_str("[1.0, 2.0, 3.0]").unwrap();
        assert_eq!(v, Value::Vector(vec![1.0, 2.0, 3.0]));

        let s: Value = serde_json::from_str("4.25").unwrap();
        assert_eq!(s, Value::Scalar(4.25));
    }

    #[test]
    fn test_map_equality_is_order_insensitive() {
        let mut a = DataMap::new();
        a.insert("x".into(), Value::Scalar(1.0));
        a.insert("y".into(), Value::Vector(vec![2.0]));

        let mut b = DataMap::new();
        b.insert("y".into(), Value::Vector(vec![2.0]));
        b.insert("x".into(), Value::Scalar(1.0));

        assert_eq!(a, b);
    }
}
