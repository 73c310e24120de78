//! Named parameter vectors with bounds.
//!
//! A [`Params`] is the ordered, name-addressable set of scalars a chain is
//! sampled over. The chain declares one as its schema; each proposal from the
//! sampler is a flat vector that gets rebound onto the schema with
//! [`Params::with_values`]. Immutable once constructed — a fresh binding is
//! made per evaluation and discarded afterwards.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One named scalar parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    /// Stable parameter name.
    pub name: String,
    /// Current value: the proposal, or the initial guess for a fresh schema.
    pub value: f64,
    /// Bounds `(low, high)`.
    pub bounds: (f64, f64),
}

impl Param {
    /// Create a parameter, checking the name is non-empty and bounds are ordered.
    pub fn new(name: impl Into<String>, value: f64, bounds: (f64, f64)) -> Result<Self> {
        let param = Self { name: name.into(), value, bounds };
        param.validate()?;
        Ok(param)
    }

    /// Check the name is non-empty and the bounds are ordered. Fields are
    /// public, so externally assembled or deserialized entries go through
    /// this before joining a [`Params`].
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::Validation("parameter name must not be empty".into()));
        }
        if !(self.bounds.0 <= self.bounds.1) {
            return Err(Error::Validation(format!(
                "parameter `{}` has unordered bounds ({}, {})",
                self.name, self.bounds.0, self.bounds.1
            )));
        }
        Ok(())
    }

    /// True if `value` lies inside the closed bounds interval.
    ///
    /// The sampler, not this crate, is responsible for keeping proposals in
    /// bounds; this is a convenience for callers that want to pre-filter.
    pub fn in_bounds(&self) -> bool {
        self.value >= self.bounds.0 && self.value <= self.bounds.1
    }
}

/// Ordered, name-unique parameter vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params {
    entries: Vec<Param>,
}

impl Params {
    /// Build a vector from entries, validating each and rejecting duplicate
    /// names.
    pub fn new(entries: Vec<Param>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for p in &entries {
            p.validate()?;
            if !seen.insert(p.name.as_str()) {
                return Err(Error::Validation(format!("duplicate parameter name `{}`", p.name)));
            }
        }
        Ok(Self { entries })
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no parameters are declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.entries.iter()
    }

    /// Parameter names (stable order).
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|p| p.name.as_str()).collect()
    }

    /// Parameter values (stable order).
    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|p| p.value).collect()
    }

    /// Parameter bounds (stable order).
    pub fn bounds(&self) -> Vec<(f64, f64)> {
        self.entries.iter().map(|p| p.bounds).collect()
    }

    /// Value of the named parameter, if declared.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.param(name).map(|p| p.value)
    }

    /// The named parameter entry, if declared.
    pub fn param(&self, name: &str) -> Option<&Param> {
        self.entries.iter().find(|p| p.name == name)
    }

    /// Rebind this schema to a proposal vector, positionally.
    ///
    /// Names and bounds are kept; values are replaced. Arity must match.
    pub fn with_values(&self, values: &[f64]) -> Result<Params> {
        if values.len() != self.entries.len() {
            return Err(Error::Validation(format!(
                "expected {} parameter values, got {}",
                self.entries.len(),
                values.len()
            )));
        }
        let entries = self
            .entries
            .iter()
            .zip(values)
            .map(|(p, &value)| Param { name: p.name.clone(), value, bounds: p.bounds })
            .collect();
        Ok(Self { entries })
    }

    /// Parse a parameter vector from a JSON array of
    /// `{"name": ..., "value": ..., "bounds": [low, high]}` objects.
    pub fn from_json_str(s: &str) -> Result<Params> {
        let parsed: Params = serde_json::from_str(s)?;
        // Re-validate: serde bypasses the constructor checks.
        Self::new(parsed.entries)
    }

    /// Serialize to the JSON document format accepted by [`Params::from_json_str`].
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
