//! Per-evaluation scratch state shared by the pipeline stages.

use crate::error::{Error, Result};
use crate::params::Params;
use crate::traits::{CoreModule, ModuleHost};
use crate::value::{DataMap, Value};
use std::any::TypeId;

/// Parameter payload a context was created with.
///
/// The three variants form a graceful-degradation ladder: a chain with a
/// declared schema and a matching vector produces [`ParamValues::Named`];
/// a vector that cannot be matched to the schema is still carried verbatim
/// as [`ParamValues::Raw`] so positional modules keep working; and a context
/// created without proposal values is [`ParamValues::Default`], meaning each
/// module falls back to its configured defaults.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValues {
    /// No proposal vector; modules use their configured defaults.
    Default,
    /// Proposal vector bound to the chain's parameter schema.
    Named(Params),
    /// Proposal vector with no (matching) schema; positional access only.
    Raw(Vec<f64>),
}

impl ParamValues {
    /// Value of the named parameter, when a schema binding exists.
    pub fn get(&self, name: &str) -> Option<f64> {
        match self {
            ParamValues::Named(params) => params.get(name),
            _ => None,
        }
    }

    /// Schema-bound view, if this is [`ParamValues::Named`].
    pub fn named(&self) -> Option<&Params> {
        match self {
            ParamValues::Named(params) => Some(params),
            _ => None,
        }
    }

    /// Positional view of the proposal values, in schema order for
    /// [`ParamValues::Named`] and verbatim for [`ParamValues::Raw`].
    pub fn raw(&self) -> Option<Vec<f64>> {
        match self {
            ParamValues::Default => None,
            ParamValues::Named(params) => Some(params.values()),
            ParamValues::Raw(values) => Some(values.clone()),
        }
    }

    /// Whether this context carries no proposal vector at all.
    pub fn is_default(&self) -> bool {
        matches!(self, ParamValues::Default)
    }
}

/// Mutable key/value workspace threaded through one chain traversal.
///
/// A context is created per evaluation, filled by core modules in
/// registration order, then read by likelihood modules. It borrows the chain
/// that spawned it (as a [`ModuleHost`]) for sibling lookups, so a context
/// never outlives its chain and no reference cycle exists to collect.
pub struct EvalContext<'c> {
    host: Option<&'c dyn ModuleHost>,
    params: ParamValues,
    data: DataMap,
}

impl<'c> EvalContext<'c> {
    /// Detached context with no host view. Module unit tests use this to
    /// drive a single stage without constructing a chain.
    pub fn new(params: ParamValues) -> Self {
        EvalContext { host: None, params, data: DataMap::new() }
    }

    /// Context bound to the chain that is running it.
    pub fn hosted(host: &'c dyn ModuleHost, params: ParamValues) -> Self {
        EvalContext { host: Some(host), params, data: DataMap::new() }
    }

    /// Parameter payload this context was created with.
    pub fn params(&self) -> &ParamValues {
        &self.params
    }

    /// Registry view of the owning chain, absent on detached contexts.
    pub fn host(&self) -> Option<&'c dyn ModuleHost> {
        self.host
    }

    /// First registered core module of concrete type `M`, looked up through
    /// the host. Lets a likelihood read configuration off the core that
    /// produced its inputs.
    pub fn core<M: CoreModule + 'static>(&self) -> Option<&'c M> {
        self.host?.find_core(TypeId::of::<M>())?.as_any().downcast_ref::<M>()
    }

    /// Insert or overwrite an entry.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// Entry by key, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Entry by key, or [`Error::MissingData`] naming the key. This is the
    /// accessor modules use for inputs an upstream stage was required to
    /// produce.
    pub fn require(&self, key: &str) -> Result<&Value> {
        self.data.get(key).ok_or_else(|| Error::MissingData(key.to_string()))
    }

    /// Whether an entry exists under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Iterator over the entry keys, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    /// The accumulated entries.
    pub fn data(&self) -> &DataMap {
        &self.data
    }

    /// Consume the context, keeping only the accumulated entries.
    pub fn into_data(self) -> DataMap {
        self.data
    }
}
