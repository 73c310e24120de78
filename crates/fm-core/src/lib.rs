//! # fm-core
//!
//! Shared vocabulary for forward-model likelihood computation chains:
//! - error taxonomy ([`Error`], [`Result`])
//! - named parameter vectors with bounds ([`Params`])
//! - the per-evaluation context and its value model ([`EvalContext`], [`Value`])
//! - the capability traits core and likelihood modules implement
//!   ([`CoreModule`], [`LikelihoodModule`])
//!
//! ## Architecture
//!
//! The orchestrator (fm-chain) depends on the traits defined here, and
//! modules depend only on this crate — never on the orchestrator. Sibling
//! lookups go through the [`ModuleHost`] seam, so no module ever stores a
//! reference back to the chain that owns it.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Per-evaluation shared context and its parameter binding.
pub mod context;
/// Workspace-wide error type and result alias.
pub mod error;
/// Named parameter vectors with bounds.
pub mod params;
/// Module capability traits and the chain accessor seam.
pub mod traits;
/// Context payload values and named data maps.
pub mod value;

pub use context::{EvalContext, ParamValues};
pub use error::{Error, Result};
pub use params::{Param, Params};
pub use traits::{Capabilities, CoreModule, LikelihoodModule, ModuleHost};
pub use value::{DataMap, Value};

/// Crate version, re-exported for bindings.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
