//! # fm-chain
//!
//! Likelihood computation chains for MCMC-driven forward models.
//!
//! This crate provides:
//! - [`LikelihoodChain`] — the sequencing engine that drives registered core
//!   modules (model construction) and likelihood modules (scoring) over a
//!   shared per-evaluation context
//! - Reference modules for a band-power pipeline: power-spectrum model,
//!   instrument response, Gaussian and Poisson likelihoods
//! - [`ChainSpec`] — JSON chain description that builds a ready chain
//!
//! ## Architecture
//!
//! This crate depends on the module traits from fm-core, NOT on any concrete
//! sampler. A sampler treats [`LikelihoodChain::evaluate`] as an opaque
//! log-likelihood function; the chain neither steps the sampler nor stores
//! its draws.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Chain assembly, sequencing, and evaluation.
pub mod chain;
/// JSON chain description and builder.
pub mod config;
/// Reference core and likelihood modules for a band-power pipeline.
pub mod modules;

pub use chain::{BuildOutcome, Evaluation, LikelihoodChain, Rejection};
pub use config::{ChainSpec, CoreSpec, LikelihoodSpec};
