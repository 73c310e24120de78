//! Module capability traits and the chain accessor seam.
//!
//! This module defines the trait-based architecture that enables dependency
//! inversion: the orchestrator invokes modules through [`CoreModule`] and
//! [`LikelihoodModule`], and modules reach sibling state through
//! [`ModuleHost`] — never through a stored reference to the chain that owns
//! them.

use crate::context::EvalContext;
use crate::error::Result;
use crate::params::Params;
use crate::value::DataMap;
use rand::RngCore;
use std::any::{Any, TypeId};

/// Optional operations a module declares at registration time.
///
/// The chain records the flags once per registered module and consults the
/// record during setup and evaluation, instead of probing the module on every
/// call. An undeclared operation is never invoked, even if implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Module wants a one-time `setup` call before the first evaluation.
    pub setup: bool,
    /// Likelihood module writes diagnostic blobs via `store`.
    pub store: bool,
}

impl Capabilities {
    /// No optional operations.
    pub const NONE: Capabilities = Capabilities { setup: false, store: false };
    /// `setup` only.
    pub const SETUP: Capabilities = Capabilities { setup: true, store: false };
    /// `store` only.
    pub const STORE: Capabilities = Capabilities { setup: false, store: true };
    /// `setup` and `store`.
    pub const SETUP_AND_STORE: Capabilities = Capabilities { setup: true, store: true };
}

/// Pipeline stage that derives physical/instrumental model data into the
/// shared evaluation context.
///
/// Core modules run in registration order; a module may read any entry
/// written by modules registered before it. Modules must be idempotent over
/// the keys they own: overwrite, never append-duplicate.
///
/// The deterministic build step takes no randomness source at all — equal
/// parameter vectors must map to equal context data.
pub trait CoreModule: Send + Sync {
    /// Short stable name used in logs and diagnostics.
    fn name(&self) -> &str;

    /// Optional operations this module implements.
    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
    }

    /// One-time initialization, invoked at most once per chain lifetime and
    /// only when declared via [`Capabilities::setup`].
    fn setup(&mut self) -> Result<()> {
        Ok(())
    }

    /// Deterministic model construction: derive data from the context
    /// parameters and deposit it under this module's keys.
    ///
    /// An inadmissible parameter vector is signalled with
    /// [`Error::ParameterRegion`](crate::Error::ParameterRegion); the chain
    /// turns it into a rejection rather than a fault.
    fn build_model_data(&self, ctx: &mut EvalContext<'_>) -> Result<()>;

    /// Stochastic mock generation: like the build step, but may draw from
    /// `rng` (instrument noise realizations, stochastic foregrounds, ...).
    ///
    /// The default delegates to the deterministic build — a module with no
    /// stochastic component simulates exactly its model.
    fn simulate_mock(&self, ctx: &mut EvalContext<'_>, rng: &mut dyn RngCore) -> Result<()> {
        let _ = rng;
        self.build_model_data(ctx)
    }

    /// Upcast for sibling lookups and structural equality.
    fn as_any(&self) -> &dyn Any;

    /// Structural equality against another, possibly differently-typed,
    /// core module. Implementations downcast via [`CoreModule::as_any`].
    fn eq_module(&self, other: &dyn CoreModule) -> bool;
}

/// Pipeline stage that scores model data against observed/mock data.
///
/// Likelihood modules run in registration order after all core modules, each
/// reducing the filled context to its own model summary and contributing one
/// scalar to the total log-likelihood.
pub trait LikelihoodModule: Send + Sync {
    /// Short stable name used in logs and diagnostics.
    fn name(&self) -> &str;

    /// Optional operations this module implements.
    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
    }

    /// One-time initialization, invoked at most once per chain lifetime and
    /// only when declared via [`Capabilities::setup`].
    fn setup(&mut self) -> Result<()> {
        Ok(())
    }

    /// Reduce the filled context to this module's model summary.
    fn reduce_data(&self, ctx: &EvalContext<'_>) -> Result<DataMap>;

    /// Write diagnostic blobs derived from the model summary. Invoked only
    /// when declared via [`Capabilities::store`]; entries overwrite on key
    /// collision.
    fn store(&self, model: &DataMap, blobs: &mut DataMap) -> Result<()> {
        let _ = (model, blobs);
        Ok(())
    }

    /// Scalar log-likelihood contribution computed from the model summary.
    fn compute_likelihood(&self, model: &DataMap) -> Result<f64>;

    /// Upcast for structural equality.
    fn as_any(&self) -> &dyn Any;

    /// Structural equality against another, possibly differently-typed,
    /// likelihood module.
    fn eq_module(&self, other: &dyn LikelihoodModule) -> bool;
}

/// Read-only registry view the orchestrator exposes to modules during an
/// evaluation.
///
/// This replaces the owning-chain back-reference of classic likelihood-chain
/// designs: modules that need a sibling's configuration look it up through
/// the context's borrowed host view for the duration of one call, and nothing
/// cyclic is ever stored.
pub trait ModuleHost {
    /// First registered core module of the given concrete type, if any.
    fn find_core(&self, ty: TypeId) -> Option<&dyn CoreModule>;

    /// Declared parameter schema, if the chain carries one.
    fn param_schema(&self) -> Option<&Params>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ParamValues;

    #[derive(Debug, PartialEq)]
    struct DoublingCore {
        factor: f64,
    }

    impl CoreModule for DoublingCore {
        fn name(&self) -> &str {
            "doubling"
        }

        fn build_model_data(&self, ctx: &mut EvalContext<'_>) -> Result<()> {
            let p0 = ctx.params().get("p0").unwrap_or(1.0);
            ctx.insert("x", self.factor * p0);
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn eq_module(&self, other: &dyn CoreModule) -> bool {
            other.as_any().downcast_ref::<Self>().is_some_and(|m| m == self)
        }
    }

    #[derive(Debug, PartialEq)]
    struct FlatLikelihood;

    impl LikelihoodModule for FlatLikelihood {
        fn name(&self) -> &str {
            "flat"
        }

        fn reduce_data(&self, _ctx: &EvalContext<'_>) -> Result<DataMap> {
            Ok(DataMap::new())
        }

        fn compute_likelihood(&self, _model: &DataMap) -> Result<f64> {
            Ok(0.0)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn eq_module(&self, other: &dyn LikelihoodModule) -> bool {
            other.as_any().downcast_ref::<Self>().is_some_and(|m| m == self)
        }
    }

    #[test]
    fn test_default_mock_delegates_to_build() {
        use rand::SeedableRng;

        let m = DoublingCore { factor: 2.0 };
        let mut ctx = EvalContext::new(ParamValues::Default);
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);
        m.simulate_mock(&mut ctx, &mut rng).unwrap();
        assert_eq!(ctx.get("x").and_then(|v| v.as_scalar()), Some(2.0));
    }

    #[test]
    fn test_default_capabilities_and_store() {
        let l = FlatLikelihood;
        assert_eq!(l.capabilities(), Capabilities::NONE);

        let mut blobs = DataMap::new();
        l.store(&DataMap::new(), &mut blobs).unwrap();
        assert!(blobs.is_empty());
    }

    #[test]
    fn test_downcast_equality() {
        let a = DoublingCore { factor: 2.0 };
        let b = DoublingCore { factor: 2.0 };
        let c = DoublingCore { factor: 3.0 };
        assert!(a.eq_module(&b));
        assert!(!a.eq_module(&c));

        // Different concrete type never compares equal.
        #[derive(Debug, PartialEq)]
        struct OtherCore;
        impl CoreModule for OtherCore {
            fn name(&self) -> &str {
                "other"
            }
            fn build_model_data(&self, _ctx: &mut EvalContext<'_>) -> Result<()> {
                Ok(())
            }
            fn as_any(&self) -> &dyn Any {
                self
            }
            fn eq_module(&self, other: &dyn CoreModule) -> bool {
                other.as_any().downcast_ref::<Self>().is_some_and(|m| m == self)
            }
        }
        assert!(!a.eq_module(&OtherCore));
    }
}
