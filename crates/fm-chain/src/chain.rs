//! Likelihood computation chain: module sequencing and evaluation.
//!
//! A [`LikelihoodChain`] owns an ordered list of core modules followed by an
//! ordered list of likelihood modules. One evaluation creates a fresh
//! [`EvalContext`], lets each core module deposit model data into it in
//! registration order, then lets each likelihood module reduce and score that
//! data. The sampler-facing entry point is [`LikelihoodChain::evaluate`]: one
//! proposal vector in, one total log-likelihood plus diagnostic blobs out.
//!
//! A proposal landing in an inadmissible parameter region is not a fault:
//! modules signal it with [`Error::ParameterRegion`] and the chain turns it
//! into a rejection (`-inf` likelihood, empty blobs) that the sampler simply
//! never accepts. Every other error aborts the evaluation.

use fm_core::{
    Capabilities, CoreModule, DataMap, Error, EvalContext, LikelihoodModule, ModuleHost,
    ParamValues, Params, Result,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::any::TypeId;

/// Outcome of driving the core-module stage over one proposal.
pub enum BuildOutcome<'c> {
    /// Every core module ran; holds the filled context.
    Accepted(EvalContext<'c>),
    /// A core module declared the proposal inadmissible.
    Rejected(Rejection),
}

impl<'c> BuildOutcome<'c> {
    /// The filled context, if the proposal was accepted.
    pub fn into_context(self) -> Option<EvalContext<'c>> {
        match self {
            BuildOutcome::Accepted(ctx) => Some(ctx),
            BuildOutcome::Rejected(_) => None,
        }
    }

    /// Whether the proposal was rejected.
    pub fn is_rejected(&self) -> bool {
        matches!(self, BuildOutcome::Rejected(_))
    }
}

/// Which module refused a proposal, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Name of the rejecting module.
    pub module: String,
    /// Module-supplied reason.
    pub reason: String,
}

/// Total log-likelihood and diagnostic blobs from one chain evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Sum of the per-module log-likelihood contributions.
    pub log_likelihood: f64,
    /// Blobs written by likelihood modules that declare the store capability.
    pub blobs: DataMap,
}

impl Evaluation {
    /// Rejected-proposal result: `-inf` likelihood and no blobs.
    pub fn rejected() -> Self {
        Evaluation { log_likelihood: f64::NEG_INFINITY, blobs: DataMap::new() }
    }

    /// Whether this evaluation carries the rejection likelihood.
    pub fn is_rejected(&self) -> bool {
        self.log_likelihood == f64::NEG_INFINITY
    }
}

/// Registration record for a core module. Capabilities are captured once at
/// add time and consulted thereafter, so a module cannot change its declared
/// surface mid-run.
struct RegisteredCore {
    module: Box<dyn CoreModule>,
    caps: Capabilities,
}

struct RegisteredLikelihood {
    module: Box<dyn LikelihoodModule>,
    caps: Capabilities,
}

/// Ordered pipeline of core and likelihood modules with a shared parameter
/// schema.
///
/// Module setup runs lazily: the first call to [`build_model_data`],
/// [`simulate_mock`] or [`evaluate`] sets up every module that declares the
/// setup capability, cores before likelihoods, each at most once for the
/// lifetime of the chain. Registration is refused after setup has run.
///
/// A chain is `Send + Sync`, but [`evaluate`] takes `&mut self`: one chain
/// value runs one evaluation at a time. Parallel samplers give each walker
/// its own chain instance.
///
/// [`build_model_data`]: LikelihoodChain::build_model_data
/// [`simulate_mock`]: LikelihoodChain::simulate_mock
/// [`evaluate`]: LikelihoodChain::evaluate
pub struct LikelihoodChain {
    params: Option<Params>,
    cores: Vec<RegisteredCore>,
    likelihoods: Vec<RegisteredLikelihood>,
    setup_done: bool,
}

impl LikelihoodChain {
    /// Empty chain, optionally carrying a parameter schema that proposal
    /// vectors are bound against.
    pub fn new(params: Option<Params>) -> Self {
        LikelihoodChain { params, cores: Vec::new(), likelihoods: Vec::new(), setup_done: false }
    }

    /// Append a core module. Fails once the chain has been set up.
    pub fn add_core_module(&mut self, module: impl CoreModule + 'static) -> Result<()> {
        if self.setup_done {
            return Err(Error::Validation(format!(
                "cannot register core module `{}` after the chain has been set up",
                module.name()
            )));
        }
        let caps = module.capabilities();
        tracing::debug!(module = module.name(), ?caps, "registering core module");
        self.cores.push(RegisteredCore { module: Box::new(module), caps });
        Ok(())
    }

    /// Append a likelihood module. Fails once the chain has been set up.
    pub fn add_likelihood_module(&mut self, module: impl LikelihoodModule + 'static) -> Result<()> {
        if self.setup_done {
            return Err(Error::Validation(format!(
                "cannot register likelihood module `{}` after the chain has been set up",
                module.name()
            )));
        }
        let caps = module.capabilities();
        tracing::debug!(module = module.name(), ?caps, "registering likelihood module");
        self.likelihoods.push(RegisteredLikelihood { module: Box::new(module), caps });
        Ok(())
    }

    /// Registered core modules, in execution order.
    pub fn core_modules(&self) -> impl Iterator<Item = &dyn CoreModule> {
        self.cores.iter().map(|rc| rc.module.as_ref())
    }

    /// Registered likelihood modules, in execution order.
    pub fn likelihood_modules(&self) -> impl Iterator<Item = &dyn LikelihoodModule> {
        self.likelihoods.iter().map(|rl| rl.module.as_ref())
    }

    /// Declared parameter schema, if any.
    pub fn param_schema(&self) -> Option<&Params> {
        self.params.as_ref()
    }

    /// Whether setup has already run.
    pub fn is_setup(&self) -> bool {
        self.setup_done
    }

    /// Run setup on every module that declares the capability, cores first,
    /// in registration order. Calling this on an already set-up chain logs a
    /// warning and does nothing.
    pub fn setup(&mut self) -> Result<()> {
        if self.setup_done {
            tracing::warn!("chain is already set up, ignoring");
            return Ok(());
        }
        for rc in &mut self.cores {
            if rc.caps.setup {
                tracing::debug!(module = rc.module.name(), "setting up core module");
                rc.module.setup()?;
            }
        }
        for rl in &mut self.likelihoods {
            if rl.caps.setup {
                tracing::debug!(module = rl.module.name(), "setting up likelihood module");
                rl.module.setup()?;
            }
        }
        self.setup_done = true;
        Ok(())
    }

    fn ensure_setup(&mut self) -> Result<()> {
        if self.setup_done { Ok(()) } else { self.setup() }
    }

    /// Fresh evaluation context for a proposal vector.
    ///
    /// With a schema whose length matches `p`, values are bound by name.
    /// A mismatched or schema-less vector is carried positionally, and no
    /// vector at all means modules fall back to their configured defaults.
    pub fn create_context(&self, p: Option<&[f64]>) -> EvalContext<'_> {
        EvalContext::hosted(self, self.bind_params(p))
    }

    fn bind_params(&self, p: Option<&[f64]>) -> ParamValues {
        let Some(values) = p else {
            return ParamValues::Default;
        };
        match &self.params {
            Some(schema) => match schema.with_values(values) {
                Ok(bound) => ParamValues::Named(bound),
                Err(_) => {
                    tracing::debug!(
                        expected = schema.len(),
                        got = values.len(),
                        "proposal does not match the parameter schema, keeping positional values"
                    );
                    ParamValues::Raw(values.to_vec())
                }
            },
            None => ParamValues::Raw(values.to_vec()),
        }
    }

    /// Deterministic model construction: run every core module's build step
    /// over a fresh context.
    ///
    /// Equal proposal vectors fill equal contexts; all stochasticity lives in
    /// [`simulate_mock`](LikelihoodChain::simulate_mock).
    pub fn build_model_data(&mut self, p: Option<&[f64]>) -> Result<BuildOutcome<'_>> {
        self.ensure_setup()?;
        let params = self.bind_params(p);
        self.run_cores(params, None)
    }

    /// Mock-data generation: run every core module's simulate step over a
    /// fresh context, drawing randomness from a generator seeded with `seed`.
    ///
    /// Equal seeds and proposals reproduce the same mock.
    pub fn simulate_mock(&mut self, p: Option<&[f64]>, seed: u64) -> Result<BuildOutcome<'_>> {
        self.ensure_setup()?;
        tracing::debug!(seed, "simulating mock data");
        let params = self.bind_params(p);
        let mut rng = StdRng::seed_from_u64(seed);
        let outcome = self.run_cores(params, Some(&mut rng))?;
        tracing::debug!(rejected = outcome.is_rejected(), "finished simulating mock data");
        Ok(outcome)
    }

    fn run_cores<'c>(
        &'c self,
        params: ParamValues,
        mut rng: Option<&mut StdRng>,
    ) -> Result<BuildOutcome<'c>> {
        let mut ctx = EvalContext::hosted(self, params);
        for rc in &self.cores {
            let name = rc.module.name();
            tracing::debug!(module = name, "invoking core module");
            let step = match rng.as_deref_mut() {
                Some(r) => rc.module.simulate_mock(&mut ctx, r),
                None => rc.module.build_model_data(&mut ctx),
            };
            match step {
                Ok(()) => {}
                Err(Error::ParameterRegion(reason)) => {
                    tracing::debug!(module = name, %reason, "core module rejected the proposal");
                    return Ok(BuildOutcome::Rejected(Rejection {
                        module: name.to_string(),
                        reason,
                    }));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(BuildOutcome::Accepted(ctx))
    }

    /// Score one proposal vector: build model data, then reduce, store and
    /// sum over every likelihood module.
    ///
    /// A [`Error::ParameterRegion`] from any stage yields
    /// [`Evaluation::rejected`] — `-inf` with no blobs, partial blobs
    /// discarded. Any other error is returned as-is.
    pub fn evaluate(&mut self, p: &[f64]) -> Result<Evaluation> {
        self.ensure_setup()?;
        let params = self.bind_params(Some(p));
        let ctx = match self.run_cores(params, None)? {
            BuildOutcome::Accepted(ctx) => ctx,
            BuildOutcome::Rejected(rejection) => {
                tracing::debug!(
                    module = %rejection.module,
                    reason = %rejection.reason,
                    "proposal rejected during model build"
                );
                return Ok(Evaluation::rejected());
            }
        };

        let mut total = 0.0;
        let mut blobs = DataMap::new();
        for rl in &self.likelihoods {
            match self.score_likelihood(rl, &ctx, &mut blobs) {
                Ok(lnl) => total += lnl,
                Err(Error::ParameterRegion(reason)) => {
                    tracing::debug!(
                        module = rl.module.name(),
                        %reason,
                        "likelihood module rejected the proposal"
                    );
                    return Ok(Evaluation::rejected());
                }
                Err(e) => return Err(e),
            }
        }
        Ok(Evaluation { log_likelihood: total, blobs })
    }

    fn score_likelihood(
        &self,
        rl: &RegisteredLikelihood,
        ctx: &EvalContext<'_>,
        blobs: &mut DataMap,
    ) -> Result<f64> {
        let name = rl.module.name();
        tracing::debug!(module = name, "reducing data");
        let model = rl.module.reduce_data(ctx)?;
        if rl.caps.store {
            tracing::debug!(module = name, "storing blobs");
            rl.module.store(&model, blobs)?;
        }
        let lnl = rl.module.compute_likelihood(&model)?;
        tracing::debug!(module = name, lnl, "computed likelihood");
        Ok(lnl)
    }
}

impl Default for LikelihoodChain {
    fn default() -> Self {
        LikelihoodChain::new(None)
    }
}

impl ModuleHost for LikelihoodChain {
    fn find_core(&self, ty: TypeId) -> Option<&dyn CoreModule> {
        self.cores.iter().map(|rc| rc.module.as_ref()).find(|m| m.as_any().type_id() == ty)
    }

    fn param_schema(&self) -> Option<&Params> {
        self.params.as_ref()
    }
}

/// Structural equality: same schema and pairwise-equal module sequences.
/// Whether setup has run is runtime state and is not compared.
impl PartialEq for LikelihoodChain {
    fn eq(&self, other: &Self) -> bool {
        if self.params != other.params {
            return false;
        }
        if self.cores.len() != other.cores.len()
            || self.likelihoods.len() != other.likelihoods.len()
        {
            return false;
        }
        self.cores.iter().zip(&other.cores).all(|(a, b)| a.module.eq_module(b.module.as_ref()))
            && self
                .likelihoods
                .iter()
                .zip(&other.likelihoods)
                .all(|(a, b)| a.module.eq_module(b.module.as_ref()))
    }
}
