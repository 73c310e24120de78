//! JSON chain description.
//!
//! A [`ChainSpec`] is the declarative form of a [`LikelihoodChain`]: the
//! parameter schema plus tagged module descriptions in execution order.
//! [`ChainSpec::build`] validates every entry through the module constructors
//! and returns a chain ready to evaluate, so a driver binary or binding can
//! go from a JSON document to a likelihood function in two calls.

use crate::chain::LikelihoodChain;
use crate::modules::{
    GaussianPsLikelihood, InstrumentCore, PoissonCountsLikelihood, PowerSpectrumCore,
};
use fm_core::{Param, Params, Result};
use serde::{Deserialize, Serialize};

/// Declarative chain description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSpec {
    /// Parameter schema: name, default value, bounds. Empty means the chain
    /// carries no schema and proposals stay positional.
    #[serde(default)]
    pub params: Vec<Param>,
    /// Core modules, in execution order.
    #[serde(default)]
    pub cores: Vec<CoreSpec>,
    /// Likelihood modules, in execution order.
    #[serde(default)]
    pub likelihoods: Vec<LikelihoodSpec>,
}

/// Core module description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CoreSpec {
    /// Power-law band-power model on a log-spaced grid.
    #[serde(rename = "power_spectrum")]
    PowerSpectrum {
        /// Lowest k bin.
        k_min: f64,
        /// Highest k bin.
        k_max: f64,
        /// Number of bins.
        n_bins: usize,
        /// Pivot scale the amplitude is quoted at.
        #[serde(default = "default_pivot")]
        pivot: f64,
        /// Amplitude used when a context carries no proposal.
        #[serde(default = "default_amp")]
        amp: f64,
        /// Spectral index used when a context carries no proposal.
        #[serde(default = "default_index")]
        index: f64,
    },

    /// Exponential window plus Gaussian noise level.
    #[serde(rename = "instrument")]
    Instrument {
        /// Taper scale of the window function.
        taper_scale: f64,
        /// Gaussian noise level; zero models a noise-free instrument.
        #[serde(default)]
        noise_rms: f64,
    },
}

/// Likelihood module description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LikelihoodSpec {
    /// Gaussian likelihood over observed band powers.
    #[serde(rename = "gaussian_ps")]
    GaussianPs {
        /// Observed band powers per bin.
        observed: Vec<f64>,
        /// Known uncertainty per bin.
        sigma: Vec<f64>,
    },

    /// Poisson likelihood over observed bin counts.
    #[serde(rename = "poisson_counts")]
    PoissonCounts {
        /// Observed event counts per bin.
        counts: Vec<u64>,
        /// Conversion from signal band power to expected counts.
        #[serde(default = "default_exposure")]
        exposure: f64,
    },
}

fn default_pivot() -> f64 {
    0.5
}

fn default_amp() -> f64 {
    1.0
}

fn default_index() -> f64 {
    -1.0
}

fn default_exposure() -> f64 {
    1.0
}

impl ChainSpec {
    /// Parse a chain description from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize back to JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Build a ready chain, validating every module configuration.
    pub fn build(&self) -> Result<LikelihoodChain> {
        let schema = if self.params.is_empty() {
            None
        } else {
            Some(Params::new(self.params.clone())?)
        };

        let mut chain = LikelihoodChain::new(schema);
        for core in &self.cores {
            match core {
                CoreSpec::PowerSpectrum { k_min, k_max, n_bins, pivot, amp, index } => {
                    chain.add_core_module(PowerSpectrumCore::new(
                        *k_min, *k_max, *n_bins, *pivot, *amp, *index,
                    )?)?;
                }
                CoreSpec::Instrument { taper_scale, noise_rms } => {
                    chain.add_core_module(InstrumentCore::new(*taper_scale, *noise_rms)?)?;
                }
            }
        }
        for likelihood in &self.likelihoods {
            match likelihood {
                LikelihoodSpec::GaussianPs { observed, sigma } => {
                    chain.add_likelihood_module(GaussianPsLikelihood::new(
                        observed.clone(),
                        sigma.clone(),
                    )?)?;
                }
                LikelihoodSpec::PoissonCounts { counts, exposure } => {
                    chain.add_likelihood_module(PoissonCountsLikelihood::new(
                        counts.clone(),
                        *exposure,
                    )?)?;
                }
            }
        }
        Ok(chain)
    }
}
