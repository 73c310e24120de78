//! Reference modules for a band-power forward-model pipeline.
//!
//! The pipeline: [`PowerSpectrumCore`] turns proposal parameters into a model
//! band-power spectrum, [`InstrumentCore`] applies an instrument response and
//! (in mock mode) noise, and the two likelihood modules score the resulting
//! signal against observed band powers or bin counts. Each module also serves
//! as the template for writing domain modules against the fm-core traits.

/// Poisson bin-count likelihood.
pub mod counts;
/// Gaussian band-power likelihood.
pub mod gaussian;
/// Instrument window and noise response.
pub mod instrument;
/// Power-law band-power model.
pub mod power_spectrum;

pub use counts::PoissonCountsLikelihood;
pub use gaussian::GaussianPsLikelihood;
pub use instrument::InstrumentCore;
pub use power_spectrum::PowerSpectrumCore;
