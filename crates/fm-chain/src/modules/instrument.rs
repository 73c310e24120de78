//! Instrument window and noise response.
//!
//! Applies an exponential taper `w(k) = exp(-k / taper_scale)` to the model
//! band powers and records the per-bin noise level. In mock mode the windowed
//! signal additionally receives Gaussian noise draws, which is where all the
//! stochasticity of the reference pipeline lives.

use crate::modules::power_spectrum::{KEY_K, KEY_MODEL};
use fm_core::{CoreModule, Error, EvalContext, Result};
use rand::RngCore;
use rand_distr::{Distribution, Normal};
use std::any::Any;

/// Window function applied to the model band powers.
pub const KEY_WINDOW: &str = "ps_window";
/// Windowed signal, with noise added in mock mode.
pub const KEY_SIGNAL: &str = "ps_signal";
/// Gaussian noise level per bin.
pub const KEY_NOISE_RMS: &str = "ps_noise_rms";

/// Core module applying instrument response to an upstream band-power model.
///
/// Requires `ps_k` and `ps_model` in the context, so it must be registered
/// after [`PowerSpectrumCore`](crate::modules::PowerSpectrumCore).
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentCore {
    taper_scale: f64,
    noise_rms: f64,
}

impl InstrumentCore {
    /// Create an instrument response with taper scale `taper_scale` and
    /// Gaussian noise level `noise_rms`.
    ///
    /// `taper_scale` must be finite and positive; `noise_rms` must be finite
    /// and non-negative (zero models a noise-free instrument).
    pub fn new(taper_scale: f64, noise_rms: f64) -> Result<Self> {
        if !taper_scale.is_finite() || taper_scale <= 0.0 {
            return Err(Error::Validation(format!(
                "taper_scale must be finite and > 0, got {}",
                taper_scale
            )));
        }
        if !noise_rms.is_finite() || noise_rms < 0.0 {
            return Err(Error::Validation(format!(
                "noise_rms must be finite and >= 0, got {}",
                noise_rms
            )));
        }
        Ok(Self { taper_scale, noise_rms })
    }

    fn windowed_signal(&self, ctx: &EvalContext<'_>) -> Result<(Vec<f64>, Vec<f64>)> {
        let k = ctx
            .require(KEY_K)?
            .as_vector()
            .ok_or_else(|| Error::Computation(format!("`{}` must be a vector", KEY_K)))?;
        let model = ctx
            .require(KEY_MODEL)?
            .as_vector()
            .ok_or_else(|| Error::Computation(format!("`{}` must be a vector", KEY_MODEL)))?;
        if k.len() != model.len() {
            return Err(Error::Computation(format!(
                "k grid and model length mismatch: {} vs {}",
                k.len(),
                model.len()
            )));
        }

        let window: Vec<f64> = k.iter().map(|&ki| (-ki / self.taper_scale).exp()).collect();
        let signal: Vec<f64> = window.iter().zip(model).map(|(w, m)| w * m).collect();
        Ok((window, signal))
    }
}

impl CoreModule for InstrumentCore {
    fn name(&self) -> &str {
        "instrument"
    }

    fn build_model_data(&self, ctx: &mut EvalContext<'_>) -> Result<()> {
        let (window, signal) = self.windowed_signal(ctx)?;
        ctx.insert(KEY_WINDOW, window);
        ctx.insert(KEY_SIGNAL, signal);
        ctx.insert(KEY_NOISE_RMS, self.noise_rms);
        Ok(())
    }

    fn simulate_mock(&self, ctx: &mut EvalContext<'_>, rng: &mut dyn RngCore) -> Result<()> {
        let (window, mut signal) = self.windowed_signal(ctx)?;
        let noise = Normal::new(0.0, self.noise_rms)
            .map_err(|e| Error::Computation(format!("noise distribution: {}", e)))?;
        for s in &mut signal {
            *s += noise.sample(rng);
        }
        ctx.insert(KEY_WINDOW, window);
        ctx.insert(KEY_SIGNAL, signal);
        ctx.insert(KEY_NOISE_RMS, self.noise_rms);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_module(&self, other: &dyn CoreModule) -> bool {
        other.as_any().downcast_ref::<Self>().is_some_and(|m| m == self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use fm_core::ParamValues;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn upstream_ctx() -> EvalContext<'static> {
        let mut ctx = EvalContext::new(ParamValues::Default);
        ctx.insert(KEY_K, vec![0.1, 0.2, 0.4]);
        ctx.insert(KEY_MODEL, vec![10.0, 5.0, 2.5]);
        ctx
    }

    #[test]
    fn test_validation_errors() {
        assert!(InstrumentCore::new(0.0, 1.0).is_err());
        assert!(InstrumentCore::new(f64::INFINITY, 1.0).is_err());
        assert!(InstrumentCore::new(0.5, -1.0).is_err());
        // Zero noise is a valid noise-free instrument.
        assert!(InstrumentCore::new(0.5, 0.0).is_ok());
    }

    #[test]
    fn test_signal_is_windowed_model() {
        let m = InstrumentCore::new(0.5, 1.0).unwrap();
        let mut ctx = upstream_ctx();
        m.build_model_data(&mut ctx).unwrap();

        let window = ctx.get(KEY_WINDOW).and_then(|v| v.as_vector()).unwrap();
        let signal = ctx.get(KEY_SIGNAL).and_then(|v| v.as_vector()).unwrap();
        assert_relative_eq!(window[0], (-0.1f64 / 0.5).exp(), max_relative = 1e-12);
        assert_relative_eq!(signal[1], 5.0 * (-0.2f64 / 0.5).exp(), max_relative = 1e-12);
        assert_eq!(ctx.get(KEY_NOISE_RMS).and_then(|v| v.as_scalar()), Some(1.0));

        // Taper is attenuating: monotone decreasing in k.
        assert!(window[0] > window[1] && window[1] > window[2]);
    }

    #[test]
    fn test_missing_upstream_model_fails() {
        let m = InstrumentCore::new(0.5, 1.0).unwrap();
        let mut ctx = EvalContext::new(ParamValues::Default);
        let err = m.build_model_data(&mut ctx).unwrap_err();
        assert!(matches!(err, Error::MissingData(_)));
    }

    #[test]
    fn test_mock_is_reproducible_by_seed() {
        let m = InstrumentCore::new(0.5, 0.3).unwrap();

        let mut ctx_a = upstream_ctx();
        let mut rng_a = StdRng::seed_from_u64(7);
        m.simulate_mock(&mut ctx_a, &mut rng_a).unwrap();

        let mut ctx_b = upstream_ctx();
        let mut rng_b = StdRng::seed_from_u64(7);
        m.simulate_mock(&mut ctx_b, &mut rng_b).unwrap();

        assert_eq!(ctx_a.get(KEY_SIGNAL), ctx_b.get(KEY_SIGNAL));
    }

    #[test]
    fn test_mock_adds_noise() {
        let m = InstrumentCore::new(0.5, 0.3).unwrap();

        let mut built = upstream_ctx();
        m.build_model_data(&mut built).unwrap();
        let mut mocked = upstream_ctx();
        let mut rng = StdRng::seed_from_u64(7);
        m.simulate_mock(&mut mocked, &mut rng).unwrap();

        assert_ne!(built.get(KEY_SIGNAL), mocked.get(KEY_SIGNAL));
    }

    #[test]
    fn test_noise_free_mock_matches_build() {
        let m = InstrumentCore::new(0.5, 0.0).unwrap();

        let mut built = upstream_ctx();
        m.build_model_data(&mut built).unwrap();
        let mut mocked = upstream_ctx();
        let mut rng = StdRng::seed_from_u64(7);
        m.simulate_mock(&mut mocked, &mut rng).unwrap();

        assert_eq!(built.get(KEY_SIGNAL), mocked.get(KEY_SIGNAL));
    }
}
