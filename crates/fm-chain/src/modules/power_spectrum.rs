//! Power-law band-power model.
//!
//! The model is `Delta^2(k) = amp * (k / pivot)^index` evaluated on a
//! log-spaced `k` grid. The grid is built once during setup; each build call
//! then only evaluates the power law, which keeps per-proposal work minimal.
//!
//! Parameters: `[amp, index]`
//! - `amp` — amplitude at the pivot scale (> 0)
//! - `index` — spectral index (unbounded)

use fm_core::{Capabilities, CoreModule, Error, EvalContext, ParamValues, Result};
use std::any::Any;

/// Context keys written by [`PowerSpectrumCore`].
pub const KEY_K: &str = "ps_k";
/// Model band powers on the `k` grid.
pub const KEY_MODEL: &str = "ps_model";

/// Resolve one proposal parameter: by name when the context carries a schema
/// binding, positionally otherwise, falling back to the configured default.
fn proposal(values: &ParamValues, name: &str, position: usize, default: f64) -> f64 {
    values
        .get(name)
        .or_else(|| values.raw().and_then(|v| v.get(position).copied()))
        .unwrap_or(default)
}

/// Core module producing a power-law band-power spectrum.
#[derive(Debug, Clone)]
pub struct PowerSpectrumCore {
    k_min: f64,
    k_max: f64,
    n_bins: usize,
    /// Pivot scale the amplitude is quoted at.
    pivot: f64,
    default_amp: f64,
    default_index: f64,
    /// Log-spaced grid, filled by `setup`.
    k: Vec<f64>,
}

impl PowerSpectrumCore {
    /// Create a power-spectrum core for a log-spaced grid of `n_bins` points
    /// on `[k_min, k_max]`.
    ///
    /// `k_min`, `k_max` and `pivot` must be positive with `k_min < k_max`,
    /// and at least two bins are required. The defaults are used whenever a
    /// context carries no proposal for `amp` or `index`.
    pub fn new(
        k_min: f64,
        k_max: f64,
        n_bins: usize,
        pivot: f64,
        default_amp: f64,
        default_index: f64,
    ) -> Result<Self> {
        if !k_min.is_finite() || k_min <= 0.0 {
            return Err(Error::Validation(format!("k_min must be finite and > 0, got {}", k_min)));
        }
        if !k_max.is_finite() || k_max <= k_min {
            return Err(Error::Validation(format!(
                "k_max must be finite and > k_min, got {} (k_min = {})",
                k_max, k_min
            )));
        }
        if n_bins < 2 {
            return Err(Error::Validation(format!("at least two k bins required, got {}", n_bins)));
        }
        if !pivot.is_finite() || pivot <= 0.0 {
            return Err(Error::Validation(format!("pivot must be finite and > 0, got {}", pivot)));
        }
        if !default_amp.is_finite() || default_amp <= 0.0 {
            return Err(Error::Validation(format!(
                "default_amp must be finite and > 0, got {}",
                default_amp
            )));
        }
        if !default_index.is_finite() {
            return Err(Error::Validation(format!(
                "default_index must be finite, got {}",
                default_index
            )));
        }
        Ok(Self { k_min, k_max, n_bins, pivot, default_amp, default_index, k: Vec::new() })
    }

    /// The `k` grid, empty until setup has run.
    pub fn k_grid(&self) -> &[f64] {
        &self.k
    }
}

/// Equality is over configuration; the setup-derived `k` grid is not
/// compared.
impl PartialEq for PowerSpectrumCore {
    fn eq(&self, other: &Self) -> bool {
        self.k_min == other.k_min
            && self.k_max == other.k_max
            && self.n_bins == other.n_bins
            && self.pivot == other.pivot
            && self.default_amp == other.default_amp
            && self.default_index == other.default_index
    }
}

impl CoreModule for PowerSpectrumCore {
    fn name(&self) -> &str {
        "power_spectrum"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::SETUP
    }

    fn setup(&mut self) -> Result<()> {
        let ln_min = self.k_min.ln();
        let step = (self.k_max.ln() - ln_min) / (self.n_bins - 1) as f64;
        self.k = (0..self.n_bins).map(|i| (ln_min + i as f64 * step).exp()).collect();
        Ok(())
    }

    fn build_model_data(&self, ctx: &mut EvalContext<'_>) -> Result<()> {
        if self.k.is_empty() {
            return Err(Error::Computation("k grid is empty; setup has not run".into()));
        }

        let amp = proposal(ctx.params(), "amp", 0, self.default_amp);
        let index = proposal(ctx.params(), "index", 1, self.default_index);

        if !amp.is_finite() || amp <= 0.0 {
            return Err(Error::ParameterRegion(format!(
                "amplitude must be finite and > 0, got {}",
                amp
            )));
        }
        if !index.is_finite() {
            return Err(Error::ParameterRegion(format!(
                "spectral index must be finite, got {}",
                index
            )));
        }

        let model: Vec<f64> = self.k.iter().map(|&k| amp * (k / self.pivot).powf(index)).collect();
        ctx.insert(KEY_K, self.k.clone());
        ctx.insert(KEY_MODEL, model);
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
    use fm_core::{Param, Params};

    fn default_core() -> PowerSpectrumCore {
        let mut core = PowerSpectrumCore::new(0.1, 1.0, 8, 0.5, 2.0, -1.0).unwrap();
        core.setup().unwrap();
        core
    }

    fn named_params(amp: f64, index: f64) -> ParamValues {
        let params = Params::new(vec![
            Param::new("amp", amp, (0.0, 100.0)).unwrap(),
            Param::new("index", index, (-10.0, 10.0)).unwrap(),
        ])
        .unwrap();
        ParamValues::Named(params)
    }

    #[test]
    fn test_validation_errors() {
        // Non-positive k_min
        assert!(PowerSpectrumCore::new(0.0, 1.0, 8, 0.5, 2.0, -1.0).is_err());
        // k_max below k_min
        assert!(PowerSpectrumCore::new(0.5, 0.1, 8, 0.5, 2.0, -1.0).is_err());
        // Single bin
        assert!(PowerSpectrumCore::new(0.1, 1.0, 1, 0.5, 2.0, -1.0).is_err());
        // Non-positive default amplitude
        assert!(PowerSpectrumCore::new(0.1, 1.0, 8, 0.5, -2.0, -1.0).is_err());
        // Non-finite default index
        assert!(PowerSpectrumCore::new(0.1, 1.0, 8, 0.5, 2.0, f64::NAN).is_err());
    }

    #[test]
    fn test_setup_builds_log_grid() {
        let core = default_core();
        let k = core.k_grid();
        assert_eq!(k.len(), 8);
        assert_relative_eq!(k[0], 0.1, max_relative = 1e-12);
        assert_relative_eq!(k[7], 1.0, max_relative = 1e-12);
        // Log-spaced: constant ratio between neighbours.
        let r0 = k[1] / k[0];
        let r5 = k[6] / k[5];
        assert_relative_eq!(r0, r5, max_relative = 1e-12);
    }

    #[test]
    fn test_build_evaluates_power_law() {
        let core = default_core();
        let mut ctx = EvalContext::new(named_params(3.0, -0.5));
        core.build_model_data(&mut ctx).unwrap();

        let k = ctx.get(KEY_K).and_then(|v| v.as_vector()).unwrap();
        let model = ctx.get(KEY_MODEL).and_then(|v| v.as_vector()).unwrap();
        assert_eq!(model.len(), k.len());
        for (ki, mi) in k.iter().zip(model) {
            assert_relative_eq!(*mi, 3.0 * (ki / 0.5).powf(-0.5), max_relative = 1e-12);
        }
    }

    #[test]
    fn test_defaults_used_without_proposal() {
        let core = default_core();
        let mut ctx = EvalContext::new(ParamValues::Default);
        core.build_model_data(&mut ctx).unwrap();

        let k = ctx.get(KEY_K).and_then(|v| v.as_vector()).unwrap();
        let model = ctx.get(KEY_MODEL).and_then(|v| v.as_vector()).unwrap();
        // default_amp = 2.0, default_index = -1.0
        assert_relative_eq!(model[0], 2.0 * (k[0] / 0.5).powf(-1.0), max_relative = 1e-12);
    }

    #[test]
    fn test_positional_proposal() {
        let core = default_core();
        let mut ctx = EvalContext::new(ParamValues::Raw(vec![4.0, 0.0]));
        core.build_model_data(&mut ctx).unwrap();

        let model = ctx.get(KEY_MODEL).and_then(|v| v.as_vector()).unwrap();
        // index 0 makes the spectrum flat at the amplitude.
        for mi in model {
            assert_relative_eq!(*mi, 4.0, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_nonpositive_amplitude_rejects() {
        let core = default_core();
        let mut ctx = EvalContext::new(named_params(-1.0, 0.0));
        let err = core.build_model_data(&mut ctx).unwrap_err();
        assert!(err.is_rejection(), "expected a parameter-region rejection, got {err:?}");
    }

    #[test]
    fn test_build_before_setup_fails() {
        let core = PowerSpectrumCore::new(0.1, 1.0, 8, 0.5, 2.0, -1.0).unwrap();
        let mut ctx = EvalContext::new(ParamValues::Default);
        let err = core.build_model_data(&mut ctx).unwrap_err();
        assert!(matches!(err, Error::Computation(_)));
    }
}
