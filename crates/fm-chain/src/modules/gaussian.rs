//! Gaussian band-power likelihood.
//!
//! Scores the windowed signal against observed band powers with known
//! per-bin uncertainties: `lnL = -0.5 * sum_i ((s_i - d_i) / sigma_i)^2`,
//! normalization constants dropped. With the store capability enabled it
//! blobs the scored signal and its uncertainties, which is what downstream
//! chain consumers plot against the data.

use crate::modules::instrument::KEY_SIGNAL;
use crate::modules::power_spectrum::KEY_MODEL;
use fm_core::{Capabilities, DataMap, Error, EvalContext, LikelihoodModule, Result, Value};
use std::any::Any;

/// Gaussian likelihood over observed band powers.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianPsLikelihood {
    /// Observed band powers per bin.
    observed: Vec<f64>,
    /// Known uncertainty per bin.
    sigma: Vec<f64>,
    /// Precomputed 1/sigma_i^2.
    inv_var: Vec<f64>,
}

impl GaussianPsLikelihood {
    /// Create a Gaussian likelihood from observed band powers and their
    /// uncertainties.
    ///
    /// `observed` and `sigma` must have the same non-zero length, `observed`
    /// values must be finite and `sigma` values finite and positive.
    pub fn new(observed: Vec<f64>, sigma: Vec<f64>) -> Result<Self> {
        if sigma.len() != observed.len() {
            return Err(Error::Validation(format!(
                "observed and sigma must have the same length, got {} and {}",
                observed.len(),
                sigma.len()
            )));
        }
        if observed.is_empty() {
            return Err(Error::Validation("at least one observed bin required".into()));
        }
        for (i, &d) in observed.iter().enumerate() {
            if !d.is_finite() {
                return Err(Error::Validation(format!("observed[{}] must be finite, got {}", i, d)));
            }
        }
        for (i, &s) in sigma.iter().enumerate() {
            if !s.is_finite() || s <= 0.0 {
                return Err(Error::Validation(format!(
                    "sigma[{}] must be finite and > 0, got {}",
                    i, s
                )));
            }
        }
        let inv_var: Vec<f64> = sigma.iter().map(|s| 1.0 / (s * s)).collect();
        Ok(Self { observed, sigma, inv_var })
    }

    /// Number of observed bins.
    pub fn n_bins(&self) -> usize {
        self.observed.len()
    }
}

impl LikelihoodModule for GaussianPsLikelihood {
    fn name(&self) -> &str {
        "gaussian_ps"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::STORE
    }

    /// Pulls the windowed signal (or, without an instrument stage, the raw
    /// model) and pairs it with the configured uncertainties.
    fn reduce_data(&self, ctx: &EvalContext<'_>) -> Result<DataMap> {
        let signal = match ctx.get(KEY_SIGNAL).or_else(|| ctx.get(KEY_MODEL)) {
            Some(value) => value
                .as_vector()
                .ok_or_else(|| Error::Computation(format!("`{}` must be a vector", KEY_SIGNAL)))?,
            None => return Err(Error::MissingData(KEY_SIGNAL.to_string())),
        };
        if signal.len() != self.observed.len() {
            return Err(Error::Computation(format!(
                "signal length {} does not match {} observed bins",
                signal.len(),
                self.observed.len()
            )));
        }
        if signal.iter().any(|s| !s.is_finite()) {
            return Err(Error::ParameterRegion("model signal contains non-finite values".into()));
        }

        let mut model = DataMap::new();
        model.insert("signal".to_string(), Value::Vector(signal.to_vec()));
        model.insert("sigma".to_string(), Value::Vector(self.sigma.clone()));
        Ok(model)
    }

    fn store(&self, model: &DataMap, blobs: &mut DataMap) -> Result<()> {
        for key in ["signal", "sigma"] {
            let value = model
                .get(key)
                .cloned()
                .ok_or_else(|| Error::MissingData(key.to_string()))?;
            blobs.insert(key.to_string(), value);
        }
        Ok(())
    }

    fn compute_likelihood(&self, model: &DataMap) -> Result<f64> {
        let signal = model
            .get("signal")
            .and_then(|v| v.as_vector())
            .ok_or_else(|| Error::MissingData("signal".to_string()))?;
        if signal.len() != self.observed.len() {
            return Err(Error::Computation(format!(
                "signal length {} does not match {} observed bins",
                signal.len(),
                self.observed.len()
            )));
        }

        let mut lnl = 0.0;
        for i in 0..self.observed.len() {
            let r = signal[i] - self.observed[i];
            lnl -= 0.5 * r * r * self.inv_var[i];
        }
        Ok(lnl)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_module(&self, other: &dyn LikelihoodModule) -> bool {
        other.as_any().downcast_ref::<Self>().is_some_and(|m| m == self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use fm_core::ParamValues;

    fn likelihood() -> GaussianPsLikelihood {
        GaussianPsLikelihood::new(vec![1.0, 2.0], vec![1.0, 2.0]).unwrap()
    }

    #[test]
    fn test_validation_errors() {
        // Mismatched lengths
        assert!(GaussianPsLikelihood::new(vec![1.0], vec![1.0, 2.0]).is_err());
        // Empty
        assert!(GaussianPsLikelihood::new(vec![], vec![]).is_err());
        // Non-positive sigma
        assert!(GaussianPsLikelihood::new(vec![1.0], vec![0.0]).is_err());
        // Non-finite observation
        assert!(GaussianPsLikelihood::new(vec![f64::NAN], vec![1.0]).is_err());
    }

    #[test]
    fn test_reduce_prefers_signal_over_model() {
        let l = likelihood();
        let mut ctx = EvalContext::new(ParamValues::Default);
        ctx.insert(KEY_MODEL, vec![9.0, 9.0]);
        ctx.insert(KEY_SIGNAL, vec![1.0, 2.0]);

        let model = l.reduce_data(&ctx).unwrap();
        assert_eq!(model.get("signal").and_then(|v| v.as_vector()), Some(&[1.0, 2.0][..]));
    }

    #[test]
    fn test_reduce_falls_back_to_model() {
        let l = likelihood();
        let mut ctx = EvalContext::new(ParamValues::Default);
        ctx.insert(KEY_MODEL, vec![3.0, 4.0]);

        let model = l.reduce_data(&ctx).unwrap();
        assert_eq!(model.get("signal").and_then(|v| v.as_vector()), Some(&[3.0, 4.0][..]));
    }

    #[test]
    fn test_reduce_without_signal_fails() {
        let l = likelihood();
        let ctx = EvalContext::new(ParamValues::Default);
        let err = l.reduce_data(&ctx).unwrap_err();
        assert!(matches!(err, Error::MissingData(_)));
    }

    #[test]
    fn test_reduce_rejects_nonfinite_signal() {
        let l = likelihood();
        let mut ctx = EvalContext::new(ParamValues::Default);
        ctx.insert(KEY_SIGNAL, vec![1.0, f64::NAN]);
        let err = l.reduce_data(&ctx).unwrap_err();
        assert!(err.is_rejection());
    }

    #[test]
    fn test_likelihood_hand_computed() {
        let l = likelihood();
        let mut ctx = EvalContext::new(ParamValues::Default);
        ctx.insert(KEY_SIGNAL, vec![2.0, 1.0]);

        let model = l.reduce_data(&ctx).unwrap();
        let lnl = l.compute_likelihood(&model).unwrap();
        // -0.5 * [ (2-1)^2/1 + (1-2)^2/4 ]
        assert_relative_eq!(lnl, -0.625, max_relative = 1e-12);
    }

    #[test]
    fn test_exact_match_scores_zero() {
        let l = likelihood();
        let mut ctx = EvalContext::new(ParamValues::Default);
        ctx.insert(KEY_SIGNAL, vec![1.0, 2.0]);

        let model = l.reduce_data(&ctx).unwrap();
        assert_eq!(l.compute_likelihood(&model).unwrap(), 0.0);
    }

    #[test]
    fn test_store_blobs_signal_and_sigma() {
        let l = likelihood();
        let mut ctx = EvalContext::new(ParamValues::Default);
        ctx.insert(KEY_SIGNAL, vec![2.0, 1.0]);

        let model = l.reduce_data(&ctx).unwrap();
        let mut blobs = DataMap::new();
        l.store(&model, &mut blobs).unwrap();
        assert_eq!(blobs.get("signal").and_then(|v| v.as_vector()), Some(&[2.0, 1.0][..]));
        assert_eq!(blobs.get("sigma").and_then(|v| v.as_vector()), Some(&[1.0, 2.0][..]));
    }

    #[test]
    fn test_length_mismatch_is_a_fault() {
        let l = likelihood();
        let mut ctx = EvalContext::new(ParamValues::Default);
        ctx.insert(KEY_SIGNAL, vec![1.0]);
        let err = l.reduce_data(&ctx).unwrap_err();
        assert!(matches!(err, Error::Computation(_)));
    }
}
