//! Poisson bin-count likelihood.
//!
//! Scores observed event counts against expected counts proportional to the
//! windowed signal: `lambda_i = exposure * s_i`, with
//! `lnL = sum_i n_i * ln(lambda_i) - lambda_i - ln(n_i!)`. The `ln(n_i!)`
//! terms depend only on the observed counts, so they are tabulated once
//! during setup.

use crate::modules::instrument::KEY_SIGNAL;
use crate::modules::power_spectrum::KEY_MODEL;
use fm_core::{Capabilities, DataMap, Error, EvalContext, LikelihoodModule, Result, Value};
use statrs::function::gamma::ln_gamma;
use std::any::Any;

/// Poisson likelihood over observed bin counts.
#[derive(Debug, Clone)]
pub struct PoissonCountsLikelihood {
    /// Observed event counts per bin.
    counts: Vec<u64>,
    /// Conversion from signal band power to expected counts.
    exposure: f64,
    /// ln(n_i!) per bin, filled by `setup`.
    ln_factorials: Vec<f64>,
}

impl PoissonCountsLikelihood {
    /// Create a Poisson likelihood from observed counts and an exposure
    /// factor converting signal band power into expected counts.
    pub fn new(counts: Vec<u64>, exposure: f64) -> Result<Self> {
        if counts.is_empty() {
            return Err(Error::Validation("at least one count bin required".into()));
        }
        if !exposure.is_finite() || exposure <= 0.0 {
            return Err(Error::Validation(format!(
                "exposure must be finite and > 0, got {}",
                exposure
            )));
        }
        Ok(Self { counts, exposure, ln_factorials: Vec::new() })
    }
}

/// Equality is over configuration; the setup-derived factorial table is not
/// compared.
impl PartialEq for PoissonCountsLikelihood {
    fn eq(&self, other: &Self) -> bool {
        self.counts == other.counts && self.exposure == other.exposure
    }
}

impl LikelihoodModule for PoissonCountsLikelihood {
    fn name(&self) -> &str {
        "poisson_counts"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::SETUP_AND_STORE
    }

    fn setup(&mut self) -> Result<()> {
        self.ln_factorials = self.counts.iter().map(|&n| ln_gamma(n as f64 + 1.0)).collect();
        Ok(())
    }

    fn reduce_data(&self, ctx: &EvalContext<'_>) -> Result<DataMap> {
        let signal = match ctx.get(KEY_SIGNAL).or_else(|| ctx.get(KEY_MODEL)) {
            Some(value) => value
                .as_vector()
                .ok_or_else(|| Error::Computation(format!("`{}` must be a vector", KEY_SIGNAL)))?,
            None => return Err(Error::MissingData(KEY_SIGNAL.to_string())),
        };
        if signal.len() != self.counts.len() {
            return Err(Error::Computation(format!(
                "signal length {} does not match {} count bins",
                signal.len(),
                self.counts.len()
            )));
        }

        let mut expected = Vec::with_capacity(signal.len());
        for (i, &s) in signal.iter().enumerate() {
            let lambda = self.exposure * s;
            if !lambda.is_finite() || lambda <= 0.0 {
                return Err(Error::ParameterRegion(format!(
                    "expected counts must be finite and > 0, got {} in bin {}",
                    lambda, i
                )));
            }
            expected.push(lambda);
        }

        let mut model = DataMap::new();
        model.insert("expected_counts".to_string(), Value::Vector(expected));
        Ok(model)
    }

    fn store(&self, model: &DataMap, blobs: &mut DataMap) -> Result<()> {
        let value = model
            .get("expected_counts")
            .cloned()
            .ok_or_else(|| Error::MissingData("expected_counts".to_string()))?;
        blobs.insert("expected_counts".to_string(), value);
        Ok(())
    }

    fn compute_likelihood(&self, model: &DataMap) -> Result<f64> {
        if self.ln_factorials.len() != self.counts.len() {
            return Err(Error::Computation(
                "ln-factorial table is empty; setup has not run".into(),
            ));
        }
        let expected = model
            .get("expected_counts")
            .and_then(|v| v.as_vector())
            .ok_or_else(|| Error::MissingData("expected_counts".to_string()))?;
        if expected.len() != self.counts.len() {
            return Err(Error::Computation(format!(
                "expected counts length {} does not match {} count bins",
                expected.len(),
                self.counts.len()
            )));
        }

        let mut lnl = 0.0;
        for i in 0..self.counts.len() {
            let n = self.counts[i] as f64;
            lnl += n * expected[i].ln() - expected[i] - self.ln_factorials[i];
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
