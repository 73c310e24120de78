//! Python bindings for fm-chain

use pyo3::IntoPyObjectExt;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;
use pyo3::wrap_pyfunction;

use fm_chain::{BuildOutcome, ChainSpec, LikelihoodChain as RustChain};
use fm_core::{DataMap, Value};

fn value_to_py(py: Python<'_>, value: &Value) -> PyResult<PyObject> {
    match value {
        Value::Scalar(x) => x.into_py_any(py),
        Value::Vector(v) => v.clone().into_py_any(py),
        Value::Matrix(m) => m.clone().into_py_any(py),
    }
}

fn data_to_dict(py: Python<'_>, data: &DataMap) -> PyResult<PyObject> {
    let out = PyDict::new(py);
    for (key, value) in data {
        out.set_item(key, value_to_py(py, value)?)?;
    }
    out.into_py_any(py)
}

/// Python wrapper for LikelihoodChain
#[pyclass(name = "LikelihoodChain")]
struct PyLikelihoodChain {
    inner: RustChain,
}

#[pymethods]
impl PyLikelihoodChain {
    /// Create a chain from a chain-spec JSON string
    #[staticmethod]
    fn from_spec(json_str: &str) -> PyResult<Self> {
        let spec: ChainSpec = serde_json::from_str(json_str)
            .map_err(|e| PyValueError::new_err(format!("Failed to parse chain spec: {}", e)))?;

        let chain = spec
            .build()
            .map_err(|e| PyValueError::new_err(format!("Failed to build chain: {}", e)))?;

        Ok(PyLikelihoodChain { inner: chain })
    }

    /// Number of parameters in the chain schema.
    fn n_params(&self) -> usize {
        self.inner.param_schema().map_or(0, |p| p.len())
    }

    /// Get parameter names in schema order.
    fn parameter_names(&self) -> Vec<String> {
        self.inner
            .param_schema()
            .map_or_else(Vec::new, |p| p.names().into_iter().map(String::from).collect())
    }

    /// Get default parameter values in schema order.
    fn parameter_defaults(&self) -> Vec<f64> {
        self.inner.param_schema().map_or_else(Vec::new, |p| p.values())
    }

    /// Get parameter bounds in schema order.
    fn parameter_bounds(&self) -> Vec<(f64, f64)> {
        self.inner.param_schema().map_or_else(Vec::new, |p| p.bounds())
    }

    /// Run module setup now instead of on the first evaluation.
    fn setup(&mut self) -> PyResult<()> {
        self.inner
            .setup()
            .map_err(|e| PyValueError::new_err(format!("Setup failed: {}", e)))
    }

    /// Whether setup has already run.
    fn is_setup(&self) -> bool {
        self.inner.is_setup()
    }

    /// Evaluate the chain at a parameter vector.
    ///
    /// Returns `(log_likelihood, blobs)`. A rejected proposal yields
    /// `(-inf, {})` rather than raising.
    fn evaluate(&mut self, py: Python<'_>, params: Vec<f64>) -> PyResult<(f64, PyObject)> {
        let evaluation = self
            .inner
            .evaluate(&params)
            .map_err(|e| PyValueError::new_err(format!("Evaluation failed: {}", e)))?;

        let blobs = data_to_dict(py, &evaluation.blobs)?;
        Ok((evaluation.log_likelihood, blobs))
    }

    /// Run the core modules deterministically and return the context data.
    ///
    /// Returns `None` when a module rejects the proposal.
    #[pyo3(signature = (params=None))]
    fn build_model_data(&mut self, py: Python<'_>, params: Option<Vec<f64>>) -> PyResult<PyObject> {
        let outcome = self
            .inner
            .build_model_data(params.as_deref())
            .map_err(|e| PyValueError::new_err(format!("Model build failed: {}", e)))?;

        match outcome {
            BuildOutcome::Accepted(ctx) => data_to_dict(py, ctx.data()),
            BuildOutcome::Rejected(_) => Ok(py.None()),
        }
    }

    /// Run the core modules with stochastic realizations and return the context data.
    ///
    /// Returns `None` when a module rejects the proposal.
    #[pyo3(signature = (params=None, *, seed=0))]
    fn simulate_mock(
        &mut self,
        py: Python<'_>,
        params: Option<Vec<f64>>,
        seed: u64,
    ) -> PyResult<PyObject> {
        let outcome = self
            .inner
            .simulate_mock(params.as_deref(), seed)
            .map_err(|e| PyValueError::new_err(format!("Mock simulation failed: {}", e)))?;

        match outcome {
            BuildOutcome::Accepted(ctx) => data_to_dict(py, ctx.data()),
            BuildOutcome::Rejected(_) => Ok(py.None()),
        }
    }
}

/// Convenience wrapper: create chain from a chain-spec JSON string.
#[pyfunction]
fn from_spec(json_str: &str) -> PyResult<PyLikelihoodChain> {
    PyLikelihoodChain::from_spec(json_str)
}

#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("__version__", fm_core::VERSION)?;

    // Convenience functions.
    m.add_function(wrap_pyfunction!(from_spec, m)?)?;

    // Add classes
    m.add_class::<PyLikelihoodChain>()?;

    Ok(())
}
