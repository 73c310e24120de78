//! Error types for the fmchain workspace.

use thiserror::Error;

/// Workspace-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),

    /// A parameter vector landed outside the simulator's valid operating regime.
    ///
    /// This is the one recoverable domain condition: the chain converts it
    /// into a rejection (`-inf` log-likelihood, empty blobs) instead of
    /// failing the sampling run.
    #[error("invalid parameter region: {0}")]
    ParameterRegion(String),

    /// A module asked the evaluation context for a key no earlier module produced.
    #[error("missing data entry `{0}`")]
    MissingData(String),
}

impl Error {
    /// True for the recoverable invalid-parameter-region condition.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Error::ParameterRegion(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
