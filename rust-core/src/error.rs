//! Crate-wide error type

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CostsError {
    /// Caller mistake detected at call time (bad shapes, bad names, bad ranks).
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The spectral solver failed on a window. The solver's own error is kept
    /// as the source without modification.
    #[error("Spectral solver failed on window {window}: {source}")]
    Solver {
        window: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The solver returned arrays that do not fit the pre-allocated result slots.
    #[error("Solver output does not match the fit contract: {0}")]
    SolverOutput(String),

    #[error("Numerical edge case: {0}")]
    NumericalEdgeCase(String),

    #[error("The decomposition must be fit first")]
    NotFitted,

    #[error("The fitted eigenvalues must be clustered first")]
    NotClustered,

    #[error("Fit cancelled before window {window}")]
    Cancelled { window: usize },

    #[error("Failed to (de)serialize dataset: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Dataset I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl CostsError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        CostsError::Configuration(message.into())
    }
}

pub type Result<T> = std::result::Result<T, CostsError>;
