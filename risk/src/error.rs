//! Error types for the copula risk engine

use thiserror::Error;

/// Errors that abort a risk analysis
///
/// Degraded-but-defined paths (clamped Cholesky pivots, zero-variance assets,
/// Archimedean models on more than two assets) are not errors; they surface
/// as [`RiskWarning`](crate::RiskWarning)s on the report.
#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("Invalid confidence level: {0} (must be strictly between 0 and 100)")]
    InvalidConfidenceLevel(f64),

    #[error("Invalid time horizon: {0} (must be positive)")]
    InvalidTimeHorizon(u32),

    #[error("Asset {asset} has {actual} observations, expected {expected}")]
    MisalignedSeries {
        asset: String,
        expected: usize,
        actual: usize,
    },

    #[error("Expected {expected} weights (one per asset), got {actual}")]
    WeightCountMismatch { expected: usize, actual: usize },

    #[error("Matrix is not positive semi-definite: pivot {row} has radicand {value:.3e}")]
    NotPositiveSemiDefinite { row: usize, value: f64 },

    #[error("Simulation cancelled after {completed} trials")]
    Cancelled { completed: usize },

    #[error("Failed to parse configuration: {0}")]
    Config(String),

    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

pub type Result<T> = std::result::Result<T, RiskError>;
