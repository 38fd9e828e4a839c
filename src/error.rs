//! Error types for the tabprep crate

use thiserror::Error;

/// Result type alias for tabprep operations
pub type Result<T> = std::result::Result<T, TabprepError>;

/// Main error type for the tabprep crate
#[derive(Error, Debug)]
pub enum TabprepError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Transformer not fitted")]
    NotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Class balancing can only handle <= {max} classes, but got {actual}")]
    TooManyClasses { max: usize, actual: usize },

    #[error("Class balancing requires at least 2 classes, but got {actual}")]
    TooFewClasses { actual: usize },

    #[error("Sampling error: {0}")]
    SamplingError(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Thread pool error: {0}")]
    ThreadPoolError(String),
}

impl From<polars::error::PolarsError> for TabprepError {
    fn from(err: polars::error::PolarsError) -> Self {
        TabprepError::DataError(err.to_string())
    }
}
