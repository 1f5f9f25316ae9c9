use crate::PageId;
use thiserror::Error;

/// Errors returned by every public coordinator operation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoordinatorError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Clustering error: {0}")]
    Clustering(#[from] ClusteringError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Clustering worker is no longer running")]
    WorkerUnavailable,
}

/// Errors caused by a request that does not fit the current session state.
///
/// `DuplicateId` and `UnknownId` are raised synchronously before anything is
/// enqueued. The matrix errors are raised inside the worker and reach the
/// caller through the completion.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Similarity vector has {actual} values, matrix dimension is {expected}")]
    DimensionMismatch {
        /// Current dimension of the matrix.
        expected: usize,
        /// Length of the supplied vector.
        actual: usize,
    },

    #[error("Index {index} is out of range for dimension {dimension}")]
    IndexOutOfRange { index: usize, dimension: usize },

    #[error("Page {0} is already tracked")]
    DuplicateId(PageId),

    #[error("Page {0} is not tracked")]
    UnknownId(PageId),
}

/// Errors raised by a clustering engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClusteringError {
    #[error("Graph buffer holds {actual} weights, expected {expected}")]
    MalformedGraph { expected: usize, actual: usize },

    #[error("Invalid weight {weight} between {row} and {column}")]
    InvalidWeight {
        row: usize,
        column: usize,
        weight: f64,
    },

    #[error("Partition has {actual} labels for {expected} pages")]
    PartitionLength { expected: usize, actual: usize },
}

/// Errors related to configuration values.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{name} = {value} is out of range")]
    OutOfRange { name: &'static str, value: f64 },
}
