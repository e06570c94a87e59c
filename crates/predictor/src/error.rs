//! Error types for the predictor crate.
//!
//! Only structural failures live here. A batch that fails during inference
//! is not an error of `predict`; it is reported as a `BatchFailure`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by `fit` / `predict`
#[derive(Error, Debug)]
pub enum PredictError {
    /// A configuration value is outside its domain
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Queries cannot be split into empty batches
    #[error("Batch size must be at least 1")]
    InvalidBatchSize,

    /// The worker pool needs at least one worker
    #[error("Worker count must be at least 1, got {0}")]
    InvalidWorkerCount(usize),

    /// The worker pool could not be started
    #[error("Failed to build worker pool: {0}")]
    WorkerPool(String),

    /// `predict` was called before `fit`
    #[error("Recommender has not been fitted")]
    NotFitted,

    /// `query.pl` could not be written next to the program
    #[error("Failed to write query file {path}: {source}")]
    QueryFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input data was rejected
    #[error(transparent)]
    Data(#[from] data_loader::DataLoadError),

    /// Program artifacts could not be written or read back
    #[error(transparent)]
    Rules(#[from] rules::RuleError),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, PredictError>;
