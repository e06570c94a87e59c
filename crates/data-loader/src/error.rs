//! Error types for the data-loader crate.
//!
//! Everything in here is structural: a file that cannot be read or a line
//! that does not have the shape we expect. These are surfaced to the caller
//! immediately and never retried.

use thiserror::Error;

/// Why a dataset could not be loaded
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// `movies.dat` or `ratings.dat` is missing
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A field could not be converted to its type
    #[error("Parse error at line {line} in {file}: {reason}")]
    ParseError {
        file: String,
        line: usize,
        reason: String,
    },

    /// A well-formed field with a value outside its domain
    /// (unknown genre label, rating outside the rating range)
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// A line without the expected number of `::`-separated columns
    #[error("Expected {expected} fields but found {found} in line {line} of {file}")]
    FieldCountMismatch {
        file: String,
        expected: usize,
        found: usize,
        line: usize,
    },

    /// A caller-supplied argument was rejected
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, DataLoadError>;
