//! Error types for the rules crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while persisting or reloading a compiled program
#[derive(Error, Debug)]
pub enum RuleError {
    /// An artifact could not be read or written
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A reloaded artifact is not a valid program
    #[error("Invalid program in {path}: {source}")]
    InvalidProgram {
        path: PathBuf,
        #[source]
        source: inference::InferenceError,
    },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, RuleError>;
