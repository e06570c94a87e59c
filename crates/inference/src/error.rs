//! Errors raised while parsing or evaluating a logic program.

use thiserror::Error;

/// Errors that can occur when evaluating queries against a program
#[derive(Error, Debug)]
pub enum InferenceError {
    /// A clause in the program text could not be parsed
    #[error("Parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    /// A rule weight or fact probability outside [0, 1]
    #[error("Invalid probability {value} at line {line}")]
    InvalidProbability { line: usize, value: f64 },

    /// Proof search went deeper than the configured limit
    #[error("Maximum proof depth {0} exceeded")]
    DepthExceeded(usize),

    /// The engine failed for a reason of its own
    #[error("Inference engine failure: {0}")]
    Engine(String),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, InferenceError>;
