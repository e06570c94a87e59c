//! Probabilistic inference over compiled rule programs.
//!
//! This crate provides:
//! - The `InferenceEngine` trait every engine is driven through
//! - A parser for the weighted-clause syntax (`w::head :- body.`, `fact.`)
//! - `TopDownEngine`, the default in-process engine
//! - `Query` / `ProbabilisticResult` and the `query.pl` artifact
//!
//! ## Example Usage
//! ```ignore
//! use inference::{InferenceEngine, Query, TopDownEngine};
//!
//! let engine = TopDownEngine::new();
//! let results = engine.evaluate(&program_text, &[Query::new(1, 31)])?;
//! ```

pub mod engine;
pub mod error;
pub mod query;
pub mod syntax;

// Re-export main types
pub use engine::{InferenceEngine, KnowledgeBase, TopDownEngine};
pub use error::{InferenceError, Result};
pub use query::{
    LIKES, ProbabilisticResult, QUERY_FILE, Query, movie_term, parse_queries, user_term,
    write_query_file,
};
pub use syntax::{Atom, Clause, Program, Term};
