//! # Rules Crate
//!
//! Turns rating history into a compiled logic program.
//!
//! ## Stages
//!
//! 1. **PreferenceExtractor**: binarized per-user genre signatures
//! 2. **PatternMiner**: frequent genre itemsets with support (`AprioriMiner` by default)
//! 3. **RuleCompiler**: world rules, observed facts and confidence-weighted
//!    preference rules, packaged as a `LogicProgram`
//!
//! ## Example Usage
//!
//! ```ignore
//! use rules::{AprioriMiner, PatternMiner, PreferenceExtractor, RuleCompiler};
//!
//! let signatures = PreferenceExtractor::new().extract(&index);
//! let patterns = AprioriMiner::new().mine(&signatures, 0.01);
//! let program = RuleCompiler::new().compile(&patterns, &index, &signatures);
//! program.write_to(Path::new("artifacts"))?;
//! ```

pub mod compiler;
pub mod error;
pub mod mining;
pub mod patterns;
pub mod preferences;
pub mod program;

// Re-export commonly used types
pub use compiler::{InferenceRule, RuleCompiler};
pub use error::{Result, RuleError};
pub use mining::{AprioriMiner, PatternMiner};
pub use patterns::{FrequentPatterns, Itemset};
pub use preferences::{PreferenceExtractor, Signatures};
pub use program::{LogicProgram, PREFERENCE_FILE, WORLD_FILE};

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::{DataIndex, Genre, Movie, Rating};

    fn create_test_index() -> DataIndex {
        let movies = vec![
            Movie {
                id: 1,
                title: "Funny (1999)".to_string(),
                year: Some(1999),
                genres: vec![Genre::Comedy],
            },
            Movie {
                id: 2,
                title: "Sweet (2001)".to_string(),
                year: Some(2001),
                genres: vec![Genre::Comedy, Genre::Romance],
            },
            Movie {
                id: 3,
                title: "Loud (2005)".to_string(),
                year: Some(2005),
                genres: vec![Genre::Action],
            },
        ];

        let mut ratings = Vec::new();
        for user_id in 1..=10 {
            ratings.push(Rating {
                user_id,
                movie_id: if user_id <= 6 { 1 } else { 3 },
                rating: 5.0,
                timestamp: 0,
            });
            if user_id <= 3 {
                ratings.push(Rating {
                    user_id,
                    movie_id: 2,
                    rating: 4.0,
                    timestamp: 0,
                });
            }
        }
        DataIndex::from_parts(movies, ratings).unwrap()
    }

    #[test]
    fn test_pipeline_stages_compose() {
        let index = create_test_index();

        let signatures = PreferenceExtractor::new().extract(&index);
        assert_eq!(signatures.len(), 10);

        let patterns = AprioriMiner::new().mine(&signatures, 0.1);
        assert_eq!(patterns.support_by_key("Comedy"), Some(0.6));
        assert_eq!(patterns.support_by_key("Comedy Romance"), Some(0.3));

        let program = RuleCompiler::new().compile(&patterns, &index, &signatures);
        assert!(
            program
                .preferences
                .contains("0.50::prefers(U, romance) :- prefers(U, comedy).")
        );
        assert!(inference::Program::parse(&program.text()).is_ok());
    }
}
