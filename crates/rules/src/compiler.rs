//! Compiles mined patterns and signatures into a `LogicProgram`.
//!
//! ## World section
//! - `w::likes(U, M) :- prefers(U, G), has_genre(M, G), has_<i>_genre(M).`
//!   for i in 1..=5 with `w = base_probability / i`, plus one rule for
//!   `has_more_than_5_genre(M)` at `base_probability / 6`
//! - `prefers(user<ID>, <genre>).` for every (user, preferred genre)
//! - `has_<n>_genre(movie<ID>).` and `has_genre(movie<ID>, <genre>).` per movie
//!
//! ## Preference section
//! For every pattern with at least two genres and every `head` in it, the
//! rule `c::prefers(U, head) :- prefers(U, b1), ...` where the body is the
//! pattern minus `head` and `c = support(pattern) / support(body)`. A body
//! whose support was not mined yields no rule.

use crate::patterns::{FrequentPatterns, Itemset};
use crate::preferences::Signatures;
use crate::program::LogicProgram;
use data_loader::{DataIndex, Genre};
use inference::{LIKES, movie_term, user_term};
use tracing::{debug, info, instrument};

/// Genre counts above this share one "more than" bucket
pub const MAX_GENRE_BUCKET: usize = 5;

/// One derived preference rule
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRule {
    pub head: Genre,
    pub body: Itemset,
    pub support: f64,
    pub body_support: f64,
}

impl InferenceRule {
    /// Association-rule confidence, `support(pattern) / support(body)`
    pub fn confidence(&self) -> f64 {
        self.support / self.body_support
    }

    /// Clause text, confidence rounded to two decimals
    pub fn to_clause(&self) -> String {
        let body = self
            .body
            .genres()
            .iter()
            .map(|g| format!("prefers(U, {})", g.atom()))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "{:.2}::prefers(U, {}) :- {}.",
            self.confidence(),
            self.head.atom(),
            body
        )
    }
}

/// Turns patterns and signatures into program text
#[derive(Debug, Clone)]
pub struct RuleCompiler {
    base_probability: f64,
}

impl RuleCompiler {
    /// Create a compiler with `base_probability` 0.9
    pub fn new() -> Self {
        Self {
            base_probability: 0.9,
        }
    }

    /// Weight of the single-genre world rule (default: 0.9)
    pub fn with_base_probability(mut self, base_probability: f64) -> Self {
        self.base_probability = base_probability;
        self
    }

    /// Every (pattern, head) rule whose body support is known, in pattern order
    pub fn derive_rules(&self, patterns: &FrequentPatterns) -> Vec<InferenceRule> {
        let mut rules = Vec::new();
        let mut skipped = 0usize;

        for (pattern, support) in patterns.iter() {
            if pattern.len() < 2 {
                continue;
            }
            for &head in pattern.genres() {
                let Some(body) = pattern.without(head) else {
                    continue;
                };
                match patterns.support(&body) {
                    Some(body_support) if body_support > 0.0 => rules.push(InferenceRule {
                        head,
                        body,
                        support,
                        body_support,
                    }),
                    _ => skipped += 1,
                }
            }
        }

        debug!(
            "Derived {} preference rules ({} without a mined body)",
            rules.len(),
            skipped
        );
        rules
    }

    /// The six genre-count world rules
    pub fn world_rules(&self) -> String {
        let mut out = String::new();
        for i in 1..=MAX_GENRE_BUCKET {
            out.push_str(&self.world_rule(
                self.base_probability / i as f64,
                &format!("has_{}_genre(M)", i),
            ));
        }
        out.push_str(&self.world_rule(
            self.base_probability / (MAX_GENRE_BUCKET + 1) as f64,
            "has_more_than_5_genre(M)",
        ));
        out
    }

    /// Weights print in shortest round-trip form (`0.9`, `0.45`, `0.225`)
    fn world_rule(&self, weight: f64, count_goal: &str) -> String {
        format!(
            "{}::{}(U, M) :- prefers(U, G), has_genre(M, G), {}.\n",
            weight,
            LIKES,
            count_goal
        )
    }

    /// Compile the full program. Output depends only on the inputs.
    #[instrument(skip_all, fields(patterns = patterns.len(), users = signatures.len()))]
    pub fn compile(
        &self,
        patterns: &FrequentPatterns,
        index: &DataIndex,
        signatures: &Signatures,
    ) -> LogicProgram {
        let mut world = self.world_rules();

        for (user_id, genres) in signatures.iter() {
            let user = user_term(user_id);
            for genre in genres {
                world.push_str(&format!("prefers({}, {}).\n", user, genre.atom()));
            }
        }

        for movie in index.movies() {
            let term = movie_term(movie.id);
            match movie.genres.len() {
                0 => {}
                n if n <= MAX_GENRE_BUCKET => {
                    world.push_str(&format!("has_{}_genre({}).\n", n, term));
                }
                _ => world.push_str(&format!("has_more_than_5_genre({}).\n", term)),
            }
            for genre in &movie.genres {
                world.push_str(&format!("has_genre({}, {}).\n", term, genre.atom()));
            }
        }

        let rules = self.derive_rules(patterns);
        let mut preferences = String::new();
        for rule in &rules {
            preferences.push_str(&rule.to_clause());
            preferences.push('\n');
        }

        info!(
            "Compiled program: {} bytes of world clauses, {} preference rules",
            world.len(),
            rules.len()
        );
        LogicProgram::new(world, preferences)
    }
}

impl Default for RuleCompiler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::{Movie, Rating};

    fn itemset(genres: &[Genre]) -> Itemset {
        Itemset::new(genres.iter().copied()).unwrap()
    }

    fn comedy_romance_patterns() -> FrequentPatterns {
        [
            (itemset(&[Genre::Comedy]), 0.40),
            (itemset(&[Genre::Romance]), 0.25),
            (itemset(&[Genre::Comedy, Genre::Romance]), 0.20),
        ]
        .into_iter()
        .collect()
    }

    fn create_test_index() -> DataIndex {
        let movie = |id, genres: Vec<Genre>| Movie {
            id,
            title: format!("Movie {}", id),
            year: None,
            genres,
        };
        DataIndex::from_parts(
            vec![
                movie(2, vec![Genre::Comedy, Genre::Romance]),
                movie(1, vec![Genre::Comedy]),
                movie(3, vec![]),
                movie(
                    4,
                    vec![
                        Genre::Action,
                        Genre::Adventure,
                        Genre::Animation,
                        Genre::Children,
                        Genre::Comedy,
                        Genre::Fantasy,
                    ],
                ),
            ],
            vec![Rating {
                user_id: 1,
                movie_id: 1,
                rating: 5.0,
                timestamp: 0,
            }],
        )
        .unwrap()
    }

    #[test]
    fn test_confidence_rule_from_worked_example() {
        let rules = RuleCompiler::new().derive_rules(&comedy_romance_patterns());
        let clauses: Vec<String> = rules.iter().map(|r| r.to_clause()).collect();

        assert!(clauses.contains(&"0.50::prefers(U, romance) :- prefers(U, comedy).".to_string()));
        assert!(clauses.contains(&"0.80::prefers(U, comedy) :- prefers(U, romance).".to_string()));
        assert_eq!(clauses.len(), 2);
    }

    #[test]
    fn test_confidence_matches_support_ratio() {
        let patterns = comedy_romance_patterns();
        for rule in RuleCompiler::new().derive_rules(&patterns) {
            let mut whole: Vec<Genre> = rule.body.genres().to_vec();
            whole.push(rule.head);
            let support = patterns.support(&itemset(&whole)).unwrap();
            let body_support = patterns.support(&rule.body).unwrap();
            assert!((rule.confidence() - support / body_support).abs() < 1e-12);
        }
    }

    #[test]
    fn test_unknown_body_support_drops_rule() {
        let patterns: FrequentPatterns = [
            (itemset(&[Genre::Comedy]), 0.40),
            (itemset(&[Genre::Comedy, Genre::Romance]), 0.20),
        ]
        .into_iter()
        .collect();

        let rules = RuleCompiler::new().derive_rules(&patterns);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].head, Genre::Romance);
    }

    #[test]
    fn test_single_genre_patterns_yield_no_rule() {
        let patterns: FrequentPatterns = [(itemset(&[Genre::Drama]), 0.9)].into_iter().collect();
        assert!(RuleCompiler::new().derive_rules(&patterns).is_empty());
    }

    #[test]
    fn test_rules_cover_every_pattern() {
        let patterns: FrequentPatterns = [
            (itemset(&[Genre::Comedy]), 0.5),
            (itemset(&[Genre::Drama]), 0.5),
            (itemset(&[Genre::Romance]), 0.4),
            (itemset(&[Genre::Comedy, Genre::Romance]), 0.2),
            (itemset(&[Genre::Drama, Genre::Romance]), 0.3),
        ]
        .into_iter()
        .collect();

        let rules = RuleCompiler::new().derive_rules(&patterns);
        assert_eq!(rules.len(), 4);
    }

    #[test]
    fn test_multi_genre_body_is_sorted() {
        let patterns: FrequentPatterns = [
            (itemset(&[Genre::Comedy, Genre::Romance]), 0.2),
            (itemset(&[Genre::Comedy, Genre::Drama, Genre::Romance]), 0.1),
        ]
        .into_iter()
        .collect();

        let rules = RuleCompiler::new().derive_rules(&patterns);
        assert_eq!(rules.len(), 1);
        assert_eq!(
            rules[0].to_clause(),
            "0.50::prefers(U, drama) :- prefers(U, comedy), prefers(U, romance)."
        );
    }

    #[test]
    fn test_world_rule_weights() {
        let world = RuleCompiler::new().world_rules();
        let lines: Vec<&str> = world.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(
            lines[0],
            "0.9::likes(U, M) :- prefers(U, G), has_genre(M, G), has_1_genre(M)."
        );
        assert!(lines[1].starts_with("0.45::"));
        assert!(lines[2].starts_with("0.3::"));
        assert!(lines[3].starts_with("0.225::"));
        assert!(lines[4].starts_with("0.18::"));
        assert_eq!(
            lines[5],
            "0.15::likes(U, M) :- prefers(U, G), has_genre(M, G), has_more_than_5_genre(M)."
        );
    }

    #[test]
    fn test_movie_and_preference_facts() {
        let index = create_test_index();
        let signatures = Signatures::from_pairs([(1, vec![Genre::Comedy, Genre::SciFi])]);
        let program = RuleCompiler::new().compile(&comedy_romance_patterns(), &index, &signatures);

        let world = &program.world;
        assert!(world.contains("prefers(user1, comedy).\nprefers(user1, sci_fi).\n"));
        assert!(world.contains("has_1_genre(movie1).\nhas_genre(movie1, comedy).\n"));
        assert!(world.contains(
            "has_2_genre(movie2).\nhas_genre(movie2, comedy).\nhas_genre(movie2, romance).\n"
        ));
        assert!(world.contains("has_more_than_5_genre(movie4).\n"));
        assert!(!world.contains("movie3"));

        // Movies are emitted in id order
        let first = world.find("movie1").unwrap();
        let second = world.find("movie2").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_compile_is_idempotent() {
        let index = create_test_index();
        let signatures = Signatures::from_pairs([
            (1, vec![Genre::Comedy]),
            (2, vec![Genre::Comedy, Genre::Romance]),
        ]);
        let compiler = RuleCompiler::new();
        let patterns = comedy_romance_patterns();

        let first = compiler.compile(&patterns, &index, &signatures);
        let second = compiler.compile(&patterns, &index, &signatures);
        assert_eq!(first.text(), second.text());
    }

    #[test]
    fn test_compiled_program_parses() {
        let index = create_test_index();
        let signatures = Signatures::from_pairs([(1, vec![Genre::Comedy])]);
        let program = RuleCompiler::new().compile(&comedy_romance_patterns(), &index, &signatures);
        assert!(inference::Program::parse(&program.text()).is_ok());
    }

    #[test]
    fn test_world_weights_round_trip_for_any_base() {
        for base in [0.7, 1.0, 0.9] {
            let world = RuleCompiler::new().with_base_probability(base).world_rules();
            let program = inference::Program::parse(&world).unwrap();
            let weights: Vec<f64> = program.clauses.iter().map(|c| c.weight).collect();
            let expected: Vec<f64> = (1..=6).map(|i| base / i as f64).collect();
            assert_eq!(weights, expected);
        }
        let world = RuleCompiler::new().with_base_probability(0.7).world_rules();
        assert!(world.lines().nth(2).unwrap().starts_with("0.2333333333333333::"));
        let world = RuleCompiler::new().with_base_probability(1.0).world_rules();
        assert!(world.starts_with("1::likes(U, M)"));
    }
}
