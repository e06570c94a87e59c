//! Per-user genre preference signatures.
//!
//! ## Algorithm
//! 1. Keep only ratings >= `preference_rating_threshold`
//! 2. Each kept rating spreads weight `1 / |genres(movie)|` over the movie's genres
//! 3. Normalize each user's weights to sum to 1
//! 4. A genre is preferred if its normalized weight >= `preference_threshold`
//!
//! Ratings for movies missing from the genre table, or movies without any
//! genre, contribute nothing. Users left with no weight at all are dropped.

use data_loader::{DataIndex, Genre, Rating, UserId};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Binarized genre preferences for every user that has any
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signatures {
    by_user: BTreeMap<UserId, Vec<Genre>>,
}

impl Signatures {
    /// Build signatures from explicit (user, preferred genres) pairs
    pub fn from_pairs(pairs: impl IntoIterator<Item = (UserId, Vec<Genre>)>) -> Self {
        let by_user = pairs
            .into_iter()
            .map(|(user, mut genres)| {
                genres.sort();
                genres.dedup();
                (user, genres)
            })
            .collect();
        Self { by_user }
    }

    /// Preferred genres of a user, sorted
    pub fn get(&self, user_id: UserId) -> Option<&[Genre]> {
        self.by_user.get(&user_id).map(|g| g.as_slice())
    }

    /// Iterate users in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = (UserId, &[Genre])> {
        self.by_user.iter().map(|(&u, g)| (u, g.as_slice()))
    }

    /// Number of users (transactions), including users with no preferred genre
    pub fn len(&self) -> usize {
        self.by_user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_user.is_empty()
    }
}

/// Extracts `Signatures` from a rating history
#[derive(Debug, Clone)]
pub struct PreferenceExtractor {
    preference_rating_threshold: f32,
    preference_threshold: f64,
}

impl PreferenceExtractor {
    /// Create an extractor with the default thresholds (4.0 and 0.05)
    pub fn new() -> Self {
        Self {
            preference_rating_threshold: 4.0,
            preference_threshold: 0.05,
        }
    }

    /// Minimum rating for a rating to count as a preference (default: 4.0)
    pub fn with_rating_threshold(mut self, threshold: f32) -> Self {
        self.preference_rating_threshold = threshold;
        self
    }

    /// Minimum normalized weight for a genre to be preferred (default: 0.05)
    pub fn with_preference_threshold(mut self, threshold: f64) -> Self {
        self.preference_threshold = threshold;
        self
    }

    /// Extract a signature for every user in the index
    #[instrument(skip(self, index))]
    pub fn extract(&self, index: &DataIndex) -> Signatures {
        let users: Vec<(UserId, &[Rating])> = index.users().collect();

        let by_user: BTreeMap<UserId, Vec<Genre>> = users
            .par_iter()
            .filter_map(|&(user_id, ratings)| {
                self.signature(index, ratings).map(|genres| (user_id, genres))
            })
            .collect();

        debug!(
            "Extracted {} signatures from {} users",
            by_user.len(),
            users.len()
        );
        Signatures { by_user }
    }

    /// Preferred genres for one user, or `None` if they accumulated no weight
    fn signature(&self, index: &DataIndex, ratings: &[Rating]) -> Option<Vec<Genre>> {
        let mut weights = [0.0f64; Genre::ALL.len()];

        for rating in ratings {
            if rating.rating < self.preference_rating_threshold {
                continue;
            }
            let Some(movie) = index.get_movie(rating.movie_id) else {
                continue;
            };
            if movie.genres.is_empty() {
                continue;
            }
            let share = 1.0 / movie.genres.len() as f64;
            for genre in &movie.genres {
                weights[genre.index()] += share;
            }
        }

        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return None;
        }

        Some(
            Genre::ALL
                .into_iter()
                .filter(|g| weights[g.index()] / total >= self.preference_threshold)
                .collect(),
        )
    }
}

impl Default for PreferenceExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::Movie;

    fn movie(id: u32, genres: Vec<Genre>) -> Movie {
        Movie {
            id,
            title: format!("Movie {}", id),
            year: None,
            genres,
        }
    }

    fn rating(user_id: u32, movie_id: u32, rating: f32) -> Rating {
        Rating {
            user_id,
            movie_id,
            rating,
            timestamp: 0,
        }
    }

    fn create_test_index() -> DataIndex {
        DataIndex::from_parts(
            vec![
                movie(1, vec![Genre::Comedy]),
                movie(2, vec![Genre::Comedy, Genre::Romance]),
                movie(3, vec![Genre::Action, Genre::Adventure, Genre::SciFi, Genre::Thriller]),
                movie(4, vec![]),
            ],
            vec![
                // User 1: comedy 1.5, romance 0.5
                rating(1, 1, 5.0),
                rating(1, 2, 4.0),
                rating(1, 3, 2.0),
                // User 2: only low ratings
                rating(2, 1, 3.0),
                // User 3: only a movie missing from the genre table
                rating(3, 99, 5.0),
                // User 4: only a genre-less movie
                rating(4, 4, 5.0),
                // User 5: action-heavy
                rating(5, 3, 4.5),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_weights_are_split_across_genres() {
        let index = create_test_index();
        let signatures = PreferenceExtractor::new()
            .with_preference_threshold(0.3)
            .extract(&index);

        // comedy 0.75, romance 0.25
        assert_eq!(signatures.get(1), Some(&[Genre::Comedy][..]));
    }

    #[test]
    fn test_low_threshold_keeps_every_touched_genre() {
        let index = create_test_index();
        let signatures = PreferenceExtractor::new().extract(&index);

        assert_eq!(signatures.get(1), Some(&[Genre::Comedy, Genre::Romance][..]));
        assert_eq!(
            signatures.get(5),
            Some(&[Genre::Action, Genre::Adventure, Genre::SciFi, Genre::Thriller][..])
        );
    }

    #[test]
    fn test_users_without_weight_are_skipped() {
        let index = create_test_index();
        let signatures = PreferenceExtractor::new().extract(&index);

        assert!(signatures.get(2).is_none());
        assert!(signatures.get(3).is_none());
        assert!(signatures.get(4).is_none());
        assert_eq!(signatures.len(), 2);
    }

    #[test]
    fn test_signature_may_be_empty() {
        let index = create_test_index();
        // Every normalized weight of user 5 is 0.25
        let signatures = PreferenceExtractor::new()
            .with_preference_threshold(0.3)
            .extract(&index);
        assert_eq!(signatures.get(5), Some(&[][..]));
    }

    #[test]
    fn test_rating_threshold_is_inclusive() {
        let index = create_test_index();
        let signatures = PreferenceExtractor::new()
            .with_rating_threshold(3.0)
            .extract(&index);
        assert_eq!(signatures.get(2), Some(&[Genre::Comedy][..]));
    }

    #[test]
    fn test_from_pairs_sorts_and_dedups() {
        let signatures =
            Signatures::from_pairs([(7, vec![Genre::Romance, Genre::Comedy, Genre::Romance])]);
        assert_eq!(signatures.get(7), Some(&[Genre::Comedy, Genre::Romance][..]));
    }
}
