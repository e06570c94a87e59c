//! DataIndex building and indexing logic.
//!
//! - Create primary indices (movies, ratings by user and by movie)
//! - Compute per-item and global rating statistics

use crate::error::{DataLoadError, Result};
use crate::parser;
use crate::types::*;
use rayon::prelude::*;
use std::path::Path;
use tracing::info;

/// Lowest and highest rating MovieLens hands out
pub const RATING_RANGE: (f32, f32) = (0.5, 5.0);

impl DataIndex {
    /// Load the MovieLens dataset from a directory holding movies.dat and
    /// ratings.dat.
    pub fn load_from_files(data_dir: &Path) -> Result<Self> {
        info!("Loading MovieLens dataset from {:?}", data_dir);

        let movies_path = data_dir.join("movies.dat");
        let ratings_path = data_dir.join("ratings.dat");

        // Both files are independent, parse them in parallel
        let (movies, ratings) = rayon::join(
            || parser::parse_movies(&movies_path),
            || parser::parse_ratings(&ratings_path),
        );
        let movies = movies?;
        let ratings = ratings?;

        info!("Loaded {} movies, {} ratings", movies.len(), ratings.len());

        let index = Self::from_parts(movies, ratings)?;
        info!("DataIndex successfully built and validated");
        Ok(index)
    }

    /// Build an index from already parsed movies and ratings.
    ///
    /// Used directly for train/test splits, where only a subset of the
    /// ratings should feed the statistics.
    pub fn from_parts(movies: Vec<Movie>, ratings: Vec<Rating>) -> Result<Self> {
        let mut index = DataIndex::new();

        for movie in movies {
            index.insert_movie(movie);
        }
        for rating in ratings {
            index.insert_rating(rating);
        }

        index.compute_item_stats();
        index.validate()?;
        Ok(index)
    }

    /// Compute rating statistics for every rated movie, plus the global pair
    pub fn compute_item_stats(&mut self) {
        self.item_stats = self
            .movie_ratings
            .par_iter()
            .map(|(&movie_id, ratings)| {
                (
                    movie_id,
                    ItemRatingStats::from_values(ratings.iter().map(|r| r.rating)),
                )
            })
            .collect();
        self.global_stats = ItemRatingStats::from_values(self.ratings.iter().map(|r| r.rating));
    }

    /// Validate data integrity
    ///
    /// Ratings must fall inside [`RATING_RANGE`]. Ratings for movies missing
    /// from movies.dat are allowed; consumers skip them.
    pub fn validate(&self) -> Result<()> {
        let (low, high) = RATING_RANGE;
        for rating in &self.ratings {
            if !(low..=high).contains(&rating.rating) {
                return Err(DataLoadError::InvalidValue {
                    field: "rating".to_string(),
                    value: rating.rating.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: MovieId, genres: Vec<Genre>) -> Movie {
        Movie {
            id,
            title: format!("Movie {} (2000)", id),
            year: Some(2000),
            genres,
        }
    }

    fn rating(user_id: UserId, movie_id: MovieId, rating: f32) -> Rating {
        Rating {
            user_id,
            movie_id,
            rating,
            timestamp: 0,
        }
    }

    #[test]
    fn test_from_parts_builds_indices() {
        let index = DataIndex::from_parts(
            vec![movie(1, vec![Genre::Action, Genre::Comedy]), movie(2, vec![Genre::Comedy])],
            vec![rating(1, 1, 4.0), rating(1, 2, 3.0), rating(2, 1, 5.0)],
        )
        .unwrap();

        assert_eq!(index.counts(), (2, 2, 3));
        assert_eq!(index.get_movie(1).unwrap().genres, vec![Genre::Action, Genre::Comedy]);

        let stats = index.get_item_stats(1).unwrap();
        assert_eq!(stats.count, 2);
        assert!((stats.mean - 4.5).abs() < 1e-9);
        assert!((index.global_stats().mean - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_ratings_for_unknown_movies_are_kept() {
        let index = DataIndex::from_parts(vec![], vec![rating(1, 99, 4.0)]).unwrap();
        assert!(index.get_movie(99).is_none());
        let users: Vec<(UserId, usize)> = index.users().map(|(u, r)| (u, r.len())).collect();
        assert_eq!(users, vec![(1, 1)]);
    }

    #[test]
    fn test_out_of_range_rating_rejected() {
        let result = DataIndex::from_parts(vec![movie(1, vec![])], vec![rating(1, 1, 7.0)]);
        assert!(matches!(result, Err(DataLoadError::InvalidValue { .. })));
    }

    #[test]
    fn test_load_dataset() {
        // Requires the dataset files under data/ml-1m at the workspace root
        let data_dir = Path::new("../../data/ml-1m");

        if data_dir.exists() {
            let index = DataIndex::load_from_files(data_dir).unwrap();
            let (_, movies, ratings) = index.counts();
            assert_eq!(movies, 3883);
            assert_eq!(ratings, 1000209);
        }
    }
}
