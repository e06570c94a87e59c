//! Core domain types for the MovieLens dataset.
//!
//! This module defines the fundamental data structures used throughout the system:
//! - Type aliases for domain clarity (UserId, MovieId)
//! - The fixed genre vocabulary
//! - Movies, ratings and per-item rating statistics
//! - `DataIndex`, the in-memory store everything else reads from

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

// =============================================================================
// Type Aliases
// =============================================================================
// These make the domain clearer and prevent mixing up user IDs with movie IDs

/// Unique identifier for a user
pub type UserId = u32;

/// Unique identifier for a movie
pub type MovieId = u32;

// =============================================================================
// Movie-related Types
// =============================================================================

/// Represents a movie in the dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    /// Year extracted from title (e.g., "Toy Story (1995)")
    pub year: Option<u16>,
    /// Genres for this movie; empty for "(no genres listed)"
    pub genres: Vec<Genre>,
}

/// Movie genres from MovieLens.
///
/// Variants are declared in the alphabetical order of their labels, so the
/// derived `Ord` sorts genres the same way their labels sort as strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Genre {
    Action,
    Adventure,
    Animation,
    Children,
    Comedy,
    Crime,
    Documentary,
    Drama,
    Fantasy,
    FilmNoir,
    Horror,
    Imax,
    Musical,
    Mystery,
    Romance,
    SciFi,
    Thriller,
    War,
    Western,
}

impl Genre {
    /// The full genre vocabulary, in label order
    pub const ALL: [Genre; 19] = [
        Genre::Action,
        Genre::Adventure,
        Genre::Animation,
        Genre::Children,
        Genre::Comedy,
        Genre::Crime,
        Genre::Documentary,
        Genre::Drama,
        Genre::Fantasy,
        Genre::FilmNoir,
        Genre::Horror,
        Genre::Imax,
        Genre::Musical,
        Genre::Mystery,
        Genre::Romance,
        Genre::SciFi,
        Genre::Thriller,
        Genre::War,
        Genre::Western,
    ];

    /// Position of this genre in `Genre::ALL`
    pub fn index(self) -> usize {
        self as usize
    }

    /// Label as it appears in movies.dat
    pub fn label(self) -> &'static str {
        match self {
            Genre::Action => "Action",
            Genre::Adventure => "Adventure",
            Genre::Animation => "Animation",
            Genre::Children => "Children",
            Genre::Comedy => "Comedy",
            Genre::Crime => "Crime",
            Genre::Documentary => "Documentary",
            Genre::Drama => "Drama",
            Genre::Fantasy => "Fantasy",
            Genre::FilmNoir => "Film-Noir",
            Genre::Horror => "Horror",
            Genre::Imax => "IMAX",
            Genre::Musical => "Musical",
            Genre::Mystery => "Mystery",
            Genre::Romance => "Romance",
            Genre::SciFi => "Sci-Fi",
            Genre::Thriller => "Thriller",
            Genre::War => "War",
            Genre::Western => "Western",
        }
    }

    /// Constant used for this genre inside a logic program.
    ///
    /// Lowercase, with `-` replaced by `_` so the result is a plain atom.
    pub fn atom(self) -> String {
        self.label().to_lowercase().replace('-', "_")
    }

    /// Parse a movies.dat label. `Children's` is the ml-1m spelling.
    pub fn from_label(s: &str) -> Option<Genre> {
        let genre = match s {
            "Action" => Genre::Action,
            "Adventure" => Genre::Adventure,
            "Animation" => Genre::Animation,
            "Children" | "Children's" => Genre::Children,
            "Comedy" => Genre::Comedy,
            "Crime" => Genre::Crime,
            "Documentary" => Genre::Documentary,
            "Drama" => Genre::Drama,
            "Fantasy" => Genre::Fantasy,
            "Film-Noir" => Genre::FilmNoir,
            "Horror" => Genre::Horror,
            "IMAX" => Genre::Imax,
            "Musical" => Genre::Musical,
            "Mystery" => Genre::Mystery,
            "Romance" => Genre::Romance,
            "Sci-Fi" => Genre::SciFi,
            "Thriller" => Genre::Thriller,
            "War" => Genre::War,
            "Western" => Genre::Western,
            _ => return None,
        };
        Some(genre)
    }

    /// Inverse of [`Genre::atom`]
    pub fn from_atom(s: &str) -> Option<Genre> {
        Genre::ALL.into_iter().find(|g| g.atom() == s)
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Rating Type
// =============================================================================

/// Represents a single rating from a user for a movie
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub movie_id: MovieId,
    /// Rating value from 0.5 to 5.0
    pub rating: f32,
    /// Unix timestamp when rating was made
    pub timestamp: i64,
}

// =============================================================================
// Statistics Types
// =============================================================================

/// Empirical rating distribution of one movie (or of the whole dataset)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemRatingStats {
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator), 0.0 below two ratings
    pub std_dev: f64,
    pub count: u32,
}

impl ItemRatingStats {
    /// Compute mean / sample std / count over a set of rating values
    pub fn from_values(values: impl Iterator<Item = f32> + Clone) -> Self {
        let (sum, count) = values
            .clone()
            .fold((0.0f64, 0u32), |(s, n), v| (s + v as f64, n + 1));
        if count == 0 {
            return Self {
                mean: 0.0,
                std_dev: 0.0,
                count: 0,
            };
        }
        let mean = sum / count as f64;
        let std_dev = if count < 2 {
            0.0
        } else {
            let sq: f64 = values.map(|v| (v as f64 - mean).powi(2)).sum();
            (sq / (count - 1) as f64).sqrt()
        };
        Self {
            mean,
            std_dev,
            count,
        }
    }
}

// =============================================================================
// DataIndex - The Core In-Memory Database
// =============================================================================

/// Main data structure that holds all data and indices.
///
/// Owns the movies and ratings; every getter hands out borrows.
#[derive(Debug)]
pub struct DataIndex {
    // Primary data stores
    pub(crate) movies: BTreeMap<MovieId, Movie>,
    pub(crate) ratings: Vec<Rating>,

    // Rating indices for fast lookups
    /// All ratings made by each user
    pub(crate) user_ratings: HashMap<UserId, Vec<Rating>>,
    /// All ratings received by each movie
    pub(crate) movie_ratings: HashMap<MovieId, Vec<Rating>>,

    // Precomputed statistics
    pub(crate) item_stats: HashMap<MovieId, ItemRatingStats>,
    pub(crate) global_stats: ItemRatingStats,
}

impl DataIndex {
    /// Creates a new, empty DataIndex
    pub fn new() -> Self {
        Self {
            movies: BTreeMap::new(),
            ratings: Vec::new(),
            user_ratings: HashMap::new(),
            movie_ratings: HashMap::new(),
            item_stats: HashMap::new(),
            global_stats: ItemRatingStats {
                mean: 0.0,
                std_dev: 0.0,
                count: 0,
            },
        }
    }

    /// Get a movie by ID
    pub fn get_movie(&self, id: MovieId) -> Option<&Movie> {
        self.movies.get(&id)
    }

    /// Iterate over all movies in ascending id order
    pub fn movies(&self) -> impl Iterator<Item = &Movie> {
        self.movies.values()
    }

    /// All ratings in insertion order
    pub fn ratings(&self) -> &[Rating] {
        &self.ratings
    }

    /// Iterate over every user that rated something, with their ratings
    pub fn users(&self) -> impl Iterator<Item = (UserId, &[Rating])> {
        self.user_ratings
            .iter()
            .map(|(&user_id, ratings)| (user_id, ratings.as_slice()))
    }

    /// Precomputed rating statistics for a movie, if it was ever rated
    pub fn get_item_stats(&self, movie_id: MovieId) -> Option<&ItemRatingStats> {
        self.item_stats.get(&movie_id)
    }

    /// Rating statistics over every rating in the index
    pub fn global_stats(&self) -> ItemRatingStats {
        self.global_stats
    }

    /// Insert a movie into the index
    pub fn insert_movie(&mut self, movie: Movie) {
        self.movies.insert(movie.id, movie);
    }

    /// Insert a rating and update indices
    pub fn insert_rating(&mut self, rating: Rating) {
        self.ratings.push(rating);

        self.user_ratings
            .entry(rating.user_id)
            .or_default()
            .push(rating);

        self.movie_ratings
            .entry(rating.movie_id)
            .or_default()
            .push(rating);
    }

    /// Get counts for debugging/validation: (users, movies, ratings)
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.user_ratings.len(), self.movies.len(), self.ratings.len())
    }
}

impl Default for DataIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genre_order_matches_label_order() {
        let mut labels: Vec<&str> = Genre::ALL.iter().map(|g| g.label()).collect();
        labels.sort();
        let ordered: Vec<&str> = Genre::ALL.iter().map(|g| g.label()).collect();
        assert_eq!(labels, ordered);
    }

    #[test]
    fn test_genre_atoms() {
        assert_eq!(Genre::SciFi.atom(), "sci_fi");
        assert_eq!(Genre::FilmNoir.atom(), "film_noir");
        assert_eq!(Genre::Imax.atom(), "imax");
        assert_eq!(Genre::from_atom("comedy"), Some(Genre::Comedy));
        assert_eq!(Genre::from_atom("sci_fi"), Some(Genre::SciFi));
        assert_eq!(Genre::from_atom("unknown"), None);
    }

    #[test]
    fn test_genre_index_positions() {
        for (i, genre) in Genre::ALL.iter().enumerate() {
            assert_eq!(genre.index(), i);
        }
    }

    #[test]
    fn test_item_stats_sample_std() {
        let stats = ItemRatingStats::from_values([2.0f32, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0].into_iter());
        assert_eq!(stats.count, 8);
        assert!((stats.mean - 5.0).abs() < 1e-9);
        // sum of squares is 32, sample variance 32 / 7
        assert!((stats.std_dev - (32.0f64 / 7.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_item_stats_single_value() {
        let stats = ItemRatingStats::from_values(std::iter::once(3.5f32));
        assert_eq!(stats.count, 1);
        assert_eq!(stats.mean, 3.5);
        assert_eq!(stats.std_dev, 0.0);
    }
}
