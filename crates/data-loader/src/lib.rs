//! # Data Loader Crate
//!
//! Loads and indexes a MovieLens dataset (`movies.dat`, `ratings.dat`).
//!
//! ## Main Components
//!
//! - **types**: Core domain types (Movie, Rating, Genre, DataIndex, ItemRatingStats)
//! - **parser**: Parse .dat files into Rust structs
//! - **index**: Build indices and rating statistics
//! - **split**: Seeded train/test split
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::DataIndex;
//! use std::path::Path;
//!
//! let index = DataIndex::load_from_files(Path::new("data/ml-1m"))?;
//! let movie = index.get_movie(1193).unwrap();
//! let stats = index.get_item_stats(1193);
//! ```

pub mod error;
pub mod index;
pub mod parser;
pub mod split;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{DataLoadError, Result};
pub use index::RATING_RANGE;
pub use split::split_ratings;
pub use types::{DataIndex, Genre, ItemRatingStats, Movie, MovieId, Rating, UserId};
