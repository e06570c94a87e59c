//! # Predictor Crate
//!
//! Fits the rule pipeline and turns inference results into ratings.
//!
//! ## Components
//!
//! - `BatchScheduler`: partitions queries into batches, evaluates them on a
//!   fixed worker pool and restores the caller's order by (user, movie)
//! - `RatingCalibrator`: probability -> rating through the item's
//!   empirical Normal(mean, std) quantile
//! - `MlnRecommender`: `fit` / `predict` facade over every stage
//! - `evaluate`: RMSE / MAE against held-out ratings
//!
//! ## Example Usage
//!
//! ```ignore
//! use predictor::{MlnConfig, MlnRecommender, PredictOptions};
//!
//! let mut recommender = MlnRecommender::new(MlnConfig::default())?;
//! recommender.fit(train, movies, Path::new("artifacts"))?;
//!
//! let predictions = recommender.predict(&queries, &PredictOptions::default().with_batch_size(500))?;
//! for failure in &predictions.failures {
//!     eprintln!("batch {} failed: {}", failure.batch, failure.cause);
//! }
//! ```

pub mod calibrator;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod recommender;
pub mod scheduler;

// Re-export commonly used types
pub use calibrator::{RatingCalibrator, inverse_normal_cdf};
pub use config::{MlnConfig, PredictOptions};
pub use error::{PredictError, Result};
pub use evaluation::{AccuracyReport, evaluate};
pub use recommender::{FittedModel, MlnRecommender, PredictionRow, Predictions};
pub use scheduler::{BatchFailure, BatchOutcome, BatchScheduler, ScheduledResults, evaluate_batch};
