//! Accuracy of predicted ratings against held-out ratings.

use crate::recommender::Predictions;
use data_loader::{MovieId, Rating, UserId};
use serde::Serialize;
use std::collections::HashMap;

/// Error metrics over the rows that have both a prediction and a truth
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AccuracyReport {
    pub rmse: f64,
    pub mae: f64,
    pub n_predictions: usize,
    /// Rows without a rating (failed or unresolved inference)
    pub n_missing: usize,
}

/// Compare predictions with actual ratings, joined on (user, movie).
///
/// RMSE and MAE are NaN when no row could be scored.
pub fn evaluate(actual: &[Rating], predictions: &Predictions) -> AccuracyReport {
    let truth: HashMap<(UserId, MovieId), f64> = actual
        .iter()
        .map(|r| ((r.user_id, r.movie_id), r.rating as f64))
        .collect();

    let mut squared = 0.0;
    let mut absolute = 0.0;
    let mut n_predictions = 0;
    let mut n_missing = 0;

    for row in &predictions.rows {
        let Some(predicted) = row.rating else {
            n_missing += 1;
            continue;
        };
        let Some(&expected) = truth.get(&(row.user_id, row.movie_id)) else {
            continue;
        };
        let error = predicted - expected;
        squared += error * error;
        absolute += error.abs();
        n_predictions += 1;
    }

    let n = n_predictions as f64;
    AccuracyReport {
        rmse: (squared / n).sqrt(),
        mae: absolute / n,
        n_predictions,
        n_missing,
    }
}
