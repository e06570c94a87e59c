//! Probability to rating calibration.
//!
//! A liking probability `p` is read as a percentile of the queried movie's
//! historical rating distribution: the rating is the `p`-quantile of
//! Normal(mean, std), clipped to the valid rating range.

use data_loader::{DataIndex, ItemRatingStats, MovieId};

/// Maps probabilities to ratings using per-item statistics
#[derive(Debug, Clone)]
pub struct RatingCalibrator {
    min_item_ratings: u32,
    floor: f64,
    ceiling: f64,
}

impl RatingCalibrator {
    /// Create a calibrator for ratings in [0.5, 5.0], requiring 10 ratings
    /// before an item's own statistics are trusted
    pub fn new() -> Self {
        Self {
            min_item_ratings: 10,
            floor: 0.5,
            ceiling: 5.0,
        }
    }

    pub fn with_min_item_ratings(mut self, min_item_ratings: u32) -> Self {
        self.min_item_ratings = min_item_ratings;
        self
    }

    pub fn with_rating_range(mut self, floor: f64, ceiling: f64) -> Self {
        self.floor = floor;
        self.ceiling = ceiling;
        self
    }

    /// Item statistics, or the global pair for sparse or unseen items
    pub fn stats_for(&self, index: &DataIndex, movie_id: MovieId) -> ItemRatingStats {
        index
            .get_item_stats(movie_id)
            .filter(|stats| stats.count >= self.min_item_ratings)
            .copied()
            .unwrap_or_else(|| index.global_stats())
    }

    /// Rating for probability `p`; `None` if `p` is NaN
    pub fn calibrate(&self, probability: f64, stats: &ItemRatingStats) -> Option<f64> {
        if probability.is_nan() {
            return None;
        }
        let p = probability.clamp(0.0, 1.0);

        // The quantile is -inf / +inf at the ends
        let rating = if p <= 0.0 {
            self.floor
        } else if p >= 1.0 {
            self.ceiling
        } else {
            stats.mean + stats.std_dev * inverse_normal_cdf(p)
        };
        Some(rating.clamp(self.floor, self.ceiling))
    }

    /// Calibrate against the statistics of `movie_id` in `index`
    pub fn calibrate_for(&self, index: &DataIndex, movie_id: MovieId, probability: f64) -> Option<f64> {
        self.calibrate(probability, &self.stats_for(index, movie_id))
    }
}

impl Default for RatingCalibrator {
    fn default() -> Self {
        Self::new()
    }
}

// Acklam's rational approximation, relative error below 1.2e-9
const A: [f64; 6] = [
    -3.969683028665376e+01,
    2.209460984245205e+02,
    -2.759285104469687e+02,
    1.383577518672690e+02,
    -3.066479806614716e+01,
    2.506628277459239e+00,
];
const B: [f64; 5] = [
    -5.447609879822406e+01,
    1.615858368580409e+02,
    -1.556989798598866e+02,
    6.680131188771972e+01,
    -1.328068155288572e+01,
];
const C: [f64; 6] = [
    -7.784894002430293e-03,
    -3.223964580411365e-01,
    -2.400758277161838e+00,
    -2.549732539343734e+00,
    4.374664141464968e+00,
    2.938163982698783e+00,
];
const D: [f64; 4] = [
    7.784695709041462e-03,
    3.224671290700398e-01,
    2.445134137142996e+00,
    3.754408661907416e+00,
];
const P_LOW: f64 = 0.02425;

/// Quantile function of the standard normal distribution for `p` in (0, 1)
pub fn inverse_normal_cdf(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}
