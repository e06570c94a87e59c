//! Fit and predict configuration.

use crate::error::{PredictError, Result};
use serde::{Deserialize, Serialize};

/// Every tunable of `fit` and of rating calibration.
///
/// Missing fields fall back to their defaults when deserialized, so a
/// config file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlnConfig {
    /// Minimum rating that counts toward a preference
    pub preference_rating_threshold: f32,
    /// Minimum normalized genre weight for a genre to be preferred
    pub preference_threshold: f64,
    /// Minimum itemset support kept by the miner
    pub min_support: f64,
    /// Weight of the single-genre world rule
    pub base_probability: f64,
    /// Items with fewer ratings calibrate against global statistics
    pub min_item_ratings: u32,
    pub rating_floor: f64,
    pub rating_ceiling: f64,
}

impl Default for MlnConfig {
    fn default() -> Self {
        Self {
            preference_rating_threshold: 4.0,
            preference_threshold: 0.05,
            min_support: 0.01,
            base_probability: 0.9,
            min_item_ratings: 10,
            rating_floor: 0.5,
            rating_ceiling: 5.0,
        }
    }
}

impl MlnConfig {
    pub fn with_preference_rating_threshold(mut self, threshold: f32) -> Self {
        self.preference_rating_threshold = threshold;
        self
    }

    pub fn with_preference_threshold(mut self, threshold: f64) -> Self {
        self.preference_threshold = threshold;
        self
    }

    pub fn with_min_support(mut self, min_support: f64) -> Self {
        self.min_support = min_support;
        self
    }

    pub fn with_base_probability(mut self, base_probability: f64) -> Self {
        self.base_probability = base_probability;
        self
    }

    pub fn with_min_item_ratings(mut self, min_item_ratings: u32) -> Self {
        self.min_item_ratings = min_item_ratings;
        self
    }

    pub fn with_rating_range(mut self, floor: f64, ceiling: f64) -> Self {
        self.rating_floor = floor;
        self.rating_ceiling = ceiling;
        self
    }

    /// Reject values outside their domain
    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, value: f64| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(PredictError::InvalidConfig(format!(
                    "{} must be in [0, 1], got {}",
                    name, value
                )))
            }
        };

        unit("preference_threshold", self.preference_threshold)?;
        unit("min_support", self.min_support)?;

        if !(self.base_probability > 0.0 && self.base_probability <= 1.0) {
            return Err(PredictError::InvalidConfig(format!(
                "base_probability must be in (0, 1], got {}",
                self.base_probability
            )));
        }
        if !self.preference_rating_threshold.is_finite() {
            return Err(PredictError::InvalidConfig(
                "preference_rating_threshold must be finite".to_string(),
            ));
        }
        if !(self.rating_floor.is_finite()
            && self.rating_ceiling.is_finite()
            && self.rating_floor < self.rating_ceiling)
        {
            return Err(PredictError::InvalidConfig(format!(
                "rating range [{}, {}] is empty",
                self.rating_floor, self.rating_ceiling
            )));
        }
        Ok(())
    }
}

/// Options of a single `predict` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictOptions {
    pub batch_size: usize,
    /// `None` uses one worker per available execution unit
    pub workers: Option<usize>,
}

impl Default for PredictOptions {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            workers: None,
        }
    }
}

impl PredictOptions {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Worker count after applying the default
    pub fn resolved_workers(&self) -> usize {
        self.workers.unwrap_or_else(rayon::current_num_threads)
    }
}
