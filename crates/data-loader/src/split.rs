//! Random train/test split of a rating table.

use crate::error::{DataLoadError, Result};
use crate::types::Rating;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Shuffle `ratings` with a seeded RNG and cut off `test_fraction` of them
/// as the test set. Returns `(train, test)`.
///
/// The same seed always yields the same split.
pub fn split_ratings(
    mut ratings: Vec<Rating>,
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<Rating>, Vec<Rating>)> {
    if !(0.0..1.0).contains(&test_fraction) {
        return Err(DataLoadError::ValidationError(format!(
            "test fraction must be in [0, 1), got {}",
            test_fraction
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    ratings.shuffle(&mut rng);

    let test_len = (ratings.len() as f64 * test_fraction).ceil() as usize;
    let test = ratings.split_off(ratings.len() - test_len);
    Ok((ratings, test))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratings(n: u32) -> Vec<Rating> {
        (0..n)
            .map(|i| Rating {
                user_id: i,
                movie_id: i,
                rating: 3.0,
                timestamp: 0,
            })
            .collect()
    }

    #[test]
    fn test_split_sizes() {
        let (train, test) = split_ratings(ratings(100), 0.2, 42).unwrap();
        assert_eq!(train.len(), 80);
        assert_eq!(test.len(), 20);
    }

    #[test]
    fn test_split_is_deterministic() {
        let (_, a) = split_ratings(ratings(50), 0.3, 7).unwrap();
        let (_, b) = split_ratings(ratings(50), 0.3, 7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_split_rejects_bad_fraction() {
        assert!(split_ratings(ratings(10), 1.5, 0).is_err());
    }
}
