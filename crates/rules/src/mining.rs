//! Frequent-itemset mining over preference signatures.

use crate::patterns::{FrequentPatterns, Itemset, mask_of};
use crate::preferences::Signatures;
use data_loader::Genre;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument};

/// Mines frequent genre itemsets from signatures.
///
/// Implementations must be deterministic for identical input.
pub trait PatternMiner: Send + Sync {
    /// Returns the name of this miner (for logging)
    fn name(&self) -> &str;

    /// Mine every itemset whose support is at least `min_support`
    fn mine(&self, transactions: &Signatures, min_support: f64) -> FrequentPatterns;
}

/// Level-wise Apriori over the genre vocabulary.
///
/// Each transaction is a bitmask of preferred genres, so subset tests are a
/// single AND.
#[derive(Debug, Clone, Default)]
pub struct AprioriMiner {
    max_len: Option<usize>,
}

impl AprioriMiner {
    pub fn new() -> Self {
        Self { max_len: None }
    }

    /// Stop after itemsets of this size (default: no limit)
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = Some(max_len);
        self
    }

    fn count(transactions: &[u32], candidates: &BTreeSet<u32>) -> Vec<(u32, usize)> {
        candidates
            .par_iter()
            .map(|&candidate| {
                let count = transactions
                    .iter()
                    .filter(|&&t| t & candidate == candidate)
                    .count();
                (candidate, count)
            })
            .collect()
    }

    /// Join frequent (k-1)-itemsets into k-candidates whose every
    /// (k-1)-subset is frequent.
    fn next_candidates(frequent: &BTreeSet<u32>, k: u32) -> BTreeSet<u32> {
        let level: Vec<u32> = frequent.iter().copied().collect();
        let mut candidates = BTreeSet::new();

        for (i, &a) in level.iter().enumerate() {
            for &b in &level[i + 1..] {
                let union = a | b;
                if union.count_ones() != k || candidates.contains(&union) {
                    continue;
                }
                let closed = (0..Genre::ALL.len())
                    .map(|bit| 1u32 << bit)
                    .filter(|bit| union & bit != 0)
                    .all(|bit| frequent.contains(&(union & !bit)));
                if closed {
                    candidates.insert(union);
                }
            }
        }
        candidates
    }
}

impl PatternMiner for AprioriMiner {
    fn name(&self) -> &str {
        "AprioriMiner"
    }

    #[instrument(skip(self, transactions), fields(users = transactions.len()))]
    fn mine(&self, transactions: &Signatures, min_support: f64) -> FrequentPatterns {
        let n = transactions.len();
        if n == 0 {
            return FrequentPatterns::default();
        }

        let masks: Vec<u32> = transactions.iter().map(|(_, g)| mask_of(g)).collect();
        let max_len = self.max_len.unwrap_or(Genre::ALL.len());

        let mut found: BTreeMap<Itemset, f64> = BTreeMap::new();
        let mut candidates: BTreeSet<u32> = Genre::ALL.iter().map(|g| 1u32 << g.index()).collect();
        let mut k = 1;

        while !candidates.is_empty() && k <= max_len {
            let mut frequent = BTreeSet::new();

            for (mask, count) in Self::count(&masks, &candidates) {
                let support = count as f64 / n as f64;
                if count == 0 || support < min_support {
                    continue;
                }
                if let Some(itemset) = Itemset::from_mask(mask) {
                    found.insert(itemset, support);
                    frequent.insert(mask);
                }
            }

            debug!("Level {}: {} frequent itemsets", k, frequent.len());
            k += 1;
            candidates = Self::next_candidates(&frequent, k as u32);
        }

        info!(
            "Mined {} frequent itemsets from {} signatures",
            found.len(),
            n
        );
        FrequentPatterns::new(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn itemset(genres: &[Genre]) -> Itemset {
        Itemset::new(genres.iter().copied()).unwrap()
    }

    fn create_signatures() -> Signatures {
        Signatures::from_pairs([
            (1, vec![Genre::Comedy, Genre::Romance]),
            (2, vec![Genre::Comedy]),
            (3, vec![Genre::Comedy, Genre::Romance, Genre::Drama]),
            (4, vec![Genre::Drama]),
            (5, vec![]),
        ])
    }

    #[test]
    fn test_support_is_fraction_of_all_signatures() {
        let patterns = AprioriMiner::new().mine(&create_signatures(), 0.0);

        assert_eq!(patterns.support(&itemset(&[Genre::Comedy])), Some(0.6));
        assert_eq!(patterns.support(&itemset(&[Genre::Drama])), Some(0.4));
        assert_eq!(
            patterns.support(&itemset(&[Genre::Comedy, Genre::Romance])),
            Some(0.4)
        );
        assert_eq!(
            patterns.support(&itemset(&[Genre::Comedy, Genre::Drama, Genre::Romance])),
            Some(0.2)
        );
    }

    #[test]
    fn test_unseen_itemsets_are_not_reported() {
        let patterns = AprioriMiner::new().mine(&create_signatures(), 0.0);
        assert_eq!(patterns.support(&itemset(&[Genre::Western])), None);
        assert_eq!(patterns.len(), 7);
    }

    #[test]
    fn test_min_support_prunes() {
        let patterns = AprioriMiner::new().mine(&create_signatures(), 0.5);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns.support_by_key("Comedy"), Some(0.6));
    }

    #[test]
    fn test_support_is_monotone() {
        let patterns = AprioriMiner::new().mine(&create_signatures(), 0.0);
        for (pattern, support) in patterns.iter() {
            for &genre in pattern.genres() {
                if let Some(subset) = pattern.without(genre) {
                    let subset_support = patterns.support(&subset).unwrap();
                    assert!(subset_support >= support);
                }
            }
        }
    }

    #[test]
    fn test_max_len_limits_levels() {
        let patterns = AprioriMiner::new()
            .with_max_len(1)
            .mine(&create_signatures(), 0.0);
        assert!(patterns.iter().all(|(p, _)| p.len() == 1));
    }

    #[test]
    fn test_empty_transactions() {
        let patterns = AprioriMiner::new().mine(&Signatures::default(), 0.01);
        assert!(patterns.is_empty());
    }
}
