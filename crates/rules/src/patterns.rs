//! Frequent genre itemsets and their support.

use data_loader::Genre;
use std::collections::BTreeMap;
use std::fmt;

/// A non-empty, duplicate-free, sorted set of genres
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Itemset(Vec<Genre>);

impl Itemset {
    /// Build an itemset; returns `None` if `genres` is empty
    pub fn new(genres: impl IntoIterator<Item = Genre>) -> Option<Self> {
        let mut genres: Vec<Genre> = genres.into_iter().collect();
        genres.sort();
        genres.dedup();
        if genres.is_empty() {
            None
        } else {
            Some(Self(genres))
        }
    }

    pub(crate) fn from_mask(mask: u32) -> Option<Self> {
        Self::new(
            Genre::ALL
                .into_iter()
                .filter(|g| mask & (1 << g.index()) != 0),
        )
    }

    /// Bit `i` is set when `Genre::ALL[i]` is in the set
    pub fn mask(&self) -> u32 {
        mask_of(&self.0)
    }

    pub fn genres(&self) -> &[Genre] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, genre: Genre) -> bool {
        self.0.binary_search(&genre).is_ok()
    }

    /// The itemset minus one genre; `None` if nothing would remain
    pub fn without(&self, genre: Genre) -> Option<Itemset> {
        Itemset::new(self.0.iter().copied().filter(|&g| g != genre))
    }

    /// Sorted labels joined by a single space, e.g. `"Comedy Romance"`
    pub fn canonical_key(&self) -> String {
        self.0
            .iter()
            .map(|g| g.label())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Parse a canonical key back into an itemset
    pub fn from_key(key: &str) -> Option<Itemset> {
        let genres = key
            .split_whitespace()
            .map(Genre::from_label)
            .collect::<Option<Vec<_>>>()?;
        Itemset::new(genres)
    }
}

impl fmt::Display for Itemset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_key())
    }
}

/// Bitmask of a genre list (see [`Itemset::mask`])
pub fn mask_of(genres: &[Genre]) -> u32 {
    genres.iter().fold(0u32, |m, g| m | (1 << g.index()))
}

/// Mined itemsets with their support, built once per fit and never mutated
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequentPatterns {
    support: BTreeMap<Itemset, f64>,
}

impl FrequentPatterns {
    pub fn new(support: BTreeMap<Itemset, f64>) -> Self {
        Self { support }
    }

    /// Support of an itemset, if it was mined
    pub fn support(&self, itemset: &Itemset) -> Option<f64> {
        self.support.get(itemset).copied()
    }

    /// Support by canonical key (`"Comedy Romance"`)
    pub fn support_by_key(&self, key: &str) -> Option<f64> {
        self.support(&Itemset::from_key(key)?)
    }

    /// Iterate patterns in itemset order
    pub fn iter(&self) -> impl Iterator<Item = (&Itemset, f64)> {
        self.support.iter().map(|(i, &s)| (i, s))
    }

    pub fn len(&self) -> usize {
        self.support.len()
    }

    pub fn is_empty(&self) -> bool {
        self.support.is_empty()
    }
}

impl FromIterator<(Itemset, f64)> for FrequentPatterns {
    fn from_iter<T: IntoIterator<Item = (Itemset, f64)>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_itemset_is_sorted_and_deduplicated() {
        let itemset = Itemset::new([Genre::Romance, Genre::Comedy, Genre::Romance]).unwrap();
        assert_eq!(itemset.genres(), &[Genre::Comedy, Genre::Romance]);
        assert_eq!(itemset.canonical_key(), "Comedy Romance");
    }

    #[test]
    fn test_empty_itemset_rejected() {
        assert!(Itemset::new(Vec::new()).is_none());
        let single = Itemset::new([Genre::Drama]).unwrap();
        assert!(single.without(Genre::Drama).is_none());
    }

    #[test]
    fn test_key_round_trip_with_hyphenated_labels() {
        let itemset = Itemset::new([Genre::SciFi, Genre::FilmNoir]).unwrap();
        assert_eq!(itemset.canonical_key(), "Film-Noir Sci-Fi");
        assert_eq!(Itemset::from_key("Sci-Fi Film-Noir"), Some(itemset));
    }

    #[test]
    fn test_mask_round_trip() {
        let itemset = Itemset::new([Genre::Action, Genre::Western]).unwrap();
        assert_eq!(Itemset::from_mask(itemset.mask()), Some(itemset));
    }

    #[test]
    fn test_support_lookup_by_key() {
        let patterns: FrequentPatterns = [
            (Itemset::new([Genre::Comedy]).unwrap(), 0.4),
            (Itemset::new([Genre::Comedy, Genre::Romance]).unwrap(), 0.2),
        ]
        .into_iter()
        .collect();
        assert_eq!(patterns.support_by_key("Romance Comedy"), Some(0.2));
        assert_eq!(patterns.support_by_key("Romance"), None);
        assert_eq!(patterns.support_by_key("NotAGenre"), None);
    }
}
