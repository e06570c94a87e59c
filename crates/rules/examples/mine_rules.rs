//! Mine preference rules from the MovieLens 1M ratings and print a summary.
//!
//! Run with: cargo run --release --example mine_rules -p rules

use data_loader::{DataIndex, Genre};
use rules::{AprioriMiner, PatternMiner, PreferenceExtractor, RuleCompiler};
use std::path::Path;
use std::time::Instant;

fn main() {
    let index = DataIndex::load_from_files(Path::new("data/ml-1m")).expect("Failed to load dataset");

    let start = Instant::now();
    let signatures = PreferenceExtractor::new().extract(&index);
    println!("Signatures: {} in {:?}", signatures.len(), start.elapsed());

    let mut genre_counts = [0usize; Genre::ALL.len()];
    for (_, genres) in signatures.iter() {
        for genre in genres {
            genre_counts[genre.index()] += 1;
        }
    }
    for genre in Genre::ALL {
        println!("  {:<12} {:>5}", genre.label(), genre_counts[genre.index()]);
    }

    for min_support in [0.2, 0.1, 0.05] {
        let start = Instant::now();
        let patterns = AprioriMiner::new().mine(&signatures, min_support);
        let rules = RuleCompiler::new().derive_rules(&patterns);
        println!(
            "\nmin_support {:.2}: {} patterns, {} rules in {:?}",
            min_support,
            patterns.len(),
            rules.len(),
            start.elapsed()
        );
        for rule in rules.iter().take(5) {
            println!("  {}", rule.to_clause());
        }
    }
}
