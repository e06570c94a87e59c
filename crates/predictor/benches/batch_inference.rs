//! Benchmarks for batch inference
//!
//! Run with: cargo bench --package predictor
//!
//! Compiles a program from synthetic signatures and measures the scheduler
//! at a few batch sizes.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use data_loader::{DataIndex, Genre, Movie, Rating};
use inference::{Query, TopDownEngine};
use predictor::BatchScheduler;
use rules::{AprioriMiner, PatternMiner, PreferenceExtractor, RuleCompiler};
use std::sync::Arc;

const USERS: u32 = 300;
const MOVIES: u32 = 400;

fn synthetic_program() -> String {
    let movies: Vec<Movie> = (1..=MOVIES)
        .map(|id| {
            let first = Genre::ALL[id as usize % Genre::ALL.len()];
            let second = Genre::ALL[(id as usize * 7) % Genre::ALL.len()];
            let mut genres = vec![first, second];
            genres.sort();
            genres.dedup();
            Movie {
                id,
                title: format!("Movie {}", id),
                year: None,
                genres,
            }
        })
        .collect();

    let ratings: Vec<Rating> = (1..=USERS)
        .flat_map(|user_id| {
            (0..20).map(move |k| Rating {
                user_id,
                movie_id: (user_id * 13 + k * 29) % MOVIES + 1,
                rating: if k % 3 == 0 { 2.0 } else { 4.5 },
                timestamp: 0,
            })
        })
        .collect();

    let index = DataIndex::from_parts(movies, ratings).expect("synthetic data is valid");
    let signatures = PreferenceExtractor::new().extract(&index);
    let patterns = AprioriMiner::new().mine(&signatures, 0.05);
    RuleCompiler::new()
        .compile(&patterns, &index, &signatures)
        .text()
}

fn bench_scheduler(c: &mut Criterion) {
    let program = synthetic_program();
    let queries: Vec<Query> = (1..=USERS)
        .flat_map(|u| (1..=5).map(move |m| Query::new(u, m * 11)))
        .collect();

    let mut group = c.benchmark_group("batch_inference");
    group.sample_size(10);
    for batch_size in [50, 250, 1000] {
        let scheduler = BatchScheduler::new(Arc::new(TopDownEngine::new())).with_batch_size(batch_size);
        group.bench_with_input(BenchmarkId::from_parameter(batch_size), &batch_size, |b, _| {
            b.iter(|| black_box(scheduler.run(black_box(&program), &queries).unwrap()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_scheduler);
criterion_main!(benches);
