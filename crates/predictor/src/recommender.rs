//! # MLN Recommender
//!
//! Coordinates the whole pipeline:
//! 1. Index the training ratings and movies
//! 2. Extract preference signatures
//! 3. Mine frequent genre patterns
//! 4. Compile and persist the logic program
//! 5. At predict time, reload the program, write the queries to `query.pl`,
//!    run the batch scheduler and calibrate every probability into a rating

use crate::calibrator::RatingCalibrator;
use crate::config::{MlnConfig, PredictOptions};
use crate::error::{PredictError, Result};
use crate::scheduler::{BatchFailure, BatchScheduler};
use data_loader::{DataIndex, Movie, MovieId, Rating, UserId};
use inference::{InferenceEngine, QUERY_FILE, Query, TopDownEngine, write_query_file};
use rules::{
    AprioriMiner, FrequentPatterns, InferenceRule, LogicProgram, PatternMiner,
    PreferenceExtractor, RuleCompiler, Signatures,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

/// One scored query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
    pub user_id: UserId,
    pub movie_id: MovieId,
    /// `None` when inference failed for this query
    pub probability: Option<f64>,
    pub rating: Option<f64>,
}

/// Output of `predict`: one row per query, in query order
#[derive(Debug, Clone, Default)]
pub struct Predictions {
    pub rows: Vec<PredictionRow>,
    pub failures: Vec<BatchFailure>,
}

impl Predictions {
    /// Fraction of rows that carry a rating
    pub fn coverage(&self) -> f64 {
        if self.rows.is_empty() {
            return 0.0;
        }
        let rated = self.rows.iter().filter(|r| r.rating.is_some()).count();
        rated as f64 / self.rows.len() as f64
    }
}

/// Everything `fit` produces
pub struct FittedModel {
    pub index: DataIndex,
    pub signatures: Signatures,
    pub patterns: FrequentPatterns,
    pub rules: Vec<InferenceRule>,
    pub program: LogicProgram,
    pub artifacts_dir: PathBuf,
}

/// Rule-based probabilistic rating predictor
pub struct MlnRecommender {
    config: MlnConfig,
    miner: Arc<dyn PatternMiner>,
    engine: Arc<dyn InferenceEngine>,
    model: Option<FittedModel>,
}

impl MlnRecommender {
    /// Create an unfitted recommender with the Apriori miner and the
    /// top-down engine
    pub fn new(config: MlnConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            miner: Arc::new(AprioriMiner::new()),
            engine: Arc::new(TopDownEngine::new()),
            model: None,
        })
    }

    /// Replace the pattern miner
    pub fn with_miner(mut self, miner: Arc<dyn PatternMiner>) -> Self {
        self.miner = miner;
        self
    }

    /// Replace the inference engine
    pub fn with_engine(mut self, engine: Arc<dyn InferenceEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn config(&self) -> &MlnConfig {
        &self.config
    }

    /// The fitted state, if `fit` has run
    pub fn model(&self) -> Option<&FittedModel> {
        self.model.as_ref()
    }

    /// Build signatures, mine patterns, compile the program and write it
    /// to `artifacts_dir`
    #[instrument(skip(self, ratings, movies), fields(ratings = ratings.len(), movies = movies.len()))]
    pub fn fit(&mut self, ratings: Vec<Rating>, movies: Vec<Movie>, artifacts_dir: &Path) -> Result<()> {
        let start_time = Instant::now();
        let index = DataIndex::from_parts(movies, ratings)?;

        let signatures = PreferenceExtractor::new()
            .with_rating_threshold(self.config.preference_rating_threshold)
            .with_preference_threshold(self.config.preference_threshold)
            .extract(&index);
        info!("Extracted {} user signatures", signatures.len());

        let patterns = self.miner.mine(&signatures, self.config.min_support);
        info!(
            "{} mined {} patterns at min_support {}",
            self.miner.name(),
            patterns.len(),
            self.config.min_support
        );

        let compiler = RuleCompiler::new().with_base_probability(self.config.base_probability);
        let rules = compiler.derive_rules(&patterns);
        let program = compiler.compile(&patterns, &index, &signatures);
        program.write_to(artifacts_dir)?;

        info!(
            "Fit complete in {:.2?}: {} preference rules",
            start_time.elapsed(),
            rules.len()
        );

        self.model = Some(FittedModel {
            index,
            signatures,
            patterns,
            rules,
            program,
            artifacts_dir: artifacts_dir.to_path_buf(),
        });
        Ok(())
    }

    /// Restore a recommender from artifacts written by an earlier `fit`.
    ///
    /// Only the program and the rating statistics of `index` are restored;
    /// signatures, patterns and rules stay empty.
    pub fn from_artifacts(config: MlnConfig, index: DataIndex, artifacts_dir: &Path) -> Result<Self> {
        let program = LogicProgram::load_from(artifacts_dir)?;
        let mut recommender = Self::new(config)?;
        recommender.model = Some(FittedModel {
            index,
            signatures: Signatures::default(),
            patterns: FrequentPatterns::default(),
            rules: Vec::new(),
            program,
            artifacts_dir: artifacts_dir.to_path_buf(),
        });
        Ok(recommender)
    }

    /// Score `queries`; rows come back in query order.
    ///
    /// The queries are also written to `query.pl` in the artifacts directory.
    ///
    /// Failed batches do not fail the call: their rows have neither a
    /// probability nor a rating, and the failure is listed in
    /// `Predictions::failures`.
    #[instrument(skip(self, queries), fields(queries = queries.len()))]
    pub fn predict(&self, queries: &[Query], options: &PredictOptions) -> Result<Predictions> {
        let model = self.model.as_ref().ok_or(PredictError::NotFitted)?;

        let program = LogicProgram::load_from(&model.artifacts_dir)?;
        write_query_file(&model.artifacts_dir, queries).map_err(|source| PredictError::QueryFile {
            path: model.artifacts_dir.join(QUERY_FILE),
            source,
        })?;

        let scheduled = BatchScheduler::new(Arc::clone(&self.engine))
            .with_batch_size(options.batch_size)
            .with_workers(options.resolved_workers())
            .run(&program.text(), queries)?;

        let calibrator = RatingCalibrator::new()
            .with_min_item_ratings(self.config.min_item_ratings)
            .with_rating_range(self.config.rating_floor, self.config.rating_ceiling);

        let rows = scheduled
            .results
            .iter()
            .map(|result| PredictionRow {
                user_id: result.user_id,
                movie_id: result.movie_id,
                probability: result.probability,
                rating: result
                    .probability
                    .and_then(|p| calibrator.calibrate_for(&model.index, result.movie_id, p)),
            })
            .collect();

        Ok(Predictions {
            rows,
            failures: scheduled.failures,
        })
    }
}
