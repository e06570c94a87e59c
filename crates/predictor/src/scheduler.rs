//! Parallel batch evaluation of queries against a compiled program.
//!
//! Queries are cut into contiguous batches of `batch_size`. Each batch is an
//! independent unit of work on a fixed-size worker pool, carrying its own
//! handle to the program text; the engine builds a private knowledge base
//! per unit, so workers share nothing mutable. Units report back over a
//! channel in completion order and the caller's order is restored by
//! joining on (user, movie).
//!
//! A unit whose engine returns an error, or panics, yields
//! `BatchOutcome::Failed`. The run still completes and the queries of that
//! batch come back without a probability.

use crate::error::{PredictError, Result};
use inference::{InferenceEngine, ProbabilisticResult, Query};
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, mpsc};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// What one unit of work produced
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    Completed(Vec<ProbabilisticResult>),
    Failed { cause: String },
}

/// A batch whose evaluation crashed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure {
    /// Position of the batch in submission order
    pub batch: usize,
    /// Number of queries left unresolved by the failure
    pub queries: usize,
    pub cause: String,
}

/// Results of a full run, in the caller's query order
#[derive(Debug, Clone, Default)]
pub struct ScheduledResults {
    pub results: Vec<ProbabilisticResult>,
    pub failures: Vec<BatchFailure>,
}

/// Evaluate one batch, turning errors and panics into `Failed`
pub fn evaluate_batch(engine: &dyn InferenceEngine, program: &str, batch: &[Query]) -> BatchOutcome {
    match panic::catch_unwind(AssertUnwindSafe(|| engine.evaluate(program, batch))) {
        Ok(Ok(results)) => BatchOutcome::Completed(results),
        Ok(Err(err)) => BatchOutcome::Failed {
            cause: err.to_string(),
        },
        Err(payload) => BatchOutcome::Failed {
            cause: format!("{} panicked: {}", engine.name(), panic_message(payload.as_ref())),
        },
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Dispatches query batches to a worker pool and reassembles the results
#[derive(Clone)]
pub struct BatchScheduler {
    engine: Arc<dyn InferenceEngine>,
    batch_size: usize,
    workers: usize,
}

impl BatchScheduler {
    /// Create a scheduler with batches of 1000 and one worker per
    /// available execution unit
    pub fn new(engine: Arc<dyn InferenceEngine>) -> Self {
        Self {
            engine,
            batch_size: 1000,
            workers: rayon::current_num_threads(),
        }
    }

    /// Configure the number of queries per unit (default: 1000)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Configure the worker pool size
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Evaluate every query; blocks until all units have reported.
    ///
    /// # Returns
    /// * `Ok(results)` - exactly one result per input query, in input order
    /// * `Err` - invalid batch size or worker count, or the pool failed to start
    #[instrument(skip_all, fields(queries = queries.len(), batch_size = self.batch_size, workers = self.workers))]
    pub fn run(&self, program: &str, queries: &[Query]) -> Result<ScheduledResults> {
        if self.batch_size == 0 {
            return Err(PredictError::InvalidBatchSize);
        }
        if self.workers == 0 {
            return Err(PredictError::InvalidWorkerCount(self.workers));
        }
        if queries.is_empty() {
            return Ok(ScheduledResults::default());
        }

        let start_time = Instant::now();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("inference-worker-{}", i))
            .build()
            .map_err(|e| PredictError::WorkerPool(e.to_string()))?;

        let program: Arc<str> = Arc::from(program);
        let (tx, rx) = mpsc::channel();

        let mut submitted = 0;
        for (batch_idx, batch) in queries.chunks(self.batch_size).enumerate() {
            let tx = tx.clone();
            let engine = Arc::clone(&self.engine);
            let program = Arc::clone(&program);
            let batch = batch.to_vec();

            pool.spawn(move || {
                let outcome = evaluate_batch(engine.as_ref(), &program, &batch);
                // The receiver outlives every unit
                let _ = tx.send((batch_idx, batch.len(), outcome));
            });
            submitted += 1;
        }
        drop(tx);

        info!(
            "Dispatched {} batches to {} workers using {}",
            submitted,
            self.workers,
            self.engine.name()
        );

        let total = queries.len();
        let mut progress = 0usize;
        let mut resolved: HashMap<Query, Option<f64>> = HashMap::with_capacity(total);
        let mut failures = Vec::new();

        // Completion order
        for (batch_idx, batch_len, outcome) in rx {
            progress = (progress + self.batch_size).min(total);
            debug!("Progress: {}/{} queries", progress, total);

            match outcome {
                BatchOutcome::Completed(results) => {
                    for result in results {
                        resolved.insert(result.query(), result.probability);
                    }
                }
                BatchOutcome::Failed { cause } => {
                    warn!("Batch {} ({} queries) failed: {}", batch_idx, batch_len, cause);
                    failures.push(BatchFailure {
                        batch: batch_idx,
                        queries: batch_len,
                        cause,
                    });
                }
            }
        }
        failures.sort_by_key(|f| f.batch);

        let results: Vec<ProbabilisticResult> = queries
            .iter()
            .map(|query| match resolved.get(query).copied().flatten() {
                Some(p) => ProbabilisticResult::resolved(*query, p),
                None => ProbabilisticResult::unresolved(*query),
            })
            .collect();

        let unresolved = results.iter().filter(|r| r.probability.is_none()).count();
        info!(
            "Evaluated {} queries in {:.2?} ({} unresolved, {} failed batches)",
            total,
            start_time.elapsed(),
            unresolved,
            failures.len()
        );

        Ok(ScheduledResults { results, failures })
    }
}
