use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use data_loader::{split_ratings, DataIndex, Movie, Rating};
use inference::{parse_queries, Query};
use predictor::{evaluate, MlnConfig, MlnRecommender, PredictOptions, Predictions};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// MLN-Recs - rule-based probabilistic rating prediction
#[derive(Parser)]
#[command(name = "mln-recs")]
#[command(about = "Rating prediction from mined genre-preference rules", long_about = None)]
struct Cli {
    /// Path to MovieLens dataset directory
    #[arg(short, long, default_value = "data/ml-1m")]
    data_dir: PathBuf,

    /// JSON file with an MlnConfig; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConfigOverrides {
    /// Minimum rating counted as a preference
    #[arg(long, global = true)]
    rating_threshold: Option<f32>,

    /// Minimum normalized genre weight to prefer a genre
    #[arg(long, global = true)]
    preference_threshold: Option<f64>,

    /// Minimum support of a mined pattern
    #[arg(long, global = true)]
    min_support: Option<f64>,

    /// Weight of the single-genre world rule
    #[arg(long, global = true)]
    base_probability: Option<f64>,

    /// Ratings an item needs before its own statistics are used
    #[arg(long, global = true)]
    min_item_ratings: Option<u32>,

    /// Lowest predicted rating
    #[arg(long, global = true)]
    rating_floor: Option<f64>,

    /// Highest predicted rating
    #[arg(long, global = true)]
    rating_ceiling: Option<f64>,
}

#[derive(Args)]
struct SchedulingArgs {
    /// Queries per unit of work
    #[arg(long, default_value = "1000")]
    batch_size: usize,

    /// Worker pool size (default: available parallelism)
    #[arg(long)]
    workers: Option<usize>,
}

impl SchedulingArgs {
    fn options(&self) -> PredictOptions {
        PredictOptions {
            batch_size: self.batch_size,
            workers: self.workers,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fit on every rating and persist the compiled program
    Fit {
        /// Directory receiving world.pl and preference.pl
        #[arg(long, default_value = "artifacts")]
        artifacts: PathBuf,
    },

    /// Score the queries of a query file with a fitted program
    Predict {
        /// Directory written by `fit`
        #[arg(long, default_value = "artifacts")]
        artifacts: PathBuf,

        /// File of `query(likes(user<ID>, movie<ID>)).` lines
        #[arg(long)]
        queries: PathBuf,

        /// Output file, one JSON prediction per line
        #[arg(long)]
        output: PathBuf,

        #[command(flatten)]
        scheduling: SchedulingArgs,
    },

    /// Hold out ratings, fit on the rest and report RMSE / MAE
    Evaluate {
        /// Fraction of ratings held out
        #[arg(long, default_value = "0.2")]
        test_fraction: f64,

        /// Seed of the train/test shuffle
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Score at most this many held-out ratings
        #[arg(long)]
        limit: Option<usize>,

        #[arg(long, default_value = "artifacts")]
        artifacts: PathBuf,

        #[command(flatten)]
        scheduling: SchedulingArgs,
    },

    /// Fit and print the strongest preference rules
    Rules {
        /// Number of rules to show
        #[arg(long, default_value = "20")]
        top: usize,

        #[arg(long, default_value = "artifacts")]
        artifacts: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), &cli.overrides)?;

    // Load data index (this may take a moment)
    println!("Loading MovieLens dataset from {}...", cli.data_dir.display());
    let start = Instant::now();
    let data_dir = cli.data_dir.clone();
    let index = tokio::task::spawn_blocking(move || DataIndex::load_from_files(&data_dir))
        .await
        .context("Loader task panicked")?
        .context("Failed to load MovieLens dataset")?;
    let (users, movies, ratings) = index.counts();
    println!(
        "{} Loaded {} users, {} movies, {} ratings in {:?}",
        "✓".green(),
        users,
        movies,
        ratings,
        start.elapsed()
    );

    match cli.command {
        Commands::Fit { artifacts } => handle_fit(config, index, artifacts).await?,
        Commands::Predict {
            artifacts,
            queries,
            output,
            scheduling,
        } => handle_predict(config, index, artifacts, queries, output, scheduling.options()).await?,
        Commands::Evaluate {
            test_fraction,
            seed,
            limit,
            artifacts,
            scheduling,
        } => {
            handle_evaluate(
                config,
                index,
                artifacts,
                test_fraction,
                seed,
                limit,
                scheduling.options(),
            )
            .await?
        }
        Commands::Rules { top, artifacts } => handle_rules(config, index, artifacts, top).await?,
    }

    Ok(())
}

/// Read the config file (if any), apply flag overrides and validate
fn load_config(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<MlnConfig> {
    let mut config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => MlnConfig::default(),
    };

    if let Some(v) = overrides.rating_threshold {
        config.preference_rating_threshold = v;
    }
    if let Some(v) = overrides.preference_threshold {
        config.preference_threshold = v;
    }
    if let Some(v) = overrides.min_support {
        config.min_support = v;
    }
    if let Some(v) = overrides.base_probability {
        config.base_probability = v;
    }
    if let Some(v) = overrides.min_item_ratings {
        config.min_item_ratings = v;
    }
    if let Some(v) = overrides.rating_floor {
        config.rating_floor = v;
    }
    if let Some(v) = overrides.rating_ceiling {
        config.rating_ceiling = v;
    }

    config.validate()?;
    Ok(config)
}

fn movies_of(index: &DataIndex) -> Vec<Movie> {
    index.movies().cloned().collect()
}

/// Fit on a blocking thread; fitting is CPU-bound
async fn fit(
    config: MlnConfig,
    ratings: Vec<Rating>,
    movies: Vec<Movie>,
    artifacts: PathBuf,
) -> Result<MlnRecommender> {
    tokio::task::spawn_blocking(move || -> Result<MlnRecommender> {
        let mut recommender = MlnRecommender::new(config)?;
        recommender.fit(ratings, movies, &artifacts)?;
        Ok(recommender)
    })
    .await
    .context("Fit task panicked")?
}

async fn predict(
    recommender: MlnRecommender,
    queries: Vec<Query>,
    options: PredictOptions,
) -> Result<Predictions> {
    tokio::task::spawn_blocking(move || recommender.predict(&queries, &options))
        .await
        .context("Predict task panicked")?
        .context("Prediction failed")
}

/// Handle the 'fit' command
async fn handle_fit(config: MlnConfig, index: DataIndex, artifacts: PathBuf) -> Result<()> {
    let start = Instant::now();
    let movies = movies_of(&index);
    let ratings = index.ratings().to_vec();
    let recommender = fit(config, ratings, movies, artifacts.clone()).await?;

    if let Some(model) = recommender.model() {
        println!("{}", "Fit summary:".bold().blue());
        println!("{}Signatures: {}", "• ".green(), model.signatures.len());
        println!("{}Frequent patterns: {}", "• ".green(), model.patterns.len());
        println!("{}Preference rules: {}", "• ".green(), model.rules.len());
        println!(
            "{}Artifacts: {} ({:?})",
            "• ".green(),
            artifacts.display(),
            start.elapsed()
        );
    }
    Ok(())
}

/// Handle the 'predict' command
async fn handle_predict(
    config: MlnConfig,
    index: DataIndex,
    artifacts: PathBuf,
    queries: PathBuf,
    output: PathBuf,
    options: PredictOptions,
) -> Result<()> {
    let text = std::fs::read_to_string(&queries)
        .with_context(|| format!("Failed to read queries {}", queries.display()))?;
    let queries = parse_queries(&text).context("Invalid query file")?;
    info!("Read {} queries", queries.len());

    let recommender = MlnRecommender::from_artifacts(config, index, &artifacts)
        .with_context(|| format!("Failed to load artifacts from {}", artifacts.display()))?;
    let predictions = predict(recommender, queries, options).await?;

    let file = File::create(&output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    for row in &predictions.rows {
        serde_json::to_writer(&mut writer, row)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    print_prediction_summary(&predictions);
    println!("{} Wrote {}", "✓".green(), output.display());
    Ok(())
}

/// Handle the 'evaluate' command
async fn handle_evaluate(
    config: MlnConfig,
    index: DataIndex,
    artifacts: PathBuf,
    test_fraction: f64,
    seed: u64,
    limit: Option<usize>,
    options: PredictOptions,
) -> Result<()> {
    let movies = movies_of(&index);
    let (train, mut test) = split_ratings(index.ratings().to_vec(), test_fraction, seed)
        .context("Failed to split ratings")?;
    if let Some(limit) = limit {
        test.truncate(limit);
    }
    println!(
        "Training on {} ratings, testing on {}",
        train.len(),
        test.len()
    );

    let recommender = fit(config, train, movies, artifacts).await?;

    // One user's queries land in the same batch and share its tabled preferences
    let mut queries: Vec<Query> = test
        .iter()
        .map(|r| Query::new(r.user_id, r.movie_id))
        .collect();
    queries.sort_unstable();
    let start = Instant::now();
    let predictions = predict(recommender, queries, options).await?;
    let elapsed = start.elapsed();

    let report = evaluate(&test, &predictions);
    print_prediction_summary(&predictions);
    println!("{}", "Accuracy:".bold().blue());
    println!("{}RMSE: {:.4}", "• ".cyan(), report.rmse);
    println!("{}MAE: {:.4}", "• ".cyan(), report.mae);
    println!(
        "{}Scored {} ratings ({} missing) in {:?}",
        "• ".cyan(),
        report.n_predictions,
        report.n_missing,
        elapsed
    );
    Ok(())
}

/// Handle the 'rules' command
async fn handle_rules(
    config: MlnConfig,
    index: DataIndex,
    artifacts: PathBuf,
    top: usize,
) -> Result<()> {
    let movies = movies_of(&index);
    let ratings = index.ratings().to_vec();
    let recommender = fit(config, ratings, movies, artifacts).await?;
    let Some(model) = recommender.model() else {
        return Ok(());
    };

    let mut rules: Vec<_> = model.rules.iter().collect();
    rules.sort_by(|a, b| {
        b.confidence()
            .partial_cmp(&a.confidence())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.support
                    .partial_cmp(&a.support)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });

    println!(
        "{}",
        format!("Top {} of {} preference rules:", top.min(rules.len()), rules.len())
            .bold()
            .blue()
    );
    for (rank, rule) in rules.iter().take(top).enumerate() {
        println!(
            "{}. {}  (support {:.3})",
            (rank + 1).to_string().green(),
            rule.to_clause(),
            rule.support
        );
    }
    Ok(())
}

/// Coverage and failed batches of a predict run
fn print_prediction_summary(predictions: &Predictions) {
    println!(
        "{} {} predictions, {:.1}% with a rating",
        "✓".green(),
        predictions.rows.len(),
        predictions.coverage() * 100.0
    );
    for failure in &predictions.failures {
        println!(
            "{} batch {} ({} queries) failed: {}",
            "✗".red(),
            failure.batch,
            failure.queries,
            failure.cause
        );
    }
}
