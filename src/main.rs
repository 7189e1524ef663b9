use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use meterboxd_stats::config::{
    AppConfig, CliConfig, FileConfig, DEFAULT_TMDB_MIN_INTERVAL_MS, DEFAULT_TMDB_TIMEOUT_SEC,
};
use meterboxd_stats::import::{import_json, verify_import};
use meterboxd_stats::metrics;
use meterboxd_stats::movie_store::{
    MovieKey, MovieStore, NullMovieStore, OverrideRecord, PublicDataRecord, SqliteMovieStore,
};
use meterboxd_stats::overrides::{OverrideIndex, OverrideSource};
use meterboxd_stats::resolver::{MemoryTier, Resolution, ResolutionCache};
use meterboxd_stats::stats::{
    Metric, RatingRow, SourceErrorPolicy, StatisticsEngine, StatsReport, DEFAULT_CONCURRENCY,
    DEFAULT_CURRENT_YEAR,
};
use meterboxd_stats::tmdb::{ExternalRatingSource, DEFAULT_TMDB_BASE_URL};

mod cli_style;
use cli_style::{
    get_styles, print_error, print_key_value, print_key_value_highlight, print_ranking,
    print_section_footer, print_section_header, print_success, print_warning,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(
    name = "meterboxd",
    version = concat!(env!("CARGO_PKG_VERSION"), "-", env!("GIT_HASH")),
    about = "Compare your movie ratings with public ratings and popularity",
    styles = get_styles()
)]
struct CliArgs {
    /// Path to a TOML config file. Its values override command line options.
    #[clap(long, global = true, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    #[clap(flatten)]
    pub settings: SettingsArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug)]
struct SettingsArgs {
    /// Directory holding movies.db. Without it nothing is persisted.
    #[clap(long, global = true, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// JSON file to read overrides from instead of the database.
    #[clap(long, global = true, value_parser = parse_path)]
    pub overrides_file: Option<PathBuf>,

    /// TMDB API key.
    #[clap(long, global = true, env = "TMDB_API_KEY", hide_env_values = true)]
    pub tmdb_api_key: Option<String>,

    #[clap(long, global = true, default_value = DEFAULT_TMDB_BASE_URL)]
    pub tmdb_base_url: String,

    /// Timeout in seconds for a single TMDB request.
    #[clap(long, global = true, default_value_t = DEFAULT_TMDB_TIMEOUT_SEC)]
    pub tmdb_timeout_sec: u64,

    /// Minimum delay in milliseconds between two TMDB requests.
    #[clap(long, global = true, default_value_t = DEFAULT_TMDB_MIN_INTERVAL_MS)]
    pub tmdb_min_interval_ms: u64,

    /// Reference year used to normalise vote counts by movie age.
    #[clap(long, global = true, default_value_t = DEFAULT_CURRENT_YEAR)]
    pub current_year: i32,

    /// Number of movies resolved concurrently.
    #[clap(long, global = true, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Maximum number of records kept in memory, 0 for unbounded.
    #[clap(long, global = true, default_value_t = 0)]
    pub memory_cache_capacity: usize,

    /// What to do with a movie whose TMDB lookup fails.
    #[clap(long, global = true, value_enum, default_value = "skip")]
    pub on_source_error: SourceErrorPolicy,
}

impl SettingsArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_dir: self.db_dir.clone(),
            overrides_file: self.overrides_file.clone(),
            tmdb_api_key: self.tmdb_api_key.clone(),
            tmdb_base_url: self.tmdb_base_url.clone(),
            tmdb_timeout_sec: self.tmdb_timeout_sec,
            tmdb_min_interval_ms: self.tmdb_min_interval_ms,
            current_year: self.current_year,
            concurrency: self.concurrency,
            memory_cache_capacity: self.memory_cache_capacity,
            on_source_error: self.on_source_error,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rank a ratings file by rating difference and obscurity.
    Analyze {
        /// JSON array of {"title", "year", "user_rating"} objects.
        #[clap(value_parser = parse_path)]
        rows: PathBuf,

        /// Print the report as JSON.
        #[clap(long)]
        json: bool,

        /// Print Prometheus metrics after the report.
        #[clap(long)]
        metrics: bool,
    },

    /// Resolve a single movie and show which tier answered.
    Resolve { title: String, year: i32 },

    /// Import legacy JSON cache and override files into the database.
    Import {
        #[clap(value_parser = parse_path)]
        movies: PathBuf,

        #[clap(value_parser = parse_path)]
        overrides: PathBuf,

        /// Replace whatever the database already holds.
        #[clap(long)]
        clear: bool,
    },

    /// Check that the database matches the JSON files it was imported from.
    Verify {
        #[clap(value_parser = parse_path)]
        movies: PathBuf,

        #[clap(value_parser = parse_path)]
        overrides: PathBuf,
    },

    /// Create or replace a curated override.
    SetOverride {
        title: String,
        year: i32,

        /// Exclude the movie from every statistic.
        #[clap(long)]
        ignore: bool,

        /// Public rating on the 0-5 scale.
        #[clap(long)]
        rating: Option<f64>,

        #[clap(long)]
        votes: Option<f64>,

        #[clap(long)]
        popularity: Option<f64>,

        #[clap(long)]
        poster_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    metrics::init_metrics();

    let file_config = cli_args
        .config
        .as_deref()
        .map(FileConfig::load)
        .transpose()?;
    let config = AppConfig::resolve(&cli_args.settings.to_cli_config(), file_config)?;

    match cli_args.command {
        Command::Analyze {
            rows,
            json,
            metrics,
        } => run_analyze(&config, &rows, json, metrics).await,
        Command::Resolve { title, year } => run_resolve(&config, title, year).await,
        Command::Import {
            movies,
            overrides,
            clear,
        } => {
            let store = open_persistent_store(&config)?;
            let report = import_json(&store, &movies, &overrides, clear)?;
            print_success(&format!(
                "Imported {} movies and {} overrides",
                report.movies_imported, report.overrides_imported
            ));
            if report.skipped > 0 {
                print_warning(&format!("{} entries with a blank key were skipped", report.skipped));
            }
            Ok(())
        }
        Command::Verify { movies, overrides } => {
            let store = open_persistent_store(&config)?;
            let report = verify_import(&store, &movies, &overrides)?;
            if !report.is_ok() {
                for mismatch in &report.mismatches {
                    print_error(mismatch);
                }
                bail!("Verification failed with {} mismatches", report.mismatches.len());
            }
            print_success(&format!(
                "Verified {} movies and {} overrides",
                report.movies_in_store, report.overrides_in_store
            ));
            Ok(())
        }
        Command::SetOverride {
            title,
            year,
            ignore,
            rating,
            votes,
            popularity,
            poster_url,
        } => {
            let key = MovieKey::new(title, year);
            if !key.is_valid() {
                bail!("Title must not be empty");
            }
            let record = OverrideRecord {
                data: PublicDataRecord {
                    public_rating: rating.unwrap_or(0.0),
                    vote_count: votes.unwrap_or(0.0),
                    popularity: popularity.unwrap_or(0.0),
                    poster_url: poster_url.unwrap_or_default(),
                    tmdb_id: None,
                },
                ignore,
            };
            let store = open_persistent_store(&config)?;
            store.put_override(key.canonical(), &record)?;
            print_success(&format!("Override saved for {}", key));
            Ok(())
        }
    }
}

fn open_persistent_store(config: &AppConfig) -> Result<SqliteMovieStore> {
    let path = config
        .movies_db_path()
        .context("This command needs a database, pass --db-dir or set db_dir")?;
    info!("Opening movie database at {:?}...", path);
    SqliteMovieStore::new(&path)
}

fn open_store(config: &AppConfig) -> Result<Arc<dyn MovieStore>> {
    if config.db_dir.is_none() {
        warn!("No db_dir configured, resolved movies will not be persisted");
        return Ok(Arc::new(NullMovieStore));
    }
    Ok(Arc::new(open_persistent_store(config)?))
}

#[cfg(not(feature = "no_external"))]
fn external_source(config: &AppConfig) -> Result<Option<Arc<dyn ExternalRatingSource>>> {
    let client = meterboxd_stats::tmdb::TmdbClient::new(config.tmdb_client_config())?;
    if !client.is_configured() {
        warn!("No TMDB API key configured, only local data can be used");
        return Ok(None);
    }
    info!("TMDB lookups enabled via {}", config.tmdb.base_url);
    Ok(Some(Arc::new(client)))
}

#[cfg(feature = "no_external")]
fn external_source(_config: &AppConfig) -> Result<Option<Arc<dyn ExternalRatingSource>>> {
    info!("External lookups disabled at build time");
    Ok(None)
}

fn build_cache(config: &AppConfig) -> Result<ResolutionCache> {
    let store = open_store(config)?;
    let override_source = match &config.overrides_file {
        Some(path) => OverrideSource::JsonFile(path.clone()),
        None => OverrideSource::Store(store.clone()),
    };
    let overrides = Arc::new(OverrideIndex::load(override_source)?);

    Ok(
        ResolutionCache::new(overrides, store, external_source(config)?)
            .with_memory_tier(MemoryTier::with_capacity(config.memory_cache_capacity)),
    )
}

fn load_rows(path: &Path) -> Result<Vec<RatingRow>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read ratings file: {:?}", path))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse ratings file: {:?}", path))
}

async fn run_analyze(config: &AppConfig, rows_path: &Path, json: bool, show_metrics: bool) -> Result<()> {
    let rows = load_rows(rows_path)?;
    info!("Analyzing {} rated movies...", rows.len());

    let cache = Arc::new(build_cache(config)?);
    let engine = StatisticsEngine::new(cache)
        .with_current_year(config.current_year)
        .with_concurrency(config.concurrency)
        .with_source_error_policy(config.on_source_error);

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling analysis");
            ctrl_c_token.cancel();
        }
    });

    let report = engine.report(&rows, &cancel).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    if show_metrics {
        print!("{}", metrics::render()?);
    }
    Ok(())
}

fn print_report(report: &StatsReport) {
    print_section_header("Summary");
    print_key_value("Movies analyzed", &report.analyzed_movies.to_string());
    print_key_value("Movies skipped", &report.skipped_movies.to_string());
    print_key_value_highlight(
        "Average rating difference",
        &format!("{:+.2}", report.rating_stats.average_rating_difference),
    );
    print_key_value_highlight(
        "Obscurity score",
        &format!("{:.2}", report.obscurity_stats.obscurity_score),
    );
    print_section_footer();

    print_ranking(
        "Most Underrated",
        "Diff",
        &report.rating_stats.underrated_movies,
        |s| Metric::RatingDifference.value(s),
    );
    print_ranking(
        "Most Overrated",
        "Diff",
        &report.rating_stats.overrated_movies,
        |s| Metric::RatingDifference.value(s),
    );
    print_ranking(
        "Most Obscure",
        "Score",
        &report.obscurity_stats.most_obscure_movies,
        |s| Metric::Popularity.value(s),
    );
    print_ranking(
        "Least Obscure",
        "Score",
        &report.obscurity_stats.least_obscure_movies,
        |s| Metric::Popularity.value(s),
    );
}

async fn run_resolve(config: &AppConfig, title: String, year: i32) -> Result<()> {
    let cache = build_cache(config)?;
    let key = MovieKey::new(title, year);

    match cache.resolve(&key).await? {
        Resolution::Found { record, tier } => {
            print_section_header(key.canonical());
            print_key_value_highlight("Tier", tier.as_str());
            print_key_value("Public rating", &format!("{:.2}", record.public_rating));
            print_key_value("Votes", &format!("{:.0}", record.vote_count));
            print_key_value("Popularity", &format!("{:.3}", record.popularity));
            if !record.poster_url.is_empty() {
                print_key_value("Poster", &record.poster_url);
            }
            if !record.is_usable() {
                print_warning("Incomplete public data, this movie is left out of statistics");
            }
            print_section_footer();
        }
        Resolution::NotFound => print_warning(&format!("{} was not found", key)),
        Resolution::Ignored => print_warning(&format!("{} is ignored by an override", key)),
    }
    Ok(())
}
