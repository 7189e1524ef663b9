mod file_config;

pub use file_config::FileConfig;

use crate::stats::{SourceErrorPolicy, DEFAULT_CONCURRENCY, DEFAULT_CURRENT_YEAR};
use crate::tmdb::{TmdbClientConfig, DEFAULT_TMDB_BASE_URL};
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TMDB_TIMEOUT_SEC: u64 = 10;
pub const DEFAULT_TMDB_MIN_INTERVAL_MS: u64 = 250;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub overrides_file: Option<PathBuf>,
    pub tmdb_api_key: Option<String>,
    pub tmdb_base_url: String,
    pub tmdb_timeout_sec: u64,
    pub tmdb_min_interval_ms: u64,
    pub current_year: i32,
    pub concurrency: usize,
    pub memory_cache_capacity: usize,
    pub on_source_error: SourceErrorPolicy,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_dir: None,
            overrides_file: None,
            tmdb_api_key: None,
            tmdb_base_url: DEFAULT_TMDB_BASE_URL.to_string(),
            tmdb_timeout_sec: DEFAULT_TMDB_TIMEOUT_SEC,
            tmdb_min_interval_ms: DEFAULT_TMDB_MIN_INTERVAL_MS,
            current_year: DEFAULT_CURRENT_YEAR,
            concurrency: DEFAULT_CONCURRENCY,
            memory_cache_capacity: 0,
            on_source_error: SourceErrorPolicy::Skip,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `None` disables persistence.
    pub db_dir: Option<PathBuf>,
    /// When set, overrides are read from this JSON file instead of the store.
    pub overrides_file: Option<PathBuf>,
    pub tmdb: TmdbSettings,
    pub current_year: i32,
    pub concurrency: usize,
    /// 0 means unbounded.
    pub memory_cache_capacity: usize,
    pub on_source_error: SourceErrorPolicy,
}

#[derive(Debug, Clone)]
pub struct TmdbSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
    pub min_interval: Duration,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone());
        if let Some(dir) = &db_dir {
            if !dir.exists() {
                bail!("Database directory does not exist: {:?}", dir);
            }
            if !dir.is_dir() {
                bail!("db_dir is not a directory: {:?}", dir);
            }
        }

        let overrides_file = file
            .overrides_file
            .map(PathBuf::from)
            .or_else(|| cli.overrides_file.clone());
        if let Some(path) = &overrides_file {
            if !path.is_file() {
                bail!("Overrides file not found: {:?}", path);
            }
        }

        let api_key = file
            .tmdb_api_key
            .or_else(|| cli.tmdb_api_key.clone())
            .filter(|k| !k.trim().is_empty());
        let base_url = file
            .tmdb_base_url
            .unwrap_or_else(|| cli.tmdb_base_url.clone());
        if base_url.trim().is_empty() {
            bail!("tmdb_base_url must not be empty");
        }
        let timeout_sec = file.tmdb_timeout_sec.unwrap_or(cli.tmdb_timeout_sec);
        if timeout_sec == 0 {
            bail!("tmdb_timeout_sec must be at least 1");
        }
        let min_interval_ms = file
            .tmdb_min_interval_ms
            .unwrap_or(cli.tmdb_min_interval_ms);

        let current_year = file.current_year.unwrap_or(cli.current_year);
        let concurrency = file.concurrency.unwrap_or(cli.concurrency);
        if concurrency == 0 {
            bail!("concurrency must be at least 1");
        }
        let memory_cache_capacity = file
            .memory_cache_capacity
            .unwrap_or(cli.memory_cache_capacity);

        let on_source_error = match file.on_source_error {
            Some(s) => parse_source_error_policy(&s)?,
            None => cli.on_source_error,
        };

        Ok(Self {
            db_dir,
            overrides_file,
            tmdb: TmdbSettings {
                api_key,
                base_url,
                timeout: Duration::from_secs(timeout_sec),
                min_interval: Duration::from_millis(min_interval_ms),
            },
            current_year,
            concurrency,
            memory_cache_capacity,
            on_source_error,
        })
    }

    pub fn movies_db_path(&self) -> Option<PathBuf> {
        self.db_dir.as_ref().map(|dir| dir.join("movies.db"))
    }

    pub fn tmdb_client_config(&self) -> TmdbClientConfig {
        TmdbClientConfig {
            api_key: self.tmdb.api_key.clone(),
            base_url: self.tmdb.base_url.clone(),
            timeout: self.tmdb.timeout,
            min_interval: self.tmdb.min_interval,
        }
    }
}

/// Uses clap's ValueEnum trait for parsing.
fn parse_source_error_policy(s: &str) -> Result<SourceErrorPolicy> {
    SourceErrorPolicy::from_str(s, true)
        .map_err(|_| anyhow::anyhow!("Invalid on_source_error value \"{}\" (expected skip or abort)", s))
}
