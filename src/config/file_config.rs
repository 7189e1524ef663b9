use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Storage
    pub db_dir: Option<String>,
    pub overrides_file: Option<String>,

    // External catalog
    pub tmdb_api_key: Option<String>,
    pub tmdb_base_url: Option<String>,
    pub tmdb_timeout_sec: Option<u64>,
    pub tmdb_min_interval_ms: Option<u64>,

    // Analysis
    pub current_year: Option<i32>,
    pub concurrency: Option<usize>,
    pub memory_cache_capacity: Option<usize>,
    /// "skip" or "abort"
    pub on_source_error: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
