//! TMDB API client for movie rating lookups.
//!
//! Requests are spaced by a configurable minimum interval so that a large
//! ratings export doesn't trip the API's rate limiting.

use super::models::{RawSourceRecord, SearchMovieResponse};
use super::{ExternalRatingSource, SourceError};
use anyhow::Result;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

pub const DEFAULT_TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";

#[derive(Debug, Clone)]
pub struct TmdbClientConfig {
    /// Without a key every lookup fails with [`SourceError::NotConfigured`].
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
    /// Minimum spacing between two outbound requests.
    pub min_interval: Duration,
}

impl Default for TmdbClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_TMDB_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
            min_interval: Duration::from_millis(250),
        }
    }
}

pub struct TmdbClient {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl TmdbClient {
    pub fn new(config: TmdbClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.filter(|k| !k.trim().is_empty()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            min_interval: config.min_interval,
            last_request: Mutex::new(None),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    fn search_url(&self, api_key: &str, title: &str, year: i32) -> String {
        format!(
            "{}/search/movie?api_key={}&query={}&year={}",
            self.base_url,
            urlencoding::encode(api_key),
            urlencoding::encode(title),
            year
        )
    }
}

#[async_trait]
impl ExternalRatingSource for TmdbClient {
    async fn fetch(&self, title: &str, year: i32) -> Result<Option<RawSourceRecord>, SourceError> {
        let api_key = self.api_key.as_deref().ok_or(SourceError::NotConfigured)?;

        self.rate_limit().await;

        debug!("TMDB search for \"{}\" ({})", title, year);
        let response = self
            .client
            .get(self.search_url(api_key, title, year))
            .send()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Unavailable(format!(
                "TMDB search failed with status {}",
                status
            )));
        }

        let body: SearchMovieResponse = response
            .json()
            .await
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;

        Ok(body.results.into_iter().next().map(RawSourceRecord::from))
    }
}
