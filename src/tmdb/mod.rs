//! External rating source.
//!
//! The resolution cache talks to the outside world only through the
//! [`ExternalRatingSource`] trait; [`TmdbClient`] is the production
//! implementation backed by The Movie Database search API.

mod client;
mod models;

pub use client::{TmdbClient, TmdbClientConfig, DEFAULT_TMDB_BASE_URL};
pub use models::RawSourceRecord;

use async_trait::async_trait;
use thiserror::Error;

/// Base URL that poster path fragments are appended to.
pub const POSTER_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("External rating source is not configured (missing API key)")]
    NotConfigured,

    #[error("External rating source unavailable: {0}")]
    Unavailable(String),

    #[error("External rating source returned an invalid response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait ExternalRatingSource: Send + Sync {
    /// Looks up a single title/year pair.
    ///
    /// `Ok(None)` is a definitive "no such title". Transport and protocol
    /// problems are errors, never `Ok(None)`. Implementations own their
    /// call-level timeout.
    async fn fetch(&self, title: &str, year: i32) -> Result<Option<RawSourceRecord>, SourceError>;
}

/// Builds the full poster URL for a path fragment, empty when there is none.
pub fn poster_url(path: Option<&str>) -> String {
    match path {
        Some(path) if !path.is_empty() => format!("{}{}", POSTER_BASE_URL, path),
        _ => String::new(),
    }
}
