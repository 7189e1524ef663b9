//! Models for the TMDB search API.

use serde::Deserialize;

/// A single hit from the external catalog, still on the source's scales.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSourceRecord {
    pub tmdb_id: Option<i64>,
    /// Average rating on a 0-10 scale.
    pub vote_average: f64,
    pub vote_count: f64,
    pub popularity: f64,
    /// Path fragment such as `/abc.jpg`.
    pub poster_path: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct SearchMovieResponse {
    #[serde(default)]
    pub results: Vec<SearchMovieResult>,
}

#[derive(Deserialize)]
pub(super) struct SearchMovieResult {
    pub id: Option<i64>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: f64,
    #[serde(default)]
    pub popularity: f64,
    pub poster_path: Option<String>,
}

impl From<SearchMovieResult> for RawSourceRecord {
    fn from(result: SearchMovieResult) -> Self {
        Self {
            tmdb_id: result.id,
            vote_average: result.vote_average,
            vote_count: result.vote_count,
            popularity: result.popularity,
            poster_path: result.poster_path.filter(|p| !p.is_empty()),
        }
    }
}
