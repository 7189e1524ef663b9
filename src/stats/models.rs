use crate::movie_store::PublicDataRecord;
use serde::{Deserialize, Serialize};

/// One line of a user's ratings export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRow {
    pub title: String,
    pub year: i32,
    /// The user's own rating on the 0-5 scale.
    pub user_rating: f64,
}

impl RatingRow {
    pub fn new(title: impl Into<String>, year: i32, user_rating: f64) -> Self {
        Self {
            title: title.into(),
            year,
            user_rating,
        }
    }
}

/// Weight of the age-normalised vote count in `vote_count_popularity`.
pub const VOTE_COUNT_WEIGHT: f64 = 0.7;
/// Weight of the raw popularity score in `vote_count_popularity`.
pub const POPULARITY_WEIGHT: f64 = 0.3;

/// Derived comparison figures for one resolved row. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovieStat {
    pub title: String,
    pub year: i32,
    pub public_rating: f64,
    pub user_rating: f64,
    pub rating_difference: f64,
    pub vote_count: f64,
    pub normalized_vote_count: f64,
    pub popularity: f64,
    pub vote_count_popularity: f64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub poster_url: String,
}

impl MovieStat {
    pub fn new(row: &RatingRow, record: &PublicDataRecord, current_year: i32) -> Self {
        // a title dated after `current_year` still counts as one year old
        let age_years = (i64::from(current_year) - i64::from(row.year) + 1).max(1);
        let normalized_vote_count = record.vote_count / age_years as f64;

        Self {
            title: row.title.clone(),
            year: row.year,
            public_rating: record.public_rating,
            user_rating: row.user_rating,
            rating_difference: row.user_rating - record.public_rating,
            vote_count: record.vote_count,
            normalized_vote_count,
            popularity: record.popularity,
            vote_count_popularity: VOTE_COUNT_WEIGHT * normalized_vote_count
                + POPULARITY_WEIGHT * record.popularity,
            poster_url: record.poster_url.clone(),
        }
    }
}

/// The two standard ranking metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// `user_rating - public_rating`; high values are titles the user
    /// likes more than the public does.
    RatingDifference,
    /// Raw `vote_count_popularity`; high values are the least obscure titles.
    Popularity,
}

impl Metric {
    pub fn value(&self, stat: &MovieStat) -> f64 {
        match self {
            Metric::RatingDifference => stat.rating_difference,
            Metric::Popularity => stat.vote_count_popularity,
        }
    }
}

/// Result of ranking a batch by one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateSummary {
    /// Mean of the metric, `0.0` for an empty batch.
    pub average_metric: f64,
    /// Highest metric first.
    pub top5: Vec<MovieStat>,
    /// Lowest metric first.
    pub bottom5: Vec<MovieStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingStats {
    pub average_rating_difference: f64,
    pub underrated_movies: Vec<MovieStat>,
    pub overrated_movies: Vec<MovieStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObscurityStats {
    pub obscurity_score: f64,
    pub most_obscure_movies: Vec<MovieStat>,
    pub least_obscure_movies: Vec<MovieStat>,
}

/// Both rankings for one ratings export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    pub rating_stats: RatingStats,
    pub obscurity_stats: ObscurityStats,
    /// Rows that resolved to usable public data.
    pub analyzed_movies: usize,
    /// Rows excluded for any reason.
    pub skipped_movies: usize,
}

impl StatsReport {
    pub fn new(
        rating: AggregateSummary,
        obscurity: AggregateSummary,
        analyzed_movies: usize,
        skipped_movies: usize,
    ) -> Self {
        Self {
            rating_stats: RatingStats {
                average_rating_difference: rating.average_metric,
                underrated_movies: rating.top5,
                overrated_movies: rating.bottom5,
            },
            obscurity_stats: ObscurityStats {
                obscurity_score: obscurity.average_metric,
                most_obscure_movies: obscurity.bottom5,
                least_obscure_movies: obscurity.top5,
            },
            analyzed_movies,
            skipped_movies,
        }
    }
}
