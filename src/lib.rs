//! MeterBoxd statistics library
//!
//! Compares a user's movie ratings with public rating and popularity data.
//! Public data is resolved through a tiered cache (memory, curated
//! overrides, SQLite, TMDB) and folded into ranked summaries.

pub mod config;
pub mod import;
pub mod metrics;
pub mod movie_store;
pub mod overrides;
pub mod resolver;
pub mod sqlite_persistence;
pub mod stats;
pub mod tmdb;

// Re-export commonly used types for convenience
pub use movie_store::{MovieKey, MovieStore, NullMovieStore, PublicDataRecord, SqliteMovieStore};
pub use overrides::{OverrideIndex, OverrideSource};
pub use resolver::{Resolution, ResolutionCache, ResolveError};
pub use stats::{AggregateSummary, RatingRow, StatisticsEngine, StatsReport};
pub use tmdb::{ExternalRatingSource, TmdbClient};
