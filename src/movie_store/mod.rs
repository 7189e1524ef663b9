mod models;
mod null_store;
mod schema;
mod sqlite_movie_store;

pub use models::*;
pub use null_store::NullMovieStore;
pub use schema::MOVIE_VERSIONED_SCHEMAS;
pub use sqlite_movie_store::SqliteMovieStore;

use anyhow::Result;

/// Durable storage for resolved movie data and curated overrides.
///
/// Keys are canonical `"Title (Year)"` strings. Writes are upserts and
/// therefore idempotent. An `Err` from any method means the store is
/// unavailable; callers decide whether that is fatal.
pub trait MovieStore: Send + Sync {
    // Resolved public data
    fn get_movie(&self, key: &str) -> Result<Option<PublicDataRecord>>;
    fn put_movie(&self, key: &str, record: &PublicDataRecord) -> Result<()>;
    fn count_movies(&self) -> Result<usize>;

    // Overrides
    fn get_override(&self, key: &str) -> Result<Option<OverrideRecord>>;
    fn put_override(&self, key: &str, record: &OverrideRecord) -> Result<()>;
    fn get_all_overrides(&self) -> Result<Vec<(String, OverrideRecord)>>;
    fn count_overrides(&self) -> Result<usize>;

    /// Replaces the whole store contents with `movies` and `overrides`.
    ///
    /// On error the previous contents are left as they were.
    fn replace_all(
        &self,
        movies: &[(String, PublicDataRecord)],
        overrides: &[(String, OverrideRecord)],
    ) -> Result<()>;
}
