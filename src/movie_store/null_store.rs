//! Null movie store implementation.
//!
//! Used when no database directory is configured: every read misses and
//! every write is dropped, so resolution falls through to the external
//! source on each run.

use super::models::{OverrideRecord, PublicDataRecord};
use super::MovieStore;
use anyhow::Result;

pub struct NullMovieStore;

impl MovieStore for NullMovieStore {
    fn get_movie(&self, _key: &str) -> Result<Option<PublicDataRecord>> {
        Ok(None)
    }

    fn put_movie(&self, _key: &str, _record: &PublicDataRecord) -> Result<()> {
        Ok(())
    }

    fn count_movies(&self) -> Result<usize> {
        Ok(0)
    }

    fn get_override(&self, _key: &str) -> Result<Option<OverrideRecord>> {
        Ok(None)
    }

    fn put_override(&self, _key: &str, _record: &OverrideRecord) -> Result<()> {
        Ok(())
    }

    fn get_all_overrides(&self) -> Result<Vec<(String, OverrideRecord)>> {
        Ok(vec![])
    }

    fn count_overrides(&self) -> Result<usize> {
        Ok(0)
    }

    fn replace_all(
        &self,
        _movies: &[(String, PublicDataRecord)],
        _overrides: &[(String, OverrideRecord)],
    ) -> Result<()> {
        Ok(())
    }
}
