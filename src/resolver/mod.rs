//! Four-tier resolution of public movie data.
//!
//! Lookup order is memory, overrides, persistent store and finally the
//! external catalog. The first tier that answers wins. External hits are
//! written back to the persistent store and the memory tier.
//!
//! Negative external results are not cached: a title the catalog doesn't
//! know is re-queried on every call, so titles added to the catalog later
//! are picked up. The cost is one outbound request per unresolvable title
//! per call.

mod memory_tier;

pub use memory_tier::MemoryTier;

use crate::metrics::{record_external_lookup, record_resolution, record_store_error};
use crate::movie_store::{MovieKey, MovieStore, PublicDataRecord};
use crate::overrides::OverrideIndex;
use crate::tmdb::{poster_url, ExternalRatingSource, RawSourceRecord, SourceError};
use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Which tier produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Memory,
    Override,
    Persistent,
    External,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Memory => "memory",
            Tier::Override => "override",
            Tier::Persistent => "persistent",
            Tier::External => "external",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found {
        record: PublicDataRecord,
        tier: Tier,
    },
    /// No tier knows the key.
    NotFound,
    /// An override marks the key as excluded.
    Ignored,
}

impl Resolution {
    pub fn found(&self) -> bool {
        matches!(self, Resolution::Found { .. })
    }

    pub fn record(&self) -> Option<&PublicDataRecord> {
        match self {
            Resolution::Found { record, .. } => Some(record),
            _ => None,
        }
    }

    pub fn into_record(self) -> Option<PublicDataRecord> {
        match self {
            Resolution::Found { record, .. } => Some(record),
            _ => None,
        }
    }

    pub fn tier(&self) -> Option<Tier> {
        match self {
            Resolution::Found { tier, .. } => Some(*tier),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Invalid movie key \"{0}\": title must not be empty")]
    InvalidKey(String),

    #[error("No external rating source is configured")]
    SourceNotConfigured,

    #[error("External rating source unavailable")]
    SourceUnavailable(#[source] SourceError),
}

pub struct ResolutionCache {
    memory: MemoryTier,
    overrides: Arc<OverrideIndex>,
    store: Arc<dyn MovieStore>,
    source: Option<Arc<dyn ExternalRatingSource>>,
}

impl ResolutionCache {
    pub fn new(
        overrides: Arc<OverrideIndex>,
        store: Arc<dyn MovieStore>,
        source: Option<Arc<dyn ExternalRatingSource>>,
    ) -> Self {
        Self {
            memory: MemoryTier::unbounded(),
            overrides,
            store,
            source,
        }
    }

    /// Replaces the memory tier, e.g. with a bounded LRU one.
    pub fn with_memory_tier(mut self, memory: MemoryTier) -> Self {
        self.memory = memory;
        self
    }

    pub async fn resolve(&self, key: &MovieKey) -> Result<Resolution, ResolveError> {
        if !key.is_valid() {
            return Err(ResolveError::InvalidKey(key.canonical().to_string()));
        }
        let canonical = key.canonical();

        if let Some(record) = self.memory.get(canonical) {
            debug!("Memory hit for {}", canonical);
            return Ok(self.found(record, Tier::Memory));
        }

        if let Some(override_record) = self.overrides.get(canonical) {
            if override_record.ignore {
                debug!("Override marks {} as ignored", canonical);
                record_resolution("ignored");
                return Ok(Resolution::Ignored);
            }
            debug!("Override hit for {}", canonical);
            self.memory.insert(canonical, override_record.data.clone());
            return Ok(self.found(override_record.data, Tier::Override));
        }

        match self.store.get_movie(canonical) {
            Ok(Some(record)) => {
                debug!("Persistent store hit for {}", canonical);
                self.memory.insert(canonical, record.clone());
                return Ok(self.found(record, Tier::Persistent));
            }
            Ok(None) => {}
            Err(e) => {
                warn!(
                    "Persistent store read failed for {}, skipping tier: {:#}",
                    canonical, e
                );
                record_store_error("get");
            }
        }

        self.resolve_external(key).await
    }

    async fn resolve_external(&self, key: &MovieKey) -> Result<Resolution, ResolveError> {
        let canonical = key.canonical();
        let source = self
            .source
            .as_ref()
            .ok_or(ResolveError::SourceNotConfigured)?;

        debug!("External lookup for {}", canonical);
        let started = Instant::now();
        let fetched = source.fetch(key.title(), key.year()).await;

        let raw = match fetched {
            Ok(Some(raw)) => {
                record_external_lookup("found", started.elapsed());
                raw
            }
            Ok(None) => {
                record_external_lookup("not_found", started.elapsed());
                debug!("External source has no result for {}", canonical);
                record_resolution("not_found");
                return Ok(Resolution::NotFound);
            }
            Err(SourceError::NotConfigured) => {
                record_external_lookup("not_configured", started.elapsed());
                return Err(ResolveError::SourceNotConfigured);
            }
            Err(e) => {
                record_external_lookup("error", started.elapsed());
                return Err(ResolveError::SourceUnavailable(e));
            }
        };

        let record = to_public_record(raw);
        if let Err(e) = self.store.put_movie(canonical, &record) {
            error!("Failed to persist resolved record for {}: {:#}", canonical, e);
            record_store_error("put");
        }
        self.memory.insert(canonical, record.clone());

        Ok(self.found(record, Tier::External))
    }

    fn found(&self, record: PublicDataRecord, tier: Tier) -> Resolution {
        record_resolution(tier.as_str());
        Resolution::Found { record, tier }
    }

    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    pub fn contains_in_memory(&self, key: &MovieKey) -> bool {
        self.memory.contains(key.canonical())
    }

    /// Drops the memory tier. Durable data is untouched and refills it on
    /// the next lookups.
    pub fn clear_memory(&self) {
        self.memory.clear();
    }

    /// Re-reads the override index. The memory tier is cleared as well so
    /// that stale entries can't shadow new overrides.
    pub fn reload_overrides(&self) -> Result<usize> {
        let count = self.overrides.reload()?;
        self.memory.clear();
        Ok(count)
    }
}

/// Converts a catalog hit to the internal 0-5 scale.
fn to_public_record(raw: RawSourceRecord) -> PublicDataRecord {
    PublicDataRecord {
        public_rating: raw.vote_average / 2.0,
        vote_count: raw.vote_count,
        popularity: raw.popularity,
        poster_url: poster_url(raw.poster_path.as_deref()),
        tmdb_id: raw.tmdb_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movie_store::{NullMovieStore, OverrideRecord, SqliteMovieStore};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Canned catalog answers keyed by `"Title (Year)"`.
    struct MockSource {
        answers: HashMap<String, RawSourceRecord>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl MockSource {
        fn new() -> Self {
            Self {
                answers: HashMap::new(),
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn with(mut self, title: &str, year: i32, raw: RawSourceRecord) -> Self {
            self.answers.insert(format!("{} ({})", title, year), raw);
            self
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ExternalRatingSource for MockSource {
        async fn fetch(
            &self,
            title: &str,
            year: i32,
        ) -> Result<Option<RawSourceRecord>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SourceError::Unavailable("connection refused".to_string()));
            }
            Ok(self.answers.get(&format!("{} ({})", title, year)).cloned())
        }
    }

    /// A store whose every operation fails.
    struct BrokenStore {
        put_calls: Mutex<usize>,
    }

    impl MovieStore for BrokenStore {
        fn get_movie(&self, _key: &str) -> Result<Option<PublicDataRecord>> {
            anyhow::bail!("store down")
        }
        fn put_movie(&self, _key: &str, _record: &PublicDataRecord) -> Result<()> {
            *self.put_calls.lock().unwrap() += 1;
            anyhow::bail!("store down")
        }
        fn count_movies(&self) -> Result<usize> {
            anyhow::bail!("store down")
        }
        fn get_override(&self, _key: &str) -> Result<Option<OverrideRecord>> {
            anyhow::bail!("store down")
        }
        fn put_override(&self, _key: &str, _record: &OverrideRecord) -> Result<()> {
            anyhow::bail!("store down")
        }
        fn get_all_overrides(&self) -> Result<Vec<(String, OverrideRecord)>> {
            anyhow::bail!("store down")
        }
        fn count_overrides(&self) -> Result<usize> {
            anyhow::bail!("store down")
        }
        fn replace_all(
            &self,
            _movies: &[(String, PublicDataRecord)],
            _overrides: &[(String, OverrideRecord)],
        ) -> Result<()> {
            anyhow::bail!("store down")
        }
    }

    struct TestStore {
        store: Arc<SqliteMovieStore>,
        _temp_dir: TempDir,
    }

    fn create_test_store() -> TestStore {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteMovieStore::new(temp_dir.path().join("movies.db")).unwrap();
        TestStore {
            store: Arc::new(store),
            _temp_dir: temp_dir,
        }
    }

    fn arrival_raw() -> RawSourceRecord {
        RawSourceRecord {
            tmdb_id: Some(329865),
            vote_average: 8.0,
            vote_count: 1000.0,
            popularity: 10.0,
            poster_path: Some("/arrival.jpg".to_string()),
        }
    }

    fn record(rating: f64, votes: f64, popularity: f64) -> PublicDataRecord {
        PublicDataRecord {
            public_rating: rating,
            vote_count: votes,
            popularity,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_external_hit_is_scaled_written_back_and_cached() {
        let test_store = create_test_store();
        let source = Arc::new(MockSource::new().with("Arrival", 2016, arrival_raw()));
        let cache = ResolutionCache::new(
            Arc::new(OverrideIndex::empty()),
            test_store.store.clone(),
            Some(source.clone()),
        );
        let key = MovieKey::new("Arrival", 2016);

        let first = cache.resolve(&key).await.unwrap();
        assert_eq!(first.tier(), Some(Tier::External));
        let record = first.record().unwrap().clone();
        assert_eq!(record.public_rating, 4.0);
        assert_eq!(record.vote_count, 1000.0);
        assert_eq!(record.popularity, 10.0);
        assert_eq!(record.poster_url, "https://image.tmdb.org/t/p/w500/arrival.jpg");
        assert_eq!(record.tmdb_id, Some(329865));

        let persisted = test_store.store.get_movie("Arrival (2016)").unwrap();
        assert_eq!(persisted, Some(record.clone()));

        let second = cache.resolve(&key).await.unwrap();
        assert_eq!(second.tier(), Some(Tier::Memory));
        assert_eq!(second.record(), Some(&record));
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn test_persistent_tier_survives_memory_clear() {
        let test_store = create_test_store();
        let source = Arc::new(MockSource::new().with("Arrival", 2016, arrival_raw()));
        let cache = ResolutionCache::new(
            Arc::new(OverrideIndex::empty()),
            test_store.store.clone(),
            Some(source.clone()),
        );
        let key = MovieKey::new("Arrival", 2016);

        cache.resolve(&key).await.unwrap();
        cache.clear_memory();
        assert_eq!(cache.memory_len(), 0);

        let again = cache.resolve(&key).await.unwrap();
        assert_eq!(again.tier(), Some(Tier::Persistent));
        assert!(cache.contains_in_memory(&key));
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn test_not_found_is_not_cached() {
        let source = Arc::new(MockSource::new());
        let cache = ResolutionCache::new(
            Arc::new(OverrideIndex::empty()),
            Arc::new(NullMovieStore),
            Some(source.clone()),
        );
        let key = MovieKey::new("Nonexistent Film", 1999);

        assert_eq!(cache.resolve(&key).await.unwrap(), Resolution::NotFound);
        assert_eq!(cache.resolve(&key).await.unwrap(), Resolution::NotFound);
        assert_eq!(source.call_count(), 2);
        assert!(!cache.contains_in_memory(&key));
    }

    #[tokio::test]
    async fn test_ignored_override_short_circuits_every_tier() {
        let test_store = create_test_store();
        test_store
            .store
            .put_movie("Cats (2019)", &record(1.5, 5000.0, 20.0))
            .unwrap();
        let overrides = OverrideIndex::from_entries([("Cats (2019)", OverrideRecord::ignored())]);
        let source = Arc::new(MockSource::new());
        let cache = ResolutionCache::new(
            Arc::new(overrides),
            test_store.store.clone(),
            Some(source.clone()),
        );
        let key = MovieKey::new("Cats", 2019);

        let resolution = cache.resolve(&key).await.unwrap();
        assert_eq!(resolution, Resolution::Ignored);
        assert!(!resolution.found());
        assert!(!cache.contains_in_memory(&key));
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn test_override_supersedes_store_and_is_not_written_back() {
        let test_store = create_test_store();
        test_store
            .store
            .put_movie("Arrival (2016)", &record(2.0, 10.0, 1.0))
            .unwrap();
        let curated = record(4.5, 2000.0, 30.0);
        let overrides = OverrideIndex::from_entries([(
            "Arrival (2016)",
            OverrideRecord::with_data(curated.clone()),
        )]);
        let cache = ResolutionCache::new(Arc::new(overrides), test_store.store.clone(), None);
        let key = MovieKey::new("Arrival", 2016);

        let resolution = cache.resolve(&key).await.unwrap();
        assert_eq!(resolution.tier(), Some(Tier::Override));
        assert_eq!(resolution.record(), Some(&curated));
        assert!(cache.contains_in_memory(&key));

        let persisted = test_store.store.get_movie("Arrival (2016)").unwrap().unwrap();
        assert_eq!(persisted.public_rating, 2.0);
    }

    #[tokio::test]
    async fn test_empty_title_is_invalid_key() {
        let cache = ResolutionCache::new(
            Arc::new(OverrideIndex::empty()),
            Arc::new(NullMovieStore),
            None,
        );
        let result = cache.resolve(&MovieKey::new("  ", 2000)).await;
        assert!(matches!(result, Err(ResolveError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_miss_without_source_is_not_configured() {
        let cache = ResolutionCache::new(
            Arc::new(OverrideIndex::empty()),
            Arc::new(NullMovieStore),
            None,
        );
        let result = cache.resolve(&MovieKey::new("Arrival", 2016)).await;
        assert!(matches!(result, Err(ResolveError::SourceNotConfigured)));
    }

    #[tokio::test]
    async fn test_source_failure_is_source_unavailable() {
        let cache = ResolutionCache::new(
            Arc::new(OverrideIndex::empty()),
            Arc::new(NullMovieStore),
            Some(Arc::new(MockSource::failing())),
        );
        let result = cache.resolve(&MovieKey::new("Arrival", 2016)).await;
        assert!(matches!(
            result,
            Err(ResolveError::SourceUnavailable(SourceError::Unavailable(_)))
        ));
    }

    #[tokio::test]
    async fn test_broken_store_degrades_to_next_tier() {
        let store = Arc::new(BrokenStore {
            put_calls: Mutex::new(0),
        });
        let source = Arc::new(MockSource::new().with("Arrival", 2016, arrival_raw()));
        let cache = ResolutionCache::new(
            Arc::new(OverrideIndex::empty()),
            store.clone(),
            Some(source.clone()),
        );
        let key = MovieKey::new("Arrival", 2016);

        let resolution = cache.resolve(&key).await.unwrap();
        assert_eq!(resolution.tier(), Some(Tier::External));
        assert_eq!(*store.put_calls.lock().unwrap(), 1);

        // the failed write doesn't stop the memory tier from answering
        let again = cache.resolve(&key).await.unwrap();
        assert_eq!(again.tier(), Some(Tier::Memory));
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn test_reload_overrides_clears_memory() {
        let test_store = create_test_store();
        let overrides = Arc::new(
            OverrideIndex::load(crate::overrides::OverrideSource::Store(
                test_store.store.clone(),
            ))
            .unwrap(),
        );
        test_store
            .store
            .put_movie("Cats (2019)", &record(1.5, 5000.0, 20.0))
            .unwrap();
        let cache = ResolutionCache::new(overrides, test_store.store.clone(), None);
        let key = MovieKey::new("Cats", 2019);

        assert_eq!(cache.resolve(&key).await.unwrap().tier(), Some(Tier::Persistent));

        test_store
            .store
            .put_override("Cats (2019)", &OverrideRecord::ignored())
            .unwrap();
        assert_eq!(cache.reload_overrides().unwrap(), 1);
        assert_eq!(cache.memory_len(), 0);
        assert_eq!(cache.resolve(&key).await.unwrap(), Resolution::Ignored);
    }

    #[tokio::test]
    async fn test_bounded_memory_tier() {
        let source = Arc::new(
            MockSource::new()
                .with("A", 2000, arrival_raw())
                .with("B", 2000, arrival_raw()),
        );
        let cache = ResolutionCache::new(
            Arc::new(OverrideIndex::empty()),
            Arc::new(NullMovieStore),
            Some(source.clone()),
        )
        .with_memory_tier(MemoryTier::with_capacity(1));

        cache.resolve(&MovieKey::new("A", 2000)).await.unwrap();
        cache.resolve(&MovieKey::new("B", 2000)).await.unwrap();
        assert_eq!(cache.memory_len(), 1);
        assert!(!cache.contains_in_memory(&MovieKey::new("A", 2000)));

        let again = cache.resolve(&MovieKey::new("A", 2000)).await.unwrap();
        assert_eq!(again.tier(), Some(Tier::External));
        assert_eq!(source.call_count(), 3);
    }
}
