//! Test fixtures: on-disk movie store and a fully wired resolution stack.

use super::constants::*;
use super::fake_tmdb::FakeTmdbServer;
use meterboxd_stats::movie_store::SqliteMovieStore;
use meterboxd_stats::overrides::{OverrideIndex, OverrideSource};
use meterboxd_stats::resolver::ResolutionCache;
use meterboxd_stats::tmdb::{ExternalRatingSource, TmdbClient, TmdbClientConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// A TMDB client pointed at `server` with the accepted key and no rate limit.
pub fn tmdb_client(server: &FakeTmdbServer) -> TmdbClient {
    tmdb_client_with(server, Some(TEST_API_KEY), Duration::ZERO)
}

pub fn tmdb_client_with(
    server: &FakeTmdbServer,
    api_key: Option<&str>,
    min_interval: Duration,
) -> TmdbClient {
    TmdbClient::new(TmdbClientConfig {
        api_key: api_key.map(String::from),
        base_url: server.base_url.clone(),
        timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        min_interval,
    })
    .expect("Failed to build TMDB client")
}

/// SQLite store in a temp dir plus a fake TMDB server.
///
/// Caches built with [`TestEnv::cache`] share the store but each get a
/// fresh memory tier, like separate process runs.
pub struct TestEnv {
    pub tmdb: FakeTmdbServer,
    pub store: Arc<SqliteMovieStore>,
    pub db_path: PathBuf,
    _temp_dir: TempDir,
}

impl TestEnv {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("movies.db");
        let store = Arc::new(SqliteMovieStore::new(&db_path).expect("Failed to open movie store"));
        Self {
            tmdb: FakeTmdbServer::spawn().await,
            store,
            db_path,
            _temp_dir: temp_dir,
        }
    }

    /// A cache over the shared store, with overrides read from that store.
    pub fn cache(&self) -> Arc<ResolutionCache> {
        let overrides = OverrideIndex::load(OverrideSource::Store(self.store.clone()))
            .expect("Failed to load overrides");
        let source: Arc<dyn ExternalRatingSource> = Arc::new(tmdb_client(&self.tmdb));
        Arc::new(ResolutionCache::new(
            Arc::new(overrides),
            self.store.clone(),
            Some(source),
        ))
    }
}
