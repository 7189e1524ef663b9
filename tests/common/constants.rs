//! Shared constants for end-to-end tests
//!
//! When the fake catalog changes, update only this file.

// ============================================================================
// Fake TMDB Credentials
// ============================================================================

/// The only API key the fake TMDB server accepts
pub const TEST_API_KEY: &str = "test-api-key";

// ============================================================================
// Fake Catalog Titles
// ============================================================================

/// Well rated and popular. vote_average 8.0 => public rating 4.0
pub const ARRIVAL_TITLE: &str = "Arrival";
pub const ARRIVAL_YEAR: i32 = 2016;
pub const ARRIVAL_TMDB_ID: i64 = 329865;

/// Present in the catalog but with zero votes, so never usable
pub const CATS_TITLE: &str = "Cats";
pub const CATS_YEAR: i32 = 2019;

/// Obscure and old. vote_average 7.0 => public rating 3.5
pub const SOLARIS_TITLE: &str = "Solaris";
pub const SOLARIS_YEAR: i32 = 1972;

/// Non-ASCII title to exercise query encoding
pub const AMELIE_TITLE: &str = "Amélie & Nino";
pub const AMELIE_YEAR: i32 = 2001;

/// The fake server answers 429 for this title
pub const RATE_LIMITED_TITLE: &str = "Rate Limited";

/// The fake server answers 200 with a non-JSON body for this title
pub const GARBLED_TITLE: &str = "Garbled";

/// Poster path fragment every fake catalog entry carries
pub const POSTER_PATH: &str = "/poster.jpg";

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for the fake server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// Timeout for TMDB client requests in tests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 5;
