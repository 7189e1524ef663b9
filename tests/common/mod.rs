//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestEnv, ARRIVAL_TITLE, ARRIVAL_YEAR};
//! use meterboxd_stats::movie_store::MovieKey;
//!
//! #[tokio::test]
//! async fn test_resolve_arrival() {
//!     let env = TestEnv::new().await;
//!     let cache = env.cache();
//!
//!     let resolution = cache.resolve(&MovieKey::new(ARRIVAL_TITLE, ARRIVAL_YEAR)).await;
//!     assert!(resolution.unwrap().found());
//! }
//! ```

#![allow(dead_code)]

mod constants;
mod fake_tmdb;
mod fixtures;

pub use constants::*;
pub use fake_tmdb::FakeTmdbServer;
#[allow(unused_imports)]
pub use fixtures::{tmdb_client, tmdb_client_with, TestEnv};
