//! SQLite schema definitions for the movie database.
//!
//! Two collections live here: resolved public data written back by the
//! resolution cache, and manually curated overrides.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

// =============================================================================
// Version 1 - Movie data and overrides
// =============================================================================

const MOVIE_DATA_TABLE_V1: Table = Table {
    name: "movie_data",
    columns: &[
        sqlite_column!("title_with_year", &SqlType::Text, is_primary_key = true),
        sqlite_column!("public_rating", &SqlType::Real, non_null = true),
        sqlite_column!("vote_count", &SqlType::Real, non_null = true),
        sqlite_column!("popularity", &SqlType::Real, non_null = true),
        sqlite_column!(
            "poster_url",
            &SqlType::Text,
            non_null = true,
            default_value = Some("''")
        ),
        sqlite_column!("updated_at", &SqlType::Text, non_null = true),
    ],
    indices: &[],
};

const OVERRIDES_TABLE_V1: Table = Table {
    name: "overrides",
    columns: &[
        sqlite_column!("title_with_year", &SqlType::Text, is_primary_key = true),
        sqlite_column!("public_rating", &SqlType::Real),
        sqlite_column!("vote_count", &SqlType::Real),
        sqlite_column!("popularity", &SqlType::Real),
        sqlite_column!("poster_url", &SqlType::Text),
        sqlite_column!(
            "is_ignored",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("updated_at", &SqlType::Text, non_null = true),
    ],
    indices: &[],
};

// =============================================================================
// Version 2 - External catalog id on movie data
// =============================================================================

const MOVIE_DATA_TABLE_V2: Table = Table {
    name: "movie_data",
    columns: &[
        sqlite_column!("title_with_year", &SqlType::Text, is_primary_key = true),
        sqlite_column!("public_rating", &SqlType::Real, non_null = true),
        sqlite_column!("vote_count", &SqlType::Real, non_null = true),
        sqlite_column!("popularity", &SqlType::Real, non_null = true),
        sqlite_column!(
            "poster_url",
            &SqlType::Text,
            non_null = true,
            default_value = Some("''")
        ),
        sqlite_column!("updated_at", &SqlType::Text, non_null = true),
        sqlite_column!("tmdb_id", &SqlType::Integer),
    ],
    indices: &[("idx_movie_data_tmdb_id", "tmdb_id")],
};

/// Migration from version 1 to version 2: add tmdb_id to movie_data
fn migrate_v1_to_v2(conn: &rusqlite::Connection) -> anyhow::Result<()> {
    conn.execute("ALTER TABLE movie_data ADD COLUMN tmdb_id INTEGER", [])?;
    conn.execute(
        "CREATE INDEX idx_movie_data_tmdb_id ON movie_data(tmdb_id)",
        [],
    )?;
    Ok(())
}

// =============================================================================
// Versioned Schema Definition
// =============================================================================

pub const MOVIE_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 1,
        tables: &[MOVIE_DATA_TABLE_V1, OVERRIDES_TABLE_V1],
        migration: None,
    },
    VersionedSchema {
        version: 2,
        tables: &[MOVIE_DATA_TABLE_V2, OVERRIDES_TABLE_V1],
        migration: Some(migrate_v1_to_v2),
    },
];
