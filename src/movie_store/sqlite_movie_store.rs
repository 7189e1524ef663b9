use super::models::{OverrideRecord, PublicDataRecord};
use super::schema::MOVIE_VERSIONED_SCHEMAS;
use super::MovieStore;
use crate::sqlite_persistence::open_versioned;
use anyhow::{anyhow, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Movie store backed by a single SQLite file.
///
/// The connection is owned by the store and closed when the store is
/// dropped.
pub struct SqliteMovieStore {
    conn: Mutex<Connection>,
}

impl SqliteMovieStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned(db_path, MOVIE_VERSIONED_SCHEMAS, "movie")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Movie store connection is unavailable (poisoned lock)"))
    }

    fn now() -> String {
        Utc::now().to_rfc3339()
    }

    fn row_to_movie(row: &rusqlite::Row) -> rusqlite::Result<PublicDataRecord> {
        Ok(PublicDataRecord {
            public_rating: row.get("public_rating")?,
            vote_count: row.get("vote_count")?,
            popularity: row.get("popularity")?,
            poster_url: row.get("poster_url")?,
            tmdb_id: row.get("tmdb_id")?,
        })
    }

    fn row_to_override(row: &rusqlite::Row) -> rusqlite::Result<OverrideRecord> {
        let is_ignored: i64 = row.get("is_ignored")?;
        Ok(OverrideRecord {
            data: PublicDataRecord {
                public_rating: row.get::<_, Option<f64>>("public_rating")?.unwrap_or(0.0),
                vote_count: row.get::<_, Option<f64>>("vote_count")?.unwrap_or(0.0),
                popularity: row.get::<_, Option<f64>>("popularity")?.unwrap_or(0.0),
                poster_url: row
                    .get::<_, Option<String>>("poster_url")?
                    .unwrap_or_default(),
                tmdb_id: None,
            },
            ignore: is_ignored != 0,
        })
    }

    fn upsert_movie(conn: &Connection, key: &str, record: &PublicDataRecord) -> Result<()> {
        conn.execute(
            "INSERT INTO movie_data
                (title_with_year, public_rating, vote_count, popularity, poster_url, updated_at, tmdb_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(title_with_year) DO UPDATE SET
                public_rating = excluded.public_rating,
                vote_count = excluded.vote_count,
                popularity = excluded.popularity,
                poster_url = excluded.poster_url,
                updated_at = excluded.updated_at,
                tmdb_id = excluded.tmdb_id",
            params![
                key,
                record.public_rating,
                record.vote_count,
                record.popularity,
                record.poster_url,
                Self::now(),
                record.tmdb_id,
            ],
        )?;
        Ok(())
    }

    fn upsert_override(conn: &Connection, key: &str, record: &OverrideRecord) -> Result<()> {
        conn.execute(
            "INSERT INTO overrides
                (title_with_year, public_rating, vote_count, popularity, poster_url, is_ignored, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(title_with_year) DO UPDATE SET
                public_rating = excluded.public_rating,
                vote_count = excluded.vote_count,
                popularity = excluded.popularity,
                poster_url = excluded.poster_url,
                is_ignored = excluded.is_ignored,
                updated_at = excluded.updated_at",
            params![
                key,
                record.data.public_rating,
                record.data.vote_count,
                record.data.popularity,
                record.data.poster_url,
                record.ignore as i64,
                Self::now(),
            ],
        )?;
        Ok(())
    }
}

impl MovieStore for SqliteMovieStore {
    fn get_movie(&self, key: &str) -> Result<Option<PublicDataRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                "SELECT public_rating, vote_count, popularity, poster_url, tmdb_id
                 FROM movie_data WHERE title_with_year = ?1",
                params![key],
                Self::row_to_movie,
            )
            .optional()?;
        Ok(record)
    }

    fn put_movie(&self, key: &str, record: &PublicDataRecord) -> Result<()> {
        let conn = self.conn()?;
        Self::upsert_movie(&conn, key, record)
    }

    fn count_movies(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM movie_data", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn get_override(&self, key: &str) -> Result<Option<OverrideRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                "SELECT public_rating, vote_count, popularity, poster_url, is_ignored
                 FROM overrides WHERE title_with_year = ?1",
                params![key],
                Self::row_to_override,
            )
            .optional()?;
        Ok(record)
    }

    fn put_override(&self, key: &str, record: &OverrideRecord) -> Result<()> {
        let conn = self.conn()?;
        Self::upsert_override(&conn, key, record)
    }

    fn get_all_overrides(&self) -> Result<Vec<(String, OverrideRecord)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT title_with_year, public_rating, vote_count, popularity, poster_url, is_ignored
             FROM overrides ORDER BY title_with_year",
        )?;
        let overrides = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>("title_with_year")?,
                    Self::row_to_override(row)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(overrides)
    }

    fn count_overrides(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM overrides", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn replace_all(
        &self,
        movies: &[(String, PublicDataRecord)],
        overrides: &[(String, OverrideRecord)],
    ) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM movie_data", [])?;
        tx.execute("DELETE FROM overrides", [])?;
        for (key, record) in movies {
            Self::upsert_movie(&tx, key, record)?;
        }
        for (key, record) in overrides {
            Self::upsert_override(&tx, key, record)?;
        }
        tx.commit()?;
        Ok(())
    }
}
