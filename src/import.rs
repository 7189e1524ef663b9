//! Bulk import of legacy JSON cache files into the movie store.
//!
//! Both files are JSON objects keyed by `"Title (Year)"`. The movie file
//! holds resolved public data, the overrides file holds curated records.

use crate::movie_store::{MovieStore, OverrideRecord, PublicDataRecord};
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{error, info, warn};

/// Number of movie entries compared field by field during verification.
pub const VERIFY_SAMPLE_SIZE: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub movies_imported: usize,
    pub overrides_imported: usize,
    /// Entries whose key had a blank title.
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub movies_in_store: usize,
    pub movies_in_file: usize,
    pub overrides_in_store: usize,
    pub overrides_in_file: usize,
    pub mismatches: Vec<String>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.mismatches.is_empty()
    }
}

fn read_json_map<T: DeserializeOwned>(path: &Path) -> Result<BTreeMap<String, T>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
}

fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Loads both JSON files into `store`.
///
/// A store that already holds data is left untouched unless `clear` is set,
/// in which case it is emptied first.
pub fn import_json(
    store: &dyn MovieStore,
    movies_path: &Path,
    overrides_path: &Path,
    clear: bool,
) -> Result<ImportReport> {
    let movies: BTreeMap<String, PublicDataRecord> = read_json_map(movies_path)?;
    let overrides: BTreeMap<String, OverrideRecord> = read_json_map(overrides_path)?;
    info!(
        "Loaded {} movies from {:?} and {} overrides from {:?}",
        movies.len(),
        movies_path,
        overrides.len(),
        overrides_path
    );

    let existing_movies = store.count_movies()?;
    let existing_overrides = store.count_overrides()?;
    if existing_movies > 0 || existing_overrides > 0 {
        warn!(
            "Store already contains {} movies and {} overrides",
            existing_movies, existing_overrides
        );
        if !clear {
            bail!("Refusing to import into a non-empty store (use --clear to replace its contents)");
        }
    }

    let mut report = ImportReport::default();
    let movies = valid_entries(movies, "movie", &mut report.skipped);
    let overrides = valid_entries(overrides, "override", &mut report.skipped);

    // One transaction: a failed write leaves the previous contents in place.
    store
        .replace_all(&movies, &overrides)
        .context("Failed to import movie data")?;
    report.movies_imported = movies.len();
    report.overrides_imported = overrides.len();

    info!(
        "Imported {} movies and {} overrides ({} skipped)",
        report.movies_imported, report.overrides_imported, report.skipped
    );
    Ok(report)
}

fn valid_entries<T>(entries: BTreeMap<String, T>, kind: &str, skipped: &mut usize) -> Vec<(String, T)> {
    entries
        .into_iter()
        .filter(|(key, _)| {
            let valid = is_valid_key(key);
            if !valid {
                warn!("Skipping {} entry with blank key", kind);
                *skipped += 1;
            }
            valid
        })
        .collect()
}

/// Checks that `store` holds what the JSON files describe.
///
/// Counts must match, the first entries of the movie file (in key order)
/// are compared field by field, and every override is compared in full.
pub fn verify_import(
    store: &dyn MovieStore,
    movies_path: &Path,
    overrides_path: &Path,
) -> Result<VerifyReport> {
    let mut movies: BTreeMap<String, PublicDataRecord> = read_json_map(movies_path)?;
    let mut overrides: BTreeMap<String, OverrideRecord> = read_json_map(overrides_path)?;
    // blank keys are never imported
    movies.retain(|key, _| is_valid_key(key));
    overrides.retain(|key, _| is_valid_key(key));

    let mut report = VerifyReport {
        movies_in_store: store.count_movies()?,
        movies_in_file: movies.len(),
        overrides_in_store: store.count_overrides()?,
        overrides_in_file: overrides.len(),
        mismatches: Vec::new(),
    };
    info!(
        "Store has {} movies and {} overrides, files have {} and {}",
        report.movies_in_store,
        report.overrides_in_store,
        report.movies_in_file,
        report.overrides_in_file
    );

    if report.movies_in_store != report.movies_in_file {
        report.mismatches.push(format!(
            "movie count: {} in store vs {} in file",
            report.movies_in_store, report.movies_in_file
        ));
    }
    if report.overrides_in_store != report.overrides_in_file {
        report.mismatches.push(format!(
            "override count: {} in store vs {} in file",
            report.overrides_in_store, report.overrides_in_file
        ));
    }

    for (key, expected) in movies.iter().take(VERIFY_SAMPLE_SIZE) {
        match store.get_movie(key)? {
            None => report.mismatches.push(format!("movie {} missing", key)),
            Some(actual) => {
                if actual.public_rating != expected.public_rating
                    || actual.vote_count != expected.vote_count
                    || actual.popularity != expected.popularity
                {
                    report.mismatches.push(format!("movie {} differs", key));
                }
            }
        }
    }

    for (key, expected) in &overrides {
        match store.get_override(key)? {
            None => report.mismatches.push(format!("override {} missing", key)),
            Some(actual) => {
                for field in override_field_mismatches(&actual, expected) {
                    report
                        .mismatches
                        .push(format!("override {}.{} differs", key, field));
                }
            }
        }
    }

    if report.is_ok() {
        info!("Import verification successful");
    } else {
        for mismatch in &report.mismatches {
            error!("Verification mismatch: {}", mismatch);
        }
    }
    Ok(report)
}

fn override_field_mismatches(actual: &OverrideRecord, expected: &OverrideRecord) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if actual.data.public_rating != expected.data.public_rating {
        fields.push("public_rating");
    }
    if actual.data.vote_count != expected.data.vote_count {
        fields.push("vote_count");
    }
    if actual.data.popularity != expected.data.popularity {
        fields.push("popularity");
    }
    if actual.data.poster_url != expected.data.poster_url {
        fields.push("poster_url");
    }
    if actual.ignore != expected.ignore {
        fields.push("ignore");
    }
    fields
}
