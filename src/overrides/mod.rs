//! In-memory snapshot of manually curated overrides.
//!
//! The index is loaded once at startup and consulted before any other
//! lookup tier. It is never written to by resolution; picking up edits made
//! after startup requires an explicit [`OverrideIndex::reload`] (or a
//! restart).

use crate::movie_store::{MovieStore, OverrideRecord};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::info;

/// Where override documents are read from.
#[derive(Clone)]
pub enum OverrideSource {
    /// The `overrides` collection of the movie store.
    Store(Arc<dyn MovieStore>),
    /// A JSON object keyed by `"Title (Year)"`.
    JsonFile(PathBuf),
    /// No overrides at all.
    Empty,
}

impl OverrideSource {
    fn read(&self) -> Result<HashMap<String, OverrideRecord>> {
        match self {
            OverrideSource::Store(store) => Ok(store
                .get_all_overrides()
                .context("Failed to read overrides from the movie store")?
                .into_iter()
                .collect()),
            OverrideSource::JsonFile(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read overrides file: {:?}", path))?;
                serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse overrides file: {:?}", path))
            }
            OverrideSource::Empty => Ok(HashMap::new()),
        }
    }

    fn describe(&self) -> String {
        match self {
            OverrideSource::Store(_) => "movie store".to_string(),
            OverrideSource::JsonFile(path) => format!("{:?}", path),
            OverrideSource::Empty => "nothing".to_string(),
        }
    }
}

pub struct OverrideIndex {
    source: OverrideSource,
    entries: RwLock<HashMap<String, OverrideRecord>>,
}

impl OverrideIndex {
    /// Reads every override from `source` into memory.
    pub fn load(source: OverrideSource) -> Result<Self> {
        let entries = source.read()?;
        info!(
            "Loaded {} overrides from {}",
            entries.len(),
            source.describe()
        );
        Ok(Self {
            source,
            entries: RwLock::new(entries),
        })
    }

    pub fn empty() -> Self {
        Self {
            source: OverrideSource::Empty,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Builds an index from explicit entries. `reload` keeps them as they are.
    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, OverrideRecord)>,
        K: Into<String>,
    {
        Self {
            source: OverrideSource::Empty,
            entries: RwLock::new(entries.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }

    /// Re-reads the source and swaps the snapshot. On failure the previous
    /// snapshot stays in place.
    pub fn reload(&self) -> Result<usize> {
        if matches!(self.source, OverrideSource::Empty) {
            return Ok(self.len());
        }
        let fresh = self.source.read()?;
        let count = fresh.len();
        *self.entries.write().unwrap_or_else(|e| e.into_inner()) = fresh;
        info!("Reloaded {} overrides from {}", count, self.source.describe());
        Ok(count)
    }

    pub fn get(&self, key: &str) -> Option<OverrideRecord> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
