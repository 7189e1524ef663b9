use crate::movie_store::PublicDataRecord;
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Mutex, RwLock};

/// Process-local cache of resolved records.
///
/// Safe for concurrent use. For any key the first inserted record is kept;
/// later inserts of the same key are no-ops. Dropping the contents never
/// loses durable data.
pub enum MemoryTier {
    /// Grows without bound, fine for single-batch runs.
    Unbounded(RwLock<HashMap<String, PublicDataRecord>>),
    /// Evicts the least recently used key once `capacity` is reached.
    Bounded(Mutex<LruCache<String, PublicDataRecord>>),
}

impl MemoryTier {
    pub fn unbounded() -> Self {
        MemoryTier::Unbounded(RwLock::new(HashMap::new()))
    }

    pub fn bounded(capacity: NonZeroUsize) -> Self {
        MemoryTier::Bounded(Mutex::new(LruCache::new(capacity)))
    }

    /// `0` means unbounded.
    pub fn with_capacity(capacity: usize) -> Self {
        match NonZeroUsize::new(capacity) {
            Some(capacity) => Self::bounded(capacity),
            None => Self::unbounded(),
        }
    }

    pub fn get(&self, key: &str) -> Option<PublicDataRecord> {
        match self {
            MemoryTier::Unbounded(map) => map
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .get(key)
                .cloned(),
            MemoryTier::Bounded(lru) => lru
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .get(key)
                .cloned(),
        }
    }

    pub fn insert(&self, key: &str, record: PublicDataRecord) {
        match self {
            MemoryTier::Unbounded(map) => {
                map.write()
                    .unwrap_or_else(|e| e.into_inner())
                    .entry(key.to_string())
                    .or_insert(record);
            }
            MemoryTier::Bounded(lru) => {
                let mut lru = lru.lock().unwrap_or_else(|e| e.into_inner());
                // get() also refreshes recency for an existing entry
                if lru.get(key).is_none() {
                    lru.put(key.to_string(), record);
                }
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        match self {
            MemoryTier::Unbounded(map) => map
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .contains_key(key),
            MemoryTier::Bounded(lru) => lru
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .contains(key),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            MemoryTier::Unbounded(map) => map.read().unwrap_or_else(|e| e.into_inner()).len(),
            MemoryTier::Bounded(lru) => lru.lock().unwrap_or_else(|e| e.into_inner()).len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        match self {
            MemoryTier::Unbounded(map) => map.write().unwrap_or_else(|e| e.into_inner()).clear(),
            MemoryTier::Bounded(lru) => lru.lock().unwrap_or_else(|e| e.into_inner()).clear(),
        }
    }
}

impl Default for MemoryTier {
    fn default() -> Self {
        Self::unbounded()
    }
}
