use std::collections::HashMap;

use crate::{CacheEntry, CacheKey};

/// The in-memory cache of the evaluation of a single submission.
///
/// It is never shared between submissions: whoever evaluates a submission owns one and resets it
/// before every evaluation.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: HashMap<CacheKey, CacheEntry>,
}

impl MemoryCache {
    /// Make a new, empty, cache.
    pub fn new() -> MemoryCache {
        MemoryCache::default()
    }

    /// Whether there is an entry for that key.
    pub fn has(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// The entry for that key, if any.
    pub fn get(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Insert an entry. Entries are immutable: if the key is already present the old entry is
    /// kept.
    pub fn set(&mut self, key: CacheKey, entry: CacheEntry) {
        self.entries.entry(key).or_insert(entry);
    }

    /// Remove all the entries.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
