//! Crate for managing the cache of the node executions.
//!
//! A node is cached using a [`CacheKey`] computed from the content of all its inputs and from the
//! name of its processor. Processors are assumed to be pure: the same inputs always produce the
//! same outputs. There are two tiers of cache:
//!
//! - the [`MemoryCache`], owned by the evaluation of a single submission and reset before each
//!   evaluation;
//! - the persistent [`Cache`], shared by all the evaluations and backed by a
//!   [`FileStore`](judger_store::FileStore). It is bounded in size by evicting the oldest entries
//!   first.
//!
//! A workflow run looks up both tiers through a [`TieredCache`]. While a run is in progress it
//! holds a [`CacheSession`], and the persistent cache cannot be resized until the session ends,
//! so an entry cannot be evicted while a run is using it.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use judger_cache::{Cache, CacheEntry, CacheKey, CacheResult, CacheTier, MemoryCache, TieredCache};
//! use judger_dag::ProcessorResult;
//!
//! # let dir = tempfile::TempDir::new().unwrap();
//! let cache = Cache::new(dir.path()).expect("Cannot create the cache");
//! let key = CacheKey::from_inputs("compiler", [b"int main() {}".as_slice()]);
//! let entry = CacheEntry {
//!     result: ProcessorResult::ok(),
//!     outputs: BTreeMap::new(),
//! };
//!
//! // a first submission computes the entry
//! let mut memory = MemoryCache::new();
//! let mut tiers = TieredCache::new(&mut memory, Some(cache.session()), true);
//! assert!(matches!(tiers.get(&key), CacheResult::Miss));
//! tiers.insert(&key, &entry, true);
//! drop(tiers);
//!
//! // a second submission finds it in the persistent cache
//! let mut memory = MemoryCache::new();
//! let mut tiers = TieredCache::new(&mut memory, Some(cache.session()), true);
//! match tiers.get(&key) {
//!     CacheResult::Hit { entry, tier } => {
//!         assert_eq!(tier, CacheTier::Persistent);
//!         assert!(entry.result.is_ok());
//!     }
//!     CacheResult::Miss => panic!("Expecting a hit"),
//! }
//! ```

#![deny(missing_docs)]

#[macro_use]
extern crate log;

mod entry;
mod key;
mod memory;

pub use entry::CacheEntry;
pub use key::CacheKey;
pub use memory::MemoryCache;

use std::path::PathBuf;
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use anyhow::{Context, Error};

use judger_dag::{ProcessorResult, ProcessorStatus};
use judger_store::FileStore;

/// The tier of the cache an entry was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    /// The per-submission in-memory cache.
    Memory,
    /// The persistent cache shared by all the submissions.
    Persistent,
}

/// The result of a cache query, can be either successful (`Hit`) or unsuccessful (`Miss`).
#[derive(Debug)]
pub enum CacheResult {
    /// The requested entry is not present in the cache.
    Miss,
    /// The requested entry is present in the cache.
    Hit {
        /// The cached entry.
        entry: CacheEntry,
        /// Where the entry was found.
        tier: CacheTier,
    },
}

/// The persistent cache, shared by all the evaluations.
#[derive(Debug)]
pub struct Cache {
    /// The store, read-locked by the running workflows and write-locked for resizing.
    store: RwLock<FileStore>,
}

/// Access to the persistent cache for the duration of a workflow run. While a session is alive
/// the cache cannot be resized.
#[derive(Debug)]
pub struct CacheSession<'a> {
    store: RwLockReadGuard<'a, FileStore>,
}

/// The two tiers of cache, as seen by a single workflow run.
#[derive(Debug)]
pub struct TieredCache<'a> {
    memory: &'a mut MemoryCache,
    persistent: Option<CacheSession<'a>>,
    lookup: bool,
}

impl Cache {
    /// Open the persistent cache stored in the specified directory.
    pub fn new<P: Into<PathBuf>>(cache_dir: P) -> Result<Cache, Error> {
        let store = FileStore::new(cache_dir).context("Cannot open the cache store")?;
        Ok(Cache::from_store(store))
    }

    /// Use an already opened store as the persistent cache.
    pub fn from_store(store: FileStore) -> Cache {
        Cache {
            store: RwLock::new(store),
        }
    }

    /// Start using the cache for a workflow run.
    pub fn session(&self) -> CacheSession<'_> {
        CacheSession {
            store: self.store.read().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Evict the oldest entries until at most `max_entries` are left, returning how many were
    /// evicted. Waits for all the sessions to end.
    pub fn resize(&self, max_entries: usize) -> Result<usize, Error> {
        let store = self.store.write().unwrap_or_else(PoisonError::into_inner);
        let evicted = store
            .evict_oldest(max_entries)
            .context("Failed to resize the cache")?;
        Ok(evicted.len())
    }

    /// Remove all the entries. Waits for all the sessions to end.
    pub fn reset(&self) -> Result<(), Error> {
        let store = self.store.write().unwrap_or_else(PoisonError::into_inner);
        store.clear().context("Failed to reset the cache")
    }

    /// Number of entries in the cache.
    pub fn len(&self) -> usize {
        self.session().store.len()
    }

    /// Whether the cache has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total size in bytes of the cached data.
    pub fn total_size(&self) -> u64 {
        self.session().store.total_size()
    }

    /// Checks whether a result is allowed in the cache.
    pub fn is_cacheable(result: &ProcessorResult) -> bool {
        result.status != ProcessorStatus::SystemError
    }
}

impl CacheSession<'_> {
    /// Whether there is an entry for that key.
    pub fn has(&self, key: &CacheKey) -> bool {
        self.store.has(key.hash())
    }

    /// The entry for that key. A broken entry is reported as missing.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        match CacheEntry::load(&self.store, key) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Cannot read cache entry {}: {:?}", key, e);
                None
            }
        }
    }

    /// Store an entry. Failures are logged and otherwise ignored: the entry will just be missing.
    pub fn set(&self, key: &CacheKey, entry: &CacheEntry) {
        if let Err(e) = entry.save(&self.store, key) {
            warn!("Cannot write cache entry {}: {:?}", key, e);
        }
    }
}

impl<'a> TieredCache<'a> {
    /// Make the cache for a run. Without `lookup` the cache is only written, never read.
    pub fn new(
        memory: &'a mut MemoryCache,
        persistent: Option<CacheSession<'a>>,
        lookup: bool,
    ) -> TieredCache<'a> {
        TieredCache {
            memory,
            persistent,
            lookup,
        }
    }

    /// Search the entry in the in-memory cache first, then in the persistent one. An entry found
    /// in the persistent cache is copied in memory.
    pub fn get(&mut self, key: &CacheKey) -> CacheResult {
        if !self.lookup {
            return CacheResult::Miss;
        }
        if let Some(entry) = self.memory.get(key) {
            debug!("Cache hit in memory for {}", key);
            return CacheResult::Hit {
                entry: entry.clone(),
                tier: CacheTier::Memory,
            };
        }
        if let Some(entry) = self.persistent.as_ref().and_then(|s| s.get(key)) {
            debug!("Cache hit in the persistent store for {}", key);
            self.memory.set(*key, entry.clone());
            return CacheResult::Hit {
                entry,
                tier: CacheTier::Persistent,
            };
        }
        debug!("Cache miss for {}", key);
        CacheResult::Miss
    }

    /// Store an entry in memory, and also in the persistent cache if `persist` is set.
    pub fn insert(&mut self, key: &CacheKey, entry: &CacheEntry, persist: bool) {
        if !Cache::is_cacheable(&entry.result) {
            debug!("Not caching {}: {:?}", key, entry.result.status);
            return;
        }
        self.memory.set(*key, entry.clone());
        if persist {
            if let Some(session) = &self.persistent {
                if !session.has(key) {
                    session.set(key, entry);
                }
            }
        }
    }
}
