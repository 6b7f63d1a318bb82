//! This crate manages the persistent store of the judger: a folder with many blobs indexed by the
//! hash of the work that produced them.
//!
//! Every entry of the store is identified by a [`ContentHash`] and is made of one or more blobs,
//! each stored in a file named `{hash}{decorator}`. The decorator distinguishes the blobs of the
//! same entry (for example the serialized result and each named output). Blobs are written
//! atomically and marked read-only.
//!
//! The store remembers the insertion order of its entries, so that it can be shrunk by evicting
//! the oldest ones first. The access to the store directory via this crate is exclusive even
//! between processes.
//!
//! # Example
//!
//! ```
//! use judger_store::{ContentHash, FileStore};
//!
//! # use anyhow::Error;
//! # fn main() -> Result<(), Error> {
//! # let tmp = tempfile::TempDir::new()?;
//! // make a new store based on a directory, this will lock if the store is already in use
//! let store = FileStore::new(tmp.path().join("store"))?;
//! let hash = ContentHash::from_content("some work");
//! store.store(&hash, &[("@result", b"ok"), ("#stdout", b"42\n")])?;
//! assert!(store.has(&hash));
//! assert_eq!(store.read(&hash, "#stdout")?, Some(b"42\n".to_vec()));
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

#[macro_use]
extern crate log;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{bail, Context, Error};
use fslock::LockFile;

use crate::index::FileStoreIndex;
pub use hash::{ContentHash, HashBuilder};

mod hash;
mod index;

/// The name of the lock of the file store.
const STORE_LOCK_FILE: &str = "exclusive.lock";
/// The name of the index of the file store.
const STORE_INDEX_FILE: &str = "index.bin";

/// A file store will manage all the blobs in the store directory.
///
/// This will manage a storage directory with the ability of:
/// * keeping track of the insertion order of the entries, for evicting the oldest ones;
/// * locking so no other instances of `FileStore` can access the storage while this is still
///   running, even in other processes.
pub struct FileStore {
    /// Base directory of the `FileStore`.
    base_path: PathBuf,
    /// Handle of the lock file. This handle keeps the lock alive.
    _lock: LockFile,
    /// The index with the entries known to the store.
    index: Mutex<FileStoreIndex>,
}

impl FileStore {
    /// Make a new `FileStore` in the specified base directory, will wait if another instance of a
    /// `FileStore` is locking the directory.
    ///
    /// If the index of the store cannot be loaded the content of the store is wiped.
    pub fn new<P: Into<PathBuf>>(base_path: P) -> Result<FileStore, Error> {
        let base_path = base_path.into();
        debug!("Opening file store at {}", base_path.display());
        std::fs::create_dir_all(&base_path).with_context(|| {
            format!(
                "Failed to create storage directory at {}",
                base_path.display()
            )
        })?;
        let lock_path = base_path.join(STORE_LOCK_FILE);
        let mut lock = LockFile::open(lock_path.as_path())
            .with_context(|| format!("Failed to create lock file at {}", lock_path.display()))?;
        if !lock.try_lock().context("Failed to lock the storage")? {
            warn!("Store locked... waiting");
            lock.lock()
                .context("Failed to obtain exclusive lock on storage")?;
        }

        let index_path = base_path.join(STORE_INDEX_FILE);
        let index = match FileStoreIndex::load(&index_path) {
            Ok(index) => index,
            Err(e) => {
                error!("Store index is broken, resetting: {:?}", e);
                FileStore::wipe(&base_path).context("Failed to reset the broken store")?;
                FileStoreIndex::default()
            }
        };
        Ok(FileStore {
            base_path,
            _lock: lock,
            index: Mutex::new(index),
        })
    }

    /// The directory of this store.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Whether an entry with that hash is present in the store.
    pub fn has(&self, hash: &ContentHash) -> bool {
        self.index().contains(hash)
    }

    /// Number of entries in the store.
    pub fn len(&self) -> usize {
        self.index().len()
    }

    /// Whether the store has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total size in bytes of all the blobs in the store.
    pub fn total_size(&self) -> u64 {
        self.index().total_size()
    }

    /// The hashes of all the entries in the store, oldest first.
    pub fn entries(&self) -> Vec<ContentHash> {
        self.index().hashes().copied().collect()
    }

    /// Write a new entry made of the provided `(decorator, content)` blobs.
    ///
    /// An entry is immutable once written: if the hash is already present nothing is written,
    /// its position in the insertion order does not change and `false` is returned.
    pub fn store(&self, hash: &ContentHash, blobs: &[(&str, &[u8])]) -> Result<bool, Error> {
        for (decorator, _) in blobs {
            FileStore::check_decorator(decorator)?;
        }
        if self.has(hash) {
            warn!("Entry {} is already in the store", hash);
            return Ok(false);
        }
        let dir = self.base_path.join(hash.prefix());
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create directory at {}", dir.display()))?;
        let mut size = 0;
        let mut written = Vec::with_capacity(blobs.len());
        for (decorator, content) in blobs {
            let path = self.blob_path(hash, decorator);
            trace!("Storing {}", path.display());
            if let Err(e) = FileStore::write_blob(&dir, &path, content) {
                // not indexed yet, so eviction would never reclaim them
                if path.is_file() {
                    written.push(path);
                }
                for path in &written {
                    if let Err(e) = FileStore::remove_file(path) {
                        warn!("Cannot remove {}: {:?}", path.display(), e);
                    }
                }
                return Err(e);
            }
            written.push(path);
            size += content.len() as u64;
        }

        let mut index = self.index();
        let decorators = blobs.iter().map(|(d, _)| d.to_string()).collect();
        let added = index.push(*hash, decorators, size);
        index
            .store(self.base_path.join(STORE_INDEX_FILE))
            .context("Failed to store the index to file")?;
        Ok(added)
    }

    /// Read a blob of an entry. Returns `None` if the entry or the blob is not in the store.
    pub fn read(&self, hash: &ContentHash, decorator: &str) -> Result<Option<Vec<u8>>, Error> {
        FileStore::check_decorator(decorator)?;
        if !self.has(hash) {
            return Ok(None);
        }
        let path = self.blob_path(hash, decorator);
        match std::fs::read(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Blob {} is gone", path.display());
                Ok(None)
            }
            Err(e) => {
                Err(Error::from(e).context(format!("Failed to read {}", path.display())))
            }
        }
    }

    /// Remove the oldest entries until at most `max_entries` are left. Returns the hashes of the
    /// removed entries, oldest first.
    pub fn evict_oldest(&self, max_entries: usize) -> Result<Vec<ContentHash>, Error> {
        let mut index = self.index();
        let mut evicted = Vec::new();
        while index.len() > max_entries {
            let Some((hash, item)) = index.pop_oldest() else {
                break;
            };
            for decorator in &item.decorators {
                let path = self.blob_path(&hash, decorator);
                if let Err(e) = FileStore::remove_file(&path) {
                    warn!("Cannot remove {}: {:?}", path.display(), e);
                }
            }
            evicted.push(hash);
        }
        if !evicted.is_empty() {
            info!("Evicted {} entries from the store", evicted.len());
            index
                .store(self.base_path.join(STORE_INDEX_FILE))
                .context("Failed to store the index to file")?;
        }
        Ok(evicted)
    }

    /// Remove every entry from the store.
    pub fn clear(&self) -> Result<(), Error> {
        let mut index = self.index();
        FileStore::wipe(&self.base_path)?;
        *index = FileStoreIndex::default();
        index
            .store(self.base_path.join(STORE_INDEX_FILE))
            .context("Failed to store the index to file")?;
        Ok(())
    }

    /// Lock the index, ignoring the poisoning: the index is always left in a consistent state.
    fn index(&self) -> MutexGuard<'_, FileStoreIndex> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Path of a blob on disk.
    fn blob_path(&self, hash: &ContentHash, decorator: &str) -> PathBuf {
        self.base_path
            .join(hash.prefix())
            .join(format!("{hash}{decorator}"))
    }

    /// Decorators become part of a file name, so they cannot contain path separators.
    fn check_decorator(decorator: &str) -> Result<(), Error> {
        if decorator.contains(['/', '\\']) || decorator == "." || decorator == ".." {
            bail!("Invalid blob decorator: {:?}", decorator);
        }
        Ok(())
    }

    /// Atomically write a blob inside `dir`, and mark it read-only.
    fn write_blob(dir: &Path, path: &Path, content: &[u8]) -> Result<(), Error> {
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .context("Failed to create temporary file for storing the blob")?;
        tmp.write_all(content)
            .context("Failed to write the blob")?;
        tmp.persist(path)
            .with_context(|| format!("Failed to persist {}", path.display()))?;
        FileStore::mark_readonly(path).context("Failed to mark blob as readonly")?;
        Ok(())
    }

    /// Mark a file as readonly.
    fn mark_readonly(path: &Path) -> Result<(), Error> {
        let mut perms = std::fs::metadata(path)
            .with_context(|| format!("Failed to get file metadata of {}", path.display()))?
            .permissions();
        perms.set_readonly(true);
        std::fs::set_permissions(path, perms)
            .with_context(|| format!("Failed to set permission of {}", path.display()))?;
        Ok(())
    }

    /// Remove a read-only file from disk.
    fn remove_file(path: &Path) -> Result<(), Error> {
        let mut perms = std::fs::metadata(path)
            .with_context(|| format!("Failed to get file metadata of {}", path.display()))?
            .permissions();
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(false);
        std::fs::set_permissions(path, perms)
            .with_context(|| format!("Failed to set permission of {}", path.display()))?;
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to remove {}", path.display()))?;
        Ok(())
    }

    /// Remove all the blob directories of a store, keeping the lock file.
    fn wipe(base_path: &Path) -> Result<(), Error> {
        for entry in std::fs::read_dir(base_path)
            .with_context(|| format!("Failed to list {}", base_path.display()))?
        {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            for blob in std::fs::read_dir(&path)
                .with_context(|| format!("Failed to list {}", path.display()))?
            {
                FileStore::remove_file(&blob?.path())?;
            }
            std::fs::remove_dir(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("base_path", &self.base_path)
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn get_cwd() -> TempDir {
        TempDir::new().unwrap()
    }

    fn fake_entry(store: &FileStore, content: &str) -> ContentHash {
        let hash = ContentHash::from_content(content);
        store
            .store(&hash, &[("@result", content.as_bytes())])
            .unwrap();
        hash
    }

    #[test]
    fn test_new_filestore() {
        let cwd = get_cwd();
        let _store = FileStore::new(cwd.path()).unwrap();
        assert!(cwd.path().join(STORE_LOCK_FILE).exists());
    }

    #[test]
    fn test_store_and_read() {
        let cwd = get_cwd();
        let store = FileStore::new(cwd.path()).unwrap();
        let hash = ContentHash::from_content("x");
        assert!(store
            .store(&hash, &[("@result", b"res"), ("#output", b"out")])
            .unwrap());
        assert!(store.has(&hash));
        assert_eq!(store.read(&hash, "@result").unwrap(), Some(b"res".to_vec()));
        assert_eq!(store.read(&hash, "#output").unwrap(), Some(b"out".to_vec()));
        assert_eq!(store.read(&hash, "#missing").unwrap(), None);
        assert_eq!(store.total_size(), 6);

        let path = cwd
            .path()
            .join(hash.prefix())
            .join(format!("{hash}@result"));
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().permissions().readonly());
    }

    #[test]
    fn test_read_missing_entry() {
        let cwd = get_cwd();
        let store = FileStore::new(cwd.path()).unwrap();
        let hash = ContentHash::from_content("nope");
        assert!(!store.has(&hash));
        assert_eq!(store.read(&hash, "@result").unwrap(), None);
    }

    #[test]
    fn test_entries_are_immutable() {
        let cwd = get_cwd();
        let store = FileStore::new(cwd.path()).unwrap();
        let first = fake_entry(&store, "first");
        let second = fake_entry(&store, "second");
        assert!(!store.store(&first, &[("@result", b"changed")]).unwrap());
        assert_eq!(store.read(&first, "@result").unwrap(), Some(b"first".to_vec()));
        assert_eq!(store.entries(), vec![first, second]);
    }

    #[test]
    fn test_evict_oldest_first() {
        let cwd = get_cwd();
        let store = FileStore::new(cwd.path()).unwrap();
        let hashes: Vec<_> = (0..5)
            .map(|i| fake_entry(&store, &format!("entry {i}")))
            .collect();
        let evicted = store.evict_oldest(3).unwrap();
        assert_eq!(evicted, hashes[..2].to_vec());
        assert_eq!(store.len(), 3);
        assert!(!store.has(&hashes[0]));
        assert!(!store.has(&hashes[1]));
        assert!(store.has(&hashes[2]));
        assert_eq!(store.read(&hashes[0], "@result").unwrap(), None);
        assert!(!cwd
            .path()
            .join(hashes[0].prefix())
            .join(format!("{}@result", hashes[0]))
            .exists());

        assert!(store.evict_oldest(10).unwrap().is_empty());
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_index_survives_reopen() {
        let cwd = get_cwd();
        let hashes = {
            let store = FileStore::new(cwd.path()).unwrap();
            vec![fake_entry(&store, "a"), fake_entry(&store, "b")]
        };
        let store = FileStore::new(cwd.path()).unwrap();
        assert_eq!(store.entries(), hashes);
        assert_eq!(store.read(&hashes[1], "@result").unwrap(), Some(b"b".to_vec()));
    }

    #[test]
    fn test_broken_index_resets_store() {
        let cwd = get_cwd();
        let hash = {
            let store = FileStore::new(cwd.path()).unwrap();
            fake_entry(&store, "a")
        };
        std::fs::write(cwd.path().join(STORE_INDEX_FILE), b"garbage").unwrap();
        let store = FileStore::new(cwd.path()).unwrap();
        assert!(store.is_empty());
        assert!(!cwd.path().join(hash.prefix()).exists());
    }

    #[test]
    fn test_clear() {
        let cwd = get_cwd();
        let store = FileStore::new(cwd.path()).unwrap();
        let hash = fake_entry(&store, "a");
        store.clear().unwrap();
        assert!(store.is_empty());
        assert!(!store.has(&hash));
        assert_eq!(store.total_size(), 0);
        assert!(cwd.path().join(STORE_LOCK_FILE).exists());
    }

    #[test]
    fn test_failed_store_leaves_no_blobs() {
        let cwd = get_cwd();
        let store = FileStore::new(cwd.path()).unwrap();
        let hash = ContentHash::from_content("x");
        let dir = cwd.path().join(hash.prefix());
        // a directory in place of the second blob makes its write fail
        std::fs::create_dir_all(dir.join(format!("{hash}#output"))).unwrap();
        assert!(store
            .store(&hash, &[("@result", b"res"), ("#output", b"out")])
            .is_err());
        assert!(!store.has(&hash));
        assert!(!dir.join(format!("{hash}@result")).exists());
        assert_eq!(store.total_size(), 0);
    }

    #[test]
    fn test_invalid_decorator() {
        let cwd = get_cwd();
        let store = FileStore::new(cwd.path()).unwrap();
        let hash = ContentHash::from_content("x");
        assert!(store.store(&hash, &[("/etc", b"")]).is_err());
        assert!(store.read(&hash, "../x").is_err());
    }
}
