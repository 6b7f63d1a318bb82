use std::collections::{HashMap, VecDeque};
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::Path;
use std::time::SystemTime;

use anyhow::{bail, Context, Error};
use serde::{Deserialize, Serialize};

use crate::ContentHash;

/// Magic string that is prepended to the index file to avoid accidental loading of invalid index
/// files.
const MAGIC: &[u8] = b"judger-store";
/// Current version of the crate, changing version will cause a complete invalidation of the store.
/// Any breaking change to the index file format has to go through a version update.
const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Maximum number of characters of the version string.
const VERSION_MAX_LEN: usize = 16;

const _: () = assert!(VERSION.len() <= VERSION_MAX_LEN);

/// An entry of the store: all the blobs sharing the same hash.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub(crate) struct FileStoreIndexItem {
    /// The decorators of the blobs written for this entry.
    pub decorators: Vec<String>,
    /// Total size of the blobs of this entry.
    pub size: u64,
    /// When the entry has been inserted.
    pub inserted: SystemTime,
}

/// Index with all the entries known to the store, in insertion order.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct FileStoreIndex {
    /// The sum of the size of all the entries in the index.
    total_size: u64,
    /// Hashes of the entries, oldest first.
    order: VecDeque<ContentHash>,
    /// Metadata of all the entries.
    known: HashMap<ContentHash, FileStoreIndexItem>,
}

impl FileStoreIndex {
    /// Load the index from the provided path. A missing file is an empty index.
    pub(crate) fn load<P: AsRef<Path>>(path: P) -> Result<FileStoreIndex, Error> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("Index at {} not found, creating new one", path.display());
            return Ok(FileStoreIndex::default());
        }

        debug!("Loading index from {}", path.display());
        let mut file = File::open(path)
            .with_context(|| format!("Failed to open index file from {}", path.display()))?;

        let mut magic = [0u8; MAGIC.len() + VERSION_MAX_LEN];
        file.read_exact(&mut magic)
            .context("Failed to read magic number")?;
        if &magic[..MAGIC.len()] != MAGIC {
            bail!(
                "Store magic mismatch:\nExpected: {:?}\nFound: {:?}",
                MAGIC,
                &magic[..MAGIC.len()]
            );
        }
        if &magic[MAGIC.len()..MAGIC.len() + VERSION.len()] != VERSION.as_bytes() {
            bail!(
                "Store version mismatch:\nExpected: {:?}\nFound: {:?}",
                VERSION.as_bytes(),
                &magic[MAGIC.len()..MAGIC.len() + VERSION.len()]
            );
        }

        let index: FileStoreIndex =
            bincode::deserialize_from(file).context("Failed to deserialize index file")?;
        if index.order.len() != index.known.len() {
            bail!("Index is inconsistent");
        }
        Ok(index)
    }

    /// Store a dump of this index to the path provided.
    pub(crate) fn store<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        trace!("Saving index file at {}", path.display());

        let dir = path.parent().context("Invalid index file path")?;
        create_dir_all(dir).context("Failed to create store directory")?;
        let tmp = path.with_extension("tmp");

        let mut file = File::create(&tmp)
            .with_context(|| format!("Failed to create index file at {}", tmp.display()))?;
        let mut magic = [0u8; MAGIC.len() + VERSION_MAX_LEN];
        magic[..MAGIC.len()].clone_from_slice(MAGIC);
        magic[MAGIC.len()..MAGIC.len() + VERSION.len()].clone_from_slice(VERSION.as_bytes());
        file.write_all(&magic)
            .context("Failed to write store magic number")?;

        bincode::serialize_into(file, &self).context("Failed to write index")?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("Failed to move {} -> {}", tmp.display(), path.display()))?;
        Ok(())
    }

    /// Whether the entry is known.
    pub(crate) fn contains(&self, hash: &ContentHash) -> bool {
        self.known.contains_key(hash)
    }

    /// Number of entries in the index.
    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    /// Total size of the blobs known to the index.
    pub(crate) fn total_size(&self) -> u64 {
        self.total_size
    }

    /// The hashes of all the entries, oldest first.
    pub(crate) fn hashes(&self) -> impl Iterator<Item = &ContentHash> {
        self.order.iter()
    }

    /// Append a new entry at the end of the insertion order. Returns `false`, leaving the index
    /// untouched, if the entry is already present.
    pub(crate) fn push(&mut self, hash: ContentHash, decorators: Vec<String>, size: u64) -> bool {
        if self.known.contains_key(&hash) {
            return false;
        }
        self.known.insert(
            hash,
            FileStoreIndexItem {
                decorators,
                size,
                inserted: SystemTime::now(),
            },
        );
        self.order.push_back(hash);
        self.total_size += size;
        true
    }

    /// Remove the oldest entry from the index, returning it.
    pub(crate) fn pop_oldest(&mut self) -> Option<(ContentHash, FileStoreIndexItem)> {
        let hash = self.order.pop_front()?;
        let item = self.known.remove(&hash)?;
        self.total_size -= item.size;
        Some((hash, item))
    }
}
