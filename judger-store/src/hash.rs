use std::fmt::Formatter;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Error};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

/// Size of the chunks read from a file while hashing it.
const READ_BUFFER_SIZE: usize = 8 * 1024;

/// SHA-256 digest of some content. This is the key of everything inside the store.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash([u8; 32]);

/// Incremental builder of a `ContentHash`, for content that is not available in a single buffer.
#[derive(Clone, Default)]
pub struct HashBuilder {
    hasher: Sha256,
}

impl ContentHash {
    /// Hash an in-memory buffer.
    pub fn from_content<T: AsRef<[u8]>>(content: T) -> ContentHash {
        let mut builder = HashBuilder::new();
        builder.update(content);
        builder.finish()
    }

    /// Hash everything that can be read from `reader`, reading it in fixed-size chunks.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<ContentHash, Error> {
        let mut builder = HashBuilder::new();
        let mut buf = [0u8; READ_BUFFER_SIZE];
        loop {
            let n = reader.read(&mut buf).context("Failed to read content")?;
            if n == 0 {
                break;
            }
            builder.update(&buf[..n]);
        }
        Ok(builder.finish())
    }

    /// Hash the whole content of a file on disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<ContentHash, Error> {
        let path = path.as_ref();
        if !path.exists() {
            bail!("Cannot read {}, maybe broken symlink?", path.display());
        }
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        ContentHash::from_reader(file).with_context(|| format!("Failed to hash {}", path.display()))
    }

    /// The raw bytes of the digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Name of the directory, inside the store, that contains the blobs of this hash.
    pub(crate) fn prefix(&self) -> String {
        hex::encode([self.0[0]])
    }
}

impl HashBuilder {
    /// Make a new builder with no content.
    pub fn new() -> HashBuilder {
        HashBuilder::default()
    }

    /// Append some content to the hashed stream.
    pub fn update<T: AsRef<[u8]>>(&mut self, data: T) -> &mut Self {
        self.hasher.update(data.as_ref());
        self
    }

    /// Consume the builder and return the digest of everything added.
    pub fn finish(self) -> ContentHash {
        ContentHash(self.hasher.finalize().into())
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl std::fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl FromStr for ContentHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut hash = [0u8; 32];
        hex::decode_to_slice(s, &mut hash).with_context(|| format!("Invalid hash: {s:?}"))?;
        Ok(ContentHash(hash))
    }
}

impl Serialize for ContentHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;
        let data = String::deserialize(deserializer)?;
        data.parse().map_err(|_| D::Error::custom("invalid hash"))
    }
}
