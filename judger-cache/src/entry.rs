use std::collections::BTreeMap;

use anyhow::{Context, Error};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use judger_dag::ProcessorResult;
use judger_store::FileStore;

use crate::CacheKey;

/// Decorator of the blob holding the serialized result of an entry.
const RESULT_DECORATOR: &str = "@result";

/// A cached processor invocation: its result and all its named outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// The result of the invocation.
    pub result: ProcessorResult,
    /// The outputs of the invocation, by label.
    pub outputs: BTreeMap<String, Bytes>,
}

/// What is stored in the `@result` blob.
#[derive(Debug, Serialize, Deserialize)]
struct StoredResult {
    result: ProcessorResult,
    outputs: Vec<String>,
}

/// Decorator of the blob holding an output.
fn output_decorator(label: &str) -> String {
    format!("#{label}")
}

impl CacheEntry {
    /// Write this entry in the persistent store. Returns `false` if the entry was already there.
    pub(crate) fn save(&self, store: &FileStore, key: &CacheKey) -> Result<bool, Error> {
        let stored = StoredResult {
            result: self.result.clone(),
            outputs: self.outputs.keys().cloned().collect(),
        };
        let serialized = bincode::serialize(&stored).context("Failed to serialize result")?;
        let decorators: Vec<String> = self.outputs.keys().map(|l| output_decorator(l)).collect();
        let mut blobs = vec![(RESULT_DECORATOR, serialized.as_slice())];
        for (decorator, content) in decorators.iter().zip(self.outputs.values()) {
            blobs.push((decorator.as_str(), content.as_ref()));
        }
        store.store(key.hash(), &blobs)
    }

    /// Read an entry from the persistent store. Returns `None` if the entry, or any of its blobs,
    /// is missing.
    pub(crate) fn load(store: &FileStore, key: &CacheKey) -> Result<Option<CacheEntry>, Error> {
        let Some(serialized) = store.read(key.hash(), RESULT_DECORATOR)? else {
            return Ok(None);
        };
        let stored: StoredResult =
            bincode::deserialize(&serialized).context("Failed to deserialize result")?;
        let mut outputs = BTreeMap::new();
        for label in stored.outputs {
            match store.read(key.hash(), &output_decorator(&label))? {
                Some(content) => {
                    outputs.insert(label, Bytes::from(content));
                }
                None => {
                    debug!("Output {} of {} is gone", label, key);
                    return Ok(None);
                }
            }
        }
        Ok(Some(CacheEntry {
            result: stored.result,
            outputs,
        }))
    }
}
