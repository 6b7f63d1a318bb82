use serde::{Deserialize, Serialize};

use judger_store::{ContentHash, HashBuilder};

/// The key of a cache entry: the hash of the inputs of a node and of the name of its processor.
///
/// Every input is hashed separately and the digests are chained in the order of the processor's
/// input labels, followed by the processor name. The whole content of every input is hashed.
///
/// The processor name comes after the input digests, not before them. Keys computed with the
/// name first are different, so a store written with that layout is not reusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(ContentHash);

impl CacheKey {
    /// Compute the key of a processor invocation from its inputs, given in label order.
    pub fn from_inputs<'a, I>(processor: &str, inputs: I) -> CacheKey
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut builder = HashBuilder::new();
        for input in inputs {
            builder.update(ContentHash::from_content(input).as_bytes());
        }
        builder.update(processor);
        CacheKey(builder.finish())
    }

    /// The underlying hash, used for addressing the persistent store.
    pub fn hash(&self) -> &ContentHash {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}
