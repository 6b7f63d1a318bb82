use anyhow::Error;

use crate::opt::{CacheTool, StorageOpt};
use crate::tools::open_cache;

/// Handler of the `cache` tool.
pub fn main_cache(tool: CacheTool, storage: &StorageOpt) -> Result<(), Error> {
    let cache = open_cache(storage)?;
    match tool {
        CacheTool::Clear => {
            cache.reset()?;
            println!("Cache cleared");
        }
        CacheTool::Resize => {
            let evicted = cache.resize(storage.cache_capacity)?;
            println!("Evicted {} entries, {} left", evicted, cache.len());
        }
        CacheTool::Info => {
            println!("Entries: {}", cache.len());
            println!("Size: {} bytes", cache.total_size());
        }
    }
    Ok(())
}
