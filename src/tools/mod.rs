//! The handlers of the subcommands of the binary.

use std::sync::Arc;

use anyhow::{Context, Error};

use judger_cache::Cache;
use judger_exec::Registry;

use crate::opt::{ExecutionOpt, StorageOpt};
use crate::{Judger, JudgerConfig};

pub mod cache;
pub mod check;
pub mod hack;
pub mod run;

/// Open the persistent cache in the configured store directory.
pub fn open_cache(storage: &StorageOpt) -> Result<Cache, Error> {
    let dir = storage.store_dir().join("cache");
    debug!("Using the cache at {}", dir.display());
    Cache::new(&dir).with_context(|| format!("Failed to open the cache at {}", dir.display()))
}

/// Make a judger with the processors of a problem.
pub fn make_judger(
    registry: Registry,
    storage: &StorageOpt,
    execution: &ExecutionOpt,
) -> Result<Judger, Error> {
    let cache = open_cache(storage)?;
    Ok(Judger::new(
        Arc::new(registry),
        Arc::new(cache),
        JudgerConfig {
            work_dir: execution.work_dir(),
            cache_capacity: storage.cache_capacity,
        },
    ))
}
