use std::sync::Arc;

use anyhow::{Context, Error};

use judger_exec::DirData;

use crate::job::ProblemSpec;
use crate::opt::{HackOpt, StorageOpt};
use crate::tools::make_judger;

/// Handler of the `hack` tool: judges the hacked submission on the test of the hack.
pub fn main_hack(opt: HackOpt, storage: &StorageOpt) -> Result<(), Error> {
    let spec = ProblemSpec::load(&opt.problem)?;
    let registry = spec.registry()?;
    let problem = spec.build(&registry)?;
    let judger = make_judger(registry, storage, &opt.execution)?;
    let result = judger.run_hack(
        &problem,
        Arc::new(DirData::new(&opt.hacked)),
        Arc::new(DirData::new(&opt.reference)),
        Arc::new(DirData::new(&opt.tests)),
        opt.execution.run_options(),
    )?;
    let json = serde_json::to_string_pretty(&result).context("Non-serializable result")?;
    println!("{}", json);
    Ok(())
}
