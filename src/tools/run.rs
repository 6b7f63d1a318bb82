use std::sync::Arc;

use anyhow::{Context, Error};

use judger_exec::DirData;

use crate::job::ProblemSpec;
use crate::opt::{RunOpt, StorageOpt};
use crate::tools::make_judger;

/// Handler of the `run` tool: judges the submission and prints the result as JSON.
pub fn main_run(opt: RunOpt, storage: &StorageOpt) -> Result<(), Error> {
    let spec = ProblemSpec::load(&opt.problem)?;
    let registry = spec.registry()?;
    let problem = spec.build(&registry)?;
    let judger = make_judger(registry, storage, &opt.execution)?;
    let submission = Arc::new(DirData::new(&opt.submission));
    let result = judger.run_testset(
        &problem,
        opt.testset.into(),
        submission,
        opt.execution.run_options(),
    )?;
    let json = serde_json::to_string_pretty(&result).context("Non-serializable result")?;
    println!("{}", json);
    Ok(())
}
