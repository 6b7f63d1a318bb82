use clap::Parser;

use judger::error::NiceError;
use judger::opt::{Opt, Tool};
use judger::tools::cache::main_cache;
use judger::tools::check::main_check;
use judger::tools::hack::main_hack;
use judger::tools::run::main_run;

fn main() {
    let opt = Opt::parse();
    opt.logger.enable_log();

    match opt.tool {
        Tool::Run(run) => main_run(run, &opt.storage),
        Tool::Hack(hack) => main_hack(hack, &opt.storage),
        Tool::Check(check) => main_check(check),
        Tool::Cache(tool) => main_cache(tool, &opt.storage),
    }
    .nice_unwrap()
}
