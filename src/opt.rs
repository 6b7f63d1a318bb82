use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use judger_exec::RunOptions;

use crate::TestsetKind;

#[derive(Parser, Debug)]
#[command(name = "judger", about = "Judge submissions running a graph of processors")]
pub struct Opt {
    #[command(flatten)]
    pub logger: LoggerOpt,

    #[command(flatten)]
    pub storage: StorageOpt,

    /// Which tool to use
    #[command(subcommand)]
    pub tool: Tool,
}

#[derive(Subcommand, Debug)]
pub enum Tool {
    /// Judge a submission on a testset of a problem
    Run(RunOpt),
    /// Judge a submission on a hack
    Hack(HackOpt),
    /// Check that a problem file is valid, printing the order of its nodes
    Check(CheckOpt),
    /// Manage the persistent cache
    ///
    /// Warning: no other instances should be running when the cache is cleared or resized.
    #[command(subcommand)]
    Cache(CacheTool),
}

#[derive(Args, Debug, Clone)]
pub struct RunOpt {
    /// Path of the problem file
    pub problem: PathBuf,

    /// Directory with a file for each field of the submission
    pub submission: PathBuf,

    /// Which testset to run
    #[arg(long, value_enum, default_value = "main")]
    pub testset: TestsetKindOpt,

    #[command(flatten)]
    pub execution: ExecutionOpt,
}

#[derive(Args, Debug, Clone)]
pub struct HackOpt {
    /// Path of the problem file
    pub problem: PathBuf,

    /// Directory with the fields of the hacked submission
    pub hacked: PathBuf,

    /// Directory with the fields of the reference solution
    #[arg(long)]
    pub reference: PathBuf,

    /// Directory with the fields of the test provided by the hack
    #[arg(long)]
    pub tests: PathBuf,

    #[command(flatten)]
    pub execution: ExecutionOpt,
}

#[derive(Args, Debug, Clone)]
pub struct CheckOpt {
    /// Path of the problem file
    pub problem: PathBuf,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CacheTool {
    /// Remove all the entries of the cache
    Clear,
    /// Evict the oldest entries, keeping at most the configured capacity
    Resize,
    /// Print the number of entries and the size of the cache
    Info,
}

#[derive(Args, Debug, Clone)]
pub struct ExecutionOpt {
    /// Do not look up nor fill the caches
    #[arg(long)]
    pub no_cache: bool,

    /// Where to create the temporary directories of the runs
    #[arg(long)]
    pub work_dir: Option<PathBuf>,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestsetKindOpt {
    Main,
    Pretest,
    Extra,
}

#[derive(Args, Debug, Clone)]
pub struct LoggerOpt {
    /// Verbose mode (-v, -vv, -vvv, etc.)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Args, Debug, Clone)]
pub struct StorageOpt {
    /// Where to store the persistent cache
    #[arg(long = "store-dir", global = true)]
    pub store_dir: Option<PathBuf>,

    /// Maximum number of entries of the persistent cache
    #[arg(long = "cache-capacity", default_value = "1000", global = true)]
    pub cache_capacity: usize,
}

impl From<TestsetKindOpt> for TestsetKind {
    fn from(kind: TestsetKindOpt) -> Self {
        match kind {
            TestsetKindOpt::Main => TestsetKind::Main,
            TestsetKindOpt::Pretest => TestsetKind::Pretest,
            TestsetKindOpt::Extra => TestsetKind::Extra,
        }
    }
}

impl ExecutionOpt {
    /// The options of the runs.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            use_cache: !self.no_cache,
            ..Default::default()
        }
    }

    /// The directory of the runs, the system temporary directory if not specified.
    pub fn work_dir(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("judger"))
    }
}

impl StorageOpt {
    /// Get the store directory of this configuration. If nothing is specified a cache directory is
    /// used if available, otherwise a temporary directory.
    pub fn store_dir(&self) -> PathBuf {
        match &self.store_dir {
            Some(dir) => dir.clone(),
            None => {
                let project = directories::ProjectDirs::from("", "", "judger");
                if let Some(project) = project {
                    project.cache_dir().to_owned()
                } else {
                    std::env::temp_dir().join("judger")
                }
            }
        }
    }
}

impl LoggerOpt {
    pub fn enable_log(&self) {
        if self.verbose > 0 {
            std::env::set_var("RUST_BACKTRACE", "1");
            match self.verbose {
                0 => unreachable!(),
                1 => std::env::set_var("RUST_LOG", "info"),
                2 => std::env::set_var("RUST_LOG", "debug"),
                _ => std::env::set_var("RUST_LOG", "trace"),
            }
        }

        logger_builder().init();
        better_panic::install();
    }
}

/// The logger configured from `RUST_LOG`, with timestamps in nanoseconds.
fn logger_builder() -> env_logger::Builder {
    let mut builder = env_logger::Builder::from_default_env();
    builder.format_timestamp_nanos();
    builder
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_builder() {
        let logger = logger_builder().build();
        assert!(logger.filter() <= log::LevelFilter::Trace);
    }

    #[test]
    fn test_parse_run() {
        let opt = Opt::try_parse_from([
            "judger",
            "-vv",
            "run",
            "problem.json",
            "sub",
            "--testset",
            "pretest",
            "--no-cache",
        ])
        .unwrap();
        assert_eq!(opt.logger.verbose, 2);
        assert_eq!(opt.storage.cache_capacity, 1000);
        match opt.tool {
            Tool::Run(run) => {
                assert_eq!(run.problem, PathBuf::from("problem.json"));
                assert_eq!(TestsetKind::from(run.testset), TestsetKind::Pretest);
                assert!(!run.execution.run_options().use_cache);
            }
            _ => panic!("Expecting run"),
        }
    }

    #[test]
    fn test_parse_cache() {
        let opt = Opt::try_parse_from([
            "judger",
            "cache",
            "resize",
            "--cache-capacity",
            "10",
            "--store-dir",
            "/tmp/store",
        ])
        .unwrap();
        assert_eq!(opt.storage.cache_capacity, 10);
        assert_eq!(opt.storage.store_dir(), PathBuf::from("/tmp/store"));
        assert!(matches!(opt.tool, Tool::Cache(CacheTool::Resize)));
    }

    #[test]
    fn test_command() {
        use clap::CommandFactory;
        Opt::command().debug_assert();
    }
}
