#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::TempDir;

use judger::{Judger, JudgerConfig, Problem, Subtask, ScoreMethod, Testcase, Testset};
use judger_cache::Cache;
use judger_dag::{Port, ProcessorResult, ProcessorStatus};
use judger_exec::analyzers::Traditional;
use judger_exec::presets::{self, CHECKER_TESTLIB, COMPILER_AUTO, COMPILER_TESTLIB, RUNNER_AUTO};
use judger_exec::{DataProvider, FnProcessor, MemoryData, Registry, WorkflowResult};

pub fn setup() {
    let _ = env_logger::Builder::from_default_env()
        .format_timestamp_nanos()
        .is_test(true)
        .try_init();
}

/// How many times each fake processor has been invoked.
#[derive(Debug, Default)]
pub struct Calls {
    pub compile: AtomicUsize,
    pub checker_compile: AtomicUsize,
    pub run: AtomicUsize,
    pub check: AtomicUsize,
}

impl Calls {
    pub fn compile(&self) -> usize {
        self.compile.load(Ordering::SeqCst)
    }

    pub fn checker_compile(&self) -> usize {
        self.checker_compile.load(Ordering::SeqCst)
    }

    pub fn run(&self) -> usize {
        self.run.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> usize {
        self.check.load(Ordering::SeqCst)
    }
}

/// Runs the programs of a toy language where the source is the name of the behavior:
///
/// - `a+b` and `a-b` print the sum or the difference of the two numbers in the input;
/// - `a+b small` prints the sum only when it is less than 100, otherwise 0;
/// - `crash` fails with a runtime error;
/// - anything containing `syntax error` does not compile.
fn run_program(program: &[u8], stdin: &[u8]) -> Result<String, ProcessorStatus> {
    let stdin = String::from_utf8_lossy(stdin);
    let numbers: Vec<i64> = stdin
        .split_whitespace()
        .filter_map(|n| n.parse().ok())
        .collect();
    let (a, b) = match numbers.as_slice() {
        [a, b] => (*a, *b),
        _ => return Err(ProcessorStatus::RuntimeError),
    };
    match program {
        b"a+b" => Ok(format!("{}\n", a + b)),
        b"a-b" => Ok(format!("{}\n", a - b)),
        b"a+b small" if a + b < 100 => Ok(format!("{}\n", a + b)),
        b"a+b small" => Ok("0\n".into()),
        _ => Err(ProcessorStatus::RuntimeError),
    }
}

/// A registry with the processors of the traditional preset, counting the invocations.
pub fn registry(calls: Arc<Calls>) -> Registry {
    let labels = presets::labels();
    let mut builder = Registry::builder();
    let c = calls.clone();
    builder.register(
        COMPILER_AUTO,
        FnProcessor::new(labels[COMPILER_AUTO].clone(), move |ctx| {
            c.compile.fetch_add(1, Ordering::SeqCst);
            let source = ctx.input("source").to_vec();
            if String::from_utf8_lossy(&source).contains("syntax error") {
                ctx.set_output("log", "main.cpp:1: syntax error");
                return ProcessorResult::new(ProcessorStatus::ExitError, "Exited with 1");
            }
            ctx.set_output("result", source);
            ProcessorResult::ok()
        }),
    );
    let c = calls.clone();
    builder.register(
        COMPILER_TESTLIB,
        FnProcessor::new(labels[COMPILER_TESTLIB].clone(), move |ctx| {
            c.checker_compile.fetch_add(1, Ordering::SeqCst);
            ctx.set_output("result", ctx.input("source").to_vec());
            ProcessorResult::ok()
        }),
    );
    let c = calls.clone();
    builder.register(
        RUNNER_AUTO,
        FnProcessor::new(labels[RUNNER_AUTO].clone(), move |ctx| {
            c.run.fetch_add(1, Ordering::SeqCst);
            match run_program(ctx.input("executable"), ctx.input("stdin")) {
                Ok(stdout) => {
                    ctx.set_output("stdout", stdout);
                    let mut result = ProcessorResult::ok();
                    result.memory = Some(4096);
                    result
                }
                Err(status) => ProcessorResult::new(status, "Killed by signal 11"),
            }
        }),
    );
    let c = calls;
    builder.register(
        CHECKER_TESTLIB,
        FnProcessor::new(labels[CHECKER_TESTLIB].clone(), move |ctx| {
            c.check.fetch_add(1, Ordering::SeqCst);
            let output = String::from_utf8_lossy(ctx.input("output")).trim().to_string();
            let answer = String::from_utf8_lossy(ctx.input("answer")).trim().to_string();
            if output == answer {
                ctx.set_output(
                    "xmlreport",
                    format!(r#"<result outcome="accepted">ok 1 number(s): &quot;{}&quot;</result>"#, answer),
                );
                ProcessorResult::ok()
            } else {
                ctx.set_output(
                    "xmlreport",
                    format!(r#"<result outcome="wrong-answer">expected {}, found {}</result>"#, answer, output),
                );
                ProcessorResult::new(ProcessorStatus::ExitError, "Exited with 1")
            }
        }),
    );
    builder.build().expect("Invalid registry")
}

/// A judger with the fake processors and its own cache.
pub struct TestJudger {
    pub judger: Judger,
    pub calls: Arc<Calls>,
    _tempdir: TempDir,
}

impl TestJudger {
    pub fn new() -> TestJudger {
        TestJudger::with_capacity(1000)
    }

    pub fn with_capacity(cache_capacity: usize) -> TestJudger {
        setup();
        let tempdir = TempDir::new().expect("Cannot create tempdir");
        let calls = Arc::new(Calls::default());
        let cache = Cache::new(tempdir.path().join("cache")).expect("Cannot create cache");
        let judger = Judger::new(
            Arc::new(registry(calls.clone())),
            Arc::new(cache),
            JudgerConfig {
                work_dir: tempdir.path().join("work"),
                cache_capacity,
            },
        );
        TestJudger {
            judger,
            calls,
            _tempdir: tempdir,
        }
    }

    /// A traditional problem with these tests.
    pub fn problem(&self, testdata: Testset) -> Problem {
        let graph = presets::traditional(self.judger.registry()).expect("Invalid graph");
        let statics = MemoryData::new()
            .with("checker", "testlib checker")
            .with("runner_config", "time 1s");
        let mut problem = Problem::new(
            Arc::new(graph),
            Arc::new(Traditional),
            Arc::new(statics),
            testdata,
        );
        problem.submission_fields = vec!["source".into(), "option".into()];
        problem
    }

    /// A traditional problem that accepts hacks providing just the input.
    pub fn hackable_problem(&self, testdata: Testset) -> Problem {
        let mut problem = self.problem(testdata);
        let mut fields = BTreeMap::new();
        fields.insert("output".to_string(), Port::new("run", "stdout"));
        problem.hack_fields = fields;
        problem
    }
}

/// The data of a test of A+B.
pub fn test_data(a: i64, b: i64) -> Arc<dyn DataProvider> {
    Arc::new(
        MemoryData::new()
            .with("input", format!("{} {}\n", a, b))
            .with("output", format!("{}\n", a + b)),
    )
}

pub fn testcase(a: i64, b: i64) -> Testcase {
    Testcase::new(test_data(a, b))
}

pub fn subtask(id: &str, method: ScoreMethod, full_score: f64, tests: &[(i64, i64)]) -> Subtask {
    Subtask {
        id: id.into(),
        method,
        full_score,
        depends_on: vec![],
        data: None,
        testcases: tests.iter().map(|(a, b)| testcase(*a, *b)).collect(),
    }
}

pub fn submission(source: &str) -> Arc<dyn DataProvider> {
    Arc::new(MemoryData::new().with("source", source.to_string()).with("option", "-O2"))
}

pub fn titles(results: &[WorkflowResult]) -> Vec<&str> {
    results.iter().map(|r| r.title.as_str()).collect()
}
