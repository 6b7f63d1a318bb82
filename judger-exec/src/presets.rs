//! The graphs of the common kinds of problems.
//!
//! The graphs use these processors, which have to be provided by the registry:
//!
//! | processor | inputs | outputs |
//! |---|---|---|
//! | `compiler:auto` | `source`, `option` | `result`, `log`, `judgerlog` |
//! | `compiler:testlib` | `source` | `result`, `log`, `judgerlog` |
//! | `runner:auto` | `executable`, `stdin`, `conf` | `stdout`, `stderr`, `judgerlog` |
//! | `checker:testlib` | `checker`, `input`, `output`, `answer` | `xmlreport`, `stderr`, `judgerlog` |

use std::collections::BTreeMap;

use judger_dag::{Graph, GraphBuilder, GraphError, LabelSource, ProcessorLabels};

/// Compiles a submission, with the language and the flags in `option`.
pub const COMPILER_AUTO: &str = "compiler:auto";
/// Compiles a testlib checker.
pub const COMPILER_TESTLIB: &str = "compiler:testlib";
/// Runs an executable with limits from `conf`.
pub const RUNNER_AUTO: &str = "runner:auto";
/// Runs a testlib checker.
pub const CHECKER_TESTLIB: &str = "checker:testlib";

/// The labels of the processors used by the presets.
pub fn labels() -> BTreeMap<String, ProcessorLabels> {
    let mut labels = BTreeMap::new();
    labels.insert(
        COMPILER_AUTO.to_string(),
        ProcessorLabels::new(["source", "option"], ["result", "log", "judgerlog"]),
    );
    labels.insert(
        COMPILER_TESTLIB.to_string(),
        ProcessorLabels::new(["source"], ["result", "log", "judgerlog"]),
    );
    labels.insert(
        RUNNER_AUTO.to_string(),
        ProcessorLabels::new(["executable", "stdin", "conf"], ["stdout", "stderr", "judgerlog"]),
    );
    labels.insert(
        CHECKER_TESTLIB.to_string(),
        ProcessorLabels::new(
            ["checker", "input", "output", "answer"],
            ["xmlreport", "stderr", "judgerlog"],
        ),
    );
    labels
}

/// The builder of the graph of a problem with a checker.
///
/// - `static`: `checker` is the source of the testlib checker, `runner_config` the limits.
/// - `submission`: `source` and `option`.
/// - `tests`: `input` and `output`.
pub fn traditional_builder() -> GraphBuilder {
    let mut builder = GraphBuilder::new();
    builder
        .add_node("compile", COMPILER_AUTO, true)
        .add_node("run", RUNNER_AUTO, false)
        .add_node("check", CHECKER_TESTLIB, false)
        .add_node("checker_compile", COMPILER_TESTLIB, true)
        .add_edge("checker_compile", "result", "check", "checker")
        .add_edge("run", "stdout", "check", "output")
        .add_edge("compile", "result", "run", "executable")
        .add_inbound("tests", "input", "check", "input")
        .add_inbound("tests", "output", "check", "answer")
        .add_inbound("submission", "source", "compile", "source")
        .add_inbound("submission", "option", "compile", "option")
        .add_inbound("static", "checker", "checker_compile", "source")
        .add_inbound("tests", "input", "run", "stdin")
        .add_inbound("static", "runner_config", "run", "conf");
    builder
}

/// The graph of a problem with a checker, see [`traditional_builder`].
pub fn traditional<L: LabelSource + ?Sized>(labels: &L) -> Result<Graph, GraphError> {
    traditional_builder().build(labels)
}

/// The builder of the graph of a custom test: the submission is run on the `input` of the
/// submission.
pub fn custom_test_builder() -> GraphBuilder {
    let mut builder = GraphBuilder::new();
    builder
        .add_node("compile", COMPILER_AUTO, true)
        .add_node("run", RUNNER_AUTO, false)
        .add_edge("compile", "result", "run", "executable")
        .add_inbound("submission", "source", "compile", "source")
        .add_inbound("submission", "option", "compile", "option")
        .add_inbound("submission", "input", "run", "stdin")
        .add_inbound("static", "runner_config", "run", "conf");
    builder
}

/// The graph of a custom test, see [`custom_test_builder`].
pub fn custom_test<L: LabelSource + ?Sized>(labels: &L) -> Result<Graph, GraphError> {
    custom_test_builder().build(labels)
}
