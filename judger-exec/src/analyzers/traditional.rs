use anyhow::Error;

use judger_dag::ProcessorStatus;

use super::{checker_report, input_of, output_of, usage};
use crate::{
    show, status_title, Analyzer, NodeSet, ResultFile, WorkflowResult, ACCEPTED, COMPILE_ERROR,
    SHOW_LIMIT, WRONG_ANSWER,
};

/// The analyzer of the problems with a checker, working on the graph of
/// [`presets::traditional`](crate::presets::traditional).
///
/// The verdict is, in order of precedence: `Checker Compile Error`, `Compile Error`, the verdict
/// of the runner, `Checker <verdict>` if the checker itself failed, and finally `Accepted` or
/// `Wrong Answer` depending on the outcome of the checker.
#[derive(Debug, Clone, Copy, Default)]
pub struct Traditional;

impl Analyzer for Traditional {
    fn analyze(&self, nodes: &NodeSet<'_>, full_score: f64) -> Result<WorkflowResult, Error> {
        let compile = nodes.require("compile")?;
        let checker_compile = nodes.require("checker_compile")?;
        let run = nodes.require("run")?;
        let check = nodes.require("check")?;

        if !checker_compile.is_ok() {
            return Ok(WorkflowResult::new("Checker Compile Error", 0.0, full_score).with_file(
                show("compile log", output_of(checker_compile, "log"), SHOW_LIMIT),
            ));
        }
        if !compile.is_ok() {
            return Ok(WorkflowResult::new(COMPILE_ERROR, 0.0, full_score).with_file(show(
                "compile log",
                output_of(compile, "log"),
                SHOW_LIMIT,
            )));
        }

        let stdin = show("stdin", input_of(run, "stdin"), SHOW_LIMIT);
        let stdout = show("stdout", output_of(run, "stdout"), SHOW_LIMIT);
        let stderr = show("stderr", output_of(run, "stderr"), SHOW_LIMIT);

        let Some(run_result) = run.result().filter(|r| r.is_ok()) else {
            let status = run
                .result()
                .map(|r| r.status)
                .unwrap_or(ProcessorStatus::SystemError);
            let mut result = WorkflowResult::new(status_title(status), 0.0, full_score);
            result.files = vec![stdin, stderr, stdout];
            return Ok(result);
        };
        let check_status = check
            .result()
            .map(|r| r.status)
            .unwrap_or(ProcessorStatus::SystemError);
        // testlib exits with a non-zero code on a wrong answer
        if check_status != ProcessorStatus::Ok && check_status != ProcessorStatus::ExitError {
            return Ok(WorkflowResult::new(
                format!("Checker {}", status_title(check_status)),
                0.0,
                full_score,
            ));
        }

        let message = checker_report(output_of(check, "xmlreport"))
            .map(|r| r.message)
            .unwrap_or_default();
        let (title, score) = if check_status == ProcessorStatus::Ok {
            (ACCEPTED, full_score)
        } else {
            (WRONG_ANSWER, 0.0)
        };
        let (time, memory) = usage(Some(run_result));
        let mut result = WorkflowResult::new(title, score, full_score);
        result.time = time;
        result.memory = memory;
        result.files = vec![
            stdin,
            stderr,
            stdout,
            show("answer", input_of(check, "answer"), SHOW_LIMIT),
            ResultFile {
                title: "checker message".into(),
                content: message,
            },
        ];
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::super::test_util::{files, inbound, registry, run_nodes, Outcomes};
    use super::*;
    use crate::{presets, RunOptions};

    fn analyze(outcomes: Outcomes) -> WorkflowResult {
        let registry = registry(outcomes);
        let graph = presets::traditional(&registry).unwrap();
        run_nodes(&registry, &graph, &inbound(), RunOptions::default(), |nodes| {
            Traditional.analyze(nodes, 10.0).unwrap()
        })
    }

    #[test]
    fn test_accepted() {
        let result = analyze(Outcomes::default());
        assert_eq!(result.title, "Accepted");
        assert_eq!(result.score, 10.0);
        assert_eq!(result.time, Duration::from_millis(42));
        assert_eq!(result.memory, 1024);
        let files = files(&result);
        assert_eq!(files["stdin"], "1 2\n");
        assert_eq!(files["stdout"], "3\n");
        assert_eq!(files["answer"], "3\n");
        assert_eq!(files["checker message"], "ok 1 number(s): \"3\"");
    }

    #[test]
    fn test_wrong_answer() {
        let result = analyze(Outcomes {
            check: ProcessorStatus::ExitError,
            ..Default::default()
        });
        assert_eq!(result.title, "Wrong Answer");
        assert_eq!(result.score, 0.0);
        assert_eq!(result.full_score, 10.0);
        assert_eq!(files(&result)["checker message"], "expected 3, found 4");
    }

    #[test]
    fn test_compile_errors() {
        let result = analyze(Outcomes {
            compile: ProcessorStatus::ExitError,
            ..Default::default()
        });
        assert_eq!(result.title, "Compile Error");
        assert_eq!(files(&result)["compile log"], "compiler log");

        let result = analyze(Outcomes {
            compile: ProcessorStatus::ExitError,
            checker_compile: ProcessorStatus::ExitError,
            ..Default::default()
        });
        assert_eq!(result.title, "Checker Compile Error");
        assert_eq!(files(&result)["compile log"], "checker log");
    }

    #[test]
    fn test_runner_and_checker_failures() {
        let result = analyze(Outcomes {
            run: ProcessorStatus::TimeExceed,
            ..Default::default()
        });
        assert_eq!(result.title, "Time Limit Exceed");
        assert_eq!(result.score, 0.0);

        let result = analyze(Outcomes {
            check: ProcessorStatus::RuntimeError,
            ..Default::default()
        });
        assert_eq!(result.title, "Checker Runtime Error");
        assert!(result.files.is_empty());
    }
}
