mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;

use common::{submission, testcase, TestJudger};
use judger::{JudgeError, ScoreMethod, Testset};
use judger_exec::{DataProvider, MemoryData, RunOptions};

fn hack_input(input: &str) -> Arc<dyn DataProvider> {
    Arc::new(MemoryData::new().with("input", input.to_string()))
}

fn testset() -> Testset {
    Testset::flat(100.0, ScoreMethod::Sum, vec![testcase(1, 2)])
}

#[test]
fn hack_successful() {
    let test = TestJudger::new();
    let problem = test.hackable_problem(testset());
    let result = test
        .judger
        .run_hack(
            &problem,
            submission("a-b"),
            submission("a+b"),
            hack_input("5 3\n"),
            RunOptions::default(),
        )
        .unwrap();
    assert_eq!(result.title, "Wrong Answer");
    assert_eq!(result.score, 0.0);
    assert_eq!(result.full_score, 100.0);
    let message = result
        .files
        .iter()
        .find(|f| f.title == "checker message")
        .unwrap();
    assert_eq!(message.content, "expected 8, found 2");
    // the checker is not run for the reference solution: the answer is missing
    assert_eq!(test.calls.check(), 1);
    assert_eq!(test.calls.run(), 2);
}

#[test]
fn hack_unsuccessful() {
    let test = TestJudger::new();
    let problem = test.hackable_problem(testset());
    let result = test
        .judger
        .run_hack(
            &problem,
            submission("a+b small"),
            submission("a+b"),
            hack_input("5 3\n"),
            RunOptions::default(),
        )
        .unwrap();
    assert_eq!(result.title, "Accepted");
    assert_eq!(result.score, 100.0);
}

#[test]
fn hack_not_supported() {
    let test = TestJudger::new();
    let problem = test.problem(testset());
    let err = test
        .judger
        .run_hack(
            &problem,
            submission("a-b"),
            submission("a+b"),
            hack_input("5 3\n"),
            RunOptions::default(),
        )
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<JudgeError>(),
        Some(JudgeError::HackUnsupported)
    ));
    assert_eq!(test.calls.run(), 0);
}
