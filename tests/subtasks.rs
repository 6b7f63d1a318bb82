mod common;

use pretty_assertions::assert_eq;

use common::{submission, subtask, titles, TestJudger};
use judger::{JudgeError, ScoreMethod, Testset, TestsetKind};
use judger_dag::GraphError;
use judger_exec::RunOptions;

#[test]
fn subtasks_dependency_not_solved() {
    let test = TestJudger::new();
    let small = subtask("small", ScoreMethod::Min, 40.0, &[(1, 2), (50, 60), (3, 4)]);
    let mut large = subtask("large", ScoreMethod::Min, 60.0, &[(100, 200), (300, 400)]);
    large.depends_on = vec!["small".into()];
    let problem = test.problem(Testset::subtasks(vec![small, large]));
    let result = test
        .judger
        .run_testset(
            &problem,
            TestsetKind::Main,
            submission("a+b small"),
            RunOptions::default(),
        )
        .unwrap();

    assert_eq!(result.full_score, 100.0);
    assert_eq!(result.score, 0.0);
    let small = &result.subtasks[0];
    assert_eq!(small.id.as_deref(), Some("small"));
    // the third test is not run: the score of the subtask is already 0
    assert_eq!(
        titles(&small.testcases),
        vec!["Accepted", "Wrong Answer", "Skipped"]
    );
    let large = &result.subtasks[1];
    assert_eq!(large.score, 0.0);
    assert_eq!(titles(&large.testcases), vec!["Skipped", "Skipped"]);
    for skipped in &large.testcases {
        assert_eq!(skipped.score, 0.0);
        assert_eq!(skipped.full_score, 60.0);
    }
    assert_eq!(test.calls.run(), 2);
}

#[test]
fn subtasks_dependency_solved() {
    let test = TestJudger::new();
    let small = subtask("small", ScoreMethod::Min, 40.0, &[(1, 2), (3, 4)]);
    let mut large = subtask("large", ScoreMethod::Min, 60.0, &[(100, 200), (300, 400)]);
    large.depends_on = vec!["small".into()];
    let problem = test.problem(Testset::subtasks(vec![small, large]));
    let result = test
        .judger
        .run_testset(&problem, TestsetKind::Main, submission("a+b"), RunOptions::default())
        .unwrap();
    assert_eq!(result.score, 100.0);
    assert_eq!(result.subtasks[0].score, 40.0);
    assert_eq!(result.subtasks[1].score, 60.0);
    assert_eq!(test.calls.run(), 4);
}

#[test]
fn subtasks_sum_is_not_skipped() {
    let test = TestJudger::new();
    let small = subtask("small", ScoreMethod::Min, 40.0, &[(50, 60)]);
    let mut sum = subtask("sum", ScoreMethod::Sum, 60.0, &[(1, 2), (100, 200)]);
    sum.depends_on = vec!["small".into()];
    let problem = test.problem(Testset::subtasks(vec![small, sum]));
    let result = test
        .judger
        .run_testset(
            &problem,
            TestsetKind::Main,
            submission("a+b small"),
            RunOptions::default(),
        )
        .unwrap();
    assert_eq!(result.subtasks[0].score, 0.0);
    assert_eq!(
        titles(&result.subtasks[1].testcases),
        vec!["Accepted", "Wrong Answer"]
    );
    assert_eq!(result.subtasks[1].score, 30.0);
    assert_eq!(result.score, 30.0);
}

#[test]
fn subtasks_max_stops_at_full_score() {
    let test = TestJudger::new();
    let best = subtask("best", ScoreMethod::Max, 25.0, &[(50, 60), (1, 2), (3, 4)]);
    let problem = test.problem(Testset::subtasks(vec![best]));
    let result = test
        .judger
        .run_testset(
            &problem,
            TestsetKind::Main,
            submission("a+b small"),
            RunOptions::default(),
        )
        .unwrap();
    assert_eq!(
        titles(&result.subtasks[0].testcases),
        vec!["Wrong Answer", "Accepted", "Skipped"]
    );
    assert_eq!(result.score, 25.0);
    assert_eq!(test.calls.run(), 2);
}

#[test]
fn subtasks_declaration_order() {
    let test = TestJudger::new();
    let mut second = subtask("second", ScoreMethod::Min, 70.0, &[(1, 1)]);
    second.depends_on = vec!["first".into()];
    let first = subtask("first", ScoreMethod::Min, 30.0, &[(50, 60)]);
    let problem = test.problem(Testset::subtasks(vec![second, first]));
    let result = test
        .judger
        .run_testset(
            &problem,
            TestsetKind::Main,
            submission("a+b small"),
            RunOptions::default(),
        )
        .unwrap();
    let ids: Vec<_> = result.subtasks.iter().map(|s| s.id.as_deref()).collect();
    assert_eq!(ids, vec![Some("second"), Some("first")]);
    // "first" has been run before "second", which is then skipped
    assert_eq!(titles(&result.subtasks[0].testcases), vec!["Skipped"]);
    assert_eq!(titles(&result.subtasks[1].testcases), vec!["Wrong Answer"]);
}

#[test]
fn subtasks_cycle() {
    let test = TestJudger::new();
    let mut a = subtask("a", ScoreMethod::Min, 50.0, &[(1, 1)]);
    a.depends_on = vec!["b".into()];
    let mut b = subtask("b", ScoreMethod::Min, 50.0, &[(1, 1)]);
    b.depends_on = vec!["a".into()];
    let problem = test.problem(Testset::subtasks(vec![a, b]));
    let err = test
        .judger
        .run_testset(&problem, TestsetKind::Main, submission("a+b"), RunOptions::default())
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<JudgeError>(),
        Some(JudgeError::Graph(GraphError::NotDag(_)))
    ));
    assert_eq!(test.calls.run(), 0);
}

#[test]
fn subtasks_unknown_dependency() {
    let test = TestJudger::new();
    let mut a = subtask("a", ScoreMethod::Min, 50.0, &[(1, 1)]);
    a.depends_on = vec!["zero".into()];
    let problem = test.problem(Testset::subtasks(vec![a]));
    let err = test
        .judger
        .run_testset(&problem, TestsetKind::Main, submission("a+b"), RunOptions::default())
        .unwrap_err();
    match err.downcast_ref::<JudgeError>() {
        Some(JudgeError::UnknownDependency { subtask, dependency }) => {
            assert_eq!(subtask, "a");
            assert_eq!(dependency, "zero");
        }
        _ => panic!("Unexpected error: {:?}", err),
    }
}

#[test]
fn subtasks_duplicate_id() {
    let test = TestJudger::new();
    let a = subtask("a", ScoreMethod::Min, 50.0, &[(1, 1)]);
    let problem = test.problem(Testset::subtasks(vec![a.clone(), a]));
    let err = test
        .judger
        .run_testset(&problem, TestsetKind::Main, submission("a+b"), RunOptions::default())
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<JudgeError>(),
        Some(JudgeError::DuplicateSubtask(_))
    ));
}

#[test]
fn subtasks_sum_full_unlocks_dependent() {
    let test = TestJudger::new();
    let tests: Vec<(i64, i64)> = (1..=7).map(|i| (i, i + 1)).collect();
    let base = subtask("base", ScoreMethod::Sum, 30.0, &tests);
    let mut next = subtask("next", ScoreMethod::Min, 70.0, &[(10, 20)]);
    next.depends_on = vec!["base".into()];
    let problem = test.problem(Testset::subtasks(vec![base, next]));
    let result = test
        .judger
        .run_testset(&problem, TestsetKind::Main, submission("a+b"), RunOptions::default())
        .unwrap();

    let base = &result.subtasks[0];
    assert_eq!(base.score, 30.0);
    assert!(base.is_full());
    let next = &result.subtasks[1];
    assert_eq!(titles(&next.testcases), vec!["Accepted"]);
    assert_eq!(next.score, 70.0);
    assert_eq!(result.score, 100.0);
    assert_eq!(test.calls.run(), 8);
}
