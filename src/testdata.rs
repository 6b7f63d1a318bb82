use std::sync::Arc;

use judger_exec::DataProvider;

use crate::ScoreMethod;

/// A single test: the data of the `tests` group.
#[derive(Debug, Clone)]
pub struct Testcase {
    /// The fields of the test.
    pub data: Arc<dyn DataProvider>,
    /// The score of this test, overriding the one given by the grader.
    pub full_score: Option<f64>,
}

impl Testcase {
    /// A test worth the score given by the grader.
    pub fn new(data: Arc<dyn DataProvider>) -> Testcase {
        Testcase {
            data,
            full_score: None,
        }
    }

    /// Give this test a custom score.
    pub fn with_score(mut self, score: f64) -> Testcase {
        self.full_score = Some(score);
        self
    }
}

/// A group of tests graded together.
#[derive(Debug, Clone)]
pub struct Subtask {
    /// The identifier of the subtask, referenced by `depends_on`.
    pub id: String,
    /// How the scores of the tests are combined.
    pub method: ScoreMethod,
    /// The maximum score of the subtask.
    pub full_score: f64,
    /// The subtasks that have to be solved before this one.
    pub depends_on: Vec<String>,
    /// The fields of the `subtask` group, shared by all the tests.
    pub data: Option<Arc<dyn DataProvider>>,
    /// The tests of the subtask.
    pub testcases: Vec<Testcase>,
}

/// The layout of the tests of a testset: either a plain list, or a list of subtasks.
#[derive(Debug, Clone)]
pub enum TestsetCases {
    /// All the tests are graded together.
    Flat {
        /// How the scores of the tests are combined.
        method: ScoreMethod,
        /// The tests.
        testcases: Vec<Testcase>,
    },
    /// Each subtask is graded on its own, the score is the sum of the subtask scores.
    Subtasks(Vec<Subtask>),
}

/// A set of tests, like the samples or the final tests of a problem.
#[derive(Debug, Clone)]
pub struct Testset {
    /// The maximum score of the testset. Ignored for the subtasks, which have their own.
    pub full_score: f64,
    /// The tests.
    pub cases: TestsetCases,
}

impl Testset {
    /// A testset with a plain list of tests.
    pub fn flat(full_score: f64, method: ScoreMethod, testcases: Vec<Testcase>) -> Testset {
        Testset {
            full_score,
            cases: TestsetCases::Flat { method, testcases },
        }
    }

    /// A testset made of subtasks. Its full score is the sum of the ones of the subtasks.
    pub fn subtasks(subtasks: Vec<Subtask>) -> Testset {
        Testset {
            full_score: subtasks.iter().map(|s| s.full_score).sum(),
            cases: TestsetCases::Subtasks(subtasks),
        }
    }

    /// The data of the `subtask` group of the first subtask, if any.
    pub fn first_subtask_data(&self) -> Option<&Arc<dyn DataProvider>> {
        match &self.cases {
            TestsetCases::Flat { .. } => None,
            TestsetCases::Subtasks(subtasks) => subtasks.first().and_then(|s| s.data.as_ref()),
        }
    }

    /// The total number of tests.
    pub fn len(&self) -> usize {
        match &self.cases {
            TestsetCases::Flat { testcases, .. } => testcases.len(),
            TestsetCases::Subtasks(subtasks) => subtasks.iter().map(|s| s.testcases.len()).sum(),
        }
    }

    /// Whether there are no tests.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Which of the testsets of a problem to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestsetKind {
    /// The tests that decide the score.
    Main,
    /// The tests run before the main ones, usually the samples.
    Pretest,
    /// Additional tests, like the ones from accepted hacks.
    Extra,
}

impl std::fmt::Display for TestsetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestsetKind::Main => write!(f, "main"),
            TestsetKind::Pretest => write!(f, "pretest"),
            TestsetKind::Extra => write!(f, "extra"),
        }
    }
}

#[cfg(test)]
mod tests {
    use judger_exec::MemoryData;

    use super::*;

    fn subtask(id: &'static str, score: f64, tests: usize) -> Subtask {
        Subtask {
            id: id.into(),
            method: ScoreMethod::Min,
            full_score: score,
            depends_on: vec![],
            data: Some(Arc::new(MemoryData::new().with("limit", id))),
            testcases: (0..tests)
                .map(|_| Testcase::new(Arc::new(MemoryData::new())))
                .collect(),
        }
    }

    #[test]
    fn test_subtasks_score() {
        let testset = Testset::subtasks(vec![subtask("a", 30.0, 2), subtask("b", 70.0, 3)]);
        assert_eq!(testset.full_score, 100.0);
        assert_eq!(testset.len(), 5);
        let data = testset.first_subtask_data().unwrap();
        assert_eq!(data.get("limit").unwrap().unwrap(), "a");
    }

    #[test]
    fn test_flat() {
        let testset = Testset::flat(10.0, ScoreMethod::Sum, vec![]);
        assert!(testset.is_empty());
        assert!(testset.first_subtask_data().is_none());
    }
}
