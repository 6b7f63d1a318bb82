use serde::{Deserialize, Serialize};

use judger_exec::WorkflowResult;

/// The outcome of a testset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemResult {
    /// The maximum score of the testset.
    pub full_score: f64,
    /// The score obtained.
    pub score: f64,
    /// The outcome of each subtask, in the order they are declared. A testset without subtasks
    /// has a single one, without id.
    pub subtasks: Vec<SubtaskResult>,
}

/// The outcome of a subtask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtaskResult {
    /// The id of the subtask.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The maximum score of the subtask.
    pub full_score: f64,
    /// The score obtained.
    pub score: f64,
    /// The outcome of each test.
    pub testcases: Vec<WorkflowResult>,
}

impl SubtaskResult {
    /// Whether the maximum score has been obtained, up to rounding.
    pub fn is_full(&self) -> bool {
        self.full_score - self.score < FULL_SCORE_TOLERANCE
    }
}

/// Absolute difference from the full score still counted as full.
const FULL_SCORE_TOLERANCE: f64 = 1e-5;

#[cfg(test)]
mod tests {
    use super::*;

    fn subtask(full_score: f64, score: f64) -> SubtaskResult {
        SubtaskResult {
            id: Some("sub".into()),
            full_score,
            score,
            testcases: vec![],
        }
    }

    #[test]
    fn test_is_full() {
        assert!(subtask(30.0, 30.0).is_full());
        assert!(subtask(30.0, 29.999999999999996).is_full());
        assert!(subtask(0.0, 0.0).is_full());
        assert!(!subtask(30.0, 29.99).is_full());
        assert!(!subtask(30.0, 0.0).is_full());
    }
}
