use serde::{Deserialize, Serialize};

/// How the scores of the testcases of a group are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreMethod {
    /// The scores are summed, every testcase is worth the same.
    #[default]
    Sum,
    /// The score is the minimum: every testcase is worth the full score.
    Min,
    /// The score is the maximum: every testcase is worth the full score.
    Max,
}

/// Relative error tolerated between a `Sum` of full marks and the full score.
const SUM_EPSILON: f64 = 1e-9;

/// Accumulates the scores of the testcases of a testset or of a subtask.
///
/// The comparisons with `0` and with the full score are exact: the scores added must be the
/// exact values computed from [`Grader::task_full_score`], without any rounding. A `Sum` whose
/// accumulated score is within rounding of the full score reports exactly the full score.
#[derive(Debug, Clone)]
pub struct Grader {
    method: ScoreMethod,
    full_score: f64,
    tasks: usize,
    current: f64,
}

impl Grader {
    /// Make a grader for `tasks` testcases worth `full_score` in total.
    pub fn new(method: ScoreMethod, full_score: f64, tasks: usize) -> Grader {
        let current = match method {
            ScoreMethod::Min => full_score,
            ScoreMethod::Sum | ScoreMethod::Max => 0.0,
        };
        Grader {
            method,
            full_score,
            tasks,
            current,
        }
    }

    /// The maximum score of a single testcase.
    pub fn task_full_score(&self) -> f64 {
        match self.method {
            ScoreMethod::Sum if self.tasks == 0 => 0.0,
            ScoreMethod::Sum => self.full_score / self.tasks as f64,
            ScoreMethod::Min | ScoreMethod::Max => self.full_score,
        }
    }

    /// Account the score of a testcase.
    pub fn add(&mut self, score: f64) {
        match self.method {
            ScoreMethod::Sum => self.current += score,
            ScoreMethod::Min => self.current = self.current.min(score),
            ScoreMethod::Max => self.current = self.current.max(score),
        }
    }

    /// Whether the score is already settled, so the remaining testcases do not need to be run.
    #[allow(clippy::float_cmp)]
    pub fn skippable(&self) -> bool {
        match self.method {
            ScoreMethod::Sum => false,
            ScoreMethod::Min => self.current == 0.0,
            ScoreMethod::Max => self.current == self.full_score,
        }
    }

    /// The score accumulated so far.
    pub fn sum(&self) -> f64 {
        if self.method == ScoreMethod::Sum
            && (self.full_score - self.current).abs() <= self.full_score.abs() * SUM_EPSILON
        {
            self.full_score
        } else {
            self.current
        }
    }

    /// The scoring method.
    pub fn method(&self) -> ScoreMethod {
        self.method
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_sum() {
        let mut grader = Grader::new(ScoreMethod::Sum, 100.0, 3);
        let task = grader.task_full_score();
        assert_abs_diff_eq!(task, 33.333333, epsilon = 1e-5);
        for _ in 0..3 {
            assert!(!grader.skippable());
            grader.add(task);
        }
        assert_eq!(grader.sum(), 100.0);
        assert!(!grader.skippable());
    }

    #[test]
    fn test_sum_full_marks_is_exact() {
        for full_score in [1.0, 7.0, 30.0, 100.0] {
            for tasks in 1..=12 {
                let mut grader = Grader::new(ScoreMethod::Sum, full_score, tasks);
                for _ in 0..tasks {
                    grader.add(grader.task_full_score());
                }
                assert_eq!(grader.sum(), full_score, "{} tasks worth {}", tasks, full_score);
            }
        }
    }

    #[test]
    fn test_sum_partial_is_not_rounded() {
        let mut grader = Grader::new(ScoreMethod::Sum, 30.0, 7);
        for _ in 0..6 {
            grader.add(grader.task_full_score());
        }
        assert!(grader.sum() < 30.0);
        assert_abs_diff_eq!(grader.sum(), 30.0 * 6.0 / 7.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sum_exact() {
        let mut grader = Grader::new(ScoreMethod::Sum, 10.0, 4);
        for _ in 0..4 {
            grader.add(grader.task_full_score());
        }
        assert_eq!(grader.sum(), 10.0);
    }

    #[test]
    fn test_min() {
        let mut grader = Grader::new(ScoreMethod::Min, 30.0, 5);
        assert_eq!(grader.task_full_score(), 30.0);
        assert_eq!(grader.sum(), 30.0);
        grader.add(30.0);
        assert!(!grader.skippable());
        grader.add(12.0);
        assert!(!grader.skippable());
        assert_eq!(grader.sum(), 12.0);
        grader.add(0.0);
        assert!(grader.skippable());
        grader.add(30.0);
        assert_eq!(grader.sum(), 0.0);
    }

    #[test]
    fn test_max() {
        let mut grader = Grader::new(ScoreMethod::Max, 30.0, 5);
        assert_eq!(grader.sum(), 0.0);
        grader.add(10.0);
        assert!(!grader.skippable());
        grader.add(30.0);
        assert!(grader.skippable());
        grader.add(0.0);
        assert_eq!(grader.sum(), 30.0);
    }

    #[test]
    fn test_no_tasks() {
        let grader = Grader::new(ScoreMethod::Sum, 10.0, 0);
        assert_eq!(grader.task_full_score(), 0.0);
        assert_eq!(grader.sum(), 0.0);
    }

    #[test]
    fn test_method_names() {
        assert_eq!(serde_json::to_string(&ScoreMethod::Min).unwrap(), "\"min\"");
        let method: ScoreMethod = serde_json::from_str("\"max\"").unwrap();
        assert_eq!(method, ScoreMethod::Max);
    }
}
