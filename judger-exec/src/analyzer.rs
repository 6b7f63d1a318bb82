use std::time::Duration;

use anyhow::Error;
use serde::{Deserialize, Serialize};

use judger_dag::ProcessorStatus;

use crate::NodeSet;

/// Title of a test that has not been run.
pub const SKIPPED: &str = "Skipped";
/// Title of a test solved correctly.
pub const ACCEPTED: &str = "Accepted";
/// Title of a test whose output has been rejected by the checker.
pub const WRONG_ANSWER: &str = "Wrong Answer";
/// Title of a submission that failed to compile.
pub const COMPILE_ERROR: &str = "Compile Error";
/// Title of a failure of the judging system itself.
pub const SYSTEM_ERROR: &str = "System Error";

/// Default limit, in bytes, of the files shown in a result.
pub const SHOW_LIMIT: usize = 1000;

/// A file shown to the user together with the verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultFile {
    /// The name of the file.
    pub title: String,
    /// The content, possibly truncated.
    pub content: String,
}

/// The verdict of a workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    /// The human readable verdict.
    pub title: String,
    /// The score obtained.
    pub score: f64,
    /// The maximum score obtainable.
    pub full_score: f64,
    /// The time used by the program being judged.
    pub time: Duration,
    /// The memory used by the program being judged, in bytes.
    pub memory: u64,
    /// The files shown to the user, sorted by title.
    pub files: Vec<ResultFile>,
}

impl WorkflowResult {
    /// An empty result with that title.
    pub fn new<S: Into<String>>(title: S, score: f64, full_score: f64) -> WorkflowResult {
        WorkflowResult {
            title: title.into(),
            score,
            full_score,
            time: Duration::ZERO,
            memory: 0,
            files: vec![],
        }
    }

    /// The result of a test that has not been run.
    pub fn skipped(full_score: f64) -> WorkflowResult {
        WorkflowResult::new(SKIPPED, 0.0, full_score)
    }

    /// Whether this is the result of a test that has not been run.
    pub fn is_skipped(&self) -> bool {
        self.title == SKIPPED
    }

    /// Add a shown file.
    pub fn with_file(mut self, file: ResultFile) -> WorkflowResult {
        self.files.push(file);
        self
    }
}

/// Turns the nodes of a completed run into a verdict. Each kind of problem has its own analyzer.
pub trait Analyzer: Send + Sync {
    /// Compute the verdict. An error means that the nodes do not have the shape this analyzer
    /// expects.
    fn analyze(&self, nodes: &NodeSet<'_>, full_score: f64) -> Result<WorkflowResult, Error>;
}

/// A file to show to the user, truncated to `limit` bytes. Invalid UTF-8 is replaced.
pub fn show<S: Into<String>>(title: S, data: &[u8], limit: usize) -> ResultFile {
    let data = &data[..data.len().min(limit)];
    ResultFile {
        title: title.into(),
        content: String::from_utf8_lossy(data).into_owned(),
    }
}

/// The verdict to show for a processor status.
pub fn status_title(status: ProcessorStatus) -> &'static str {
    match status {
        ProcessorStatus::Ok => ACCEPTED,
        ProcessorStatus::TimeExceed => "Time Limit Exceed",
        ProcessorStatus::RuntimeError => "Runtime Error",
        ProcessorStatus::MemoryExceed => "Memory Limit Exceed",
        ProcessorStatus::SystemError => SYSTEM_ERROR,
        ProcessorStatus::DangerousSyscall => "Dangerous System Call",
        ProcessorStatus::OutputExceed => "Output Limit Exceed",
        ProcessorStatus::ExitError => "Exit Code Error",
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_show() {
        assert_eq!(show("stdout", b"hello", 10).content, "hello");
        assert_eq!(show("stdout", b"hello", 3).content, "hel");
        assert_eq!(show("stdout", &[0xff, b'a'], 10).content, "\u{fffd}a");
    }

    #[test]
    fn test_skipped() {
        let result = WorkflowResult::skipped(25.0);
        assert!(result.is_skipped());
        assert_eq!(result.score, 0.0);
        assert_eq!(result.full_score, 25.0);
    }

    #[test]
    fn test_status_title() {
        assert_eq!(status_title(ProcessorStatus::TimeExceed), "Time Limit Exceed");
        assert_eq!(status_title(ProcessorStatus::Ok), "Accepted");
    }
}
