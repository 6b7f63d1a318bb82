//! # judger
//!
//! Judges the submissions of a problem running a graph of processors on every test, grading the
//! tests with their subtasks, and caching the results of the processors.
//!
//! This is both an application and a library: the `judger` binary judges the problems described
//! by a JSON file (see [`job`]), while the library lets an application build its own [`Problem`]s
//! and processors.
//!
//! ```
//! use judger::{Grader, ScoreMethod};
//!
//! let mut grader = Grader::new(ScoreMethod::Min, 30.0, 3);
//! grader.add(30.0);
//! grader.add(0.0);
//! assert!(grader.skippable());
//! assert_eq!(grader.sum(), 0.0);
//! ```

#[macro_use]
extern crate log;

pub mod error;
mod grader;
pub mod job;
mod judge;
pub mod opt;
mod problem;
mod result;
mod testdata;
pub mod tools;

pub use grader::{Grader, ScoreMethod};
pub use judge::{JudgeError, Judger, JudgerConfig};
pub use problem::Problem;
pub use result::{ProblemResult, SubtaskResult};
pub use testdata::{Subtask, Testcase, Testset, TestsetCases, TestsetKind};
