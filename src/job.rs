//! Problems described by a JSON file.
//!
//! A problem file contains the graph (either the name of a preset or a serialized
//! `GraphBuilder`), the command processors, the analyzer and the testsets. Every test is a
//! directory, with a file for each field of the `tests` group. Relative paths are relative to the
//! directory of the problem file.
//!
//! ```json
//! {
//!   "graph": "traditional",
//!   "processors": { "runner:auto": { "inputs": ["executable", "stdin", "conf"], "...": "..." } },
//!   "analyzer": "traditional",
//!   "static": "static",
//!   "submission_fields": ["source", "option"],
//!   "testdata": {
//!     "subtasks": [
//!       { "id": "1", "method": "min", "full_score": 30, "tests": ["tests/1"] },
//!       { "id": "2", "method": "min", "full_score": 70, "depends_on": ["1"],
//!         "tests": ["tests/2", { "dir": "tests/3", "score": 10 }] }
//!     ]
//!   },
//!   "pretest": { "full_score": 1, "tests": ["samples/1"] }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Error};
use serde::{Deserialize, Serialize};

use judger_dag::{Graph, GraphBuilder, Port};
use judger_exec::{analyzers, presets, CommandSpec, DataProvider, DirData, MemoryData, Registry};

use crate::{Problem, ScoreMethod, Subtask, Testcase, Testset};

/// Where the graph of a problem comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GraphSource {
    /// The name of one of the presets: `traditional` or `customtest`.
    Preset(String),
    /// A graph described node by node.
    Builder(GraphBuilder),
}

/// A test: a directory, optionally with a custom score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TestSpec {
    /// Just the directory.
    Dir(PathBuf),
    /// The directory and the score of the test.
    Scored {
        /// The directory with the fields of the test.
        dir: PathBuf,
        /// The score of the test.
        score: f64,
    },
}

/// A subtask in a problem file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtaskSpec {
    /// The id of the subtask.
    pub id: String,
    /// How the scores of the tests are combined.
    #[serde(default)]
    pub method: ScoreMethod,
    /// The maximum score of the subtask.
    pub full_score: f64,
    /// The ids of the subtasks this depends on.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// The directory with the fields of the `subtask` group.
    #[serde(default)]
    pub data: Option<PathBuf>,
    /// The tests.
    pub tests: Vec<TestSpec>,
}

/// A testset in a problem file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TestsetSpec {
    /// A testset made of subtasks.
    Subtasks {
        /// The subtasks.
        subtasks: Vec<SubtaskSpec>,
    },
    /// A plain list of tests.
    Flat {
        /// The maximum score.
        full_score: f64,
        /// How the scores of the tests are combined.
        #[serde(default)]
        method: ScoreMethod,
        /// The tests.
        tests: Vec<TestSpec>,
    },
}

fn default_analyzer() -> String {
    "default".into()
}

/// The content of a problem file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemSpec {
    /// The graph run for each test.
    pub graph: GraphSource,
    /// The command processors, indexed by name.
    #[serde(default)]
    pub processors: BTreeMap<String, CommandSpec>,
    /// The name of the analyzer.
    #[serde(default = "default_analyzer")]
    pub analyzer: String,
    /// The score of a hack, defaults to the full score of the main testset.
    #[serde(default)]
    pub full_score: Option<f64>,
    /// The directory of the `static` group.
    #[serde(default, rename = "static")]
    pub static_dir: Option<PathBuf>,
    /// The fields required in a submission.
    #[serde(default)]
    pub submission_fields: Vec<String>,
    /// The main testset.
    pub testdata: TestsetSpec,
    /// The pretests.
    #[serde(default)]
    pub pretest: Option<TestsetSpec>,
    /// The extra tests.
    #[serde(default)]
    pub extra: Option<TestsetSpec>,
    /// The fields of a hack taken from the outputs of the reference solution.
    #[serde(default)]
    pub hack_fields: BTreeMap<String, Port>,
    /// The directory the relative paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl ProblemSpec {
    /// Load a problem file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ProblemSpec, Error> {
        let path = path.as_ref();
        let content = std::fs::read(path)
            .with_context(|| format!("Failed to read problem file {}", path.display()))?;
        let mut spec: ProblemSpec = serde_json::from_slice(&content)
            .with_context(|| format!("Failed to parse problem file {}", path.display()))?;
        spec.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(spec)
    }

    /// Build the registry with the processors of the problem.
    pub fn registry(&self) -> Result<Registry, Error> {
        Registry::from_commands(self.processors.clone()).context("Invalid processors")
    }

    /// Build the graph, validating it against the registry.
    pub fn graph(&self, registry: &Registry) -> Result<Graph, Error> {
        match &self.graph {
            GraphSource::Preset(name) => match name.as_str() {
                "traditional" => presets::traditional(registry),
                "customtest" => presets::custom_test(registry),
                _ => return Err(anyhow!("Unknown graph preset {:?}", name)),
            }
            .with_context(|| format!("Invalid preset {}", name)),
            GraphSource::Builder(builder) => builder.build(registry).context("Invalid graph"),
        }
    }

    /// Build the problem, validating the graph against the registry.
    pub fn build(&self, registry: &Registry) -> Result<Problem, Error> {
        let graph = self.graph(registry)?;
        let analyzer = analyzers::by_name(&self.analyzer)
            .ok_or_else(|| anyhow!("Unknown analyzer {:?}", self.analyzer))?;
        let static_data: Arc<dyn DataProvider> = match &self.static_dir {
            Some(dir) => Arc::new(DirData::new(self.resolve(dir))),
            None => Arc::new(MemoryData::new()),
        };
        let testdata = self.testset(&self.testdata);
        Ok(Problem {
            graph: Arc::new(graph),
            analyzer,
            full_score: self.full_score.unwrap_or(testdata.full_score),
            static_data,
            submission_fields: self.submission_fields.clone(),
            testdata,
            pretest: self.pretest.as_ref().map(|t| self.testset(t)),
            extra: self.extra.as_ref().map(|t| self.testset(t)),
            hack_fields: self.hack_fields.clone(),
        })
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.base_dir.join(path)
    }

    fn testcase(&self, test: &TestSpec) -> Testcase {
        match test {
            TestSpec::Dir(dir) => Testcase::new(Arc::new(DirData::new(self.resolve(dir)))),
            TestSpec::Scored { dir, score } => {
                Testcase::new(Arc::new(DirData::new(self.resolve(dir)))).with_score(*score)
            }
        }
    }

    fn testset(&self, spec: &TestsetSpec) -> Testset {
        match spec {
            TestsetSpec::Flat {
                full_score,
                method,
                tests,
            } => Testset::flat(
                *full_score,
                *method,
                tests.iter().map(|t| self.testcase(t)).collect(),
            ),
            TestsetSpec::Subtasks { subtasks } => Testset::subtasks(
                subtasks
                    .iter()
                    .map(|s| Subtask {
                        id: s.id.clone(),
                        method: s.method,
                        full_score: s.full_score,
                        depends_on: s.depends_on.clone(),
                        data: s.data.as_ref().map(|d| {
                            Arc::new(DirData::new(self.resolve(d))) as Arc<dyn DataProvider>
                        }),
                        testcases: s.tests.iter().map(|t| self.testcase(t)).collect(),
                    })
                    .collect(),
            ),
        }
    }
}
