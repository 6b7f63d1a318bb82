use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Error};
use thiserror::Error;

use judger_cache::{Cache, MemoryCache, TieredCache};
use judger_dag::{topological_sort, DataGroup, Graph, GraphError};
use judger_exec::analyzers::Hack;
use judger_exec::{
    Analyzer, DataProvider, Executor, InboundData, MemoryData, Registry, RunOptions,
    WorkflowResult,
};

use crate::{
    Grader, Problem, ProblemResult, ScoreMethod, Subtask, SubtaskResult, Testcase, TestsetCases,
    TestsetKind,
};

/// A structural problem found while judging, aborting the whole evaluation.
#[derive(Debug, Error)]
pub enum JudgeError {
    /// The submission lacks a field required by the problem.
    #[error("the submission has no field {0:?}")]
    MissingSubmissionField(String),
    /// The problem has no testset of the requested kind.
    #[error("the problem has no {0} testset")]
    MissingTestset(TestsetKind),
    /// A subtask depends on a subtask that does not exist.
    #[error("subtask {subtask:?} depends on the unknown subtask {dependency:?}")]
    UnknownDependency {
        /// The subtask with the dependency.
        subtask: String,
        /// The missing subtask.
        dependency: String,
    },
    /// Two subtasks have the same id.
    #[error("subtask {0:?} is declared more than once")]
    DuplicateSubtask(String),
    /// The problem has no way of building the data of a hack.
    #[error("the problem does not support hacks")]
    HackUnsupported,
    /// The dependencies between the subtasks are not valid.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Configuration of a [`Judger`].
#[derive(Debug, Clone)]
pub struct JudgerConfig {
    /// Where the temporary directories of the runs are created.
    pub work_dir: PathBuf,
    /// Maximum number of entries kept in the persistent cache.
    pub cache_capacity: usize,
}

/// Judges the submissions, owning the processors and the persistent cache.
///
/// All the methods take `&self`, so a judger can be shared between threads judging different
/// submissions at the same time.
#[derive(Debug)]
pub struct Judger {
    registry: Arc<Registry>,
    cache: Arc<Cache>,
    config: JudgerConfig,
}

/// The state shared by all the runs of a testset.
struct TestsetRun<'a> {
    judger: &'a Judger,
    problem: &'a Problem,
    base: InboundData,
    memory: MemoryCache,
    options: RunOptions,
}

impl Judger {
    /// Make a new judger.
    pub fn new(registry: Arc<Registry>, cache: Arc<Cache>, config: JudgerConfig) -> Judger {
        Judger {
            registry,
            cache,
            config,
        }
    }

    /// The processors used by this judger.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The persistent cache.
    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// The configuration of this judger.
    pub fn config(&self) -> &JudgerConfig {
        &self.config
    }

    fn executor(&self) -> Executor<'_> {
        Executor::new(&self.registry, &self.config.work_dir)
    }

    /// Judge a submission on a testset of a problem.
    ///
    /// The persistent cache is shrunk to the configured capacity before starting, and a new
    /// in-memory cache is used for all the tests of the testset.
    pub fn run_testset(
        &self,
        problem: &Problem,
        kind: TestsetKind,
        submission: Arc<dyn DataProvider>,
        options: RunOptions,
    ) -> Result<ProblemResult, Error> {
        let testset = problem
            .testset(kind)
            .ok_or(JudgeError::MissingTestset(kind))?;
        check_submission(problem, submission.as_ref())?;
        let evicted = self.cache.resize(self.config.cache_capacity)?;
        if evicted > 0 {
            debug!("Evicted {} entries from the cache", evicted);
        }
        info!("Running the {} testset ({} tests)", kind, testset.len());

        let mut run = TestsetRun {
            judger: self,
            problem,
            base: InboundData::new()
                .with(DataGroup::Submission, submission)
                .with(DataGroup::Static, problem.static_data.clone()),
            memory: MemoryCache::new(),
            options,
        };
        let subtasks = match &testset.cases {
            TestsetCases::Flat { method, testcases } => {
                let (score, results) =
                    run.run_group(*method, testset.full_score, testcases, None)?;
                vec![SubtaskResult {
                    id: None,
                    full_score: testset.full_score,
                    score,
                    testcases: results,
                }]
            }
            TestsetCases::Subtasks(subtasks) => run.run_subtasks(subtasks)?,
        };
        let score = subtasks.iter().map(|s| s.score).sum();
        info!("Score of the {} testset: {}/{}", kind, score, testset.full_score);
        Ok(ProblemResult {
            full_score: testset.full_score,
            score,
            subtasks,
        })
    }

    /// Run a graph once, outside of any testset, like for a custom test.
    pub fn run_workflow(
        &self,
        graph: &Graph,
        analyzer: &dyn Analyzer,
        inbound: &InboundData,
        full_score: f64,
        options: RunOptions,
    ) -> Result<WorkflowResult, Error> {
        let mut memory = MemoryCache::new();
        let mut cache = TieredCache::new(&mut memory, Some(self.cache.session()), true);
        self.executor()
            .run(graph, inbound, analyzer, &mut cache, full_score, options)
    }

    /// Judge a submission on a hack.
    ///
    /// `hack_tests` has only some of the fields of a test: the reference solution is run first,
    /// skipping the nodes that cannot run, and the fields listed in `hack_fields` are taken from
    /// its outputs. Then `hacked` is judged on the completed test.
    pub fn run_hack(
        &self,
        problem: &Problem,
        hacked: Arc<dyn DataProvider>,
        reference: Arc<dyn DataProvider>,
        hack_tests: Arc<dyn DataProvider>,
        options: RunOptions,
    ) -> Result<WorkflowResult, Error> {
        if !problem.supports_hack() {
            return Err(JudgeError::HackUnsupported.into());
        }
        check_submission(problem, hacked.as_ref())?;
        check_submission(problem, reference.as_ref())?;

        let mut base = InboundData::new().with(DataGroup::Static, problem.static_data.clone());
        // the limits of a hack are the ones of the first subtask
        if let Some(data) = problem.testdata.first_subtask_data() {
            base.set(DataGroup::Subtask, data.clone());
        }

        let mut memory = MemoryCache::new();
        let hack = Hack::new(problem.hack_fields.clone());
        let mut inbound = base.clone();
        inbound.set(DataGroup::Submission, reference);
        inbound.set(DataGroup::Tests, hack_tests.clone());
        {
            let mut cache = TieredCache::new(&mut memory, Some(self.cache.session()), true);
            let reference_options = RunOptions {
                dismiss_incomplete: true,
                ..options
            };
            self.executor()
                .run(
                    &problem.graph,
                    &inbound,
                    &hack,
                    &mut cache,
                    problem.full_score,
                    reference_options,
                )
                .context("Failed to run the reference solution on the hack")?;
        }

        let mut tests = MemoryData::new();
        for field in hack_tests.fields()? {
            if let Some(content) = hack_tests.get(&field)? {
                tests.insert(field, content);
            }
        }
        for (field, content) in hack.take_captured() {
            debug!("Hack field {} captured from the reference solution", field);
            tests.insert(field, content);
        }

        let mut inbound = base;
        inbound.set(DataGroup::Submission, hacked);
        inbound.set(DataGroup::Tests, Arc::new(tests));
        let mut cache = TieredCache::new(&mut memory, Some(self.cache.session()), true);
        self.executor().run(
            &problem.graph,
            &inbound,
            problem.analyzer.as_ref(),
            &mut cache,
            problem.full_score,
            options,
        )
    }
}

/// Checks that the submission has all the fields required by the problem.
fn check_submission(problem: &Problem, submission: &dyn DataProvider) -> Result<(), Error> {
    let fields = submission
        .fields()
        .context("Failed to list the fields of the submission")?;
    for field in &problem.submission_fields {
        if !fields.contains(field) {
            return Err(JudgeError::MissingSubmissionField(field.clone()).into());
        }
    }
    Ok(())
}

impl TestsetRun<'_> {
    /// Run the subtasks in an order compatible with their dependencies, returning the results in
    /// the order they are declared.
    fn run_subtasks(&mut self, subtasks: &[Subtask]) -> Result<Vec<SubtaskResult>, Error> {
        let mut index = HashMap::new();
        for (i, subtask) in subtasks.iter().enumerate() {
            if index.insert(subtask.id.as_str(), i).is_some() {
                return Err(JudgeError::DuplicateSubtask(subtask.id.clone()).into());
            }
        }
        let mut dependencies = vec![];
        for subtask in subtasks {
            for dependency in &subtask.depends_on {
                if !index.contains_key(dependency.as_str()) {
                    return Err(JudgeError::UnknownDependency {
                        subtask: subtask.id.clone(),
                        dependency: dependency.clone(),
                    }
                    .into());
                }
                dependencies.push((dependency.as_str(), subtask.id.as_str()));
            }
        }
        let ids: Vec<&str> = subtasks.iter().map(|s| s.id.as_str()).collect();
        let order = topological_sort(&ids, &dependencies).map_err(JudgeError::from)?;

        let mut results: Vec<Option<SubtaskResult>> = vec![None; subtasks.len()];
        for id in order {
            let subtask = &subtasks[index[id]];
            let unsolved = subtask.depends_on.iter().find(|dep| {
                results[index[dep.as_str()]]
                    .as_ref()
                    .map(|r| !r.is_full())
                    .unwrap_or(true)
            });
            let (score, testcases) = match unsolved {
                Some(dep) if subtask.method == ScoreMethod::Min => {
                    info!("Skipping subtask {}: {} is not solved", subtask.id, dep);
                    let grader =
                        Grader::new(subtask.method, subtask.full_score, subtask.testcases.len());
                    let skipped = subtask
                        .testcases
                        .iter()
                        .map(|t| WorkflowResult::skipped(test_score(t, &grader)))
                        .collect();
                    (0.0, skipped)
                }
                _ => {
                    debug!("Running subtask {}", subtask.id);
                    self.run_group(
                        subtask.method,
                        subtask.full_score,
                        &subtask.testcases,
                        subtask.data.as_ref(),
                    )?
                }
            };
            results[index[id]] = Some(SubtaskResult {
                id: Some(subtask.id.clone()),
                full_score: subtask.full_score,
                score,
                testcases,
            });
        }
        Ok(results.into_iter().flatten().collect())
    }

    /// Run the tests of a group, stopping as soon as the score cannot change anymore.
    fn run_group(
        &mut self,
        method: ScoreMethod,
        full_score: f64,
        testcases: &[Testcase],
        subtask_data: Option<&Arc<dyn DataProvider>>,
    ) -> Result<(f64, Vec<WorkflowResult>), Error> {
        let mut grader = Grader::new(method, full_score, testcases.len());
        let mut results = Vec::with_capacity(testcases.len());
        for (i, testcase) in testcases.iter().enumerate() {
            let score = test_score(testcase, &grader);
            if grader.skippable() {
                trace!("Skipping test {}", i);
                grader.add(0.0);
                results.push(WorkflowResult::skipped(score));
                continue;
            }
            let mut inbound = self.base.clone();
            inbound.set(DataGroup::Tests, testcase.data.clone());
            if let Some(data) = subtask_data {
                inbound.set(DataGroup::Subtask, data.clone());
            }
            let result = self
                .run_test(&inbound, score)
                .with_context(|| format!("Failed to run test {}", i))?;
            debug!("Test {}: {} ({}/{})", i, result.title, result.score, score);
            grader.add(result.score);
            results.push(result);
        }
        Ok((grader.sum(), results))
    }

    fn run_test(&mut self, inbound: &InboundData, full_score: f64) -> Result<WorkflowResult, Error> {
        let judger = self.judger;
        let mut cache = TieredCache::new(&mut self.memory, Some(judger.cache.session()), true);
        judger.executor().run(
            &self.problem.graph,
            inbound,
            self.problem.analyzer.as_ref(),
            &mut cache,
            full_score,
            self.options,
        )
    }
}

fn test_score(testcase: &Testcase, grader: &Grader) -> f64 {
    testcase
        .full_score
        .unwrap_or_else(|| grader.task_full_score())
}
