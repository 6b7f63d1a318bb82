use std::collections::BTreeMap;
use std::sync::Arc;

use judger_dag::{Graph, Port};
use judger_exec::{Analyzer, DataProvider};

use crate::{Testset, TestsetKind};

/// Everything needed to judge the submissions of a problem.
#[derive(Clone)]
pub struct Problem {
    /// The graph run for every test.
    pub graph: Arc<Graph>,
    /// Turns the runs of the graph into verdicts.
    pub analyzer: Arc<dyn Analyzer>,
    /// The score of a single run outside of the testsets, like a hack or a custom test.
    pub full_score: f64,
    /// The fields of the `static` group.
    pub static_data: Arc<dyn DataProvider>,
    /// The fields every submission must have.
    pub submission_fields: Vec<String>,
    /// The main tests.
    pub testdata: Testset,
    /// The tests run before the main ones.
    pub pretest: Option<Testset>,
    /// Additional tests.
    pub extra: Option<Testset>,
    /// For each field of a hack that is produced by the reference solution, the output port it
    /// comes from. Empty if the problem cannot be hacked.
    pub hack_fields: BTreeMap<String, Port>,
}

impl Problem {
    /// A problem with just the main tests.
    pub fn new(
        graph: Arc<Graph>,
        analyzer: Arc<dyn Analyzer>,
        static_data: Arc<dyn DataProvider>,
        testdata: Testset,
    ) -> Problem {
        Problem {
            graph,
            analyzer,
            full_score: testdata.full_score,
            static_data,
            submission_fields: vec![],
            testdata,
            pretest: None,
            extra: None,
            hack_fields: BTreeMap::new(),
        }
    }

    /// The testset of that kind, if the problem has one.
    pub fn testset(&self, kind: TestsetKind) -> Option<&Testset> {
        match kind {
            TestsetKind::Main => Some(&self.testdata),
            TestsetKind::Pretest => self.pretest.as_ref(),
            TestsetKind::Extra => self.extra.as_ref(),
        }
    }

    /// Whether the problem accepts hacks.
    pub fn supports_hack(&self) -> bool {
        !self.hack_fields.is_empty()
    }
}

impl std::fmt::Debug for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Problem")
            .field("nodes", &self.graph.order())
            .field("full_score", &self.full_score)
            .field("submission_fields", &self.submission_fields)
            .field("tests", &self.testdata.len())
            .field("hack_fields", &self.hack_fields)
            .finish_non_exhaustive()
    }
}
