use anyhow::Error;

use judger_dag::DataGroup;

use crate::job::ProblemSpec;
use crate::opt::CheckOpt;
use crate::{TestsetCases, TestsetKind};

/// Handler of the `check` tool: validates the problem file and prints a summary of it.
pub fn main_check(opt: CheckOpt) -> Result<(), Error> {
    let spec = ProblemSpec::load(&opt.problem)?;
    let registry = spec.registry()?;
    let problem = spec.build(&registry)?;

    println!("Processors: {}", registry.names().collect::<Vec<_>>().join(", "));
    println!("Nodes:");
    for name in problem.graph.order() {
        if let Some(node) = problem.graph.node(name) {
            let cache = if node.cache { "" } else { " (not persisted)" };
            println!(" - {} [{}]{}", node.name, node.processor, cache);
        }
    }
    for group in DataGroup::ALL {
        let fields: Vec<_> = problem
            .graph
            .inbounds_of(group)
            .map(|i| i.field.as_str())
            .collect();
        if !fields.is_empty() {
            println!("Fields of {}: {}", group, fields.join(", "));
        }
    }
    for kind in [TestsetKind::Main, TestsetKind::Pretest, TestsetKind::Extra] {
        let testset = match problem.testset(kind) {
            Some(testset) => testset,
            None => continue,
        };
        match &testset.cases {
            TestsetCases::Flat { method, testcases } => println!(
                "Testset {}: {} tests, {:?}, score {}",
                kind,
                testcases.len(),
                method,
                testset.full_score
            ),
            TestsetCases::Subtasks(subtasks) => {
                println!("Testset {}: score {}", kind, testset.full_score);
                for subtask in subtasks {
                    println!(
                        " - subtask {}: {} tests, {:?}, score {}, depends on [{}]",
                        subtask.id,
                        subtask.testcases.len(),
                        subtask.method,
                        subtask.full_score,
                        subtask.depends_on.join(", ")
                    );
                }
            }
        }
    }
    if problem.supports_hack() {
        let fields: Vec<_> = problem.hack_fields.keys().map(String::as_str).collect();
        println!("Hack fields: {}", fields.join(", "));
    }
    Ok(())
}
