use std::collections::HashSet;

use anyhow::Error;

use judger_dag::{DataGroup, Graph};

use super::{checker_report, input_of, output_of, usage};
use crate::{
    show, status_title, Analyzer, NodeSet, ResultFile, RuntimeNode, WorkflowResult, ACCEPTED,
    COMPILE_ERROR, SYSTEM_ERROR, WRONG_ANSWER,
};

/// Limit of the files shown by the default analyzer.
const LIMIT: usize = 5000;

/// An analyzer that works on any graph, looking only at its shape and at the names of the
/// processors.
///
/// The nodes that depend, directly or not, on the submission are the _user_ nodes. A failure of
/// any other node is a `System Error`. Among the user nodes, processors whose name contains
/// `compile` give `Compile Error`, those containing `runner` give the verdict of their status and
/// those containing `checker` give `Wrong Answer`. The time and the memory are the ones of the
/// runners.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAnalyzer;

/// The names of the nodes reachable from the submission.
fn user_nodes(graph: &Graph) -> HashSet<&str> {
    let mut user: HashSet<&str> = graph
        .inbounds_of(DataGroup::Submission)
        .map(|i| i.to.node.as_str())
        .collect();
    // the order is topological, so a single pass is enough
    for name in graph.order() {
        if user.contains(name.as_str()) {
            for edge in graph.edges_from(name) {
                user.insert(edge.to.node.as_str());
            }
        }
    }
    user
}

/// The files worth showing for a node, depending on its processor.
fn node_files(node: &RuntimeNode) -> Vec<ResultFile> {
    let mut files = vec![];
    if node.processor.contains("checker") {
        files.push(show("answer", input_of(node, "answer"), LIMIT));
    } else if node.processor.contains("compile") {
        files.push(show("compile log", output_of(node, "log"), LIMIT));
    } else if node.processor.contains("runner") {
        files.push(show("stdout", output_of(node, "stdout"), LIMIT));
        files.push(show("stderr", output_of(node, "stderr"), LIMIT));
    }
    files
}

fn failure(node: &RuntimeNode) -> ResultFile {
    let message = node.result().map(|r| r.message.as_str()).unwrap_or_default();
    ResultFile {
        title: "message".into(),
        content: format!("{}: {}", node.name, message),
    }
}

impl Analyzer for DefaultAnalyzer {
    fn analyze(&self, nodes: &NodeSet<'_>, full_score: f64) -> Result<WorkflowResult, Error> {
        let user = user_nodes(nodes.graph());
        let is_user = |node: &RuntimeNode| user.contains(node.name.as_str());
        let failed = |node: &&RuntimeNode| node.result().map(|r| !r.is_ok()).unwrap_or(false);

        if let Some(node) = nodes.iter().filter(|n| !is_user(*n)).find(failed) {
            let mut result = WorkflowResult::new(SYSTEM_ERROR, 0.0, full_score);
            result.files.push(failure(node));
            result.files.extend(node_files(node));
            return Ok(result);
        }
        if let Some(node) = nodes
            .iter()
            .filter(|n| is_user(*n) && n.processor.contains("compile"))
            .find(failed)
        {
            let mut result = WorkflowResult::new(COMPILE_ERROR, 0.0, full_score);
            result.files.push(failure(node));
            result.files.extend(node_files(node));
            return Ok(result);
        }

        let mut result = WorkflowResult::new(ACCEPTED, full_score, full_score);
        for node in nodes.iter().filter(|n| n.processor.contains("runner")) {
            let (time, memory) = usage(node.result());
            result.time += time;
            result.memory = result.memory.max(memory);
        }
        for node in nodes.iter().filter(|n| is_user(*n) && n.result().is_some()) {
            result.files.extend(node_files(node));
        }

        if let Some(node) = nodes
            .iter()
            .filter(|n| is_user(*n) && n.processor.contains("runner"))
            .find(failed)
        {
            let status = node.result().map(|r| r.status);
            result.title = status.map(status_title).unwrap_or(SYSTEM_ERROR).to_string();
            result.score = 0.0;
            return Ok(result);
        }
        if let Some(node) = nodes.iter().filter(|n| is_user(*n)).find(failed) {
            result.score = 0.0;
            if node.processor.contains("checker") {
                result.title = WRONG_ANSWER.into();
                if let Some(report) = checker_report(output_of(node, "xmlreport")) {
                    result.files.push(ResultFile {
                        title: "checker message".into(),
                        content: report.message,
                    });
                }
            } else {
                let status = node.result().map(|r| r.status);
                result.title = status.map(status_title).unwrap_or(SYSTEM_ERROR).to_string();
            }
        }
        Ok(result)
    }
}
