use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, Context, Error};
use bytes::Bytes;
use thiserror::Error;

use judger_cache::{CacheEntry, CacheKey, CacheResult, TieredCache};
use judger_dag::{Graph, Port, ProcessorResult};

use crate::{Analyzer, InboundData, NodeSet, NodeState, ProcessContext, Registry, RuntimeNode};
use crate::WorkflowResult;

/// Options of a single workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Whether the caches are looked up and filled.
    pub use_cache: bool,
    /// Skip the nodes with missing inputs instead of failing the run.
    pub dismiss_incomplete: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            use_cache: true,
            dismiss_incomplete: false,
        }
    }
}

/// A structural failure of a workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// An input of a node has not been bound when the node had to run.
    #[error("input {0} is not bound")]
    IncompleteInput(Port),
    /// A node uses a processor that is not in the registry.
    #[error("processor {0} is not registered")]
    UnknownProcessor(String),
}

/// Runs the graphs, one at a time or concurrently from many threads.
///
/// Every run uses its own temporary directory inside `work_dir`, and every node executed by the
/// run gets its own subdirectory. The directory is removed at the end of the run, also when the
/// run fails.
#[derive(Debug, Clone, Copy)]
pub struct Executor<'a> {
    registry: &'a Registry,
    work_dir: &'a Path,
}

impl<'a> Executor<'a> {
    /// Make an executor that runs the processors of `registry` inside `work_dir`.
    pub fn new(registry: &'a Registry, work_dir: &'a Path) -> Executor<'a> {
        Executor { registry, work_dir }
    }

    /// Run the graph and analyze the result. The files of the result are sorted by title.
    pub fn run(
        &self,
        graph: &Graph,
        inbound: &InboundData,
        analyzer: &dyn Analyzer,
        cache: &mut TieredCache<'_>,
        full_score: f64,
        options: RunOptions,
    ) -> Result<WorkflowResult, Error> {
        let nodes = self.execute(graph, inbound, cache, options)?;
        let mut result = analyzer
            .analyze(&nodes, full_score)
            .context("Failed to analyze the workflow")?;
        result.files.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(result)
    }

    /// Run all the nodes of the graph, returning them without analyzing them.
    pub fn execute<'g>(
        &self,
        graph: &'g Graph,
        inbound: &InboundData,
        cache: &mut TieredCache<'_>,
        options: RunOptions,
    ) -> Result<NodeSet<'g>, Error> {
        std::fs::create_dir_all(self.work_dir).with_context(|| {
            format!("Failed to create work directory {}", self.work_dir.display())
        })?;
        let run_dir = tempfile::Builder::new()
            .prefix("workflow")
            .tempdir_in(self.work_dir)
            .context("Failed to create the run directory")?;
        trace!("Running workflow in {}", run_dir.path().display());
        let nodes = self.execute_in(graph, inbound, cache, options, run_dir.path());
        if let Err(e) = run_dir.close() {
            warn!("Failed to remove the run directory: {:?}", e);
        }
        nodes
    }

    fn execute_in<'g>(
        &self,
        graph: &'g Graph,
        inbound: &InboundData,
        cache: &mut TieredCache<'_>,
        options: RunOptions,
        run_dir: &Path,
    ) -> Result<NodeSet<'g>, Error> {
        let mut nodes = NodeSet::new(graph);
        bind_inbounds(graph, inbound, &mut nodes)?;

        for name in graph.order() {
            let node = nodes
                .get_mut(name)
                .ok_or_else(|| anyhow!("Node {} is not in the graph", name))?;
            if let Some(label) = node.missing_input() {
                let port = Port::new(name.as_str(), label);
                if options.dismiss_incomplete {
                    debug!("Skipping node {}: {} is not bound", name, port);
                    node.state = NodeState::Skipped;
                    continue;
                }
                return Err(WorkflowError::IncompleteInput(port).into());
            }
            let key = CacheKey::from_inputs(&node.processor, node.ordered_inputs());
            node.key = Some(key);
            node.state = NodeState::Hashed;

            let cached = if options.use_cache {
                cache.get(&key)
            } else {
                CacheResult::Miss
            };
            match cached {
                CacheResult::Hit { entry, tier } => {
                    debug!("Node {} is a cache hit ({:?})", name, tier);
                    node.result = Some(entry.result);
                    node.outputs = entry.outputs;
                    node.state = NodeState::Cached(tier);
                }
                CacheResult::Miss => {
                    let (result, outputs) = self.process(node, run_dir)?;
                    let entry = CacheEntry { result, outputs };
                    if options.use_cache {
                        cache.insert(&key, &entry, node.cache);
                    }
                    node.result = Some(entry.result);
                    node.outputs = entry.outputs;
                    node.state = NodeState::Executed;
                }
            }

            let outputs = node.outputs.clone();
            for edge in graph.edges_from(name) {
                let content = outputs.get(&edge.from.label).cloned().unwrap_or_default();
                nodes
                    .get_mut(&edge.to.node)
                    .ok_or_else(|| anyhow!("Node {} is not in the graph", edge.to.node))?
                    .bind_input(edge.to.label.as_str(), content);
            }
        }
        Ok(nodes)
    }

    /// Run the processor of a node inside a fresh directory.
    fn process(
        &self,
        node: &RuntimeNode,
        run_dir: &Path,
    ) -> Result<(ProcessorResult, BTreeMap<String, Bytes>), Error> {
        let processor = self
            .registry
            .get(&node.processor)
            .ok_or_else(|| WorkflowError::UnknownProcessor(node.processor.clone()))?;
        let node_dir = tempfile::Builder::new()
            .prefix("node")
            .tempdir_in(run_dir)
            .with_context(|| format!("Failed to create the directory of node {}", node.name))?;

        info!("Running node {} with {}", node.name, node.processor);
        let mut ctx = ProcessContext::new(node_dir.path(), &node.inputs);
        let result = processor.process(&mut ctx);
        debug!("Node {} completed: {:?}", node.name, result);

        let mut produced = ctx.into_outputs();
        for label in produced.keys() {
            if !node.labels.has_output(label) {
                warn!("Node {} produced the undeclared output {}", node.name, label);
            }
        }
        let outputs = node
            .labels
            .outputs
            .iter()
            .map(|label| {
                let content = produced.remove(label).unwrap_or_default();
                (label.clone(), content)
            })
            .collect();

        if let Err(e) = node_dir.close() {
            warn!("Failed to remove the directory of node {}: {:?}", node.name, e);
        }
        Ok((result, outputs))
    }
}

/// Bind the data groups to the inputs of the nodes. Missing groups and fields are left unbound.
fn bind_inbounds(graph: &Graph, inbound: &InboundData, nodes: &mut NodeSet<'_>) -> Result<(), Error> {
    for binding in graph.inbounds() {
        let Some(provider) = inbound.get(binding.group) else {
            warn!("Data group {} is missing", binding.group);
            continue;
        };
        let content = provider
            .get(&binding.field)
            .with_context(|| format!("Failed to read {}.{}", binding.group, binding.field))?;
        let Some(content) = content else {
            warn!("Field {} is missing in group {}", binding.field, binding.group);
            continue;
        };
        nodes
            .get_mut(&binding.to.node)
            .ok_or_else(|| anyhow!("Node {} is not in the graph", binding.to.node))?
            .bind_input(binding.to.label.as_str(), content);
    }
    Ok(())
}
