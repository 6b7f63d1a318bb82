use std::collections::BTreeMap;

use anyhow::{anyhow, Error};
use bytes::Bytes;

use judger_cache::{CacheKey, CacheTier};
use judger_dag::{Graph, GraphNode, ProcessorLabels, ProcessorResult};

/// Where a node is in its lifecycle during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Waiting for its inputs.
    Pending,
    /// All the inputs are bound and the cache key is known.
    Hashed,
    /// The result has been taken from the cache.
    Cached(CacheTier),
    /// The processor has been run.
    Executed,
    /// The node has not been run because some of its inputs were missing.
    Skipped,
}

/// The instance of a node inside a single workflow run.
#[derive(Debug, Clone)]
pub struct RuntimeNode {
    /// The name of the node.
    pub name: String,
    /// The name of the processor of the node.
    pub processor: String,
    /// Whether the result may go to the persistent cache.
    pub cache: bool,
    /// The ports of the node.
    pub labels: ProcessorLabels,
    /// The bound inputs.
    pub inputs: BTreeMap<String, Bytes>,
    /// The produced outputs.
    pub outputs: BTreeMap<String, Bytes>,
    /// The cache key, known once all the inputs are bound.
    pub key: Option<CacheKey>,
    /// The result, once the node is completed.
    pub result: Option<ProcessorResult>,
    /// The state of the node.
    pub state: NodeState,
}

impl RuntimeNode {
    /// A fresh instance of a node of a graph.
    pub fn new(node: &GraphNode) -> RuntimeNode {
        RuntimeNode {
            name: node.name.clone(),
            processor: node.processor.clone(),
            cache: node.cache,
            labels: node.labels.clone(),
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
            key: None,
            result: None,
            state: NodeState::Pending,
        }
    }

    /// The content bound to an input.
    pub fn input(&self, label: &str) -> Option<&Bytes> {
        self.inputs.get(label)
    }

    /// The content of an output, `None` if the node has not produced it.
    pub fn output(&self, label: &str) -> Option<&Bytes> {
        self.outputs.get(label)
    }

    /// The result of the node, `None` if it has not been completed.
    pub fn result(&self) -> Option<&ProcessorResult> {
        self.result.as_ref()
    }

    /// Whether the node has been completed successfully.
    pub fn is_ok(&self) -> bool {
        self.result.as_ref().map(|r| r.is_ok()).unwrap_or(false)
    }

    /// Whether the node has completed, from the cache or by running.
    pub fn is_completed(&self) -> bool {
        matches!(self.state, NodeState::Cached(_) | NodeState::Executed)
    }

    /// The first input label, in declaration order, that is not bound yet.
    pub fn missing_input(&self) -> Option<&str> {
        self.labels
            .inputs
            .iter()
            .find(|l| !self.inputs.contains_key(l.as_str()))
            .map(String::as_str)
    }

    /// Bind an input. The graph guarantees that every input is bound at most once.
    pub fn bind_input<S: Into<String>>(&mut self, label: S, content: Bytes) {
        self.inputs.insert(label.into(), content);
    }

    /// The inputs in the order of the processor labels, for hashing.
    pub fn ordered_inputs(&self) -> impl Iterator<Item = &[u8]> {
        self.labels
            .inputs
            .iter()
            .map(|l| self.inputs.get(l).map(|b| b.as_ref()).unwrap_or_default())
    }
}

/// All the nodes of a completed run, handed to the analyzer.
#[derive(Debug)]
pub struct NodeSet<'a> {
    graph: &'a Graph,
    nodes: BTreeMap<String, RuntimeNode>,
}

impl<'a> NodeSet<'a> {
    /// Make a set with a fresh instance of every node of the graph.
    pub fn new(graph: &'a Graph) -> NodeSet<'a> {
        let nodes = graph
            .nodes()
            .iter()
            .map(|(name, node)| (name.clone(), RuntimeNode::new(node)))
            .collect();
        NodeSet { graph, nodes }
    }

    /// The graph these nodes come from.
    pub fn graph(&self) -> &'a Graph {
        self.graph
    }

    /// The node with that name.
    pub fn get(&self, name: &str) -> Option<&RuntimeNode> {
        self.nodes.get(name)
    }

    /// The node with that name, mutable.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut RuntimeNode> {
        self.nodes.get_mut(name)
    }

    /// The node with that name, failing if the graph does not have it.
    pub fn require(&self, name: &str) -> Result<&RuntimeNode, Error> {
        self.nodes
            .get(name)
            .ok_or_else(|| anyhow!("The graph has no node named {}", name))
    }

    /// All the nodes, in topological order.
    pub fn iter(&self) -> impl Iterator<Item = &RuntimeNode> {
        self.graph
            .order()
            .iter()
            .filter_map(move |name| self.nodes.get(name))
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether there are no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
