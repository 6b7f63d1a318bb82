use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Error};
use serde::{Deserialize, Serialize};

use crate::{Edge, GraphBuilder, GraphError, LabelSource, Port, ProcessorLabels};

/// A named source of input data, supplied at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataGroup {
    /// The files of the submission being judged.
    Submission,
    /// The files of the problem shared by all the testcases.
    Static,
    /// The files of the current testcase.
    Tests,
    /// The files of the subtask of the current testcase.
    Subtask,
}

impl DataGroup {
    /// All the data groups.
    pub const ALL: [DataGroup; 4] = [
        DataGroup::Submission,
        DataGroup::Static,
        DataGroup::Tests,
        DataGroup::Subtask,
    ];

    /// The name of the group, as used in the serialized graphs.
    pub fn name(&self) -> &'static str {
        match self {
            DataGroup::Submission => "submission",
            DataGroup::Static => "static",
            DataGroup::Tests => "tests",
            DataGroup::Subtask => "subtask",
        }
    }
}

impl FromStr for DataGroup {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataGroup::ALL
            .into_iter()
            .find(|g| g.name() == s)
            .ok_or_else(|| GraphError::InvalidGroupName(s.to_string()))
    }
}

impl std::fmt::Display for DataGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A binding from a field of a data group to an input port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    /// The group the data comes from.
    pub group: DataGroup,
    /// The name of the field inside the group.
    pub field: String,
    /// The port that receives the data.
    pub to: Port,
}

/// A node of a validated graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    /// The name of the node.
    pub name: String,
    /// The name of the processor that runs this node.
    pub processor: String,
    /// Whether the result of this node may be stored in the persistent cache.
    pub cache: bool,
    /// The ports of the node, copied from its processor.
    pub labels: ProcessorLabels,
}

/// A validated, immutable judging pipeline.
///
/// Every input port of every node is bound exactly once, every port exists and the edges form a
/// DAG. A graph holds no per-run state, so it can be shared between concurrent runs.
#[derive(Debug, Clone)]
pub struct Graph {
    pub(crate) nodes: BTreeMap<String, GraphNode>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) inbounds: Vec<Inbound>,
    pub(crate) order: Vec<String>,
}

impl Graph {
    /// Load a graph from a JSON file containing a serialized `GraphBuilder`.
    pub fn load<P: AsRef<Path>, L: LabelSource + ?Sized>(
        path: P,
        labels: &L,
    ) -> Result<Graph, Error> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open graph file {}", path.display()))?;
        let builder: GraphBuilder = serde_json::from_reader(std::io::BufReader::new(file))
            .with_context(|| format!("Failed to parse graph file {}", path.display()))?;
        builder
            .build(labels)
            .with_context(|| format!("Invalid graph in {}", path.display()))
    }

    /// All the nodes, indexed by name.
    pub fn nodes(&self) -> &BTreeMap<String, GraphNode> {
        &self.nodes
    }

    /// The node with that name.
    pub fn node(&self, name: &str) -> Option<&GraphNode> {
        self.nodes.get(name)
    }

    /// All the edges, in insertion order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// The edges leaving the node with that name.
    pub fn edges_from<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.from.node == node)
    }

    /// All the inbound bindings, in insertion order.
    pub fn inbounds(&self) -> &[Inbound] {
        &self.inbounds
    }

    /// The inbound bindings reading from a data group.
    pub fn inbounds_of(&self, group: DataGroup) -> impl Iterator<Item = &Inbound> + '_ {
        self.inbounds.iter().filter(move |i| i.group == group)
    }

    /// The names of the nodes in a deterministic topological order.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// A builder that builds again this graph, useful for serializing it.
    pub fn to_builder(&self) -> GraphBuilder {
        let mut builder = GraphBuilder::new();
        for node in self.nodes.values() {
            builder.add_node(&node.name, &node.processor, node.cache);
        }
        for edge in &self.edges {
            builder.add_edge(&edge.from.node, &edge.from.label, &edge.to.node, &edge.to.label);
        }
        for inbound in &self.inbounds {
            builder.add_inbound(
                inbound.group.name(),
                &inbound.field,
                &inbound.to.node,
                &inbound.to.label,
            );
        }
        builder
    }
}
