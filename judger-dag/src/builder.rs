use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
    topological_sort, DataGroup, Graph, GraphError, GraphNode, Inbound, LabelSource,
};

/// A port of a node: the node name and the label of one of its inputs or outputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Port {
    /// The name of the node.
    pub node: String,
    /// The label of the port.
    pub label: String,
}

impl Port {
    /// Make a new port.
    pub fn new<S1: Into<String>, S2: Into<String>>(node: S1, label: S2) -> Port {
        Port {
            node: node.into(),
            label: label.into(),
        }
    }
}

impl std::fmt::Display for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.node, self.label)
    }
}

/// A connection from an output port to an input port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// The output port the data comes from.
    pub from: Port,
    /// The input port that receives the data.
    pub to: Port,
}

/// A node of a graph not yet validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// The name of the processor that runs this node.
    pub processor: String,
    /// Whether the result of this node may be stored in the persistent cache.
    #[serde(default)]
    pub cache: bool,
}

/// An inbound binding not yet validated: the group is just a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundSpec {
    /// The name of the data group.
    pub group: String,
    /// The name of the field inside the group.
    pub field: String,
    /// The port that receives the data.
    pub to: Port,
}

/// Builder of a `Graph`. All the checks are deferred to `build`, so the builder can be filled in
/// any order, or deserialized from a file.
///
/// ```
/// use std::collections::HashMap;
/// use judger_dag::{GraphBuilder, ProcessorLabels};
///
/// let mut labels = HashMap::new();
/// labels.insert("cat".to_string(), ProcessorLabels::new(["in"], ["out"]));
///
/// let mut builder = GraphBuilder::new();
/// builder
///     .add_node("first", "cat", true)
///     .add_node("second", "cat", false)
///     .add_inbound("tests", "input", "first", "in")
///     .add_edge("first", "out", "second", "in");
/// let graph = builder.build(&labels).unwrap();
/// assert_eq!(graph.order(), &["first".to_string(), "second".to_string()]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphBuilder {
    /// The nodes, indexed by name.
    #[serde(default)]
    pub nodes: BTreeMap<String, NodeSpec>,
    /// The edges between the nodes.
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// The bindings from the data groups.
    #[serde(default)]
    pub inbounds: Vec<InboundSpec>,
}

impl GraphBuilder {
    /// Make a new, empty, builder.
    pub fn new() -> GraphBuilder {
        GraphBuilder::default()
    }

    /// Add a node. A node with the same name is replaced.
    pub fn add_node<S1, S2>(&mut self, name: S1, processor: S2, cache: bool) -> &mut Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        self.nodes.insert(
            name.into(),
            NodeSpec {
                processor: processor.into(),
                cache,
            },
        );
        self
    }

    /// Connect an output port of a node to an input port of another.
    pub fn add_edge<S1, S2, S3, S4>(
        &mut self,
        from: S1,
        from_label: S2,
        to: S3,
        to_label: S4,
    ) -> &mut Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
        S4: Into<String>,
    {
        self.edges.push(Edge {
            from: Port::new(from, from_label),
            to: Port::new(to, to_label),
        });
        self
    }

    /// Bind a field of a data group to an input port of a node.
    pub fn add_inbound<S1, S2, S3, S4>(
        &mut self,
        group: S1,
        field: S2,
        to: S3,
        to_label: S4,
    ) -> &mut Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
        S4: Into<String>,
    {
        self.inbounds.push(InboundSpec {
            group: group.into(),
            field: field.into(),
            to: Port::new(to, to_label),
        });
        self
    }

    /// Validate the graph and build it, resolving the ports of the nodes using `labels`.
    pub fn build<L: LabelSource + ?Sized>(&self, labels: &L) -> Result<Graph, GraphError> {
        let mut nodes = BTreeMap::new();
        for (name, spec) in &self.nodes {
            let node_labels =
                labels
                    .labels(&spec.processor)
                    .ok_or_else(|| GraphError::UnknownProcessor {
                        node: name.clone(),
                        processor: spec.processor.clone(),
                    })?;
            nodes.insert(
                name.clone(),
                GraphNode {
                    name: name.clone(),
                    processor: spec.processor.clone(),
                    cache: spec.cache,
                    labels: node_labels.clone(),
                },
            );
        }

        let mut bound = HashSet::new();
        for edge in &self.edges {
            let from = nodes
                .get(&edge.from.node)
                .ok_or_else(|| GraphError::UnknownNode(edge.from.node.clone()))?;
            if !from.labels.has_output(&edge.from.label) {
                return Err(GraphError::InvalidOutputLabel(edge.from.clone()));
            }
            bind(&nodes, &mut bound, &edge.to)?;
        }

        let mut inbounds = Vec::with_capacity(self.inbounds.len());
        for inbound in &self.inbounds {
            let group: DataGroup = inbound.group.parse()?;
            bind(&nodes, &mut bound, &inbound.to)?;
            inbounds.push(Inbound {
                group,
                field: inbound.field.clone(),
                to: inbound.to.clone(),
            });
        }

        for node in nodes.values() {
            for input in &node.labels.inputs {
                let port = Port::new(&node.name, input);
                if !bound.contains(&port) {
                    return Err(GraphError::IncompleteNodeInput(port));
                }
            }
        }

        let names: Vec<&str> = nodes.keys().map(String::as_str).collect();
        let deps: Vec<(&str, &str)> = self
            .edges
            .iter()
            .map(|e| (e.from.node.as_str(), e.to.node.as_str()))
            .collect();
        let order: Vec<String> = topological_sort(&names, &deps)?
            .into_iter()
            .map(String::from)
            .collect();
        debug!("Built graph with order {:?}", order);

        Ok(Graph {
            nodes,
            edges: self.edges.clone(),
            inbounds,
            order,
        })
    }
}

/// Mark an input port as bound, checking it exists and it was not bound before.
fn bind(
    nodes: &BTreeMap<String, GraphNode>,
    bound: &mut HashSet<Port>,
    to: &Port,
) -> Result<(), GraphError> {
    let node = nodes
        .get(&to.node)
        .ok_or_else(|| GraphError::UnknownNode(to.node.clone()))?;
    if !node.labels.has_input(&to.label) {
        return Err(GraphError::InvalidInputLabel(to.clone()));
    }
    if !bound.insert(to.clone()) {
        return Err(GraphError::DuplicateDest(to.clone()));
    }
    Ok(())
}
