use thiserror::Error;

use crate::Port;

/// A structural problem of a graph, found while building or sorting it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// An inbound binding references a data group that does not exist.
    #[error("invalid data group name: {0:?}")]
    InvalidGroupName(String),
    /// An edge or an inbound binding references a node that does not exist.
    #[error("node {0:?} does not exist")]
    UnknownNode(String),
    /// A node uses a processor that is not known.
    #[error("node {node:?} uses the unknown processor {processor:?}")]
    UnknownProcessor {
        /// The name of the node.
        node: String,
        /// The name of the processor.
        processor: String,
    },
    /// The destination port is not an input of the processor of its node.
    #[error("{0} is not an input port")]
    InvalidInputLabel(Port),
    /// The source port is not an output of the processor of its node.
    #[error("{0} is not an output port")]
    InvalidOutputLabel(Port),
    /// An input port is bound more than once.
    #[error("{0} is bound more than once")]
    DuplicateDest(Port),
    /// An input port is never bound.
    #[error("{0} is never bound")]
    IncompleteNodeInput(Port),
    /// There is a cycle passing through this node.
    #[error("not a DAG: there is a cycle through {0:?}")]
    NotDag(String),
}
