//! The model of a judging pipeline.
//!
//! A pipeline is a DAG of nodes, each run by a processor identified by its name. The ports of a
//! node are the labels declared by its processor; every input port is bound either by an edge
//! from an output port of another node, or by an inbound binding from a field of a data group
//! (the submission, the static files of the problem, the current testcase or its subtask).
//!
//! Graphs are made with a [`GraphBuilder`], which validates them against the labels of the known
//! processors and produces an immutable [`Graph`].
//!
//! This crate also contains the plain values exchanged with the processors: their declared
//! [`ProcessorLabels`] and the [`ProcessorResult`] of an invocation.

#![deny(missing_docs)]

#[macro_use]
extern crate log;

mod builder;
mod error;
mod graph;
mod processor;
mod topo;

pub use builder::{Edge, GraphBuilder, InboundSpec, NodeSpec, Port};
pub use error::GraphError;
pub use graph::{DataGroup, Graph, GraphNode, Inbound};
pub use processor::{LabelSource, ProcessorLabels, ProcessorResult, ProcessorStatus};
pub use topo::topological_sort;
