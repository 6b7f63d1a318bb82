//! Crate for running the judging graphs.
//!
//! The nodes of a [`Graph`](judger_dag::Graph) are run by [`Processor`]s, looked up by name in a
//! closed [`Registry`]. The [`Executor`] binds the data groups to the inputs of the nodes, runs
//! the nodes in topological order looking them up in the cache first, and finally hands the
//! completed nodes to an [`Analyzer`], which turns them into a [`WorkflowResult`].
//!
//! The processors never use the current directory of the process: each invocation gets its own
//! working directory, so many graphs can run at the same time.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use judger_cache::{MemoryCache, TieredCache};
//! use judger_dag::{DataGroup, GraphBuilder, ProcessorLabels, ProcessorResult};
//! use judger_exec::analyzers::CustomTest;
//! use judger_exec::*;
//!
//! let mut registry = Registry::builder();
//! registry.register(
//!     "compiler:auto",
//!     FnProcessor::new(ProcessorLabels::new(["source", "option"], ["result", "log"]), |ctx| {
//!         ctx.set_output("result", ctx.input("source").to_vec());
//!         ProcessorResult::ok()
//!     }),
//! );
//! registry.register(
//!     "runner:auto",
//!     FnProcessor::new(
//!         ProcessorLabels::new(["executable", "stdin", "conf"], ["stdout", "stderr"]),
//!         |ctx| {
//!             ctx.set_output("stdout", ctx.input("stdin").to_ascii_uppercase());
//!             ProcessorResult::ok()
//!         },
//!     ),
//! );
//! let registry = registry.build().unwrap();
//! let graph = presets::custom_test(&registry).unwrap();
//!
//! let inbound = InboundData::new()
//!     .with(
//!         DataGroup::Submission,
//!         Arc::new(MemoryData::new().with("source", "upper").with("option", "").with("input", "hi")),
//!     )
//!     .with(DataGroup::Static, Arc::new(MemoryData::new().with("runner_config", "")));
//!
//! # let tmp = tempfile::TempDir::new().unwrap();
//! let executor = Executor::new(&registry, tmp.path());
//! let mut memory = MemoryCache::new();
//! let mut cache = TieredCache::new(&mut memory, None, true);
//! let result = executor
//!     .run(&graph, &inbound, &CustomTest, &mut cache, 100.0, RunOptions::default())
//!     .unwrap();
//! assert_eq!(result.title, "Accepted");
//! assert_eq!(result.files[2].content, "HI");
//! ```

#![deny(missing_docs)]

#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;

mod analyzer;
pub mod analyzers;
mod command;
mod data;
mod executor;
pub mod presets;
mod processor;
mod registry;
mod runtime;

pub use analyzer::{
    show, status_title, Analyzer, ResultFile, WorkflowResult, ACCEPTED, COMPILE_ERROR,
    SHOW_LIMIT, SKIPPED, SYSTEM_ERROR, WRONG_ANSWER,
};
pub use command::{CommandProcessor, CommandSpec};
pub use data::{DataProvider, DirData, InboundData, MemoryData};
pub use executor::{Executor, RunOptions, WorkflowError};
pub use processor::{FnProcessor, ProcessContext, Processor};
pub use registry::{Registry, RegistryBuilder, RegistryError};
pub use runtime::{NodeSet, NodeState, RuntimeNode};
