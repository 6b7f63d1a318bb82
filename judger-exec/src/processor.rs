use std::collections::BTreeMap;
use std::path::Path;

use bytes::Bytes;

use judger_dag::{ProcessorLabels, ProcessorResult};

/// What a processor sees of the node it is running: a private working directory, the inputs and
/// a sink for the outputs.
///
/// The working directory is empty and exclusive to this invocation, and it is removed after the
/// invocation. Processors must not depend on the current directory of the process.
#[derive(Debug)]
pub struct ProcessContext<'a> {
    work_dir: &'a Path,
    inputs: &'a BTreeMap<String, Bytes>,
    outputs: BTreeMap<String, Bytes>,
}

impl<'a> ProcessContext<'a> {
    /// Make a new context for an invocation.
    pub fn new(work_dir: &'a Path, inputs: &'a BTreeMap<String, Bytes>) -> ProcessContext<'a> {
        ProcessContext {
            work_dir,
            inputs,
            outputs: BTreeMap::new(),
        }
    }

    /// The working directory of this invocation.
    pub fn work_dir(&self) -> &Path {
        self.work_dir
    }

    /// The content of an input, empty if the input is not present.
    pub fn input(&self, label: &str) -> &[u8] {
        self.inputs.get(label).map(|b| b.as_ref()).unwrap_or_default()
    }

    /// All the inputs, by label.
    pub fn inputs(&self) -> &BTreeMap<String, Bytes> {
        self.inputs
    }

    /// Set the content of an output, replacing the previous one.
    pub fn set_output<S: Into<String>, B: Into<Bytes>>(&mut self, label: S, content: B) {
        self.outputs.insert(label.into(), content.into());
    }

    /// The outputs written so far.
    pub fn into_outputs(self) -> BTreeMap<String, Bytes> {
        self.outputs
    }
}

/// A capability that runs a node: given the inputs it produces the outputs and a result.
///
/// The same inputs must always produce the same outputs if the processor is used by cached
/// nodes. A failure of the program being judged is reported in the result, not as a panic.
pub trait Processor: Send + Sync {
    /// The ports of this processor.
    fn labels(&self) -> ProcessorLabels;

    /// Run the processor. The outputs are written in `ctx`; declared outputs that are not written
    /// are considered empty.
    fn process(&self, ctx: &mut ProcessContext<'_>) -> ProcessorResult;
}

/// A processor implemented by a function.
///
/// ```
/// use judger_dag::{ProcessorLabels, ProcessorResult};
/// use judger_exec::{FnProcessor, Processor};
///
/// let upper = FnProcessor::new(ProcessorLabels::new(["in"], ["out"]), |ctx| {
///     let content = ctx.input("in").to_ascii_uppercase();
///     ctx.set_output("out", content);
///     ProcessorResult::ok()
/// });
/// assert_eq!(upper.labels().outputs, vec!["out"]);
/// ```
pub struct FnProcessor<F> {
    labels: ProcessorLabels,
    func: F,
}

impl<F> FnProcessor<F>
where
    F: Fn(&mut ProcessContext<'_>) -> ProcessorResult + Send + Sync,
{
    /// Make a processor with these labels that calls `func` when run.
    pub fn new(labels: ProcessorLabels, func: F) -> FnProcessor<F> {
        FnProcessor { labels, func }
    }
}

impl<F> Processor for FnProcessor<F>
where
    F: Fn(&mut ProcessContext<'_>) -> ProcessorResult + Send + Sync,
{
    fn labels(&self) -> ProcessorLabels {
        self.labels.clone()
    }

    fn process(&self, ctx: &mut ProcessContext<'_>) -> ProcessorResult {
        (self.func)(ctx)
    }
}

impl<F> std::fmt::Debug for FnProcessor<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnProcessor")
            .field("labels", &self.labels)
            .finish()
    }
}
