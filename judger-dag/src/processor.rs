use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The input and output ports a processor declares. The order of the inputs is significant: it
/// is the order in which the inputs are hashed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorLabels {
    /// Names of the input ports.
    pub inputs: Vec<String>,
    /// Names of the output ports.
    pub outputs: Vec<String>,
}

impl ProcessorLabels {
    /// Make a new set of labels.
    pub fn new<I, O, S1, S2>(inputs: I, outputs: O) -> ProcessorLabels
    where
        I: IntoIterator<Item = S1>,
        O: IntoIterator<Item = S2>,
        S1: Into<String>,
        S2: Into<String>,
    {
        ProcessorLabels {
            inputs: inputs.into_iter().map(Into::into).collect(),
            outputs: outputs.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `label` is one of the input ports.
    pub fn has_input(&self, label: &str) -> bool {
        self.inputs.iter().any(|l| l == label)
    }

    /// Whether `label` is one of the output ports.
    pub fn has_output(&self, label: &str) -> bool {
        self.outputs.iter().any(|l| l == label)
    }
}

/// Something that knows the labels of the processors by their name, for example the registry of
/// the processors.
pub trait LabelSource {
    /// The labels of the processor with that name, `None` if the processor is unknown.
    fn labels(&self, processor: &str) -> Option<&ProcessorLabels>;
}

impl LabelSource for std::collections::HashMap<String, ProcessorLabels> {
    fn labels(&self, processor: &str) -> Option<&ProcessorLabels> {
        self.get(processor)
    }
}

impl LabelSource for std::collections::BTreeMap<String, ProcessorLabels> {
    fn labels(&self, processor: &str) -> Option<&ProcessorLabels> {
        self.get(processor)
    }
}

/// Status of a completed processor invocation. Apart from `Ok` the meaning of these is up to the
/// analyzers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessorStatus {
    /// The processor completed successfully.
    Ok,
    /// The program crashed.
    RuntimeError,
    /// The program used too much memory.
    MemoryExceed,
    /// The program used too much time.
    TimeExceed,
    /// The program wrote too much output.
    OutputExceed,
    /// The processor itself failed, the outcome of the program is unknown.
    SystemError,
    /// The program tried to use a forbidden system call.
    DangerousSyscall,
    /// The program exited with a non-zero exit code.
    ExitError,
}

/// The outcome of a processor invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorResult {
    /// The status of the invocation.
    pub status: ProcessorStatus,
    /// Wall clock time used, if measured.
    #[serde(default)]
    pub real_time: Option<Duration>,
    /// CPU time used, if measured.
    #[serde(default)]
    pub cpu_time: Option<Duration>,
    /// Peak memory in bytes, if measured.
    #[serde(default)]
    pub memory: Option<u64>,
    /// Free-form message from the processor.
    #[serde(default)]
    pub message: String,
}

impl ProcessorResult {
    /// A result with the provided status and message, and no resource usage.
    pub fn new<S: Into<String>>(status: ProcessorStatus, message: S) -> ProcessorResult {
        ProcessorResult {
            status,
            real_time: None,
            cpu_time: None,
            memory: None,
            message: message.into(),
        }
    }

    /// A successful result.
    pub fn ok() -> ProcessorResult {
        ProcessorResult::new(ProcessorStatus::Ok, "")
    }

    /// A failure of the processor itself.
    pub fn system_error<S: Into<String>>(message: S) -> ProcessorResult {
        ProcessorResult::new(ProcessorStatus::SystemError, message)
    }

    /// Whether the status is `Ok`.
    pub fn is_ok(&self) -> bool {
        self.status == ProcessorStatus::Ok
    }
}
