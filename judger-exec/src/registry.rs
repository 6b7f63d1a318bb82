use std::collections::{BTreeMap, HashSet};

use thiserror::Error;

use judger_dag::{LabelSource, ProcessorLabels};

use crate::{CommandProcessor, CommandSpec, Processor};

/// An error found while building a [`Registry`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Two processors have been registered with the same name.
    #[error("processor {0} registered twice")]
    DuplicateProcessor(String),
    /// The labels declared by a processor are not usable.
    #[error("processor {processor} has invalid labels: {reason}")]
    InvalidLabels {
        /// The name of the processor.
        processor: String,
        /// What is wrong with the labels.
        reason: String,
    },
}

/// A registered processor, with its labels cached.
struct Entry {
    labels: ProcessorLabels,
    processor: Box<dyn Processor>,
}

/// The closed table of the processors available to the graphs, indexed by name.
///
/// The table is built once, validated, and never changed afterwards.
///
/// ```
/// use judger_dag::{ProcessorLabels, ProcessorResult};
/// use judger_exec::{FnProcessor, Registry};
///
/// let mut builder = Registry::builder();
/// builder.register(
///     "echo",
///     FnProcessor::new(ProcessorLabels::new(["in"], ["out"]), |ctx| {
///         let content = ctx.input("in").to_vec();
///         ctx.set_output("out", content);
///         ProcessorResult::ok()
///     }),
/// );
/// let registry = builder.build().expect("Invalid registry");
/// assert!(registry.get("echo").is_some());
/// assert!(registry.get("cat").is_none());
/// ```
#[derive(Default)]
pub struct Registry {
    processors: BTreeMap<String, Entry>,
}

/// Collects the processors of a [`Registry`].
#[derive(Default)]
pub struct RegistryBuilder {
    processors: Vec<(String, Box<dyn Processor>)>,
}

impl Registry {
    /// Start building a new registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Build a registry of `CommandProcessor`s from their descriptions.
    pub fn from_commands(commands: BTreeMap<String, CommandSpec>) -> Result<Registry, RegistryError> {
        let mut builder = Registry::builder();
        for (name, spec) in commands {
            builder.register(name, CommandProcessor::new(spec));
        }
        builder.build()
    }

    /// The processor with that name.
    pub fn get(&self, name: &str) -> Option<&dyn Processor> {
        self.processors.get(name).map(|e| e.processor.as_ref())
    }

    /// The names of all the processors, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.processors.keys().map(String::as_str)
    }

    /// Number of registered processors.
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    /// Whether the registry has no processors.
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

impl LabelSource for Registry {
    fn labels(&self, processor: &str) -> Option<&ProcessorLabels> {
        self.processors.get(processor).map(|e| &e.labels)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.processors.iter().map(|(k, v)| (k, &v.labels)))
            .finish()
    }
}

impl RegistryBuilder {
    /// Add a processor with the provided name.
    pub fn register<S, P>(&mut self, name: S, processor: P) -> &mut Self
    where
        S: Into<String>,
        P: Processor + 'static,
    {
        self.processors.push((name.into(), Box::new(processor)));
        self
    }

    /// Validate all the processors and build the registry.
    pub fn build(self) -> Result<Registry, RegistryError> {
        let mut processors = BTreeMap::new();
        for (name, processor) in self.processors {
            if processors.contains_key(&name) {
                return Err(RegistryError::DuplicateProcessor(name));
            }
            let labels = processor.labels();
            check_labels(&name, &labels)?;
            debug!("Registered processor {}: {:?}", name, labels);
            processors.insert(name, Entry { labels, processor });
        }
        Ok(Registry { processors })
    }
}

/// Labels must be usable as file names inside a working directory and as cache decorators.
fn check_labels(name: &str, labels: &ProcessorLabels) -> Result<(), RegistryError> {
    let invalid = |reason: String| RegistryError::InvalidLabels {
        processor: name.to_string(),
        reason,
    };
    for list in [&labels.inputs, &labels.outputs] {
        let mut seen = HashSet::new();
        for label in list {
            if label.is_empty() || label == "." || label == ".." {
                return Err(invalid(format!("invalid label {label:?}")));
            }
            if label.contains(['/', '\\']) {
                return Err(invalid(format!("label {label:?} contains a path separator")));
            }
            if !seen.insert(label) {
                return Err(invalid(format!("duplicate label {label:?}")));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use judger_dag::ProcessorResult;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::FnProcessor;

    fn noop(inputs: &[&str], outputs: &[&str]) -> impl Processor {
        FnProcessor::new(
            ProcessorLabels::new(inputs.iter().copied(), outputs.iter().copied()),
            |_| ProcessorResult::ok(),
        )
    }

    #[test]
    fn test_labels_lookup() {
        let mut builder = Registry::builder();
        builder
            .register("b", noop(&["x"], &["y"]))
            .register("a", noop(&[], &["out"]));
        let registry = builder.build().unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(
            LabelSource::labels(&registry, "b"),
            Some(&ProcessorLabels::new(["x"], ["y"]))
        );
        assert!(LabelSource::labels(&registry, "c").is_none());
    }

    #[test]
    fn test_duplicate_processor() {
        let mut builder = Registry::builder();
        builder
            .register("a", noop(&[], &[]))
            .register("a", noop(&[], &[]));
        assert_eq!(
            builder.build().unwrap_err(),
            RegistryError::DuplicateProcessor("a".into())
        );
    }

    #[test]
    fn test_invalid_labels() {
        for (inputs, outputs) in [
            (vec!["x", "x"], vec![]),
            (vec![""], vec![]),
            (vec![], vec!["a/b"]),
            (vec![], vec![".."]),
        ] {
            let mut builder = Registry::builder();
            builder.register("p", noop(&inputs, &outputs));
            assert!(matches!(
                builder.build(),
                Err(RegistryError::InvalidLabels { .. })
            ));
        }
    }

    #[test]
    fn test_from_commands() {
        let commands: BTreeMap<String, CommandSpec> = serde_json::from_str(
            r#"{ "cat": { "inputs": ["in"], "outputs": ["out"], "command": "cat",
                          "stdin": "in", "stdout": "out" } }"#,
        )
        .unwrap();
        let registry = Registry::from_commands(commands).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(
            LabelSource::labels(&registry, "cat"),
            Some(&ProcessorLabels::new(["in"], ["out"]))
        );
    }
}
