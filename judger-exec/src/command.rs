use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Error};
use serde::{Deserialize, Serialize};

use judger_dag::{ProcessorLabels, ProcessorResult, ProcessorStatus};

use crate::{ProcessContext, Processor};

/// How often a running command is polled for its termination.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// The description of a `CommandProcessor`.
///
/// The inputs are written inside the working directory in files named after their labels, the
/// outputs are read back from the files named after their labels, unless they are mapped to the
/// standard output or error of the command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// The labels of the inputs.
    pub inputs: Vec<String>,
    /// The labels of the outputs.
    pub outputs: Vec<String>,
    /// The command line, split like a shell would. Relative paths are relative to the working
    /// directory of the invocation.
    pub command: String,
    /// The inputs that have to be executable.
    #[serde(default)]
    pub executables: Vec<String>,
    /// The input to send to the standard input of the command.
    #[serde(default)]
    pub stdin: Option<String>,
    /// The output that receives the standard output of the command.
    #[serde(default)]
    pub stdout: Option<String>,
    /// The output that receives the standard error of the command.
    #[serde(default)]
    pub stderr: Option<String>,
    /// Kill the command after this number of seconds.
    #[serde(default)]
    pub wall_time_limit: Option<f64>,
}

/// A processor that spawns a command, without any sandboxing.
///
/// The commands are trusted: this is meant for compilers, checkers and testing, not for running
/// the programs of the contestants.
#[derive(Debug, Clone)]
pub struct CommandProcessor {
    spec: CommandSpec,
}

/// How the command terminated.
enum Termination {
    Exited(ExitStatus),
    Killed,
}

impl CommandProcessor {
    /// Make a new processor from its description.
    pub fn new(spec: CommandSpec) -> CommandProcessor {
        CommandProcessor { spec }
    }

    /// The description of this processor.
    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    /// Write all the inputs inside the working directory.
    fn setup(&self, ctx: &ProcessContext<'_>) -> Result<(), Error> {
        for label in &self.spec.inputs {
            let dest = ctx.work_dir().join(label);
            std::fs::write(&dest, ctx.input(label))
                .with_context(|| format!("Failed to write {}", dest.display()))?;
            let executable = self.spec.executables.contains(label);
            set_permissions(&dest, executable)?;
        }
        Ok(())
    }

    /// The program to spawn and its arguments.
    fn command_line(&self, work_dir: &Path) -> Result<(PathBuf, Vec<String>), Error> {
        let mut args = shell_words::split(&self.spec.command)
            .with_context(|| format!("Invalid command line: {}", self.spec.command))?;
        if args.is_empty() {
            bail!("Empty command line");
        }
        let program = PathBuf::from(args.remove(0));
        // a bare name is searched in $PATH, a relative path is inside the working directory
        let program = if program.is_relative() && program.components().count() > 1 {
            work_dir.join(program)
        } else {
            program
        };
        Ok((program, args))
    }

    /// Spawn the command and wait for it, returning the termination and the captured streams.
    fn execute(
        &self,
        ctx: &ProcessContext<'_>,
    ) -> Result<(Termination, Duration, Vec<u8>, Vec<u8>), Error> {
        let (program, args) = self.command_line(ctx.work_dir())?;
        let mut command = Command::new(&program);
        command
            .args(&args)
            .current_dir(ctx.work_dir())
            .stdin(if self.spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(piped_if(self.spec.stdout.is_some()))
            .stderr(piped_if(self.spec.stderr.is_some()));

        let start = Instant::now();
        let mut child = command
            .spawn()
            .with_context(|| format!("Failed to spawn {}", program.display()))?;

        let stdin_writer = match (child.stdin.take(), &self.spec.stdin) {
            (Some(mut pipe), Some(label)) => {
                let content = ctx.input(label).to_vec();
                Some(std::thread::spawn(move || {
                    // the command may exit without reading everything
                    let _ = pipe.write_all(&content);
                }))
            }
            _ => None,
        };
        let stdout_reader = child.stdout.take().map(spawn_reader);
        let stderr_reader = child.stderr.take().map(spawn_reader);

        let termination = self.wait(&mut child, start)?;
        let elapsed = start.elapsed();

        if let Some(writer) = stdin_writer {
            let _ = writer.join();
        }
        let stdout = join_reader(stdout_reader)?;
        let stderr = join_reader(stderr_reader)?;
        Ok((termination, elapsed, stdout, stderr))
    }

    /// Wait for the command, killing it when the time limit is exceeded.
    fn wait(&self, child: &mut Child, start: Instant) -> Result<Termination, Error> {
        let Some(limit) = self.spec.wall_time_limit else {
            return Ok(Termination::Exited(
                child.wait().context("Failed to wait the command")?,
            ));
        };
        let limit = Duration::from_secs_f64(limit.max(0.0));
        loop {
            if let Some(status) = child.try_wait().context("Failed to wait the command")? {
                return Ok(Termination::Exited(status));
            }
            if start.elapsed() >= limit {
                debug!("Killing command after {:?}", start.elapsed());
                child.kill().context("Failed to kill the command")?;
                child.wait().context("Failed to wait the command")?;
                return Ok(Termination::Killed);
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// Collect the declared outputs.
    fn collect(
        &self,
        ctx: &mut ProcessContext<'_>,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
    ) -> Result<(), Error> {
        let mut stdout = Some(stdout);
        let mut stderr = Some(stderr);
        for label in &self.spec.outputs {
            let content = if self.spec.stdout.as_ref() == Some(label) {
                stdout.take().unwrap_or_default()
            } else if self.spec.stderr.as_ref() == Some(label) {
                stderr.take().unwrap_or_default()
            } else {
                let path = ctx.work_dir().join(label);
                if path.exists() {
                    std::fs::read(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?
                } else {
                    trace!("Output {} was not created", path.display());
                    Vec::new()
                }
            };
            ctx.set_output(label.as_str(), content);
        }
        Ok(())
    }

    fn run(&self, ctx: &mut ProcessContext<'_>) -> Result<ProcessorResult, Error> {
        self.setup(ctx).context("Failed to setup the working directory")?;
        let (termination, elapsed, stdout, stderr) = self.execute(ctx)?;
        self.collect(ctx, stdout, stderr)?;
        let mut result = match termination {
            Termination::Killed => {
                ProcessorResult::new(ProcessorStatus::TimeExceed, "Wall time limit exceeded")
            }
            Termination::Exited(status) if status.success() => ProcessorResult::ok(),
            Termination::Exited(status) => match status.code() {
                Some(code) => {
                    ProcessorResult::new(ProcessorStatus::ExitError, format!("Exited with {code}"))
                }
                None => ProcessorResult::new(ProcessorStatus::RuntimeError, status.to_string()),
            },
        };
        result.real_time = Some(elapsed);
        Ok(result)
    }
}

impl Processor for CommandProcessor {
    fn labels(&self) -> ProcessorLabels {
        ProcessorLabels::new(&self.spec.inputs, &self.spec.outputs)
    }

    fn process(&self, ctx: &mut ProcessContext<'_>) -> ProcessorResult {
        match self.run(ctx) {
            Ok(result) => result,
            Err(e) => {
                warn!("Command {:?} failed: {:?}", self.spec.command, e);
                ProcessorResult::system_error(format!("{e:#}"))
            }
        }
    }
}

fn piped_if(cond: bool) -> Stdio {
    if cond {
        Stdio::piped()
    } else {
        Stdio::null()
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<std::io::Result<Vec<u8>>> {
    std::thread::spawn(move || {
        let mut content = Vec::new();
        pipe.read_to_end(&mut content)?;
        Ok(content)
    })
}

fn join_reader(
    reader: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
) -> Result<Vec<u8>, Error> {
    match reader {
        None => Ok(Vec::new()),
        Some(reader) => match reader.join() {
            Ok(content) => content.context("Failed to read the output of the command"),
            Err(_) => bail!("The output reader panicked"),
        },
    }
}

#[cfg(unix)]
fn set_permissions(path: &Path, executable: bool) -> Result<(), Error> {
    use std::os::unix::fs::PermissionsExt;
    let mode = if executable { 0o500 } else { 0o400 };
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .with_context(|| format!("Failed to set permissions of {}", path.display()))
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path, _executable: bool) -> Result<(), Error> {
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use std::collections::BTreeMap;

    use bytes::Bytes;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn spec(command: &str) -> CommandSpec {
        CommandSpec {
            inputs: vec!["input".into()],
            outputs: vec!["stdout".into(), "stderr".into()],
            command: command.into(),
            executables: vec![],
            stdin: Some("input".into()),
            stdout: Some("stdout".into()),
            stderr: Some("stderr".into()),
            wall_time_limit: None,
        }
    }

    fn run(processor: &CommandProcessor, input: &str) -> (ProcessorResult, BTreeMap<String, Bytes>) {
        let tmp = TempDir::new().unwrap();
        let mut inputs = BTreeMap::new();
        inputs.insert("input".to_string(), Bytes::from(input.to_string()));
        let mut ctx = ProcessContext::new(tmp.path(), &inputs);
        let result = processor.process(&mut ctx);
        (result, ctx.into_outputs())
    }

    #[test]
    fn test_stdin_to_stdout() {
        let processor = CommandProcessor::new(spec("cat"));
        let (result, outputs) = run(&processor, "hello\n");
        assert_eq!(result.status, ProcessorStatus::Ok);
        assert!(result.real_time.is_some());
        assert_eq!(outputs["stdout"], Bytes::from("hello\n"));
        assert_eq!(outputs["stderr"], Bytes::new());
    }

    #[test]
    fn test_exit_code() {
        let processor = CommandProcessor::new(spec("sh -c 'echo oops >&2; exit 3'"));
        let (result, outputs) = run(&processor, "");
        assert_eq!(result.status, ProcessorStatus::ExitError);
        assert_eq!(result.message, "Exited with 3");
        assert_eq!(outputs["stderr"], Bytes::from("oops\n"));
    }

    #[test]
    fn test_files_in_work_dir() {
        let mut spec = spec("sh -c 'cp input copy'");
        spec.outputs = vec!["copy".into()];
        spec.stdin = None;
        spec.stdout = None;
        spec.stderr = None;
        let processor = CommandProcessor::new(spec);
        assert_eq!(processor.labels(), ProcessorLabels::new(["input"], ["copy"]));
        let (result, outputs) = run(&processor, "data");
        assert_eq!(result.status, ProcessorStatus::Ok);
        assert_eq!(outputs["copy"], Bytes::from("data"));
    }

    #[test]
    fn test_time_limit() {
        let mut spec = spec("sleep 10");
        spec.wall_time_limit = Some(0.1);
        let processor = CommandProcessor::new(spec);
        let (result, _) = run(&processor, "");
        assert_eq!(result.status, ProcessorStatus::TimeExceed);
    }

    #[test]
    fn test_missing_program() {
        let processor = CommandProcessor::new(spec("./does-not-exist"));
        let (result, _) = run(&processor, "");
        assert_eq!(result.status, ProcessorStatus::SystemError);
    }
}
