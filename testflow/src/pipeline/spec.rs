//! Stage specifications.

use crate::config::CommandLine;
use crate::core::{StageKind, StagePolicy};
use crate::errors::ConfigError;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Where a stage's stdout and stderr go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputSink {
    /// Interleaved with the harness's own output.
    #[default]
    Inherit,
    /// Both streams written to a file, relative to the working directory.
    File(PathBuf),
}

/// Specification for a single stage invocation.
///
/// Built once from the configuration and never changed during a run.
/// Environment overrides apply to this stage's child process only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    /// The unique name of the stage.
    pub name: String,
    /// The kind of stage.
    pub kind: StageKind,
    /// Program to invoke.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
    /// Environment overrides for the child.
    pub env: BTreeMap<String, String>,
    /// Whether failure counts toward the exit status.
    pub policy: StagePolicy,
    /// Where output goes.
    pub output: OutputSink,
    /// Working directory of the child.
    pub working_dir: Option<PathBuf>,
}

impl StageSpec {
    /// Creates a mandatory stage with no arguments.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: StageKind, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            policy: StagePolicy::Mandatory,
            output: OutputSink::Inherit,
            working_dir: None,
        }
    }

    /// Creates a mandatory stage from a configured command line.
    #[must_use]
    pub fn from_command(name: impl Into<String>, kind: StageKind, command: &CommandLine) -> Self {
        Self::new(name, kind, command.program.clone()).with_args(command.args.iter().cloned())
    }

    /// Appends arguments.
    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Appends one argument.
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Adds an environment override.
    #[must_use]
    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }

    /// Marks the stage best-effort.
    #[must_use]
    pub fn best_effort(mut self) -> Self {
        self.policy = StagePolicy::BestEffort;
        self
    }

    /// Sets where output goes.
    #[must_use]
    pub fn with_output(mut self, output: OutputSink) -> Self {
        self.output = output;
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Returns true if the stage's failure is ignored.
    #[must_use]
    pub fn is_best_effort(&self) -> bool {
        self.policy == StagePolicy::BestEffort
    }

    /// Renders the invocation as a shell-like line, for logs and dry runs.
    #[must_use]
    pub fn command_line(&self) -> String {
        let mut line = String::new();
        for (name, value) in &self.env {
            line.push_str(&format!("{name}={value} "));
        }
        line.push_str(&self.program);
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        if let OutputSink::File(path) = &self.output {
            line.push_str(&format!(" > {}", path.display()));
        }
        line
    }

    /// Validates the stage specification.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or program is blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::invalid_stage(&self.name, "name cannot be empty"));
        }
        if self.program.trim().is_empty() {
            return Err(ConfigError::invalid_stage(&self.name, "program cannot be empty"));
        }
        Ok(())
    }
}
