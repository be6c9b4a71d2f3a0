//! Subprocess-backed stage executor.

use super::StageExecutor;
use crate::errors::StageLaunchError;
use crate::pipeline::{OutputSink, StageSpec};
use async_trait::async_trait;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tracing::debug;

/// Runs each stage as a child process and waits for it.
///
/// The child inherits the parent's environment plus the stage's own
/// overrides, and its stdin. Output is inherited unless the stage redirects
/// it to a file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    /// Creates a new process executor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn command(spec: &StageSpec) -> Result<Command, StageLaunchError> {
        let mut command = Command::new(resolve_program(spec));
        command.args(&spec.args).envs(&spec.env);
        if let Some(dir) = &spec.working_dir {
            command.current_dir(dir);
        }

        if let OutputSink::File(path) = &spec.output {
            let path = resolve_in(spec.working_dir.as_deref(), path);
            let redirect_error = |e: io::Error| {
                StageLaunchError::new(
                    &spec.name,
                    &spec.program,
                    io::Error::other(format!("cannot write {}: {e}", path.display())),
                )
            };
            let stdout = File::create(&path).map_err(redirect_error)?;
            let stderr = stdout.try_clone().map_err(redirect_error)?;
            command.stdout(Stdio::from(stdout)).stderr(Stdio::from(stderr));
        }

        Ok(command)
    }
}

#[async_trait]
impl StageExecutor for ProcessExecutor {
    async fn execute(&self, spec: &StageSpec) -> Result<i32, StageLaunchError> {
        debug!(stage = %spec.name, command = %spec.command_line(), "spawning stage");
        let mut command = Self::command(spec)?;
        let status = command
            .status()
            .await
            .map_err(|source| StageLaunchError::new(&spec.name, &spec.program, source))?;
        Ok(exit_status_code(status))
    }
}

/// Converts a process termination status into a numeric exit status.
///
/// A child killed by a signal reports `128 + signal`, as a shell would.
#[must_use]
pub fn exit_status_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

fn resolve_in(dir: Option<&Path>, path: &Path) -> PathBuf {
    match dir {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    }
}

// A bare program name is looked up on PATH; a relative path with a directory
// component is taken relative to the stage's working directory.
fn resolve_program(spec: &StageSpec) -> PathBuf {
    let program = Path::new(&spec.program);
    if program.components().count() > 1 {
        resolve_in(spec.working_dir.as_deref(), program)
    } else {
        program.to_path_buf()
    }
}
