//! Stage execution.
//!
//! A [`StageExecutor`] turns a [`StageSpec`] into an exit status. The
//! production implementation is [`ProcessExecutor`]; tests use
//! [`crate::testing::ScriptedExecutor`] or the generated `MockStageExecutor`.

mod process;

pub use process::{exit_status_code, ProcessExecutor};

use crate::errors::StageLaunchError;
use crate::pipeline::StageSpec;
use async_trait::async_trait;

/// Runs one stage to completion.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StageExecutor: Send + Sync {
    /// Executes the stage and waits for it to terminate.
    ///
    /// # Returns
    ///
    /// The stage's exit status (0 on success).
    ///
    /// # Errors
    ///
    /// Returns [`StageLaunchError`] only when the process could not be
    /// started at all.
    async fn execute(&self, spec: &StageSpec) -> Result<i32, StageLaunchError>;
}
