//! Scripted executor for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::io;
use std::sync::Arc;

use crate::errors::StageLaunchError;
use crate::pipeline::StageSpec;
use crate::stages::StageExecutor;

type Effect = Arc<dyn Fn(&StageSpec) + Send + Sync>;

/// One recorded call to [`ScriptedExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Stage name.
    pub stage: String,
    /// Program that would have run.
    pub program: String,
    /// Its arguments.
    pub args: Vec<String>,
    /// Its environment overrides.
    pub env: BTreeMap<String, String>,
}

/// An executor that spawns nothing.
///
/// Every call is recorded in order. Stages exit with their scripted status
/// (0 by default), can be made unlaunchable, and can run a side effect, for
/// example creating the directory a real fetch would have created.
#[derive(Default)]
pub struct ScriptedExecutor {
    statuses: HashMap<String, i32>,
    launch_failures: HashSet<String>,
    effects: HashMap<String, Effect>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedExecutor {
    /// Creates an executor where every stage exits 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the exit status of a stage.
    #[must_use]
    pub fn with_status(mut self, stage: impl Into<String>, status: i32) -> Self {
        self.statuses.insert(stage.into(), status);
        self
    }

    /// Makes a stage fail to launch, as if its program were missing.
    #[must_use]
    pub fn with_launch_failure(mut self, stage: impl Into<String>) -> Self {
        self.launch_failures.insert(stage.into());
        self
    }

    /// Runs `effect` whenever the stage executes.
    #[must_use]
    pub fn with_effect<F>(mut self, stage: impl Into<String>, effect: F) -> Self
    where
        F: Fn(&StageSpec) + Send + Sync + 'static,
    {
        self.effects.insert(stage.into(), Arc::new(effect));
        self
    }

    /// Returns every recorded call in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().clone()
    }

    /// Returns the names of the executed stages in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<String> {
        self.calls.lock().iter().map(|call| call.stage.clone()).collect()
    }

    /// Returns how many times a stage was executed.
    #[must_use]
    pub fn call_count(&self, stage: &str) -> usize {
        self.calls.lock().iter().filter(|call| call.stage == stage).count()
    }

    /// Returns the recorded call for a stage, if it ran.
    #[must_use]
    pub fn call(&self, stage: &str) -> Option<Invocation> {
        self.calls.lock().iter().find(|call| call.stage == stage).cloned()
    }
}

impl fmt::Debug for ScriptedExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedExecutor")
            .field("statuses", &self.statuses)
            .field("launch_failures", &self.launch_failures)
            .field("calls", &self.calls.lock().len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StageExecutor for ScriptedExecutor {
    async fn execute(&self, spec: &StageSpec) -> Result<i32, StageLaunchError> {
        self.calls.lock().push(Invocation {
            stage: spec.name.clone(),
            program: spec.program.clone(),
            args: spec.args.clone(),
            env: spec.env.clone(),
        });

        if self.launch_failures.contains(&spec.name) {
            return Err(StageLaunchError::new(
                &spec.name,
                &spec.program,
                io::Error::from(io::ErrorKind::NotFound),
            ));
        }
        if let Some(effect) = self.effects.get(&spec.name) {
            effect(spec);
        }
        Ok(self.statuses.get(&spec.name).copied().unwrap_or(0))
    }
}
