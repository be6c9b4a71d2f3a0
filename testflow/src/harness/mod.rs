//! The test run orchestrator.
//!
//! A run is: provision fixtures (fatal on failure), run every mandatory
//! stage in order regardless of earlier failures, fold their statuses into
//! the aggregate outcome, then run the best-effort report phase if it
//! applies. The aggregate is fixed before reporting starts.

mod integration_tests;

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{HarnessConfig, RunMode};
use crate::core::{AggregateOutcome, OutcomeLog};
use crate::errors::{ConfigError, TestflowError};
use crate::events::{event_types, EventSink, LoggingEventSink};
use crate::pipeline::{FailureRecord, FailureSummary, StagePlan, StageRunner};
use crate::provision::{FixtureProvisioner, FixtureSet};
use crate::report::{ReportPhase, Reporter};
use crate::stages::{ProcessExecutor, StageExecutor};
use crate::utils::{duration_ms, generate_run_id, now_utc, Timestamp};

/// Exit status for a run aborted before any stage ran.
///
/// Distinct from anything a stage reports through the aggregate in practice,
/// and from the shell's 126/127 launch codes.
pub const FATAL_EXIT_CODE: i32 = 125;

/// How the fixture set is acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FixturePolicy {
    /// Fetch a fresh checkout; an existing destination is an error.
    #[default]
    Fetch,
    /// Use the checkout already at the destination.
    Reuse,
}

/// Runs the full test sequence for one invocation.
pub struct Harness {
    config: HarnessConfig,
    mode: RunMode,
    executor: Arc<dyn StageExecutor>,
    events: Arc<dyn EventSink>,
    fixtures: FixturePolicy,
}

impl std::fmt::Debug for Harness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harness")
            .field("config", &self.config)
            .field("mode", &self.mode)
            .field("fixtures", &self.fixtures)
            .finish_non_exhaustive()
    }
}

impl Harness {
    /// Creates a harness that spawns real processes and logs its events.
    #[must_use]
    pub fn new(config: HarnessConfig, mode: RunMode) -> Self {
        Self {
            config,
            mode,
            executor: Arc::new(ProcessExecutor::new()),
            events: Arc::new(LoggingEventSink::debug()),
            fixtures: FixturePolicy::Fetch,
        }
    }

    /// Replaces the stage executor.
    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn StageExecutor>) -> Self {
        self.executor = executor;
        self
    }

    /// Replaces the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Reuses an existing fixture checkout instead of fetching one.
    #[must_use]
    pub fn reuse_fixtures(mut self) -> Self {
        self.fixtures = FixturePolicy::Reuse;
        self
    }

    /// Returns the run mode.
    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Builds the stage plan this harness would run, assuming the fixtures
    /// land at their configured destination.
    pub fn plan(&self) -> Result<StagePlan, ConfigError> {
        StagePlan::build(&self.config, self.mode, &FixtureSet::expected(&self.config))
    }

    /// Runs the harness to completion.
    ///
    /// # Errors
    ///
    /// Returns [`TestflowError::Provision`] if the fixtures cannot be
    /// acquired, in which case no stage has run, and
    /// [`TestflowError::Config`] if the plan is invalid. Stage failures are
    /// not errors; they are reflected in [`RunReport::exit_code`].
    pub async fn run(&self) -> Result<RunReport, TestflowError> {
        // A bad configuration fails here, before anything is fetched.
        let expected = self.plan()?;
        let run_id = generate_run_id();
        let span = info_span!("run", %run_id, mode = %self.mode);
        self.execute(&expected, run_id).instrument(span).await
    }

    async fn execute(&self, expected: &StagePlan, run_id: Uuid) -> Result<RunReport, TestflowError> {
        let started_at = now_utc();
        let executor = self.executor.as_ref();
        let events = self.events.as_ref();

        info!(workdir = %self.config.workdir.display(), "starting test run");
        events
            .emit(
                event_types::RUN_STARTED,
                Some(serde_json::json!({
                    "run_id": run_id,
                    "mode": self.mode,
                    "stages": expected.mandatory.len(),
                })),
            )
            .await;

        let fixtures = self.acquire_fixtures(executor, events).await?;
        let plan = StagePlan::build(&self.config, self.mode, &fixtures)?;

        let runner = StageRunner::new(executor, events);
        let outcomes = runner.run_all(&plan.mandatory).await.outcomes;
        let aggregate = outcomes.aggregate();
        let failures = FailureSummary::from_outcomes(&outcomes);
        if failures.has_failures() {
            warn!(
                failed = failures.failed_stages(),
                total = failures.total_stages,
                failures = %failures.describe(),
                exit_code = aggregate.code(),
                "mandatory stages failed"
            );
        }

        let report = Reporter::new(&runner, events)
            .run(&self.config, &plan, aggregate)
            .await;

        let finished_at = now_utc();
        info!(
            exit_code = aggregate.code(),
            duration_ms = duration_ms(started_at, finished_at),
            "test run finished"
        );
        events
            .emit(
                event_types::RUN_COMPLETED,
                Some(serde_json::json!({
                    "run_id": run_id,
                    "exit_code": aggregate.code(),
                    "reported": report.ran(),
                })),
            )
            .await;

        Ok(RunReport {
            run_id,
            mode: self.mode,
            started_at,
            finished_at,
            outcomes,
            aggregate,
            failures,
            report,
        })
    }

    async fn acquire_fixtures(
        &self,
        executor: &dyn StageExecutor,
        events: &dyn EventSink,
    ) -> Result<FixtureSet, TestflowError> {
        let provisioner = FixtureProvisioner::new(executor, events);
        let fixtures = match self.fixtures {
            FixturePolicy::Fetch => provisioner.provision(&self.config).await?,
            FixturePolicy::Reuse => provisioner.reuse(&self.config)?,
        };
        Ok(fixtures)
    }
}

/// The result of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Unique identifier of the run.
    pub run_id: Uuid,
    /// The mode the run used.
    pub mode: RunMode,
    /// When the run started.
    pub started_at: Timestamp,
    /// When the run finished, reports included.
    pub finished_at: Timestamp,
    /// Mandatory stage outcomes, in order.
    pub outcomes: OutcomeLog,
    /// The aggregate of `outcomes`.
    pub aggregate: AggregateOutcome,
    /// Every failed mandatory stage.
    pub failures: FailureSummary,
    /// What the report phase did.
    pub report: ReportPhase,
}

impl RunReport {
    /// The process exit status for this run.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.aggregate.code()
    }

    /// A serializable view of the run.
    #[must_use]
    pub fn summary(&self) -> RunSummary<'_> {
        RunSummary {
            run_id: self.run_id,
            mode: self.mode,
            started_at: self.started_at,
            finished_at: self.finished_at,
            duration_ms: duration_ms(self.started_at, self.finished_at),
            exit_code: self.exit_code(),
            outcomes: &self.outcomes,
            failures: &self.failures.failures,
            report: &self.report,
        }
    }

    /// Writes the summary as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_summary(&self, path: &Path) -> Result<(), TestflowError> {
        let json = serde_json::to_string_pretty(&self.summary())?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// JSON view of a [`RunReport`].
#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    /// Unique identifier of the run.
    pub run_id: Uuid,
    /// The mode the run used.
    pub mode: RunMode,
    /// When the run started.
    pub started_at: Timestamp,
    /// When the run finished.
    pub finished_at: Timestamp,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// The aggregate exit status.
    pub exit_code: i32,
    /// Mandatory stage outcomes.
    pub outcomes: &'a OutcomeLog,
    /// Failed mandatory stages.
    pub failures: &'a [FailureRecord],
    /// The report phase.
    pub report: &'a ReportPhase,
}
