//! Sequential stage execution.
//!
//! Two capabilities: [`StageRunner::run_and_record`] for mandatory stages,
//! whose outcome is appended to the run's [`OutcomeLog`], and
//! [`StageRunner::run_and_ignore`] for best-effort stages, whose failure is
//! logged and otherwise dropped. Neither aborts on a failed stage.

use super::StageSpec;
use crate::core::{OutcomeLog, StageOutcome};
use crate::events::{event_types, EventSink};
use crate::observability::SpanTimer;
use crate::stages::StageExecutor;
use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};

/// Outcome of a best-effort stage.
///
/// Deliberately not convertible into a [`StageOutcome`] that could be
/// recorded, so it can never reach the aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AdvisoryOutcome(StageOutcome);

impl AdvisoryOutcome {
    /// Returns the underlying outcome, for inspection.
    #[must_use]
    pub fn outcome(&self) -> &StageOutcome {
        &self.0
    }

    /// Returns the stage name.
    #[must_use]
    pub fn stage(&self) -> &str {
        &self.0.stage
    }

    /// Returns true if the stage exited 0.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.0.is_success()
    }
}

/// Everything produced by running a list of stages.
#[derive(Debug, Clone, Default)]
pub struct StageRun {
    /// Outcomes of mandatory stages, in order.
    pub outcomes: OutcomeLog,
    /// Outcomes of best-effort stages, in order.
    pub advisory: Vec<AdvisoryOutcome>,
}

/// Runs stages one at a time through an executor.
pub struct StageRunner<'a> {
    executor: &'a dyn StageExecutor,
    events: &'a dyn EventSink,
}

impl<'a> StageRunner<'a> {
    /// Creates a runner.
    #[must_use]
    pub fn new(executor: &'a dyn StageExecutor, events: &'a dyn EventSink) -> Self {
        Self { executor, events }
    }

    /// Runs a stage and appends its outcome to `log`.
    ///
    /// Returns the recorded exit status.
    pub async fn run_and_record(&self, spec: &StageSpec, log: &mut OutcomeLog) -> i32 {
        let outcome = self.invoke(spec).await;
        let status = outcome.status;
        if outcome.is_success() {
            info!(stage = %spec.name, duration_ms = outcome.duration_ms, "stage passed");
            self.events.try_emit(event_types::STAGE_COMPLETED, Some(payload(&outcome)));
        } else {
            warn!(stage = %spec.name, status, duration_ms = outcome.duration_ms, "stage failed, continuing");
            self.events.try_emit(event_types::STAGE_FAILED, Some(payload(&outcome)));
        }
        log.record(outcome);
        status
    }

    /// Runs a stage and swallows its failure.
    pub async fn run_and_ignore(&self, spec: &StageSpec) -> AdvisoryOutcome {
        let outcome = self.invoke(spec).await;
        if outcome.is_success() {
            info!(stage = %spec.name, duration_ms = outcome.duration_ms, "best-effort stage passed");
            self.events.try_emit(event_types::STAGE_COMPLETED, Some(payload(&outcome)));
        } else {
            warn!(stage = %spec.name, status = outcome.status, "best-effort stage failed, ignoring");
            self.events.try_emit(event_types::STAGE_IGNORED, Some(payload(&outcome)));
        }
        AdvisoryOutcome(outcome)
    }

    /// Runs every stage in order, choosing the capability from its policy.
    pub async fn run_all(&self, specs: &[StageSpec]) -> StageRun {
        let mut run = StageRun::default();
        for spec in specs {
            if spec.is_best_effort() {
                let advisory = self.run_and_ignore(spec).await;
                run.advisory.push(advisory);
            } else {
                self.run_and_record(spec, &mut run.outcomes).await;
            }
        }
        run
    }

    async fn invoke(&self, spec: &StageSpec) -> StageOutcome {
        info!(stage = %spec.name, command = %spec.command_line(), "starting stage");
        self.events.try_emit(
            event_types::STAGE_STARTED,
            Some(serde_json::json!({
                "stage": spec.name,
                "kind": spec.kind,
                "policy": spec.policy,
            })),
        );

        let timer = SpanTimer::start(&spec.name);
        let span = info_span!("stage", name = %spec.name, kind = %spec.kind);
        let status = match self.executor.execute(spec).instrument(span).await {
            Ok(status) => status,
            Err(err) => {
                let status = err.exit_status();
                warn!(stage = %spec.name, error = %err, status, "stage could not be launched");
                status
            }
        };
        let (started_at, duration_ms) = timer.finish();

        StageOutcome::new(&spec.name, spec.kind, status).with_timing(started_at, duration_ms)
    }
}

fn payload(outcome: &StageOutcome) -> serde_json::Value {
    serde_json::json!({
        "stage": outcome.stage,
        "kind": outcome.kind,
        "status": outcome.status,
        "duration_ms": outcome.duration_ms,
    })
}
