//! Post-run coverage and style reporting.
//!
//! Reports run only when every mandatory stage passed and coverage was
//! requested. Each sub-stage is best-effort: its failure is logged and never
//! reaches the exit status, which is fixed before this phase starts.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{HarnessConfig, RunMode};
use crate::core::{AggregateOutcome, ArtifactKind, ReportArtifact, StageKind};
use crate::events::{event_types, EventSink};
use crate::pipeline::{AdvisoryOutcome, StagePlan, StageRunner, COVERAGE_HTML_STAGE, STYLE_STAGE};

/// Whether the report phase runs, and if not, why.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportDecision {
    /// Coverage was requested and the run succeeded.
    Run,
    /// Plain mode never reports.
    SkippedPlainMode,
    /// A mandatory stage failed; a report would be misleading.
    SkippedFailedRun,
}

impl ReportDecision {
    /// Decides from the run mode and the aggregate outcome.
    #[must_use]
    pub fn decide(mode: RunMode, aggregate: AggregateOutcome) -> Self {
        if !mode.is_coverage() {
            Self::SkippedPlainMode
        } else if !aggregate.is_success() {
            Self::SkippedFailedRun
        } else {
            Self::Run
        }
    }
}

/// What the report phase did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportPhase {
    /// Whether it ran.
    pub decision: ReportDecision,
    /// Sub-stage outcomes, in order; empty when skipped.
    pub outcomes: Vec<AdvisoryOutcome>,
    /// Artifacts the sub-stages were expected to produce.
    pub artifacts: Vec<ReportArtifact>,
    /// Violation count read from the style report, if it could be parsed.
    pub style_violations: Option<u64>,
}

impl ReportPhase {
    /// A phase that did not run.
    #[must_use]
    pub fn skipped(decision: ReportDecision) -> Self {
        Self {
            decision,
            outcomes: Vec::new(),
            artifacts: Vec::new(),
            style_violations: None,
        }
    }

    /// Returns true if the sub-stages were executed.
    #[must_use]
    pub fn ran(&self) -> bool {
        self.decision == ReportDecision::Run
    }
}

/// Runs the report sub-stages of a plan.
pub struct Reporter<'a> {
    runner: &'a StageRunner<'a>,
    events: &'a dyn EventSink,
}

impl<'a> Reporter<'a> {
    /// Creates a reporter.
    #[must_use]
    pub fn new(runner: &'a StageRunner<'a>, events: &'a dyn EventSink) -> Self {
        Self { runner, events }
    }

    /// Runs the report phase if the decision allows it.
    pub async fn run(
        &self,
        config: &HarnessConfig,
        plan: &StagePlan,
        aggregate: AggregateOutcome,
    ) -> ReportPhase {
        let decision = ReportDecision::decide(plan.mode, aggregate);
        if decision != ReportDecision::Run {
            info!(?decision, "skipping reports");
            self.events
                .emit(
                    event_types::REPORT_SKIPPED,
                    Some(serde_json::json!({ "decision": decision })),
                )
                .await;
            return ReportPhase::skipped(decision);
        }

        info!(stages = plan.reporting.len(), "generating reports");
        self.events
            .emit(
                event_types::REPORT_STARTED,
                Some(serde_json::json!({ "stages": plan.reporting.len() })),
            )
            .await;

        let style_report = config.resolve(&config.report.style_report);
        let mut outcomes = Vec::with_capacity(plan.reporting.len());
        for spec in &plan.reporting {
            if spec.kind == StageKind::StyleCheck {
                prepare_parent(&style_report);
            }
            outcomes.push(self.runner.run_and_ignore(spec).await);
        }

        let artifacts = vec![
            ReportArtifact::inspect(
                COVERAGE_HTML_STAGE,
                ArtifactKind::Directory,
                config.resolve(&config.report.html_dir),
            ),
            ReportArtifact::inspect(STYLE_STAGE, ArtifactKind::File, &style_report),
        ];
        for artifact in artifacts.iter().filter(|artifact| !artifact.present) {
            warn!(stage = %artifact.stage, path = %artifact.path.display(), "report artifact missing");
        }

        let style_violations = read_style_violations(&style_report);
        if let Some(count) = style_violations {
            info!(count, report = %style_report.display(), "style violations");
        }

        ReportPhase {
            decision,
            outcomes,
            artifacts,
            style_violations,
        }
    }
}

fn prepare_parent(path: &Path) {
    let Some(parent) = path.parent() else {
        return;
    };
    if let Err(err) = std::fs::create_dir_all(parent) {
        warn!(dir = %parent.display(), error = %err, "cannot create report directory");
    }
}

static COUNT_LINE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(\d+)\s*$").ok());

/// Extracts the trailing violation count from style-checker output.
///
/// The count is the last line consisting only of a number.
#[must_use]
pub fn parse_violation_count(output: &str) -> Option<u64> {
    COUNT_LINE
        .as_ref()?
        .captures_iter(output)
        .last()
        .and_then(|captures| captures.get(1))
        .and_then(|count| count.as_str().parse().ok())
}

fn read_style_violations(path: &Path) -> Option<u64> {
    match std::fs::read_to_string(path) {
        Ok(output) => parse_violation_count(&output),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "style report unreadable");
            None
        }
    }
}
