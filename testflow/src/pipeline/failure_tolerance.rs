//! Continue-on-failure bookkeeping.
//!
//! The runner never stops on a failed stage. Only the last failure's code
//! reaches the exit status, so the full list is kept here for the end-of-run
//! log.

use crate::core::{OutcomeLog, StageKind};
use serde::{Deserialize, Serialize};

/// Record of a failed mandatory stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Stage name.
    pub stage: String,
    /// Kind of stage.
    pub kind: StageKind,
    /// The nonzero exit status.
    pub status: i32,
}

/// Summary of failures during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureSummary {
    /// Total number of mandatory stages run.
    pub total_stages: usize,
    /// Number of stages that exited 0.
    pub passed_stages: usize,
    /// Failed stages, in run order.
    pub failures: Vec<FailureRecord>,
}

impl FailureSummary {
    /// Summarizes an outcome log.
    #[must_use]
    pub fn from_outcomes(outcomes: &OutcomeLog) -> Self {
        let failures: Vec<FailureRecord> = outcomes
            .iter()
            .filter(|outcome| !outcome.is_success())
            .map(|outcome| FailureRecord {
                stage: outcome.stage.clone(),
                kind: outcome.kind,
                status: outcome.status,
            })
            .collect();

        Self {
            total_stages: outcomes.len(),
            passed_stages: outcomes.len() - failures.len(),
            failures,
        }
    }

    /// Returns the number of failed stages.
    #[must_use]
    pub fn failed_stages(&self) -> usize {
        self.failures.len()
    }

    /// Returns true if any failures occurred.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Returns the fraction of stages that passed.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        if self.total_stages == 0 {
            return 0.0;
        }
        self.passed_stages as f64 / self.total_stages as f64
    }

    /// Renders the failures as `name (exit N)` entries.
    #[must_use]
    pub fn describe(&self) -> String {
        self.failures
            .iter()
            .map(|failure| format!("{} (exit {})", failure.stage, failure.status))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
