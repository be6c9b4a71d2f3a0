//! Stage outcomes and their aggregation into the run's exit status.

use super::StageKind;
use crate::utils::Timestamp;
use serde::{Deserialize, Serialize};

/// The recorded result of one stage invocation.
///
/// Produced exactly once per scheduled stage and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutcome {
    /// The stage name.
    pub stage: String,
    /// The kind of stage.
    pub kind: StageKind,
    /// The process exit status, 0 on success.
    pub status: i32,
    /// When the stage was started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,
    /// Wall-clock duration in milliseconds.
    #[serde(default)]
    pub duration_ms: u64,
}

impl StageOutcome {
    /// Creates an outcome with no timing information.
    #[must_use]
    pub fn new(stage: impl Into<String>, kind: StageKind, status: i32) -> Self {
        Self {
            stage: stage.into(),
            kind,
            status,
            started_at: None,
            duration_ms: 0,
        }
    }

    /// Attaches timing information.
    #[must_use]
    pub fn with_timing(mut self, started_at: Timestamp, duration_ms: u64) -> Self {
        self.started_at = Some(started_at);
        self.duration_ms = duration_ms;
        self
    }

    /// Returns true if the stage exited 0.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == 0
    }
}

/// Returns the last nonzero status in sequence order, or 0.
///
/// Earlier failure codes are discarded; only pass/fail and the most recent
/// failure's code survive.
#[must_use]
pub fn last_nonzero(statuses: impl IntoIterator<Item = i32>) -> i32 {
    statuses
        .into_iter()
        .filter(|status| *status != 0)
        .last()
        .unwrap_or(0)
}

/// Append-only, ordered log of mandatory stage outcomes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OutcomeLog {
    entries: Vec<StageOutcome>,
}

impl OutcomeLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an outcome.
    pub fn record(&mut self, outcome: StageOutcome) {
        self.entries.push(outcome);
    }

    /// Returns the outcomes in recording order.
    #[must_use]
    pub fn as_slice(&self) -> &[StageOutcome] {
        &self.entries
    }

    /// Iterates over the outcomes in recording order.
    pub fn iter(&self) -> std::slice::Iter<'_, StageOutcome> {
        self.entries.iter()
    }

    /// Returns the number of recorded outcomes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up the outcome of a stage by name.
    #[must_use]
    pub fn get(&self, stage: &str) -> Option<&StageOutcome> {
        self.entries.iter().find(|outcome| outcome.stage == stage)
    }

    /// Computes the aggregate outcome of everything recorded so far.
    #[must_use]
    pub fn aggregate(&self) -> AggregateOutcome {
        AggregateOutcome::from_outcomes(&self.entries)
    }
}

impl<'a> IntoIterator for &'a OutcomeLog {
    type Item = &'a StageOutcome;
    type IntoIter = std::slice::Iter<'a, StageOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// The run's overall exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateOutcome(i32);

impl AggregateOutcome {
    /// The successful aggregate.
    pub const SUCCESS: Self = Self(0);

    /// Aggregates a sequence of outcomes: the last nonzero status wins.
    #[must_use]
    pub fn from_outcomes(outcomes: &[StageOutcome]) -> Self {
        Self(last_nonzero(outcomes.iter().map(|outcome| outcome.status)))
    }

    /// Returns the raw exit status.
    #[must_use]
    pub fn code(self) -> i32 {
        self.0
    }

    /// Returns true if every mandatory stage passed.
    #[must_use]
    pub fn is_success(self) -> bool {
        self.0 == 0
    }

    /// Returns the status as a process exit byte.
    ///
    /// Codes outside `1..=255` map to 1 so a failure is never reported as 0.
    #[must_use]
    pub fn exit_byte(self) -> u8 {
        u8::try_from(self.0).unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_of(statuses: &[i32]) -> OutcomeLog {
        let mut log = OutcomeLog::new();
        for (index, status) in statuses.iter().enumerate() {
            log.record(StageOutcome::new(format!("stage-{index}"), StageKind::UnitTest, *status));
        }
        log
    }

    #[test]
    fn test_last_nonzero_wins() {
        assert_eq!(last_nonzero([0, 1, 0, 2]), 2);
        assert_eq!(last_nonzero([3, 0, 1]), 1);
        assert_eq!(last_nonzero([0, 0, 0]), 0);
        assert_eq!(last_nonzero(Vec::new()), 0);
    }

    #[test]
    fn test_aggregate_from_log() {
        assert_eq!(log_of(&[0, 1, 0, 2]).aggregate().code(), 2);
        assert!(log_of(&[0, 0, 0]).aggregate().is_success());
        assert!(log_of(&[]).aggregate().is_success());
    }

    #[test]
    fn test_trailing_success_does_not_clear_failure() {
        let aggregate = log_of(&[5, 0]).aggregate();
        assert!(!aggregate.is_success());
        assert_eq!(aggregate.code(), 5);
    }

    #[test]
    fn test_exit_byte() {
        assert_eq!(AggregateOutcome::SUCCESS.exit_byte(), 0);
        assert_eq!(AggregateOutcome(2).exit_byte(), 2);
        assert_eq!(AggregateOutcome(255).exit_byte(), 255);
        assert_eq!(AggregateOutcome(256).exit_byte(), 1);
        assert_eq!(AggregateOutcome(-1).exit_byte(), 1);
    }

    #[test]
    fn test_log_preserves_order_and_lookup() {
        let log = log_of(&[0, 7]);
        let names: Vec<_> = log.iter().map(|o| o.stage.as_str()).collect();
        assert_eq!(names, ["stage-0", "stage-1"]);
        assert_eq!(log.get("stage-1").map(|o| o.status), Some(7));
        assert!(log.get("missing").is_none());
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = StageOutcome::new("unit-tests", StageKind::UnitTest, 1)
            .with_timing(chrono::Utc::now(), 42);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["stage"], "unit-tests");
        assert_eq!(json["kind"], "unit_test");
        assert_eq!(json["status"], 1);
        assert_eq!(json["duration_ms"], 42);
    }
}
