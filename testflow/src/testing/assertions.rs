//! Test assertions for run results.

use crate::core::OutcomeLog;
use crate::harness::RunReport;

/// Asserts that the log holds exactly these stages, in this order.
pub fn assert_stage_order(outcomes: &OutcomeLog, expected: &[&str]) {
    let actual: Vec<&str> = outcomes.iter().map(|o| o.stage.as_str()).collect();
    assert_eq!(actual, expected, "Unexpected stage order");
}

/// Asserts the recorded status of a stage.
pub fn assert_stage_status(outcomes: &OutcomeLog, stage: &str, expected: i32) {
    let outcome = outcomes
        .get(stage)
        .unwrap_or_else(|| panic!("No outcome recorded for stage '{stage}'"));
    assert_eq!(
        outcome.status, expected,
        "Expected stage '{stage}' to exit {expected}, got {}",
        outcome.status
    );
}

/// Asserts the run's final exit status.
pub fn assert_exit_code(report: &RunReport, expected: i32) {
    assert_eq!(
        report.exit_code(),
        expected,
        "Expected exit code {expected}, got {} (failures: {})",
        report.exit_code(),
        report.failures.describe()
    );
}

/// Asserts that the report phase ran.
pub fn assert_reported(report: &RunReport) {
    assert!(
        report.report.ran(),
        "Expected the report phase to run, but it was skipped: {:?}",
        report.report.decision
    );
}

/// Asserts that the report phase was skipped.
pub fn assert_not_reported(report: &RunReport) {
    assert!(
        !report.report.ran(),
        "Expected the report phase to be skipped, but it ran {} stages",
        report.report.outcomes.len()
    );
}
