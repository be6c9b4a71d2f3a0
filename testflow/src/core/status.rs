//! Stage kind and policy enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of work a stage performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Fetches the fixture set.
    Provision,
    /// Runs the project's unit-test suite.
    UnitTest,
    /// Runs the external integration-test runner.
    Integration,
    /// Prints the textual coverage summary.
    CoverageSummary,
    /// Exports the HTML coverage report.
    CoverageHtml,
    /// Writes the style-check report.
    StyleCheck,
}

impl StageKind {
    /// Returns true for the post-run report sub-stages.
    #[must_use]
    pub fn is_report(&self) -> bool {
        matches!(self, Self::CoverageSummary | Self::CoverageHtml | Self::StyleCheck)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provision => write!(f, "provision"),
            Self::UnitTest => write!(f, "unit_test"),
            Self::Integration => write!(f, "integration"),
            Self::CoverageSummary => write!(f, "coverage_summary"),
            Self::CoverageHtml => write!(f, "coverage_html"),
            Self::StyleCheck => write!(f, "style_check"),
        }
    }
}

/// Whether a stage's failure counts toward the run's exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StagePolicy {
    /// Failure is recorded and reaches the aggregate exit status.
    #[default]
    Mandatory,
    /// Failure is logged and otherwise ignored.
    BestEffort,
}

impl fmt::Display for StagePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mandatory => write!(f, "mandatory"),
            Self::BestEffort => write!(f, "best_effort"),
        }
    }
}
