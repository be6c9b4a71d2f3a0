//! Stage planning and execution.
//!
//! This module provides:
//! - Stage specifications
//! - The ordered plan for a run mode
//! - The sequential runner with record/ignore capabilities
//! - Failure summaries

mod failure_tolerance;
mod plan;
mod runner;
mod spec;

pub use failure_tolerance::{FailureRecord, FailureSummary};
pub use plan::{
    StagePlan, COVERAGE_HTML_STAGE, COVERAGE_SUMMARY_STAGE, INTEGRATION_STAGE, STYLE_STAGE,
    UNIT_STAGE,
};
pub use runner::{AdvisoryOutcome, StageRun, StageRunner};
pub use spec::{OutputSink, StageSpec};
