//! Core domain model types for testflow.
//!
//! This module contains the fundamental types used throughout the harness:
//! - Stage kind and policy enums
//! - Stage outcomes and the aggregation rule
//! - Report artifacts

mod artifact;
mod outcome;
mod status;

pub use artifact::{ArtifactKind, ReportArtifact};
pub use outcome::{last_nonzero, AggregateOutcome, OutcomeLog, StageOutcome};
pub use status::{StageKind, StagePolicy};
