//! # Testflow
//!
//! A continuous-integration test harness.
//!
//! A run provisions a fixture set, executes the unit and integration suites
//! in order without stopping at the first failure, and derives a single exit
//! status from their outcomes. With coverage enabled and a clean run, it then
//! produces coverage and style reports whose failures never affect that
//! status.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use testflow::prelude::*;
//!
//! # async fn run() -> Result<(), TestflowError> {
//! let config = HarnessConfig::load_or_default(None)?;
//! let report = Harness::new(config, RunMode::WithCoverage).run().await?;
//! std::process::exit(report.exit_code());
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod harness;
pub mod observability;
pub mod pipeline;
pub mod provision;
pub mod report;
pub mod stages;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{HarnessConfig, RunMode};
    pub use crate::core::{AggregateOutcome, OutcomeLog, StageKind, StageOutcome, StagePolicy};
    pub use crate::errors::{ConfigError, ProvisionError, StageLaunchError, TestflowError};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::harness::{Harness, RunReport, FATAL_EXIT_CODE};
    pub use crate::observability::{init_logging, LogFormat};
    pub use crate::pipeline::{StagePlan, StageRunner, StageSpec};
    pub use crate::stages::{ProcessExecutor, StageExecutor};
    pub use crate::utils::{iso_timestamp, Timestamp};
}
