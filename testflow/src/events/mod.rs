//! Event sink system for run observability.
//!
//! The harness reports its lifecycle through an [`EventSink`]. Event type
//! names are the constants in [`event_types`].

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RecordedEvent};

/// Event type names emitted by the harness.
pub mod event_types {
    /// A run started.
    pub const RUN_STARTED: &str = "run.started";
    /// The fixture set is available.
    pub const FIXTURES_PROVISIONED: &str = "fixtures.provisioned";
    /// Fixture provisioning failed; the run aborts.
    pub const FIXTURES_FAILED: &str = "fixtures.failed";
    /// A stage process is about to start.
    pub const STAGE_STARTED: &str = "stage.started";
    /// A stage exited 0.
    pub const STAGE_COMPLETED: &str = "stage.completed";
    /// A mandatory stage exited nonzero.
    pub const STAGE_FAILED: &str = "stage.failed";
    /// A best-effort stage exited nonzero and the failure was ignored.
    pub const STAGE_IGNORED: &str = "stage.ignored";
    /// The report phase is starting.
    pub const REPORT_STARTED: &str = "report.started";
    /// The report phase was skipped.
    pub const REPORT_SKIPPED: &str = "report.skipped";
    /// The run finished with its aggregate status.
    pub const RUN_COMPLETED: &str = "run.completed";
}
