//! Error types for the testflow harness.
//!
//! Only fixture provisioning produces a fatal error. Stage failures are
//! values (`StageOutcome`), not errors, and reporting failures are swallowed
//! by the reporter.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for testflow operations.
#[derive(Debug, Error)]
pub enum TestflowError {
    /// Fixture provisioning failed; the run must abort.
    #[error("{0}")]
    Provision(#[from] ProvisionError),

    /// The harness configuration could not be loaded or is invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Logging could not be initialized.
    #[error("Logging error: {0}")]
    Logging(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Cannot read config file {}: {source}", path.display())]
    Read {
        /// The file that was requested.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for `HarnessConfig`.
    #[error("Cannot parse config file {}: {source}", path.display())]
    Parse {
        /// The file that was requested.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A stage definition is unusable.
    #[error("Invalid stage '{stage}': {reason}")]
    InvalidStage {
        /// The stage name.
        stage: String,
        /// What is wrong with it.
        reason: String,
    },

    /// An unknown log format name was given.
    #[error("Unknown log format '{0}' (expected 'text' or 'json')")]
    UnknownLogFormat(String),
}

impl ConfigError {
    /// Creates an invalid stage error.
    #[must_use]
    pub fn invalid_stage(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidStage {
            stage: stage.into(),
            reason: reason.into(),
        }
    }
}

/// Error raised when a stage process cannot be spawned at all.
///
/// The runner converts this into a recorded exit status instead of aborting,
/// see [`StageLaunchError::exit_status`].
#[derive(Debug, Error)]
#[error("Failed to launch stage '{stage}' ({program}): {source}")]
pub struct StageLaunchError {
    /// The stage name.
    pub stage: String,
    /// The program that was invoked.
    pub program: String,
    /// The underlying IO error.
    #[source]
    pub source: std::io::Error,
}

impl StageLaunchError {
    /// Creates a new launch error.
    #[must_use]
    pub fn new(stage: impl Into<String>, program: impl Into<String>, source: std::io::Error) -> Self {
        Self {
            stage: stage.into(),
            program: program.into(),
            source,
        }
    }

    /// The exit status a POSIX shell would report for this failure.
    ///
    /// 127 for a missing program, 126 for one that is not executable, 1 for
    /// anything else (for example an unwritable output redirect).
    #[must_use]
    pub fn exit_status(&self) -> i32 {
        match self.source.kind() {
            std::io::ErrorKind::NotFound => 127,
            std::io::ErrorKind::PermissionDenied => 126,
            _ => 1,
        }
    }
}

/// Errors raised by the fixture provisioner. All of them are fatal.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The destination already exists and would be clobbered by a fetch.
    #[error("Fixture destination {} already exists", path.display())]
    DestinationExists {
        /// The colliding path.
        path: PathBuf,
    },

    /// Reuse was requested but there is no checkout to reuse.
    #[error("Fixture checkout {} does not exist", path.display())]
    MissingCheckout {
        /// The expected path.
        path: PathBuf,
    },

    /// The fetch program could not be launched.
    #[error("Cannot fetch fixtures: {0}")]
    Launch(#[source] StageLaunchError),

    /// The fetch program ran and failed.
    #[error("Fetching fixtures from {repository} failed with exit status {status}")]
    FetchFailed {
        /// The fixture source.
        repository: String,
        /// The exit status of the fetch program.
        status: i32,
    },

    /// The fetch program reported success but left no checkout behind.
    #[error("Fixture fetch succeeded but {} was not created", path.display())]
    Incomplete {
        /// The expected path.
        path: PathBuf,
    },
}

impl ProvisionError {
    /// Returns a hint for fixing the error, if one is known.
    #[must_use]
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::DestinationExists { .. } => Some(
                "Remove the existing checkout, or pass --skip-fixtures to reuse it.",
            ),
            Self::MissingCheckout { .. } => Some(
                "Drop --skip-fixtures so the fixtures are fetched.",
            ),
            Self::Launch(_) => Some("Check that the fetch program is installed and on PATH."),
            Self::FetchFailed { .. } => Some(
                "Check network access and credentials for the fixture repository.",
            ),
            Self::Incomplete { .. } => None,
        }
    }
}
