//! Fixture provisioning.
//!
//! The fixture set must exist before any stage runs. Fetching is a single
//! attempt; any failure aborts the run with [`ProvisionError`].

use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::config::{FixtureConfig, HarnessConfig};
use crate::core::StageKind;
use crate::errors::ProvisionError;
use crate::events::{event_types, EventSink};
use crate::pipeline::StageSpec;
use crate::stages::StageExecutor;

/// Name given to the fetch invocation.
pub const FETCH_STAGE: &str = "fixtures";

/// A fixture set that is ready to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureSet {
    /// Where the fixtures live.
    pub root: PathBuf,
    /// Whether they were fetched in this run (false when reused).
    pub fetched: bool,
}

impl FixtureSet {
    /// The set a run would acquire, without touching the filesystem.
    #[must_use]
    pub fn expected(config: &HarnessConfig) -> Self {
        Self {
            root: config.resolve(&config.fixtures.destination),
            fetched: false,
        }
    }

    /// Locates `path` inside the checkout as seen from a stage running in
    /// `workdir`: relative when the checkout lies under it, absolute
    /// otherwise. An absolute `path` is returned unchanged.
    #[must_use]
    pub fn locate(&self, workdir: &Path, path: &Path) -> PathBuf {
        let root = self.root.strip_prefix(workdir).unwrap_or(&self.root);
        root.join(path)
    }
}

/// Builds the fetch invocation: the configured command, then
/// `--branch <revision>` if one is set, then the repository and destination.
#[must_use]
pub fn fetch_spec(fixtures: &FixtureConfig, workdir: &Path) -> StageSpec {
    let mut spec = StageSpec::from_command(FETCH_STAGE, StageKind::Provision, &fixtures.fetch);
    if let Some(revision) = &fixtures.revision {
        spec = spec.with_args(["--branch", revision.as_str()]);
    }
    spec.with_arg(fixtures.repository.clone())
        .with_arg(fixtures.destination.to_string_lossy().into_owned())
        .in_dir(workdir)
}

/// Acquires the fixture set for a run.
pub struct FixtureProvisioner<'a> {
    executor: &'a dyn StageExecutor,
    events: &'a dyn EventSink,
}

impl<'a> FixtureProvisioner<'a> {
    /// Creates a provisioner.
    #[must_use]
    pub fn new(executor: &'a dyn StageExecutor, events: &'a dyn EventSink) -> Self {
        Self { executor, events }
    }

    /// Fetches the fixtures into their destination.
    ///
    /// # Errors
    ///
    /// Fails if the destination already exists, if the fetch cannot be
    /// launched or exits nonzero, or if it leaves no destination behind.
    pub async fn provision(&self, config: &HarnessConfig) -> Result<FixtureSet, ProvisionError> {
        let result = self.fetch(config).await;
        self.report(&result);
        result
    }

    /// Uses an existing checkout instead of fetching.
    ///
    /// # Errors
    ///
    /// Fails if the destination does not exist.
    pub fn reuse(&self, config: &HarnessConfig) -> Result<FixtureSet, ProvisionError> {
        let root = config.resolve(&config.fixtures.destination);
        let result = if root.is_dir() {
            Ok(FixtureSet {
                root,
                fetched: false,
            })
        } else {
            Err(ProvisionError::MissingCheckout { path: root })
        };
        self.report(&result);
        result
    }

    async fn fetch(&self, config: &HarnessConfig) -> Result<FixtureSet, ProvisionError> {
        let fixtures = &config.fixtures;
        let root = config.resolve(&fixtures.destination);
        if root.exists() {
            return Err(ProvisionError::DestinationExists { path: root });
        }

        let spec = fetch_spec(fixtures, &config.workdir);
        info!(
            repository = %fixtures.repository,
            destination = %root.display(),
            "fetching fixtures"
        );
        let status = self
            .executor
            .execute(&spec)
            .await
            .map_err(ProvisionError::Launch)?;
        if status != 0 {
            return Err(ProvisionError::FetchFailed {
                repository: fixtures.repository.clone(),
                status,
            });
        }
        if !root.exists() {
            return Err(ProvisionError::Incomplete { path: root });
        }

        Ok(FixtureSet {
            root,
            fetched: true,
        })
    }

    fn report(&self, result: &Result<FixtureSet, ProvisionError>) {
        match result {
            Ok(set) => {
                info!(root = %set.root.display(), fetched = set.fetched, "fixtures ready");
                self.events.try_emit(
                    event_types::FIXTURES_PROVISIONED,
                    Some(serde_json::json!({
                        "root": set.root,
                        "fetched": set.fetched,
                    })),
                );
            }
            Err(err) => {
                error!(error = %err, "fixture provisioning failed");
                self.events.try_emit(
                    event_types::FIXTURES_FAILED,
                    Some(serde_json::json!({ "error": err.to_string() })),
                );
            }
        }
    }
}
