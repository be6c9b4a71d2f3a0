//! Harness configuration.
//!
//! [`RunMode`] is chosen once from the command line. [`HarnessConfig`]
//! describes every external collaborator the harness invokes; all of its
//! fields have defaults, so a JSON config file only needs to name what it
//! overrides.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// The command-line value that selects [`RunMode::WithCoverage`].
pub const COVERAGE_FLAG: &str = "--with-coverage";

/// The run configuration: which stage variants run and whether reports follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Run the code under test directly; never produce reports.
    #[default]
    Plain,
    /// Instrument the code under test and produce reports on success.
    WithCoverage,
}

impl RunMode {
    /// Derives the mode from the single optional command-line argument.
    ///
    /// Only [`COVERAGE_FLAG`] selects coverage; absence or any other value
    /// selects plain mode.
    #[must_use]
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            Some(COVERAGE_FLAG) => Self::WithCoverage,
            _ => Self::Plain,
        }
    }

    /// Returns true if coverage instrumentation is active.
    #[must_use]
    pub fn is_coverage(self) -> bool {
        matches!(self, Self::WithCoverage)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::WithCoverage => write!(f, "with-coverage"),
        }
    }
}

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLine {
    /// The program to run.
    pub program: String,
    /// Arguments passed to the program.
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandLine {
    /// Creates a command line.
    #[must_use]
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// An environment variable exported to one child process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvFlag {
    /// Variable name.
    pub name: String,
    /// Variable value.
    pub value: String,
}

/// Where the fixture set comes from and where it lands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureConfig {
    /// Repository or location of the fixture set.
    #[serde(default = "default_fixture_repository")]
    pub repository: String,
    /// Optional revision (branch or tag) to fetch.
    #[serde(default)]
    pub revision: Option<String>,
    /// Destination, relative to the working directory.
    #[serde(default = "default_fixture_destination")]
    pub destination: PathBuf,
    /// Fetch command; the revision, repository and destination are appended.
    #[serde(default = "default_fetch_command")]
    pub fetch: CommandLine,
}

fn default_fixture_repository() -> String {
    "https://salsa.debian.org/debian/britney2-tests.git".to_string()
}

fn default_fixture_destination() -> PathBuf {
    PathBuf::from("britney2-tests")
}

fn default_fetch_command() -> CommandLine {
    CommandLine::new("git", ["clone"])
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            repository: default_fixture_repository(),
            revision: None,
            destination: default_fixture_destination(),
            fetch: default_fetch_command(),
        }
    }
}

/// The unit-test stage in both modes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStageConfig {
    /// Command used in plain mode.
    #[serde(default = "default_unit_plain")]
    pub plain: CommandLine,
    /// Coverage-instrumented command used in coverage mode.
    #[serde(default = "default_unit_coverage")]
    pub coverage: CommandLine,
    /// Flag exported in coverage mode so the suite skips its style checks.
    #[serde(default = "default_skip_style_flag")]
    pub skip_style_flag: EnvFlag,
}

fn default_unit_plain() -> CommandLine {
    CommandLine::new("py.test-3", ["-v"])
}

fn default_unit_coverage() -> CommandLine {
    CommandLine::new("python3-coverage", ["run", "-m", "pytest", "-v"])
}

fn default_skip_style_flag() -> EnvFlag {
    EnvFlag {
        name: "TEST_FLAGS".to_string(),
        value: "nocodestyle".to_string(),
    }
}

impl Default for UnitStageConfig {
    fn default() -> Self {
        Self {
            plain: default_unit_plain(),
            coverage: default_unit_coverage(),
            skip_style_flag: default_skip_style_flag(),
        }
    }
}

/// The integration-test stage: `runner <entry-point> <fixture-root> <output-dir>`.
///
/// `runner` and `case_dir` live inside the fixture checkout and are resolved
/// against wherever provisioning put it. An absolute path is used as is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationStageConfig {
    /// The test-suite runner, relative to the fixture checkout.
    #[serde(default = "default_runner")]
    pub runner: PathBuf,
    /// Entry point of the code under test in plain mode.
    #[serde(default = "default_plain_entry_point")]
    pub plain_entry_point: PathBuf,
    /// Instrumentation shim around the entry point in coverage mode.
    #[serde(default = "default_coverage_entry_point")]
    pub coverage_entry_point: PathBuf,
    /// Test cases, relative to the fixture checkout.
    #[serde(default = "default_case_dir")]
    pub case_dir: PathBuf,
    /// Directory for per-test artifacts.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_runner() -> PathBuf {
    PathBuf::from("bin/runtests")
}

fn default_plain_entry_point() -> PathBuf {
    PathBuf::from("./britney.py")
}

fn default_coverage_entry_point() -> PathBuf {
    PathBuf::from("./ci/britney-coverage.sh")
}

fn default_case_dir() -> PathBuf {
    PathBuf::from("t")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("test-out")
}

impl Default for IntegrationStageConfig {
    fn default() -> Self {
        Self {
            runner: default_runner(),
            plain_entry_point: default_plain_entry_point(),
            coverage_entry_point: default_coverage_entry_point(),
            case_dir: default_case_dir(),
            output_dir: default_output_dir(),
        }
    }
}

impl IntegrationStageConfig {
    /// Returns the entry point for the given mode.
    #[must_use]
    pub fn entry_point(&self, mode: RunMode) -> &Path {
        match mode {
            RunMode::Plain => &self.plain_entry_point,
            RunMode::WithCoverage => &self.coverage_entry_point,
        }
    }
}

/// The best-effort report sub-stages run after a successful coverage run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Prints the textual coverage summary.
    #[serde(default = "default_coverage_summary")]
    pub coverage_summary: CommandLine,
    /// Exports HTML coverage; `html_dir` is appended.
    #[serde(default = "default_coverage_html")]
    pub coverage_html: CommandLine,
    /// Artifact directory for the HTML export.
    #[serde(default = "default_html_dir")]
    pub html_dir: PathBuf,
    /// Style checker; its output is written to `style_report`.
    #[serde(default = "default_style_check")]
    pub style_check: CommandLine,
    /// Artifact file for the style-check output.
    #[serde(default = "default_style_report")]
    pub style_report: PathBuf,
}

fn default_coverage_summary() -> CommandLine {
    CommandLine::new("python3-coverage", ["report"])
}

fn default_coverage_html() -> CommandLine {
    CommandLine::new("python3-coverage", ["html", "-d"])
}

fn default_html_dir() -> PathBuf {
    PathBuf::from("coverage")
}

fn default_style_check() -> CommandLine {
    CommandLine::new(
        "pycodestyle",
        ["--config=setup.cfg", "--count", "--show-source", "britney.py", "britney2"],
    )
}

fn default_style_report() -> PathBuf {
    PathBuf::from("codestyle/codestyle.txt")
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            coverage_summary: default_coverage_summary(),
            coverage_html: default_coverage_html(),
            html_dir: default_html_dir(),
            style_check: default_style_check(),
            style_report: default_style_report(),
        }
    }
}

/// Complete harness configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Directory every stage runs in; relative paths resolve against it.
    #[serde(default = "default_workdir")]
    pub workdir: PathBuf,
    /// Fixture provisioning.
    #[serde(default)]
    pub fixtures: FixtureConfig,
    /// Unit-test stage.
    #[serde(default)]
    pub unit: UnitStageConfig,
    /// Integration-test stage.
    #[serde(default)]
    pub integration: IntegrationStageConfig,
    /// Report sub-stages.
    #[serde(default)]
    pub report: ReportConfig,
}

fn default_workdir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            workdir: default_workdir(),
            fixtures: FixtureConfig::default(),
            unit: UnitStageConfig::default(),
            integration: IntegrationStageConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// result fails [`HarnessConfig::validate`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if given, otherwise returns the defaults.
    ///
    /// # Errors
    ///
    /// Same as [`HarnessConfig::load`].
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Sets the working directory.
    #[must_use]
    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }

    /// Sets the fixture configuration.
    #[must_use]
    pub fn with_fixtures(mut self, fixtures: FixtureConfig) -> Self {
        self.fixtures = fixtures;
        self
    }

    /// Sets the unit-test stage configuration.
    #[must_use]
    pub fn with_unit(mut self, unit: UnitStageConfig) -> Self {
        self.unit = unit;
        self
    }

    /// Sets the integration-test stage configuration.
    #[must_use]
    pub fn with_integration(mut self, integration: IntegrationStageConfig) -> Self {
        self.integration = integration;
        self
    }

    /// Sets the report configuration.
    #[must_use]
    pub fn with_report(mut self, report: ReportConfig) -> Self {
        self.report = report;
        self
    }

    /// Resolves a path against the working directory.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workdir.join(path)
        }
    }

    /// Checks that every command names a program.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidStage`] naming the first empty command.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let commands = [
            ("fixtures", &self.fixtures.fetch),
            ("unit-tests (plain)", &self.unit.plain),
            ("unit-tests (coverage)", &self.unit.coverage),
            ("coverage-report", &self.report.coverage_summary),
            ("coverage-html", &self.report.coverage_html),
            ("codestyle", &self.report.style_check),
        ];
        for (stage, command) in commands {
            if command.program.trim().is_empty() {
                return Err(ConfigError::invalid_stage(stage, "program cannot be empty"));
            }
        }
        if self.integration.runner.as_os_str().is_empty() {
            return Err(ConfigError::invalid_stage(
                "integration-tests",
                "runner cannot be empty",
            ));
        }
        if self.fixtures.repository.trim().is_empty() {
            return Err(ConfigError::invalid_stage("fixtures", "repository cannot be empty"));
        }
        Ok(())
    }
}
