//! Configuration fixtures for tests that spawn real processes.

use std::path::Path;

use crate::config::{CommandLine, FixtureConfig, HarnessConfig};

/// Builds a [`HarnessConfig`] whose commands are small `sh -c` scripts.
///
/// Every stage defaults to `exit 0`. The fixture "fetch" creates the
/// destination with a case directory and a `bin/runtests` that hands its
/// arguments to `sh`, so the entry point is executed as a shell script.
#[derive(Debug, Clone)]
pub struct ShellHarness {
    config: HarnessConfig,
}

fn shell(script: &str) -> CommandLine {
    CommandLine::new("sh", ["-c", script, "sh"])
}

const FETCH_SCRIPT: &str = r##"mkdir -p "$2/bin" "$2/t" &&
printf '#!/bin/sh\nexec sh "$@"\n' > "$2/bin/runtests" &&
chmod +x "$2/bin/runtests""##;

impl ShellHarness {
    /// Creates a passing shell harness rooted at `workdir`.
    #[must_use]
    pub fn new(workdir: &Path) -> Self {
        let mut config = HarnessConfig::default().with_workdir(workdir);
        config.fixtures = FixtureConfig {
            repository: "fixtures.git".to_string(),
            revision: None,
            destination: "fixtures".into(),
            // $1 is the repository, $2 the destination.
            fetch: shell(FETCH_SCRIPT),
        };
        config.unit.plain = shell("exit 0");
        config.unit.coverage = shell("exit 0");
        config.integration.plain_entry_point = "entry.sh".into();
        config.integration.coverage_entry_point = "entry.sh".into();
        config.report.coverage_summary = shell("exit 0");
        config.report.coverage_html = shell(r#"mkdir -p "$1""#);
        config.report.style_check = shell("exit 0");
        Self { config }
    }

    /// Sets the unit stage script for both modes.
    #[must_use]
    pub fn unit(mut self, script: &str) -> Self {
        self.config.unit.plain = shell(script);
        self.config.unit.coverage = shell(script);
        self
    }

    /// Sets the fixture fetch script.
    #[must_use]
    pub fn fetch(mut self, script: &str) -> Self {
        self.config.fixtures.fetch = shell(script);
        self
    }

    /// Sets the style-check script.
    #[must_use]
    pub fn style(mut self, script: &str) -> Self {
        self.config.report.style_check = shell(script);
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn build(self) -> HarnessConfig {
        self.config
    }
}
