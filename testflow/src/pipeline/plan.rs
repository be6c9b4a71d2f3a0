//! Building the ordered stage lists for a run.

use super::{OutputSink, StageSpec};
use crate::config::{HarnessConfig, RunMode};
use crate::core::StageKind;
use crate::errors::ConfigError;
use crate::provision::FixtureSet;
use std::path::Path;

/// Name of the unit-test stage.
pub const UNIT_STAGE: &str = "unit-tests";
/// Name of the integration-test stage.
pub const INTEGRATION_STAGE: &str = "integration-tests";
/// Name of the coverage summary sub-stage.
pub const COVERAGE_SUMMARY_STAGE: &str = "coverage-report";
/// Name of the HTML coverage sub-stage.
pub const COVERAGE_HTML_STAGE: &str = "coverage-html";
/// Name of the style-check sub-stage.
pub const STYLE_STAGE: &str = "codestyle";

/// The stages of one run, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePlan {
    /// The mode the plan was built for.
    pub mode: RunMode,
    /// Stages whose outcomes feed the exit status.
    pub mandatory: Vec<StageSpec>,
    /// Best-effort report sub-stages; empty in plain mode.
    pub reporting: Vec<StageSpec>,
}

impl StagePlan {
    /// Builds the plan for `mode` from `config`, pointing the integration
    /// stage at `fixtures`.
    ///
    /// # Errors
    ///
    /// Returns an error if any resulting stage is invalid.
    pub fn build(
        config: &HarnessConfig,
        mode: RunMode,
        fixtures: &FixtureSet,
    ) -> Result<Self, ConfigError> {
        let mandatory = vec![
            unit_stage(config, mode),
            integration_stage(config, mode, fixtures),
        ];
        let reporting = if mode.is_coverage() {
            report_stages(config)
        } else {
            Vec::new()
        };

        let plan = Self {
            mode,
            mandatory,
            reporting,
        };
        for spec in plan.stages() {
            spec.validate()?;
        }
        Ok(plan)
    }

    /// Iterates over every stage, mandatory first.
    pub fn stages(&self) -> impl Iterator<Item = &StageSpec> {
        self.mandatory.iter().chain(self.reporting.iter())
    }

    /// Renders the plan as numbered lines.
    #[must_use]
    pub fn describe(&self) -> Vec<String> {
        self.stages()
            .enumerate()
            .map(|(index, spec)| {
                format!(
                    "{:>2}. {} [{}] {}",
                    index + 1,
                    spec.name,
                    spec.policy,
                    spec.command_line()
                )
            })
            .collect()
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn unit_stage(config: &HarnessConfig, mode: RunMode) -> StageSpec {
    let unit = &config.unit;
    let spec = match mode {
        RunMode::Plain => StageSpec::from_command(UNIT_STAGE, StageKind::UnitTest, &unit.plain),
        // Style checks move to the report phase when coverage is on.
        RunMode::WithCoverage => {
            StageSpec::from_command(UNIT_STAGE, StageKind::UnitTest, &unit.coverage)
                .with_env(&unit.skip_style_flag.name, &unit.skip_style_flag.value)
        }
    };
    spec.in_dir(&config.workdir)
}

fn integration_stage(config: &HarnessConfig, mode: RunMode, fixtures: &FixtureSet) -> StageSpec {
    let integration = &config.integration;
    let workdir = &config.workdir;
    StageSpec::new(
        INTEGRATION_STAGE,
        StageKind::Integration,
        path_arg(&fixtures.locate(workdir, &integration.runner)),
    )
    .with_args([
        path_arg(integration.entry_point(mode)),
        path_arg(&fixtures.locate(workdir, &integration.case_dir)),
        path_arg(&integration.output_dir),
    ])
    .in_dir(&config.workdir)
}

fn report_stages(config: &HarnessConfig) -> Vec<StageSpec> {
    let report = &config.report;
    vec![
        StageSpec::from_command(
            COVERAGE_SUMMARY_STAGE,
            StageKind::CoverageSummary,
            &report.coverage_summary,
        ),
        StageSpec::from_command(COVERAGE_HTML_STAGE, StageKind::CoverageHtml, &report.coverage_html)
            .with_arg(path_arg(&report.html_dir)),
        StageSpec::from_command(STYLE_STAGE, StageKind::StyleCheck, &report.style_check)
            .with_output(OutputSink::File(report.style_report.clone())),
    ]
    .into_iter()
    .map(|spec| spec.best_effort().in_dir(&config.workdir))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StagePolicy;
    use pretty_assertions::assert_eq;

    fn build(config: &HarnessConfig, mode: RunMode) -> StagePlan {
        StagePlan::build(config, mode, &FixtureSet::expected(config)).unwrap()
    }

    fn names(specs: &[StageSpec]) -> Vec<&str> {
        specs.iter().map(|spec| spec.name.as_str()).collect()
    }

    #[test]
    fn test_plain_plan() {
        let plan = build(&HarnessConfig::default(), RunMode::Plain);

        assert_eq!(names(&plan.mandatory), vec![UNIT_STAGE, INTEGRATION_STAGE]);
        assert!(plan.reporting.is_empty());

        let unit = &plan.mandatory[0];
        assert_eq!(unit.program, "py.test-3");
        assert_eq!(unit.args, vec!["-v"]);
        assert!(unit.env.is_empty());
    }

    #[test]
    fn test_coverage_plan() {
        let plan = build(&HarnessConfig::default(), RunMode::WithCoverage);

        assert_eq!(names(&plan.mandatory), vec![UNIT_STAGE, INTEGRATION_STAGE]);
        assert_eq!(
            names(&plan.reporting),
            vec![COVERAGE_SUMMARY_STAGE, COVERAGE_HTML_STAGE, STYLE_STAGE]
        );
        assert!(plan.reporting.iter().all(|spec| spec.policy == StagePolicy::BestEffort));
        assert!(plan.mandatory.iter().all(|spec| spec.policy == StagePolicy::Mandatory));
    }

    #[test]
    fn test_coverage_unit_stage_gets_skip_flag() {
        let plan = build(&HarnessConfig::default(), RunMode::WithCoverage);
        let unit = &plan.mandatory[0];

        assert_eq!(unit.program, "python3-coverage");
        assert_eq!(unit.env.get("TEST_FLAGS").map(String::as_str), Some("nocodestyle"));
    }

    #[test]
    fn test_integration_entry_point_follows_mode() {
        let config = HarnessConfig::default();
        let plain = build(&config, RunMode::Plain);
        let coverage = build(&config, RunMode::WithCoverage);

        assert_eq!(
            plain.mandatory[1].args,
            vec!["./britney.py", "britney2-tests/t", "test-out"]
        );
        assert_eq!(
            coverage.mandatory[1].args,
            vec!["./ci/britney-coverage.sh", "britney2-tests/t", "test-out"]
        );
        assert_eq!(plain.mandatory[1].program, "britney2-tests/bin/runtests");
    }

    #[test]
    fn test_integration_stage_follows_acquired_fixtures() {
        let config = HarnessConfig::default().with_workdir("/srv/project");
        let moved = FixtureSet {
            root: "/srv/project/fx".into(),
            fetched: true,
        };
        let plan = StagePlan::build(&config, RunMode::Plain, &moved).unwrap();
        assert_eq!(plan.mandatory[1].program, "fx/bin/runtests");
        assert_eq!(plan.mandatory[1].args, vec!["./britney.py", "fx/t", "test-out"]);

        let outside = FixtureSet {
            root: "/cache/britney2-tests".into(),
            fetched: false,
        };
        let plan = StagePlan::build(&config, RunMode::Plain, &outside).unwrap();
        assert_eq!(plan.mandatory[1].program, "/cache/britney2-tests/bin/runtests");
        assert_eq!(plan.mandatory[1].args[1], "/cache/britney2-tests/t");
    }

    #[test]
    fn test_report_stage_arguments() {
        let plan = build(&HarnessConfig::default(), RunMode::WithCoverage);

        assert_eq!(plan.reporting[1].args, vec!["html", "-d", "coverage"]);
        assert_eq!(
            plan.reporting[2].output,
            OutputSink::File("codestyle/codestyle.txt".into())
        );
    }

    #[test]
    fn test_every_stage_runs_in_workdir() {
        let config = HarnessConfig::default().with_workdir("/srv/project");
        let plan = build(&config, RunMode::WithCoverage);

        assert!(plan
            .stages()
            .all(|spec| spec.working_dir.as_deref() == Some(Path::new("/srv/project"))));
    }

    #[test]
    fn test_plan_is_deterministic() {
        let config = HarnessConfig::default();
        assert_eq!(
            build(&config, RunMode::WithCoverage),
            build(&config, RunMode::WithCoverage)
        );
    }

    #[test]
    fn test_describe() {
        let plan = build(&HarnessConfig::default(), RunMode::Plain);
        let lines = plan.describe();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("unit-tests [mandatory] py.test-3 -v"));
    }
}
