//! End-to-end scenarios for harness runs.

#[cfg(test)]
mod tests {
    use crate::config::{FixtureConfig, HarnessConfig, RunMode};
    use crate::errors::{ProvisionError, TestflowError};
    use crate::events::{event_types, CollectingEventSink, EventSink};
    use crate::harness::Harness;
    use crate::pipeline::{
        COVERAGE_HTML_STAGE, COVERAGE_SUMMARY_STAGE, INTEGRATION_STAGE, STYLE_STAGE, UNIT_STAGE,
    };
    use crate::provision::FETCH_STAGE;
    use crate::report::ReportDecision;
    use crate::testing::{
        assert_exit_code, assert_not_reported, assert_reported, assert_stage_order,
        assert_stage_status, ScriptedExecutor,
    };
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::TempDir;

    // Fetch succeeds by creating the destination it was given.
    fn fetching(executor: ScriptedExecutor) -> ScriptedExecutor {
        executor.with_effect(FETCH_STAGE, |spec| {
            let dest = spec.args.last().map(PathBuf::from).unwrap_or_default();
            let dir = spec.working_dir.clone().unwrap_or_default();
            std::fs::create_dir_all(dir.join(dest)).unwrap();
        })
    }

    struct Scenario {
        dir: TempDir,
        executor: Arc<ScriptedExecutor>,
        events: Arc<CollectingEventSink>,
    }

    impl Scenario {
        fn new(executor: ScriptedExecutor) -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
                executor: Arc::new(fetching(executor)),
                events: Arc::new(CollectingEventSink::new()),
            }
        }

        fn config(&self) -> HarnessConfig {
            HarnessConfig::default().with_workdir(self.dir.path())
        }

        fn harness(&self, mode: RunMode) -> Harness {
            self.harness_with(self.config(), mode)
        }

        fn harness_with(&self, config: HarnessConfig, mode: RunMode) -> Harness {
            Harness::new(config, mode)
                .with_executor(self.executor.clone())
                .with_event_sink(self.events.clone())
        }

        fn stages_run(&self) -> Vec<String> {
            self.executor
                .stage_names()
                .into_iter()
                .filter(|name| name != FETCH_STAGE)
                .collect()
        }
    }

    #[tokio::test]
    async fn test_plain_success() {
        let scenario = Scenario::new(ScriptedExecutor::new());

        let report = scenario.harness(RunMode::Plain).run().await.unwrap();

        assert_exit_code(&report, 0);
        assert_stage_order(&report.outcomes, &[UNIT_STAGE, INTEGRATION_STAGE]);
        assert_not_reported(&report);
        assert_eq!(report.report.decision, ReportDecision::SkippedPlainMode);
        assert_eq!(scenario.stages_run(), vec![UNIT_STAGE, INTEGRATION_STAGE]);
    }

    #[tokio::test]
    async fn test_unit_failure_does_not_stop_integration() {
        let scenario = Scenario::new(ScriptedExecutor::new().with_status(UNIT_STAGE, 1));

        let report = scenario.harness(RunMode::WithCoverage).run().await.unwrap();

        assert_exit_code(&report, 1);
        assert_stage_status(&report.outcomes, UNIT_STAGE, 1);
        assert_stage_status(&report.outcomes, INTEGRATION_STAGE, 0);
        assert_not_reported(&report);
        assert_eq!(report.report.decision, ReportDecision::SkippedFailedRun);
        assert_eq!(scenario.stages_run(), vec![UNIT_STAGE, INTEGRATION_STAGE]);
    }

    #[tokio::test]
    async fn test_last_failure_wins() {
        let scenario = Scenario::new(
            ScriptedExecutor::new()
                .with_status(UNIT_STAGE, 2)
                .with_status(INTEGRATION_STAGE, 1),
        );

        let report = scenario.harness(RunMode::Plain).run().await.unwrap();

        assert_exit_code(&report, 1);
        assert_eq!(report.failures.failed_stages(), 2);
        assert_eq!(report.failures.describe(), "unit-tests (exit 2), integration-tests (exit 1)");
    }

    #[tokio::test]
    async fn test_earlier_failure_survives_later_success() {
        let scenario = Scenario::new(ScriptedExecutor::new().with_status(UNIT_STAGE, 4));

        let report = scenario.harness(RunMode::Plain).run().await.unwrap();
        assert_exit_code(&report, 4);
    }

    #[tokio::test]
    async fn test_coverage_reports_ignore_failures() {
        let scenario = Scenario::new(ScriptedExecutor::new().with_status(STYLE_STAGE, 1));

        let report = scenario.harness(RunMode::WithCoverage).run().await.unwrap();

        assert_exit_code(&report, 0);
        assert_reported(&report);
        assert_eq!(
            scenario.stages_run(),
            vec![
                UNIT_STAGE,
                INTEGRATION_STAGE,
                COVERAGE_SUMMARY_STAGE,
                COVERAGE_HTML_STAGE,
                STYLE_STAGE
            ]
        );
        for stage in [COVERAGE_SUMMARY_STAGE, COVERAGE_HTML_STAGE, STYLE_STAGE] {
            assert_eq!(scenario.executor.call_count(stage), 1, "{stage} should run once");
        }
        assert!(report.outcomes.get(STYLE_STAGE).is_none());
    }

    #[tokio::test]
    async fn test_coverage_mode_skips_style_in_unit_stage() {
        let scenario = Scenario::new(ScriptedExecutor::new());

        scenario.harness(RunMode::WithCoverage).run().await.unwrap();

        let unit = scenario.executor.call(UNIT_STAGE).unwrap();
        assert_eq!(unit.env.get("TEST_FLAGS").map(String::as_str), Some("nocodestyle"));
        let integration = scenario.executor.call(INTEGRATION_STAGE).unwrap();
        assert!(integration.env.is_empty());
    }

    #[tokio::test]
    async fn test_launch_failure_is_recorded_not_fatal() {
        let scenario = Scenario::new(ScriptedExecutor::new().with_launch_failure(UNIT_STAGE));

        let report = scenario.harness(RunMode::Plain).run().await.unwrap();

        assert_stage_status(&report.outcomes, UNIT_STAGE, 127);
        assert_exit_code(&report, 127);
        assert_eq!(scenario.stages_run(), vec![UNIT_STAGE, INTEGRATION_STAGE]);
    }

    #[tokio::test]
    async fn test_provisioning_failure_aborts_before_any_stage() {
        let scenario = Scenario::new(ScriptedExecutor::new().with_status(FETCH_STAGE, 128));

        let err = scenario.harness(RunMode::WithCoverage).run().await.unwrap_err();

        assert!(matches!(
            err,
            TestflowError::Provision(ProvisionError::FetchFailed { status: 128, .. })
        ));
        assert!(scenario.stages_run().is_empty());
        assert!(scenario.events.with_prefix("stage.").is_empty());
        assert!(scenario.events.with_prefix(event_types::RUN_COMPLETED).is_empty());
    }

    #[tokio::test]
    async fn test_existing_checkout_is_fatal_unless_reused() {
        let scenario = Scenario::new(ScriptedExecutor::new());
        std::fs::create_dir(scenario.dir.path().join("britney2-tests")).unwrap();

        let err = scenario.harness(RunMode::Plain).run().await.unwrap_err();
        assert!(matches!(
            err,
            TestflowError::Provision(ProvisionError::DestinationExists { .. })
        ));
        assert!(scenario.executor.calls().is_empty());

        let report = scenario
            .harness(RunMode::Plain)
            .reuse_fixtures()
            .run()
            .await
            .unwrap();
        assert_exit_code(&report, 0);
        assert_eq!(scenario.executor.call_count(FETCH_STAGE), 0);
    }

    #[tokio::test]
    async fn test_lifecycle_events() {
        let scenario = Scenario::new(ScriptedExecutor::new());

        scenario.harness(RunMode::Plain).run().await.unwrap();

        let types = scenario.events.event_types();
        assert_eq!(types.first().map(String::as_str), Some(event_types::RUN_STARTED));
        assert_eq!(types.last().map(String::as_str), Some(event_types::RUN_COMPLETED));
        assert_eq!(scenario.events.with_prefix(event_types::FIXTURES_PROVISIONED).len(), 1);
        assert_eq!(scenario.events.with_prefix(event_types::REPORT_SKIPPED).len(), 1);
    }

    #[tokio::test]
    async fn test_integration_stage_runs_from_fetched_destination() {
        let scenario = Scenario::new(ScriptedExecutor::new());
        let config = scenario.config().with_fixtures(FixtureConfig {
            destination: "fx".into(),
            ..FixtureConfig::default()
        });

        let report = scenario.harness_with(config, RunMode::Plain).run().await.unwrap();

        assert_exit_code(&report, 0);
        assert!(scenario.dir.path().join("fx").is_dir());
        assert!(!scenario.dir.path().join("britney2-tests").exists());
        let integration = scenario.executor.call(INTEGRATION_STAGE).unwrap();
        assert_eq!(integration.program, "fx/bin/runtests");
        assert_eq!(integration.args, vec!["./britney.py", "fx/t", "test-out"]);
    }

    #[tokio::test]
    async fn test_reused_destination_feeds_integration_stage() {
        let scenario = Scenario::new(ScriptedExecutor::new());
        std::fs::create_dir(scenario.dir.path().join("fx")).unwrap();
        let config = scenario.config().with_fixtures(FixtureConfig {
            destination: "fx".into(),
            ..FixtureConfig::default()
        });

        scenario
            .harness_with(config, RunMode::WithCoverage)
            .reuse_fixtures()
            .run()
            .await
            .unwrap();

        let integration = scenario.executor.call(INTEGRATION_STAGE).unwrap();
        assert_eq!(integration.program, "fx/bin/runtests");
        assert_eq!(integration.args[1], "fx/t");
    }

    /// Records only events delivered through the awaited path.
    #[derive(Default)]
    struct AwaitedSink {
        delivered: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EventSink for AwaitedSink {
        async fn emit(&self, event_type: &str, _data: Option<serde_json::Value>) {
            self.delivered.lock().push(event_type.to_string());
        }

        fn try_emit(&self, _event_type: &str, _data: Option<serde_json::Value>) {}
    }

    #[tokio::test]
    async fn test_run_and_report_events_are_awaited() {
        let scenario = Scenario::new(ScriptedExecutor::new());
        let sink = Arc::new(AwaitedSink::default());

        Harness::new(scenario.config(), RunMode::Plain)
            .with_executor(scenario.executor.clone())
            .with_event_sink(sink.clone())
            .run()
            .await
            .unwrap();

        let delivered = sink.delivered.lock().clone();
        assert_eq!(delivered.first().map(String::as_str), Some(event_types::RUN_STARTED));
        assert_eq!(delivered.last().map(String::as_str), Some(event_types::RUN_COMPLETED));
        assert!(delivered.iter().any(|event| event == event_types::REPORT_SKIPPED));
    }

    #[tokio::test]
    async fn test_summary_written() {
        let scenario = Scenario::new(ScriptedExecutor::new().with_status(INTEGRATION_STAGE, 3));
        let report = scenario.harness(RunMode::WithCoverage).run().await.unwrap();
        let path = scenario.dir.path().join("summary.json");

        report.write_summary(&path).unwrap();

        let summary: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(summary["exit_code"], 3);
        assert_eq!(summary["mode"], "with-coverage");
        assert_eq!(summary["outcomes"].as_array().map(Vec::len), Some(2));
        assert_eq!(summary["failures"][0]["stage"], INTEGRATION_STAGE);
        assert_eq!(summary["report"]["decision"], "skipped_failed_run");
    }

    #[cfg(unix)]
    mod processes {
        use super::*;
        use crate::testing::ShellHarness;
        use pretty_assertions::assert_eq;

        fn workdir(entry: &str) -> TempDir {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join("entry.sh"), entry).unwrap();
            dir
        }

        fn run(config: HarnessConfig, mode: RunMode) -> Result<crate::harness::RunReport, TestflowError> {
            tokio_test::block_on(Harness::new(config, mode).run())
        }

        #[test]
        fn test_real_plain_run_reports_unit_failure() {
            let dir = workdir("test -d \"$1\" || exit 9\nexit 0\n");
            let config = ShellHarness::new(dir.path()).unit("exit 3").build();

            let report = run(config, RunMode::Plain).unwrap();

            assert_exit_code(&report, 3);
            assert_stage_status(&report.outcomes, INTEGRATION_STAGE, 0);
            assert!(dir.path().join("fixtures").is_dir());
        }

        #[test]
        fn test_real_coverage_run_writes_reports() {
            let dir = workdir("exit 0\n");
            let config = ShellHarness::new(dir.path())
                .style("echo 'britney.py:1:80: E501 line too long'; echo 1; exit 1")
                .build();

            let report = run(config, RunMode::WithCoverage).unwrap();

            assert_exit_code(&report, 0);
            assert_reported(&report);
            assert!(report.report.artifacts.iter().all(|artifact| artifact.present));
            assert_eq!(report.report.style_violations, Some(1));

            let style = std::fs::read_to_string(dir.path().join("codestyle/codestyle.txt")).unwrap();
            assert!(style.contains("E501"));
        }

        #[test]
        fn test_real_fetch_failure_is_fatal() {
            let dir = workdir("exit 0\n");
            let config = ShellHarness::new(dir.path())
                .fetch("exit 128")
                .unit("touch unit-ran")
                .build();

            let err = run(config, RunMode::Plain).unwrap_err();

            assert!(matches!(err, TestflowError::Provision(_)));
            assert!(!dir.path().join("unit-ran").exists());
        }
    }
}
