//! Command-line entry point for the testflow harness.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser;
use testflow::config::{HarnessConfig, RunMode};
use testflow::errors::TestflowError;
use testflow::harness::{Harness, FATAL_EXIT_CODE};
use testflow::observability::{init_logging, LogFormat};
use testflow::provision::fetch_spec;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "testflow")]
#[command(about = "Run the unit and integration suites and report coverage", long_about = None)]
struct Cli {
    #[arg(
        allow_hyphen_values = true,
        help = "Run mode; `--with-coverage` enables coverage, anything else runs plain"
    )]
    mode: Option<String>,

    #[arg(long = "with-coverage", help = "Run with coverage and, if every suite passes, report")]
    with_coverage: bool,

    #[arg(long, help = "Harness configuration file (JSON)")]
    config: Option<PathBuf>,

    #[arg(long, help = "Working directory for every stage (overrides config)")]
    workdir: Option<PathBuf>,

    #[arg(long, help = "Write a JSON run summary to this path")]
    summary: Option<PathBuf>,

    #[arg(long, help = "Reuse the existing fixture checkout instead of fetching")]
    skip_fixtures: bool,

    #[arg(long, help = "Print the stage plan and exit without running anything")]
    dry_run: bool,

    #[arg(long, default_value = "text", help = "Log format: text or json")]
    log_format: LogFormat,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_logging(cli.log_format) {
        eprintln!("testflow: {err}");
    }

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            if let Some(TestflowError::Provision(provision)) = err.downcast_ref::<TestflowError>() {
                error!(error = %provision, "aborting run before any stage");
                if let Some(hint) = provision.hint() {
                    info!("{hint}");
                }
            } else {
                error!(error = ?err, "testflow failed");
            }
            ExitCode::from(u8::try_from(FATAL_EXIT_CODE).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    let mode = if cli.with_coverage {
        RunMode::WithCoverage
    } else {
        RunMode::from_arg(cli.mode.as_deref())
    };
    let mut config = HarnessConfig::load_or_default(cli.config.as_deref())
        .context("loading harness configuration")?;
    if let Some(workdir) = cli.workdir {
        config = config.with_workdir(workdir);
    }

    let mut harness = Harness::new(config.clone(), mode);
    if cli.skip_fixtures {
        harness = harness.reuse_fixtures();
    }

    if cli.dry_run {
        let plan = harness.plan().context("building stage plan")?;
        if cli.skip_fixtures {
            println!(" -. fixtures [reuse] {}", config.resolve(&config.fixtures.destination).display());
        } else {
            println!(
                " -. fixtures [fatal] {}",
                fetch_spec(&config.fixtures, &config.workdir).command_line()
            );
        }
        for line in plan.describe() {
            println!("{line}");
        }
        return Ok(0);
    }

    let report = harness.run().await?;
    if let Some(path) = &cli.summary {
        match report.write_summary(path) {
            Ok(()) => info!(path = %path.display(), "run summary written"),
            Err(err) => warn!(path = %path.display(), error = %err, "cannot write run summary"),
        }
    }

    Ok(report.aggregate.exit_byte())
}
