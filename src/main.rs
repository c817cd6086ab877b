mod checker;
mod config;
mod core;
mod counter;
mod engine;
mod judger;
mod languages;
mod report;
mod runner;

use anyhow::{Context, Result};
use std::process::ExitCode;
use tracing::{debug, error, info};

use crate::config::HarnessConfig;
use crate::counter::FileCounter;
use crate::judger::{run_suite, RunSummary, SuiteJob};
use crate::runner::{ProcessSupervisor, RunLimits};

const EXIT_FAILED: u8 = 1;
const EXIT_HARNESS_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr, the report owns stdout
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("harness=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(summary) if summary.is_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(EXIT_FAILED),
        Err(e) => {
            error!("Harness error: {:#}", e);
            ExitCode::from(EXIT_HARNESS_ERROR)
        }
    }
}

async fn run() -> Result<RunSummary> {
    dotenvy::dotenv().ok();

    languages::init_languages()?;
    let config = HarnessConfig::from_env()?;

    let source = config.source_path();
    if !source.is_file() {
        anyhow::bail!("Source file {:?} not found", source);
    }

    let language = match &config.language {
        Some(name) => languages::get_language_config(name)
            .ok_or_else(|| anyhow::anyhow!("Unsupported language: {}", name))?,
        None => languages::detect_language(&source).with_context(|| {
            format!("Cannot infer language from {:?}; set HARNESS_LANGUAGE", source)
        })?,
    };
    info!("Using {} toolchain for {:?}", language.name, source);

    let job = SuiteJob {
        language,
        source,
        tests_dir: config.tests_dir(),
        output_dir: config.output_dir(),
        limits: RunLimits::new(config.time_limit).with_sample_interval(config.sample_interval),
        compile_limits: RunLimits::new(config.compile_time_limit)
            .with_sample_interval(config.sample_interval),
        compare_mode: config.compare_mode,
    };

    let mut counter = FileCounter::new(config.counter_path());
    debug!("Failure counter at {:?}", counter.path());
    let mut reporter =
        report::make_reporter(config.report_format, std::io::stdout(), config.time_limit);

    run_suite(&job, &ProcessSupervisor::new(), &mut counter, reporter.as_mut()).await
}
