//! Judger module - runs a whole fixture suite
//!
//! Builds the source once, supervises every fixture in order, classifies
//! crashes or compares output, keeps the failure counter current and drives
//! the reporter. Only a failed build stops the suite early.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::checker::{compare, CompareMode, ComparisonOutcome};
use crate::core::{discover, FailReason, Fixture, Verdict};
use crate::counter::FailureCounter;
use crate::engine::classifier::{classify, Runtime};
use crate::engine::compiler::compile_user_code;
use crate::languages::{BuildContext, LanguageConfig};
use crate::report::Reporter;
use crate::runner::{ExecutionResult, RunLimits, Runner, StdinSource};

/// Everything needed to run one suite
#[derive(Debug, Clone)]
pub struct SuiteJob {
    pub language: LanguageConfig,
    pub source: PathBuf,
    pub tests_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Per-fixture limits
    pub limits: RunLimits,
    /// Limits for the build step
    pub compile_limits: RunLimits,
    pub compare_mode: CompareMode,
}

/// Outcome of one fixture
#[derive(Debug, Clone, Serialize)]
pub struct FixtureReport {
    pub fixture: Fixture,
    pub result: ExecutionResult,
    pub verdict: Verdict,
    /// Expected output as read from disk, kept for the FAIL display
    #[serde(skip)]
    pub expected_output: Option<String>,
}

/// Aggregate of one invocation, in fixture order
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub fixtures: Vec<FixtureReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_error: Option<String>,
    /// Crashes and timeouts across every invocation so far
    pub failure_count: u64,
}

impl RunSummary {
    /// Build succeeded and nothing failed
    pub fn is_success(&self) -> bool {
        self.build_error.is_none() && self.passed == self.total
    }

    /// At least one fixture and every one passed
    pub fn all_passed(&self) -> bool {
        self.is_success() && self.total > 0
    }
}

/// Run a fixture suite
pub async fn run_suite(
    job: &SuiteJob,
    runner: &dyn Runner,
    counter: &mut dyn FailureCounter,
    reporter: &mut dyn Reporter,
) -> Result<RunSummary> {
    let ctx = BuildContext::new(&job.source, &job.output_dir);

    std::fs::create_dir_all(&job.output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", job.output_dir))?;

    reporter.build_started(&job.source, job.language.compile_command.is_some())?;

    let build = compile_user_code(runner, &job.language, &ctx, &job.compile_limits).await?;
    if !build.success {
        warn!("Build failed for {:?}", job.source);
        reporter.build_failed(&build)?;

        let summary = RunSummary {
            total: 0,
            passed: 0,
            fixtures: vec![],
            build_error: Some(build.message.unwrap_or_else(|| "Build failed".to_string())),
            failure_count: current_count(counter),
        };
        reporter.suite_finished(&summary)?;
        return Ok(summary);
    }

    let fixtures = discover(&job.tests_dir)?;
    let run_spec = job.language.run_spec(&ctx);

    let mut reports = Vec::with_capacity(fixtures.len());
    let mut passed = 0;

    for fixture in fixtures {
        let stdin = StdinSource::File(fixture.input.clone());
        let result = runner
            .run(&run_spec, &stdin, &job.limits)
            .await
            .with_context(|| format!("Failed to run fixture {}", fixture.name))?;

        if result.is_abnormal() {
            if let Err(e) = counter.increment_and_save() {
                warn!("Could not record failure for {}: {}", fixture.name, e);
            }
        }

        let (verdict, expected_output) =
            judge_result(&fixture, &result, job.compare_mode, job.language.runtime);
        if verdict.is_pass() {
            passed += 1;
        }

        let report = FixtureReport {
            fixture,
            result,
            verdict,
            expected_output,
        };
        reporter.fixture_finished(&report)?;
        reports.push(report);
    }

    let summary = RunSummary {
        total: reports.len(),
        passed,
        fixtures: reports,
        build_error: None,
        failure_count: current_count(counter),
    };

    info!(
        "Suite summary: source={:?}, passed={}/{}, failure_count={}",
        job.source, summary.passed, summary.total, summary.failure_count
    );

    reporter.suite_finished(&summary)?;
    Ok(summary)
}

/// Turn one execution result into a verdict
fn judge_result(
    fixture: &Fixture,
    result: &ExecutionResult,
    mode: CompareMode,
    runtime: Runtime,
) -> (Verdict, Option<String>) {
    match result {
        ExecutionResult::Completed { stdout, .. } => {
            match std::fs::read_to_string(&fixture.expected) {
                Ok(expected) => {
                    let verdict = match compare(&expected, stdout, mode) {
                        ComparisonOutcome::Pass => Verdict::Pass,
                        ComparisonOutcome::Fail(mismatch) => {
                            Verdict::Fail(FailReason::Output { mismatch })
                        }
                    };
                    (verdict, Some(expected))
                }
                Err(e) => {
                    error!(
                        "Expected output {:?} for {} unreadable: {}",
                        fixture.expected, fixture.name, e
                    );
                    let reason = FailReason::MissingExpected {
                        path: fixture.expected.clone(),
                    };
                    (Verdict::Fail(reason), None)
                }
            }
        }
        ExecutionResult::Crashed { status, stderr, .. } => {
            (Verdict::Crash(classify(*status, stderr, runtime)), None)
        }
        ExecutionResult::TimedOut { .. } => (Verdict::Timeout, None),
    }
}

fn current_count(counter: &dyn FailureCounter) -> u64 {
    counter.load().unwrap_or_else(|e| {
        warn!("{}", e);
        0
    })
}
