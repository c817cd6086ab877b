//! Suite reporting
//!
//! The orchestrator pushes events into a `Reporter` as they happen. The
//! terminal reporter prints the classic colored transcript; the JSON reporter
//! stays silent until the end and emits the whole summary at once.

use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::core::{FailReason, Verdict};
use crate::engine::compiler::CompileResult;
use crate::judger::{FixtureReport, RunSummary};
use crate::runner::monitor::kb_to_mb;
use crate::runner::ExecutionResult;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD_RED: &str = "\x1b[1;31m";
const BOLD_YELLOW: &str = "\x1b[1;33m";
const BOLD_BLUE: &str = "\x1b[1;34m";
const BOLD_MAGENTA: &str = "\x1b[1;35m";
const BOLD_GREEN: &str = "\x1b[1;32m";
const RED_BANNER: &str = "\x1b[1;41m";

const RULE_WIDTH: usize = 40;
const NOTHING: &str = "<<nothing>>";

pub trait Reporter {
    fn build_started(&mut self, source: &Path, compiles: bool) -> io::Result<()>;
    fn build_failed(&mut self, build: &CompileResult) -> io::Result<()>;
    fn fixture_finished(&mut self, report: &FixtureReport) -> io::Result<()>;
    fn suite_finished(&mut self, summary: &RunSummary) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Terminal,
    Json,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "terminal" | "text" => Ok(ReportFormat::Terminal),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!("unknown report format `{}` (expected terminal|json)", other)),
        }
    }
}

/// Human-readable, colored transcript
pub struct TerminalReporter<W: Write> {
    out: W,
    time_limit: Duration,
}

impl<W: Write> TerminalReporter<W> {
    pub fn new(out: W, time_limit: Duration) -> Self {
        Self { out, time_limit }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn rule(&mut self, ch: char) -> io::Result<()> {
        writeln!(self.out, "{}", ch.to_string().repeat(RULE_WIDTH))
    }
}

impl<W: Write> Reporter for TerminalReporter<W> {
    fn build_started(&mut self, source: &Path, compiles: bool) -> io::Result<()> {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.display().to_string());
        if compiles {
            writeln!(self.out, "Compiling {}...", name)
        } else {
            writeln!(self.out, "Running {}...", name)
        }
    }

    fn build_failed(&mut self, build: &CompileResult) -> io::Result<()> {
        match build.exit_code {
            Some(code) => writeln!(
                self.out,
                "{}[!] COMPILATION FAILED (Exit Code: {}){}",
                BOLD_RED, code, RESET
            )?,
            None => writeln!(self.out, "{}[!] COMPILATION FAILED{}", BOLD_RED, RESET)?,
        }
        writeln!(
            self.out,
            "{}Critical Problem:{}\n   {}",
            BOLD_YELLOW,
            RESET,
            build.message.as_deref().unwrap_or("unknown build error")
        )
    }

    fn fixture_finished(&mut self, report: &FixtureReport) -> io::Result<()> {
        let name = &report.fixture.name;
        let stats = format!(
            "{}({}ms - {:.2} MB){}",
            CYAN,
            report.result.wall_time_ms(),
            kb_to_mb(report.result.peak_memory_kb()),
            RESET
        );

        match &report.verdict {
            Verdict::Pass => {
                writeln!(self.out, "{}✅ {}: PASS {}", GREEN, name, stats)?;
                self.rule('-')
            }
            Verdict::Fail(reason) => {
                self.rule('-')?;
                writeln!(self.out, "{}❌ {}: FAIL {}", RED, name, stats)?;
                match reason {
                    FailReason::Output { mismatch } => {
                        if mismatch.token.is_some() || mismatch.length.is_some() {
                            writeln!(self.out, "{}Mismatch:{} {}", BOLD, RESET, mismatch)?;
                        }
                        let expected = report.expected_output.as_deref().unwrap_or("").trim();
                        writeln!(self.out, "{}[Expected]{}\n{}", BOLD_BLUE, RESET, expected)?;
                        let actual = match &report.result {
                            ExecutionResult::Completed { stdout, .. } => stdout.trim(),
                            _ => "",
                        };
                        writeln!(
                            self.out,
                            "{}[Your Output]{}\n{}",
                            BOLD_MAGENTA,
                            RESET,
                            if actual.is_empty() { NOTHING } else { actual }
                        )?;
                    }
                    FailReason::MissingExpected { .. } => {
                        writeln!(self.out, "{}[!] {}{}", BOLD_RED, reason, RESET)?;
                    }
                }
                self.rule('-')
            }
            Verdict::Crash(category) => {
                writeln!(self.out, "{}💥 CRASH: {} | {}{}", RED, name, category, RESET)
            }
            Verdict::Timeout => writeln!(
                self.out,
                "{}⏳ TLE: {} > {}s{}",
                YELLOW,
                name,
                self.time_limit.as_secs_f64(),
                RESET
            ),
        }
    }

    fn suite_finished(&mut self, summary: &RunSummary) -> io::Result<()> {
        writeln!(self.out)?;
        self.rule('=')?;
        if summary.build_error.is_none() {
            writeln!(
                self.out,
                "{}Score: {}/{} tests passed{}",
                BOLD, summary.passed, summary.total, RESET
            )?;
        }
        writeln!(
            self.out,
            "{} 💀 CAREER DEATH TOLL: {} 💀 {}",
            RED_BANNER, summary.failure_count, RESET
        )?;
        if summary.all_passed() {
            writeln!(self.out, "{}🎉 ALL TESTS PASSED 🎉{}", BOLD_GREEN, RESET)?;
        }
        self.rule('=')?;
        self.out.flush()
    }
}

/// Machine-readable summary written once the suite is done
pub struct JsonReporter<W: Write> {
    out: W,
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for JsonReporter<W> {
    fn build_started(&mut self, _source: &Path, _compiles: bool) -> io::Result<()> {
        Ok(())
    }

    fn build_failed(&mut self, _build: &CompileResult) -> io::Result<()> {
        Ok(())
    }

    fn fixture_finished(&mut self, _report: &FixtureReport) -> io::Result<()> {
        Ok(())
    }

    fn suite_finished(&mut self, summary: &RunSummary) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut self.out, summary)?;
        writeln!(self.out)?;
        self.out.flush()
    }
}

/// Reporter for `format`, writing to `out`
pub fn make_reporter<'a, W: Write + 'a>(
    format: ReportFormat,
    out: W,
    time_limit: Duration,
) -> Box<dyn Reporter + 'a> {
    match format {
        ReportFormat::Terminal => Box::new(TerminalReporter::new(out, time_limit)),
        ReportFormat::Json => Box::new(JsonReporter::new(out)),
    }
}
