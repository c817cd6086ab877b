//! Harness configuration from the environment
//!
//! Every setting has a default so a bare invocation works against the
//! conventional `~/Documents/Coding_C++` layout.

use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::checker::CompareMode;
use crate::report::ReportFormat;

const DEFAULT_BASE_DIR: &str = "~/Documents/Coding_C++";
const DEFAULT_SOURCE: &str = "coding.cpp";
const DEFAULT_TIME_LIMIT_SECS: f64 = 1.0;
const DEFAULT_COMPILE_TIME_LIMIT_SECS: f64 = 30.0;
const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 1;

const TESTS_DIR: &str = "Tests";
const OUTPUT_DIR: &str = "Output";
const COUNTER_FILE: &str = "death_toll.txt";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub base_dir: PathBuf,
    /// Source file name, relative to `base_dir` unless absolute
    pub source: PathBuf,
    /// Toolchain name; inferred from the source extension when unset
    pub language: Option<String>,
    pub time_limit: Duration,
    pub compile_time_limit: Duration,
    pub sample_interval: Duration,
    pub compare_mode: CompareMode,
    pub report_format: ReportFormat,
}

impl HarnessConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let home = lookup("HOME");
        let base_dir = expand_home(
            &var("HARNESS_BASE_DIR").unwrap_or_else(|| DEFAULT_BASE_DIR.into()),
            home.as_deref(),
        );
        let source = PathBuf::from(var("HARNESS_SOURCE").unwrap_or_else(|| DEFAULT_SOURCE.into()));
        let language = var("HARNESS_LANGUAGE").map(|l| l.trim().to_lowercase());

        let time_limit = match var("HARNESS_TIME_LIMIT") {
            Some(v) => parse_seconds("HARNESS_TIME_LIMIT", &v)?,
            None => Duration::from_secs_f64(DEFAULT_TIME_LIMIT_SECS),
        };
        let compile_time_limit = match var("HARNESS_COMPILE_TIME_LIMIT") {
            Some(v) => parse_seconds("HARNESS_COMPILE_TIME_LIMIT", &v)?,
            None => Duration::from_secs_f64(DEFAULT_COMPILE_TIME_LIMIT_SECS),
        };
        let sample_interval = match var("HARNESS_SAMPLE_INTERVAL_MS") {
            Some(v) => match v.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => {
                    return Err(invalid(
                        "HARNESS_SAMPLE_INTERVAL_MS",
                        &v,
                        "expected a positive integer",
                    ))
                }
            },
            None => Duration::from_millis(DEFAULT_SAMPLE_INTERVAL_MS),
        };
        let compare_mode = match var("HARNESS_COMPARE_MODE") {
            Some(v) => v
                .parse::<CompareMode>()
                .map_err(|reason| invalid("HARNESS_COMPARE_MODE", &v, reason))?,
            None => CompareMode::default(),
        };
        let report_format = match var("HARNESS_REPORT_FORMAT") {
            Some(v) => v
                .parse::<ReportFormat>()
                .map_err(|reason| invalid("HARNESS_REPORT_FORMAT", &v, reason))?,
            None => ReportFormat::default(),
        };

        Ok(Self {
            base_dir,
            source,
            language,
            time_limit,
            compile_time_limit,
            sample_interval,
            compare_mode,
            report_format,
        })
    }

    pub fn source_path(&self) -> PathBuf {
        self.base_dir.join(&self.source)
    }

    pub fn tests_dir(&self) -> PathBuf {
        self.base_dir.join(TESTS_DIR)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.base_dir.join(OUTPUT_DIR)
    }

    pub fn counter_path(&self) -> PathBuf {
        self.output_dir().join(COUNTER_FILE)
    }
}

fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_seconds(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let secs: f64 = value
        .trim()
        .parse()
        .map_err(|_| invalid(key, value, "expected seconds as a number"))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(invalid(key, value, "must be positive"));
    }
    Duration::try_from_secs_f64(secs).map_err(|_| invalid(key, value, "too large"))
}

fn expand_home(path: &str, home: Option<&str>) -> PathBuf {
    match (path.strip_prefix('~'), home) {
        (Some(rest), Some(home)) if rest.is_empty() || rest.starts_with('/') => {
            Path::new(home).join(rest.trim_start_matches('/'))
        }
        _ => PathBuf::from(path),
    }
}
