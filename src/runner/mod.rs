//! Runner module - Execution abstraction layer
//!
//! This module provides a unified interface for running one program to a
//! terminal result:
//! - `ProcessSupervisor`: spawns the program directly, enforces the wall-clock
//!   deadline and samples peak memory while it runs
//! - `monitor`: procfs peak-RSS sampling used by the supervisor
//!
//! The runner module does NOT:
//! - Compare outputs or classify crashes
//! - Touch the persistent failure counter
//! - Know about languages or fixtures

pub mod monitor;
pub mod supervisor;

use async_trait::async_trait;
use serde::Serialize;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::time::Duration;

pub use supervisor::{ProcessSupervisor, SuperviseError};

/// Command specification for execution
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    /// Program path or name
    pub program: String,
    /// Arguments to the program
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(|a| a.into()).collect();
        self
    }

    /// Create from a command vector (first element is program, rest are args)
    pub fn from_vec(cmd: &[String]) -> Self {
        let mut iter = cmd.iter();
        let program = iter.next().cloned().unwrap_or_default();
        Self::new(program).with_args(iter.cloned())
    }

    /// Convert to a vector of strings (program + args)
    pub fn to_vec(&self) -> Vec<String> {
        let mut v = vec![self.program.clone()];
        v.extend(self.args.iter().cloned());
        v
    }
}

/// Where the child's stdin comes from
#[derive(Debug, Clone, Default)]
pub enum StdinSource {
    /// `/dev/null`
    #[default]
    Null,
    /// File handle bound directly as the child's stdin
    File(PathBuf),
}

/// Resource limits for execution
#[derive(Debug, Clone)]
pub struct RunLimits {
    /// Wall-clock limit measured from launch
    pub time_limit: Duration,
    /// Interval between peak-memory samples
    pub sample_interval: Duration,
}

impl RunLimits {
    pub fn new(time_limit: Duration) -> Self {
        Self {
            time_limit,
            ..Self::default()
        }
    }

    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(1),
            sample_interval: Duration::from_millis(1),
        }
    }
}

/// How a finished child terminated. Signal deaths stay distinct from exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ExitStatus {
    Code(i32),
    Signal(i32),
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        matches!(self, ExitStatus::Code(0))
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        match (status.code(), status.signal()) {
            (Some(code), _) => ExitStatus::Code(code),
            (None, Some(sig)) => ExitStatus::Signal(sig),
            // Stopped/continued statuses never reach us from wait()
            (None, None) => ExitStatus::Code(-1),
        }
    }
}

/// Terminal outcome of one supervised run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExecutionResult {
    /// Exited with code 0
    Completed {
        exit_code: i32,
        stdout: String,
        stderr: String,
        wall_time_ms: u64,
        peak_memory_kb: u64,
    },
    /// Nonzero exit or killed by a signal
    Crashed {
        status: ExitStatus,
        stderr: String,
        wall_time_ms: u64,
        peak_memory_kb: u64,
    },
    /// Killed after exceeding the wall-clock limit; output discarded
    TimedOut {
        wall_time_ms: u64,
        peak_memory_kb: u64,
    },
}

impl ExecutionResult {
    pub fn wall_time_ms(&self) -> u64 {
        match self {
            ExecutionResult::Completed { wall_time_ms, .. }
            | ExecutionResult::Crashed { wall_time_ms, .. }
            | ExecutionResult::TimedOut { wall_time_ms, .. } => *wall_time_ms,
        }
    }

    pub fn peak_memory_kb(&self) -> u64 {
        match self {
            ExecutionResult::Completed { peak_memory_kb, .. }
            | ExecutionResult::Crashed { peak_memory_kb, .. }
            | ExecutionResult::TimedOut { peak_memory_kb, .. } => *peak_memory_kb,
        }
    }

    /// Crashes and timeouts count against the persistent failure counter
    pub fn is_abnormal(&self) -> bool {
        !matches!(self, ExecutionResult::Completed { .. })
    }
}

/// Runner trait for executing programs
#[async_trait]
pub trait Runner: Send + Sync {
    /// Run a command to completion, crash or timeout
    async fn run(
        &self,
        cmd: &CommandSpec,
        stdin: &StdinSource,
        limits: &RunLimits,
    ) -> Result<ExecutionResult, SuperviseError>;
}
