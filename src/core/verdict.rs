use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::checker::Mismatch;
use crate::engine::classifier::FailureCategory;

/// Why a cleanly exited fixture did not pass
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailReason {
    /// Output differs from the expected file
    Output { mismatch: Mismatch },
    /// The expected file is missing or unreadable
    MissingExpected { path: PathBuf },
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailReason::Output { mismatch } => write!(f, "{}", mismatch),
            FailReason::MissingExpected { path } => {
                write!(f, "expected output {} is missing", path.display())
            }
        }
    }
}

/// Verdict for one fixture
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "verdict", content = "detail", rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail(FailReason),
    Crash(FailureCategory),
    Timeout,
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Pass => "PASS",
            Verdict::Fail(_) => "FAIL",
            Verdict::Crash(_) => "CRASH",
            Verdict::Timeout => "TIMEOUT",
        };
        write!(f, "{}", s)
    }
}
