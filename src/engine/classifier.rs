//! Crash classification
//!
//! Maps a crashed child's exit status and stderr onto a small, uniform set of
//! failure categories. Runtime-reported exceptions are matched first (they are
//! more specific than the OS signal that follows them), then the signal table,
//! then the plain exit code.

use nix::sys::signal::Signal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::runner::ExitStatus;

/// Human-readable failure reason for a crashed fixture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "category", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureCategory {
    OutOfMemory,
    OutOfRange,
    SegmentationFault,
    FloatingPointError,
    StackOverflow,
    Aborted,
    IllegalInstruction,
    UnknownSignal(i32),
    NonzeroExit(i32),
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCategory::OutOfMemory => write!(f, "OUT OF MEMORY"),
            FailureCategory::OutOfRange => write!(f, "OUT OF RANGE"),
            FailureCategory::SegmentationFault => write!(f, "SEGMENTATION FAULT"),
            FailureCategory::FloatingPointError => write!(f, "FLOATING POINT ERROR"),
            FailureCategory::StackOverflow => write!(f, "STACK OVERFLOW"),
            FailureCategory::Aborted => write!(f, "ABORTED (Assertion/Corruption)"),
            FailureCategory::IllegalInstruction => write!(f, "ILLEGAL INSTRUCTION"),
            FailureCategory::UnknownSignal(sig) => match Signal::try_from(*sig) {
                Ok(signal) => write!(f, "SIGNAL {} ({})", sig, signal.as_str()),
                Err(_) => write!(f, "SIGNAL {}", sig),
            },
            FailureCategory::NonzeroExit(code) => write!(f, "EXIT CODE {}", code),
        }
    }
}

/// What produced the child, selecting which stderr markers apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Runtime {
    #[default]
    Native,
    Rust,
    Java,
    Python,
}

type MarkerTable = &'static [(&'static str, FailureCategory)];

const NATIVE_MARKERS: MarkerTable = &[
    ("std::bad_alloc", FailureCategory::OutOfMemory),
    ("std::out_of_range", FailureCategory::OutOfRange),
];

// Panics exit with 101; aborts (stack overflow, allocation failure) raise SIGABRT
const RUST_MARKERS: MarkerTable = &[
    ("memory allocation of", FailureCategory::OutOfMemory),
    ("index out of bounds", FailureCategory::OutOfRange),
    ("has overflowed its stack", FailureCategory::StackOverflow),
    ("attempt to divide by zero", FailureCategory::FloatingPointError),
    (
        "attempt to calculate the remainder with a divisor of zero",
        FailureCategory::FloatingPointError,
    ),
    (
        "called `Option::unwrap()` on a `None` value",
        FailureCategory::SegmentationFault,
    ),
];

const JAVA_MARKERS: MarkerTable = &[
    ("java.lang.OutOfMemoryError", FailureCategory::OutOfMemory),
    ("ArrayIndexOutOfBoundsException", FailureCategory::OutOfRange),
    ("StringIndexOutOfBoundsException", FailureCategory::OutOfRange),
    ("IndexOutOfBoundsException", FailureCategory::OutOfRange),
    ("NullPointerException", FailureCategory::SegmentationFault),
    ("ArithmeticException: / by zero", FailureCategory::FloatingPointError),
    ("StackOverflowError", FailureCategory::StackOverflow),
];

const PYTHON_MARKERS: MarkerTable = &[
    ("MemoryError", FailureCategory::OutOfMemory),
    ("IndexError", FailureCategory::OutOfRange),
    ("ZeroDivisionError", FailureCategory::FloatingPointError),
    ("RecursionError", FailureCategory::StackOverflow),
    ("AttributeError: 'NoneType'", FailureCategory::SegmentationFault),
];

const SIGNAL_TABLE: &[(Signal, FailureCategory)] = &[
    (Signal::SIGSEGV, FailureCategory::SegmentationFault),
    (Signal::SIGFPE, FailureCategory::FloatingPointError),
    (Signal::SIGABRT, FailureCategory::Aborted),
    (Signal::SIGILL, FailureCategory::IllegalInstruction),
];

impl Runtime {
    /// Ordered stderr markers; first match wins
    pub fn markers(self) -> MarkerTable {
        match self {
            Runtime::Native => NATIVE_MARKERS,
            Runtime::Rust => RUST_MARKERS,
            Runtime::Java => JAVA_MARKERS,
            Runtime::Python => PYTHON_MARKERS,
        }
    }
}

/// Classify a crashed run
pub fn classify(status: ExitStatus, stderr: &str, runtime: Runtime) -> FailureCategory {
    if let Some(category) = match_marker(stderr, runtime.markers()) {
        return category;
    }

    match status {
        ExitStatus::Signal(sig) => {
            category_for_signal(sig).unwrap_or(FailureCategory::UnknownSignal(sig))
        }
        // Shells and some launchers report a signal death as 128 + n
        ExitStatus::Code(code) => code
            .checked_sub(128)
            .and_then(category_for_signal)
            .unwrap_or(FailureCategory::NonzeroExit(code)),
    }
}

fn match_marker(stderr: &str, markers: MarkerTable) -> Option<FailureCategory> {
    markers
        .iter()
        .find(|(pattern, _)| stderr.contains(pattern))
        .map(|(_, category)| *category)
}

fn category_for_signal(sig: i32) -> Option<FailureCategory> {
    SIGNAL_TABLE
        .iter()
        .find(|(signal, _)| *signal as i32 == sig)
        .map(|(_, category)| *category)
}
