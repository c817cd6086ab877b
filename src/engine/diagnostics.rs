//! Compiler diagnostic extraction
//!
//! Pulls the first error out of a compiler's stderr together with the short
//! source excerpt that points at it.

use serde::{Deserialize, Serialize};

/// Continuation lines are indented under the headline when rendered
const EXCERPT_SEPARATOR: &str = "\n   ";

/// Diagnostic layout produced by a toolchain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticStyle {
    /// gcc / g++ / clang: `file:line:col: error: ...` followed by a source
    /// line and a `^~~~` marker line
    #[default]
    Gcc,
    /// javac: `File.java:line: error: ...`, source line, caret line
    Javac,
    /// rustc: `error[E....]: ...` followed by a `--> file:line:col` pointer
    Rustc,
}

/// First actionable error in `stderr`, or the whole (trimmed) stream when no
/// error line is recognised
pub fn first_error(stderr: &str, style: DiagnosticStyle) -> String {
    let lines: Vec<&str> = stderr.lines().collect();

    let report = match style {
        DiagnosticStyle::Gcc => gcc_error(&lines),
        DiagnosticStyle::Javac => javac_error(&lines),
        DiagnosticStyle::Rustc => rustc_error(&lines),
    };

    match report {
        Some(parts) => parts.join(EXCERPT_SEPARATOR),
        None => stderr.trim().to_string(),
    }
}

fn gcc_error(lines: &[&str]) -> Option<Vec<String>> {
    let idx = lines
        .iter()
        .position(|line| line.contains(": error:") || line.contains(": fatal error:"))?;
    let mut report = vec![lines[idx].trim().to_string()];

    // Marker line sits within the next few lines, just under the offending code
    let window_end = (idx + 5).min(lines.len());
    if let Some(marker) = (idx + 1..window_end).find(|&j| lines[j].contains('^') || lines[j].contains('~')) {
        if marker - 1 > idx {
            report.push(lines[marker - 1].trim().to_string());
        }
        report.push(lines[marker].trim().to_string());
    }

    Some(report)
}

fn javac_error(lines: &[&str]) -> Option<Vec<String>> {
    let idx = lines
        .iter()
        .position(|line| line.to_lowercase().contains(" error:"))?;
    let mut report = vec![lines[idx].trim().to_string()];

    if idx + 2 < lines.len() {
        report.push(lines[idx + 1].trim().to_string());
        report.push(lines[idx + 2].trim().to_string());
    }

    Some(report)
}

fn rustc_error(lines: &[&str]) -> Option<Vec<String>> {
    let idx = lines.iter().position(|line| {
        (line.starts_with("error:") || line.starts_with("error["))
            && !line.starts_with("error: aborting due to")
    })?;
    let mut report = vec![lines[idx].trim().to_string()];

    let window_end = (idx + 4).min(lines.len());
    if let Some(pointer) = lines[idx + 1..window_end]
        .iter()
        .find(|line| line.trim_start().starts_with("-->"))
    {
        report.push(pointer.trim().to_string());
    }

    Some(report)
}
