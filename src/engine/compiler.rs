//! Build step
//!
//! Runs the toolchain's compile command once, through the same `Runner` the
//! fixtures use, and turns a failed build into a single diagnostic message.

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::engine::diagnostics::first_error;
use crate::languages::{BuildContext, LanguageConfig};
use crate::runner::{ExecutionResult, ExitStatus, RunLimits, Runner, StdinSource};

/// Result of a compilation attempt
#[derive(Debug, Clone, PartialEq)]
pub struct CompileResult {
    pub success: bool,
    /// Compiler exit code, when it exited on its own
    pub exit_code: Option<i32>,
    /// First diagnostic excerpt for a failed build
    pub message: Option<String>,
}

impl CompileResult {
    fn ok() -> Self {
        Self {
            success: true,
            exit_code: Some(0),
            message: None,
        }
    }
}

/// Compile the user's source; interpreted languages succeed trivially
pub async fn compile_user_code(
    runner: &dyn Runner,
    lang_config: &LanguageConfig,
    ctx: &BuildContext,
    limits: &RunLimits,
) -> Result<CompileResult> {
    let Some(spec) = lang_config.compile_spec(ctx) else {
        debug!("{} needs no build step", lang_config.name);
        return Ok(CompileResult::ok());
    };

    info!("Compiling {:?} with {:?}", ctx.source, spec.to_vec());

    let result = runner
        .run(&spec, &StdinSource::Null, limits)
        .await
        .with_context(|| format!("Failed to run compiler `{}`", spec.program))?;

    Ok(match result {
        ExecutionResult::Completed { .. } => CompileResult::ok(),
        ExecutionResult::Crashed { status, stderr, .. } => {
            let exit_code = match status {
                ExitStatus::Code(code) => Some(code),
                ExitStatus::Signal(_) => None,
            };
            let message = if !stderr.trim().is_empty() {
                first_error(&stderr, lang_config.diagnostics)
            } else {
                match status {
                    ExitStatus::Code(code) => format!("Compilation failed with exit code {}", code),
                    ExitStatus::Signal(sig) => format!("Compiler crashed (signal {})", sig),
                }
            };
            CompileResult {
                success: false,
                exit_code,
                message: Some(message),
            }
        }
        ExecutionResult::TimedOut { .. } => CompileResult {
            success: false,
            exit_code: None,
            message: Some(format!(
                "Compilation timed out after {:.1}s",
                limits.time_limit.as_secs_f64()
            )),
        },
    })
}
