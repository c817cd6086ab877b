//! Process supervisor
//!
//! Owns the lifecycle of one child: spawn with redirected stdio, wait on exit
//! bounded by the wall-clock deadline while sampling peak memory, SIGKILL on
//! deadline, and collect the terminal `ExecutionResult`.

use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use super::monitor::PeakTracker;
use super::{CommandSpec, ExecutionResult, ExitStatus, RunLimits, Runner, StdinSource};

/// How long stdio pumps may keep draining after the child has exited
const DRAIN_GRACE: Duration = Duration::from_millis(100);

/// Deadline used when the time limit does not fit in an `Instant`
const FAR_DEADLINE: Duration = Duration::from_secs(86_400 * 365 * 30);

#[derive(Debug, Error)]
pub enum SuperviseError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to open stdin source {}: {source}", path.display())]
    Stdin {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to wait for child {pid}: {source}")]
    Wait {
        pid: u32,
        #[source]
        source: io::Error,
    },
    #[error("failed to kill child {pid}: {source}")]
    Kill {
        pid: u32,
        #[source]
        source: Errno,
    },
}

/// Runner that executes programs directly on the host
#[derive(Debug, Default, Clone)]
pub struct ProcessSupervisor;

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self
    }

    /// Run a program until it exits or its deadline passes
    pub async fn execute(
        &self,
        cmd: &CommandSpec,
        stdin: &StdinSource,
        limits: &RunLimits,
    ) -> Result<ExecutionResult, SuperviseError> {
        debug!(
            "Supervising {:?} (limit {:?})",
            cmd.to_vec(),
            limits.time_limit
        );

        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match stdin {
            StdinSource::Null => {
                command.stdin(Stdio::null());
            }
            StdinSource::File(path) => {
                let file = std::fs::File::open(path).map_err(|source| SuperviseError::Stdin {
                    path: path.clone(),
                    source,
                })?;
                command.stdin(Stdio::from(file));
            }
        }

        let started = Instant::now();
        let deadline = started
            .checked_add(limits.time_limit)
            .unwrap_or(started + FAR_DEADLINE);

        let mut child = command.spawn().map_err(|source| SuperviseError::Spawn {
            program: cmd.program.clone(),
            source,
        })?;
        // Unset only once the child has been reaped
        let Some(pid) = child.id() else {
            return Err(SuperviseError::Spawn {
                program: cmd.program.clone(),
                source: io::Error::new(io::ErrorKind::Other, "child reaped before its pid was read"),
            });
        };

        let stdout_task = child.stdout.take().map(spawn_drain);
        let stderr_task = child.stderr.take().map(spawn_drain);

        let mut peak = PeakTracker::new();
        let mut ticker = tokio::time::interval(limits.sample_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let exited = loop {
            tokio::select! {
                biased;
                status = child.wait() => {
                    break Some(status.map_err(|source| SuperviseError::Wait { pid, source })?);
                }
                _ = sleep_until(deadline) => break None,
                _ = ticker.tick() => {
                    peak.sample_pid(pid);
                }
            }
        };
        let wall_time_ms = elapsed_ms(started);

        let Some(status) = exited else {
            terminate(pid)?;
            child
                .wait()
                .await
                .map_err(|source| SuperviseError::Wait { pid, source })?;

            for task in [stdout_task, stderr_task].into_iter().flatten() {
                task.abort();
            }

            debug!("Child {} killed after {}ms", pid, wall_time_ms);
            return Ok(ExecutionResult::TimedOut {
                wall_time_ms,
                peak_memory_kb: peak.peak_kb(),
            });
        };

        let drain_until = deadline.max(Instant::now() + DRAIN_GRACE);
        let stdout = collect(stdout_task, drain_until).await;
        let stderr = collect(stderr_task, drain_until).await;

        let status = ExitStatus::from(status);
        debug!(
            "Child {} finished: status={:?}, time={}ms, peak={}kb",
            pid,
            status,
            wall_time_ms,
            peak.peak_kb()
        );

        Ok(if status.success() {
            ExecutionResult::Completed {
                exit_code: 0,
                stdout,
                stderr,
                wall_time_ms,
                peak_memory_kb: peak.peak_kb(),
            }
        } else {
            ExecutionResult::Crashed {
                status,
                stderr,
                wall_time_ms,
                peak_memory_kb: peak.peak_kb(),
            }
        })
    }
}

#[async_trait]
impl Runner for ProcessSupervisor {
    async fn run(
        &self,
        cmd: &CommandSpec,
        stdin: &StdinSource,
        limits: &RunLimits,
    ) -> Result<ExecutionResult, SuperviseError> {
        self.execute(cmd, stdin, limits).await
    }
}

/// SIGKILL the child. The pid is not reaped yet, so it cannot have been
/// reused; ESRCH only means the child is already gone.
pub fn terminate(pid: u32) -> Result<(), SuperviseError> {
    // pid 0 would signal our own process group
    let raw = match i32::try_from(pid) {
        Ok(raw) if raw > 0 => raw,
        _ => return Ok(()),
    };
    match kill(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) => Ok(()),
        Err(Errno::ESRCH) => {
            debug!("Child {} exited before SIGKILL", pid);
            Ok(())
        }
        Err(source) => Err(SuperviseError::Kill { pid, source }),
    }
}

fn spawn_drain<R>(mut reader: R) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Err(e) = reader.read_to_end(&mut buf).await {
            trace!("Output pipe read failed: {}", e);
        }
        buf
    })
}

async fn collect(task: Option<JoinHandle<Vec<u8>>>, until: Instant) -> String {
    let Some(mut task) = task else {
        return String::new();
    };
    match timeout_at(until, &mut task).await {
        Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
        Ok(Err(e)) => {
            warn!("Output reader task failed: {}", e);
            String::new()
        }
        Err(_) => {
            task.abort();
            warn!("Output pipe still held open after child exit, discarding");
            String::new()
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio_test::{assert_err, assert_ok};

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh").with_args(["-c", script])
    }

    fn limits(ms: u64) -> RunLimits {
        RunLimits::new(Duration::from_millis(ms))
    }

    fn input_file(content: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file
    }

    #[tokio::test]
    async fn test_completed_echoes_stdin() {
        let supervisor = ProcessSupervisor::new();
        let input = input_file(b"1 2 3\n");
        let stdin = StdinSource::File(input.path().to_path_buf());

        let result = assert_ok!(supervisor.execute(&sh("cat"), &stdin, &limits(5000)).await);

        match result {
            ExecutionResult::Completed {
                exit_code, stdout, ..
            } => {
                assert_eq!(exit_code, 0);
                assert_eq!(stdout, "1 2 3\n");
            }
            other => panic!("expected Completed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stdin_bound_to_file() {
        let input = input_file(b"hello from fixture");

        let supervisor = ProcessSupervisor::new();
        let stdin = StdinSource::File(input.path().to_path_buf());
        let result = supervisor
            .execute(&sh("cat; echo oops >&2"), &stdin, &limits(5000))
            .await
            .unwrap();

        match result {
            ExecutionResult::Completed { stdout, stderr, .. } => {
                assert_eq!(stdout, "hello from fixture");
                assert_eq!(stderr, "oops\n");
            }
            other => panic!("expected Completed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_crash() {
        let supervisor = ProcessSupervisor::new();
        let result = supervisor
            .execute(&sh("echo boom >&2; exit 3"), &StdinSource::Null, &limits(5000))
            .await
            .unwrap();

        assert_eq!(
            result,
            ExecutionResult::Crashed {
                status: ExitStatus::Code(3),
                stderr: "boom\n".to_string(),
                wall_time_ms: result.wall_time_ms(),
                peak_memory_kb: result.peak_memory_kb(),
            }
        );
    }

    #[tokio::test]
    async fn test_signal_death_is_distinct_from_exit_code() {
        let supervisor = ProcessSupervisor::new();
        let result = supervisor
            .execute(&sh("kill -SEGV $$"), &StdinSource::Null, &limits(5000))
            .await
            .unwrap();

        match result {
            ExecutionResult::Crashed { status, .. } => assert_eq!(status, ExitStatus::Signal(11)),
            other => panic!("expected Crashed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_kills_within_bounded_overshoot() {
        let supervisor = ProcessSupervisor::new();
        let started = std::time::Instant::now();
        let result = supervisor
            .execute(
                &CommandSpec::new("sleep").with_args(["10"]),
                &StdinSource::Null,
                &limits(200),
            )
            .await
            .unwrap();

        assert!(matches!(result, ExecutionResult::TimedOut { .. }));
        assert!(result.wall_time_ms() >= 200);
        assert!(started.elapsed() < std::time::Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_timeout_discards_partial_output() {
        let supervisor = ProcessSupervisor::new();
        let result = supervisor
            .execute(&sh("echo partial; exec sleep 10"), &StdinSource::Null, &limits(200))
            .await
            .unwrap();

        assert_eq!(
            result,
            ExecutionResult::TimedOut {
                wall_time_ms: result.wall_time_ms(),
                peak_memory_kb: result.peak_memory_kb(),
            }
        );
    }

    #[tokio::test]
    async fn test_large_output_does_not_deadlock() {
        let supervisor = ProcessSupervisor::new();
        let result = supervisor
            .execute(
                &sh("head -c 1048576 /dev/zero"),
                &StdinSource::Null,
                &limits(5000),
            )
            .await
            .unwrap();

        match result {
            ExecutionResult::Completed { stdout, .. } => assert_eq!(stdout.len(), 1_048_576),
            other => panic!("expected Completed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_child_ignoring_stdin() {
        let supervisor = ProcessSupervisor::new();
        let input = input_file(&vec![b'x'; 1 << 20]);
        let stdin = StdinSource::File(input.path().to_path_buf());
        let result = supervisor
            .execute(&sh("exit 0"), &stdin, &limits(5000))
            .await
            .unwrap();

        assert!(!result.is_abnormal());
    }

    #[tokio::test]
    async fn test_memory_is_sampled() {
        let supervisor = ProcessSupervisor::new();
        let result = supervisor
            .execute(&sh("sleep 0.2"), &StdinSource::Null, &limits(5000))
            .await
            .unwrap();

        assert!(result.peak_memory_kb() > 0);
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let supervisor = ProcessSupervisor::new();
        let err = assert_err!(
            supervisor
                .execute(
                    &CommandSpec::new("/nonexistent/solution"),
                    &StdinSource::Null,
                    &limits(1000),
                )
                .await
        );

        assert!(matches!(err, SuperviseError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_missing_stdin_file() {
        let supervisor = ProcessSupervisor::new();
        let stdin = StdinSource::File(PathBuf::from("/nonexistent/input1.txt"));
        let err = supervisor
            .execute(&sh("cat"), &stdin, &limits(1000))
            .await
            .unwrap_err();

        assert!(matches!(err, SuperviseError::Stdin { .. }));
    }

    #[tokio::test]
    async fn test_unbounded_time_limit() {
        let supervisor = ProcessSupervisor::new();
        let result = supervisor
            .execute(
                &sh("echo ok"),
                &StdinSource::Null,
                &RunLimits::new(Duration::MAX),
            )
            .await
            .unwrap();

        match result {
            ExecutionResult::Completed { stdout, .. } => assert_eq!(stdout, "ok\n"),
            other => panic!("expected Completed, got {:?}", other),
        }
    }

    #[test]
    fn test_terminate_never_signals_own_group() {
        assert!(terminate(0).is_ok());
        assert!(terminate(u32::MAX).is_ok());
    }

    #[test]
    fn test_terminate_exited_child_is_noop() {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();

        assert!(terminate(pid).is_ok());
    }
}
