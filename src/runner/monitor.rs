//! Peak resident memory sampling
//!
//! Reads `VmHWM` from `/proc/<pid>/status`. The kernel already tracks the
//! high-water mark; `PeakTracker` additionally keeps the maximum across
//! samples so a vanished proc entry never lowers the reported peak.

use std::path::PathBuf;
use tracing::trace;

const PROC_ROOT: &str = "/proc";

/// Sample the peak resident set size of `pid` in KB.
///
/// Returns 0 when the entry is gone (child already reaped) or unreadable.
pub fn sample(pid: u32) -> u64 {
    let status_path = PathBuf::from(PROC_ROOT)
        .join(pid.to_string())
        .join("status");

    match std::fs::read_to_string(&status_path) {
        Ok(content) => parse_vm_hwm(&content).unwrap_or(0),
        Err(e) => {
            trace!("Memory sample for pid {} unavailable: {}", pid, e);
            0
        }
    }
}

/// Extract the `VmHWM:` value (KB) from a proc status file
pub fn parse_vm_hwm(content: &str) -> Option<u64> {
    content.lines().find_map(|line| {
        let mut parts = line.strip_prefix("VmHWM:")?.split_whitespace();
        let value = parts.next()?.parse::<u64>().ok()?;
        match parts.next() {
            Some("kB") | None => Some(value),
            Some(_) => None,
        }
    })
}

/// Running maximum over all samples of one child
#[derive(Debug, Default, Clone, Copy)]
pub struct PeakTracker {
    peak_kb: u64,
}

impl PeakTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one sample in; a failed sample (0) keeps the previous peak
    pub fn record(&mut self, sample_kb: u64) -> u64 {
        self.peak_kb = self.peak_kb.max(sample_kb);
        self.peak_kb
    }

    pub fn sample_pid(&mut self, pid: u32) -> u64 {
        self.record(sample(pid))
    }

    pub fn peak_kb(&self) -> u64 {
        self.peak_kb
    }
}

/// KB to MB for display (callers format with two decimals)
pub fn kb_to_mb(kb: u64) -> f64 {
    kb as f64 / 1024.0
}
