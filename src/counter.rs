//! Persistent failure counter
//!
//! A single ASCII integer counting every crash and timeout ever observed.
//! The orchestrator receives it as a `FailureCounter` so tests can swap in
//! the in-memory implementation.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum CounterError {
    #[error("failed to read failure counter {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write failure counter {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub trait FailureCounter: Send {
    /// Current count without modifying it
    fn load(&self) -> Result<u64, CounterError>;

    /// Add one and persist immediately; returns the new count
    fn increment_and_save(&mut self) -> Result<u64, CounterError>;
}

/// Counter stored as a file, overwritten on every update
#[derive(Debug, Clone)]
pub struct FileCounter {
    path: PathBuf,
}

impl FileCounter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FailureCounter for FileCounter {
    fn load(&self) -> Result<u64, CounterError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(source) => {
                return Err(CounterError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Ok(0);
        }
        Ok(trimmed.parse().unwrap_or_else(|_| {
            warn!("Failure counter {:?} is not a number, restarting from 0", self.path);
            0
        }))
    }

    fn increment_and_save(&mut self) -> Result<u64, CounterError> {
        let count = self.load()?.saturating_add(1);
        std::fs::write(&self.path, count.to_string()).map_err(|source| CounterError::Write {
            path: self.path.clone(),
            source,
        })?;
        debug!("Failure counter {:?} now {}", self.path, count);
        Ok(count)
    }
}

/// Counter that lives for one process
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct MemoryCounter {
    count: u64,
}

#[cfg(test)]
impl MemoryCounter {
    pub fn new(count: u64) -> Self {
        Self { count }
    }
}

#[cfg(test)]
impl FailureCounter for MemoryCounter {
    fn load(&self) -> Result<u64, CounterError> {
        Ok(self.count)
    }

    fn increment_and_save(&mut self) -> Result<u64, CounterError> {
        self.count += 1;
        Ok(self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_file_reads_zero() {
        let dir = tempfile::tempdir().unwrap();
        let counter = FileCounter::new(dir.path().join("death_toll.txt"));

        assert_eq!(counter.load().unwrap(), 0);
    }

    #[test]
    fn test_increment_overwrites_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("death_toll.txt");
        let mut counter = FileCounter::new(&path);

        assert_eq!(counter.increment_and_save().unwrap(), 1);
        assert_eq!(counter.increment_and_save().unwrap(), 2);
        assert_eq!(fs::read_to_string(&path).unwrap(), "2");
    }

    #[test]
    fn test_count_survives_new_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("death_toll.txt");

        for _ in 0..3 {
            FileCounter::new(&path).increment_and_save().unwrap();
        }

        assert_eq!(FileCounter::new(&path).load().unwrap(), 3);
    }

    #[test]
    fn test_garbage_restarts_from_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("death_toll.txt");
        fs::write(&path, "lots\n").unwrap();

        let mut counter = FileCounter::new(&path);
        assert_eq!(counter.load().unwrap(), 0);
        assert_eq!(counter.increment_and_save().unwrap(), 1);
    }

    #[test]
    fn test_trailing_newline_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("death_toll.txt");
        fs::write(&path, "41\n").unwrap();

        assert_eq!(FileCounter::new(&path).increment_and_save().unwrap(), 42);
    }

    #[test]
    fn test_unwritable_location() {
        let dir = tempfile::tempdir().unwrap();
        let mut counter = FileCounter::new(dir.path().join("missing").join("death_toll.txt"));

        assert!(matches!(
            counter.increment_and_save(),
            Err(CounterError::Write { .. })
        ));
    }

    #[test]
    fn test_memory_counter() {
        let mut counter = MemoryCounter::new(5);
        counter.increment_and_save().unwrap();
        assert_eq!(counter.load().unwrap(), 6);
    }
}
