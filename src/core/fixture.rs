//! Fixture discovery
//!
//! Inputs are `input*.txt` files in the tests directory; the expected output
//! for each is the same name with the `input` marker replaced by `expected`.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const INPUT_MARKER: &str = "input";
pub const EXPECTED_MARKER: &str = "expected";
const FIXTURE_EXTENSION: &str = "txt";

/// One input / expected-output pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fixture {
    /// Input file name, used in reports
    pub name: String,
    pub input: PathBuf,
    pub expected: PathBuf,
}

impl Fixture {
    /// Build a fixture from an input path; `None` if the name doesn't match
    pub fn from_input(input: &Path) -> Option<Self> {
        let name = input.file_name()?.to_str()?;
        if !name.starts_with(INPUT_MARKER) {
            return None;
        }
        if input.extension()?.to_str()? != FIXTURE_EXTENSION {
            return None;
        }

        let expected_name = name.replacen(INPUT_MARKER, EXPECTED_MARKER, 1);
        Some(Self {
            name: name.to_string(),
            input: input.to_path_buf(),
            expected: input.with_file_name(expected_name),
        })
    }
}

/// All fixtures in `dir`, ordered by input file name.
///
/// A missing directory yields no fixtures rather than an error.
pub fn discover(dir: &Path) -> Result<Vec<Fixture>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("Fixture directory {:?} does not exist", dir);
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to list fixtures in {:?}", dir));
        }
    };

    let mut fixtures = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to list fixtures in {:?}", dir))?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(fixture) = Fixture::from_input(&entry.path()) {
            fixtures.push(fixture);
        }
    }

    fixtures.sort_by(|a, b| a.name.cmp(&b.name));
    debug!("Discovered {} fixtures in {:?}", fixtures.len(), dir);

    Ok(fixtures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_expected_path_substitution() {
        let fixture = Fixture::from_input(Path::new("/base/Tests/input_07.txt")).unwrap();

        assert_eq!(fixture.name, "input_07.txt");
        assert_eq!(fixture.expected, PathBuf::from("/base/Tests/expected_07.txt"));
    }

    #[test]
    fn test_marker_only_replaced_in_file_name() {
        let fixture = Fixture::from_input(Path::new("/input/Tests/input1.txt")).unwrap();
        assert_eq!(fixture.expected, PathBuf::from("/input/Tests/expected1.txt"));
    }

    #[test]
    fn test_non_input_files_rejected() {
        assert!(Fixture::from_input(Path::new("Tests/expected1.txt")).is_none());
        assert!(Fixture::from_input(Path::new("Tests/input1.in")).is_none());
        assert!(Fixture::from_input(Path::new("Tests/notes.txt")).is_none());
    }

    #[test]
    fn test_discover_sorted_lexicographically() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["input2.txt", "input10.txt", "input1.txt", "expected1.txt", "README.md"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        fs::create_dir(dir.path().join("input_dir.txt")).unwrap();

        let names: Vec<String> = discover(dir.path())
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();

        assert_eq!(names, vec!["input1.txt", "input10.txt", "input2.txt"]);
    }

    #[test]
    fn test_discover_keeps_fixture_without_expected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("input1.txt"), "1").unwrap();

        let fixtures = discover(dir.path()).unwrap();
        assert_eq!(fixtures.len(), 1);
        assert!(!fixtures[0].expected.exists());
    }

    #[test]
    fn test_discover_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover(&dir.path().join("Tests")).unwrap().is_empty());
    }
}
