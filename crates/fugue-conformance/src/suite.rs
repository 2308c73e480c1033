//! Running every fixture under a path

use crate::error::{FixtureError, ScenarioError};
use crate::runner::{RunReport, ScenarioRunner};
use crate::scenario::Scenario;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// A fixture that did not pass
#[derive(Debug)]
pub struct SuiteFailure {
    /// Fixture file
    pub path: PathBuf,
    /// Why it failed
    pub error: ScenarioError,
}

/// Outcome of a suite run
#[derive(Debug, Default)]
pub struct SuiteStats {
    /// Fixtures run
    pub total: usize,
    /// Fixtures that passed
    pub passed: usize,
    /// Fixtures that failed
    pub failed: usize,
    /// Wall-clock time of the run
    pub duration: Duration,
    /// Failed fixtures in run order
    pub failures: Vec<SuiteFailure>,
}

impl SuiteStats {
    /// True when no fixture failed
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    fn record(&mut self, path: &Path, result: Result<RunReport, ScenarioError>) {
        self.total += 1;
        match result {
            Ok(report) => {
                self.passed += 1;
                tracing::info!(path = %path.display(), outcome = ?report.phase_outcome, "PASS");
            }
            Err(error) => {
                self.failed += 1;
                tracing::error!(path = %path.display(), %error, "FAIL");
                self.failures.push(SuiteFailure {
                    path: path.to_path_buf(),
                    error,
                });
            }
        }
    }

    fn merge(&mut self, other: SuiteStats) {
        self.total += other.total;
        self.passed += other.passed;
        self.failed += other.failed;
        self.duration += other.duration;
        self.failures.extend(other.failures);
    }
}

/// Runs fixture files one after another, each on its own ledger
#[derive(Debug, Clone)]
pub struct SuiteRunner {
    runner: ScenarioRunner,
}

impl SuiteRunner {
    /// Create a suite runner around `runner`
    pub fn new(runner: ScenarioRunner) -> Self {
        Self { runner }
    }

    /// Run a single fixture file, or every `*.json` file below a directory
    /// in path order. Unreadable or malformed fixtures count as failures.
    pub fn run_path(&self, path: &Path) -> Result<SuiteStats, FixtureError> {
        let started = Instant::now();
        let fixtures = collect_fixtures(path)?;
        tracing::info!(path = %path.display(), fixtures = fixtures.len(), "running suite");

        let mut stats = SuiteStats::default();
        for fixture in &fixtures {
            let result = Scenario::from_path(fixture)
                .map_err(ScenarioError::from)
                .and_then(|scenario| self.runner.run(&scenario));
            stats.record(fixture, result);
        }
        stats.duration = started.elapsed();

        tracing::info!(
            total = stats.total,
            passed = stats.passed,
            failed = stats.failed,
            duration_ms = stats.duration.as_millis() as u64,
            "suite finished"
        );
        Ok(stats)
    }

    /// Run several paths and sum their results
    pub fn run_paths(&self, paths: &[PathBuf]) -> Result<SuiteStats, FixtureError> {
        let mut stats = SuiteStats::default();
        for path in paths {
            stats.merge(self.run_path(path)?);
        }
        Ok(stats)
    }
}

/// Fixture files at `path`, sorted
pub fn collect_fixtures(path: &Path) -> Result<Vec<PathBuf>, FixtureError> {
    if !path.is_dir() {
        if !path.exists() {
            return Err(FixtureError::Io {
                path: path.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory"),
            });
        }
        return Ok(vec![path.to_path_buf()]);
    }

    let mut found = Vec::new();
    let mut pending = vec![path.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = std::fs::read_dir(&dir).map_err(|source| FixtureError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| FixtureError::Io {
                path: dir.display().to_string(),
                source,
            })?;
            let entry_path = entry.path();
            if entry_path.is_dir() {
                pending.push(entry_path);
            } else if entry_path.extension().is_some_and(|ext| ext == "json") {
                found.push(entry_path);
            }
        }
    }
    found.sort();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::RunnerConfig;
    use std::fs;
    use tempfile::TempDir;

    fn suite() -> SuiteRunner {
        SuiteRunner::new(ScenarioRunner::new(RunnerConfig::default()))
    }

    #[test]
    fn test_collect_fixtures_recursive_sorted() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("b.json"), "{}").unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "skip").unwrap();
        fs::write(dir.path().join("nested/c.json"), "{}").unwrap();

        let found = collect_fixtures(dir.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.json"),
                PathBuf::from("b.json"),
                PathBuf::from("nested/c.json")
            ]
        );
    }

    #[test]
    fn test_missing_path() {
        let dir = TempDir::new().unwrap();
        let err = collect_fixtures(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, FixtureError::Io { .. }));
    }

    #[test]
    fn test_malformed_fixture_counts_as_failure() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("empty.json"), "{}").unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

        let stats = suite().run_path(dir.path()).unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.passed, 1);
        assert_eq!(stats.failed, 1);
        assert!(!stats.is_success());
        assert!(stats.failures[0].path.ends_with("broken.json"));
        assert!(matches!(
            stats.failures[0].error,
            ScenarioError::Fixture(FixtureError::Json(_))
        ));
    }

    #[test]
    fn test_run_paths_merges() {
        let dir = TempDir::new().unwrap();
        let one = dir.path().join("one.json");
        let two = dir.path().join("two.json");
        fs::write(&one, "{}").unwrap();
        fs::write(&two, "{}").unwrap();

        let stats = suite().run_paths(&[one, two]).unwrap();
        assert_eq!(stats.total, 2);
        assert!(stats.is_success());
    }
}
