//! Job identifiers and the ordered job list
//!
//! The launcher core only consumes an ordered sequence of job ids; this
//! module supplies it from CLI positionals, a jobs file, or the config.

use std::path::Path;

use eyre::{Context, Result};

use crate::config::Config;

/// Locally-tracked lifecycle of one job
///
/// The launcher never observes process exit per job; a started job stays
/// `Started` unless its handle becomes unobservable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Waiting in the queue, not yet started
    Queued,
    /// Spawned as an OS process
    Started,
    /// Spawned, but the process handle can no longer be observed
    Unknown,
}

/// One named unit of test execution, mapped 1:1 to one OS process
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub state: JobState,
}

impl Job {
    /// Create a queued job
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: JobState::Queued,
        }
    }
}

/// Load job ids from a file, one per line
///
/// Blank lines and `#` comments are ignored.
pub fn load_jobs_file(path: &Path) -> Result<Vec<String>> {
    let content =
        std::fs::read_to_string(path).context(format!("Failed to read jobs file {}", path.display()))?;

    let jobs: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();

    Ok(jobs)
}

/// Resolve the ordered job list: CLI positionals win, then a jobs file,
/// then the config-level list.
pub fn resolve(positional: &[String], file: Option<&Path>, config: &Config) -> Result<Vec<String>> {
    if !positional.is_empty() {
        return Ok(positional.to_vec());
    }

    if let Some(path) = file {
        let jobs = load_jobs_file(path)?;
        if jobs.is_empty() {
            return Err(eyre::eyre!("Jobs file {} contains no jobs", path.display()));
        }
        return Ok(jobs);
    }

    if !config.jobs.is_empty() {
        return Ok(config.jobs.clone());
    }

    Err(eyre::eyre!(
        "No jobs specified. Pass job names, use --file, or set `jobs:` in the config."
    ))
}
