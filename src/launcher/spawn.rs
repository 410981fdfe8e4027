//! Worker process creation
//!
//! The launcher treats process creation as an external collaborator: it
//! hands a job id to a [`ProcessSpawner`] and gets back a handle. The
//! production spawner renders `<worker-command> -n <job-id>` with output
//! redirected to a per-job log file.

use std::fs;
use std::path::PathBuf;
use std::process::Stdio;

use eyre::{Context, Result, eyre};
use tokio::process::{Child, Command};
use tracing::debug;

/// Handle to one spawned worker process
#[derive(Debug)]
pub struct JobHandle {
    /// Job id this process runs
    pub id: String,
    /// OS process id (0 if the platform did not report one)
    pub pid: u32,
    /// Child handle, retained so the launcher can await exit
    pub child: Child,
}

impl JobHandle {
    /// Wrap a spawned child
    pub fn new(id: impl Into<String>, child: Child) -> Self {
        let pid = child.id().unwrap_or_default();
        Self {
            id: id.into(),
            pid,
            child,
        }
    }
}

/// Starts one job as a detached OS process
pub trait ProcessSpawner: Send + Sync {
    fn spawn_job(&self, job_id: &str) -> Result<JobHandle>;
}

/// Spawner that renders the configured worker command
pub struct ShellSpawner {
    command: String,
    log_dir: PathBuf,
}

impl ShellSpawner {
    /// Create a spawner for `command`, logging into `log_dir`
    pub fn new(command: impl Into<String>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            log_dir: log_dir.into(),
        }
    }

    /// Path of the log file one job's output is redirected to
    pub fn log_path(&self, job_id: &str) -> PathBuf {
        self.log_dir.join(format!("{job_id}.log"))
    }
}

impl ProcessSpawner for ShellSpawner {
    fn spawn_job(&self, job_id: &str) -> Result<JobHandle> {
        debug!(job_id, command = %self.command, "spawn_job: called");

        fs::create_dir_all(&self.log_dir).context("Failed to create job log directory")?;

        let log_path = self.log_path(job_id);
        let log = fs::File::create(&log_path)
            .context(format!("Failed to create job log file {}", log_path.display()))?;
        let log_err = log.try_clone().context("Failed to clone job log handle")?;

        let mut parts = self.command.split_whitespace();
        let program = parts.next().ok_or_else(|| eyre!("Worker command is empty"))?;

        let child = Command::new(program)
            .args(parts)
            .arg("-n")
            .arg(job_id)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .spawn()
            .context(format!("Failed to start worker process for job {job_id}"))?;

        debug!(job_id, pid = child.id().unwrap_or_default(), "spawn_job: started");
        Ok(JobHandle::new(job_id, child))
    }
}
