//! Launcher implementation

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Local};
use colored::Colorize;
use eyre::Result;
use tracing::{debug, info, warn};

use crate::census::ProcessCensus;
use crate::config::LauncherConfig;
use crate::jobs::{Job, JobState};

use super::spawn::{JobHandle, ProcessSpawner};

/// Bursts above this size draw a caution line; an uncontrolled burst of
/// this many browsers can starve the machine before the first sample.
const LARGE_BURST_THRESHOLD: usize = 10;

/// Completion report for one `run()`
#[derive(Debug, Clone)]
pub struct LaunchSummary {
    pub total: usize,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

/// The Launcher owns the concurrency cap, the pending-job queue, and the
/// admission-control loop.
pub struct Launcher {
    config: LauncherConfig,
    cap: usize,
    jobs: Vec<Job>,
    spawner: Arc<dyn ProcessSpawner>,
    census: Arc<dyn ProcessCensus>,
    handles: Vec<JobHandle>,
}

impl Launcher {
    /// Create a launcher for an ordered job list
    ///
    /// The cap comes from the config, falling back to the platform default;
    /// a zero cap is clamped to one so the admission loop can drain.
    pub fn new(
        config: LauncherConfig,
        job_ids: Vec<String>,
        spawner: Arc<dyn ProcessSpawner>,
        census: Arc<dyn ProcessCensus>,
    ) -> Self {
        let cap = config.resolved_cap().max(1);
        debug!(cap, jobs = job_ids.len(), "Launcher::new: called");
        Self {
            config,
            cap,
            jobs: job_ids.into_iter().map(Job::new).collect(),
            spawner,
            census,
            handles: Vec::new(),
        }
    }

    /// The resolved concurrency cap
    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Locally-tracked job states
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Drive all jobs to completion
    ///
    /// Starts jobs in queue order, gated by the census once the batch
    /// exceeds the cap, then blocks until every spawned process has exited.
    pub async fn run(&mut self) -> Result<LaunchSummary> {
        let started_at = Local::now();
        let total = self.jobs.len();
        info!(total, cap = self.cap, "Launcher run starting");

        if total <= self.cap {
            debug!(total, "run: batch fits under the cap, starting all jobs");
            if total > LARGE_BURST_THRESHOLD {
                warn!(total, "Large burst started without admission control");
                println!(
                    "{} starting {} jobs at once; the process table will spike",
                    "caution:".yellow(),
                    total
                );
            }
            for idx in 0..total {
                self.start_job(idx)?;
            }
            // Give the burst time to land in the process table before
            // declaring it started.
            tokio::time::sleep(self.config.burst_grace()).await;
        } else {
            debug!(cap = self.cap, "run: batch exceeds the cap, starting first slice");
            for idx in 0..self.cap {
                self.start_job(idx)?;
            }
            // The remainder is everything after the first `cap` entries;
            // the whole tail is admitted eventually, no job is dropped.
            let remaining: VecDeque<usize> = (self.cap..total).collect();
            self.keep_running(remaining).await?;
        }

        self.wait_for_exit().await?;

        let finished_at = Local::now();
        println!(
            "{} {} jobs ({} - {})",
            "completed".green(),
            total,
            started_at.format("%H:%M:%S"),
            finished_at.format("%H:%M:%S"),
        );
        info!(total, %started_at, %finished_at, "Launcher run complete");
        Ok(LaunchSummary {
            total,
            started_at,
            finished_at,
        })
    }

    /// Admission loop over the not-yet-started tail of the queue
    ///
    /// Iterative on purpose: the queue can be arbitrarily long and the
    /// termination condition is simply an empty queue.
    async fn keep_running(&mut self, mut remaining: VecDeque<usize>) -> Result<()> {
        debug!(remaining = remaining.len(), "keep_running: called");
        while !remaining.is_empty() {
            let mut running = self.running_count().await?;
            while running >= self.cap {
                debug!(running, cap = self.cap, "keep_running: saturated, sleeping");
                tokio::time::sleep(self.config.admission_poll()).await;
                running = self.running_count().await?;
            }

            // Sample-then-act: the headroom observed here can be taken by
            // a sibling launcher before these spawns land. Accepted
            // limitation of census-based admission.
            let slots = self.cap - running;
            let take = slots.min(remaining.len());
            let batch: Vec<usize> = remaining.drain(..take).collect();
            debug!(running, slots, admitted = batch.len(), "keep_running: admitting");
            for idx in batch {
                self.start_job(idx)?;
            }
        }
        Ok(())
    }

    /// Current sibling count, self excluded
    ///
    /// Never cached: every admission decision re-samples the process
    /// table. The census signature matches this coordinating process too,
    /// so one is subtracted, saturating so the figure is never negative.
    async fn running_count(&self) -> Result<usize> {
        let raw = self.census.count().await?;
        Ok(raw.saturating_sub(1))
    }

    fn start_job(&mut self, idx: usize) -> Result<()> {
        let id = self.jobs[idx].id.clone();
        let handle = self.spawner.spawn_job(&id)?;
        println!("{} {} (pid {})", "started".green(), id.bold(), handle.pid);
        info!(job = %id, pid = handle.pid, "Job started");
        self.jobs[idx].state = JobState::Started;
        self.handles.push(handle);
        Ok(())
    }

    /// Block until every spawned process has exited
    async fn wait_for_exit(&mut self) -> Result<()> {
        let handles = std::mem::take(&mut self.handles);
        debug!(count = handles.len(), "wait_for_exit: awaiting spawned processes");
        for mut handle in handles {
            match handle.child.wait().await {
                Ok(status) => {
                    debug!(job = %handle.id, code = ?status.code(), "wait_for_exit: process exited");
                }
                Err(e) => {
                    warn!(job = %handle.id, error = %e, "Lost track of worker process");
                    if let Some(job) = self.jobs.iter_mut().find(|j| j.id == handle.id) {
                        job.state = JobState::Unknown;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::process::Stdio;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::process::Command;

    /// Spawner that records start order and spawns a trivial real process
    /// so the exit wait has something to await.
    struct RecordingSpawner {
        started: Mutex<Vec<String>>,
    }

    impl RecordingSpawner {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                started: Mutex::new(Vec::new()),
            })
        }

        fn started(&self) -> Vec<String> {
            self.started.lock().unwrap().clone()
        }
    }

    impl ProcessSpawner for RecordingSpawner {
        fn spawn_job(&self, job_id: &str) -> Result<JobHandle> {
            self.started.lock().unwrap().push(job_id.to_string());
            let child = Command::new("true")
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()?;
            Ok(JobHandle::new(job_id, child))
        }
    }

    /// Census returning a scripted sequence of raw counts, then a fallback.
    /// Raw counts include one slot for the coordinating process itself.
    struct ScriptedCensus {
        samples: Mutex<VecDeque<usize>>,
        fallback: usize,
        calls: AtomicUsize,
    }

    impl ScriptedCensus {
        fn new(samples: Vec<usize>, fallback: usize) -> Arc<Self> {
            Arc::new(Self {
                samples: Mutex::new(samples.into()),
                fallback,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProcessCensus for ScriptedCensus {
        async fn count(&self) -> Result<usize> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.samples.lock().unwrap().pop_front().unwrap_or(self.fallback))
        }
    }

    fn test_config(cap: usize) -> LauncherConfig {
        LauncherConfig {
            cap: Some(cap),
            admission_poll_ms: 5,
            burst_grace_ms: 5,
            ..Default::default()
        }
    }

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_small_batch_starts_everything_without_admission_control() {
        let spawner = RecordingSpawner::new();
        let census = ScriptedCensus::new(vec![], 1);
        let mut launcher = Launcher::new(test_config(2), ids(&["a", "b"]), spawner.clone(), census.clone());

        let summary = launcher.run().await.unwrap();

        assert_eq!(summary.total, 2);
        assert_eq!(spawner.started(), vec!["a", "b"]);
        assert_eq!(census.calls(), 0, "small batch must not consult the census");
        assert!(launcher.jobs().iter().all(|j| j.state == JobState::Started));
    }

    #[tokio::test]
    async fn test_initial_burst_is_first_slice_in_queue_order() {
        let spawner = RecordingSpawner::new();
        // Raw count 1 = only the launcher itself; full headroom each round.
        let census = ScriptedCensus::new(vec![], 1);
        let mut launcher = Launcher::new(test_config(2), ids(&["a", "b", "c", "d", "e"]), spawner.clone(), census);

        launcher.run().await.unwrap();

        let started = spawner.started();
        assert_eq!(&started[..2], &["a", "b"], "burst must be the first cap entries");
        assert_eq!(started, vec!["a", "b", "c", "d", "e"], "queue order preserved");
    }

    #[tokio::test]
    async fn test_admission_waits_for_headroom() {
        let spawner = RecordingSpawner::new();
        // Raw 3 → running 2 (saturated, twice), then raw 2 → running 1.
        let census = ScriptedCensus::new(vec![3, 3, 2], 1);
        let mut launcher = Launcher::new(test_config(2), ids(&["a", "b", "c"]), spawner.clone(), census.clone());

        launcher.run().await.unwrap();

        assert_eq!(spawner.started(), vec!["a", "b", "c"]);
        assert_eq!(census.calls(), 3, "c must only start after a sample shows headroom");
    }

    #[tokio::test]
    async fn test_admission_step_bounded_by_available_slots() {
        let spawner = RecordingSpawner::new();
        // Raw 2 → running 1 → exactly one slot per admission round.
        let census = ScriptedCensus::new(vec![], 2);
        let mut launcher = Launcher::new(test_config(2), ids(&["a", "b", "c", "d", "e"]), spawner.clone(), census.clone());

        launcher.run().await.unwrap();

        assert_eq!(spawner.started(), vec!["a", "b", "c", "d", "e"]);
        // Three tail jobs, one slot each round: one census sample per round.
        assert_eq!(census.calls(), 3);
    }

    #[tokio::test]
    async fn test_no_job_dropped_when_queue_not_divisible_by_cap() {
        let spawner = RecordingSpawner::new();
        let census = ScriptedCensus::new(vec![], 1);
        let mut launcher = Launcher::new(test_config(2), ids(&["a", "b", "c", "d", "e"]), spawner.clone(), census);

        launcher.run().await.unwrap();

        // Regression for the source's asymmetric tail slice: the last
        // queue entry must be started too.
        assert_eq!(spawner.started().len(), 5);
        assert!(launcher.jobs().iter().all(|j| j.state == JobState::Started));
    }

    #[tokio::test]
    async fn test_empty_job_list() {
        let spawner = RecordingSpawner::new();
        let census = ScriptedCensus::new(vec![], 1);
        let mut launcher = Launcher::new(test_config(2), vec![], spawner.clone(), census.clone());

        let summary = launcher.run().await.unwrap();

        assert_eq!(summary.total, 0);
        assert!(spawner.started().is_empty());
        assert_eq!(census.calls(), 0);
    }

    #[tokio::test]
    async fn test_zero_cap_is_clamped() {
        let spawner = RecordingSpawner::new();
        let census = ScriptedCensus::new(vec![], 1);
        let launcher = Launcher::new(test_config(0), ids(&["a"]), spawner, census);

        assert_eq!(launcher.cap(), 1);
    }
}
