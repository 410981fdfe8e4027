//! testfleet - bounded-concurrency launcher for browser test jobs
//!
//! testfleet takes an ordered list of named test jobs and runs each as an
//! independent OS process, subject to a concurrency cap. Admission control
//! works without a central process-management API: the launcher samples a
//! process census between starts and only admits jobs while headroom
//! exists. When jobs execute on a remote device cloud, an optional poller
//! sweeps their statuses until every job is terminal.
//!
//! # Core Concepts
//!
//! - **Census-gated admission**: the running count is re-sampled from the
//!   OS process table before every decision, never cached
//! - **Sample-then-act**: admission has no atomicity guarantee; a sibling
//!   launcher can overshoot the cap (documented limitation)
//! - **Processes, not threads**: parallelism comes from spawned worker
//!   processes; the coordinating control flow is a single task
//! - **Remote gate is a fallback**: awaiting local process exit is the
//!   primary completion signal
//!
//! # Modules
//!
//! - [`launcher`] - Concurrency cap, job queue, admission loop
//! - [`census`] - Sibling worker process counting
//! - [`remote`] - Device-cloud status client and completion poller
//! - [`jobs`] - Job identifiers and list loading
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod census;
pub mod cli;
pub mod config;
pub mod jobs;
pub mod launcher;
pub mod remote;

// Re-export commonly used types
pub use census::{ProcessCensus, PsCensus};
pub use config::{Config, LauncherConfig, RemoteConfig, default_concurrency_cap};
pub use jobs::{Job, JobState};
pub use launcher::{JobHandle, LaunchSummary, Launcher, ProcessSpawner, ShellSpawner};
pub use remote::{HttpRemoteClient, RemoteError, RemoteJob, RemoteJobsApi, RemoteStatus, StatusPoller};
