//! Process census
//!
//! Answers "how many sibling worker processes are currently alive" by
//! sampling the OS process table. There is no structured process-management
//! API here: the census lists processes and filters on the launcher's
//! static invocation signature.

use std::process::Stdio;

use async_trait::async_trait;
use eyre::{Context, Result, eyre};
use tokio::process::Command;
use tracing::debug;

/// Point-in-time count of sibling worker processes
#[async_trait]
pub trait ProcessCensus: Send + Sync {
    /// Sample the process table; never cached between calls
    async fn count(&self) -> Result<usize>;
}

/// Census backed by the platform process-listing facility (`ps`)
pub struct PsCensus {
    pattern: String,
}

impl PsCensus {
    /// Create a census matching command lines against `pattern`
    pub fn new(pattern: impl Into<String>) -> Self {
        Self { pattern: pattern.into() }
    }
}

#[async_trait]
impl ProcessCensus for PsCensus {
    async fn count(&self) -> Result<usize> {
        debug!(pattern = %self.pattern, "count: called");
        let output = Command::new("ps")
            .arg("-eo")
            .arg("pid,args")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .context("Process listing facility unavailable (is `ps` installed?)")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(eyre!("ps failed: {}", stderr));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let count = count_matching(&stdout, &self.pattern);
        debug!(count, "count: sampled");
        Ok(count)
    }
}

/// Count process-table rows whose command line contains `pattern`
///
/// Filtering happens in-process over the captured listing, so the count
/// cannot include a grep-of-self artifact. The header row is skipped.
/// Rows that match include the coordinating process when its own command
/// line carries the signature; the admission path subtracts that one.
fn count_matching(ps_output: &str, pattern: &str) -> usize {
    ps_output
        .lines()
        .skip(1)
        .filter(|line| line.contains(pattern))
        .count()
}
