//! testfleet configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Concurrency cap default for the restricted platform class (macOS, where
/// the local browser pool is narrow).
pub const RESTRICTED_PLATFORM_CAP: usize = 4;

/// Concurrency cap default for every other platform.
pub const DEFAULT_PLATFORM_CAP: usize = 8;

/// Main testfleet configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Launcher configuration
    pub launcher: LauncherConfig,

    /// Remote device-cloud configuration
    pub remote: RemoteConfig,

    /// Default job list (overridden by CLI positionals or --file)
    pub jobs: Vec<String>,
}

impl Config {
    /// Validate remote credentials before use
    ///
    /// Call this before any device-cloud command to fail fast with a clear
    /// error message instead of a mid-poll auth failure.
    pub fn validate_remote(&self) -> Result<()> {
        if self.remote.username.is_empty() {
            return Err(eyre::eyre!(
                "Remote username not configured. Set remote.username in the config file."
            ));
        }
        if std::env::var(&self.remote.access_key_env).is_err() {
            return Err(eyre::eyre!(
                "Remote access key not found. Set the {} environment variable.",
                self.remote.access_key_env
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .testfleet.yml
        let local_config = PathBuf::from(".testfleet.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/testfleet/testfleet.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("testfleet").join("testfleet.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Launcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// Concurrency cap; platform default when absent
    pub cap: Option<usize>,

    /// Command prefix used to start one worker; the job id is appended
    /// as `-n <job-id>`
    #[serde(rename = "worker-command")]
    pub worker_command: String,

    /// Process-census match pattern; defaults to the worker command
    #[serde(rename = "census-pattern")]
    pub census_pattern: Option<String>,

    /// Directory for per-job log files
    #[serde(rename = "log-dir")]
    pub log_dir: PathBuf,

    /// Sleep between admission-check samples in milliseconds
    #[serde(rename = "admission-poll-ms")]
    pub admission_poll_ms: u64,

    /// Grace period after a no-admission-control burst in milliseconds
    #[serde(rename = "burst-grace-ms")]
    pub burst_grace_ms: u64,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        let log_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("testfleet")
            .join("job-logs");

        Self {
            cap: None,
            worker_command: "tf-worker".to_string(),
            census_pattern: None,
            log_dir,
            admission_poll_ms: 5_000,
            burst_grace_ms: 3_000,
        }
    }
}

impl LauncherConfig {
    /// Resolve the concurrency cap, falling back to the platform default
    pub fn resolved_cap(&self) -> usize {
        self.cap.unwrap_or_else(default_concurrency_cap)
    }

    /// Get the admission poll interval as a Duration
    pub fn admission_poll(&self) -> Duration {
        Duration::from_millis(self.admission_poll_ms)
    }

    /// Get the burst grace period as a Duration
    pub fn burst_grace(&self) -> Duration {
        Duration::from_millis(self.burst_grace_ms)
    }

    /// Pattern the process census matches worker command lines against
    pub fn census_signature(&self) -> &str {
        self.census_pattern.as_deref().unwrap_or(&self.worker_command)
    }
}

/// Platform-dependent concurrency cap default
pub fn default_concurrency_cap() -> usize {
    if cfg!(target_os = "macos") {
        RESTRICTED_PLATFORM_CAP
    } else {
        DEFAULT_PLATFORM_CAP
    }
}

/// Remote device-cloud configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// REST API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Account username (basic-auth user)
    pub username: String,

    /// Environment variable containing the access key
    #[serde(rename = "access-key-env")]
    pub access_key_env: String,

    /// Poll interval for the completion gate in milliseconds
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,

    /// Attempts per network call (first try included)
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://saucelabs.com".to_string(),
            username: String::new(),
            access_key_env: "SAUCE_ACCESS_KEY".to_string(),
            poll_interval_ms: 20_000,
            max_attempts: 5,
            timeout_ms: 30_000,
        }
    }
}

impl RemoteConfig {
    /// Get the poll interval as a Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Get the request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
