//! Device-cloud REST client
//!
//! Two GET endpoints: list recent jobs and fetch one job's status by id.
//! Every network call runs under bounded retry (no backoff, immediate
//! retry); payloads are parsed with strict serde that fails closed.

use std::future::Future;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::RemoteConfig;

use super::error::RemoteError;

/// One remote job record, as listed by the service
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteJob {
    pub id: String,
}

/// Status of one remote job as reported by the service
///
/// Anything outside the known vocabulary deserializes to `Unknown` rather
/// than failing the whole record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum RemoteStatus {
    #[serde(rename = "complete")]
    Complete,
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct JobStatusResponse {
    status: RemoteStatus,
}

/// Capability interface over the remote status endpoints
#[async_trait]
pub trait RemoteJobsApi: Send + Sync {
    /// Fetch the `limit` most-recently-created jobs' records
    async fn recent_jobs(&self, limit: usize) -> Result<Vec<RemoteJob>, RemoteError>;

    /// Fetch one job's status by id
    async fn job_status(&self, id: &str) -> Result<RemoteStatus, RemoteError>;
}

/// Run `call` up to `max_attempts` times, retrying immediately on
/// transient failures
///
/// Each failed attempt is logged; the final attempt's failure propagates
/// unchanged. Non-retryable errors propagate at once.
pub(crate) async fn with_retries<T, F, Fut>(what: &str, max_attempts: u32, mut call: F) -> Result<T, RemoteError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(what, attempt, max_attempts, error = %e, "Remote call attempt failed");
                if attempt >= max_attempts || !e.is_retryable() {
                    return Err(e);
                }
            }
        }
    }
}

/// HTTP client for the device-cloud REST API (basic auth)
pub struct HttpRemoteClient {
    base_url: String,
    username: String,
    access_key: String,
    http: Client,
    max_attempts: u32,
}

impl HttpRemoteClient {
    /// Create a client from configuration
    ///
    /// Reads the access key from the environment variable named in the
    /// config; a missing key is a fatal setup error, not a retry case.
    pub fn from_config(config: &RemoteConfig) -> Result<Self, RemoteError> {
        debug!(base_url = %config.base_url, username = %config.username, "from_config: called");
        let access_key =
            std::env::var(&config.access_key_env).map_err(|_| RemoteError::Credentials(config.access_key_env.clone()))?;

        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(RemoteError::Network)?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            access_key,
            http,
            max_attempts: config.max_attempts,
        })
    }

    /// One GET attempt, strictly parsed
    async fn get_json_once<T: DeserializeOwned>(&self, url: &str) -> Result<T, RemoteError> {
        debug!(url, "get_json_once: called");
        let response = self
            .http
            .get(url)
            .basic_auth(&self.username, Some(&self.access_key))
            .send()
            .await?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RemoteError::Api { status, message });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| RemoteError::Parse(e.to_string()))
    }
}

#[async_trait]
impl RemoteJobsApi for HttpRemoteClient {
    async fn recent_jobs(&self, limit: usize) -> Result<Vec<RemoteJob>, RemoteError> {
        debug!(limit, "recent_jobs: called");
        let url = format!("{}/rest/v1/{}/jobs?limit={}", self.base_url, self.username, limit);
        with_retries("recent_jobs", self.max_attempts, || self.get_json_once(&url)).await
    }

    async fn job_status(&self, id: &str) -> Result<RemoteStatus, RemoteError> {
        debug!(id, "job_status: called");
        let url = format!("{}/rest/v1/{}/jobs/{}", self.base_url, self.username, id);
        let response: JobStatusResponse = with_retries("job_status", self.max_attempts, || self.get_json_once(&url)).await?;
        Ok(response.status)
    }
}
