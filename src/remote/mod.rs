//! Remote device-cloud integration
//!
//! Optional: only used when jobs execute on the remote service and local
//! process exit is not the authoritative completion signal.

mod client;
mod error;
mod poller;

pub use client::{HttpRemoteClient, RemoteJob, RemoteJobsApi, RemoteStatus};
pub use error::RemoteError;
pub use poller::StatusPoller;
