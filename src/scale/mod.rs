//! Client for the filesystem management REST API.
//!
//! Static snapshot cases create filesets and snapshots directly on the
//! storage cluster before registering them with Kubernetes.

mod client;
mod types;

pub use client::ScaleClient;
pub use types::{Filesystem, Mount, Snapshot};

use thiserror::Error;

/// Errors returned by the management API
#[derive(Error, Debug)]
pub enum ScaleError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{method} {path} returned {status}: {message}")]
    Status {
        method: String,
        path: String,
        status: u16,
        message: String,
    },

    #[error("Job {job_id} failed: {message}")]
    JobFailed { job_id: u64, message: String },

    #[error("Job {job_id} did not finish within {seconds}s")]
    JobTimeout { job_id: u64, seconds: u64 },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Invalid version: {0}")]
    Version(String),
}

impl ScaleError {
    /// Check if the API reported a missing object
    pub fn is_not_found(&self) -> bool {
        match self {
            ScaleError::Status {
                status, message, ..
            } => *status == 404 || (*status == 400 && message.contains("Invalid value")),
            _ => false,
        }
    }

    /// Check if the request may succeed when repeated
    pub fn is_retryable(&self) -> bool {
        match self {
            ScaleError::Http(e) => e.is_timeout() || e.is_connect(),
            ScaleError::Status { status, .. } => *status >= 500 || *status == 429,
            ScaleError::JobTimeout { .. } => true,
            _ => false,
        }
    }
}
