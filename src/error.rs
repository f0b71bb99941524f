//! Error types for the snapshot suite.
//!
//! Defines the suite-level error with classification for retry behavior and
//! for matching expected driver failures.

use std::time::Duration;
use thiserror::Error;

use crate::cluster::WaitError;
use crate::scale::ScaleError;

/// Error type for suite operations
#[derive(Error, Debug)]
pub enum Error {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Kubeconfig could not be loaded
    #[error("Kubeconfig error: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    /// Kubeconfig could not be inferred from the environment
    #[error("Kubeconfig inference error: {0}")]
    InferConfig(#[from] kube::config::InferConfigError),

    /// Filesystem management API error
    #[error("Filesystem REST API error: {0}")]
    Scale(#[from] ScaleError),

    /// Waiting for a resource failed
    #[error("Wait failed for {resource}: {source}")]
    Wait {
        resource: String,
        #[source]
        source: WaitError,
    },

    /// Configuration file or command value problem
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid case parameters
    #[error("Validation error: {0}")]
    Validation(String),

    /// The driver reported an error for a snapshot
    #[error("Snapshot {name} failed: {message}")]
    SnapshotFailed { name: String, message: String },

    /// A claim emitted a failure event
    #[error("Claim {name} failed: {message}")]
    ClaimFailed { name: String, message: String },

    /// Data read back from a restored or cloned volume did not match
    #[error("Data mismatch on {claim}: expected {expected:?}, got {actual:?}")]
    DataMismatch {
        claim: String,
        expected: String,
        actual: String,
    },

    /// An expected failure did not happen
    #[error("Expected failure containing {reason:?} did not occur on {resource}")]
    ExpectedFailureMissing { resource: String, reason: String },

    /// The CSI operator or driver is not healthy
    #[error("CSI operator not ready: {0}")]
    OperatorNotReady(String),

    /// Pod exec failed
    #[error("Exec in pod {pod} failed: {message}")]
    Exec { pod: String, message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Driver data file parse error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap a wait error with the resource it was waiting on.
    pub fn wait(resource: impl Into<String>, source: WaitError) -> Self {
        Error::Wait {
            resource: resource.into(),
            source,
        }
    }

    /// Check if this error indicates a not-found condition
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Kube(kube::Error::Api(e)) => e.code == 404,
            Error::Scale(e) => e.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error should be retried
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube(e) => {
                matches!(
                    e,
                    kube::Error::Api(api_err) if api_err.code >= 500 || api_err.code == 429
                ) || matches!(e, kube::Error::Service(_))
            }
            Error::Scale(e) => e.is_retryable(),
            Error::Wait { source, .. } => matches!(source, WaitError::StreamEnded),
            _ => false,
        }
    }

    /// Message reported by the driver, if this error carries one.
    pub fn driver_message(&self) -> Option<&str> {
        match self {
            Error::SnapshotFailed { message, .. } | Error::ClaimFailed { message, .. } => {
                Some(message)
            }
            _ => None,
        }
    }

    /// Check if the driver message of this error contains `reason`.
    pub fn matches_reason(&self, reason: &str) -> bool {
        self.driver_message().is_some_and(|m| m.contains(reason))
    }

    /// Recommended pause before retrying a retryable operation.
    pub fn retry_after(&self) -> Duration {
        if self.is_retryable() {
            Duration::from_secs(5)
        } else {
            Duration::ZERO
        }
    }
}

/// Result type alias for suite operations
pub type Result<T> = std::result::Result<T, Error>;
