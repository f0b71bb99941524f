//! HTTP client and operations.

use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::config::DriverData;
use crate::driver::ScaleVersion;
use crate::scale::ScaleError;
use crate::scale::types::{
    CreateFilesetRequest, CreateSnapshotRequest, ErrorResponse, Filesystem, FilesystemsResponse,
    InfoResponse, JobStatus, JobsResponse, Snapshot, SnapshotsResponse,
};

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);
const JOB_POLL_INTERVAL: Duration = Duration::from_secs(2);
const JOB_TIMEOUT: Duration = Duration::from_secs(300);
const SEND_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Pause before repeating a request that failed with `error`, if it may be
/// repeated at all. Only reads and deletes are repeated.
fn retry_delay(method: &Method, attempt: u32, error: &ScaleError) -> Option<Duration> {
    let idempotent = *method == Method::GET || *method == Method::DELETE;
    (idempotent && attempt < SEND_ATTEMPTS && error.is_retryable()).then(|| RETRY_DELAY * attempt)
}

/// Authenticated client for one storage cluster.
#[derive(Clone)]
pub struct ScaleClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl std::fmt::Debug for ScaleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScaleClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl ScaleClient {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        verify_tls: bool,
    ) -> Result<Self, ScaleError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .danger_accept_invalid_certs(!verify_tls)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
        })
    }

    /// Client for the cluster described by the driver data.
    pub fn from_driver_data(data: &DriverData) -> Result<Self, ScaleError> {
        Self::new(
            data.gui_url(),
            &data.username,
            &data.password,
            data.secure_ssl_mode,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .basic_auth(&self.username, Some(&self.password))
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        mut builder: RequestBuilder,
    ) -> Result<Response, ScaleError> {
        let mut attempt = 1;
        loop {
            let spare = builder.try_clone();
            let error = match self.send_once(&method, path, builder).await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };
            match (retry_delay(&method, attempt, &error), spare) {
                (Some(delay), Some(spare)) => {
                    warn!(%method, path, attempt, error = %error, "Scale API request failed, retrying");
                    sleep(delay).await;
                    builder = spare;
                    attempt += 1;
                }
                _ => return Err(error),
            }
        }
    }

    async fn send_once(
        &self,
        method: &Method,
        path: &str,
        builder: RequestBuilder,
    ) -> Result<Response, ScaleError> {
        debug!(%method, path, "Scale API request");
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.status.message)
            .unwrap_or(body);
        Err(ScaleError::Status {
            method: method.to_string(),
            path: path.to_string(),
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ScaleError> {
        let response = self
            .send(Method::GET, path, self.request(Method::GET, path))
            .await?;
        Ok(response.json().await?)
    }

    /// Send a job-producing request and wait for the job to finish.
    async fn run_job(&self, method: Method, path: &str, builder: RequestBuilder) -> Result<(), ScaleError> {
        let response = self.send(method, path, builder).await?;
        let jobs: JobsResponse = response.json().await?;
        let job = jobs
            .jobs
            .into_iter()
            .next()
            .ok_or_else(|| ScaleError::UnexpectedResponse(format!("no job returned by {}", path)))?;
        self.wait_for_job(job.job_id).await
    }

    async fn wait_for_job(&self, job_id: u64) -> Result<(), ScaleError> {
        let started = Instant::now();
        let path = format!("/jobs/{}", job_id);
        loop {
            let jobs: JobsResponse = self.get_json(&path).await?;
            let Some(job) = jobs.jobs.into_iter().next() else {
                return Err(ScaleError::UnexpectedResponse(format!("job {} not found", job_id)));
            };
            match job.status {
                JobStatus::Completed => return Ok(()),
                JobStatus::Failed | JobStatus::Cancelled => {
                    let message = job
                        .result
                        .map(|r| r.stderr.join(" "))
                        .filter(|m| !m.is_empty())
                        .unwrap_or_else(|| format!("{:?}", job.status));
                    return Err(ScaleError::JobFailed { job_id, message });
                }
                JobStatus::Running | JobStatus::Unknown => {}
            }
            if started.elapsed() > JOB_TIMEOUT {
                return Err(ScaleError::JobTimeout {
                    job_id,
                    seconds: JOB_TIMEOUT.as_secs(),
                });
            }
            sleep(JOB_POLL_INTERVAL).await;
        }
    }

    /// Version of the storage cluster.
    pub async fn scale_version(&self) -> Result<ScaleVersion, ScaleError> {
        let info: InfoResponse = self.get_json("/info").await?;
        ScaleVersion::parse(&info.info.server_version)
            .map_err(|e| ScaleError::Version(e.to_string()))
    }

    pub async fn filesystem(&self, fs: &str) -> Result<Filesystem, ScaleError> {
        let response: FilesystemsResponse = self.get_json(&format!("/filesystems/{}", fs)).await?;
        response
            .filesystems
            .into_iter()
            .next()
            .ok_or_else(|| ScaleError::UnexpectedResponse(format!("filesystem {} not listed", fs)))
    }

    /// UUID of a filesystem, as used in volume and snapshot handles.
    pub async fn filesystem_uuid(&self, fs: &str) -> Result<String, ScaleError> {
        let uuid = self.filesystem(fs).await?.uuid;
        if uuid.is_empty() {
            return Err(ScaleError::UnexpectedResponse(format!(
                "filesystem {} has no uuid",
                fs
            )));
        }
        Ok(uuid)
    }

    /// Create an independent fileset linked under the filesystem mount point.
    pub async fn create_fileset(&self, fs: &str, fileset: &str, inode_limit: &str) -> Result<(), ScaleError> {
        let mount_point = self
            .filesystem(fs)
            .await?
            .mount
            .map(|m| m.mount_point)
            .ok_or_else(|| ScaleError::UnexpectedResponse(format!("filesystem {} is not mounted", fs)))?;
        let body = CreateFilesetRequest {
            fileset_name: fileset,
            inode_space: "new",
            max_num_inodes: inode_limit,
            alloc_inodes: inode_limit,
            path: format!("{}/{}", mount_point.trim_end_matches('/'), fileset),
        };
        let path = format!("/filesystems/{}/filesets", fs);
        self.run_job(Method::POST, &path, self.request(Method::POST, &path).json(&body))
            .await?;
        info!(fs, fileset, "Created fileset");
        Ok(())
    }

    pub async fn fileset_exists(&self, fs: &str, fileset: &str) -> Result<bool, ScaleError> {
        let path = format!("/filesystems/{}/filesets/{}", fs, fileset);
        match self.send(Method::GET, &path, self.request(Method::GET, &path)).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Unlink and delete a fileset.
    pub async fn delete_fileset(&self, fs: &str, fileset: &str) -> Result<(), ScaleError> {
        let link = format!("/filesystems/{}/filesets/{}/link?force=True", fs, fileset);
        if let Err(e) = self
            .run_job(Method::DELETE, &link, self.request(Method::DELETE, &link))
            .await
        {
            warn!(fs, fileset, error = %e, "Unlink failed, deleting anyway");
        }
        let path = format!("/filesystems/{}/filesets/{}", fs, fileset);
        self.run_job(Method::DELETE, &path, self.request(Method::DELETE, &path))
            .await?;
        info!(fs, fileset, "Deleted fileset");
        Ok(())
    }

    pub async fn create_snapshot(&self, fs: &str, fileset: &str, snapshot: &str) -> Result<(), ScaleError> {
        let path = format!("/filesystems/{}/filesets/{}/snapshots", fs, fileset);
        let body = CreateSnapshotRequest {
            snapshot_name: snapshot,
        };
        self.run_job(Method::POST, &path, self.request(Method::POST, &path).json(&body))
            .await?;
        info!(fs, fileset, snapshot, "Created snapshot");
        Ok(())
    }

    pub async fn delete_snapshot(&self, fs: &str, fileset: &str, snapshot: &str) -> Result<(), ScaleError> {
        let path = format!("/filesystems/{}/filesets/{}/snapshots/{}", fs, fileset, snapshot);
        self.run_job(Method::DELETE, &path, self.request(Method::DELETE, &path))
            .await?;
        info!(fs, fileset, snapshot, "Deleted snapshot");
        Ok(())
    }

    pub async fn list_snapshots(&self, fs: &str, fileset: &str) -> Result<Vec<Snapshot>, ScaleError> {
        let response: SnapshotsResponse = self
            .get_json(&format!("/filesystems/{}/filesets/{}/snapshots", fs, fileset))
            .await?;
        Ok(response.snapshots)
    }
}
