//! Wire types of the filesystem management API.

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct InfoResponse {
    pub info: Info,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Info {
    pub server_version: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FilesystemsResponse {
    #[serde(default)]
    pub filesystems: Vec<Filesystem>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Filesystem {
    pub name: String,
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub mount: Option<Mount>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mount {
    pub mount_point: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateFilesetRequest<'a> {
    pub fileset_name: &'a str,
    pub inode_space: &'a str,
    pub max_num_inodes: &'a str,
    pub alloc_inodes: &'a str,
    pub path: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateSnapshotRequest<'a> {
    pub snapshot_name: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SnapshotsResponse {
    #[serde(default)]
    pub snapshots: Vec<Snapshot>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub snapshot_name: String,
    #[serde(default)]
    pub fileset_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct JobsResponse {
    #[serde(default)]
    pub jobs: Vec<Job>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Job {
    pub job_id: u64,
    pub status: JobStatus,
    #[serde(default)]
    pub result: Option<JobResult>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub(crate) enum JobStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct JobResult {
    #[serde(default)]
    pub stderr: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub status: ErrorStatus,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorStatus {
    #[serde(default)]
    pub message: String,
}
