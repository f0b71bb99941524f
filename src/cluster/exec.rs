//! Command execution inside test pods.

use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, AttachParams};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::error::{Error, Result};

/// Run `command` in the first container of `pod` and return its stdout.
pub async fn exec(api: &Api<Pod>, pod: &str, command: Vec<String>) -> Result<String> {
    debug!(pod, ?command, "Exec");
    let params = AttachParams::default()
        .stdin(false)
        .stdout(true)
        .stderr(true);
    let mut process = api.exec(pod, command, &params).await?;

    let (stdout_reader, stderr_reader) = (process.stdout(), process.stderr());
    let (stdout, stderr) = tokio::join!(read_all(stdout_reader), read_all(stderr_reader));
    let (stdout, stderr) = (stdout?, stderr?);

    let status = match process.take_status() {
        Some(status) => status.await,
        None => None,
    };
    process.join().await.map_err(|e| Error::Exec {
        pod: pod.to_string(),
        message: e.to_string(),
    })?;

    match status {
        Some(status) if status.status.as_deref() == Some("Failure") => Err(Error::Exec {
            pod: pod.to_string(),
            message: status
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or(stderr),
        }),
        _ => Ok(stdout),
    }
}

/// Drain one output stream of a process; both are read together so
/// neither pipe fills up while the other is read.
async fn read_all(reader: Option<impl AsyncRead + Unpin>) -> std::io::Result<String> {
    let mut out = String::new();
    if let Some(mut reader) = reader {
        reader.read_to_string(&mut out).await?;
    }
    Ok(out)
}
