//! Watch-based condition waiting utilities.
//!
//! Provides functions to wait for resources to reach specific states
//! using the Kubernetes watch API.

use futures::StreamExt;
use kube::Resource;
use kube::api::Api;
use kube::runtime::watcher::{self, Event};
use std::fmt::Debug;
use std::time::Duration;
use tokio::time::timeout;

/// Error type for wait operations.
#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    #[error("Timeout waiting for condition after {0:?}")]
    Timeout(Duration),

    #[error("Resource was deleted while waiting")]
    ResourceDeleted,

    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Watcher error: {0}")]
    WatcherError(#[from] watcher::Error),

    #[error("Watch stream ended unexpectedly")]
    StreamEnded,
}

fn name_selector(name: &str) -> watcher::Config {
    watcher::Config::default().fields(&format!("metadata.name={}", name))
}

/// Wait for a resource to satisfy a condition.
///
/// The current state is checked first; the watch only runs when the
/// condition does not hold yet.
pub async fn wait_for_condition<K, F>(
    api: &Api<K>,
    name: &str,
    condition: F,
    timeout_duration: Duration,
) -> Result<K, WaitError>
where
    K: Resource + Clone + Debug + Send + 'static,
    K: serde::de::DeserializeOwned,
    <K as Resource>::DynamicType: Default,
    F: Fn(&K) -> bool,
{
    let watch_future = async {
        let mut stream = watcher::watcher(api.clone(), name_selector(name)).boxed();

        if let Ok(resource) = api.get(name).await
            && condition(&resource)
        {
            return Ok(resource);
        }

        while let Some(event) = stream.next().await {
            match event {
                Ok(Event::Apply(resource)) | Ok(Event::InitApply(resource)) => {
                    if condition(&resource) {
                        return Ok(resource);
                    }
                }
                Ok(Event::Delete(_)) => {
                    return Err(WaitError::ResourceDeleted);
                }
                Ok(Event::Init) | Ok(Event::InitDone) => {}
                Err(e) => {
                    return Err(WaitError::WatcherError(e));
                }
            }
        }

        Err(WaitError::StreamEnded)
    };

    timeout(timeout_duration, watch_future)
        .await
        .map_err(|_| WaitError::Timeout(timeout_duration))?
}

/// Wait for a resource to exist.
pub async fn wait_for_resource<K>(
    api: &Api<K>,
    name: &str,
    timeout_duration: Duration,
) -> Result<K, WaitError>
where
    K: Resource + Clone + Debug + Send + 'static,
    K: serde::de::DeserializeOwned,
    <K as Resource>::DynamicType: Default,
{
    wait_for_condition(api, name, |_| true, timeout_duration).await
}

/// Wait for a resource to be deleted.
pub async fn wait_for_deletion<K>(
    api: &Api<K>,
    name: &str,
    timeout_duration: Duration,
) -> Result<(), WaitError>
where
    K: Resource + Clone + Debug + Send + 'static,
    K: serde::de::DeserializeOwned,
    <K as Resource>::DynamicType: Default,
{
    let wait_future = async {
        match api.get(name).await {
            Err(kube::Error::Api(e)) if e.code == 404 => {
                return Ok(());
            }
            Err(e) => return Err(WaitError::KubeError(e)),
            Ok(_) => {}
        }

        let mut stream = watcher::watcher(api.clone(), name_selector(name)).boxed();
        let mut listed = false;

        while let Some(event) = stream.next().await {
            match event {
                Ok(Event::Delete(_)) => {
                    return Ok(());
                }
                Ok(Event::InitApply(_)) => listed = true,
                // Gone between the get and the initial list
                Ok(Event::InitDone) if !listed => return Ok(()),
                Ok(_) => continue,
                Err(e) => {
                    return Err(WaitError::WatcherError(e));
                }
            }
        }

        Err(WaitError::StreamEnded)
    };

    timeout(timeout_duration, wait_future)
        .await
        .map_err(|_| WaitError::Timeout(timeout_duration))?
}
