//! Event lookup for objects that fail asynchronously.
//!
//! Provisioning failures of restored claims only surface as events on the
//! claim, so expected failures are matched against event messages.

use futures::StreamExt;
use k8s_openapi::api::core::v1::Event as CoreEvent;
use kube::api::{Api, ListParams};
use kube::runtime::watcher::{self, Event};
use kube::Client;
use std::time::Duration;
use tokio::time::timeout;

use crate::cluster::wait::WaitError;

fn involved_object(kind: &str, name: &str) -> String {
    format!("involvedObject.kind={},involvedObject.name={}", kind, name)
}

/// Messages of all events recorded for an object.
pub async fn events_for(
    client: &Client,
    namespace: &str,
    kind: &str,
    name: &str,
) -> Result<Vec<String>, WaitError> {
    let api: Api<CoreEvent> = Api::namespaced(client.clone(), namespace);
    let list = api
        .list(&ListParams::default().fields(&involved_object(kind, name)))
        .await?;
    Ok(list.items.into_iter().filter_map(|e| e.message).collect())
}

/// Wait for an event on an object whose message contains `needle`.
///
/// Returns the full message.
pub async fn wait_for_event(
    client: &Client,
    namespace: &str,
    kind: &str,
    name: &str,
    needle: &str,
    timeout_duration: Duration,
) -> Result<String, WaitError> {
    let api: Api<CoreEvent> = Api::namespaced(client.clone(), namespace);
    let config = watcher::Config::default().fields(&involved_object(kind, name));

    let watch_future = async {
        let mut stream = watcher::watcher(api, config).boxed();
        while let Some(event) = stream.next().await {
            match event {
                Ok(Event::Apply(e)) | Ok(Event::InitApply(e)) => {
                    if let Some(message) = e.message
                        && message.contains(needle)
                    {
                        return Ok(message);
                    }
                }
                Ok(_) => {}
                Err(e) => return Err(WaitError::WatcherError(e)),
            }
        }
        Err(WaitError::StreamEnded)
    };

    timeout(timeout_duration, watch_future)
        .await
        .map_err(|_| WaitError::Timeout(timeout_duration))?
}
