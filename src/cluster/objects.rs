//! Create and delete helpers shared by every object kind the suite manages.

use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::Resource;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cluster::wait::{WaitError, wait_for_deletion};
use crate::error::{Error, Result};

/// Create an object and return the stored version.
pub async fn create<K>(api: &Api<K>, object: &K) -> Result<K>
where
    K: Resource + Clone + DeserializeOwned + Serialize + Debug,
    <K as Resource>::DynamicType: Default,
{
    let created = api.create(&PostParams::default(), object).await?;
    debug!(
        kind = %K::kind(&K::DynamicType::default()),
        name = ?Resource::meta(&created).name,
        "Created"
    );
    Ok(created)
}

/// Delete an object, treating an already missing object as deleted.
pub async fn delete<K>(api: &Api<K>, name: &str) -> Result<()>
where
    K: Resource + Clone + DeserializeOwned + Debug,
    <K as Resource>::DynamicType: Default,
{
    match api.delete(name, &DeleteParams::default()).await {
        Ok(_) => {
            debug!(kind = %K::kind(&K::DynamicType::default()), name, "Deleted");
            Ok(())
        }
        Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Delete an object and wait until it is gone.
pub async fn delete_and_wait<K>(api: &Api<K>, name: &str, timeout: Duration) -> Result<()>
where
    K: Resource + Clone + DeserializeOwned + Debug + Send + 'static,
    <K as Resource>::DynamicType: Default,
{
    delete(api, name).await?;
    wait_for_deletion(api, name, timeout)
        .await
        .map_err(|e: WaitError| Error::wait(name, e))
}

/// Best-effort deletion of every object matching `selector`.
///
/// Returns the number of delete requests accepted.
pub async fn delete_labeled<K>(api: &Api<K>, selector: &str) -> usize
where
    K: Resource + Clone + DeserializeOwned + Debug,
    <K as Resource>::DynamicType: Default,
{
    let kind = K::kind(&K::DynamicType::default()).to_string();
    let list = match api.list(&ListParams::default().labels(selector)).await {
        Ok(list) => list,
        Err(e) => {
            warn!(%kind, error = %e, "Failed to list for cleanup");
            return 0;
        }
    };

    let mut deleted = 0;
    for object in list.items {
        if let Some(name) = Resource::meta(&object).name.as_ref() {
            match api.delete(name, &DeleteParams::default()).await {
                Ok(_) => deleted += 1,
                Err(kube::Error::Api(e)) if e.code == 404 => {}
                Err(e) => warn!(%kind, %name, error = %e, "Failed to delete"),
            }
        }
    }
    deleted
}
