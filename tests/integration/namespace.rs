//! RAII namespace management for isolated tests.
//!
//! Each test runs its case in its own namespace that is automatically
//! cleaned up when the test completes.
//!
//! IMPORTANT: Tests using TestNamespace must use `#[tokio::test(flavor = "multi_thread")]`
//! to support synchronous cleanup via `block_in_place`.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use k8s_openapi::api::core::v1::{Namespace, PersistentVolumeClaim, Pod};
use kube::api::{Api, DeleteParams, ObjectMeta, PostParams};
use kube::{Client, Resource};
use scale_snapshot_suite::crd::VolumeSnapshot;
use scale_snapshot_suite::resources::unique_name;
use serde::de::DeserializeOwned;

/// A test namespace that is automatically deleted when dropped.
///
/// IMPORTANT: Tests using this must use `#[tokio::test(flavor = "multi_thread")]`
pub struct TestNamespace {
    client: Client,
    name: String,
    /// Track if cleanup has already been initiated
    cleanup_initiated: AtomicBool,
}

impl TestNamespace {
    /// Create a new test namespace named `{prefix}-{8 hex chars}`.
    pub async fn create(client: Client, prefix: &str) -> Self {
        let name = unique_name(prefix);
        let ns_api: Api<Namespace> = Api::all(client.clone());

        let ns = Namespace {
            metadata: ObjectMeta {
                name: Some(name.clone()),
                labels: Some(
                    [(
                        "app.kubernetes.io/managed-by".to_string(),
                        "integration-test".to_string(),
                    )]
                    .into_iter()
                    .collect(),
                ),
                ..Default::default()
            },
            ..Default::default()
        };

        ns_api
            .create(&PostParams::default(), &ns)
            .await
            .unwrap_or_else(|e| panic!("Failed to create test namespace {}: {}", name, e));

        tracing::info!(namespace = %name, "Created test namespace");

        Self {
            client,
            name,
            cleanup_initiated: AtomicBool::new(false),
        }
    }

    /// Get the name of the test namespace.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get an API client for resources in this namespace.
    pub fn api<K>(&self) -> Api<K>
    where
        K: kube::Resource<Scope = kube::core::NamespaceResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), &self.name)
    }
}

/// Automatic cleanup on drop.
///
/// Pods go first so claims are released, then snapshots before the claims
/// they were taken from, then the namespace itself.
impl Drop for TestNamespace {
    fn drop(&mut self) {
        if self.cleanup_initiated.swap(true, Ordering::SeqCst) {
            return;
        }

        let name = self.name.clone();
        let client = self.client.clone();

        tracing::debug!("Drop: cleaning up namespace {}", name);

        tokio::task::block_in_place(|| {
            let handle = tokio::runtime::Handle::current();
            handle.block_on(async {
                Self::delete_resources::<Pod>(&client, &name).await;
                Self::delete_resources::<VolumeSnapshot>(&client, &name).await;
                Self::delete_resources::<PersistentVolumeClaim>(&client, &name).await;

                let ns_api: Api<Namespace> = Api::all(client);
                let dp = DeleteParams {
                    propagation_policy: Some(kube::api::PropagationPolicy::Background),
                    ..Default::default()
                };

                match ns_api.delete(&name, &dp).await {
                    Ok(_) => {
                        tracing::debug!("Drop: namespace {} deletion initiated", name);
                    }
                    Err(kube::Error::Api(e)) if e.code == 404 => {
                        tracing::debug!("Drop: namespace {} already deleted", name);
                    }
                    Err(e) => {
                        tracing::warn!("Drop: failed to delete namespace {}: {}", name, e);
                    }
                }
            });
        });
    }
}

impl TestNamespace {
    /// Delete all resources of type `T` in the namespace.
    async fn delete_resources<T>(client: &Client, namespace: &str)
    where
        T: Resource<Scope = k8s_openapi::NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <T as Resource>::DynamicType: Default,
    {
        let dt = T::DynamicType::default();
        let kind = T::kind(&dt);
        let api: Api<T> = Api::namespaced(client.clone(), namespace);

        let resource_list = match api.list(&Default::default()).await {
            Ok(list) => list,
            Err(e) => {
                tracing::debug!("Failed to list {} resources for deletion: {}", kind, e);
                return;
            }
        };

        let dp = DeleteParams::default();
        for resource in resource_list.items {
            if let Some(name) = Resource::meta(&resource).name.as_ref()
                && let Err(e) = api.delete(name, &dp).await
            {
                tracing::debug!("Failed to delete {} {}: {}", kind, name, e);
            }
        }
    }
}

/// Wait for a namespace to be fully deleted.
#[allow(dead_code)]
pub async fn wait_for_namespace_deletion(client: Client, name: &str, timeout: Duration) {
    use tokio::time::{Instant, sleep};

    let ns_api: Api<Namespace> = Api::all(client);
    let start = Instant::now();

    loop {
        match ns_api.get_opt(name).await {
            Ok(Some(_)) => {
                if start.elapsed() > timeout {
                    panic!("Timeout waiting for namespace {} to be deleted", name);
                }
                sleep(Duration::from_millis(500)).await;
            }
            Ok(None) => break,
            Err(e) => {
                panic!("Error checking namespace {}: {}", name, e);
            }
        }
    }
}
