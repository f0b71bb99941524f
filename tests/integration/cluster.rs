//! Shared test cluster singleton.
//!
//! Validates connectivity and loads the driver data once for all tests.
//! Each test creates its own Client from the shared cluster for isolation.

use std::sync::Arc;

use kube::Client;
use scale_snapshot_suite::cluster::connect;
use scale_snapshot_suite::config::DriverData;
use tokio::sync::OnceCell;

/// Global shared test cluster instance.
static SHARED_CLUSTER: OnceCell<Arc<SharedTestCluster>> = OnceCell::const_new();

/// Driver data file used when `SCALE_TEST_CONFIG` is unset.
pub const DEFAULT_TEST_CONFIG: &str = "config/test.config";

/// Shared test cluster providing Kubernetes connectivity and driver data.
pub struct SharedTestCluster {
    pub data: DriverData,
    pub test_config: String,
}

impl SharedTestCluster {
    /// Get or create the shared test cluster.
    ///
    /// The first call validates connectivity and reads the driver data,
    /// subsequent calls return the cached instance.
    pub async fn get() -> Arc<SharedTestCluster> {
        SHARED_CLUSTER
            .get_or_init(|| async {
                let cluster = Self::connect().await.expect(
                    "Failed to reach the cluster. Are kubeconfig and SCALE_TEST_CONFIG set?",
                );
                Arc::new(cluster)
            })
            .await
            .clone()
    }

    /// Create a new Kubernetes client.
    ///
    /// Each test should call this to get its own isolated client.
    pub async fn new_client(&self) -> Client {
        connect(None).await.expect("Failed to create kube client")
    }

    async fn connect() -> scale_snapshot_suite::Result<Self> {
        let test_config =
            std::env::var("SCALE_TEST_CONFIG").unwrap_or_else(|_| DEFAULT_TEST_CONFIG.to_string());
        let data = DriverData::load(&test_config)?;
        // Connecting logs the apiserver version
        connect(None).await?;
        Ok(Self { data, test_config })
    }
}
