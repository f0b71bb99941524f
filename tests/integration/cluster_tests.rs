//! Checks of the cluster the cases run against.

use k8s_openapi::api::core::v1::ConfigMap;
use scale_snapshot_suite::cluster::{self, check_csi_operator};
use scale_snapshot_suite::resources::common::{case_selector, namespaced_meta};

use crate::{
    DEFAULT_TIMEOUT, SHORT_TIMEOUT, TestNamespace, init_test, suite_in, wait_for_namespace_deletion,
};

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires Kubernetes cluster with the Spectrum Scale CSI driver"]
async fn test_csi_operator_is_ready() {
    let (cluster, client) = init_test().await;
    let data = &cluster.data;
    check_csi_operator(
        &client,
        &data.operator_namespace,
        &data.operator_deployment,
        &data.driver_daemonset,
    )
    .await
    .expect("CSI operator is not ready");
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires Kubernetes cluster with the Spectrum Scale CSI driver"]
async fn test_version_report() {
    let (cluster, client) = init_test().await;
    let test_ns = TestNamespace::create(client, "version-report").await;
    let suite = suite_in(&cluster, &test_ns).await;

    let report = tokio::time::timeout(SHORT_TIMEOUT, suite.version_report())
        .await
        .expect("version report timed out")
        .expect("Failed to collect versions");
    assert_eq!(suite.scale_version(), Some(report.scale));
    assert!(report.to_string().starts_with("IBM Spectrum Scale version: "));
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires Kubernetes cluster"]
async fn test_labelled_objects_are_removed() {
    let (_cluster, client) = init_test().await;
    let test_ns = TestNamespace::create(client.clone(), "labelled-cleanup").await;
    let api = test_ns.api::<ConfigMap>();

    for n in 0..3 {
        let config_map = ConfigMap {
            metadata: namespaced_meta(&format!("leftover-{}", n), test_ns.name(), "cleanup_case"),
            ..Default::default()
        };
        cluster::create(&api, &config_map).await.expect("Failed to create ConfigMap");
    }

    let removed = cluster::delete_labeled(&api, &case_selector("cleanup_case")).await;
    assert_eq!(removed, 3);
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires Kubernetes cluster"]
async fn test_namespace_is_removed_on_drop() {
    let (_cluster, client) = init_test().await;
    let name = {
        let test_ns = TestNamespace::create(client.clone(), "drop-check").await;
        test_ns.name().to_string()
    };
    wait_for_namespace_deletion(client, &name, DEFAULT_TIMEOUT).await;
}
