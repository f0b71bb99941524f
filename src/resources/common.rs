//! Common resource generation utilities.
//!
//! Provides labels, names and metadata shared by every object the suite
//! creates, so leftovers of any case can be found and removed by label.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Label marking objects created by the suite.
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY_VALUE: &str = "scale-snapshot-suite";

/// Label carrying the case that created an object.
pub const CASE_LABEL: &str = "scale-snapshot-suite/case";

/// Label selecting the pods of one claim.
pub const CLAIM_LABEL: &str = "scale-snapshot-suite/claim";

/// Standard labels applied to all created objects
pub fn standard_labels(case: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string());
    labels.insert(
        "app.kubernetes.io/part-of".to_string(),
        "csi-functional-tests".to_string(),
    );
    labels.insert(CASE_LABEL.to_string(), label_value(case));
    labels
}

/// Label selector matching every object of a case.
pub fn case_selector(case: &str) -> String {
    format!("{}={}", CASE_LABEL, label_value(case))
}

/// Unique object name `<prefix>-<8 hex chars>`.
pub fn unique_name(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, suffix.get(..8).unwrap_or(&suffix))
}

/// Metadata for a namespaced object.
pub fn namespaced_meta(name: &str, namespace: &str, case: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        labels: Some(standard_labels(case)),
        ..Default::default()
    }
}

/// Metadata for a cluster-scoped object.
pub fn cluster_meta(name: &str, case: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        labels: Some(standard_labels(case)),
        ..Default::default()
    }
}

/// Truncate and sanitize a string into a valid label value.
fn label_value(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '-'
            }
        })
        .take(63)
        .collect();
    cleaned
        .trim_matches(|c: char| !c.is_ascii_alphanumeric())
        .to_string()
}
