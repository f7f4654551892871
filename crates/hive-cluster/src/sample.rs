//! Sample SyncSets for exercising resource sync on a new cluster

use std::collections::BTreeMap;

use kube::api::ObjectMeta;

use hive_common::crd::{
    LabelSelector, LocalObjectReference, ResourceApplyMode, SelectorSyncSet, SelectorSyncSetSpec,
    SyncSet, SyncSetCommonSpec, SyncSetSpec,
};
use hive_common::HIVEUTIL_CREATED_LABEL;

use crate::objects::namespaced_meta;

/// Number of SyncSets and of SelectorSyncSets generated
pub const SAMPLE_SYNC_SET_COUNT: usize = 10;

/// ConfigMap `<set>-configmap` carried by a sample sync set
fn sample_config_map(set_name: &str) -> serde_json::Value {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": {
            "name": format!("{}-configmap", set_name),
            "namespace": "default",
        },
        "data": { "foo": "bar" },
    })
}

fn common(set_name: &str) -> SyncSetCommonSpec {
    SyncSetCommonSpec {
        resources: vec![sample_config_map(set_name)],
        resource_apply_mode: ResourceApplyMode::Sync,
    }
}

/// SyncSets `<name>-sample-syncset<i>` targeting the cluster by name
pub fn sample_sync_sets(cluster_name: &str, namespace: &str) -> Vec<SyncSet> {
    (0..SAMPLE_SYNC_SET_COUNT)
        .map(|i| {
            let name = format!("{}-sample-syncset{}", cluster_name, i);
            SyncSet {
                spec: SyncSetSpec {
                    common: common(&name),
                    cluster_deployment_refs: vec![LocalObjectReference::new(cluster_name)],
                },
                metadata: namespaced_meta(name, namespace),
            }
        })
        .collect()
}

/// SelectorSyncSets `sample-selector-syncset<i>` targeting every cluster
/// created by `create-cluster`
pub fn sample_selector_sync_sets() -> Vec<SelectorSyncSet> {
    (0..SAMPLE_SYNC_SET_COUNT)
        .map(|i| {
            let name = format!("sample-selector-syncset{}", i);
            SelectorSyncSet {
                spec: SelectorSyncSetSpec {
                    common: common(&name),
                    cluster_deployment_selector: LabelSelector {
                        match_labels: BTreeMap::from([(
                            HIVEUTIL_CREATED_LABEL.to_string(),
                            "true".to_string(),
                        )]),
                    },
                },
                metadata: ObjectMeta {
                    name: Some(name),
                    ..Default::default()
                },
            }
        })
        .collect()
}
