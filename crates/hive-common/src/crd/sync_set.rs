//! SyncSet and SelectorSyncSet CRDs
//!
//! Both carry raw Kubernetes objects to be applied to remote clusters. A
//! SyncSet targets ClusterDeployments by name; a SelectorSyncSet targets every
//! ClusterDeployment matching a label selector.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::gen::SchemaGenerator;
use schemars::schema::{ArrayValidation, InstanceType, Schema, SchemaObject};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::LocalObjectReference;

/// How resources removed from a sync set are treated on the target cluster
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ResourceApplyMode {
    /// Apply only; removed resources are left in place
    #[default]
    Upsert,
    /// Removed resources are deleted from the target cluster
    Sync,
}

/// Fields shared by SyncSet and SelectorSyncSet
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncSetCommonSpec {
    /// Raw objects applied to the target clusters
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[schemars(schema_with = "raw_object_list")]
    pub resources: Vec<serde_json::Value>,

    /// Treatment of resources removed from the list
    #[serde(default)]
    pub resource_apply_mode: ResourceApplyMode,
}

/// Objects synced to the named ClusterDeployments
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "hive.openshift.io",
    version = "v1",
    kind = "SyncSet",
    plural = "syncsets",
    shortname = "ss",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct SyncSetSpec {
    /// Resources and apply mode
    #[serde(flatten)]
    pub common: SyncSetCommonSpec,

    /// ClusterDeployments in the same namespace to sync to
    pub cluster_deployment_refs: Vec<LocalObjectReference>,
}

/// Objects synced to every ClusterDeployment matching a selector
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "hive.openshift.io",
    version = "v1",
    kind = "SelectorSyncSet",
    plural = "selectorsyncsets",
    shortname = "sss"
)]
#[serde(rename_all = "camelCase")]
pub struct SelectorSyncSetSpec {
    /// Resources and apply mode
    #[serde(flatten)]
    pub common: SyncSetCommonSpec,

    /// Label selector over ClusterDeployments
    pub cluster_deployment_selector: LabelSelector,
}

/// Equality-based label selector
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    /// Labels that must all match
    #[serde(default)]
    pub match_labels: BTreeMap<String, String>,
}

fn raw_object_list(_: &mut SchemaGenerator) -> Schema {
    let mut item = SchemaObject {
        instance_type: Some(InstanceType::Object.into()),
        ..Default::default()
    };
    item.extensions.insert(
        "x-kubernetes-preserve-unknown-fields".to_string(),
        serde_json::Value::Bool(true),
    );
    Schema::Object(SchemaObject {
        instance_type: Some(InstanceType::Array.into()),
        array: Some(Box::new(ArrayValidation {
            items: Some(Schema::Object(item).into()),
            ..Default::default()
        })),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_set_flattens_common_fields() {
        let spec = SyncSetSpec {
            common: SyncSetCommonSpec {
                resources: vec![serde_json::json!({"kind": "ConfigMap"})],
                resource_apply_mode: ResourceApplyMode::Sync,
            },
            cluster_deployment_refs: vec![LocalObjectReference::new("bar")],
        };
        let json = serde_json::to_value(&spec).expect("serialize");
        assert_eq!(json["resourceApplyMode"], "Sync");
        assert_eq!(json["resources"][0]["kind"], "ConfigMap");
        assert_eq!(json["clusterDeploymentRefs"][0]["name"], "bar");
    }

    #[test]
    fn apply_mode_defaults_to_upsert() {
        let spec: SelectorSyncSetSpec = serde_json::from_value(serde_json::json!({
            "clusterDeploymentSelector": {"matchLabels": {"a": "b"}}
        }))
        .expect("deserialize");
        assert_eq!(spec.common.resource_apply_mode, ResourceApplyMode::Upsert);
        assert_eq!(
            spec.cluster_deployment_selector.match_labels.get("a"),
            Some(&"b".to_string())
        );
    }
}
