//! Custom Resource Definitions for Hive
//!
//! All CRDs live in the `hive.openshift.io/v1` API group.

mod cluster_deployment;
mod hive_config;
mod image_set;
mod machine_pool;
mod sync_set;
mod types;

pub use cluster_deployment::{
    AwsPlatform, AzurePlatform, CertificateBundleSpec, ClusterDeployment, ClusterDeploymentSpec,
    ClusterDeploymentStatus, ClusterIngress, ClusterMetadata, ControlPlaneConfigSpec,
    ControlPlaneServingCertificateSpec, GcpPlatform, Platform, Provisioning,
    UNREACHABLE_CONDITION,
};
pub use hive_config::{ArgoCdConfig, HiveConfig, HiveConfigSpec};
pub use image_set::{ClusterImageSet, ClusterImageSetSpec};
pub use machine_pool::{
    AwsMachinePool, AwsRootVolume, AzureMachinePool, AzureOsDisk, GcpMachinePool, MachinePool,
    MachinePoolPlatform, MachinePoolSpec,
};
pub use sync_set::{
    LabelSelector, ResourceApplyMode, SelectorSyncSet, SelectorSyncSetSpec, SyncSet,
    SyncSetCommonSpec, SyncSetSpec,
};
pub use types::{
    find_condition, set_condition, Condition, ConditionStatus, LocalObjectReference,
    UpdateConditionCheck,
};

use kube::CustomResourceExt;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;

/// CRD manifests for every Hive resource, in install order
pub fn all_crds() -> Vec<CustomResourceDefinition> {
    vec![
        ClusterDeployment::crd(),
        MachinePool::crd(),
        ClusterImageSet::crd(),
        SyncSet::crd(),
        SelectorSyncSet::crd(),
        HiveConfig::crd(),
    ]
}
