//! MachinePool CRD, a named group of compute nodes for one cluster

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::LocalObjectReference;

/// Desired compute capacity of one pool of a ClusterDeployment
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "hive.openshift.io",
    version = "v1",
    kind = "MachinePool",
    plural = "machinepools",
    namespaced,
    printcolumn = r#"{"name":"PoolName","type":"string","jsonPath":".spec.name"}"#,
    printcolumn = r#"{"name":"ClusterDeployment","type":"string","jsonPath":".spec.clusterDeploymentRef.name"}"#,
    printcolumn = r#"{"name":"Replicas","type":"integer","jsonPath":".spec.replicas"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MachinePoolSpec {
    /// ClusterDeployment this pool belongs to
    pub cluster_deployment_ref: LocalObjectReference,

    /// Pool name within the cluster (e.g. "worker")
    pub name: String,

    /// Desired number of machines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i64>,

    /// Cloud-specific machine shape; set by the cloud provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<MachinePoolPlatform>,
}

/// Cloud-specific machine shape; exactly one variant is set
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum MachinePoolPlatform {
    /// AWS instance shape
    Aws(AwsMachinePool),
    /// Azure instance shape
    Azure(AzureMachinePool),
    /// GCP instance shape
    Gcp(GcpMachinePool),
}

/// AWS instance shape
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AwsMachinePool {
    /// EC2 instance type
    #[serde(rename = "type")]
    pub instance_type: String,
    /// Root volume of each instance
    pub root_volume: AwsRootVolume,
}

/// EC2 root volume
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct AwsRootVolume {
    /// Provisioned IOPS
    pub iops: i64,
    /// Size in GiB
    pub size: i64,
    /// Volume type (e.g. gp2)
    #[serde(rename = "type")]
    pub type_: String,
}

/// Azure instance shape
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AzureMachinePool {
    /// VM size
    #[serde(rename = "type")]
    pub instance_type: String,
    /// OS disk of each VM
    pub os_disk: AzureOsDisk,
}

/// Azure OS disk
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct AzureOsDisk {
    /// Disk size in GB
    #[serde(rename = "diskSizeGB")]
    pub disk_size_gb: i64,
}

/// GCP instance shape
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct GcpMachinePool {
    /// Machine type
    #[serde(rename = "type")]
    pub instance_type: String,
}
