//! Installer configuration embedded in the install-config secret
//!
//! Only the fields the generator sets are modelled; the installer accepts
//! many more.

use serde::{Deserialize, Serialize};

use hive_common::{Error, Result};

/// Key of the install config inside its secret
pub const INSTALL_CONFIG_SECRET_KEY: &str = "install-config.yaml";

/// Network plugin for the cluster network
pub const NETWORK_TYPE: &str = "OpenShiftSDN";
/// CIDR for services
pub const SERVICE_NETWORK: &str = "172.30.0.0/16";
/// CIDR pods are allocated from
pub const CLUSTER_NETWORK: &str = "10.128.0.0/14";
/// Per-node pod subnet prefix length
pub const CLUSTER_NETWORK_HOST_PREFIX: i32 = 23;
/// CIDR of the machines themselves
pub const MACHINE_NETWORK: &str = "10.0.0.0/16";
/// Control plane replica count
pub const CONTROL_PLANE_REPLICAS: i64 = 3;

/// Installer input for one cluster
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstallConfig {
    /// Schema version, always "v1"
    pub api_version: String,
    /// Carries the cluster name
    pub metadata: InstallConfigMetadata,
    /// Base DNS domain
    pub base_domain: String,
    /// Public SSH key installed on every node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key: Option<String>,
    /// Cluster networking
    pub networking: Networking,
    /// Control plane machines
    pub control_plane: MachinePoolConfig,
    /// Compute machine pools
    pub compute: Vec<MachinePoolConfig>,
    /// Cloud settings; set by the cloud provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<InstallPlatform>,
}

/// Install config metadata
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct InstallConfigMetadata {
    /// Cluster name
    pub name: String,
}

/// Cluster networking
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Networking {
    /// Network plugin
    pub network_type: String,
    /// Service CIDRs
    pub service_network: Vec<String>,
    /// Pod CIDRs
    pub cluster_network: Vec<ClusterNetworkEntry>,
    /// Machine CIDRs
    pub machine_network: Vec<MachineNetworkEntry>,
}

/// Pod CIDR with the per-node subnet size
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNetworkEntry {
    /// CIDR
    pub cidr: String,
    /// Per-node prefix length
    pub host_prefix: i32,
}

/// Machine CIDR
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct MachineNetworkEntry {
    /// CIDR
    pub cidr: String,
}

/// Machines of one pool
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct MachinePoolConfig {
    /// Pool name ("master" or "worker")
    pub name: String,
    /// Machine count
    pub replicas: i64,
    /// Cloud-specific machine shape
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<InstallMachinePlatform>,
}

/// Cloud placement for the install
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum InstallPlatform {
    /// AWS placement
    Aws {
        /// Region
        region: String,
    },
    /// Azure placement
    Azure {
        /// Region
        region: String,
        /// Resource group with the base domain's DNS zone
        #[serde(rename = "baseDomainResourceGroupName")]
        base_domain_resource_group_name: String,
    },
    /// GCP placement
    Gcp {
        /// Project to install into
        #[serde(rename = "projectID")]
        project_id: String,
        /// Region
        region: String,
    },
}

/// Cloud-specific machine shape in the install config
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum InstallMachinePlatform {
    /// EC2 instance
    Aws {
        /// Instance type
        #[serde(rename = "type")]
        instance_type: String,
        /// Root volume
        #[serde(rename = "rootVolume")]
        root_volume: InstallRootVolume,
    },
    /// Azure VM; installer defaults apply
    Azure {},
    /// GCE instance
    Gcp {
        /// Machine type
        #[serde(rename = "type")]
        instance_type: String,
    },
}

/// EC2 root volume
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct InstallRootVolume {
    /// Provisioned IOPS
    pub iops: i64,
    /// Size in GiB
    pub size: i64,
    /// Volume type
    #[serde(rename = "type")]
    pub type_: String,
}

impl InstallConfig {
    /// Cloud-agnostic install config; the cloud provider adds platform fields
    pub fn new(
        name: &str,
        base_domain: &str,
        ssh_public_key: Option<&str>,
        workers: i64,
    ) -> Self {
        Self {
            api_version: "v1".to_string(),
            metadata: InstallConfigMetadata {
                name: name.to_string(),
            },
            base_domain: base_domain.to_string(),
            ssh_key: ssh_public_key.map(str::to_string),
            networking: Networking {
                network_type: NETWORK_TYPE.to_string(),
                service_network: vec![SERVICE_NETWORK.to_string()],
                cluster_network: vec![ClusterNetworkEntry {
                    cidr: CLUSTER_NETWORK.to_string(),
                    host_prefix: CLUSTER_NETWORK_HOST_PREFIX,
                }],
                machine_network: vec![MachineNetworkEntry {
                    cidr: MACHINE_NETWORK.to_string(),
                }],
            },
            control_plane: MachinePoolConfig {
                name: "master".to_string(),
                replicas: CONTROL_PLANE_REPLICAS,
                platform: None,
            },
            compute: vec![MachinePoolConfig {
                name: "worker".to_string(),
                replicas: workers,
                platform: None,
            }],
            platform: None,
        }
    }

    /// Set the same machine shape on the control plane and every compute pool
    pub fn set_machine_platform(&mut self, platform: InstallMachinePlatform) {
        for pool in &mut self.compute {
            pool.platform = Some(platform.clone());
        }
        self.control_plane.platform = Some(platform);
    }

    /// Serialize to the YAML document the installer reads
    pub fn to_yaml(&self) -> Result<String> {
        // Go through JSON so platform enums render as plain mappings, not YAML tags
        let value = serde_json::to_value(self)
            .map_err(|e| Error::serialization_for_kind("InstallConfig", e.to_string()))?;
        serde_yaml::to_string(&value)
            .map_err(|e| Error::serialization_for_kind("InstallConfig", e.to_string()))
    }
}
