//! Azure cloud provider

use k8s_openapi::api::core::v1::Secret;

use hive_common::crd::{AzureMachinePool, AzureOsDisk, AzurePlatform, LocalObjectReference};

use crate::install_config::{InstallMachinePlatform, InstallPlatform};
use crate::objects::{binary_data_secret, SECRET_TYPE_OPAQUE};

/// Default Azure region
pub const AZURE_REGION: &str = "centralus";
/// Default VM size
pub const AZURE_INSTANCE_TYPE: &str = "Standard_D2s_v3";
/// OS disk size in GB
pub const AZURE_OS_DISK_SIZE_GB: i64 = 128;
/// Default resource group holding the base domain
pub const AZURE_BASE_DOMAIN_RESOURCE_GROUP: &str = "os4-common";

/// Secret key holding the service principal
pub const AZURE_CREDENTIALS_KEY: &str = "osServicePrincipal.json";

/// Azure service principal and DNS resource group
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AzureProvider {
    /// Service principal JSON blob
    pub service_principal: Vec<u8>,
    /// Resource group with the base domain's DNS zone
    pub base_domain_resource_group_name: String,
}

impl AzureProvider {
    /// Create a provider from a service principal blob
    pub fn new(
        service_principal: impl Into<Vec<u8>>,
        base_domain_resource_group_name: impl Into<String>,
    ) -> Self {
        Self {
            service_principal: service_principal.into(),
            base_domain_resource_group_name: base_domain_resource_group_name.into(),
        }
    }

    pub(super) fn cluster_deployment_platform(
        &self,
        credentials: LocalObjectReference,
    ) -> AzurePlatform {
        AzurePlatform {
            credentials_secret_ref: credentials,
            region: AZURE_REGION.to_string(),
            base_domain_resource_group_name: self.base_domain_resource_group_name.clone(),
        }
    }

    pub(super) fn machine_pool_platform(&self) -> AzureMachinePool {
        AzureMachinePool {
            instance_type: AZURE_INSTANCE_TYPE.to_string(),
            os_disk: AzureOsDisk {
                disk_size_gb: AZURE_OS_DISK_SIZE_GB,
            },
        }
    }

    pub(super) fn install_platform(&self) -> (InstallPlatform, InstallMachinePlatform) {
        (
            InstallPlatform::Azure {
                region: AZURE_REGION.to_string(),
                base_domain_resource_group_name: self.base_domain_resource_group_name.clone(),
            },
            InstallMachinePlatform::Azure {},
        )
    }

    pub(super) fn credentials_secret(&self, name: String, namespace: &str) -> Secret {
        binary_data_secret(
            name,
            namespace,
            SECRET_TYPE_OPAQUE,
            [(AZURE_CREDENTIALS_KEY, self.service_principal.clone())],
        )
    }
}
