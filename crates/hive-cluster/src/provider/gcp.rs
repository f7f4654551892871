//! GCP cloud provider

use k8s_openapi::api::core::v1::Secret;

use hive_common::crd::{GcpMachinePool, GcpPlatform, LocalObjectReference};

use crate::install_config::{InstallMachinePlatform, InstallPlatform};
use crate::objects::{binary_data_secret, SECRET_TYPE_OPAQUE};

/// Default GCP region
pub const GCP_REGION: &str = "us-east1";
/// Default machine type
pub const GCP_INSTANCE_TYPE: &str = "n1-standard-4";

/// Secret key holding the service account
pub const GCP_CREDENTIALS_KEY: &str = "osServiceAccount.json";

/// GCP project and service account
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GcpProvider {
    /// Project to install into
    pub project_id: String,
    /// Service account JSON blob
    pub service_account: Vec<u8>,
}

impl GcpProvider {
    /// Create a provider for a project
    pub fn new(project_id: impl Into<String>, service_account: impl Into<Vec<u8>>) -> Self {
        Self {
            project_id: project_id.into(),
            service_account: service_account.into(),
        }
    }

    pub(super) fn cluster_deployment_platform(
        &self,
        credentials: LocalObjectReference,
    ) -> GcpPlatform {
        GcpPlatform {
            credentials_secret_ref: credentials,
            region: GCP_REGION.to_string(),
        }
    }

    pub(super) fn machine_pool_platform(&self) -> GcpMachinePool {
        GcpMachinePool {
            instance_type: GCP_INSTANCE_TYPE.to_string(),
        }
    }

    pub(super) fn install_platform(&self) -> (InstallPlatform, InstallMachinePlatform) {
        (
            InstallPlatform::Gcp {
                project_id: self.project_id.clone(),
                region: GCP_REGION.to_string(),
            },
            InstallMachinePlatform::Gcp {
                instance_type: GCP_INSTANCE_TYPE.to_string(),
            },
        )
    }

    pub(super) fn credentials_secret(&self, name: String, namespace: &str) -> Secret {
        binary_data_secret(
            name,
            namespace,
            SECRET_TYPE_OPAQUE,
            [(GCP_CREDENTIALS_KEY, self.service_account.clone())],
        )
    }
}
