//! AWS cloud provider
//!
//! Credentials are an access key pair stored as string data.

use k8s_openapi::api::core::v1::Secret;

use hive_common::crd::{AwsMachinePool, AwsPlatform, AwsRootVolume, LocalObjectReference};

use crate::install_config::{InstallMachinePlatform, InstallPlatform, InstallRootVolume};
use crate::objects::{string_data_secret, SECRET_TYPE_OPAQUE};

/// Default AWS region
pub const AWS_REGION: &str = "us-east-1";
/// Default EC2 instance type
pub const AWS_INSTANCE_TYPE: &str = "m4.xlarge";
/// Root volume provisioned IOPS
pub const AWS_VOLUME_IOPS: i64 = 100;
/// Root volume size in GiB
pub const AWS_VOLUME_SIZE: i64 = 22;
/// Root volume type
pub const AWS_VOLUME_TYPE: &str = "gp2";

/// Secret key holding the access key ID
pub const AWS_ACCESS_KEY_ID_KEY: &str = "aws_access_key_id";
/// Secret key holding the secret access key
pub const AWS_SECRET_ACCESS_KEY_KEY: &str = "aws_secret_access_key";

/// AWS account credentials
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AwsProvider {
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
}

impl AwsProvider {
    /// Create a provider from an access key pair
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }

    pub(super) fn cluster_deployment_platform(
        &self,
        credentials: LocalObjectReference,
    ) -> AwsPlatform {
        AwsPlatform {
            credentials_secret_ref: credentials,
            region: AWS_REGION.to_string(),
        }
    }

    pub(super) fn machine_pool_platform(&self) -> AwsMachinePool {
        AwsMachinePool {
            instance_type: AWS_INSTANCE_TYPE.to_string(),
            root_volume: AwsRootVolume {
                iops: AWS_VOLUME_IOPS,
                size: AWS_VOLUME_SIZE,
                type_: AWS_VOLUME_TYPE.to_string(),
            },
        }
    }

    pub(super) fn install_platform(&self) -> (InstallPlatform, InstallMachinePlatform) {
        (
            InstallPlatform::Aws {
                region: AWS_REGION.to_string(),
            },
            InstallMachinePlatform::Aws {
                instance_type: AWS_INSTANCE_TYPE.to_string(),
                root_volume: InstallRootVolume {
                    iops: AWS_VOLUME_IOPS,
                    size: AWS_VOLUME_SIZE,
                    type_: AWS_VOLUME_TYPE.to_string(),
                },
            },
        )
    }

    pub(super) fn credentials_secret(&self, name: String, namespace: &str) -> Secret {
        string_data_secret(
            name,
            namespace,
            SECRET_TYPE_OPAQUE,
            [
                (AWS_ACCESS_KEY_ID_KEY, self.access_key_id.clone()),
                (AWS_SECRET_ACCESS_KEY_KEY, self.secret_access_key.clone()),
            ],
        )
    }
}
