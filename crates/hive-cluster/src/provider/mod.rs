//! Cloud provider strategy
//!
//! A [`CloudProvider`] supplies everything the generator needs that differs
//! per cloud: placement on the ClusterDeployment, the machine shape of the
//! MachinePool, install-config platform fields, and the credentials secret.
//! It is a closed enum chosen once per generation; every variant follows the
//! same credentials reuse policy.
//!
//! # Supported Providers
//!
//! - [`AwsProvider`] - access key pair
//! - [`AzureProvider`] - service principal
//! - [`GcpProvider`] - service account

mod aws;
mod azure;
mod gcp;

pub use aws::{AwsProvider, AWS_INSTANCE_TYPE, AWS_REGION};
pub use azure::{
    AzureProvider, AZURE_BASE_DOMAIN_RESOURCE_GROUP, AZURE_INSTANCE_TYPE, AZURE_REGION,
};
pub use gcp::{GcpProvider, GCP_INSTANCE_TYPE, GCP_REGION};

use k8s_openapi::api::core::v1::Secret;

use hive_common::crd::{
    ClusterDeploymentSpec, LocalObjectReference, MachinePoolPlatform, MachinePoolSpec, Platform,
};

use crate::install_config::InstallConfig;

/// Cloud-specific behaviour of the generator
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CloudProvider {
    /// Amazon Web Services
    Aws(AwsProvider),
    /// Microsoft Azure
    Azure(AzureProvider),
    /// Google Cloud Platform
    Gcp(GcpProvider),
}

impl CloudProvider {
    /// Short cloud name used in object names (aws, azure, gcp)
    pub fn name(&self) -> &'static str {
        match self {
            Self::Aws(_) => "aws",
            Self::Azure(_) => "azure",
            Self::Gcp(_) => "gcp",
        }
    }

    /// Name of the credentials secret the cluster will reference
    ///
    /// A reused secret keeps its own name; otherwise `<cluster>-<cloud>-creds`.
    pub fn credentials_secret_name(&self, cluster_name: &str, reuse: Option<&str>) -> String {
        match reuse {
            Some(existing) => existing.to_string(),
            None => format!("{}-{}-creds", cluster_name, self.name()),
        }
    }

    /// Set the ClusterDeployment's platform, pointing at `credentials_secret`
    pub fn add_cluster_deployment_platform(
        &self,
        spec: &mut ClusterDeploymentSpec,
        credentials_secret: &str,
    ) {
        let creds = LocalObjectReference::new(credentials_secret);
        spec.platform = match self {
            Self::Aws(p) => Platform::Aws(p.cluster_deployment_platform(creds)),
            Self::Azure(p) => Platform::Azure(p.cluster_deployment_platform(creds)),
            Self::Gcp(p) => Platform::Gcp(p.cluster_deployment_platform(creds)),
        };
    }

    /// Set the MachinePool's machine shape
    pub fn add_machine_pool_platform(&self, spec: &mut MachinePoolSpec) {
        spec.platform = Some(match self {
            Self::Aws(p) => MachinePoolPlatform::Aws(p.machine_pool_platform()),
            Self::Azure(p) => MachinePoolPlatform::Azure(p.machine_pool_platform()),
            Self::Gcp(p) => MachinePoolPlatform::Gcp(p.machine_pool_platform()),
        });
    }

    /// Set install-config placement and machine shapes
    pub fn add_install_config_platform(&self, install_config: &mut InstallConfig) {
        let (platform, machine) = match self {
            Self::Aws(p) => p.install_platform(),
            Self::Azure(p) => p.install_platform(),
            Self::Gcp(p) => p.install_platform(),
        };
        install_config.platform = Some(platform);
        install_config.set_machine_platform(machine);
    }

    /// Build the credentials secret, or nothing when an existing one is reused
    pub fn generate_credentials_secret(
        &self,
        cluster_name: &str,
        namespace: &str,
        reuse: Option<&str>,
    ) -> Option<Secret> {
        if reuse.is_some() {
            return None;
        }
        let name = self.credentials_secret_name(cluster_name, None);
        Some(match self {
            Self::Aws(p) => p.credentials_secret(name, namespace),
            Self::Azure(p) => p.credentials_secret(name, namespace),
            Self::Gcp(p) => p.credentials_secret(name, namespace),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_common::crd::{AwsMachinePool, AzureMachinePool};
    use rstest::rstest;

    fn aws() -> CloudProvider {
        CloudProvider::Aws(AwsProvider::new("AKIA", "secret"))
    }

    fn azure() -> CloudProvider {
        CloudProvider::Azure(AzureProvider::new(
            b"{\"clientId\":\"x\"}".to_vec(),
            AZURE_BASE_DOMAIN_RESOURCE_GROUP,
        ))
    }

    fn gcp() -> CloudProvider {
        CloudProvider::Gcp(GcpProvider::new("my-project", b"{\"type\":\"sa\"}".to_vec()))
    }

    #[rstest]
    #[case::aws(aws(), "bar-aws-creds")]
    #[case::azure(azure(), "bar-azure-creds")]
    #[case::gcp(gcp(), "bar-gcp-creds")]
    fn credentials_secret_is_named_after_cluster_and_cloud(
        #[case] provider: CloudProvider,
        #[case] expected: &str,
    ) {
        let secret = provider
            .generate_credentials_secret("bar", "hive", None)
            .expect("secret generated");
        assert_eq!(secret.metadata.name.as_deref(), Some(expected));
        assert_eq!(secret.metadata.namespace.as_deref(), Some("hive"));
        assert_eq!(secret.type_.as_deref(), Some("Opaque"));
    }

    #[rstest]
    #[case::aws(aws())]
    #[case::azure(azure())]
    #[case::gcp(gcp())]
    fn reused_credentials_are_referenced_not_generated(#[case] provider: CloudProvider) {
        assert!(provider
            .generate_credentials_secret("bar", "hive", Some("shared-creds"))
            .is_none());

        let mut spec = ClusterDeploymentSpec::default();
        let name = provider.credentials_secret_name("bar", Some("shared-creds"));
        provider.add_cluster_deployment_platform(&mut spec, &name);
        assert_eq!(spec.platform.credentials_secret_ref().name, "shared-creds");
        assert_eq!(spec.platform.cloud(), provider.name());
    }

    #[test]
    fn aws_credentials_use_access_key_fields() {
        let secret = aws()
            .generate_credentials_secret("bar", "hive", None)
            .expect("secret");
        let data = secret.string_data.expect("string data");
        assert_eq!(data["aws_access_key_id"], "AKIA");
        assert_eq!(data["aws_secret_access_key"], "secret");
    }

    #[test]
    fn azure_and_gcp_credentials_are_json_blobs() {
        let azure_secret = azure()
            .generate_credentials_secret("bar", "hive", None)
            .expect("secret");
        assert!(azure_secret
            .data
            .expect("data")
            .contains_key("osServicePrincipal.json"));

        let gcp_secret = gcp()
            .generate_credentials_secret("bar", "hive", None)
            .expect("secret");
        assert_eq!(
            gcp_secret.data.expect("data")["osServiceAccount.json"].0,
            b"{\"type\":\"sa\"}".to_vec()
        );
    }

    #[test]
    fn aws_machine_pool_uses_default_shape() {
        let mut spec = MachinePoolSpec::default();
        aws().add_machine_pool_platform(&mut spec);
        match spec.platform {
            Some(MachinePoolPlatform::Aws(AwsMachinePool {
                instance_type,
                root_volume,
            })) => {
                assert_eq!(instance_type, "m4.xlarge");
                assert_eq!(root_volume.iops, 100);
                assert_eq!(root_volume.size, 22);
                assert_eq!(root_volume.type_, "gp2");
            }
            other => panic!("unexpected platform {:?}", other),
        }
    }

    #[test]
    fn azure_machine_pool_sets_disk_size() {
        let mut spec = MachinePoolSpec::default();
        azure().add_machine_pool_platform(&mut spec);
        match spec.platform {
            Some(MachinePoolPlatform::Azure(AzureMachinePool {
                instance_type,
                os_disk,
            })) => {
                assert_eq!(instance_type, "Standard_D2s_v3");
                assert_eq!(os_disk.disk_size_gb, 128);
            }
            other => panic!("unexpected platform {:?}", other),
        }
    }

    #[test]
    fn regions_follow_cloud_defaults() {
        let cases = [
            (aws(), "us-east-1"),
            (azure(), "centralus"),
            (gcp(), "us-east1"),
        ];
        for (provider, region) in cases {
            let mut spec = ClusterDeploymentSpec::default();
            provider.add_cluster_deployment_platform(&mut spec, "c");
            let json = serde_json::to_value(&spec.platform).expect("serialize");
            assert_eq!(json[provider.name()]["region"], region);
        }
    }

    #[test]
    fn install_config_platform_renders_as_plain_mapping() {
        let mut ic = InstallConfig::new("bar", "example.com", None, 3);
        gcp().add_install_config_platform(&mut ic);
        let yaml = ic.to_yaml().expect("yaml");
        let value: serde_yaml::Value = serde_yaml::from_str(&yaml).expect("parse");
        assert_eq!(value["platform"]["gcp"]["projectID"].as_str(), Some("my-project"));
        assert_eq!(value["platform"]["gcp"]["region"].as_str(), Some("us-east1"));
        assert_eq!(
            value["compute"][0]["platform"]["gcp"]["type"].as_str(),
            Some("n1-standard-4")
        );
        assert!(!yaml.contains('!'));
    }

    #[test]
    fn azure_install_config_names_resource_group() {
        let mut ic = InstallConfig::new("bar", "example.com", None, 3);
        azure().add_install_config_platform(&mut ic);
        let json = serde_json::to_value(&ic).expect("serialize");
        assert_eq!(
            json["platform"]["azure"]["baseDomainResourceGroupName"],
            "os4-common"
        );
        assert_eq!(json["controlPlane"]["platform"]["azure"], serde_json::json!({}));
    }
}
