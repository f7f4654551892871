//! ClusterDeployment CRD, the root object for one managed cluster
//!
//! A ClusterDeployment is created not-installed (by `create-cluster` or a
//! user), flipped to installed by the install job, and observed by the
//! reachability and registration controllers.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{Condition, LocalObjectReference};

/// Condition type set when the cluster's API server cannot be reached
pub const UNREACHABLE_CONDITION: &str = "Unreachable";

/// Desired state of a managed OpenShift cluster.
///
/// Example:
/// ```yaml
/// apiVersion: hive.openshift.io/v1
/// kind: ClusterDeployment
/// metadata:
///   name: bar
///   namespace: hive
/// spec:
///   clusterName: bar
///   baseDomain: new-installer.openshift.com
///   platform:
///     aws:
///       region: us-east-1
///       credentialsSecretRef:
///         name: bar-aws-creds
///   provisioning:
///     installConfigSecretRef:
///       name: bar-install-config
/// ```
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "hive.openshift.io",
    version = "v1",
    kind = "ClusterDeployment",
    plural = "clusterdeployments",
    shortname = "cd",
    namespaced,
    status = "ClusterDeploymentStatus",
    printcolumn = r#"{"name":"ClusterName","type":"string","jsonPath":".spec.clusterName"}"#,
    printcolumn = r#"{"name":"BaseDomain","type":"string","jsonPath":".spec.baseDomain"}"#,
    printcolumn = r#"{"name":"Installed","type":"boolean","jsonPath":".spec.installed"}"#,
    printcolumn = r#"{"name":"InfraID","type":"string","jsonPath":".spec.clusterMetadata.infraID"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDeploymentSpec {
    /// Friendly name of the cluster, used in DNS records
    pub cluster_name: String,

    /// Base DNS domain of the cluster
    pub base_domain: String,

    /// Cloud the cluster runs on
    pub platform: Platform,

    /// Secret holding the image pull secret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_secret_ref: Option<LocalObjectReference>,

    /// Inputs for the install job; absent for adopted clusters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning: Option<Provisioning>,

    /// Identity of an installed cluster; present iff `installed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_metadata: Option<ClusterMetadata>,

    /// Whether the cluster has been installed (or adopted)
    #[serde(default)]
    pub installed: bool,

    /// Whether Hive manages DNS for the base domain
    #[serde(default, rename = "manageDNS")]
    pub manage_dns: bool,

    /// Certificate bundles available to the control plane and ingress
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub certificate_bundles: Vec<CertificateBundleSpec>,

    /// Control plane settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_plane_config: Option<ControlPlaneConfigSpec>,

    /// Ingress controllers to configure on the cluster
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingress: Vec<ClusterIngress>,
}

/// Cloud platform of a cluster; exactly one variant is set
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum Platform {
    /// Amazon Web Services
    Aws(AwsPlatform),
    /// Microsoft Azure
    Azure(AzurePlatform),
    /// Google Cloud Platform
    Gcp(GcpPlatform),
}

impl Default for Platform {
    fn default() -> Self {
        Self::Aws(AwsPlatform::default())
    }
}

impl Platform {
    /// Short cloud name (aws, azure, gcp)
    pub fn cloud(&self) -> &'static str {
        match self {
            Self::Aws(_) => "aws",
            Self::Azure(_) => "azure",
            Self::Gcp(_) => "gcp",
        }
    }

    /// Secret holding the cloud credentials
    pub fn credentials_secret_ref(&self) -> &LocalObjectReference {
        match self {
            Self::Aws(p) => &p.credentials_secret_ref,
            Self::Azure(p) => &p.credentials_secret_ref,
            Self::Gcp(p) => &p.credentials_secret_ref,
        }
    }
}

/// AWS placement and credentials
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AwsPlatform {
    /// Secret with `aws_access_key_id` and `aws_secret_access_key`
    pub credentials_secret_ref: LocalObjectReference,
    /// AWS region
    pub region: String,
}

/// Azure placement and credentials
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AzurePlatform {
    /// Secret with `osServicePrincipal.json`
    pub credentials_secret_ref: LocalObjectReference,
    /// Azure region
    pub region: String,
    /// Resource group holding the base domain's DNS zone
    pub base_domain_resource_group_name: String,
}

/// GCP placement and credentials
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GcpPlatform {
    /// Secret with `osServiceAccount.json`
    pub credentials_secret_ref: LocalObjectReference,
    /// GCP region
    pub region: String,
}

/// Inputs consumed by the install job
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Provisioning {
    /// Secret with the `install-config.yaml` payload
    pub install_config_secret_ref: LocalObjectReference,
    /// Secret with the SSH private key for nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_private_key_secret_ref: Option<LocalObjectReference>,
    /// ClusterImageSet selecting the release to install
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_set_ref: Option<LocalObjectReference>,
    /// ConfigMap with extra manifests handed to the installer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifests_config_map_ref: Option<LocalObjectReference>,
}

/// Identity of an installed cluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterMetadata {
    /// Cluster UUID
    #[serde(rename = "clusterID")]
    pub cluster_id: String,
    /// Infrastructure name used to tag cloud resources
    #[serde(rename = "infraID")]
    pub infra_id: String,
    /// Secret with the admin kubeconfig
    pub admin_kubeconfig_secret_ref: LocalObjectReference,
    /// Secret with the admin username and password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_password_secret_ref: Option<LocalObjectReference>,
}

/// A named certificate bundle
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CertificateBundleSpec {
    /// Bundle name referenced by control plane and ingress settings
    pub name: String,
    /// TLS secret with `tls.crt` and `tls.key`
    pub certificate_secret_ref: LocalObjectReference,
}

/// Control plane settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneConfigSpec {
    /// Certificates served by the API server
    pub serving_certificates: ControlPlaneServingCertificateSpec,
}

/// Certificates served by the API server
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneServingCertificateSpec {
    /// Bundle served for the default API URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// Ingress controller configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterIngress {
    /// Ingress controller name
    pub name: String,
    /// Wildcard domain served by the controller
    pub domain: String,
    /// Certificate bundle served by the controller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serving_certificate: Option<String>,
}

/// Observed state of a ClusterDeployment
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDeploymentStatus {
    /// URL of the cluster's API server, set once install completes
    #[serde(default, rename = "apiURL", skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// URL of the web console
    #[serde(default, rename = "webConsoleURL", skip_serializing_if = "Option::is_none")]
    pub web_console_url: Option<String>,

    /// Conditions keyed by type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl ClusterDeployment {
    /// Whether a deletion timestamp is set
    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// API URL from status, if populated and non-empty
    pub fn api_url(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.api_url.as_deref())
            .filter(|url| !url.is_empty())
    }

    /// Conditions from status, empty when no status is set
    pub fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_serializes_as_single_key() {
        let platform = Platform::Gcp(GcpPlatform {
            credentials_secret_ref: LocalObjectReference::new("bar-gcp-creds"),
            region: "us-east1".to_string(),
        });
        let json = serde_json::to_value(&platform).expect("serialize");
        assert_eq!(json["gcp"]["region"], "us-east1");
        assert_eq!(json["gcp"]["credentialsSecretRef"]["name"], "bar-gcp-creds");
        assert_eq!(json.as_object().map(|o| o.len()), Some(1));
    }

    #[test]
    fn spec_uses_hive_field_names() {
        let spec = ClusterDeploymentSpec {
            cluster_name: "bar".to_string(),
            base_domain: "example.com".to_string(),
            manage_dns: true,
            installed: true,
            cluster_metadata: Some(ClusterMetadata {
                cluster_id: "uuid".to_string(),
                infra_id: "bar-x7f2".to_string(),
                admin_kubeconfig_secret_ref: LocalObjectReference::new("k"),
                admin_password_secret_ref: None,
            }),
            ..Default::default()
        };
        let json = serde_json::to_value(&spec).expect("serialize");
        assert_eq!(json["manageDNS"], true);
        assert_eq!(json["clusterMetadata"]["clusterID"], "uuid");
        assert_eq!(json["clusterMetadata"]["infraID"], "bar-x7f2");
        assert!(json.get("provisioning").is_none());
        assert!(json.get("ingress").is_none());
    }

    #[test]
    fn empty_api_url_is_treated_as_missing() {
        let mut cd = ClusterDeployment::new("bar", ClusterDeploymentSpec::default());
        assert_eq!(cd.api_url(), None);
        cd.status = Some(ClusterDeploymentStatus {
            api_url: Some(String::new()),
            ..Default::default()
        });
        assert_eq!(cd.api_url(), None);
        cd.status = Some(ClusterDeploymentStatus {
            api_url: Some("https://api.bar.example.com:6443".to_string()),
            ..Default::default()
        });
        assert_eq!(cd.api_url(), Some("https://api.bar.example.com:6443"));
    }

    #[test]
    fn status_reads_api_url_field() {
        let status: ClusterDeploymentStatus =
            serde_json::from_value(serde_json::json!({"apiURL": "https://x:6443"}))
                .expect("deserialize");
        assert_eq!(status.api_url.as_deref(), Some("https://x:6443"));
        assert!(status.conditions.is_empty());
    }
}
