//! Cluster request generator
//!
//! A [`Generator`] holds every resolved input for one cluster (credentials
//! and keys already read from disk) and produces the objects that request or
//! adopt it. All names derive from the cluster name, so generating twice from
//! the same input yields the same object identities.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use tracing::debug;

use hive_common::crd::{
    CertificateBundleSpec, ClusterDeployment, ClusterDeploymentSpec, ClusterImageSet,
    ClusterImageSetSpec, ClusterIngress, ClusterMetadata, ControlPlaneConfigSpec,
    ControlPlaneServingCertificateSpec, LocalObjectReference, MachinePool, MachinePoolSpec,
    Provisioning,
};
use hive_common::{
    Result, DELETE_AFTER_ANNOTATION, KUBECONFIG_SECRET_KEY, RAW_KUBECONFIG_SECRET_KEY,
    TRY_INSTALL_ONCE_ANNOTATION, TRY_UNINSTALL_ONCE_ANNOTATION,
};

use crate::install_config::{InstallConfig, INSTALL_CONFIG_SECRET_KEY};
use crate::objects::{
    binary_data_secret, namespaced_meta, string_data_secret, GeneratedObject,
    SECRET_TYPE_DOCKER_CONFIG_JSON, SECRET_TYPE_OPAQUE, SECRET_TYPE_TLS,
};
use crate::provider::CloudProvider;
use crate::sample::{sample_selector_sync_sets, sample_sync_sets};

/// Default base domain for new clusters
pub const DEFAULT_BASE_DOMAIN: &str = "new-installer.openshift.com";
/// Default worker replica count
pub const DEFAULT_WORKERS: i64 = 3;
/// Name of the generated worker pool
pub const WORKER_POOL_NAME: &str = "worker";
/// Certificate bundle name used for the serving certificate
pub const SERVING_CERT_BUNDLE: &str = "serving-cert";

/// Data needed to adopt an already-installed cluster
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdoptionSpec {
    /// Cluster UUID
    pub cluster_id: String,
    /// Infrastructure name
    pub infra_id: String,
    /// Admin kubeconfig of the running cluster
    pub admin_kubeconfig: Vec<u8>,
    /// Admin username; paired with `admin_password`
    pub admin_username: Option<String>,
    /// Admin password; paired with `admin_username`
    pub admin_password: Option<String>,
}

/// Resolved input for one cluster request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Generator {
    /// Cluster name; prefix of every generated name
    pub name: String,
    /// Namespace of every namespaced object
    pub namespace: String,
    /// Labels copied onto the ClusterDeployment
    pub labels: BTreeMap<String, String>,
    /// Cloud the cluster runs on
    pub cloud: CloudProvider,
    /// Base DNS domain
    pub base_domain: String,
    /// Image pull secret
    pub pull_secret: Option<String>,
    /// Public SSH key for nodes
    pub ssh_public_key: Option<String>,
    /// Private SSH key for nodes
    pub ssh_private_key: Option<String>,
    /// PEM serving certificate for API and ingress
    pub serving_cert: Option<String>,
    /// PEM key for `serving_cert`
    pub serving_cert_key: Option<String>,
    /// Attempt install only once
    pub install_once: bool,
    /// Attempt uninstall only once
    pub uninstall_once: bool,
    /// Delete the cluster after this duration (e.g. "8h")
    pub delete_after: Option<String>,
    /// Manage DNS for the base domain
    pub manage_dns: bool,
    /// Worker replica count
    pub workers: i64,
    /// Existing credentials secret to reuse instead of generating one
    pub credentials_secret: Option<String>,
    /// Existing ClusterImageSet to install from
    pub image_set: Option<String>,
    /// Release image for a generated ClusterImageSet
    pub release_image: Option<String>,
    /// Extra installer manifests, file name to contents
    pub manifests: BTreeMap<String, String>,
    /// Emit sample SyncSets and SelectorSyncSets
    pub sample_sync_sets: bool,
    /// Adopt an installed cluster instead of provisioning
    pub adoption: Option<AdoptionSpec>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl Generator {
    /// Generator with default base domain and worker count
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, cloud: CloudProvider) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            labels: BTreeMap::new(),
            cloud,
            base_domain: DEFAULT_BASE_DOMAIN.to_string(),
            pull_secret: None,
            ssh_public_key: None,
            ssh_private_key: None,
            serving_cert: None,
            serving_cert_key: None,
            install_once: false,
            uninstall_once: false,
            delete_after: None,
            manage_dns: false,
            workers: DEFAULT_WORKERS,
            credentials_secret: None,
            image_set: None,
            release_image: None,
            manifests: BTreeMap::new(),
            sample_sync_sets: false,
            adoption: None,
        }
    }

    fn object_name(&self, purpose: &str) -> String {
        format!("{}-{}", self.name, purpose)
    }

    /// Name of the pull secret
    pub fn pull_secret_name(&self) -> String {
        self.object_name("pull-secret")
    }

    /// Name of the SSH private key secret
    pub fn ssh_private_key_secret_name(&self) -> String {
        self.object_name("ssh-private-key")
    }

    /// Name of the serving certificate secret
    pub fn serving_cert_secret_name(&self) -> String {
        self.object_name("serving-cert")
    }

    /// Name of the install-config secret
    pub fn install_config_secret_name(&self) -> String {
        self.object_name("install-config")
    }

    /// Name of the adopted admin kubeconfig secret
    pub fn admin_kubeconfig_secret_name(&self) -> String {
        self.object_name("adopted-admin-kubeconfig")
    }

    /// Name of the adopted admin password secret
    pub fn admin_password_secret_name(&self) -> String {
        self.object_name("adopted-admin-password")
    }

    /// Name of the credentials secret the cluster references
    pub fn credentials_secret_name(&self) -> String {
        self.cloud
            .credentials_secret_name(&self.name, present(&self.credentials_secret))
    }

    fn image_set_name(&self) -> Option<String> {
        match (present(&self.image_set), present(&self.release_image)) {
            (Some(existing), _) => Some(existing.to_string()),
            (None, Some(_)) => Some(self.object_name("imageset")),
            (None, None) => None,
        }
    }

    fn has_serving_cert(&self) -> bool {
        present(&self.serving_cert).is_some()
    }

    fn has_admin_password(&self) -> bool {
        self.adoption.as_ref().is_some_and(|a| {
            present(&a.admin_username).is_some() && present(&a.admin_password).is_some()
        })
    }

    /// Every object for this request, in apply order
    ///
    /// Fails without returning anything if the install config cannot be
    /// serialized.
    pub fn generate_all(&self) -> Result<Vec<GeneratedObject>> {
        let mut objects = vec![
            GeneratedObject::ClusterDeployment(Box::new(self.generate_cluster_deployment())),
            GeneratedObject::MachinePool(self.generate_machine_pool()),
            GeneratedObject::Secret(self.generate_install_config_secret()?),
        ];

        let secrets = [
            self.generate_pull_secret_secret(),
            self.generate_ssh_private_key_secret(),
            self.generate_serving_cert_secret(),
            self.cloud.generate_credentials_secret(
                &self.name,
                &self.namespace,
                present(&self.credentials_secret),
            ),
            self.generate_admin_kubeconfig_secret(),
            self.generate_adopted_admin_password_secret(),
        ];
        objects.extend(secrets.into_iter().flatten().map(GeneratedObject::Secret));

        if let Some(image_set) = self.generate_image_set() {
            objects.push(GeneratedObject::ClusterImageSet(image_set));
        }
        if let Some(config_map) = self.generate_manifests_config_map() {
            objects.push(GeneratedObject::ConfigMap(config_map));
        }
        if self.sample_sync_sets {
            objects.extend(self.generate_sample_sync_sets());
        }

        debug!(cluster = %self.name, count = objects.len(), "generated cluster objects");
        Ok(objects)
    }

    /// The root ClusterDeployment
    pub fn generate_cluster_deployment(&self) -> ClusterDeployment {
        let mut annotations = BTreeMap::new();
        if let Some(delete_after) = present(&self.delete_after) {
            annotations.insert(DELETE_AFTER_ANNOTATION.to_string(), delete_after.to_string());
        }
        if self.install_once {
            annotations.insert(TRY_INSTALL_ONCE_ANNOTATION.to_string(), "true".to_string());
        }
        if self.uninstall_once {
            annotations.insert(TRY_UNINSTALL_ONCE_ANNOTATION.to_string(), "true".to_string());
        }

        let mut spec = ClusterDeploymentSpec {
            cluster_name: self.name.clone(),
            base_domain: self.base_domain.clone(),
            manage_dns: self.manage_dns,
            pull_secret_ref: present(&self.pull_secret)
                .map(|_| LocalObjectReference::new(self.pull_secret_name())),
            provisioning: Some(Provisioning {
                install_config_secret_ref: LocalObjectReference::new(
                    self.install_config_secret_name(),
                ),
                ssh_private_key_secret_ref: present(&self.ssh_private_key)
                    .map(|_| LocalObjectReference::new(self.ssh_private_key_secret_name())),
                image_set_ref: self.image_set_name().map(LocalObjectReference::new),
                manifests_config_map_ref: (!self.manifests.is_empty())
                    .then(|| LocalObjectReference::new(self.object_name("manifests"))),
            }),
            ..Default::default()
        };
        self.cloud
            .add_cluster_deployment_platform(&mut spec, &self.credentials_secret_name());

        if self.has_serving_cert() {
            spec.certificate_bundles = vec![CertificateBundleSpec {
                name: SERVING_CERT_BUNDLE.to_string(),
                certificate_secret_ref: LocalObjectReference::new(self.serving_cert_secret_name()),
            }];
            spec.control_plane_config = Some(ControlPlaneConfigSpec {
                serving_certificates: ControlPlaneServingCertificateSpec {
                    default: Some(SERVING_CERT_BUNDLE.to_string()),
                },
            });
            spec.ingress = vec![ClusterIngress {
                name: "default".to_string(),
                domain: format!("apps.{}.{}", self.name, self.base_domain),
                serving_certificate: Some(SERVING_CERT_BUNDLE.to_string()),
            }];
        }

        if let Some(adoption) = &self.adoption {
            spec.cluster_metadata = Some(ClusterMetadata {
                cluster_id: adoption.cluster_id.clone(),
                infra_id: adoption.infra_id.clone(),
                admin_kubeconfig_secret_ref: LocalObjectReference::new(
                    self.admin_kubeconfig_secret_name(),
                ),
                admin_password_secret_ref: self
                    .has_admin_password()
                    .then(|| LocalObjectReference::new(self.admin_password_secret_name())),
            });
            spec.installed = true;
        }

        let mut cd = ClusterDeployment::new(&self.name, spec);
        cd.metadata.namespace = Some(self.namespace.clone());
        if !self.labels.is_empty() {
            cd.metadata.labels = Some(self.labels.clone());
        }
        if !annotations.is_empty() {
            cd.metadata.annotations = Some(annotations);
        }
        cd
    }

    /// The worker MachinePool
    pub fn generate_machine_pool(&self) -> MachinePool {
        let mut spec = MachinePoolSpec {
            cluster_deployment_ref: LocalObjectReference::new(&self.name),
            name: WORKER_POOL_NAME.to_string(),
            replicas: Some(self.workers),
            platform: None,
        };
        self.cloud.add_machine_pool_platform(&mut spec);

        let mut pool = MachinePool::new(&self.object_name(WORKER_POOL_NAME), spec);
        pool.metadata.namespace = Some(self.namespace.clone());
        pool
    }

    /// The install config for this cluster
    pub fn install_config(&self) -> InstallConfig {
        let mut install_config = InstallConfig::new(
            &self.name,
            &self.base_domain,
            present(&self.ssh_public_key),
            self.workers,
        );
        self.cloud.add_install_config_platform(&mut install_config);
        install_config
    }

    /// Secret carrying the serialized install config
    pub fn generate_install_config_secret(&self) -> Result<Secret> {
        let yaml = self.install_config().to_yaml()?;
        Ok(string_data_secret(
            self.install_config_secret_name(),
            &self.namespace,
            SECRET_TYPE_OPAQUE,
            [(INSTALL_CONFIG_SECRET_KEY, yaml)],
        ))
    }

    /// Pull secret, or nothing when none was supplied
    pub fn generate_pull_secret_secret(&self) -> Option<Secret> {
        let pull_secret = present(&self.pull_secret)?;
        Some(string_data_secret(
            self.pull_secret_name(),
            &self.namespace,
            SECRET_TYPE_DOCKER_CONFIG_JSON,
            [(".dockerconfigjson", pull_secret.to_string())],
        ))
    }

    /// SSH private key secret, or nothing when no key was supplied
    pub fn generate_ssh_private_key_secret(&self) -> Option<Secret> {
        let key = present(&self.ssh_private_key)?;
        Some(string_data_secret(
            self.ssh_private_key_secret_name(),
            &self.namespace,
            SECRET_TYPE_OPAQUE,
            [("ssh-privatekey", key.to_string())],
        ))
    }

    /// TLS serving certificate secret, or nothing when no cert was supplied
    pub fn generate_serving_cert_secret(&self) -> Option<Secret> {
        let cert = present(&self.serving_cert)?;
        Some(string_data_secret(
            self.serving_cert_secret_name(),
            &self.namespace,
            SECRET_TYPE_TLS,
            [
                ("tls.crt", cert.to_string()),
                (
                    "tls.key",
                    present(&self.serving_cert_key).unwrap_or_default().to_string(),
                ),
            ],
        ))
    }

    /// Admin kubeconfig secret; always present in adoption mode
    pub fn generate_admin_kubeconfig_secret(&self) -> Option<Secret> {
        let adoption = self.adoption.as_ref()?;
        Some(binary_data_secret(
            self.admin_kubeconfig_secret_name(),
            &self.namespace,
            SECRET_TYPE_OPAQUE,
            [
                (KUBECONFIG_SECRET_KEY, adoption.admin_kubeconfig.clone()),
                (RAW_KUBECONFIG_SECRET_KEY, adoption.admin_kubeconfig.clone()),
            ],
        ))
    }

    /// Admin username/password secret; only when adopting with both supplied
    pub fn generate_adopted_admin_password_secret(&self) -> Option<Secret> {
        if !self.has_admin_password() {
            return None;
        }
        let adoption = self.adoption.as_ref()?;
        Some(string_data_secret(
            self.admin_password_secret_name(),
            &self.namespace,
            SECRET_TYPE_OPAQUE,
            [
                ("username", adoption.admin_username.clone().unwrap_or_default()),
                ("password", adoption.admin_password.clone().unwrap_or_default()),
            ],
        ))
    }

    /// ClusterImageSet for the release image, unless an existing one is named
    pub fn generate_image_set(&self) -> Option<ClusterImageSet> {
        if present(&self.image_set).is_some() {
            return None;
        }
        let release_image = present(&self.release_image)?;
        Some(ClusterImageSet::new(
            &self.object_name("imageset"),
            ClusterImageSetSpec {
                release_image: release_image.to_string(),
            },
        ))
    }

    /// Sample SyncSets for the cluster followed by the shared sample
    /// SelectorSyncSets
    pub fn generate_sample_sync_sets(&self) -> Vec<GeneratedObject> {
        sample_sync_sets(&self.name, &self.namespace)
            .into_iter()
            .map(GeneratedObject::SyncSet)
            .chain(
                sample_selector_sync_sets()
                    .into_iter()
                    .map(GeneratedObject::SelectorSyncSet),
            )
            .collect()
    }

    /// ConfigMap of extra installer manifests, when any were supplied
    pub fn generate_manifests_config_map(&self) -> Option<ConfigMap> {
        if self.manifests.is_empty() {
            return None;
        }
        Some(ConfigMap {
            metadata: namespaced_meta(self.object_name("manifests"), &self.namespace),
            data: Some(self.manifests.clone()),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{AwsProvider, GcpProvider};
    use hive_common::HIVEUTIL_CREATED_LABEL;

    fn aws_generator() -> Generator {
        Generator::new("bar", "hive", CloudProvider::Aws(AwsProvider::new("AKIA", "s3cr3t")))
    }

    fn adopting(username: Option<&str>, password: Option<&str>) -> Generator {
        Generator {
            adoption: Some(AdoptionSpec {
                cluster_id: "5f1d-uuid".to_string(),
                infra_id: "bar-x7f2k".to_string(),
                admin_kubeconfig: b"apiVersion: v1\nkind: Config\n".to_vec(),
                admin_username: username.map(str::to_string),
                admin_password: password.map(str::to_string),
            }),
            ..aws_generator()
        }
    }

    fn names(objects: &[GeneratedObject]) -> Vec<String> {
        objects.iter().map(|o| o.name().to_string()).collect()
    }

    /// Story: requesting an AWS cluster with only a pull secret and public
    /// key produces exactly the objects needed to provision it.
    #[test]
    fn story_minimal_aws_request_produces_five_objects() {
        let generator = Generator {
            workers: 3,
            pull_secret: Some("abc".to_string()),
            ssh_public_key: Some("ssh-rsa AAA".to_string()),
            ..aws_generator()
        };

        let objects = generator.generate_all().expect("generation succeeds");

        assert_eq!(
            names(&objects),
            vec![
                "bar",
                "bar-worker",
                "bar-install-config",
                "bar-pull-secret",
                "bar-aws-creds"
            ]
        );
        match &objects[1] {
            GeneratedObject::MachinePool(pool) => assert_eq!(pool.spec.replicas, Some(3)),
            other => panic!("expected MachinePool, got {:?}", other.kind()),
        }
        let pull = objects[3].as_secret().expect("pull secret");
        assert_eq!(pull.type_.as_deref(), Some("kubernetes.io/dockerconfigjson"));
        assert!(objects.iter().all(|o| o.namespace() == Some("hive")));
    }

    /// Story: re-running the same request is idempotent because every name
    /// is derived from the cluster name.
    #[test]
    fn story_identical_input_yields_identical_objects() {
        let generator = Generator {
            pull_secret: Some("abc".to_string()),
            ssh_private_key: Some("-----BEGIN KEY-----".to_string()),
            serving_cert: Some("CERT".to_string()),
            serving_cert_key: Some("KEY".to_string()),
            release_image: Some("quay.io/openshift-release-dev/ocp-release:4.3.0".to_string()),
            sample_sync_sets: true,
            ..adopting(Some("admin"), Some("hunter2"))
        };

        let first = generator.generate_all().expect("first");
        let second = generator.generate_all().expect("second");

        let first: Vec<_> = first.iter().map(|o| o.to_value().expect("json")).collect();
        let second: Vec<_> = second.iter().map(|o| o.to_value().expect("json")).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn secret_names_derive_from_cluster_name() {
        let generator = aws_generator();
        assert_eq!(generator.pull_secret_name(), "bar-pull-secret");
        assert_eq!(generator.ssh_private_key_secret_name(), "bar-ssh-private-key");
        assert_eq!(generator.serving_cert_secret_name(), "bar-serving-cert");
        assert_eq!(generator.install_config_secret_name(), "bar-install-config");
        assert_eq!(generator.credentials_secret_name(), "bar-aws-creds");
        assert_eq!(
            generator.admin_kubeconfig_secret_name(),
            "bar-adopted-admin-kubeconfig"
        );
        assert_eq!(
            generator.admin_password_secret_name(),
            "bar-adopted-admin-password"
        );
    }

    #[test]
    fn absent_source_material_emits_no_secret() {
        let generator = Generator {
            pull_secret: Some(String::new()),
            ..aws_generator()
        };
        assert!(generator.generate_pull_secret_secret().is_none());
        assert!(generator.generate_ssh_private_key_secret().is_none());
        assert!(generator.generate_serving_cert_secret().is_none());

        let cd = generator.generate_cluster_deployment();
        assert!(cd.spec.pull_secret_ref.is_none());
        assert!(cd
            .spec
            .provisioning
            .as_ref()
            .and_then(|p| p.ssh_private_key_secret_ref.as_ref())
            .is_none());
    }

    #[test]
    fn supplied_keys_emit_typed_secrets() {
        let generator = Generator {
            ssh_private_key: Some("PRIVATE".to_string()),
            serving_cert: Some("CERT".to_string()),
            serving_cert_key: Some("KEY".to_string()),
            ..aws_generator()
        };

        let ssh = generator.generate_ssh_private_key_secret().expect("ssh secret");
        assert_eq!(
            ssh.string_data.expect("data")["ssh-privatekey"],
            "PRIVATE"
        );

        let tls = generator.generate_serving_cert_secret().expect("tls secret");
        assert_eq!(tls.type_.as_deref(), Some("kubernetes.io/tls"));
        let data = tls.string_data.expect("data");
        assert_eq!(data["tls.crt"], "CERT");
        assert_eq!(data["tls.key"], "KEY");
    }

    #[test]
    fn serving_cert_adds_bundle_and_ingress() {
        let without = aws_generator().generate_cluster_deployment();
        assert!(without.spec.certificate_bundles.is_empty());
        assert!(without.spec.ingress.is_empty());
        assert!(without.spec.control_plane_config.is_none());

        let generator = Generator {
            serving_cert: Some("CERT".to_string()),
            serving_cert_key: Some("KEY".to_string()),
            base_domain: "example.com".to_string(),
            ..aws_generator()
        };
        let cd = generator.generate_cluster_deployment();
        assert_eq!(cd.spec.certificate_bundles[0].name, "serving-cert");
        assert_eq!(
            cd.spec.certificate_bundles[0].certificate_secret_ref.name,
            "bar-serving-cert"
        );
        assert_eq!(cd.spec.ingress[0].domain, "apps.bar.example.com");
        assert_eq!(
            cd.spec
                .control_plane_config
                .and_then(|c| c.serving_certificates.default),
            Some("serving-cert".to_string())
        );
    }

    #[test]
    fn adoption_marks_cluster_installed_with_metadata() {
        let cd = adopting(None, None).generate_cluster_deployment();
        assert!(cd.spec.installed);
        let metadata = cd.spec.cluster_metadata.expect("metadata");
        assert_eq!(metadata.cluster_id, "5f1d-uuid");
        assert_eq!(metadata.infra_id, "bar-x7f2k");
        assert_eq!(
            metadata.admin_kubeconfig_secret_ref.name,
            "bar-adopted-admin-kubeconfig"
        );
        assert!(metadata.admin_password_secret_ref.is_none());

        let plain = aws_generator().generate_cluster_deployment();
        assert!(!plain.spec.installed);
        assert!(plain.spec.cluster_metadata.is_none());
    }

    #[test]
    fn adoption_always_emits_kubeconfig_secret() {
        let generator = adopting(None, None);
        let secret = generator
            .generate_admin_kubeconfig_secret()
            .expect("kubeconfig secret");
        let data = secret.data.expect("data");
        assert_eq!(data["kubeconfig"].0, b"apiVersion: v1\nkind: Config\n".to_vec());
        assert_eq!(data["raw-kubeconfig"], data["kubeconfig"]);

        assert!(aws_generator().generate_admin_kubeconfig_secret().is_none());
    }

    #[test]
    fn admin_password_requires_username_and_password() {
        assert!(adopting(Some("admin"), None)
            .generate_adopted_admin_password_secret()
            .is_none());
        assert!(adopting(None, Some("pw"))
            .generate_adopted_admin_password_secret()
            .is_none());

        let generator = adopting(Some("admin"), Some("hunter2"));
        let secret = generator
            .generate_adopted_admin_password_secret()
            .expect("password secret");
        let data = secret.string_data.expect("data");
        assert_eq!(data.len(), 2);
        assert_eq!(data["username"], "admin");
        assert_eq!(data["password"], "hunter2");

        let cd = generator.generate_cluster_deployment();
        assert_eq!(
            cd.spec
                .cluster_metadata
                .and_then(|m| m.admin_password_secret_ref)
                .map(|r| r.name),
            Some("bar-adopted-admin-password".to_string())
        );
    }

    #[test]
    fn annotations_reflect_lifecycle_policies() {
        let generator = Generator {
            delete_after: Some("8h".to_string()),
            install_once: true,
            uninstall_once: true,
            ..aws_generator()
        };
        let cd = generator.generate_cluster_deployment();
        let annotations = cd.metadata.annotations.expect("annotations");
        assert_eq!(annotations[DELETE_AFTER_ANNOTATION], "8h");
        assert_eq!(annotations[TRY_INSTALL_ONCE_ANNOTATION], "true");
        assert_eq!(annotations[TRY_UNINSTALL_ONCE_ANNOTATION], "true");

        assert!(aws_generator()
            .generate_cluster_deployment()
            .metadata
            .annotations
            .is_none());
    }

    #[test]
    fn labels_are_copied_to_cluster_deployment() {
        let generator = Generator {
            labels: BTreeMap::from([(HIVEUTIL_CREATED_LABEL.to_string(), "true".to_string())]),
            ..aws_generator()
        };
        let cd = generator.generate_cluster_deployment();
        assert_eq!(
            cd.metadata.labels.expect("labels")[HIVEUTIL_CREATED_LABEL],
            "true"
        );
    }

    #[test]
    fn release_image_generates_image_set() {
        let generator = Generator {
            release_image: Some("quay.io/ocp-release:4.3.0".to_string()),
            ..aws_generator()
        };
        let image_set = generator.generate_image_set().expect("image set");
        assert_eq!(image_set.metadata.name.as_deref(), Some("bar-imageset"));
        assert_eq!(image_set.spec.release_image, "quay.io/ocp-release:4.3.0");
        assert_eq!(
            generator
                .generate_cluster_deployment()
                .spec
                .provisioning
                .and_then(|p| p.image_set_ref)
                .map(|r| r.name),
            Some("bar-imageset".to_string())
        );
    }

    #[test]
    fn existing_image_set_is_referenced_not_generated() {
        let generator = Generator {
            image_set: Some("openshift-v4.3.0".to_string()),
            release_image: Some("ignored".to_string()),
            ..aws_generator()
        };
        assert!(generator.generate_image_set().is_none());
        assert_eq!(
            generator
                .generate_cluster_deployment()
                .spec
                .provisioning
                .and_then(|p| p.image_set_ref)
                .map(|r| r.name),
            Some("openshift-v4.3.0".to_string())
        );
    }

    #[test]
    fn reused_credentials_skip_secret_and_keep_reference() {
        let generator = Generator {
            credentials_secret: Some("shared-aws".to_string()),
            ..aws_generator()
        };
        let objects = generator.generate_all().expect("generate");
        assert!(!names(&objects).contains(&"bar-aws-creds".to_string()));
        let cd = generator.generate_cluster_deployment();
        assert_eq!(cd.spec.platform.credentials_secret_ref().name, "shared-aws");
    }

    #[test]
    fn install_config_secret_embeds_yaml() {
        let generator = Generator {
            ssh_public_key: Some("ssh-rsa AAA".to_string()),
            workers: 5,
            ..Generator::new(
                "bar",
                "hive",
                CloudProvider::Gcp(GcpProvider::new("proj", b"{}".to_vec())),
            )
        };
        let secret = generator.generate_install_config_secret().expect("secret");
        let yaml = &secret.string_data.expect("data")["install-config.yaml"];
        let value: serde_yaml::Value = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(value["compute"][0]["replicas"].as_i64(), Some(5));
        assert_eq!(value["platform"]["gcp"]["projectID"].as_str(), Some("proj"));
        assert_eq!(value["sshKey"].as_str(), Some("ssh-rsa AAA"));
    }

    #[test]
    fn manifests_and_sample_sync_sets_are_appended() {
        let generator = Generator {
            manifests: BTreeMap::from([("99-extra.yaml".to_string(), "kind: X".to_string())]),
            sample_sync_sets: true,
            ..aws_generator()
        };
        let objects = generator.generate_all().expect("generate");
        let config_map = objects
            .iter()
            .find(|o| o.name() == "bar-manifests")
            .expect("manifests config map");
        assert!(!config_map.is_secret());
        assert_eq!(
            objects
                .iter()
                .filter(|o| matches!(o, GeneratedObject::SyncSet(_)))
                .count(),
            10
        );
        assert_eq!(
            objects
                .iter()
                .filter(|o| matches!(o, GeneratedObject::SelectorSyncSet(_)))
                .count(),
            10
        );
        assert_eq!(
            generator
                .generate_cluster_deployment()
                .spec
                .provisioning
                .and_then(|p| p.manifests_config_map_ref)
                .map(|r| r.name),
            Some("bar-manifests".to_string())
        );
    }
}
