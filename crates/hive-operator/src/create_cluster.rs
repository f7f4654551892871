//! `create-cluster` command
//!
//! Resolves key material from flags, environment and files, builds a
//! [`Generator`], then either prints the generated objects or applies them
//! to the management cluster with server-side apply.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Args, ValueEnum};
use ini::Ini;
use kube::api::{Api, DynamicObject, Patch, PatchParams};
use kube::discovery::Scope;
use kube::Client;

use hive_cluster::generator::{DEFAULT_BASE_DOMAIN, DEFAULT_WORKERS};
use hive_cluster::provider::AZURE_BASE_DOMAIN_RESOURCE_GROUP;
use hive_cluster::{
    AdoptionSpec, AwsProvider, AzureProvider, CloudProvider, GcpProvider, GeneratedObject,
    Generator,
};
use hive_common::kube_utils::create_client;
use hive_common::registry::ResourceRegistry;
use hive_common::{Error, FIELD_MANAGER, HIVEUTIL_CREATED_LABEL};

/// Manifest injected by `--simulate-bootstrap-failure`
const BOOTSTRAP_FAILURE_MANIFEST: &str = "apiVersion: v1
kind: NotARealSecret
metadata:
  name: foo
  namespace: bar
type: TestFailResource
";

/// File name of the injected failure manifest
const BOOTSTRAP_FAILURE_MANIFEST_NAME: &str = "failure-test.yaml";

/// Namespace used when printing without an explicit `--namespace`
const PRINT_NAMESPACE: &str = "default";

/// AWS profile used unless `--aws-profile` or `AWS_PROFILE` names another
const DEFAULT_AWS_PROFILE: &str = "default";

/// Supported clouds
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Cloud {
    /// Amazon Web Services
    Aws,
    /// Microsoft Azure
    Azure,
    /// Google Cloud Platform
    Gcp,
}

/// Output formats for printing instead of applying
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// YAML document
    Yaml,
    /// Pretty-printed JSON
    Json,
}

/// Generate and apply the objects for a new (or adopted) cluster
#[derive(Args, Debug, Clone)]
pub struct CreateClusterArgs {
    /// Name of the ClusterDeployment
    pub name: String,

    /// Cloud provider
    #[arg(long, value_enum, default_value_t = Cloud::Aws)]
    pub cloud: Cloud,

    /// Namespace to create the ClusterDeployment in (defaults to the kubeconfig namespace)
    #[arg(short = 'n', long)]
    pub namespace: Option<String>,

    /// File containing the SSH private key
    #[arg(long)]
    pub ssh_private_key_file: Option<PathBuf>,

    /// File containing the SSH public key (default ~/.ssh/id_rsa.pub)
    #[arg(long)]
    pub ssh_public_key_file: Option<PathBuf>,

    /// SSH public key for the cluster
    #[arg(long, env = "PUBLIC_SSH_KEY", hide_env_values = true)]
    pub ssh_public_key: Option<String>,

    /// Base domain for the cluster
    #[arg(long, default_value = DEFAULT_BASE_DOMAIN)]
    pub base_domain: String,

    /// Pull secret for the cluster; takes precedence over --pull-secret-file
    #[arg(long, env = "PULL_SECRET", hide_env_values = true)]
    pub pull_secret: Option<String>,

    /// Pull secret file (default ~/.pull-secret)
    #[arg(long)]
    pub pull_secret_file: Option<PathBuf>,

    /// Delete the cluster after this duration (e.g. 8h)
    #[arg(long)]
    pub delete_after: Option<String>,

    /// Existing cloud credentials secret in the target namespace to reuse
    #[arg(long)]
    pub creds_secret: Option<String>,

    /// Cloud credentials file (default depends on the cloud)
    #[arg(long)]
    pub creds_file: Option<PathBuf>,

    /// Existing ClusterImageSet to use
    #[arg(long)]
    pub image_set: Option<String>,

    /// Release image to install
    #[arg(long, env = "RELEASE_IMAGE")]
    pub release_image: Option<String>,

    /// Serving certificate file for the control plane and routes
    #[arg(long)]
    pub serving_cert: Option<PathBuf>,

    /// Serving certificate key file
    #[arg(long)]
    pub serving_cert_key: Option<PathBuf>,

    /// Manage the cluster's DNS
    #[arg(long)]
    pub manage_dns: bool,

    /// Print objects instead of applying them
    #[arg(short = 'o', long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Include secrets along with the ClusterDeployment
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub include_secrets: bool,

    /// Attempt the install only once
    #[arg(long)]
    pub install_once: bool,

    /// Attempt the uninstall only once
    #[arg(long)]
    pub uninstall_once: bool,

    /// Inject an invalid installer manifest so bootstrap fails
    #[arg(long)]
    pub simulate_bootstrap_failure: bool,

    /// Number of worker nodes
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    pub workers: i64,

    /// Also create sample SyncSets and SelectorSyncSets
    #[arg(long = "create-sample-syncsets")]
    pub create_sample_sync_sets: bool,

    /// Directory of extra installer manifests
    #[arg(long)]
    pub manifests: Option<PathBuf>,

    /// Adopt a pre-existing cluster
    #[arg(long)]
    pub adopt: bool,

    /// Admin kubeconfig of the adopted cluster
    #[arg(long)]
    pub adopt_admin_kubeconfig: Option<PathBuf>,

    /// Infrastructure ID of the adopted cluster
    #[arg(long)]
    pub adopt_infra_id: Option<String>,

    /// Cluster UUID of the adopted cluster
    #[arg(long)]
    pub adopt_cluster_id: Option<String>,

    /// Web console admin username of the adopted cluster
    #[arg(long)]
    pub adopt_admin_username: Option<String>,

    /// Web console admin password of the adopted cluster
    #[arg(long)]
    pub adopt_admin_password: Option<String>,

    /// Resource group holding the Azure DNS zone for the base domain
    #[arg(long, default_value = AZURE_BASE_DOMAIN_RESOURCE_GROUP)]
    pub azure_base_domain_resource_group_name: String,

    /// Profile read from the AWS credentials file
    #[arg(long, env = "AWS_PROFILE", default_value = DEFAULT_AWS_PROFILE)]
    pub aws_profile: String,

    /// AWS access key ID, used when no credentials file is given
    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    pub aws_access_key_id: Option<String>,

    /// AWS secret access key, used when no credentials file is given
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub aws_secret_access_key: Option<String>,

    /// Azure service principal file
    #[arg(long, env = "AZURE_AUTH_LOCATION")]
    pub azure_auth_location: Option<PathBuf>,

    /// GCP service account file
    #[arg(long, env = "GOOGLE_CREDENTIALS")]
    pub gcp_credentials: Option<PathBuf>,
}

fn is_set<T: AsRef<str>>(value: &Option<T>) -> bool {
    value.as_ref().is_some_and(|v| !v.as_ref().is_empty())
}

impl CreateClusterArgs {
    /// Check flag combinations before touching any file
    pub fn validate(&self) -> hive_common::Result<()> {
        if self.serving_cert.is_some() && self.serving_cert_key.is_none() {
            return Err(Error::validation_for_field(
                &self.name,
                "--serving-cert-key",
                "a serving certificate requires a serving certificate key",
            ));
        }

        let username = is_set(&self.adopt_admin_username);
        let password = is_set(&self.adopt_admin_password);
        if self.adopt {
            if self.adopt_admin_kubeconfig.is_none()
                || !is_set(&self.adopt_infra_id)
                || !is_set(&self.adopt_cluster_id)
            {
                return Err(Error::validation_for(
                    &self.name,
                    "--adopt requires --adopt-admin-kubeconfig, --adopt-infra-id and --adopt-cluster-id",
                ));
            }
            if username != password {
                return Err(Error::validation_for(
                    &self.name,
                    "--adopt-admin-username and --adopt-admin-password must be used together",
                ));
            }
        } else if self.adopt_admin_kubeconfig.is_some()
            || is_set(&self.adopt_infra_id)
            || is_set(&self.adopt_cluster_id)
            || username
            || password
        {
            return Err(Error::validation_for(
                &self.name,
                "adoption options require --adopt",
            ));
        }
        Ok(())
    }

    /// Build the generator, reading every referenced file
    pub fn generator(&self, namespace: &str) -> anyhow::Result<Generator> {
        let home = home_dir();
        let mut generator = Generator::new(&self.name, namespace, self.cloud_provider(&home)?);

        generator.labels =
            BTreeMap::from([(HIVEUTIL_CREATED_LABEL.to_string(), "true".to_string())]);
        generator.base_domain = self.base_domain.clone();
        generator.pull_secret = self.resolve_pull_secret(&home)?;
        generator.ssh_public_key = self.resolve_ssh_public_key(&home)?;
        generator.ssh_private_key = self
            .ssh_private_key_file
            .as_deref()
            .map(read_trimmed)
            .transpose()?;
        if let (Some(cert), Some(key)) = (&self.serving_cert, &self.serving_cert_key) {
            generator.serving_cert = Some(read_file(cert)?);
            generator.serving_cert_key = Some(read_file(key)?);
        }
        generator.install_once = self.install_once;
        generator.uninstall_once = self.uninstall_once;
        generator.delete_after = self.delete_after.clone();
        generator.manage_dns = self.manage_dns;
        generator.workers = self.workers;
        generator.credentials_secret = self.creds_secret.clone();
        generator.image_set = self.image_set.clone();
        generator.release_image = self.release_image.clone();
        generator.manifests = self.installer_manifests()?;
        generator.sample_sync_sets = self.create_sample_sync_sets;

        if self.adopt {
            let kubeconfig = self
                .adopt_admin_kubeconfig
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("--adopt requires --adopt-admin-kubeconfig"))?;
            generator.adoption = Some(AdoptionSpec {
                cluster_id: self.adopt_cluster_id.clone().unwrap_or_default(),
                infra_id: self.adopt_infra_id.clone().unwrap_or_default(),
                admin_kubeconfig: std::fs::read(kubeconfig).map_err(|e| {
                    anyhow::anyhow!("Failed to read {}: {}", kubeconfig.display(), e)
                })?,
                admin_username: self.adopt_admin_username.clone(),
                admin_password: self.adopt_admin_password.clone(),
            });
        }

        if self.release_image.is_none() && self.image_set.is_none() {
            tracing::warn!("no --image-set or --release-image given, cluster references no image set");
        }

        Ok(generator)
    }

    fn cloud_provider(&self, home: &Path) -> anyhow::Result<CloudProvider> {
        let reuse = is_set(&self.creds_secret);
        let provider = match self.cloud {
            Cloud::Aws if reuse => CloudProvider::Aws(AwsProvider::new("", "")),
            Cloud::Aws => {
                let (access_key_id, secret_access_key) = self.aws_credentials(home)?;
                CloudProvider::Aws(AwsProvider::new(access_key_id, secret_access_key))
            }
            Cloud::Azure => {
                let service_principal = if reuse {
                    Vec::new()
                } else {
                    let path = self
                        .creds_file
                        .clone()
                        .or_else(|| self.azure_auth_location.clone())
                        .unwrap_or_else(|| home.join(".azure").join("osServicePrincipal.json"));
                    tracing::info!(path = %path.display(), "loading Azure service principal");
                    read_bytes(&path)?
                };
                CloudProvider::Azure(AzureProvider::new(
                    service_principal,
                    &self.azure_base_domain_resource_group_name,
                ))
            }
            Cloud::Gcp => {
                let path = self
                    .creds_file
                    .clone()
                    .or_else(|| self.gcp_credentials.clone())
                    .unwrap_or_else(|| home.join(".gcp").join("osServiceAccount.json"));
                tracing::info!(path = %path.display(), "loading GCP service account");
                let service_account = read_bytes(&path)?;
                let project_id = gcp_project_id(&service_account)?;
                if reuse {
                    CloudProvider::Gcp(GcpProvider::new(project_id, Vec::new()))
                } else {
                    CloudProvider::Gcp(GcpProvider::new(project_id, service_account))
                }
            }
        };
        Ok(provider)
    }

    fn aws_credentials(&self, home: &Path) -> anyhow::Result<(String, String)> {
        if let Some(path) = &self.creds_file {
            return self.aws_credentials_file(path);
        }
        if let (Some(id), Some(secret)) = (&self.aws_access_key_id, &self.aws_secret_access_key) {
            return Ok((id.clone(), secret.clone()));
        }
        self.aws_credentials_file(&home.join(".aws").join("credentials"))
    }

    fn aws_credentials_file(&self, path: &Path) -> anyhow::Result<(String, String)> {
        parse_aws_credentials(&read_file(path)?, &self.aws_profile)
            .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))
    }

    fn resolve_pull_secret(&self, home: &Path) -> anyhow::Result<Option<String>> {
        if is_set(&self.pull_secret) {
            return Ok(self.pull_secret.clone());
        }
        resolve_from_file(self.pull_secret_file.as_deref(), &home.join(".pull-secret"))
    }

    fn resolve_ssh_public_key(&self, home: &Path) -> anyhow::Result<Option<String>> {
        if is_set(&self.ssh_public_key) {
            return Ok(self.ssh_public_key.clone());
        }
        resolve_from_file(
            self.ssh_public_key_file.as_deref(),
            &home.join(".ssh").join("id_rsa.pub"),
        )
    }

    fn installer_manifests(&self) -> anyhow::Result<BTreeMap<String, String>> {
        let mut manifests = match &self.manifests {
            Some(dir) => read_manifests_dir(dir)?,
            None => BTreeMap::new(),
        };
        if self.simulate_bootstrap_failure {
            manifests.insert(
                BOOTSTRAP_FAILURE_MANIFEST_NAME.to_string(),
                BOOTSTRAP_FAILURE_MANIFEST.to_string(),
            );
        }
        Ok(manifests)
    }
}

/// Run the command
pub async fn run(args: CreateClusterArgs, kubeconfig: Option<&Path>) -> anyhow::Result<()> {
    args.validate()?;

    if let Some(format) = args.output {
        let namespace = args.namespace.as_deref().unwrap_or(PRINT_NAMESPACE);
        let objects = args.generator(namespace)?.generate_all()?;
        let rendered = render(&select_objects(objects, args.include_secrets), format)?;
        if !rendered.is_empty() {
            println!("{}", rendered.trim_end());
        }
        return Ok(());
    }

    let client = create_client(kubeconfig).await?;
    let namespace = match &args.namespace {
        Some(ns) => ns.clone(),
        None => client.default_namespace().to_string(),
    };
    let objects = select_objects(
        args.generator(&namespace)?.generate_all()?,
        args.include_secrets,
    );
    let registry = ResourceRegistry::new();
    apply_objects(&client, &registry, &objects).await?;

    tracing::info!(
        cluster_deployment = %args.name,
        namespace = %namespace,
        count = objects.len(),
        "cluster objects applied"
    );
    Ok(())
}

/// Drop secrets unless they were asked for
pub fn select_objects(objects: Vec<GeneratedObject>, include_secrets: bool) -> Vec<GeneratedObject> {
    objects
        .into_iter()
        .filter(|o| include_secrets || !o.is_secret())
        .collect()
}

/// Render objects for printing
///
/// A single object is printed alone, several are wrapped in a `v1` List and
/// nothing renders as an empty string.
pub fn render(objects: &[GeneratedObject], format: OutputFormat) -> anyhow::Result<String> {
    let mut items = objects
        .iter()
        .map(GeneratedObject::to_value)
        .collect::<Result<Vec<_>, _>>()?;

    let document = match items.len() {
        0 => return Ok(String::new()),
        1 => items.remove(0),
        _ => serde_json::json!({
            "apiVersion": "v1",
            "kind": "List",
            "metadata": {},
            "items": items,
        }),
    };

    let rendered = match format {
        OutputFormat::Yaml => serde_yaml::to_string(&document)
            .map_err(|e| anyhow::anyhow!("Failed to render YAML: {}", e))?,
        OutputFormat::Json => serde_json::to_string_pretty(&document)
            .map_err(|e| anyhow::anyhow!("Failed to render JSON: {}", e))?,
    };
    Ok(rendered)
}

/// Server-side apply every object, in order
pub async fn apply_objects(
    client: &Client,
    registry: &ResourceRegistry,
    objects: &[GeneratedObject],
) -> anyhow::Result<()> {
    let params = PatchParams::apply(FIELD_MANAGER).force();

    for object in objects {
        let kind = object.kind();
        let registered = registry
            .get(kind)
            .ok_or_else(|| anyhow::anyhow!("Unregistered kind {:?}", kind))?;

        let api: Api<DynamicObject> = match (&registered.scope, object.namespace()) {
            (Scope::Cluster, _) => Api::all_with(client.clone(), &registered.api_resource),
            (Scope::Namespaced, Some(ns)) => {
                Api::namespaced_with(client.clone(), ns, &registered.api_resource)
            }
            (Scope::Namespaced, None) => {
                return Err(anyhow::anyhow!(
                    "{:?}/{} has no namespace",
                    kind,
                    object.name()
                ))
            }
        };

        let value = object.to_value()?;
        api.patch(object.name(), &params, &Patch::Apply(&value))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to apply {:?}/{}: {}", kind, object.name(), e))?;

        tracing::info!(kind = ?kind, name = %object.name(), namespace = ?object.namespace(), "applied");
    }
    Ok(())
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn read_bytes(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))
}

fn read_file(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))
}

fn read_trimmed(path: &Path) -> anyhow::Result<String> {
    Ok(read_file(path)?.trim().to_string())
}

/// An explicit file must be readable; a missing default file means "none"
fn resolve_from_file(explicit: Option<&Path>, default: &Path) -> anyhow::Result<Option<String>> {
    match explicit {
        Some(path) => read_trimmed(path).map(Some),
        None if default.exists() => read_trimmed(default).map(Some),
        None => {
            tracing::debug!(path = %default.display(), "default file not found");
            Ok(None)
        }
    }
}

fn read_manifests_dir(dir: &Path) -> anyhow::Result<BTreeMap<String, String>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        anyhow::anyhow!("Could not read manifests directory {}: {}", dir.display(), e)
    })?;

    let mut manifests = BTreeMap::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        let content = read_file(&path)?;
        manifests.insert(entry.file_name().to_string_lossy().into_owned(), content);
    }
    Ok(manifests)
}

/// Access key pair of one profile in an AWS credentials file
///
/// Both the credentials file form `[name]` and the config file form
/// `[profile name]` are accepted.
fn parse_aws_credentials(content: &str, profile: &str) -> anyhow::Result<(String, String)> {
    let ini = Ini::load_from_str(content)
        .map_err(|e| anyhow::anyhow!("Invalid AWS credentials file: {}", e))?;
    let section = ini
        .section(Some(profile))
        .or_else(|| ini.section(Some(format!("profile {}", profile))))
        .ok_or_else(|| anyhow::anyhow!("No {} profile", profile))?;

    let key = |name: &str| {
        section
            .get(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("Profile {} has no {}", profile, name))
    };
    Ok((key("aws_access_key_id")?, key("aws_secret_access_key")?))
}

fn gcp_project_id(service_account: &[u8]) -> anyhow::Result<String> {
    let value: serde_json::Value = serde_json::from_slice(service_account)
        .map_err(|e| anyhow::anyhow!("Invalid GCP service account: {}", e))?;
    value
        .get("project_id")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("GCP service account has no project_id"))
}
