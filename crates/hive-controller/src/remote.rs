//! Clients for managed (remote) clusters
//!
//! Remote clients are built from the admin kubeconfig stored for each
//! ClusterDeployment. Building a client never touches the network; only the
//! calls made through [`RemoteClusters`] do.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Secret, ServiceAccount};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, PolicyRule, RoleRef, Subject};
use kube::api::{Api, ObjectMeta, Patch, PatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

use hive_common::kube_utils::{
    poll_until, secret_value, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT,
};
use hive_common::{Error, FIELD_MANAGER};

/// Namespace holding the ArgoCD manager identity on the remote cluster
pub const MANAGER_NAMESPACE: &str = "kube-system";
/// ServiceAccount ArgoCD authenticates as
pub const MANAGER_SERVICE_ACCOUNT: &str = "argocd-manager";
/// ClusterRole granted to the manager
pub const MANAGER_CLUSTER_ROLE: &str = "argocd-manager-role";
/// Binding of the manager role to the ServiceAccount
pub const MANAGER_CLUSTER_ROLE_BINDING: &str = "argocd-manager-role-binding";
/// Token secret populated by the remote token controller
pub const MANAGER_TOKEN_SECRET: &str = "argocd-manager-token";

const TOKEN_TIMEOUT: Duration = Duration::from_secs(30);
const TOKEN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Operations against a managed cluster reached through its admin kubeconfig
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RemoteClusters: Send + Sync {
    /// Issue a server version request; success means the cluster is reachable
    async fn probe(&self, cluster: &str, kubeconfig: &[u8]) -> Result<(), Error>;

    /// Ensure the ArgoCD manager identity exists and return its bearer token
    async fn install_manager_rbac(&self, cluster: &str, kubeconfig: &[u8])
        -> Result<String, Error>;
}

/// Production [`RemoteClusters`] backed by real kube clients
#[derive(Clone, Debug, Default)]
pub struct RemoteClusterClient;

impl RemoteClusterClient {
    /// Create a new remote cluster client
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RemoteClusters for RemoteClusterClient {
    async fn probe(&self, cluster: &str, kubeconfig: &[u8]) -> Result<(), Error> {
        let client = build_remote_client(cluster, kubeconfig).await?;
        let info = client
            .apiserver_version()
            .await
            .map_err(|e| Error::remote(cluster, e.to_string()))?;
        debug!(cluster, version = %info.git_version, "remote cluster responded");
        Ok(())
    }

    async fn install_manager_rbac(
        &self,
        cluster: &str,
        kubeconfig: &[u8],
    ) -> Result<String, Error> {
        let client = build_remote_client(cluster, kubeconfig).await?;

        apply(
            Api::namespaced(client.clone(), MANAGER_NAMESPACE),
            &manager_service_account(),
        )
        .await?;
        apply(Api::all(client.clone()), &manager_cluster_role()).await?;
        apply(Api::all(client.clone()), &manager_cluster_role_binding()).await?;

        let secrets: Api<Secret> = Api::namespaced(client, MANAGER_NAMESPACE);
        apply(secrets.clone(), &manager_token_secret()).await?;

        poll_until(
            TOKEN_TIMEOUT,
            TOKEN_POLL_INTERVAL,
            format!("token for {} was not populated", MANAGER_TOKEN_SECRET),
            || {
                let secrets = secrets.clone();
                async move {
                    let secret = secrets.get(MANAGER_TOKEN_SECRET).await?;
                    Ok::<_, Error>(secret_value(&secret, "token").is_some_and(|t| !t.is_empty()))
                }
            },
        )
        .await?;

        let secret = secrets.get(MANAGER_TOKEN_SECRET).await?;
        let token = secret_value(&secret, "token").ok_or_else(|| {
            Error::secret(MANAGER_NAMESPACE, MANAGER_TOKEN_SECRET, "missing key token")
        })?;
        info!(cluster, "argocd manager identity installed");
        String::from_utf8(token).map_err(|e| {
            Error::secret(MANAGER_NAMESPACE, MANAGER_TOKEN_SECRET, e.to_string())
        })
    }
}

async fn apply<K>(api: Api<K>, object: &K) -> Result<(), Error>
where
    K: Resource + Clone + DeserializeOwned + Serialize + std::fmt::Debug,
{
    let name = object
        .meta()
        .name
        .as_deref()
        .ok_or_else(|| Error::internal_with_context("remote_apply", "object has no name"))?;
    api.patch(
        name,
        &PatchParams::apply(FIELD_MANAGER).force(),
        &Patch::Apply(object),
    )
    .await?;
    Ok(())
}

fn manager_service_account() -> ServiceAccount {
    ServiceAccount {
        metadata: ObjectMeta {
            name: Some(MANAGER_SERVICE_ACCOUNT.to_string()),
            namespace: Some(MANAGER_NAMESPACE.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn manager_cluster_role() -> ClusterRole {
    let all = || Some(vec!["*".to_string()]);
    ClusterRole {
        metadata: ObjectMeta {
            name: Some(MANAGER_CLUSTER_ROLE.to_string()),
            ..Default::default()
        },
        rules: Some(vec![
            PolicyRule {
                api_groups: all(),
                resources: all(),
                verbs: vec!["*".to_string()],
                ..Default::default()
            },
            PolicyRule {
                non_resource_urls: all(),
                verbs: vec!["*".to_string()],
                ..Default::default()
            },
        ]),
        ..Default::default()
    }
}

fn manager_cluster_role_binding() -> ClusterRoleBinding {
    ClusterRoleBinding {
        metadata: ObjectMeta {
            name: Some(MANAGER_CLUSTER_ROLE_BINDING.to_string()),
            ..Default::default()
        },
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "ClusterRole".to_string(),
            name: MANAGER_CLUSTER_ROLE.to_string(),
        },
        subjects: Some(vec![Subject {
            kind: "ServiceAccount".to_string(),
            name: MANAGER_SERVICE_ACCOUNT.to_string(),
            namespace: Some(MANAGER_NAMESPACE.to_string()),
            ..Default::default()
        }]),
    }
}

fn manager_token_secret() -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(MANAGER_TOKEN_SECRET.to_string()),
            namespace: Some(MANAGER_NAMESPACE.to_string()),
            annotations: Some(BTreeMap::from([(
                "kubernetes.io/service-account.name".to_string(),
                MANAGER_SERVICE_ACCOUNT.to_string(),
            )])),
            ..Default::default()
        },
        type_: Some("kubernetes.io/service-account-token".to_string()),
        ..Default::default()
    }
}

fn parse_kubeconfig(cluster: &str, kubeconfig: &[u8]) -> Result<Kubeconfig, Error> {
    let text = std::str::from_utf8(kubeconfig).map_err(|e| {
        Error::client_construction(cluster, format!("kubeconfig is not UTF-8: {}", e))
    })?;
    Kubeconfig::from_yaml(text)
        .map_err(|e| Error::client_construction(cluster, format!("invalid kubeconfig: {}", e)))
}

/// Client configuration for a remote cluster with default timeouts applied
pub async fn remote_config(cluster: &str, kubeconfig: &[u8]) -> Result<Config, Error> {
    let parsed = parse_kubeconfig(cluster, kubeconfig)?;
    let mut config = Config::from_custom_kubeconfig(parsed, &KubeConfigOptions::default())
        .await
        .map_err(|e| Error::client_construction(cluster, e.to_string()))?;
    config.connect_timeout = Some(DEFAULT_CONNECT_TIMEOUT);
    config.read_timeout = Some(DEFAULT_READ_TIMEOUT);
    Ok(config)
}

/// Build a client for a remote cluster from its admin kubeconfig
///
/// `cluster` only labels errors. No request is made.
pub async fn build_remote_client(cluster: &str, kubeconfig: &[u8]) -> Result<Client, Error> {
    let config = remote_config(cluster, kubeconfig).await?;
    Client::try_from(config).map_err(|e| Error::client_construction(cluster, e.to_string()))
}

/// Connection and TLS settings of a kubeconfig's current context
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteKubeconfig {
    /// API server URL
    pub server: String,
    /// Skip server certificate verification
    pub insecure: bool,
    /// Server name for SNI and certificate verification
    pub server_name: Option<String>,
    /// Base64 PEM CA bundle, as stored in the kubeconfig
    pub ca_data: Option<String>,
}

impl RemoteKubeconfig {
    /// Extract server and TLS settings from the kubeconfig's current context
    pub fn tls(cluster: &str, kubeconfig: &[u8]) -> Result<Self, Error> {
        let parsed = parse_kubeconfig(cluster, kubeconfig)?;

        let context_name = parsed
            .current_context
            .as_deref()
            .ok_or_else(|| Error::client_construction(cluster, "kubeconfig has no current-context"))?;
        let cluster_name = parsed
            .contexts
            .iter()
            .find(|c| c.name == context_name)
            .and_then(|c| c.context.as_ref())
            .map(|c| c.cluster.clone())
            .ok_or_else(|| {
                Error::client_construction(cluster, format!("context {} not found", context_name))
            })?;
        let remote = parsed
            .clusters
            .iter()
            .find(|c| c.name == cluster_name)
            .and_then(|c| c.cluster.as_ref())
            .ok_or_else(|| {
                Error::client_construction(cluster, format!("cluster {} not found", cluster_name))
            })?;

        let server = remote
            .server
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::client_construction(cluster, "cluster has no server"))?;

        Ok(Self {
            server,
            insecure: remote.insecure_skip_tls_verify.unwrap_or(false),
            server_name: remote.tls_server_name.clone(),
            ca_data: remote.certificate_authority_data.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: admin
clusters:
- name: other
  cluster:
    server: https://other.example.com:6443
- name: bar
  cluster:
    server: https://api.bar.example.com:6443
    certificate-authority-data: Q0EgREFUQQ==
    tls-server-name: api.bar.example.com
contexts:
- name: admin
  context:
    cluster: bar
    user: admin
users:
- name: admin
  user:
    token: abc123
"#;

    const INSECURE_KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: admin
clusters:
- name: bar
  cluster:
    server: https://api.bar.example.com:6443
    insecure-skip-tls-verify: true
contexts:
- name: admin
  context:
    cluster: bar
    user: admin
users:
- name: admin
  user:
    token: abc123
"#;

    #[test]
    fn tls_follows_current_context() {
        let tls = RemoteKubeconfig::tls("bar", KUBECONFIG.as_bytes()).expect("tls");
        assert_eq!(tls.server, "https://api.bar.example.com:6443");
        assert!(!tls.insecure);
        assert_eq!(tls.server_name.as_deref(), Some("api.bar.example.com"));
        assert_eq!(tls.ca_data.as_deref(), Some("Q0EgREFUQQ=="));
    }

    #[test]
    fn tls_reports_insecure_clusters() {
        let tls = RemoteKubeconfig::tls("bar", INSECURE_KUBECONFIG.as_bytes()).expect("tls");
        assert!(tls.insecure);
        assert!(tls.ca_data.is_none());
        assert!(tls.server_name.is_none());
    }

    #[test]
    fn tls_without_current_context_fails() {
        let kubeconfig = INSECURE_KUBECONFIG.replace("current-context: admin\n", "");
        let err = RemoteKubeconfig::tls("bar", kubeconfig.as_bytes()).expect_err("no context");
        assert!(matches!(err, Error::ClientConstruction { .. }));
    }

    #[tokio::test]
    async fn remote_config_applies_timeouts() {
        let config = remote_config("bar", INSECURE_KUBECONFIG.as_bytes())
            .await
            .expect("config");
        assert_eq!(config.connect_timeout, Some(DEFAULT_CONNECT_TIMEOUT));
        assert_eq!(config.read_timeout, Some(DEFAULT_READ_TIMEOUT));
        assert_eq!(config.cluster_url.host(), Some("api.bar.example.com"));
        assert!(config.accept_invalid_certs);
    }

    #[tokio::test]
    async fn garbage_kubeconfig_is_a_construction_error() {
        match build_remote_client("bar", b"{not: [valid").await {
            Err(Error::ClientConstruction { cluster, .. }) => assert_eq!(cluster, "bar"),
            Err(other) => panic!("unexpected error {:?}", other),
            Ok(_) => panic!("invalid kubeconfig produced a client"),
        }
    }

    #[test]
    fn manager_role_grants_everything() {
        let role = manager_cluster_role();
        let rules = role.rules.expect("rules");
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].resources.as_deref(), Some(&["*".to_string()][..]));
        assert_eq!(rules[1].non_resource_urls.as_deref(), Some(&["*".to_string()][..]));
    }

    #[test]
    fn token_secret_is_bound_to_service_account() {
        let secret = manager_token_secret();
        assert_eq!(
            secret.type_.as_deref(),
            Some("kubernetes.io/service-account-token")
        );
        assert_eq!(
            secret.metadata.annotations.expect("annotations")
                ["kubernetes.io/service-account.name"],
            MANAGER_SERVICE_ACCOUNT
        );
        let binding = manager_cluster_role_binding();
        assert_eq!(binding.role_ref.name, MANAGER_CLUSTER_ROLE);
    }
}
