//! ArgoCD register controller
//!
//! Registers every installed cluster with ArgoCD by writing a cluster secret
//! into the ArgoCD namespace. The secret carries a bearer token for a
//! dedicated manager ServiceAccount created on the managed cluster, and the
//! TLS settings from the cluster's admin kubeconfig.
//!
//! Registration is opt-in, through `--argocd-register` or the HiveConfig
//! `argoCDConfig`, and is guarded by a finalizer so that deleting a
//! ClusterDeployment also removes its ArgoCD cluster secret.

use std::collections::BTreeMap;
use std::sync::Arc;

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use kube::runtime::controller::Action;
use kube::ResourceExt;
use serde::Serialize;
use tracing::{debug, error, info, instrument};

use hive_common::crd::ClusterDeployment;
use hive_common::kube_utils::secret_value;
use hive_common::{Error, KUBECONFIG_SECRET_KEY};

use crate::context::{ArgoCdSettings, Context};
use crate::remote::RemoteKubeconfig;
use crate::requeue_after_error;

/// Finalizer held while a cluster is registered with ArgoCD
pub const ARGOCD_FINALIZER: &str = "hive.openshift.io/argocd-cluster";

/// Label ArgoCD uses to discover cluster secrets
pub const ARGOCD_SECRET_TYPE_LABEL: &str = "argocd.argoproj.io/secret-type";

/// Label marking objects created by Hive
pub const CREATED_BY_HIVE_LABEL: &str = "hive.openshift.io/created-by-hive";

/// ArgoCD's cluster connection blob stored under the `config` key
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    /// Token of the manager ServiceAccount
    pub bearer_token: String,
    /// TLS settings for the API server
    pub tls_client_config: TlsClientConfig,
}

/// TLS portion of [`ClusterConfig`]
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TlsClientConfig {
    /// Skip certificate verification
    pub insecure: bool,
    /// Expected server name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    /// Base64 PEM CA bundle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_data: Option<String>,
}

impl ClusterConfig {
    /// Combine a bearer token with the kubeconfig's TLS settings
    pub fn new(bearer_token: String, tls: &RemoteKubeconfig) -> Self {
        Self {
            bearer_token,
            tls_client_config: TlsClientConfig {
                insecure: tls.insecure,
                server_name: tls.server_name.clone(),
                ca_data: tls.ca_data.clone(),
            },
        }
    }
}

// 32-bit FNV-1a
fn fnv1a32(bytes: &[u8]) -> u32 {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;
    bytes.iter().fold(OFFSET_BASIS, |hash, b| {
        (hash ^ u32::from(*b)).wrapping_mul(PRIME)
    })
}

/// Predictable name of a cluster's ArgoCD secret
///
/// `cluster-<host>-<fnv1a32(api_url)>`, where host is lowercased and has no
/// port. Matches the naming ArgoCD itself uses for cluster secrets.
pub fn registry_secret_name(api_url: &str) -> Result<String, Error> {
    let url = url::Url::parse(api_url)
        .map_err(|e| Error::validation(format!("invalid API URL {}: {}", api_url, e)))?;
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| Error::validation(format!("API URL {} has no host", api_url)))?;
    Ok(format!(
        "cluster-{}-{}",
        host.to_lowercase(),
        fnv1a32(api_url.as_bytes())
    ))
}

/// The ArgoCD cluster secret for a ClusterDeployment
pub fn registry_secret(
    cd: &ClusterDeployment,
    api_url: &str,
    namespace: &str,
    config: &ClusterConfig,
) -> Result<Secret, Error> {
    let config = serde_json::to_vec(config)
        .map_err(|e| Error::serialization_for_kind("ClusterConfig", e.to_string()))?;

    let mut labels = BTreeMap::from([
        (ARGOCD_SECRET_TYPE_LABEL.to_string(), "cluster".to_string()),
        (CREATED_BY_HIVE_LABEL.to_string(), "true".to_string()),
    ]);
    labels.extend(cd.labels().clone());

    Ok(Secret {
        metadata: ObjectMeta {
            name: Some(registry_secret_name(api_url)?),
            namespace: Some(namespace.to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        data: Some(BTreeMap::from([
            ("server".to_string(), ByteString(api_url.as_bytes().to_vec())),
            ("name".to_string(), ByteString(cd.name_any().into_bytes())),
            ("config".to_string(), ByteString(config)),
        ])),
        ..Default::default()
    })
}

fn has_finalizer(cd: &ClusterDeployment) -> bool {
    cd.finalizers().iter().any(|f| f == ARGOCD_FINALIZER)
}

/// Whether `secret` already registers the cluster served at `api_url`
fn is_registered(secret: &Secret, api_url: &str) -> bool {
    secret_value(secret, "server").is_some_and(|server| server == api_url.as_bytes())
        && secret_value(secret, "config").is_some()
}

async fn argocd_settings(ctx: &Context) -> Result<ArgoCdSettings, Error> {
    let config = ctx.kube.get_hive_config().await?;
    Ok(ctx.argocd.with_hive_config(config.as_ref()))
}

/// Reconcile a ClusterDeployment's ArgoCD registration
///
/// Deletion always releases a held finalizer, even with registration
/// switched off, so clusters registered earlier can still be deleted.
#[instrument(
    skip(cd, ctx),
    fields(cluster_deployment = %cd.name_any(), namespace = %cd.namespace().unwrap_or_default())
)]
pub async fn reconcile(cd: Arc<ClusterDeployment>, ctx: Arc<Context>) -> Result<Action, Error> {
    let name = cd.name_any();
    let namespace = cd.namespace().unwrap_or_default();

    if cd.is_deleting() {
        if has_finalizer(&cd) {
            deregister(&cd, &ctx).await?;
        }
        return Ok(Action::await_change());
    }

    if !cd.spec.installed {
        debug!("cluster not installed, skipping");
        return Ok(Action::await_change());
    }
    let Some(metadata) = cd.spec.cluster_metadata.as_ref() else {
        error!("installed cluster has no metadata");
        return Ok(Action::await_change());
    };

    let argocd = argocd_settings(&ctx).await?;
    if !argocd.register {
        debug!("argocd registration disabled");
        return Ok(Action::await_change());
    }

    let api_url = cd.api_url().ok_or_else(|| {
        Error::validation_for_field(&name, "status.apiURL", "installed cluster has no API URL")
    })?;
    let secret_name = registry_secret_name(api_url)?;

    if !has_finalizer(&cd) {
        ctx.kube
            .add_cluster_deployment_finalizer(&name, &namespace, ARGOCD_FINALIZER)
            .await?;
    }

    if let Some(existing) = ctx.kube.get_secret(&secret_name, &argocd.namespace).await? {
        if is_registered(&existing, api_url) {
            debug!(secret = %secret_name, "cluster already registered");
            return Ok(Action::await_change());
        }
    }

    let kubeconfig = ctx
        .kube
        .get_secret_data(
            &metadata.admin_kubeconfig_secret_ref.name,
            &namespace,
            KUBECONFIG_SECRET_KEY,
        )
        .await?;
    let tls = RemoteKubeconfig::tls(&name, &kubeconfig)?;
    let token = ctx.remote.install_manager_rbac(&name, &kubeconfig).await?;

    let secret = registry_secret(
        &cd,
        api_url,
        &argocd.namespace,
        &ClusterConfig::new(token, &tls),
    )?;
    ctx.kube.apply_secret(&secret).await?;
    info!(
        secret = %secret_name,
        argocd_namespace = %argocd.namespace,
        "registered cluster with argocd"
    );

    Ok(Action::await_change())
}

async fn deregister(cd: &ClusterDeployment, ctx: &Context) -> Result<(), Error> {
    let name = cd.name_any();
    let namespace = cd.namespace().unwrap_or_default();

    match cd.api_url() {
        Some(api_url) => {
            let secret_name = registry_secret_name(api_url)?;
            let argocd = argocd_settings(ctx).await?;
            ctx.kube
                .delete_secret(&secret_name, &argocd.namespace)
                .await?;
            info!(secret = %secret_name, "deregistered cluster from argocd");
        }
        None => debug!("cluster never had an API URL, nothing to deregister"),
    }

    ctx.kube
        .remove_cluster_deployment_finalizer(&name, &namespace, ARGOCD_FINALIZER)
        .await
}

/// Error policy for the ArgoCD register controller
pub fn error_policy(cd: Arc<ClusterDeployment>, error: &Error, _ctx: Arc<Context>) -> Action {
    error!(
        ?error,
        cluster_deployment = %cd.name_any(),
        controller = "argocd-register",
        retryable = error.is_retryable(),
        "reconciliation failed"
    );
    requeue_after_error(error)
}
