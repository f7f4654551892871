//! Kubernetes utility functions shared by the operator and controllers

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, DeleteParams, Patch, PatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::{debug, trace};

use crate::Error;

/// Default connection timeout for kube clients
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for kube clients
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Poll until a condition is met or timeout is reached
///
/// Repeatedly calls `check_fn` until it returns `Ok(true)`. Errors from the
/// check are logged and polling continues; only the timeout ends the loop
/// with an error.
pub async fn poll_until<F, Fut>(
    timeout: Duration,
    poll_interval: Duration,
    timeout_msg: impl Into<String>,
    mut check_fn: F,
) -> Result<(), Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, Error>>,
{
    let start = std::time::Instant::now();
    let timeout_msg = timeout_msg.into();

    loop {
        if start.elapsed() > timeout {
            return Err(Error::internal_with_context("poll_until", timeout_msg));
        }

        match check_fn().await {
            Ok(true) => return Ok(()),
            Ok(false) => trace!("Polling condition not yet met, retrying..."),
            Err(e) => trace!("Polling check returned error (retrying): {}", e),
        }

        tokio::time::sleep(poll_interval).await;
    }
}

/// Create a kube client for the management cluster with default timeouts
///
/// Uses the kubeconfig at `kubeconfig` when given, otherwise infers the
/// configuration from the environment (in-cluster or `KUBECONFIG`).
pub async fn create_client(kubeconfig: Option<&Path>) -> Result<Client, Error> {
    let mut config = match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                Error::internal_with_context(
                    "create_client",
                    format!("failed to read kubeconfig: {}", e),
                )
            })?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| {
                    Error::internal_with_context(
                        "create_client",
                        format!("failed to load kubeconfig: {}", e),
                    )
                })?
        }
        None => Config::infer().await.map_err(|e| {
            Error::internal_with_context("create_client", format!("failed to infer config: {}", e))
        })?,
    };
    config.connect_timeout = Some(DEFAULT_CONNECT_TIMEOUT);
    config.read_timeout = Some(DEFAULT_READ_TIMEOUT);
    Client::try_from(config).map_err(|e| {
        Error::internal_with_context("create_client", format!("failed to create client: {}", e))
    })
}

/// Get one key of a secret's data
pub async fn get_secret_data(
    client: &Client,
    name: &str,
    namespace: &str,
    key: &str,
) -> Result<Vec<u8>, Error> {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let secret = secrets.get(name).await?;
    secret_value(&secret, key)
        .ok_or_else(|| Error::secret(namespace, name, format!("missing key {}", key)))
}

/// Look up a key in `data`, falling back to `stringData`
pub fn secret_value(secret: &Secret, key: &str) -> Option<Vec<u8>> {
    if let Some(value) = secret.data.as_ref().and_then(|d| d.get(key)) {
        return Some(value.0.clone());
    }
    secret
        .string_data
        .as_ref()
        .and_then(|d| d.get(key))
        .map(|s| s.as_bytes().to_vec())
}

/// Server-side apply a secret, taking ownership of conflicting fields
pub async fn apply_secret(client: &Client, secret: &Secret) -> Result<(), Error> {
    let name = secret.metadata.name.as_deref().ok_or_else(|| {
        Error::internal_with_context("apply_secret", "secret has no metadata.name")
    })?;
    let namespace = secret.metadata.namespace.as_deref().ok_or_else(|| {
        Error::internal_with_context("apply_secret", "secret has no metadata.namespace")
    })?;
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    secrets
        .patch(
            name,
            &PatchParams::apply(crate::FIELD_MANAGER).force(),
            &Patch::Apply(secret),
        )
        .await?;
    Ok(())
}

/// Delete a secret; a secret that is already gone counts as deleted
pub async fn delete_secret(client: &Client, name: &str, namespace: &str) -> Result<(), Error> {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    match secrets.delete(name, &DeleteParams::default()).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(e)) if e.code == 404 => {
            debug!(%namespace, %name, "secret already deleted");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Status merge patch guarded by the resourceVersion it was computed from
///
/// Only the fields present in `status` are written. The API server answers
/// 409 Conflict when the object changed after `resource_version` was read.
pub fn status_patch(resource_version: &str, status: &impl serde::Serialize) -> serde_json::Value {
    serde_json::json!({
        "metadata": { "resourceVersion": resource_version },
        "status": status,
    })
}

/// Patch the status sub-resource of a namespaced resource with a merge patch
///
/// The patch is rejected with 409 Conflict if the object is no longer at
/// `resource_version`.
pub async fn patch_resource_status<T>(
    client: &Client,
    name: &str,
    namespace: &str,
    resource_version: &str,
    status: &impl serde::Serialize,
) -> std::result::Result<(), kube::Error>
where
    T: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>
        + Clone
        + serde::de::DeserializeOwned
        + std::fmt::Debug,
    <T as kube::Resource>::DynamicType: Default,
{
    let api: Api<T> = Api::namespaced(client.clone(), namespace);
    let patch = status_patch(resource_version, status);
    api.patch_status(
        name,
        &PatchParams::apply(crate::FIELD_MANAGER),
        &Patch::Merge(&patch),
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::ByteString;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn secret_value_prefers_data_over_string_data() {
        let secret = Secret {
            data: Some(BTreeMap::from([(
                "kubeconfig".to_string(),
                ByteString(b"from-data".to_vec()),
            )])),
            string_data: Some(BTreeMap::from([
                ("kubeconfig".to_string(), "from-string-data".to_string()),
                ("username".to_string(), "admin".to_string()),
            ])),
            ..Default::default()
        };
        assert_eq!(secret_value(&secret, "kubeconfig"), Some(b"from-data".to_vec()));
        assert_eq!(secret_value(&secret, "username"), Some(b"admin".to_vec()));
        assert_eq!(secret_value(&secret, "password"), None);
    }

    #[test]
    fn status_patch_is_gated_on_resource_version() {
        let patch = status_patch("42", &serde_json::json!({ "conditions": [] }));
        assert_eq!(
            patch,
            serde_json::json!({
                "metadata": { "resourceVersion": "42" },
                "status": { "conditions": [] }
            })
        );
    }

    #[tokio::test]
    async fn poll_until_returns_once_check_passes() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result = poll_until(
            Duration::from_secs(5),
            Duration::from_millis(1),
            "never ready",
            || {
                let counter = counter.clone();
                async move { Ok(counter.fetch_add(1, Ordering::SeqCst) >= 2) }
            },
        )
        .await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn poll_until_times_out_with_message() {
        let result = poll_until(
            Duration::from_millis(20),
            Duration::from_millis(5),
            "token never appeared",
            || async { Err(Error::internal("not yet")) },
        )
        .await;
        let err = result.expect_err("should time out");
        assert!(err.to_string().contains("token never appeared"));
    }
}
