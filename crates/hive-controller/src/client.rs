//! Management cluster client used by the controllers
//!
//! [`KubeClient`] wraps the handful of API calls the reconcilers make so
//! reconcile logic can run against a mock in tests.
//!
//! Writes to a ClusterDeployment carry the `resourceVersion` they were
//! computed from. A concurrent change makes the write fail with 409 Conflict
//! and the controller retries from a fresh read.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, ResourceExt};

#[cfg(test)]
use mockall::automock;

use hive_common::crd::{ClusterDeployment, Condition, HiveConfig};
use hive_common::kube_utils;
use hive_common::{Error, FIELD_MANAGER, HIVE_CONFIG_NAME};

/// Trait abstracting management cluster operations
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KubeClient: Send + Sync {
    /// Read one key of a secret
    async fn get_secret_data(
        &self,
        name: &str,
        namespace: &str,
        key: &str,
    ) -> Result<Vec<u8>, Error>;

    /// Read a secret, `None` if it does not exist
    async fn get_secret(&self, name: &str, namespace: &str) -> Result<Option<Secret>, Error>;

    /// Read the singleton HiveConfig, `None` if it does not exist
    async fn get_hive_config(&self) -> Result<Option<HiveConfig>, Error>;

    /// Replace `status.conditions` of a ClusterDeployment still at `resource_version`
    async fn patch_cluster_deployment_conditions(
        &self,
        name: &str,
        namespace: &str,
        resource_version: &str,
        conditions: &[Condition],
    ) -> Result<(), Error>;

    /// Server-side apply a secret
    async fn apply_secret(&self, secret: &Secret) -> Result<(), Error>;

    /// Delete a secret; an already missing secret is not an error
    async fn delete_secret(&self, name: &str, namespace: &str) -> Result<(), Error>;

    /// Add a finalizer to a ClusterDeployment if not already present
    async fn add_cluster_deployment_finalizer(
        &self,
        name: &str,
        namespace: &str,
        finalizer: &str,
    ) -> Result<(), Error>;

    /// Remove a finalizer from a ClusterDeployment
    async fn remove_cluster_deployment_finalizer(
        &self,
        name: &str,
        namespace: &str,
        finalizer: &str,
    ) -> Result<(), Error>;
}

/// Merge patch setting the finalizer list of an object read at `resource_version`
pub fn finalizers_patch(resource_version: &str, finalizers: &[String]) -> serde_json::Value {
    serde_json::json!({
        "metadata": {
            "resourceVersion": resource_version,
            "finalizers": finalizers
        }
    })
}

fn resource_version(cd: &ClusterDeployment) -> Result<String, Error> {
    cd.resource_version().ok_or_else(|| {
        Error::internal_with_context(
            "finalizer",
            format!("ClusterDeployment {} has no resourceVersion", cd.name_any()),
        )
    })
}

/// Real Kubernetes client implementation
pub struct KubeClientImpl {
    client: Client,
}

impl KubeClientImpl {
    /// Create a new KubeClientImpl wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn cluster_deployments(&self, namespace: &str) -> Api<ClusterDeployment> {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn write_finalizers(
        &self,
        api: &Api<ClusterDeployment>,
        cd: &ClusterDeployment,
        finalizers: &[String],
    ) -> Result<(), Error> {
        let patch = finalizers_patch(&resource_version(cd)?, finalizers);
        api.patch(
            &cd.name_any(),
            &PatchParams::apply(FIELD_MANAGER),
            &Patch::Merge(&patch),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl KubeClient for KubeClientImpl {
    async fn get_secret_data(
        &self,
        name: &str,
        namespace: &str,
        key: &str,
    ) -> Result<Vec<u8>, Error> {
        kube_utils::get_secret_data(&self.client, name, namespace, key).await
    }

    async fn get_secret(&self, name: &str, namespace: &str) -> Result<Option<Secret>, Error> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(secrets.get_opt(name).await?)
    }

    async fn get_hive_config(&self) -> Result<Option<HiveConfig>, Error> {
        let configs: Api<HiveConfig> = Api::all(self.client.clone());
        Ok(configs.get_opt(HIVE_CONFIG_NAME).await?)
    }

    async fn patch_cluster_deployment_conditions(
        &self,
        name: &str,
        namespace: &str,
        resource_version: &str,
        conditions: &[Condition],
    ) -> Result<(), Error> {
        kube_utils::patch_resource_status::<ClusterDeployment>(
            &self.client,
            name,
            namespace,
            resource_version,
            &serde_json::json!({ "conditions": conditions }),
        )
        .await?;
        Ok(())
    }

    async fn apply_secret(&self, secret: &Secret) -> Result<(), Error> {
        kube_utils::apply_secret(&self.client, secret).await
    }

    async fn delete_secret(&self, name: &str, namespace: &str) -> Result<(), Error> {
        kube_utils::delete_secret(&self.client, name, namespace).await
    }

    async fn add_cluster_deployment_finalizer(
        &self,
        name: &str,
        namespace: &str,
        finalizer: &str,
    ) -> Result<(), Error> {
        let api = self.cluster_deployments(namespace);

        let cd = api.get(name).await?;
        let mut finalizers = cd.finalizers().to_vec();
        if finalizers.iter().any(|f| f == finalizer) {
            return Ok(());
        }
        finalizers.push(finalizer.to_string());
        self.write_finalizers(&api, &cd, &finalizers).await
    }

    async fn remove_cluster_deployment_finalizer(
        &self,
        name: &str,
        namespace: &str,
        finalizer: &str,
    ) -> Result<(), Error> {
        let api = self.cluster_deployments(namespace);

        let cd = api.get(name).await?;
        if !cd.finalizers().iter().any(|f| f == finalizer) {
            return Ok(());
        }
        let finalizers: Vec<String> = cd
            .finalizers()
            .iter()
            .filter(|f| *f != finalizer)
            .cloned()
            .collect();
        self.write_finalizers(&api, &cd, &finalizers).await
    }
}
