//! Explicit resource registry
//!
//! Maps every kind the control plane reads or writes to its `ApiResource`
//! and scope. Built once at startup and shared via `Arc<ResourceRegistry>`;
//! there is no process-wide type scheme.

use std::collections::HashMap;

use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::discovery::{ApiResource, Scope};
use kube::Resource;

use crate::crd::{
    ClusterDeployment, ClusterImageSet, HiveConfig, MachinePool, SelectorSyncSet, SyncSet,
};

/// Kinds known to the control plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// ClusterDeployment (hive.openshift.io)
    ClusterDeployment,
    /// MachinePool (hive.openshift.io)
    MachinePool,
    /// ClusterImageSet (hive.openshift.io)
    ClusterImageSet,
    /// SyncSet (hive.openshift.io)
    SyncSet,
    /// SelectorSyncSet (hive.openshift.io)
    SelectorSyncSet,
    /// HiveConfig (hive.openshift.io)
    HiveConfig,
    /// Core Secret
    Secret,
    /// Core ConfigMap
    ConfigMap,
}

/// All ResourceKind variants for iteration.
pub const ALL_RESOURCE_KINDS: &[ResourceKind] = &[
    ResourceKind::ClusterDeployment,
    ResourceKind::MachinePool,
    ResourceKind::ClusterImageSet,
    ResourceKind::SyncSet,
    ResourceKind::SelectorSyncSet,
    ResourceKind::HiveConfig,
    ResourceKind::Secret,
    ResourceKind::ConfigMap,
];

/// A registered kind with its API coordinates and scope
#[derive(Debug, Clone)]
pub struct RegisteredResource {
    /// Kind identifier
    pub kind: ResourceKind,
    /// Group, version, kind and plural
    pub api_resource: ApiResource,
    /// Namespaced or cluster-scoped
    pub scope: Scope,
}

fn entry<K>(kind: ResourceKind, scope: Scope) -> RegisteredResource
where
    K: Resource<DynamicType = ()>,
{
    RegisteredResource {
        kind,
        api_resource: ApiResource::erase::<K>(&()),
        scope,
    }
}

/// Lookup table from kind to API coordinates
#[derive(Debug, Clone)]
pub struct ResourceRegistry {
    entries: HashMap<ResourceKind, RegisteredResource>,
}

impl ResourceRegistry {
    /// Build the registry with every kind the control plane handles
    pub fn new() -> Self {
        let entries = ALL_RESOURCE_KINDS
            .iter()
            .map(|kind| {
                let registered = match kind {
                    ResourceKind::ClusterDeployment => {
                        entry::<ClusterDeployment>(*kind, Scope::Namespaced)
                    }
                    ResourceKind::MachinePool => entry::<MachinePool>(*kind, Scope::Namespaced),
                    ResourceKind::ClusterImageSet => {
                        entry::<ClusterImageSet>(*kind, Scope::Cluster)
                    }
                    ResourceKind::SyncSet => entry::<SyncSet>(*kind, Scope::Namespaced),
                    ResourceKind::SelectorSyncSet => {
                        entry::<SelectorSyncSet>(*kind, Scope::Cluster)
                    }
                    ResourceKind::HiveConfig => entry::<HiveConfig>(*kind, Scope::Cluster),
                    ResourceKind::Secret => entry::<Secret>(*kind, Scope::Namespaced),
                    ResourceKind::ConfigMap => entry::<ConfigMap>(*kind, Scope::Namespaced),
                };
                (*kind, registered)
            })
            .collect();
        Self { entries }
    }

    /// Get the registration for a kind
    pub fn get(&self, kind: ResourceKind) -> Option<&RegisteredResource> {
        self.entries.get(&kind)
    }

    /// Resolve an object's `apiVersion` and `kind` to its registration
    pub fn resolve(&self, api_version: &str, kind: &str) -> Option<&RegisteredResource> {
        self.entries
            .values()
            .find(|r| r.api_resource.api_version == api_version && r.api_resource.kind == kind)
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
