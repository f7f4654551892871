//! Generated objects and the helpers that build their metadata

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;

use hive_common::crd::{
    ClusterDeployment, ClusterImageSet, MachinePool, SelectorSyncSet, SyncSet,
};
use hive_common::registry::ResourceKind;
use hive_common::{Error, Result};

/// Secret type for opaque key/value data
pub const SECRET_TYPE_OPAQUE: &str = "Opaque";
/// Secret type for image pull credentials
pub const SECRET_TYPE_DOCKER_CONFIG_JSON: &str = "kubernetes.io/dockerconfigjson";
/// Secret type for TLS key pairs
pub const SECRET_TYPE_TLS: &str = "kubernetes.io/tls";

/// One object produced by the generator
#[derive(Clone, Debug)]
pub enum GeneratedObject {
    /// The root ClusterDeployment
    ClusterDeployment(Box<ClusterDeployment>),
    /// A MachinePool
    MachinePool(MachinePool),
    /// A Secret
    Secret(Secret),
    /// A ConfigMap
    ConfigMap(ConfigMap),
    /// A ClusterImageSet
    ClusterImageSet(ClusterImageSet),
    /// A SyncSet
    SyncSet(SyncSet),
    /// A SelectorSyncSet
    SelectorSyncSet(SelectorSyncSet),
}

impl GeneratedObject {
    /// Registry kind of this object
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::ClusterDeployment(_) => ResourceKind::ClusterDeployment,
            Self::MachinePool(_) => ResourceKind::MachinePool,
            Self::Secret(_) => ResourceKind::Secret,
            Self::ConfigMap(_) => ResourceKind::ConfigMap,
            Self::ClusterImageSet(_) => ResourceKind::ClusterImageSet,
            Self::SyncSet(_) => ResourceKind::SyncSet,
            Self::SelectorSyncSet(_) => ResourceKind::SelectorSyncSet,
        }
    }

    fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::ClusterDeployment(o) => &o.metadata,
            Self::MachinePool(o) => &o.metadata,
            Self::Secret(o) => &o.metadata,
            Self::ConfigMap(o) => &o.metadata,
            Self::ClusterImageSet(o) => &o.metadata,
            Self::SyncSet(o) => &o.metadata,
            Self::SelectorSyncSet(o) => &o.metadata,
        }
    }

    /// Object name
    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    /// Object namespace; `None` for cluster-scoped kinds
    pub fn namespace(&self) -> Option<&str> {
        self.metadata().namespace.as_deref()
    }

    /// Whether this object carries secret material
    pub fn is_secret(&self) -> bool {
        matches!(self, Self::Secret(_))
    }

    /// Serialize to a JSON value including `apiVersion` and `kind`
    pub fn to_value(&self) -> Result<serde_json::Value> {
        let value = match self {
            Self::ClusterDeployment(o) => serde_json::to_value(o),
            Self::MachinePool(o) => serde_json::to_value(o),
            Self::Secret(o) => serde_json::to_value(o),
            Self::ConfigMap(o) => serde_json::to_value(o),
            Self::ClusterImageSet(o) => serde_json::to_value(o),
            Self::SyncSet(o) => serde_json::to_value(o),
            Self::SelectorSyncSet(o) => serde_json::to_value(o),
        };
        value.map_err(|e| Error::serialization_for_kind(format!("{:?}", self.kind()), e.to_string()))
    }

    /// The contained secret, if this is one
    pub fn as_secret(&self) -> Option<&Secret> {
        match self {
            Self::Secret(s) => Some(s),
            _ => None,
        }
    }
}

/// Metadata for a namespaced object
pub fn namespaced_meta(name: impl Into<String>, namespace: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.into()),
        namespace: Some(namespace.to_string()),
        ..Default::default()
    }
}

/// Secret holding string values
pub fn string_data_secret(
    name: impl Into<String>,
    namespace: &str,
    type_: &str,
    data: impl IntoIterator<Item = (&'static str, String)>,
) -> Secret {
    Secret {
        metadata: namespaced_meta(name, namespace),
        type_: Some(type_.to_string()),
        string_data: Some(
            data.into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<BTreeMap<_, _>>(),
        ),
        ..Default::default()
    }
}

/// Secret holding binary values
pub fn binary_data_secret(
    name: impl Into<String>,
    namespace: &str,
    type_: &str,
    data: impl IntoIterator<Item = (&'static str, Vec<u8>)>,
) -> Secret {
    Secret {
        metadata: namespaced_meta(name, namespace),
        type_: Some(type_.to_string()),
        data: Some(
            data.into_iter()
                .map(|(k, v)| (k.to_string(), ByteString(v)))
                .collect::<BTreeMap<_, _>>(),
        ),
        ..Default::default()
    }
}
