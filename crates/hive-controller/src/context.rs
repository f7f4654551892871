//! Shared controller context
//!
//! Use [`ContextBuilder`] to construct instances:
//!
//! ```text
//! let ctx = Context::builder(client)
//!     .argocd(ArgoCdSettings::new(true, "openshift-gitops"))
//!     .build();
//! ```

use std::sync::Arc;

use kube::Client;

use hive_common::crd::HiveConfig;

use crate::client::{KubeClient, KubeClientImpl};
use crate::remote::{RemoteClusterClient, RemoteClusters};

/// Namespace ArgoCD cluster secrets are written to unless configured
pub const DEFAULT_ARGOCD_NAMESPACE: &str = "argocd";

/// ArgoCD registration settings in effect for a reconcile
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgoCdSettings {
    /// Register installed clusters
    pub register: bool,
    /// Namespace cluster secrets are written to
    pub namespace: String,
}

impl ArgoCdSettings {
    /// Settings from command line flags
    pub fn new(register: bool, namespace: impl Into<String>) -> Self {
        Self {
            register,
            namespace: namespace.into(),
        }
    }

    /// Overlay the singleton HiveConfig on these settings
    ///
    /// Registration is on when either side enables it. A namespace set in the
    /// HiveConfig replaces the flag value.
    pub fn with_hive_config(&self, config: Option<&HiveConfig>) -> Self {
        let Some(config) = config else {
            return self.clone();
        };
        Self {
            register: self.register || config.spec.argocd_enabled(),
            namespace: config
                .spec
                .argocd_namespace()
                .unwrap_or(&self.namespace)
                .to_string(),
        }
    }
}

impl Default for ArgoCdSettings {
    fn default() -> Self {
        Self::new(false, DEFAULT_ARGOCD_NAMESPACE)
    }
}

/// Context shared by every reconcile call
pub struct Context {
    /// Management cluster client (trait object for testability)
    pub kube: Arc<dyn KubeClient>,
    /// Access to managed clusters
    pub remote: Arc<dyn RemoteClusters>,
    /// ArgoCD settings from the command line
    pub argocd: ArgoCdSettings,
}

impl Context {
    /// Create a builder for constructing a Context
    pub fn builder(client: Client) -> ContextBuilder {
        ContextBuilder::new(client)
    }

    /// Create a context for testing with mock clients
    #[cfg(test)]
    pub fn for_testing(kube: Arc<dyn KubeClient>, remote: Arc<dyn RemoteClusters>) -> Self {
        Self {
            kube,
            remote,
            argocd: ArgoCdSettings::new(true, DEFAULT_ARGOCD_NAMESPACE),
        }
    }
}

/// Builder for constructing [`Context`] instances
pub struct ContextBuilder {
    client: Client,
    argocd: ArgoCdSettings,
}

impl ContextBuilder {
    fn new(client: Client) -> Self {
        Self {
            client,
            argocd: ArgoCdSettings::default(),
        }
    }

    /// Set the ArgoCD registration defaults
    pub fn argocd(mut self, argocd: ArgoCdSettings) -> Self {
        self.argocd = argocd;
        self
    }

    /// Build the Context
    pub fn build(self) -> Context {
        Context {
            kube: Arc::new(KubeClientImpl::new(self.client)),
            remote: Arc::new(RemoteClusterClient::new()),
            argocd: self.argocd,
        }
    }
}
