//! HiveConfig CRD, the cluster-wide operator configuration
//!
//! Only the object named `hive` is honoured.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Global configuration of the Hive operator
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "hive.openshift.io",
    version = "v1",
    kind = "HiveConfig",
    plural = "hiveconfigs"
)]
#[serde(rename_all = "camelCase")]
pub struct HiveConfigSpec {
    /// ArgoCD cluster registration settings
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "argoCDConfig")]
    pub argo_cd: Option<ArgoCdConfig>,
}

/// ArgoCD cluster registration settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCdConfig {
    /// Register installed clusters with ArgoCD
    #[serde(default)]
    pub enabled: bool,
    /// Namespace ArgoCD is deployed in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl HiveConfigSpec {
    /// Whether ArgoCD registration is switched on
    pub fn argocd_enabled(&self) -> bool {
        self.argo_cd.as_ref().is_some_and(|a| a.enabled)
    }

    /// ArgoCD namespace override, if one is set
    pub fn argocd_namespace(&self) -> Option<&str> {
        self.argo_cd
            .as_ref()
            .and_then(|a| a.namespace.as_deref())
            .filter(|ns| !ns.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argocd_settings_read_from_camel_case_json() {
        let spec: HiveConfigSpec = serde_json::from_value(serde_json::json!({
            "argoCDConfig": { "enabled": true, "namespace": "openshift-gitops" }
        }))
        .expect("valid spec");
        assert!(spec.argocd_enabled());
        assert_eq!(spec.argocd_namespace(), Some("openshift-gitops"));
    }

    #[test]
    fn empty_config_disables_argocd_without_override() {
        let spec = HiveConfigSpec::default();
        assert!(!spec.argocd_enabled());
        assert_eq!(spec.argocd_namespace(), None);

        let blank = HiveConfigSpec {
            argo_cd: Some(ArgoCdConfig {
                enabled: false,
                namespace: Some(String::new()),
            }),
        };
        assert_eq!(blank.argocd_namespace(), None);
    }
}
