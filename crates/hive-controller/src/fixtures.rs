//! ClusterDeployment fixtures shared by controller tests

use std::collections::BTreeMap;

use hive_common::crd::{
    ClusterDeployment, ClusterDeploymentSpec, ClusterDeploymentStatus, ClusterMetadata,
    Condition, LocalObjectReference,
};

pub const ADMIN_KUBECONFIG_SECRET: &str = "bar-admin-kubeconfig";
pub const KUBECONFIG: &[u8] = b"apiVersion: v1\nkind: Config\n";
pub const RESOURCE_VERSION: &str = "41";

/// An installed cluster `bar` in namespace `hive` with metadata and an API URL
pub fn installed_cluster() -> ClusterDeployment {
    let mut cd = ClusterDeployment::new(
        "bar",
        ClusterDeploymentSpec {
            cluster_name: "bar".to_string(),
            base_domain: "example.com".to_string(),
            installed: true,
            cluster_metadata: Some(ClusterMetadata {
                cluster_id: "5f1d-uuid".to_string(),
                infra_id: "bar-x7f2k".to_string(),
                admin_kubeconfig_secret_ref: LocalObjectReference::new(ADMIN_KUBECONFIG_SECRET),
                admin_password_secret_ref: None,
            }),
            ..Default::default()
        },
    );
    cd.metadata.namespace = Some("hive".to_string());
    cd.metadata.resource_version = Some(RESOURCE_VERSION.to_string());
    cd.metadata.labels = Some(BTreeMap::from([("team".to_string(), "infra".to_string())]));
    cd.status = Some(ClusterDeploymentStatus {
        api_url: Some("https://API.Bar.Example.com:6443".to_string()),
        ..Default::default()
    });
    cd
}

pub fn with_conditions(mut cd: ClusterDeployment, conditions: Vec<Condition>) -> ClusterDeployment {
    cd.status.get_or_insert_with(Default::default).conditions = conditions;
    cd
}
