//! Common types for Hive: CRDs, errors, and utilities

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod kube_utils;
pub mod registry;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// API group of every Hive CRD
pub const HIVE_API_GROUP: &str = "hive.openshift.io";

/// API version of every Hive CRD
pub const HIVE_API_VERSION: &str = "hive.openshift.io/v1";

/// Field manager used for server-side apply and status patches
pub const FIELD_MANAGER: &str = "hive-controller";

/// Name of the only HiveConfig the operator honours
pub const HIVE_CONFIG_NAME: &str = "hive";

/// Annotation holding the duration after which a cluster is deleted
pub const DELETE_AFTER_ANNOTATION: &str = "hive.openshift.io/delete-after";

/// Annotation requesting a single install attempt
pub const TRY_INSTALL_ONCE_ANNOTATION: &str = "hive.openshift.io/try-install-once";

/// Annotation requesting a single uninstall attempt
pub const TRY_UNINSTALL_ONCE_ANNOTATION: &str = "hive.openshift.io/try-uninstall-once";

/// Label stamped on objects produced by the `create-cluster` command
pub const HIVEUTIL_CREATED_LABEL: &str = "hive.openshift.io/hiveutil-created";

/// Key of the admin kubeconfig inside its secret
pub const KUBECONFIG_SECRET_KEY: &str = "kubeconfig";

/// Key of the unmodified admin kubeconfig inside its secret
pub const RAW_KUBECONFIG_SECRET_KEY: &str = "raw-kubeconfig";
