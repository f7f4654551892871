//! Error types for the Hive control plane
//!
//! Errors are structured with fields to aid debugging in production.
//! Variants carry the cluster or object they concern where one is known.

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for Hive operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// Invalid input or object configuration
    #[error("validation error for {cluster}: {message}")]
    Validation {
        /// Name of the cluster with invalid configuration
        cluster: String,
        /// Description of what's invalid
        message: String,
        /// The invalid field or flag (e.g., "spec.clusterMetadata")
        field: Option<String>,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },

    /// A client for a remote cluster could not be built from its kubeconfig
    #[error("client construction error for {cluster}: {message}")]
    ClientConstruction {
        /// Name of the remote cluster
        cluster: String,
        /// Description of what failed
        message: String,
    },

    /// A secret is missing or lacks the expected key
    #[error("secret error for {namespace}/{name}: {message}")]
    Secret {
        /// Namespace of the secret
        namespace: String,
        /// Name of the secret
        name: String,
        /// Description of what failed
        message: String,
    },

    /// A call against a remote cluster failed
    #[error("remote cluster error for {cluster}: {message}")]
    Remote {
        /// Name of the remote cluster
        cluster: String,
        /// Description of what failed
        message: String,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "reconciler", "poll_until")
        context: String,
    },
}

impl Error {
    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            cluster: UNKNOWN_CONTEXT.to_string(),
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error with cluster context
    pub fn validation_for(cluster: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            cluster: cluster.into(),
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error naming the offending field or flag
    pub fn validation_for_field(
        cluster: impl Into<String>,
        field: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Validation {
            cluster: cluster.into(),
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Create a client construction error for a remote cluster
    pub fn client_construction(cluster: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ClientConstruction {
            cluster: cluster.into(),
            message: msg.into(),
        }
    }

    /// Create a secret error
    pub fn secret(
        namespace: impl Into<String>,
        name: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Secret {
            namespace: namespace.into(),
            name: name.into(),
            message: msg.into(),
        }
    }

    /// Create a remote cluster error
    pub fn remote(cluster: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Remote {
            cluster: cluster.into(),
            message: msg.into(),
        }
    }

    /// Create an internal error with the given message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: UNKNOWN_CONTEXT.to_string(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Check if this error is retryable
    ///
    /// Validation and serialization errors need a configuration fix.
    /// Kubernetes errors depend on the status code: 4xx means the request
    /// itself is wrong, except a conflict or throttling which clears once the
    /// object is read again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { source } => match source {
                kube::Error::Api(ae) => {
                    !(400..500).contains(&ae.code) || ae.code == 409 || ae.code == 429
                }
                _ => true,
            },
            Error::Validation { .. } => false,
            Error::Serialization { .. } => false,
            Error::ClientConstruction { .. } => true,
            Error::Secret { .. } => true,
            Error::Remote { .. } => true,
            Error::Internal { .. } => true,
        }
    }

    /// Returns true when a write lost an optimistic concurrency race (409)
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Kube { source: kube::Error::Api(ae) } if ae.code == 409)
    }
}
