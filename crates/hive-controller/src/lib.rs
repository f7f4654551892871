//! Reconcile controllers for the Hive control plane
//!
//! - [`unreachable`] probes installed clusters and maintains the
//!   `Unreachable` condition
//! - [`register`] registers installed clusters with ArgoCD
//! - [`migration`] acknowledges the singleton HiveConfig
//!
//! Controllers share a [`Context`] holding trait-object clients so that
//! reconcile logic can be tested against mocks.

#![deny(missing_docs)]

pub mod client;
pub mod context;
pub mod migration;
pub mod register;
pub mod remote;
pub mod unreachable;

pub use client::{KubeClient, KubeClientImpl};
pub use context::{ArgoCdSettings, Context, ContextBuilder, DEFAULT_ARGOCD_NAMESPACE};
pub use remote::{build_remote_client, RemoteClusterClient, RemoteClusters, RemoteKubeconfig};

#[cfg(test)]
pub(crate) mod fixtures;

use std::time::Duration;

use kube::runtime::controller::Action;

use hive_common::Error;

/// Requeue delay after a transient failure such as a write conflict
pub const RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Requeue delay after a failure that needs an outside fix
pub const FAILURE_BACKOFF: Duration = Duration::from_secs(300);

/// Requeue action for a failed reconcile
///
/// Transient errors retry soon. Anything else waits for a change to the
/// object or the long backoff, whichever comes first.
pub fn requeue_after_error(error: &Error) -> Action {
    if error.is_retryable() {
        Action::requeue(RETRY_INTERVAL)
    } else {
        Action::requeue(FAILURE_BACKOFF)
    }
}
