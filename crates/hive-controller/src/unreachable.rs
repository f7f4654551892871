//! Unreachable-probe controller
//!
//! Periodically checks that each installed cluster's API server answers and
//! records the result in the `Unreachable` condition. Probes back off while a
//! condition is stable: a cluster is not probed again while the time since
//! the last probe is under a fifth of the time since the last transition,
//! capped at two hours.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use kube::runtime::controller::Action;
use kube::ResourceExt;
use tracing::{debug, error, info, instrument, warn};

use hive_common::crd::{
    find_condition, set_condition, ClusterDeployment, Condition, ConditionStatus,
    UpdateConditionCheck, UNREACHABLE_CONDITION,
};
use hive_common::{Error, KUBECONFIG_SECRET_KEY};

use crate::context::Context;
use crate::requeue_after_error;

/// Longest time an installed cluster goes without a probe
pub const MAX_PROBE_INTERVAL: Duration = Duration::from_secs(2 * 60 * 60);

/// Requeue used when a probe is due again right away
pub const MIN_PROBE_INTERVAL: Duration = Duration::from_secs(30);

/// Reason recorded when the API server cannot be reached
pub const UNREACHABLE_REASON: &str = "ErrorConnectingToCluster";

/// Reason recorded when a previously unreachable cluster answers again
pub const REACHABLE_REASON: &str = "ClusterReachable";

/// Time until the next probe is due, or `None` if it is due now
///
/// A cluster with no `Unreachable` condition is always due.
pub fn next_probe_delay(condition: Option<&Condition>, now: DateTime<Utc>) -> Option<Duration> {
    let condition = condition?;
    // Timestamps in the future count as zero elapsed
    let since_probe = (now - condition.last_probe_time)
        .to_std()
        .unwrap_or_default();
    let since_transition = (now - condition.last_transition_time)
        .to_std()
        .unwrap_or_default();

    if since_probe >= since_transition / 5 || since_probe >= MAX_PROBE_INTERVAL {
        return None;
    }

    // Solve since_probe + d == (since_transition + d) / 5 for d
    let until_backoff_expires = since_transition.saturating_sub(since_probe * 5) / 4;
    let until_cap = MAX_PROBE_INTERVAL - since_probe;
    Some(until_backoff_expires.min(until_cap))
}

/// Reconcile a ClusterDeployment's reachability
#[instrument(
    skip(cd, ctx),
    fields(cluster_deployment = %cd.name_any(), namespace = %cd.namespace().unwrap_or_default())
)]
pub async fn reconcile(cd: Arc<ClusterDeployment>, ctx: Arc<Context>) -> Result<Action, Error> {
    let name = cd.name_any();
    let namespace = cd.namespace().unwrap_or_default();

    if !cd.spec.installed {
        debug!("cluster not installed, skipping");
        return Ok(Action::await_change());
    }
    if cd.is_deleting() {
        debug!("cluster is being deleted, skipping");
        return Ok(Action::await_change());
    }
    let Some(metadata) = cd.spec.cluster_metadata.as_ref() else {
        error!("installed cluster has no metadata");
        return Ok(Action::await_change());
    };

    let now = Utc::now();
    if let Some(delay) =
        next_probe_delay(find_condition(cd.conditions(), UNREACHABLE_CONDITION), now)
    {
        debug!(?delay, "probe backing off");
        return Ok(Action::requeue(delay));
    }

    let resource_version = cd.resource_version().ok_or_else(|| {
        Error::internal_with_context("unreachable", "cluster deployment has no resourceVersion")
    })?;

    let kubeconfig = ctx
        .kube
        .get_secret_data(
            &metadata.admin_kubeconfig_secret_ref.name,
            &namespace,
            KUBECONFIG_SECRET_KEY,
        )
        .await?;

    let mut conditions = cd.conditions().to_vec();
    let changed = match ctx.remote.probe(&name, &kubeconfig).await {
        Ok(()) => {
            debug!("cluster is reachable");
            set_condition(
                &mut conditions,
                UNREACHABLE_CONDITION,
                ConditionStatus::False,
                REACHABLE_REASON,
                "cluster is reachable",
                UpdateConditionCheck::Always,
                now,
            )
        }
        Err(e) => {
            warn!(error = %e, "cluster is unreachable");
            set_condition(
                &mut conditions,
                UNREACHABLE_CONDITION,
                ConditionStatus::True,
                UNREACHABLE_REASON,
                &e.to_string(),
                UpdateConditionCheck::Always,
                now,
            )
        }
    };

    if changed {
        ctx.kube
            .patch_cluster_deployment_conditions(&name, &namespace, &resource_version, &conditions)
            .await?;
        info!("updated unreachable condition");
    }

    let condition = find_condition(&conditions, UNREACHABLE_CONDITION);
    let requeue = match next_probe_delay(condition, now) {
        Some(delay) => delay,
        None if condition.is_some() => MIN_PROBE_INTERVAL,
        None => MAX_PROBE_INTERVAL,
    };
    Ok(Action::requeue(requeue))
}

/// Error policy for the unreachable-probe controller
pub fn error_policy(cd: Arc<ClusterDeployment>, error: &Error, _ctx: Arc<Context>) -> Action {
    error!(
        ?error,
        cluster_deployment = %cd.name_any(),
        controller = "unreachable",
        retryable = error.is_retryable(),
        conflict = error.is_conflict(),
        "reconciliation failed"
    );
    requeue_after_error(error)
}
