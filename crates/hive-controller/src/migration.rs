//! Config-migration controller
//!
//! Watches HiveConfig and acknowledges the singleton `hive`. Any other
//! HiveConfig is ignored with a warning.

use std::sync::Arc;

use kube::runtime::controller::Action;
use kube::ResourceExt;
use tracing::{error, info, instrument, warn};

use hive_common::crd::HiveConfig;
use hive_common::{Error, HIVE_CONFIG_NAME};

use crate::context::Context;
use crate::requeue_after_error;

/// Reconcile a HiveConfig
#[instrument(skip(config, _ctx), fields(hive_config = %config.name_any()))]
pub async fn reconcile(config: Arc<HiveConfig>, _ctx: Arc<Context>) -> Result<Action, Error> {
    let name = config.name_any();
    if name != HIVE_CONFIG_NAME {
        warn!(
            expected = HIVE_CONFIG_NAME,
            "ignoring HiveConfig, only the singleton is processed"
        );
        return Ok(Action::await_change());
    }

    info!(
        argocd_enabled = config.spec.argocd_enabled(),
        argocd_namespace = config.spec.argocd_namespace().unwrap_or_default(),
        "completed migration"
    );
    Ok(Action::await_change())
}

/// Error policy for the config-migration controller
pub fn error_policy(config: Arc<HiveConfig>, error: &Error, _ctx: Arc<Context>) -> Action {
    error!(
        ?error,
        hive_config = %config.name_any(),
        controller = "migration",
        retryable = error.is_retryable(),
        "reconciliation failed"
    );
    requeue_after_error(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_common::crd::HiveConfigSpec;
    use rstest::rstest;

    use crate::client::MockKubeClient;
    use crate::remote::MockRemoteClusters;

    fn ctx() -> Arc<Context> {
        Arc::new(Context::for_testing(
            Arc::new(MockKubeClient::new()),
            Arc::new(MockRemoteClusters::new()),
        ))
    }

    #[rstest]
    #[case::singleton("hive")]
    #[case::stray("not-hive")]
    #[tokio::test]
    async fn hive_configs_are_acknowledged_without_writes(#[case] name: &str) {
        let config = HiveConfig::new(name, HiveConfigSpec::default());
        let action = reconcile(Arc::new(config), ctx()).await.expect("reconcile");
        assert_eq!(action, Action::await_change());
    }
}
