//! Controller runner - builds controller futures
//!
//! Each `build_*` function returns a Vec of boxed futures that can be composed
//! by the caller. This keeps controller construction pure and testable.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use kube::runtime::controller::Config as ControllerConfig;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client};

use hive_common::crd::{ClusterDeployment, HiveConfig};
use hive_controller::{migration, register, unreachable, ArgoCdSettings, Context};

/// Watcher timeout (seconds) - must be less than client read_timeout (30s)
/// This forces the API server to close the watch before the client times out,
/// preventing "body read timed out" errors on idle watches.
const WATCH_TIMEOUT_SECS: u32 = 25;

/// Default number of reconciles in flight per controller
pub const DEFAULT_CONCURRENT_RECONCILES: u16 = 5;

/// Quiet period before a burst of watch events triggers a reconcile
const DEBOUNCE: Duration = Duration::from_secs(1);

type ControllerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Settings shared by every controller
#[derive(Clone, Debug)]
pub struct RunnerSettings {
    /// Reconciles in flight per controller
    pub concurrency: u16,
    /// ArgoCD registration defaults, overridable by the HiveConfig
    pub argocd: ArgoCdSettings,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENT_RECONCILES,
            argocd: ArgoCdSettings::default(),
        }
    }
}

impl RunnerSettings {
    fn controller_config(&self) -> ControllerConfig {
        ControllerConfig::default()
            .concurrency(self.concurrency)
            .debounce(DEBOUNCE)
    }
}

/// Build ClusterDeployment controller futures (unreachable probe, ArgoCD register)
///
/// The register controller always runs so that clusters registered earlier
/// are deregistered on deletion; whether it registers is decided per
/// reconcile from the flags and the HiveConfig.
pub fn build_cluster_deployment_controllers(
    client: Client,
    settings: &RunnerSettings,
) -> Vec<ControllerFuture> {
    let ctx = Arc::new(
        Context::builder(client.clone())
            .argocd(settings.argocd.clone())
            .build(),
    );
    let deployments: Api<ClusterDeployment> = Api::all(client);

    tracing::info!("- Unreachable controller");
    let unreachable_controller = Controller::new(
        deployments.clone(),
        WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS),
    )
    .with_config(settings.controller_config())
    .shutdown_on_signal()
    .run(unreachable::reconcile, unreachable::error_policy, ctx.clone())
    .for_each(log_reconcile_result("Unreachable"));

    tracing::info!(
        register = settings.argocd.register,
        namespace = %settings.argocd.namespace,
        "- ArgoCD register controller"
    );
    let register_controller = Controller::new(
        deployments,
        WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS),
    )
    .with_config(settings.controller_config())
    .shutdown_on_signal()
    .run(register::reconcile, register::error_policy, ctx)
    .for_each(log_reconcile_result("ArgoCD register"));

    vec![
        Box::pin(unreachable_controller) as ControllerFuture,
        Box::pin(register_controller) as ControllerFuture,
    ]
}

/// Build the HiveConfig migration controller future
pub fn build_hive_config_controllers(
    client: Client,
    settings: &RunnerSettings,
) -> Vec<ControllerFuture> {
    let ctx = Arc::new(Context::builder(client.clone()).build());
    let configs: Api<HiveConfig> = Api::all(client);

    tracing::info!("- HiveConfig migration controller");

    vec![Box::pin(
        Controller::new(configs, WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS))
            .with_config(settings.controller_config())
            .shutdown_on_signal()
            .run(migration::reconcile, migration::error_policy, ctx)
            .for_each(log_reconcile_result("Migration")),
    )]
}

/// Build every controller the operator runs
pub fn build_all_controllers(client: Client, settings: &RunnerSettings) -> Vec<ControllerFuture> {
    let mut controllers = build_cluster_deployment_controllers(client.clone(), settings);
    controllers.extend(build_hive_config_controllers(client, settings));
    controllers
}

fn log_reconcile_result<T: std::fmt::Debug, E: std::fmt::Debug>(
    controller_name: &'static str,
) -> impl Fn(Result<T, E>) -> std::future::Ready<()> {
    move |result| {
        match result {
            Ok(action) => tracing::debug!(?action, "{} reconciliation completed", controller_name),
            Err(e) => tracing::error!(error = ?e, "{} reconciliation error", controller_name),
        }
        std::future::ready(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_leave_argocd_registration_off() {
        let settings = RunnerSettings::default();
        assert_eq!(settings.concurrency, 5);
        assert_eq!(settings.argocd.namespace, "argocd");
        assert!(!settings.argocd.register);
    }

    #[test]
    fn reconcile_results_are_consumed_without_panicking() {
        let sink = log_reconcile_result::<&str, &str>("Test");
        futures::executor::block_on(sink(Ok("done")));
        futures::executor::block_on(sink(Err("boom")));
    }
}
