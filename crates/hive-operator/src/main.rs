//! Hive - OpenShift cluster provisioning control plane

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use kube::api::{Api, Patch, PatchParams};
use kube::Client;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hive_common::crd::all_crds;
use hive_common::kube_utils::create_client;
use hive_common::FIELD_MANAGER;
use hive_controller::ArgoCdSettings;
use hive_operator::controller_runner::{self, RunnerSettings, DEFAULT_CONCURRENT_RECONCILES};
use hive_operator::create_cluster::{self, CreateClusterArgs};

/// Hive - CRD-driven provisioning and adoption of OpenShift clusters
#[derive(Parser, Debug)]
#[command(name = "hive", version, about, long_about = None)]
struct Cli {
    /// Generate CRD manifests and exit
    #[arg(long)]
    crd: bool,

    /// Path to the management cluster kubeconfig
    #[arg(long, global = true)]
    kubeconfig: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as controller (default mode)
    ///
    /// Watches ClusterDeployments and HiveConfig:
    /// - probes installed clusters and records reachability
    /// - registers installed clusters with ArgoCD when enabled
    /// - acknowledges the singleton HiveConfig
    Controller(ControllerArgs),

    /// Generate the objects for a new or adopted cluster and apply or print them
    CreateCluster(CreateClusterArgs),
}

#[derive(Args, Debug)]
struct ControllerArgs {
    /// Reconciles in flight per controller
    #[arg(long, env = "HIVE_CONCURRENT_RECONCILES", default_value_t = DEFAULT_CONCURRENT_RECONCILES)]
    concurrent_reconciles: u16,

    /// Namespace ArgoCD cluster secrets are written to
    #[arg(long, env = "HIVE_ARGOCD_NAMESPACE", default_value = hive_controller::DEFAULT_ARGOCD_NAMESPACE)]
    argocd_namespace: String,

    /// Register installed clusters with ArgoCD
    ///
    /// The HiveConfig `argoCDConfig.enabled` switch also turns this on.
    #[arg(long, env = "HIVE_ARGOCD_REGISTER")]
    argocd_register: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!("CRITICAL: Failed to install crypto provider: {:?}", e);
        std::process::exit(1);
    }

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.crd {
        print!("{}", render_crds()?);
        return Ok(());
    }

    match cli.command {
        Some(Commands::CreateCluster(args)) => {
            create_cluster::run(args, cli.kubeconfig.as_deref()).await
        }
        Some(Commands::Controller(args)) => run_controller(args, cli.kubeconfig).await,
        None => run_controller(ControllerArgs::default_from_env(), cli.kubeconfig).await,
    }
}

impl ControllerArgs {
    /// Controller settings when no subcommand was given
    fn default_from_env() -> Self {
        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: ControllerArgs,
        }
        Wrapper::parse_from(["hive"]).args
    }
}

/// All CRDs as one multi-document YAML stream
fn render_crds() -> anyhow::Result<String> {
    let mut out = String::new();
    for crd in all_crds() {
        let value = serde_json::to_value(&crd)
            .map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
        let yaml = serde_yaml::to_string(&value)
            .map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
        out.push_str("---\n");
        out.push_str(&yaml);
    }
    Ok(out)
}

/// Ensure all Hive CRDs are installed
///
/// The operator installs its own CRDs on startup using server-side apply.
/// This ensures the CRD versions always match the operator version.
async fn ensure_crds_installed(client: &Client) -> anyhow::Result<()> {
    use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;

    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(FIELD_MANAGER).force();

    for crd in all_crds() {
        let name = crd.metadata.name.clone().unwrap_or_default();
        tracing::info!(crd = %name, "Installing CRD...");
        crds.patch(&name, &params, &Patch::Apply(&crd))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to install CRD {}: {}", name, e))?;
    }

    tracing::info!("All Hive CRDs installed/updated");
    Ok(())
}

/// Run in controller mode
async fn run_controller(args: ControllerArgs, kubeconfig: Option<PathBuf>) -> anyhow::Result<()> {
    tracing::info!("Hive controller starting...");

    let client = create_client(kubeconfig.as_deref()).await?;

    ensure_crds_installed(&client).await?;

    let settings = RunnerSettings {
        concurrency: args.concurrent_reconciles,
        argocd: ArgoCdSettings::new(args.argocd_register, args.argocd_namespace),
    };

    tracing::info!(concurrency = settings.concurrency, "Starting Hive controllers...");
    let controllers = controller_runner::build_all_controllers(client, &settings);
    futures::future::join_all(controllers).await;

    tracing::info!("Hive controller shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller_args(argv: &[&str]) -> ControllerArgs {
        match Cli::try_parse_from(argv).expect("valid flags").command {
            Some(Commands::Controller(args)) => args,
            other => panic!("expected controller command, got {:?}", other),
        }
    }

    #[test]
    fn argocd_registration_is_opt_in() {
        let args = controller_args(&["hive", "controller"]);
        assert!(!args.argocd_register);
        assert_eq!(args.argocd_namespace, "argocd");

        let args = controller_args(&[
            "hive",
            "controller",
            "--argocd-register",
            "--argocd-namespace",
            "openshift-gitops",
        ]);
        assert!(args.argocd_register);
        assert_eq!(args.argocd_namespace, "openshift-gitops");
    }
}
