//! # skyctl
//!
//! Command-line interface for SkyCluster.
//!
//! ## Usage
//!
//! ```bash
//! # Wait for the management cluster components to become ready
//! skyctl wait
//!
//! # Wait for the resources listed in a file
//! skyctl wait --file watchlist.yaml
//!
//! # Interconnect all clusters and propagate their CA secrets
//! skyctl mesh enable
//!
//! # Remove the interconnect
//! skyctl mesh disable
//!
//! # Write a merged kubeconfig for two clusters
//! skyctl kubeconfig --xkube xk-aws,xk-gcp --out ~/.kube/skycluster
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kube::Client;
use skycluster_ctl::client::{
    ClusterIdentity, CredentialProvider, KubeRemoteApplier, KubeReader, KubeconfigProvider,
};
use skycluster_ctl::config::Settings;
use skycluster_ctl::kubeconfig::{merge_kubeconfigs, write_kubeconfig};
use skycluster_ctl::mesh::{delete_mesh, upsert_mesh, LocalCluster};
use skycluster_ctl::progress::{LogSink, PlainSink};
use skycluster_ctl::propagation::{PropagationController, Propagator};
use skycluster_ctl::runtime::{initialize, InitOptions};
use skycluster_ctl::wait::{default_setup_watch_list, resolve_names, ReadinessWaiter, WatchList};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// SkyCluster command-line interface
#[derive(Parser)]
#[command(name = "skyctl")]
#[command(about = "SkyCluster multi-cluster CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Kubeconfig of the management cluster (defaults to the inferred configuration)
    #[arg(long, global = true)]
    kubeconfig: Option<PathBuf>,

    /// Namespace holding SkyCluster secrets
    #[arg(short, long, global = true)]
    namespace: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Wait for resources to become ready
    Wait {
        /// Watch-list file (defaults to the management cluster setup list)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Manage the cluster interconnect
    Mesh {
        #[command(subcommand)]
        command: MeshCommands,
    },
    /// Write a merged kubeconfig for one or more clusters
    Kubeconfig {
        /// XKube names, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        xkube: Vec<String>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum MeshCommands {
    /// Create or update the mesh, then propagate secrets until all clusters are ready
    Enable {
        /// Pod CIDR of the management cluster
        #[arg(long, default_value = skycluster_ctl::constants::DEFAULT_POD_CIDR)]
        pod_cidr: String,

        /// Service CIDR of the management cluster
        #[arg(long, default_value = skycluster_ctl::constants::DEFAULT_SERVICE_CIDR)]
        service_cidr: String,
    },
    /// Propagate secrets until all clusters are ready
    Propagate,
    /// Delete the mesh
    Disable,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let init = initialize(&InitOptions {
        kubeconfig: cli.kubeconfig.clone(),
        namespace: cli.namespace.clone(),
        debug: cli.debug,
    })
    .await?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    match cli.command {
        Commands::Wait { file } => wait_command(init.client, file, cancel).await,
        Commands::Mesh { command } => match command {
            MeshCommands::Enable {
                pod_cidr,
                service_cidr,
            } => {
                let local = LocalCluster {
                    pod_cidr,
                    service_cidr,
                };
                mesh_enable_command(init.client, &init.settings, &local, &cancel).await
            }
            MeshCommands::Propagate => {
                propagate_command(init.client, &init.settings, &cancel).await
            }
            MeshCommands::Disable => {
                if !delete_mesh(&init.client).await? {
                    info!("mesh is not enabled");
                }
                Ok(())
            }
        },
        Commands::Kubeconfig { xkube, out } => {
            kubeconfig_command(init.client, &init.settings, &xkube, out).await
        }
    }
}

/// Resolve generated names, then wait for every resource in order
async fn wait_command(
    client: Client,
    file: Option<PathBuf>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut descriptors = match file {
        Some(path) => WatchList::from_file(&path)?.descriptors()?,
        None => default_setup_watch_list(),
    };

    let reader = Arc::new(KubeReader::new(client));
    resolve_names(reader.as_ref(), &mut descriptors)
        .await
        .context("Failed to resolve resource names")?;

    ReadinessWaiter::new(reader, cancel)
        .wait_all(&descriptors, &PlainSink)
        .await?;
    info!("all {} resources are ready", descriptors.len());
    Ok(())
}

async fn mesh_enable_command(
    client: Client,
    settings: &Settings,
    local: &LocalCluster,
    cancel: &CancellationToken,
) -> Result<()> {
    let reader = KubeReader::new(client.clone());
    if upsert_mesh(&client, &reader, local).await?.is_none() {
        return Ok(());
    }
    propagate_command(client, settings, cancel).await
}

async fn propagate_command(
    client: Client,
    settings: &Settings,
    cancel: &CancellationToken,
) -> Result<()> {
    let summary = propagation_controller(client, settings)
        .run(cancel)
        .await
        .context("Secret propagation failed")?;
    info!("{}/{} clusters ready", summary.ready, summary.total);
    Ok(())
}

fn propagation_controller(client: Client, settings: &Settings) -> PropagationController {
    let reader = Arc::new(KubeReader::new(client));
    let provider = Arc::new(KubeconfigProvider::new(
        Arc::clone(&reader) as _,
        Arc::clone(&reader) as _,
        settings.home_namespace.clone(),
    ));
    let propagator = Arc::new(Propagator::new(
        Arc::clone(&reader) as _,
        provider,
        Arc::new(KubeRemoteApplier),
        settings.home_namespace.clone(),
        settings.remote_apply_timeout(),
    ));
    PropagationController::new(reader, propagator, settings.watch_queue_capacity)
        .with_sink(Arc::new(LogSink))
}

async fn kubeconfig_command(
    client: Client,
    settings: &Settings,
    xkubes: &[String],
    out: Option<PathBuf>,
) -> Result<()> {
    let reader = Arc::new(KubeReader::new(client));
    let provider = KubeconfigProvider::new(
        Arc::clone(&reader) as _,
        reader,
        settings.home_namespace.clone(),
    );

    let mut blobs = Vec::with_capacity(xkubes.len());
    for name in xkubes {
        let identity = ClusterIdentity {
            member: name.clone(),
            cluster_id: name.clone(),
        };
        let credential = provider
            .fetch(&identity)
            .await
            .with_context(|| format!("Failed to fetch kubeconfig for {name}"))?;
        blobs.push(credential.expose().to_string());
    }

    let merged = merge_kubeconfigs(&blobs)?;
    match out {
        Some(path) => {
            write_kubeconfig(&path, &merged)?;
            info!("wrote kubeconfig for {} clusters to {}", xkubes.len(), path.display());
        }
        None => print!("{merged}"),
    }
    Ok(())
}
