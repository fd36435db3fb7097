//! # Initialization
//!
//! CLI initialization logic: rustls setup, tracing, settings and Kubernetes client
//! creation.

use crate::config::Settings;
use anyhow::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Options taken from the global command-line flags
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Explicit kubeconfig for the management cluster; inferred when absent
    pub kubeconfig: Option<PathBuf>,
    /// Home namespace override
    pub namespace: Option<String>,
    /// Enable debug logging for this crate
    pub debug: bool,
}

/// Initialization result containing all necessary components for a command
pub struct InitializationResult {
    /// Kubernetes client for the management cluster
    pub client: Client,
    pub settings: Settings,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Initialize the CLI runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Settings from environment and flags
/// - Kubernetes client creation
pub async fn initialize(options: &InitOptions) -> Result<InitializationResult> {
    // Must run before any TLS connection is made
    install_crypto_provider();
    init_tracing(options.debug);

    let settings = Settings::from_env().with_home_namespace(options.namespace.clone());
    debug!(?settings, "loaded settings");

    let client = create_client(options.kubeconfig.as_deref()).await?;
    info!("connected to management cluster (namespace {})", settings.home_namespace);

    Ok(InitializationResult { client, settings })
}

/// Install ring as the rustls crypto provider
///
/// A provider installed earlier in the process is kept.
pub fn install_crypto_provider() {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }
}

/// Default `EnvFilter` directive for the given debug flag
pub fn default_filter(debug: bool) -> &'static str {
    if debug {
        "skycluster_ctl=debug"
    } else {
        "skycluster_ctl=info"
    }
}

/// Set up the tracing subscriber; `RUST_LOG` overrides the default filter
pub fn init_tracing(debug: bool) {
    let result = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(debug).into()),
        )
        .try_init();
    if let Err(e) = result {
        // Already initialized, e.g. by a test harness
        eprintln!("tracing subscriber not installed: {e}");
    }
}

/// Create a client from `kubeconfig`, or from the inferred configuration
pub async fn create_client(kubeconfig: Option<&Path>) -> Result<Client> {
    let Some(path) = kubeconfig else {
        return Client::try_default()
            .await
            .context("Failed to create Kubernetes client from inferred configuration");
    };

    let kubeconfig = Kubeconfig::read_from(path)
        .with_context(|| format!("Failed to read kubeconfig {}", path.display()))?;
    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .with_context(|| format!("Invalid kubeconfig {}", path.display()))?;
    Client::try_from(config).context("Failed to create Kubernetes client")
}
