//! Kubernetes client module
//!
//! Handles connection to the Kubernetes API server and provides the
//! kube-rs backed collaborators the session runs on: the Helm release
//! fetcher, the one-shot resource fetcher and the live watch transport.

pub mod fetch;
pub mod release;
pub mod transport;

pub use fetch::{KubeResourceFetcher, ResourceFetcher, api_resource_for};
pub use release::{HelmReleaseFetcher, ReleaseFetcher, decode_release};
pub use transport::{KubeWatchTransport, WatchSettings, watch_endpoint};

use anyhow::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};

/// A connected client plus what we know about where it points
#[derive(Clone)]
pub struct ClusterConnection {
    pub client: Client,
    /// API server base URL
    pub cluster_url: String,
    /// Kubeconfig context name
    pub context: String,
}

/// Initialize a Kubernetes client
///
/// Without a context name the default loading strategy is used:
/// 1. In-cluster config (if running in a pod)
/// 2. KUBECONFIG environment variable
/// 3. ~/.kube/config
pub async fn connect(context: Option<&str>) -> Result<ClusterConnection> {
    let config = match context {
        Some(name) => {
            let options = KubeConfigOptions {
                context: Some(name.to_string()),
                ..Default::default()
            };
            Config::from_kubeconfig(&options)
                .await
                .with_context(|| format!("Failed to load kubeconfig context '{}'", name))?
        }
        None => Config::infer()
            .await
            .context("Failed to infer Kubernetes configuration")?,
    };

    let cluster_url = config.cluster_url.to_string();
    let context = match context {
        Some(name) => name.to_string(),
        None => current_context().unwrap_or_else(|| "default".to_string()),
    };

    tracing::debug!("Connecting to {} (context {})", cluster_url, context);

    let client = Client::try_from(config).context("Failed to create Kubernetes client")?;

    Ok(ClusterConnection {
        client,
        cluster_url,
        context,
    })
}

/// Current context from the kubeconfig, if one can be read
pub fn current_context() -> Option<String> {
    Kubeconfig::read().ok()?.current_context
}

/// Split an `apiVersion` into group and version (`v1` has an empty group)
pub fn split_api_version(api_version: &str) -> (&str, &str) {
    match api_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", api_version),
    }
}
