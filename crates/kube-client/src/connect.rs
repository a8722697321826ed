//! Building `kube::Client` instances for a [`ClusterTarget`].
//!
//! A target with an explicit kubeconfig path reads exactly that file (the devops
//! identity and the supervisor cluster). A target without one falls back to
//! `Config::infer()` (`KUBECONFIG`, `~/.kube/config`, then in-cluster).

use devops_e2e_core::error::ClusterError;
use devops_e2e_core::types::ClusterTarget;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::debug;

/// Creates a client for the given target's credentials.
///
/// # Errors
///
/// Returns `ClusterError::Connection` when the kubeconfig cannot be read or parsed,
/// or the client cannot be constructed from it.
pub async fn client_for(target: &ClusterTarget) -> Result<Client, ClusterError> {
    let config = match &target.kubeconfig {
        Some(path) => {
            debug!(identity = %target.identity, kubeconfig = %path.display(), "loading kubeconfig");
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                ClusterError::Connection(format!(
                    "failed to read kubeconfig {}: {e}",
                    path.display()
                ))
            })?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| {
                    ClusterError::Connection(format!(
                        "invalid kubeconfig {}: {e}",
                        path.display()
                    ))
                })?
        }
        None => {
            debug!(identity = %target.identity, "inferring cluster config");
            Config::infer().await.map_err(|e| {
                ClusterError::Connection(format!("failed to infer cluster config: {e}"))
            })?
        }
    };

    Client::try_from(config)
        .map_err(|e| ClusterError::Connection(format!("failed to build client: {e}")))
}
