//! Prometheus metrics recorder.
//!
//! The runner is a batch process, so instead of serving a scrape endpoint it
//! renders the exposition text once the run is over and writes it to the
//! `--metrics-out` file (node-exporter textfile collector format).
//!
//! # Usage
//!
//! ```ignore
//! let handle = install_metrics_recorder()?;
//! // ... run scenarios; metrics::counter!() etc. are recorded ...
//! write_metrics(&handle, Path::new("devops-e2e.prom")).await?;
//! ```

use std::path::Path;

use anyhow::Result;
use devops_e2e_core::metrics as m;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Install the global metrics recorder.
///
/// This function should be called once per process.
///
/// # Errors
///
/// - Invalid histogram bucket configuration
/// - Global recorder is already installed
pub fn install_metrics_recorder() -> Result<PrometheusHandle> {
    tracing::info!("installing Prometheus metrics recorder");

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("_seconds".to_owned()),
            &m::STEP_DURATION_BUCKETS,
        )
        .map_err(|e| anyhow::anyhow!("invalid histogram buckets: {}", e))?
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {}", e))?;

    m::describe_all();
    metrics::gauge!(m::RUNNER_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);

    Ok(handle)
}

/// Render the current metrics and write them to `path`.
pub async fn write_metrics(handle: &PrometheusHandle, path: &Path) -> Result<()> {
    let rendered = handle.render();
    tokio::fs::write(path, rendered)
        .await
        .map_err(|e| anyhow::anyhow!("failed to write metrics to {}: {}", path.display(), e))?;
    tracing::info!(path = %path.display(), "metrics written");
    Ok(())
}
