//! CLI argument definitions for devops-e2e-runner.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// devops encrypted-storage E2E runner.
///
/// Bootstraps the cluster, storage backend, encryption and VM clients,
/// provisions the storage classes, runs the selected scenarios and tears
/// everything down again.
#[derive(Parser, Debug)]
#[command(name = "devops-e2e-runner")]
#[command(version, about, long_about = None)]
pub struct RunnerCli {
    /// Path to a devops-e2e.toml configuration file.
    ///
    /// When omitted, configuration comes from environment variables only.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration and exit without touching the cluster.
    #[arg(long)]
    pub validate: bool,

    /// List the scenarios matching the label filters and exit.
    #[arg(long)]
    pub list: bool,

    /// Only run scenarios carrying every given label.
    ///
    /// Repeatable, or comma-separated (`--label p1,block`).
    #[arg(short, long = "label", value_delimiter = ',')]
    pub labels: Vec<String>,

    /// Write the JSON scenario reports to this path.
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Write Prometheus exposition text to this path after the run.
    #[arg(long)]
    pub metrics_out: Option<PathBuf>,
}
