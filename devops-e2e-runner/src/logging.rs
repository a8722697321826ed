//! Tracing setup for the runner.
//!
//! The effective filter is picked in this order: `--log-level`, then
//! `RUST_LOG`, then `[general].log_level`. The output format comes from
//! `--log-format` or `[general].log_format`.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use devops_e2e_core::config::GeneralConfig;

/// Output format of the subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON lines, for CI.
    Json,
    /// Human-readable, for local runs.
    Pretty,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => anyhow::bail!("unknown log format '{other}', expected 'json' or 'pretty'"),
        }
    }
}

/// Where the filter directive came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSource {
    Cli,
    RustLog,
    Config,
}

impl fmt::Display for FilterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cli => "--log-level",
            Self::RustLog => "RUST_LOG",
            Self::Config => "general.log_level",
        })
    }
}

/// Command-line logging flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOverrides<'a> {
    pub level: Option<&'a str>,
    pub format: Option<&'a str>,
}

/// The resolved subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub directive: String,
    pub source: FilterSource,
    pub format: LogFormat,
}

impl LogSettings {
    /// Applies the precedence rules. `rust_log` is the raw `RUST_LOG` value.
    pub fn resolve(
        config: &GeneralConfig,
        overrides: LogOverrides<'_>,
        rust_log: Option<&str>,
    ) -> Result<Self> {
        let rust_log = rust_log.map(str::trim).filter(|v| !v.is_empty());
        let (directive, source) = match (overrides.level, rust_log) {
            (Some(level), _) => (level.to_owned(), FilterSource::Cli),
            (None, Some(env)) => (env.to_owned(), FilterSource::RustLog),
            (None, None) => (config.log_level.clone(), FilterSource::Config),
        };
        let format = overrides
            .format
            .unwrap_or(config.log_format.as_str())
            .parse()?;
        Ok(Self {
            directive,
            source,
            format,
        })
    }

    fn filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_new(&self.directive)
            .with_context(|| format!("invalid log filter '{}' from {}", self.directive, self.source))
    }
}

/// Installs the global subscriber. Call once, before any event is emitted.
pub fn init_tracing(config: &GeneralConfig, overrides: LogOverrides<'_>) -> Result<LogSettings> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let settings = LogSettings::resolve(config, overrides, rust_log.as_deref())?;

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match settings.format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().pretty().boxed(),
    };
    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(settings.filter()?)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {e}"))?;

    tracing::debug!(
        filter = %settings.directive,
        source = %settings.source,
        format = ?settings.format,
        "tracing initialized"
    );
    Ok(settings)
}
