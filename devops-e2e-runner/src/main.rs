use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use devops_e2e_core::config::HarnessConfig;
use devops_e2e_runner::cli::RunnerCli;
use devops_e2e_runner::live::LiveConnector;
use devops_e2e_runner::{Harness, catalog, logging, metrics_export, report};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = RunnerCli::parse();

    // 설정 로드: 파일 → 환경변수 → CLI
    let mut config = match &cli.config {
        Some(path) => HarnessConfig::from_file(path).await?,
        None => HarnessConfig::default(),
    };
    config.apply_env_overrides()?;

    // --log-level > RUST_LOG > 설정 파일/환경변수
    logging::init_tracing(
        &config.general,
        logging::LogOverrides {
            level: cli.log_level.as_deref(),
            format: cli.log_format.as_deref(),
        },
    )?;

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, kind = e.kind().as_str(), "configuration invalid");
        return Err(e.into());
    }

    if cli.validate {
        tracing::info!(
            flavor = %config.cluster.flavor,
            namespace = %config.scenario_namespace(),
            "configuration is valid"
        );
        return Ok(ExitCode::SUCCESS);
    }

    let selected = catalog::select(&cli.labels);
    if cli.list {
        for spec in &selected {
            println!("{}\t{}\t{}", spec.id, spec.labels.join(","), spec.title);
        }
        return Ok(ExitCode::SUCCESS);
    }
    if selected.is_empty() {
        tracing::info!(labels = ?cli.labels, "no scenario selected");
        return Ok(ExitCode::SUCCESS);
    }

    let metrics = metrics_export::install_metrics_recorder()?;

    // Ctrl-C는 setup/scenario만 취소하고 cleanup/teardown은 계속 진행
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; cancelling run, cleanup and teardown continue");
            signal_token.cancel();
        }
    });

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        scenarios = selected.len(),
        "devops-e2e-runner starting"
    );

    let harness = Harness::new(LiveConnector, config).with_cancellation(cancel);
    let mut reports = Vec::with_capacity(selected.len());
    for spec in selected {
        reports.push(harness.run(spec).await);
    }

    if let Some(path) = &cli.report {
        report::write_reports(&reports, path).await?;
    }
    if let Some(path) = &cli.metrics_out {
        metrics_export::write_metrics(&metrics, path).await?;
    }

    let failed = reports.iter().filter(|r| r.failed()).count();
    tracing::info!(
        total = reports.len(),
        failed,
        "devops-e2e-runner finished"
    );

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
