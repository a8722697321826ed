//! Scenario reports.
//!
//! One [`ScenarioReport`] per scenario run, serialized as JSON for the
//! `--report` file and summarized in the logs.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use devops_e2e_core::error::{FailureKind, HarnessError};
use devops_e2e_core::metrics as m;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::catalog::ScenarioSpec;
use crate::scenario::ScenarioState;
use crate::scope::Phase;

/// Scenario outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    Passed,
    Failed,
    /// No failure, but a step was skipped (no devops identity).
    SkippedStep,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::SkippedStep => "skipped-step",
        }
    }
}

/// A recorded failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub kind: FailureKind,
    pub phase: Phase,
    pub message: String,
}

/// A step the scenario skipped on purpose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedStep {
    pub step: String,
    pub reason: String,
}

/// Wall time of one phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseTiming {
    pub phase: Phase,
    pub millis: u64,
}

/// Report of one scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub id: String,
    pub title: String,
    pub labels: Vec<String>,
    pub outcome: Outcome,
    pub final_state: ScenarioState,
    /// Resolved VM image identifier, when setup got that far.
    pub vm_image: Option<String>,
    /// Objects the run created, in creation order.
    pub created: Vec<String>,
    pub skipped_steps: Vec<SkippedStep>,
    pub failures: Vec<FailureRecord>,
    pub phases: Vec<PhaseTiming>,
}

impl ScenarioReport {
    pub fn new(spec: &ScenarioSpec) -> Self {
        Self {
            id: spec.id.to_owned(),
            title: spec.title.to_owned(),
            labels: spec.labels.iter().map(|l| (*l).to_owned()).collect(),
            outcome: Outcome::Passed,
            final_state: ScenarioState::Started,
            vm_image: None,
            created: Vec::new(),
            skipped_steps: Vec::new(),
            failures: Vec::new(),
            phases: Vec::new(),
        }
    }

    /// Records a failure and its metric.
    pub fn record_failure(&mut self, phase: Phase, err: &HarnessError) {
        let kind = err.kind();
        metrics::counter!(m::HARNESS_FAILURES_TOTAL, m::LABEL_KIND => kind.as_str()).increment(1);
        self.failures.push(FailureRecord {
            kind,
            phase,
            message: err.to_string(),
        });
    }

    pub fn record_phase(&mut self, phase: Phase, elapsed: Duration) {
        self.phases.push(PhaseTiming {
            phase,
            millis: elapsed.as_millis() as u64,
        });
    }

    /// Derives the outcome from failures and skips.
    pub fn finish(&mut self) {
        self.outcome = if !self.failures.is_empty() {
            Outcome::Failed
        } else if !self.skipped_steps.is_empty() {
            Outcome::SkippedStep
        } else {
            Outcome::Passed
        };
        metrics::counter!(m::RUNNER_SCENARIOS_TOTAL, m::LABEL_RESULT => self.outcome.as_str())
            .increment(1);
    }

    pub fn failed(&self) -> bool {
        self.outcome == Outcome::Failed
    }

    /// Logs a one-line summary plus one line per failure or skip.
    pub fn log_summary(&self) {
        let total_ms: u64 = self.phases.iter().map(|p| p.millis).sum();
        match self.outcome {
            Outcome::Passed => info!(
                scenario = %self.title,
                state = %self.final_state,
                elapsed_ms = total_ms,
                "scenario passed"
            ),
            Outcome::SkippedStep => warn!(
                scenario = %self.title,
                state = %self.final_state,
                skipped = self.skipped_steps.len(),
                elapsed_ms = total_ms,
                "scenario passed with skipped steps"
            ),
            Outcome::Failed => error!(
                scenario = %self.title,
                state = %self.final_state,
                failures = self.failures.len(),
                elapsed_ms = total_ms,
                "scenario failed"
            ),
        }
        for skip in &self.skipped_steps {
            warn!(step = %skip.step, reason = %skip.reason, "skipped");
        }
        for failure in &self.failures {
            error!(phase = %failure.phase, kind = ?failure.kind, message = %failure.message, "failure");
        }
    }
}

/// Writes all scenario reports as a pretty JSON array.
pub async fn write_reports(reports: &[ScenarioReport], path: &Path) -> Result<()> {
    let json = serde_json::to_vec_pretty(reports)?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| anyhow::anyhow!("failed to write report to {}: {}", path.display(), e))?;
    info!(path = %path.display(), scenarios = reports.len(), "report written");
    Ok(())
}
