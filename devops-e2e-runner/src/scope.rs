//! Phase-scoped cancellation and timeouts.
//!
//! Each harness phase runs inside a [`PhaseScope`] that owns a fresh
//! [`CancellationToken`] and a step bound. Every collaborator call goes
//! through [`PhaseScope::step`], which races the call against the token and the
//! bound. Dropping the scope cancels its token, so nothing started under a phase
//! outlives it.
//!
//! Setup and scenario scopes share one deadline across all their steps. Detached
//! scopes (cleanup, teardown) give every step its own timeout, so one hung
//! delete cannot starve the steps after it.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use devops_e2e_core::error::HarnessError;
use devops_e2e_core::metrics as m;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};

/// Harness phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Setup,
    Scenario,
    /// Scoped cleanups registered by the scenario body.
    Cleanup,
    Teardown,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Scenario => "scenario",
            Self::Cleanup => "cleanup",
            Self::Teardown => "teardown",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How long a step may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepBound {
    /// Every step ends at the same phase deadline.
    PhaseDeadline(Instant),
    /// Every step gets the full timeout from the moment it starts.
    PerStep,
}

/// Cancellation context for one phase.
pub struct PhaseScope {
    phase: Phase,
    token: CancellationToken,
    _guard: DropGuard,
    timeout: Duration,
    started: Instant,
    bound: StepBound,
}

impl PhaseScope {
    /// Creates a scope whose token is a child of `parent`.
    ///
    /// Cancelling `parent` cancels this phase.
    pub fn child_of(phase: Phase, timeout: Duration, parent: &CancellationToken) -> Self {
        let started = Instant::now();
        Self::with_token(
            phase,
            timeout,
            parent.child_token(),
            StepBound::PhaseDeadline(started + timeout),
        )
    }

    /// Creates a scope with an independent token.
    ///
    /// Used for cleanup and teardown so that resources are still released after
    /// the run itself was cancelled. Each step is bounded by `timeout` on its own.
    pub fn detached(phase: Phase, timeout: Duration) -> Self {
        Self::with_token(phase, timeout, CancellationToken::new(), StepBound::PerStep)
    }

    fn with_token(
        phase: Phase,
        timeout: Duration,
        token: CancellationToken,
        bound: StepBound,
    ) -> Self {
        debug!(
            phase = %phase,
            timeout_secs = timeout.as_secs(),
            bound = ?bound,
            "phase scope opened"
        );
        Self {
            phase,
            _guard: token.clone().drop_guard(),
            token,
            timeout,
            started: Instant::now(),
            bound,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The phase token, for work that must stop with the phase.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Runs one step of the phase.
    ///
    /// The step is not retried. Cancellation and the step bound surface as
    /// `HarnessError::Cancelled` / `HarnessError::Timeout`.
    pub async fn step<T, F>(&self, step: &str, fut: F) -> Result<T, HarnessError>
    where
        F: Future<Output = Result<T, HarnessError>>,
    {
        if self.token.is_cancelled() {
            return Err(self.cancelled(step));
        }

        info!(phase = %self.phase, step, "step started");
        let started = Instant::now();
        let deadline = match self.bound {
            StepBound::PhaseDeadline(deadline) => deadline,
            StepBound::PerStep => started + self.timeout,
        };

        let result = tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(self.cancelled(step)),
            _ = tokio::time::sleep_until(deadline) => Err(HarnessError::Timeout {
                phase: self.phase.to_string(),
                step: step.to_owned(),
                secs: self.timeout.as_secs(),
            }),
            res = fut => res,
        };

        let elapsed = started.elapsed();
        let outcome = if result.is_ok() { "success" } else { "failure" };
        metrics::counter!(
            m::HARNESS_STEPS_TOTAL,
            m::LABEL_PHASE => self.phase.as_str(),
            m::LABEL_STEP => step.to_owned(),
            m::LABEL_RESULT => outcome,
        )
        .increment(1);
        metrics::histogram!(
            m::HARNESS_STEP_DURATION_SECONDS,
            m::LABEL_PHASE => self.phase.as_str(),
            m::LABEL_STEP => step.to_owned(),
        )
        .record(elapsed.as_secs_f64());

        match &result {
            Ok(_) => info!(
                phase = %self.phase,
                step,
                elapsed_ms = elapsed.as_millis() as u64,
                "step finished"
            ),
            Err(e) => info!(
                phase = %self.phase,
                step,
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "step failed"
            ),
        }
        result
    }

    fn cancelled(&self, step: &str) -> HarnessError {
        HarnessError::Cancelled {
            phase: self.phase.to_string(),
            step: step.to_owned(),
        }
    }
}

impl Drop for PhaseScope {
    fn drop(&mut self) {
        metrics::histogram!(
            m::HARNESS_PHASE_DURATION_SECONDS,
            m::LABEL_PHASE => self.phase.as_str(),
        )
        .record(self.elapsed().as_secs_f64());
        debug!(phase = %self.phase, "phase scope closed");
    }
}
