//! Harness: setup → scenario → scoped cleanups → teardown.
//!
//! ```text
//!  root token (Ctrl-C)
//!    ├── setup scope ─────── bootstrap, provision
//!    └── scenario scope ──── key, encryption class, claim, verify
//!  detached:
//!        cleanup scope ───── LIFO cleanup stack
//!        teardown scope ──── storage classes, event dump, backend close
//! ```
//!
//! Setup failures skip the scenario. Teardown always runs. Cleanup and teardown
//! scopes are not children of the root token, so an interrupted run still
//! releases what it created.

use std::time::Duration;

use devops_e2e_core::cleanup::CleanupStack;
use devops_e2e_core::client::Connector;
use devops_e2e_core::config::HarnessConfig;
use devops_e2e_core::error::HarnessError;
use devops_e2e_core::types::ClassOrigin;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::bootstrap::bootstrap;
use crate::catalog::ScenarioSpec;
use crate::context::TestContext;
use crate::provision::provision;
use crate::report::{ScenarioReport, SkippedStep};
use crate::scenario::{ClaimOutcome, ClaimVerifier, ScenarioRun, run_scenario};
use crate::scope::{Phase, PhaseScope};
use crate::teardown::teardown;

/// Runs scenarios against one set of collaborators.
pub struct Harness<C: Connector> {
    connector: C,
    config: HarnessConfig,
    verifier: Option<Box<dyn ClaimVerifier>>,
    cancel: CancellationToken,
}

impl<C: Connector> Harness<C> {
    /// `config` must already be validated.
    pub fn new(connector: C, config: HarnessConfig) -> Self {
        Self {
            connector,
            config,
            verifier: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Attaches a post-claim verifier.
    pub fn with_verifier(mut self, verifier: impl ClaimVerifier + 'static) -> Self {
        self.verifier = Some(Box::new(verifier));
        self
    }

    /// Uses `token` as the root of the setup and scenario scopes.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Runs one scenario with a fresh context and returns its report.
    pub async fn run(&self, spec: &ScenarioSpec) -> ScenarioReport {
        let mut report = ScenarioReport::new(spec);
        let mut ctx = TestContext::<C>::new(self.config.clone());
        let timeouts = &self.config.timeouts;

        info!(
            scenario = %spec.title,
            flavor = %self.config.cluster.flavor,
            namespace = %self.config.scenario_namespace(),
            "scenario starting"
        );

        let setup_ok = self
            .run_setup(&mut ctx, Duration::from_secs(timeouts.setup_secs), &mut report)
            .await;

        for class in ctx.fixtures.in_creation_order() {
            if class.origin == ClassOrigin::Created {
                report.created.push(format!("storage class {}", class.name));
            }
        }
        report.vm_image = ctx.vm_image_id.clone();

        if setup_ok {
            self.run_body(&ctx, &mut report).await;
        } else {
            info!(scenario = %spec.title, "setup failed; scenario body not run");
        }

        let run_failed = !report.failures.is_empty();
        let scope = PhaseScope::detached(
            Phase::Teardown,
            Duration::from_secs(timeouts.teardown_secs),
        );
        let teardown_report = teardown(&self.connector, &mut ctx, &scope, run_failed).await;
        for failure in &teardown_report.failures {
            report.record_failure(Phase::Teardown, failure);
        }
        report.record_phase(Phase::Teardown, scope.elapsed());
        drop(scope);
        drop(ctx);

        report.finish();
        report.log_summary();
        report
    }

    async fn run_setup(
        &self,
        ctx: &mut TestContext<C>,
        timeout: Duration,
        report: &mut ScenarioReport,
    ) -> bool {
        let scope = PhaseScope::child_of(Phase::Setup, timeout, &self.cancel);
        let result: Result<(), HarnessError> = async {
            bootstrap(&self.connector, &mut *ctx, &scope).await?;
            provision(&mut *ctx, &scope).await
        }
        .await;
        report.record_phase(Phase::Setup, scope.elapsed());

        match result {
            Ok(()) => {
                info!(elapsed_ms = scope.elapsed().as_millis() as u64, "setup complete");
                true
            }
            Err(e) => {
                error!(error = %e, kind = e.kind().as_str(), "setup failed");
                report.record_failure(Phase::Setup, &e);
                false
            }
        }
    }

    async fn run_body(&self, ctx: &TestContext<C>, report: &mut ScenarioReport) {
        let timeouts = &self.config.timeouts;
        let mut cleanups = CleanupStack::new();
        let mut run = ScenarioRun::default();

        let scope = PhaseScope::child_of(
            Phase::Scenario,
            Duration::from_secs(timeouts.scenario_secs),
            &self.cancel,
        );
        let result = run_scenario(
            &self.connector,
            ctx,
            &scope,
            self.verifier.as_deref(),
            &mut cleanups,
            &mut run,
        )
        .await;
        report.record_phase(Phase::Scenario, scope.elapsed());
        drop(scope);

        if let Err(e) = &result {
            error!(error = %e, state = %run.state, pending_cleanups = cleanups.len(), "scenario failed");
            report.record_failure(Phase::Scenario, e);
        }

        report.final_state = run.state;
        if let Some(class) = &run.encryption_class {
            report
                .created
                .push(format!("encryption class {}/{}", class.namespace, class.name));
        }
        match &run.claim {
            Some(ClaimOutcome::Created(claim)) => report.created.push(format!("claim {claim}")),
            Some(ClaimOutcome::Skipped { reason }) => report.skipped_steps.push(SkippedStep {
                step: "create-claim".to_owned(),
                reason: reason.clone(),
            }),
            None => {}
        }

        // Each entry gets its own bound; a hung delete does not skip the rest.
        let scope = PhaseScope::detached(
            Phase::Cleanup,
            Duration::from_secs(timeouts.teardown_secs),
        );
        let mut executed = Vec::with_capacity(cleanups.len());
        while let Some(cleanup) = cleanups.pop() {
            let label = cleanup.label().to_owned();
            if let Err(e) = scope.step("run-cleanup", cleanup.run()).await {
                error!(cleanup = %label, error = %e, "scoped cleanup did not complete");
                report.record_failure(Phase::Cleanup, &e);
            }
            executed.push(label);
        }
        info!(executed = ?executed, "scoped cleanups finished");
        report.record_phase(Phase::Cleanup, scope.elapsed());
    }
}
