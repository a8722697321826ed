//! Scenario executor: the devops encrypted-claim flow.
//!
//! ```text
//! Started ─► KeyGenerated ─► ClassCreated ─► ClaimCreated ─► Verified
//!                                  │
//!                                  └─ no devops identity: claim step skipped
//! ```
//!
//! Every created cluster object registers its deletion on the [`CleanupStack`]
//! right after the create call succeeds. The key is not cleaned up; the key
//! provider owns key lifecycle.

use std::fmt;

use devops_e2e_core::cleanup::{BoxFuture, CleanupStack};
use devops_e2e_core::client::{ClusterClient, Connector, CryptoClient};
use devops_e2e_core::config::ENV_DEVOPS_KUBECONFIG;
use devops_e2e_core::error::HarnessError;
use devops_e2e_core::metrics as m;
use devops_e2e_core::types::{
    ClaimRef, ClaimRequest, EncryptionClassRef, EncryptionKeyHandle, unique_name,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::context::TestContext;
use crate::scope::PhaseScope;

/// Access mode requested by the scenario claim.
pub const CLAIM_ACCESS_MODE: &str = "ReadWriteOnce";

/// Last state the scenario reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioState {
    Started,
    KeyGenerated,
    ClassCreated,
    ClaimCreated,
    Verified,
}

impl fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Started => "started",
            Self::KeyGenerated => "key_generated",
            Self::ClassCreated => "class_created",
            Self::ClaimCreated => "claim_created",
            Self::Verified => "verified",
        };
        f.write_str(s)
    }
}

/// Result of the claim step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    Created(ClaimRef),
    /// No devops identity configured; no claim was created.
    Skipped { reason: String },
}

/// Optional check run after the claim exists.
///
/// Failures should be `HarnessError::ScenarioAssertion`; they unwind the
/// cleanup stack like any other scenario failure.
pub trait ClaimVerifier: Send + Sync {
    fn verify<'a>(&'a self, claim: &'a ClaimRef) -> BoxFuture<'a, Result<(), HarnessError>>;
}

/// What the scenario has done so far. Kept up to date as steps finish so a
/// failed run still reports how far it got.
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    pub state: ScenarioState,
    pub key: Option<EncryptionKeyHandle>,
    pub encryption_class: Option<EncryptionClassRef>,
    pub claim: Option<ClaimOutcome>,
}

impl Default for ScenarioRun {
    fn default() -> Self {
        Self {
            state: ScenarioState::Started,
            key: None,
            encryption_class: None,
            claim: None,
        }
    }
}

/// Runs the scenario body. Cleanups are pushed onto `cleanups` but not run.
pub async fn run_scenario<C: Connector>(
    connector: &C,
    ctx: &TestContext<C>,
    scope: &PhaseScope,
    verifier: Option<&dyn ClaimVerifier>,
    cleanups: &mut CleanupStack,
    run: &mut ScenarioRun,
) -> Result<(), HarnessError> {
    let crypto = ctx.crypto()?;
    let namespace = ctx.config.scenario_namespace().to_owned();
    let provider_id = ctx.config.crypto.key_provider_id.as_str();

    // 1. key
    let key = scope
        .step("generate-key", async {
            crypto
                .generate_key(provider_id)
                .await
                .map_err(|e| HarnessError::scenario("generate-key", e))
        })
        .await?;
    info!(key = %key, "encryption key generated");
    run.key = Some(key.clone());
    run.state = ScenarioState::KeyGenerated;

    // 2. encryption class
    let class_name = unique_name("encclass");
    let class = scope
        .step("create-encryption-class", async {
            crypto
                .create_encryption_class(&namespace, &class_name, &key)
                .await
                .map_err(|e| HarnessError::scenario("create-encryption-class", e))
        })
        .await?;
    register_encryption_class_cleanup(cleanups, crypto.clone(), class.clone());
    metrics::counter!(m::HARNESS_RESOURCES_CREATED_TOTAL, m::LABEL_RESOURCE => "encryption_class")
        .increment(1);
    run.encryption_class = Some(class.clone());
    run.state = ScenarioState::ClassCreated;

    // 3. claim, as the devops user
    let Some(devops_target) = ctx.config.devops_target() else {
        let reason = format!(
            "{ENV_DEVOPS_KUBECONFIG} is not set; claim creation as the devops user was skipped"
        );
        warn!(step = "create-claim", reason = %reason, "scenario step skipped");
        metrics::counter!(
            m::HARNESS_STEPS_TOTAL,
            m::LABEL_PHASE => scope.phase().as_str(),
            m::LABEL_STEP => "create-claim",
            m::LABEL_RESULT => "skipped",
        )
        .increment(1);
        run.claim = Some(ClaimOutcome::Skipped { reason });
        return Ok(());
    };

    let devops = scope
        .step("connect-devops-cluster", async {
            connector
                .connect_cluster(&devops_target)
                .await
                .map_err(|e| HarnessError::scenario("connect-devops-cluster", e))
        })
        .await?;
    info!(cluster = %devops_target, "devops identity connected");

    let request = ClaimRequest {
        namespace: namespace.clone(),
        name: unique_name("pvc"),
        storage_class: ctx.encrypted_class()?.name.clone(),
        encryption_class: Some(class.name.clone()),
        size: ctx.config.storage.claim_size.clone(),
        access_mode: CLAIM_ACCESS_MODE.to_owned(),
    };
    let claim = scope
        .step("create-claim", async {
            devops
                .create_claim(&request)
                .await
                .map_err(|e| HarnessError::scenario("create-claim", e))
        })
        .await?;
    register_claim_cleanup(cleanups, ctx.cluster()?.clone(), claim.clone());
    metrics::counter!(m::HARNESS_RESOURCES_CREATED_TOTAL, m::LABEL_RESOURCE => "claim")
        .increment(1);
    info!(
        claim = %claim,
        storage_class = %claim.storage_class,
        encryption_class = %class.name,
        "claim created"
    );
    run.claim = Some(ClaimOutcome::Created(claim.clone()));
    run.state = ScenarioState::ClaimCreated;

    // 4. verified: implicit unless a verifier is attached
    if let Some(verifier) = verifier {
        scope
            .step("verify-claim", verifier.verify(&claim))
            .await?;
    }
    run.state = ScenarioState::Verified;
    Ok(())
}

fn register_encryption_class_cleanup<K: CryptoClient>(
    cleanups: &mut CleanupStack,
    crypto: K,
    class: EncryptionClassRef,
) {
    let label = format!("encryption class {}/{}", class.namespace, class.name);
    cleanups.push(label, move || async move {
        match crypto.delete_encryption_class(&class).await {
            Ok(()) => {
                info!(encryption_class = %class.name, "encryption class deleted");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!(encryption_class = %class.name, "encryption class already absent");
                Ok(())
            }
            Err(e) => Err(HarnessError::teardown(
                &format!("encryption class '{}/{}'", class.namespace, class.name),
                e,
            )),
        }
    });
}

fn register_claim_cleanup<K: ClusterClient>(
    cleanups: &mut CleanupStack,
    cluster: K,
    claim: ClaimRef,
) {
    let label = format!("claim {claim}");
    cleanups.push(label, move || async move {
        match cluster.delete_claim(&claim.namespace, &claim.name).await {
            Ok(()) => {
                info!(claim = %claim, "claim deleted");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!(claim = %claim, "claim already absent");
                Ok(())
            }
            Err(e) => Err(HarnessError::teardown(&format!("claim '{claim}'"), e)),
        }
    });
}
