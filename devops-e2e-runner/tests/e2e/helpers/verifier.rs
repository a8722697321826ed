//! Closure-backed claim verifiers.

use devops_e2e_core::cleanup::BoxFuture;
use devops_e2e_core::error::HarnessError;
use devops_e2e_core::types::ClaimRef;
use devops_e2e_runner::ClaimVerifier;

/// Runs `F` against the created claim.
///
/// The closure runs synchronously while the claim is live, so it can snapshot
/// or mutate the fake world before cleanup.
pub struct FnVerifier<F>(pub F);

impl<F> ClaimVerifier for FnVerifier<F>
where
    F: Fn(&ClaimRef) -> Result<(), HarnessError> + Send + Sync,
{
    fn verify<'a>(&'a self, claim: &'a ClaimRef) -> BoxFuture<'a, Result<(), HarnessError>> {
        let result = (self.0)(claim);
        Box::pin(async move { result })
    }
}

/// A verifier that always fails the scenario.
#[allow(dead_code)]
pub fn failing(
    reason: &'static str,
) -> FnVerifier<impl Fn(&ClaimRef) -> Result<(), HarnessError> + Send + Sync + 'static> {
    FnVerifier(move |_claim: &ClaimRef| -> Result<(), HarnessError> {
        Err(HarnessError::scenario("verify-claim", reason))
    })
}
