//! Per-run test context.
//!
//! A [`TestContext`] is built fresh for every scenario run and passed down
//! through setup, scenario and teardown. It is never shared between runs.
//! Clients are stored as soon as they are connected, so teardown can release
//! whatever setup managed to establish before it failed.

use devops_e2e_core::client::Connector;
use devops_e2e_core::config::HarnessConfig;
use devops_e2e_core::error::HarnessError;
use devops_e2e_core::types::StorageClassRef;

/// Storage classes provisioned during setup.
#[derive(Debug, Clone, Default)]
pub struct Fixtures {
    pub standard: Option<StorageClassRef>,
    pub encrypted: Option<StorageClassRef>,
}

impl Fixtures {
    /// Provisioned classes in creation order.
    pub fn in_creation_order(&self) -> impl Iterator<Item = &StorageClassRef> {
        self.standard.iter().chain(self.encrypted.iter())
    }
}

/// Everything one scenario run owns.
pub struct TestContext<C: Connector> {
    pub config: HarnessConfig,
    pub cluster: Option<C::Cluster>,
    pub backend: Option<C::Backend>,
    pub crypto: Option<C::Crypto>,
    pub vm_operator: Option<C::VmOperator>,
    pub fixtures: Fixtures,
    /// Internal identifier of the resolved VM image.
    pub vm_image_id: Option<String>,
}

impl<C: Connector> TestContext<C> {
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            cluster: None,
            backend: None,
            crypto: None,
            vm_operator: None,
            fixtures: Fixtures::default(),
            vm_image_id: None,
        }
    }

    pub fn cluster(&self) -> Result<&C::Cluster, HarnessError> {
        self.cluster
            .as_ref()
            .ok_or_else(|| not_bootstrapped("cluster client"))
    }

    pub fn backend(&self) -> Result<&C::Backend, HarnessError> {
        self.backend
            .as_ref()
            .ok_or_else(|| not_bootstrapped("storage backend"))
    }

    pub fn crypto(&self) -> Result<&C::Crypto, HarnessError> {
        self.crypto
            .as_ref()
            .ok_or_else(|| not_bootstrapped("encryption client"))
    }

    pub fn vm_operator(&self) -> Result<&C::VmOperator, HarnessError> {
        self.vm_operator
            .as_ref()
            .ok_or_else(|| not_bootstrapped("vm operator client"))
    }

    /// The validated encrypted storage class.
    pub fn encrypted_class(&self) -> Result<&StorageClassRef, HarnessError> {
        self.fixtures
            .encrypted
            .as_ref()
            .ok_or_else(|| not_bootstrapped("encrypted storage class"))
    }
}

fn not_bootstrapped(what: &str) -> HarnessError {
    HarnessError::bootstrap(what, "used before setup established it")
}
