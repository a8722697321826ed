//! Test configuration builder for E2E tests.
//!
//! Provides [`TestConfigBuilder`], which resolves a `HarnessConfig` from an
//! in-memory environment exactly like the runner resolves it from the process
//! environment.

use std::collections::HashMap;

use devops_e2e_core::config::*;
use devops_e2e_core::error::HarnessError;

use super::fake_world::{ENCRYPTED_POLICY, IMAGE_DISPLAY_NAME, KEY_PROVIDER, STANDARD_POLICY};

pub const TEST_NAMESPACE: &str = "devops-e2e";
pub const SVC_NAMESPACE: &str = "svc-devops-ns";

/// Builder for constructing test-friendly `HarnessConfig` instances.
///
/// By default the flavor is `VANILLA` (the harness owns storage classes), a
/// devops kubeconfig is configured, and the VM image wait is short.
///
/// # Example
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .flavor("WORKLOAD")
///     .without_devops()
///     .build();
/// ```
#[allow(dead_code)]
pub struct TestConfigBuilder {
    env: HashMap<String, String>,
    image_wait_secs: u64,
}

#[allow(dead_code)]
impl TestConfigBuilder {
    /// Create a new builder with every required variable set.
    pub fn new() -> Self {
        let env = [
            (ENV_STANDARD_POLICY, STANDARD_POLICY),
            (ENV_ENCRYPTED_POLICY, ENCRYPTED_POLICY),
            (ENV_KEY_PROVIDER, KEY_PROVIDER),
            (ENV_VM_IMAGE_NAME, IMAGE_DISPLAY_NAME),
            (ENV_CLUSTER_FLAVOR, "VANILLA"),
            (ENV_TEST_NAMESPACE, TEST_NAMESPACE),
            (ENV_SVC_NAMESPACE, SVC_NAMESPACE),
            (ENV_DEVOPS_KUBECONFIG, "/tmp/devops-e2e/devops.kubeconfig"),
            (ENV_VCENTER_URL, "https://vcenter.test"),
            (ENV_VCENTER_USER, "administrator@vsphere.local"),
            (ENV_VCENTER_PASSWORD, "secret"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();

        Self {
            env,
            image_wait_secs: 5,
        }
    }

    /// Set `CLUSTER_FLAVOR`.
    pub fn flavor(self, flavor: &str) -> Self {
        let builder = self.set(ENV_CLUSTER_FLAVOR, flavor);
        if flavor == "GC" {
            builder.set(ENV_SVC_KUBECONFIG, "/tmp/devops-e2e/supervisor.kubeconfig")
        } else {
            builder
        }
    }

    /// Remove the devops identity.
    pub fn without_devops(self) -> Self {
        self.unset(ENV_DEVOPS_KUBECONFIG)
    }

    pub fn set(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_owned(), value.to_owned());
        self
    }

    pub fn unset(mut self, key: &str) -> Self {
        self.env.remove(key);
        self
    }

    /// Bound on the VM image wait.
    pub fn image_wait_secs(mut self, secs: u64) -> Self {
        self.image_wait_secs = secs;
        self
    }

    /// Resolve and validate, returning the error.
    pub fn try_build(self) -> Result<HarnessConfig, HarnessError> {
        let mut config = HarnessConfig::from_env(&self.env)?;
        config.timeouts.vm_image_wait_secs = self.image_wait_secs;
        config.timeouts.vm_image_poll_secs = 1;
        Ok(config)
    }

    /// Resolve and validate, panicking on error.
    pub fn build(self) -> HarnessConfig {
        self.try_build().expect("test config should be valid")
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
