//! Resource provisioning and setup gates.
//!
//! Creates the standard and encrypted storage classes, checks each against the
//! encryption service, checks the key provider and resolves the VM image.
//! A failed gate aborts setup. Classes created before the failure stay
//! recorded in the context and are removed by teardown.

use std::time::Duration;

use devops_e2e_core::client::{
    ClusterClient, Connector, CryptoClient, StorageBackend, StorageClassParameters,
    VmOperatorClient,
};
use devops_e2e_core::error::HarnessError;
use devops_e2e_core::metrics as m;
use devops_e2e_core::types::{
    ClassOrigin, KeyProviderHealth, STORAGE_POLICY_PARAMETER, StorageClassRef, find_image,
    storage_class_name,
};
use tracing::{debug, info};

use crate::context::TestContext;
use crate::scope::PhaseScope;

/// Provisions both storage classes and runs every setup gate.
pub async fn provision<C: Connector>(
    ctx: &mut TestContext<C>,
    scope: &PhaseScope,
) -> Result<(), HarnessError> {
    let standard_policy = ctx.config.storage.standard_policy.clone();
    let standard = create_storage_class(ctx, scope, &standard_policy, false).await?;
    ctx.fixtures.standard = Some(standard.clone());
    validate_encrypted_storage_class(ctx, scope, &standard, false).await?;

    let encrypted_policy = ctx.config.storage.encrypted_policy.clone();
    let encrypted = create_storage_class(ctx, scope, &encrypted_policy, true).await?;
    ctx.fixtures.encrypted = Some(encrypted.clone());
    validate_encrypted_storage_class(ctx, scope, &encrypted, true).await?;

    let provider_id = ctx.config.crypto.key_provider_id.clone();
    validate_key_provider(ctx, scope, &provider_id).await?;

    let image = wait_for_vm_image(ctx, scope).await?;
    ctx.vm_image_id = Some(image);
    Ok(())
}

/// Creates (or, on platform-managed flavors, adopts) the storage class for `policy_name`.
///
/// When the harness owns storage classes a name conflict is a setup failure.
pub async fn create_storage_class<C: Connector>(
    ctx: &TestContext<C>,
    scope: &PhaseScope,
    policy_name: &str,
    encrypted: bool,
) -> Result<StorageClassRef, HarnessError> {
    let backend = ctx.backend()?;
    let cluster = ctx.cluster()?;
    let provisioner = ctx.config.storage.provisioner.as_str();
    let owns_classes = ctx.config.cluster.flavor.owns_storage_classes();
    let name = storage_class_name(policy_name);

    let policy_id = scope
        .step("resolve-storage-policy", async {
            backend
                .storage_policy_id(policy_name)
                .await
                .map_err(|e| HarnessError::bootstrap("resolve-storage-policy", e))
        })
        .await?;

    let params = StorageClassParameters::from([(
        STORAGE_POLICY_PARAMETER.to_owned(),
        policy_id.clone(),
    )]);

    let origin = scope
        .step("create-storage-class", async {
            if !owns_classes {
                let existing = cluster
                    .get_storage_class(&name)
                    .await
                    .map_err(|e| HarnessError::bootstrap("create-storage-class", e))?;
                if let Some(existing) = existing {
                    debug!(storage_class = %name, parameters = ?existing, "platform storage class found");
                    return Ok(ClassOrigin::Adopted);
                }
            }
            cluster
                .create_storage_class(&name, provisioner, &params)
                .await
                .map_err(|e| HarnessError::bootstrap("create-storage-class", e))?;
            Ok(ClassOrigin::Created)
        })
        .await?;

    if origin == ClassOrigin::Created {
        metrics::counter!(m::HARNESS_RESOURCES_CREATED_TOTAL, m::LABEL_RESOURCE => "storage_class")
            .increment(1);
    }
    info!(
        storage_class = %name,
        policy = %policy_name,
        policy_id = %policy_id,
        encrypted,
        origin = ?origin,
        "storage class ready"
    );

    Ok(StorageClassRef {
        name,
        policy_name: policy_name.to_owned(),
        policy_id,
        encrypted,
        origin,
    })
}

/// Checks that the class's actual encryption capability equals `expect_encrypted`.
pub async fn validate_encrypted_storage_class<C: Connector>(
    ctx: &TestContext<C>,
    scope: &PhaseScope,
    class: &StorageClassRef,
    expect_encrypted: bool,
) -> Result<(), HarnessError> {
    let crypto = ctx.crypto()?;
    let subject = format!(
        "storage class '{}' (policy '{}')",
        class.name, class.policy_name
    );
    let expected = format!("encrypted={expect_encrypted}");

    scope
        .step("validate-storage-class", async {
            let actual = crypto
                .is_encrypted_storage_class(&class.name)
                .await
                .map_err(|e| HarnessError::ValidationMismatch {
                    subject: subject.clone(),
                    expected: expected.clone(),
                    actual: format!("capability check failed: {e}"),
                })?;
            if actual != expect_encrypted {
                return Err(HarnessError::ValidationMismatch {
                    subject: subject.clone(),
                    expected: expected.clone(),
                    actual: format!("encrypted={actual}"),
                });
            }
            Ok(())
        })
        .await?;

    info!(storage_class = %class.name, encrypted = expect_encrypted, "storage class validated");
    Ok(())
}

/// Checks that the key provider exists and is healthy.
pub async fn validate_key_provider<C: Connector>(
    ctx: &TestContext<C>,
    scope: &PhaseScope,
    provider_id: &str,
) -> Result<(), HarnessError> {
    let backend = ctx.backend()?;
    let subject = format!("key provider '{provider_id}'");

    let info = scope
        .step("validate-key-provider", async {
            backend
                .key_provider(provider_id)
                .await
                .map_err(|e| HarnessError::ValidationMismatch {
                    subject: subject.clone(),
                    expected: "reachable".to_owned(),
                    actual: e.to_string(),
                })
        })
        .await?;

    match info.health {
        KeyProviderHealth::Healthy => {
            info!(key_provider = %provider_id, "key provider validated");
            Ok(())
        }
        KeyProviderHealth::Unhealthy(reason) => Err(HarnessError::ValidationMismatch {
            subject,
            expected: "healthy".to_owned(),
            actual: format!("unhealthy: {reason}"),
        }),
    }
}

/// Polls the VM image list until the configured image shows up.
///
/// Returns the image's non-empty internal name. A failed list call is not
/// retried; only absence keeps the poll going.
pub async fn wait_for_vm_image<C: Connector>(
    ctx: &TestContext<C>,
    scope: &PhaseScope,
) -> Result<String, HarnessError> {
    let vm = ctx.vm_operator()?;
    let namespace = ctx.config.scenario_namespace();
    let display_name = ctx.config.vm.image_name.as_str();
    let wait = Duration::from_secs(ctx.config.timeouts.vm_image_wait_secs);
    let poll = Duration::from_secs(ctx.config.timeouts.vm_image_poll_secs.max(1));

    let id = scope
        .step("wait-for-vm-image", async {
            tokio::time::timeout(wait, poll_for_image(vm, namespace, display_name, poll))
                .await
                .unwrap_or_else(|_| {
                    Err(HarnessError::bootstrap(
                        "vm-image",
                        format!(
                            "image '{display_name}' not available in '{namespace}' after {}s",
                            wait.as_secs()
                        ),
                    ))
                })
        })
        .await?;

    info!(image = %display_name, id = %id, "vm image resolved");
    Ok(id)
}

async fn poll_for_image<V: VmOperatorClient>(
    vm: &V,
    namespace: &str,
    display_name: &str,
    poll: Duration,
) -> Result<String, HarnessError> {
    loop {
        let images = vm
            .list_images(namespace)
            .await
            .map_err(|e| HarnessError::bootstrap("vm-image", e))?;
        if let Some(id) = find_image(&images, display_name) {
            return Ok(id.to_owned());
        }
        debug!(image = %display_name, seen = images.len(), "vm image not available yet");
        tokio::time::sleep(poll).await;
    }
}
