//! Setup failures stop the run before the scenario body.
//!
//! Every case checks the same three things: the failure is classified, no
//! scenario object was attempted, and teardown still closed the backend.

use devops_e2e_core::error::FailureKind;
use devops_e2e_core::types::{KeyProviderHealth, NodeInfo};
use devops_e2e_runner::catalog::DEVOPS_ENCRYPTION;
use devops_e2e_runner::scope::Phase;
use devops_e2e_runner::{Harness, Outcome, ScenarioReport, ScenarioState};

use crate::helpers::assertions::*;
use crate::helpers::config::TestConfigBuilder;
use crate::helpers::fake_world::*;

async fn run(world: &FakeWorld, builder: TestConfigBuilder) -> ScenarioReport {
    Harness::new(world.clone(), builder.build())
        .run(&DEVOPS_ENCRYPTION)
        .await
}

fn assert_scenario_not_run(world: &FakeWorld, report: &ScenarioReport) {
    assert_eq!(report.outcome, Outcome::Failed);
    assert_eq!(report.final_state, ScenarioState::Started);
    assert_eq!(failure_phases(report), vec![Phase::Setup]);
    assert_eq!(world.call_count("generate_key"), 0);
    assert_eq!(world.call_count("create_encryption_class"), 0);
    assert_eq!(world.call_count("create_claim"), 0);
    assert!(
        !report.phases.iter().any(|p| p.phase == Phase::Scenario),
        "scenario phase should not have run"
    );
}

#[tokio::test]
async fn test_e2e_no_usable_node_fails_bootstrap() {
    // Given: the only node is cordoned
    let world = FakeWorld::healthy();
    world.state().nodes = vec![NodeInfo {
        name: "node-1".to_owned(),
        ready: true,
        schedulable: false,
    }];

    // When
    let report = run(&world, TestConfigBuilder::new()).await;

    // Then
    let message = assert_single_failure(&report, FailureKind::BootstrapFailure);
    assert!(message.contains("node-readiness"), "message: {message}");
    assert_scenario_not_run(&world, &report);

    // Then: nothing past the node check was connected
    assert_eq!(world.call_count("connect_backend"), 0);
    assert_eq!(world.call_count("create_storage_class"), 0);
    assert!(report.phases.iter().any(|p| p.phase == Phase::Teardown));
}

#[tokio::test]
async fn test_e2e_cluster_connect_failure_fails_bootstrap() {
    // Given
    let world = FakeWorld::healthy();
    world.fail("connect_cluster:admin", "kubeconfig unreadable");

    // When
    let report = run(&world, TestConfigBuilder::new()).await;

    // Then
    let message = assert_single_failure(&report, FailureKind::BootstrapFailure);
    assert!(message.contains("cluster-client"), "message: {message}");
    assert!(message.contains("kubeconfig unreadable"), "message: {message}");
    assert_scenario_not_run(&world, &report);
    assert_eq!(world.call_count("list_nodes"), 0);
}

#[tokio::test]
async fn test_e2e_backend_connect_failure_fails_bootstrap() {
    // Given
    let world = FakeWorld::healthy();
    world.fail("connect_backend", "vCenter login rejected");

    // When
    let report = run(&world, TestConfigBuilder::new()).await;

    // Then
    let message = assert_single_failure(&report, FailureKind::BootstrapFailure);
    assert!(message.contains("storage-backend"), "message: {message}");
    assert_scenario_not_run(&world, &report);
    assert_eq!(world.call_count("connect_crypto"), 0);
    assert_eq!(world.call_count("create_storage_class"), 0);

    // Then: no session was opened, so none is closed
    assert_eq!(world.call_count("close"), 0);
}

#[tokio::test]
async fn test_e2e_non_encrypting_policy_is_a_validation_mismatch() {
    // Given: the encrypted policy does not actually encrypt
    let world = FakeWorld::healthy();
    world
        .state()
        .policies
        .get_mut(ENCRYPTED_POLICY)
        .unwrap()
        .encrypted = false;

    // When
    let report = run(&world, TestConfigBuilder::new()).await;

    // Then
    let message = assert_single_failure(&report, FailureKind::ValidationMismatch);
    assert!(message.contains("policyb"), "message: {message}");
    assert!(message.contains("expected encrypted=true"), "message: {message}");
    assert_scenario_not_run(&world, &report);

    // Then: teardown removed both classes and closed the backend
    assert_world_clean(&world);
    assert!(world.state().backend_closed);
}

#[tokio::test]
async fn test_e2e_encrypting_standard_policy_is_a_validation_mismatch() {
    // Given: the plain policy encrypts
    let world = FakeWorld::healthy();
    world
        .state()
        .policies
        .get_mut(STANDARD_POLICY)
        .unwrap()
        .encrypted = true;

    // When
    let report = run(&world, TestConfigBuilder::new()).await;

    // Then: validation stops before the encrypted class is created
    let message = assert_single_failure(&report, FailureKind::ValidationMismatch);
    assert!(message.contains("expected encrypted=false"), "message: {message}");
    assert_scenario_not_run(&world, &report);
    assert_eq!(world.call_count("create_storage_class:policyb"), 0);
    assert_world_clean(&world);
}

#[tokio::test]
async fn test_e2e_unhealthy_key_provider_is_a_validation_mismatch() {
    // Given
    let world = FakeWorld::healthy();
    world.state().key_providers.insert(
        KEY_PROVIDER.to_owned(),
        KeyProviderHealth::Unhealthy("KMS cluster unreachable".to_owned()),
    );

    // When
    let report = run(&world, TestConfigBuilder::new()).await;

    // Then
    let message = assert_single_failure(&report, FailureKind::ValidationMismatch);
    assert!(message.contains("expected healthy"), "message: {message}");
    assert!(message.contains("KMS cluster unreachable"), "message: {message}");
    assert_scenario_not_run(&world, &report);
    assert!(world.state().backend_closed);
}

#[tokio::test]
async fn test_e2e_unknown_key_provider_is_a_validation_mismatch() {
    // Given
    let world = FakeWorld::healthy();
    world.state().key_providers.clear();

    // When
    let report = run(&world, TestConfigBuilder::new()).await;

    // Then
    let message = assert_single_failure(&report, FailureKind::ValidationMismatch);
    assert!(message.contains("expected reachable"), "message: {message}");
    assert_scenario_not_run(&world, &report);
}

#[tokio::test]
async fn test_e2e_unknown_storage_policy_fails_bootstrap() {
    // Given
    let world = FakeWorld::healthy();
    world.state().policies.remove(STANDARD_POLICY);

    // When
    let report = run(&world, TestConfigBuilder::new()).await;

    // Then
    let message = assert_single_failure(&report, FailureKind::BootstrapFailure);
    assert!(message.contains("resolve-storage-policy"), "message: {message}");
    assert_scenario_not_run(&world, &report);
    assert_eq!(world.call_count("create_storage_class"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_e2e_missing_vm_image_times_out() {
    // Given: the image never appears
    let world = FakeWorld::healthy();
    world.state().images.clear();

    // When
    let report = run(&world, TestConfigBuilder::new().image_wait_secs(5)).await;

    // Then
    let message = assert_single_failure(&report, FailureKind::BootstrapFailure);
    assert!(message.contains("vm-image"), "message: {message}");
    assert!(message.contains(IMAGE_DISPLAY_NAME), "message: {message}");
    assert_scenario_not_run(&world, &report);
    assert!(report.vm_image.is_none());

    // Then: the image list was polled more than once before giving up
    assert!(world.call_count("list_images") > 1);
    assert_world_clean(&world);
}

#[tokio::test(start_paused = true)]
async fn test_e2e_vm_image_appearing_late_is_picked_up() {
    // Given: the image is listed without an identifier at first
    let world = FakeWorld::healthy();
    world.state().images[0].name.clear();

    let late = world.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
        late.state().images[0].name = IMAGE_ID.to_owned();
    });

    // When
    let report = run(&world, TestConfigBuilder::new().image_wait_secs(30)).await;

    // Then
    assert_eq!(report.outcome, Outcome::Passed, "failures: {:#?}", report.failures);
    assert_eq!(report.vm_image.as_deref(), Some(IMAGE_ID));
}

#[tokio::test]
async fn test_e2e_image_listing_error_fails_without_waiting() {
    // Given
    let world = FakeWorld::healthy();
    world.fail("list_images", "no matches for kind VirtualMachineImage");

    // When
    let report = run(&world, TestConfigBuilder::new()).await;

    // Then
    let message = assert_single_failure(&report, FailureKind::BootstrapFailure);
    assert!(message.contains("VirtualMachineImage"), "message: {message}");
    assert_eq!(world.call_count("list_images"), 1);
    assert_scenario_not_run(&world, &report);
}

#[tokio::test]
async fn test_e2e_existing_class_on_vanilla_is_a_conflict() {
    // Given: a class named after the standard policy already exists
    let world = FakeWorld::healthy();
    world
        .state()
        .storage_classes
        .insert("policya".to_owned(), Default::default());

    // When
    let report = run(&world, TestConfigBuilder::new()).await;

    // Then: creation fails and the pre-existing class is left alone
    let message = assert_single_failure(&report, FailureKind::BootstrapFailure);
    assert!(message.contains("create-storage-class"), "message: {message}");
    assert_scenario_not_run(&world, &report);
    assert!(world.state().storage_classes.contains_key("policya"));
    assert_eq!(world.call_count("delete_storage_class"), 0);
    assert!(report.created.is_empty());
}

#[tokio::test]
async fn test_e2e_unregistered_vm_operator_schema_fails_bootstrap() {
    // Given: the VM operator client cannot register v1alpha3
    let world = FakeWorld::healthy();
    world.state().unserved_schema_version = Some("v1alpha3".to_owned());

    // When
    let report = run(&world, TestConfigBuilder::new()).await;

    // Then
    let message = assert_single_failure(&report, FailureKind::BootstrapFailure);
    assert!(message.contains("vm-operator-client"), "message: {message}");
    assert!(message.contains("vmoperator.vmware.com/v1alpha3"), "message: {message}");
    assert_scenario_not_run(&world, &report);
    assert_eq!(world.call_count("create_storage_class"), 0);
    assert!(world.state().backend_closed);
}
