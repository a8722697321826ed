//! Report and world-state assertions.

use devops_e2e_core::error::FailureKind;
use devops_e2e_runner::ScenarioReport;
use devops_e2e_runner::scope::Phase;

use super::fake_world::FakeWorld;

/// Failure kinds of a report, in recording order.
#[allow(dead_code)]
pub fn failure_kinds(report: &ScenarioReport) -> Vec<FailureKind> {
    report.failures.iter().map(|f| f.kind).collect()
}

/// Failure phases of a report, in recording order.
#[allow(dead_code)]
pub fn failure_phases(report: &ScenarioReport) -> Vec<Phase> {
    report.failures.iter().map(|f| f.phase).collect()
}

/// Asserts the report has exactly one failure, of `kind`, and returns its message.
#[allow(dead_code)]
pub fn assert_single_failure(report: &ScenarioReport, kind: FailureKind) -> String {
    assert_eq!(
        failure_kinds(report),
        vec![kind],
        "unexpected failures: {:#?}",
        report.failures
    );
    report.failures[0].message.clone()
}

/// Asserts no scenario object (encryption class, claim) is left in the world.
#[allow(dead_code)]
pub fn assert_no_scenario_objects(world: &FakeWorld) {
    let state = world.state();
    assert!(
        state.encryption_classes.is_empty(),
        "encryption classes left behind: {:?}",
        state.encryption_classes.keys().collect::<Vec<_>>()
    );
    assert!(
        state.claims.is_empty(),
        "claims left behind: {:?}",
        state.claims.keys().collect::<Vec<_>>()
    );
}

/// Asserts nothing the harness could have created is left in the world.
#[allow(dead_code)]
pub fn assert_world_clean(world: &FakeWorld) {
    assert_no_scenario_objects(world);
    let state = world.state();
    assert!(
        state.storage_classes.is_empty(),
        "storage classes left behind: {:?}",
        state.storage_classes.keys().collect::<Vec<_>>()
    );
}
