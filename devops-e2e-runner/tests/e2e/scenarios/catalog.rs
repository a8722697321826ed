//! Label selection over the scenario catalog.

use devops_e2e_runner::catalog::{self, DEVOPS_ENCRYPTION};
use devops_e2e_runner::{Harness, Outcome};

use crate::helpers::config::TestConfigBuilder;
use crate::helpers::fake_world::FakeWorld;

fn filters(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_owned()).collect()
}

#[test]
fn test_e2e_scenario_is_selected_by_its_labels() {
    for label in ["p1", "block", "wcp", "core", "vc90"] {
        let selected = catalog::select(&filters(&[label]));
        assert_eq!(selected, vec![&DEVOPS_ENCRYPTION], "label {label}");
    }
}

#[test]
fn test_e2e_unrelated_label_selects_nothing() {
    assert!(catalog::select(&filters(&["file", "p0"])).is_empty());
}

#[tokio::test]
async fn test_e2e_selected_scenarios_each_get_a_report() {
    // Given
    let world = FakeWorld::healthy();
    let harness = Harness::new(world.clone(), TestConfigBuilder::new().build());

    // When: every scenario matching "p1,wcp" runs
    let mut reports = Vec::new();
    for spec in catalog::select(&filters(&["p1", "wcp"])) {
        reports.push(harness.run(spec).await);
    }

    // Then
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].id, DEVOPS_ENCRYPTION.id);
    assert_eq!(reports[0].title, DEVOPS_ENCRYPTION.title);
    assert_eq!(reports[0].outcome, Outcome::Passed);
}
