//! Scenario catalog and label selection.

use serde::Serialize;

/// Title of the devops encrypted-claim scenario.
pub const DEVOPS_ENCRYPTION_TITLE: &str =
    "[svc-devops-user-test-encryption] As devops user create PVC with EncryptionClass";

/// A registered scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioSpec {
    pub id: &'static str,
    pub title: &'static str,
    pub labels: &'static [&'static str],
}

impl ScenarioSpec {
    /// True when the scenario carries every filter label (case-insensitive).
    pub fn matches(&self, filters: &[String]) -> bool {
        filters.iter().all(|filter| {
            let filter = filter.trim();
            filter.is_empty() || self.labels.iter().any(|l| l.eq_ignore_ascii_case(filter))
        })
    }
}

/// The devops user creates an encrypted claim through an EncryptionClass.
pub const DEVOPS_ENCRYPTION: ScenarioSpec = ScenarioSpec {
    id: "svc-devops-user-test-encryption",
    title: DEVOPS_ENCRYPTION_TITLE,
    labels: &["p1", "block", "wcp", "core", "vc90"],
};

static SCENARIOS: &[ScenarioSpec] = &[DEVOPS_ENCRYPTION];

/// Every scenario this runner knows.
pub fn all() -> &'static [ScenarioSpec] {
    SCENARIOS
}

/// Scenarios matching all of `filters`. No filters selects everything.
pub fn select(filters: &[String]) -> Vec<&'static ScenarioSpec> {
    all().iter().filter(|s| s.matches(filters)).collect()
}
