//! vCenter REST payloads used by the backend.

use serde::Deserialize;

/// Entry of `GET /api/vcenter/storage/policies`.
#[derive(Debug, Clone, Deserialize)]
pub struct StoragePolicySummary {
    /// Policy identifier.
    pub policy: String,
    /// Display name.
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Body of `GET /api/vcenter/storage/policies/{policy}/encryption`.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyEncryption {
    pub encrypted: bool,
}

/// Entry of `GET /api/vcenter/crypto-manager/kms/providers`.
#[derive(Debug, Clone, Deserialize)]
pub struct KmsProviderSummary {
    pub provider: String,
    /// `OK`, `WARNING`, `ERROR` or `NONE`.
    pub health: String,
    #[serde(default)]
    pub details: Vec<String>,
}

/// Body of `POST /api/vcenter/crypto-manager/kms/providers/{provider}/keys`.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedKey {
    pub key: String,
}
