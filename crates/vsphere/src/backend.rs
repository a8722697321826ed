//! vCenter REST storage backend.
//!
//! [`VsphereBackend`] opens an API session with basic authentication and sends the
//! session token in the `vmware-api-session-id` header on every later call.
//!
//! | Operation | Request |
//! |---|---|
//! | connect | `POST /api/session` |
//! | storage policy lookup | `GET /api/vcenter/storage/policies` |
//! | policy encryption | `GET /api/vcenter/storage/policies/{policy}/encryption` |
//! | key provider | `GET /api/vcenter/crypto-manager/kms/providers` |
//! | key generation | `POST /api/vcenter/crypto-manager/kms/providers/{provider}/keys` |
//! | close | `DELETE /api/session` |
//!
//! Every call is issued once; no request is retried.

use std::sync::Arc;
use std::time::Duration;

use devops_e2e_core::client::StorageBackend;
use devops_e2e_core::config::VcenterConfig;
use devops_e2e_core::error::BackendError;
use devops_e2e_core::types::{KeyProviderHealth, KeyProviderInfo};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::model::{GeneratedKey, KmsProviderSummary, PolicyEncryption, StoragePolicySummary};

/// Session header name.
pub const SESSION_HEADER: &str = "vmware-api-session-id";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Storage backend connection to a vCenter server.
///
/// Cloning shares the session.
#[derive(Clone)]
pub struct VsphereBackend {
    http: reqwest::Client,
    base_url: String,
    session: Arc<RwLock<Option<String>>>,
}

impl VsphereBackend {
    /// Opens a session against the configured vCenter.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Connection` if the HTTP client cannot be built,
    /// the server is unreachable, or the credentials are rejected.
    pub async fn connect(config: &VcenterConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(config.insecure)
            .build()
            .map_err(|e| BackendError::Connection(format!("failed to build http client: {e}")))?;

        let base_url = config.url.trim_end_matches('/').to_owned();
        let response = http
            .post(format!("{base_url}/api/session"))
            .basic_auth(&config.username, Some(&config.password))
            .send()
            .await
            .map_err(|e| BackendError::Connection(format!("POST /api/session: {e}")))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BackendError::Connection(format!(
                "vCenter rejected credentials for '{}' (HTTP {status})",
                config.username
            )));
        }
        if !status.is_success() {
            return Err(BackendError::Connection(format!(
                "POST /api/session: HTTP {status}"
            )));
        }

        let token: String = response
            .json()
            .await
            .map_err(|e| BackendError::Connection(format!("invalid session response: {e}")))?;

        info!(url = %base_url, user = %config.username, "vCenter session opened");
        Ok(Self {
            http,
            base_url,
            session: Arc::new(RwLock::new(Some(token))),
        })
    }

    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, BackendError> {
        let session = self.session.read().await;
        let token = session
            .as_deref()
            .ok_or_else(|| BackendError::Connection("vCenter session is closed".to_owned()))?;
        Ok(self
            .http
            .request(method, format!("{}{path}", self.base_url))
            .header(SESSION_HEADER, token))
    }

    async fn send(&self, method: Method, path: &str) -> Result<Response, BackendError> {
        let label = format!("{method} {path}");
        let response = self
            .request(method, path)
            .await?
            .send()
            .await
            .map_err(|e| BackendError::Api(format!("{label}: {e}")))?;
        debug!(request = %label, status = %response.status(), "vCenter call");
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let response = ensure_success(self.send(Method::GET, path).await?, "GET", path).await?;
        response
            .json()
            .await
            .map_err(|e| BackendError::Api(format!("GET {path}: invalid body: {e}")))
    }
}

impl StorageBackend for VsphereBackend {
    async fn storage_policy_id(&self, policy_name: &str) -> Result<String, BackendError> {
        let policies: Vec<StoragePolicySummary> =
            self.get_json("/api/vcenter/storage/policies").await?;
        policies
            .into_iter()
            .find(|p| p.name == policy_name)
            .map(|p| p.policy)
            .ok_or_else(|| BackendError::PolicyNotFound(policy_name.to_owned()))
    }

    async fn policy_is_encrypted(&self, policy_id: &str) -> Result<bool, BackendError> {
        let path = format!("/api/vcenter/storage/policies/{policy_id}/encryption");
        let response = self.send(Method::GET, &path).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(BackendError::PolicyNotFound(policy_id.to_owned()));
        }
        let body: PolicyEncryption = ensure_success(response, "GET", &path)
            .await?
            .json()
            .await
            .map_err(|e| BackendError::Api(format!("GET {path}: invalid body: {e}")))?;
        Ok(body.encrypted)
    }

    async fn key_provider(&self, provider_id: &str) -> Result<KeyProviderInfo, BackendError> {
        let providers: Vec<KmsProviderSummary> = self
            .get_json("/api/vcenter/crypto-manager/kms/providers")
            .await?;
        let provider = providers
            .into_iter()
            .find(|p| p.provider == provider_id)
            .ok_or_else(|| BackendError::KeyProviderNotFound(provider_id.to_owned()))?;
        Ok(provider_info(provider))
    }

    async fn generate_key(&self, provider_id: &str) -> Result<String, BackendError> {
        let path = format!("/api/vcenter/crypto-manager/kms/providers/{provider_id}/keys");
        let response = self.send(Method::POST, &path).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(BackendError::KeyProviderNotFound(provider_id.to_owned()));
        }
        let body: GeneratedKey = ensure_success(response, "POST", &path)
            .await?
            .json()
            .await
            .map_err(|e| BackendError::Api(format!("POST {path}: invalid body: {e}")))?;
        if body.key.is_empty() {
            return Err(BackendError::Api(format!(
                "key provider '{provider_id}' returned an empty key id"
            )));
        }
        Ok(body.key)
    }

    async fn close(&self) -> Result<(), BackendError> {
        let response = self.send(Method::DELETE, "/api/session").await?;
        let status = response.status();
        *self.session.write().await = None;

        // an expired session has nothing left to release
        if status.is_success() || status == StatusCode::UNAUTHORIZED {
            info!("vCenter session closed");
            Ok(())
        } else {
            warn!(status = %status, "vCenter session close returned an error status");
            Err(BackendError::Api(format!("DELETE /api/session: HTTP {status}")))
        }
    }
}

async fn ensure_success(
    response: Response,
    method: &str,
    path: &str,
) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(BackendError::Api(format!(
        "{method} {path}: HTTP {status}: {}",
        body.trim()
    )))
}

fn provider_info(summary: KmsProviderSummary) -> KeyProviderInfo {
    let health = if summary.health.eq_ignore_ascii_case("OK") {
        KeyProviderHealth::Healthy
    } else if summary.details.is_empty() {
        KeyProviderHealth::Unhealthy(summary.health)
    } else {
        KeyProviderHealth::Unhealthy(format!(
            "{}: {}",
            summary.health,
            summary.details.join("; ")
        ))
    };
    KeyProviderInfo {
        id: summary.provider,
        health,
    }
}
