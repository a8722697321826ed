//! In-memory collaborators.
//!
//! [`FakeWorld`] holds one shared state (cluster objects, storage policies, key
//! providers, VM images) and implements [`Connector`]. Every client it hands out
//! reads and writes that state, so tests can inspect what a harness run left
//! behind.
//!
//! Failures and delays are injected per operation name (`"create_claim"`,
//! `"delete_storage_class"`, `"connect_cluster:devops"`, ...). Every call is
//! appended to the call log.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

use devops_e2e_core::client::{
    ClusterClient, Connector, CryptoClient, StorageBackend, StorageClassParameters,
    VmOperatorClient,
};
use devops_e2e_core::config::VcenterConfig;
use devops_e2e_core::error::{BackendError, ClusterError};
use devops_e2e_core::types::{
    ClaimRef, ClaimRequest, ClusterEvent, ClusterTarget, EncryptionClassRef, EncryptionKeyHandle,
    KeyProviderHealth, KeyProviderInfo, NodeInfo, STORAGE_POLICY_PARAMETER, SchemaSet,
    VmImageInfo,
};

pub const STANDARD_POLICY: &str = "policyA";
pub const STANDARD_POLICY_ID: &str = "pol-aaaa";
pub const ENCRYPTED_POLICY: &str = "policyB";
pub const ENCRYPTED_POLICY_ID: &str = "pol-bbbb";
pub const KEY_PROVIDER: &str = "kp1";
pub const IMAGE_DISPLAY_NAME: &str = "ubuntu-2204-cloud-init";
pub const IMAGE_ID: &str = "vmi-0a1b2c3d";

/// A storage policy known to the backend.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct PolicyRecord {
    pub id: String,
    pub encrypted: bool,
}

/// A claim and the identity that created it.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct ClaimRecord {
    pub request: ClaimRequest,
    pub created_by: String,
}

/// Shared world state.
#[allow(dead_code)]
#[derive(Default)]
pub struct WorldState {
    pub nodes: Vec<NodeInfo>,
    /// By policy name.
    pub policies: BTreeMap<String, PolicyRecord>,
    pub key_providers: BTreeMap<String, KeyProviderHealth>,
    pub storage_classes: BTreeMap<String, StorageClassParameters>,
    /// By (namespace, name).
    pub encryption_classes: BTreeMap<(String, String), EncryptionKeyHandle>,
    /// By (namespace, name).
    pub claims: BTreeMap<(String, String), ClaimRecord>,
    pub issued_keys: Vec<EncryptionKeyHandle>,
    pub images: Vec<VmImageInfo>,
    pub events: Vec<ClusterEvent>,
    pub failures: HashMap<String, String>,
    pub delays: HashMap<String, Duration>,
    pub calls: Vec<String>,
    pub backend_open: bool,
    pub backend_closed: bool,
    pub registered_schemas: Option<SchemaSet>,
    /// Schema version the VM operator client refuses to register.
    pub unserved_schema_version: Option<String>,
    next_key: u32,
}

/// In-memory cluster + vCenter + key provider.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct FakeWorld {
    state: Arc<Mutex<WorldState>>,
}

#[allow(dead_code)]
impl FakeWorld {
    /// A world where the whole scenario can pass: one usable node, `policyA`
    /// (plain) and `policyB` (encrypting), a healthy `kp1` and the VM image.
    pub fn healthy() -> Self {
        let world = Self::default();
        {
            let mut s = world.state();
            s.nodes = vec![NodeInfo {
                name: "node-1".to_owned(),
                ready: true,
                schedulable: true,
            }];
            s.policies.insert(
                STANDARD_POLICY.to_owned(),
                PolicyRecord {
                    id: STANDARD_POLICY_ID.to_owned(),
                    encrypted: false,
                },
            );
            s.policies.insert(
                ENCRYPTED_POLICY.to_owned(),
                PolicyRecord {
                    id: ENCRYPTED_POLICY_ID.to_owned(),
                    encrypted: true,
                },
            );
            s.key_providers
                .insert(KEY_PROVIDER.to_owned(), KeyProviderHealth::Healthy);
            s.images.push(VmImageInfo {
                name: IMAGE_ID.to_owned(),
                display_name: IMAGE_DISPLAY_NAME.to_owned(),
                api_version: "vmoperator.vmware.com/v1alpha3".to_owned(),
            });
        }
        world
    }

    pub fn state(&self) -> MutexGuard<'_, WorldState> {
        self.state.lock().unwrap()
    }

    /// Makes every later call of `op` fail with `message`.
    pub fn fail(&self, op: &str, message: &str) {
        self.state()
            .failures
            .insert(op.to_owned(), message.to_owned());
    }

    /// Makes every later call of `op` wait `delay` first.
    pub fn delay(&self, op: &str, delay: Duration) {
        self.state().delays.insert(op.to_owned(), delay);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Number of calls of `op`.
    pub fn call_count(&self, op: &str) -> usize {
        self.state().calls.iter().filter(|c| *c == op).count()
    }

    /// Position of the first call of `op` in the call log.
    pub fn call_position(&self, op: &str) -> Option<usize> {
        self.state().calls.iter().position(|c| c == op)
    }

    pub fn add_event(&self, namespace: &str, reason: &str, secs: u64) {
        self.state().events.push(ClusterEvent {
            namespace: namespace.to_owned(),
            involved_object: "PersistentVolumeClaim/pvc-x".to_owned(),
            reason: reason.to_owned(),
            message: format!("{reason} happened"),
            event_type: "Warning".to_owned(),
            timestamp: Some(SystemTime::UNIX_EPOCH + Duration::from_secs(secs)),
        });
    }

    /// Records the call, applies any delay and returns the injected failure.
    async fn enter(&self, op: &str) -> Option<String> {
        let delay = {
            let mut s = self.state();
            s.calls.push(op.to_owned());
            s.delays.get(op).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failure = self.state().failures.get(op).cloned();
        failure
    }

    fn backend_check(&self) -> Result<(), BackendError> {
        if self.state().backend_open {
            Ok(())
        } else {
            Err(BackendError::Connection("session is closed".to_owned()))
        }
    }
}

// --- cluster ---

#[derive(Clone)]
pub struct FakeCluster {
    world: FakeWorld,
    identity: String,
    namespace: String,
}

impl ClusterClient for FakeCluster {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn list_ready_schedulable_nodes(&self) -> Result<Vec<NodeInfo>, ClusterError> {
        if let Some(msg) = self.world.enter("list_nodes").await {
            return Err(ClusterError::Api(msg));
        }
        let nodes = self.world.state().nodes.clone();
        Ok(nodes.into_iter().filter(NodeInfo::is_usable).collect())
    }

    async fn get_storage_class(
        &self,
        name: &str,
    ) -> Result<Option<StorageClassParameters>, ClusterError> {
        if let Some(msg) = self.world.enter("get_storage_class").await {
            return Err(ClusterError::Api(msg));
        }
        let params = self.world.state().storage_classes.get(name).cloned();
        Ok(params)
    }

    async fn create_storage_class(
        &self,
        name: &str,
        _provisioner: &str,
        parameters: &StorageClassParameters,
    ) -> Result<(), ClusterError> {
        if let Some(msg) = self.world.enter("create_storage_class").await {
            return Err(ClusterError::Api(msg));
        }
        let mut s = self.world.state();
        s.calls.push(format!("create_storage_class:{name}"));
        if s.storage_classes.contains_key(name) {
            return Err(ClusterError::AlreadyExists {
                kind: "StorageClass".to_owned(),
                name: name.to_owned(),
            });
        }
        s.storage_classes.insert(name.to_owned(), parameters.clone());
        Ok(())
    }

    async fn delete_storage_class(&self, name: &str) -> Result<(), ClusterError> {
        if let Some(msg) = self.world.enter("delete_storage_class").await {
            return Err(ClusterError::Api(msg));
        }
        let mut s = self.world.state();
        s.calls.push(format!("delete_storage_class:{name}"));
        match s.storage_classes.remove(name) {
            Some(_) => Ok(()),
            None => Err(ClusterError::NotFound {
                kind: "StorageClass".to_owned(),
                name: name.to_owned(),
            }),
        }
    }

    async fn create_claim(&self, request: &ClaimRequest) -> Result<ClaimRef, ClusterError> {
        if let Some(msg) = self.world.enter("create_claim").await {
            return Err(ClusterError::Forbidden(msg));
        }
        let mut s = self.world.state();
        s.calls.push(format!("create_claim as {}", self.identity));
        let key = (request.namespace.clone(), request.name.clone());
        if s.claims.contains_key(&key) {
            return Err(ClusterError::AlreadyExists {
                kind: "PersistentVolumeClaim".to_owned(),
                name: request.name.clone(),
            });
        }
        s.claims.insert(
            key,
            ClaimRecord {
                request: request.clone(),
                created_by: self.identity.clone(),
            },
        );
        Ok(ClaimRef {
            namespace: request.namespace.clone(),
            name: request.name.clone(),
            storage_class: request.storage_class.clone(),
            encryption_class: request.encryption_class.clone(),
        })
    }

    async fn delete_claim(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        if let Some(msg) = self.world.enter("delete_claim").await {
            return Err(ClusterError::Api(msg));
        }
        let key = (namespace.to_owned(), name.to_owned());
        match self.world.state().claims.remove(&key) {
            Some(_) => Ok(()),
            None => Err(ClusterError::NotFound {
                kind: "PersistentVolumeClaim".to_owned(),
                name: name.to_owned(),
            }),
        }
    }

    async fn recent_events(
        &self,
        namespace: &str,
        _limit: usize,
    ) -> Result<Vec<ClusterEvent>, ClusterError> {
        if let Some(msg) = self.world.enter("recent_events").await {
            return Err(ClusterError::Api(msg));
        }
        let events = self
            .world
            .state()
            .events
            .iter()
            .filter(|e| e.namespace == namespace)
            .cloned()
            .collect();
        Ok(events)
    }
}

// --- storage backend ---

#[derive(Clone)]
pub struct FakeBackend {
    world: FakeWorld,
}

impl StorageBackend for FakeBackend {
    async fn storage_policy_id(&self, policy_name: &str) -> Result<String, BackendError> {
        if let Some(msg) = self.world.enter("storage_policy_id").await {
            return Err(BackendError::Api(msg));
        }
        self.world.backend_check()?;
        self.world
            .state()
            .policies
            .get(policy_name)
            .map(|p| p.id.clone())
            .ok_or_else(|| BackendError::PolicyNotFound(policy_name.to_owned()))
    }

    async fn policy_is_encrypted(&self, policy_id: &str) -> Result<bool, BackendError> {
        if let Some(msg) = self.world.enter("policy_is_encrypted").await {
            return Err(BackendError::Api(msg));
        }
        self.world.backend_check()?;
        self.world
            .state()
            .policies
            .values()
            .find(|p| p.id == policy_id)
            .map(|p| p.encrypted)
            .ok_or_else(|| BackendError::PolicyNotFound(policy_id.to_owned()))
    }

    async fn key_provider(&self, provider_id: &str) -> Result<KeyProviderInfo, BackendError> {
        if let Some(msg) = self.world.enter("key_provider").await {
            return Err(BackendError::Api(msg));
        }
        self.world.backend_check()?;
        self.world
            .state()
            .key_providers
            .get(provider_id)
            .map(|health| KeyProviderInfo {
                id: provider_id.to_owned(),
                health: health.clone(),
            })
            .ok_or_else(|| BackendError::KeyProviderNotFound(provider_id.to_owned()))
    }

    async fn generate_key(&self, provider_id: &str) -> Result<String, BackendError> {
        if let Some(msg) = self.world.enter("generate_key").await {
            return Err(BackendError::Api(msg));
        }
        self.world.backend_check()?;
        let mut s = self.world.state();
        if !s.key_providers.contains_key(provider_id) {
            return Err(BackendError::KeyProviderNotFound(provider_id.to_owned()));
        }
        s.next_key += 1;
        let key_id = format!("key-{}", s.next_key);
        s.issued_keys.push(EncryptionKeyHandle {
            provider_id: provider_id.to_owned(),
            key_id: key_id.clone(),
        });
        Ok(key_id)
    }

    async fn close(&self) -> Result<(), BackendError> {
        if let Some(msg) = self.world.enter("close").await {
            return Err(BackendError::Api(msg));
        }
        let mut s = self.world.state();
        s.backend_open = false;
        s.backend_closed = true;
        Ok(())
    }
}

// --- encryption service ---

#[derive(Clone)]
pub struct FakeCrypto {
    world: FakeWorld,
    backend: FakeBackend,
}

impl CryptoClient for FakeCrypto {
    async fn generate_key(&self, provider_id: &str) -> Result<EncryptionKeyHandle, ClusterError> {
        let key_id = self.backend.generate_key(provider_id).await?;
        Ok(EncryptionKeyHandle {
            provider_id: provider_id.to_owned(),
            key_id,
        })
    }

    async fn create_encryption_class(
        &self,
        namespace: &str,
        name: &str,
        key: &EncryptionKeyHandle,
    ) -> Result<EncryptionClassRef, ClusterError> {
        if let Some(msg) = self.world.enter("create_encryption_class").await {
            return Err(ClusterError::Api(msg));
        }
        let mut s = self.world.state();
        let id = (namespace.to_owned(), name.to_owned());
        if s.encryption_classes.contains_key(&id) {
            return Err(ClusterError::AlreadyExists {
                kind: "EncryptionClass".to_owned(),
                name: name.to_owned(),
            });
        }
        s.encryption_classes.insert(id, key.clone());
        Ok(EncryptionClassRef {
            namespace: namespace.to_owned(),
            name: name.to_owned(),
            key: key.clone(),
        })
    }

    async fn delete_encryption_class(&self, class: &EncryptionClassRef) -> Result<(), ClusterError> {
        if let Some(msg) = self.world.enter("delete_encryption_class").await {
            return Err(ClusterError::Api(msg));
        }
        let id = (class.namespace.clone(), class.name.clone());
        match self.world.state().encryption_classes.remove(&id) {
            Some(_) => Ok(()),
            None => Err(ClusterError::NotFound {
                kind: "EncryptionClass".to_owned(),
                name: class.name.clone(),
            }),
        }
    }

    async fn is_encrypted_storage_class(&self, storage_class: &str) -> Result<bool, ClusterError> {
        if let Some(msg) = self.world.enter("is_encrypted_storage_class").await {
            return Err(ClusterError::Api(msg));
        }
        let policy_id = self
            .world
            .state()
            .storage_classes
            .get(storage_class)
            .and_then(|params| params.get(STORAGE_POLICY_PARAMETER).cloned())
            .ok_or_else(|| ClusterError::NotFound {
                kind: "StorageClass".to_owned(),
                name: storage_class.to_owned(),
            })?;
        Ok(self.backend.policy_is_encrypted(&policy_id).await?)
    }
}

// --- vm operator ---

pub struct FakeVmOperator {
    world: FakeWorld,
    schemas: SchemaSet,
}

impl VmOperatorClient for FakeVmOperator {
    fn schemas(&self) -> &SchemaSet {
        &self.schemas
    }

    async fn list_images(&self, _namespace: &str) -> Result<Vec<VmImageInfo>, ClusterError> {
        if let Some(msg) = self.world.enter("list_images").await {
            return Err(ClusterError::Api(msg));
        }
        let images = self.world.state().images.clone();
        Ok(images)
    }
}

// --- connector ---

impl Connector for FakeWorld {
    type Cluster = FakeCluster;
    type Backend = FakeBackend;
    type Crypto = FakeCrypto;
    type VmOperator = FakeVmOperator;

    async fn connect_cluster(&self, target: &ClusterTarget) -> Result<FakeCluster, ClusterError> {
        if let Some(msg) = self.enter(&format!("connect_cluster:{}", target.identity)).await {
            return Err(ClusterError::Connection(msg));
        }
        Ok(FakeCluster {
            world: self.clone(),
            identity: target.identity.clone(),
            namespace: target.namespace.clone(),
        })
    }

    async fn connect_backend(&self, _vcenter: &VcenterConfig) -> Result<FakeBackend, BackendError> {
        if let Some(msg) = self.enter("connect_backend").await {
            return Err(BackendError::Connection(msg));
        }
        self.state().backend_open = true;
        Ok(FakeBackend {
            world: self.clone(),
        })
    }

    async fn connect_crypto(
        &self,
        _cluster: &FakeCluster,
        backend: &FakeBackend,
    ) -> Result<FakeCrypto, ClusterError> {
        if let Some(msg) = self.enter("connect_crypto").await {
            return Err(ClusterError::Connection(msg));
        }
        Ok(FakeCrypto {
            world: self.clone(),
            backend: backend.clone(),
        })
    }

    async fn connect_vm_operator(
        &self,
        _cluster: &FakeCluster,
        schemas: SchemaSet,
    ) -> Result<FakeVmOperator, ClusterError> {
        if let Some(msg) = self.enter("connect_vm_operator").await {
            return Err(ClusterError::Connection(msg));
        }
        let mut served = SchemaSet::default();
        {
            let mut s = self.state();
            for schema in schemas.iter() {
                if s.unserved_schema_version.as_deref() != Some(schema.version.as_str()) {
                    served.register(schema.clone());
                }
            }
            s.registered_schemas = Some(served.clone());
        }
        let schemas = served;
        Ok(FakeVmOperator {
            world: self.clone(),
            schemas,
        })
    }
}
