//! Encryption-service client.
//!
//! Encryption classes are `encryption.vmware.com/v1alpha1` `EncryptionClass`
//! objects accessed as [`DynamicObject`]s. Key generation and storage-class
//! capability checks go through the storage backend: a class is encryption-capable
//! when the storage policy named by its `storagePolicyID` parameter encrypts.

use devops_e2e_core::client::{CryptoClient, StorageBackend};
use devops_e2e_core::error::ClusterError;
use devops_e2e_core::types::{
    EncryptionClassRef, EncryptionKeyHandle, STORAGE_POLICY_PARAMETER,
};
use k8s_openapi::api::storage::v1::StorageClass;
use kube::Client;
use kube::api::{Api, ApiResource, DeleteParams, DynamicObject, GroupVersionKind, PostParams};
use serde_json::json;
use tracing::{debug, info};

use crate::error::map_object_error;

/// API group of encryption classes.
pub const ENCRYPTION_GROUP: &str = "encryption.vmware.com";
/// API version of encryption classes.
pub const ENCRYPTION_VERSION: &str = "v1alpha1";
/// Kind of encryption classes.
pub const ENCRYPTION_CLASS_KIND: &str = "EncryptionClass";

/// Encryption-service client using the cluster credentials and a storage backend.
#[derive(Clone)]
pub struct KubeCryptoClient<B> {
    client: Client,
    backend: B,
}

impl<B: StorageBackend> KubeCryptoClient<B> {
    pub fn new(client: Client, backend: B) -> Self {
        Self { client, backend }
    }

    fn encryption_classes(&self, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &encryption_class_resource())
    }
}

impl<B: StorageBackend> CryptoClient for KubeCryptoClient<B> {
    async fn generate_key(&self, provider_id: &str) -> Result<EncryptionKeyHandle, ClusterError> {
        let key_id = self.backend.generate_key(provider_id).await?;
        debug!(provider = %provider_id, key = %key_id, "generated encryption key");
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
        let obj = build_encryption_class(namespace, name, key);
        self.encryption_classes(namespace)
            .create(&PostParams::default(), &obj)
            .await
            .map_err(|e| map_object_error(e, ENCRYPTION_CLASS_KIND, name))?;
        info!(namespace = %namespace, name = %name, key = %key, "encryption class created");

        Ok(EncryptionClassRef {
            namespace: namespace.to_owned(),
            name: name.to_owned(),
            key: key.clone(),
        })
    }

    async fn delete_encryption_class(&self, class: &EncryptionClassRef) -> Result<(), ClusterError> {
        self.encryption_classes(&class.namespace)
            .delete(&class.name, &DeleteParams::default())
            .await
            .map_err(|e| map_object_error(e, ENCRYPTION_CLASS_KIND, &class.name))?;
        Ok(())
    }

    async fn is_encrypted_storage_class(&self, storage_class: &str) -> Result<bool, ClusterError> {
        let api: Api<StorageClass> = Api::all(self.client.clone());
        let sc = api
            .get(storage_class)
            .await
            .map_err(|e| map_object_error(e, "StorageClass", storage_class))?;

        let policy_id = storage_policy_id(&sc).ok_or_else(|| {
            ClusterError::Api(format!(
                "storage class '{storage_class}' has no {STORAGE_POLICY_PARAMETER} parameter"
            ))
        })?;

        let encrypted = self.backend.policy_is_encrypted(&policy_id).await?;
        debug!(storage_class = %storage_class, policy_id = %policy_id, encrypted, "checked storage class encryption");
        Ok(encrypted)
    }
}

/// The dynamic API resource for encryption classes.
pub fn encryption_class_resource() -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind::gvk(
        ENCRYPTION_GROUP,
        ENCRYPTION_VERSION,
        ENCRYPTION_CLASS_KIND,
    ))
}

/// Builds an encryption class binding a key provider and key.
pub fn build_encryption_class(
    namespace: &str,
    name: &str,
    key: &EncryptionKeyHandle,
) -> DynamicObject {
    let mut obj = DynamicObject::new(name, &encryption_class_resource()).within(namespace);
    obj.data = json!({
        "spec": {
            "keyProvider": key.provider_id,
            "keyID": key.key_id,
        }
    });
    obj
}

/// Reads the backend policy id from a storage class.
///
/// The CSI driver treats parameter keys case-insensitively.
pub fn storage_policy_id(sc: &StorageClass) -> Option<String> {
    sc.parameters.as_ref().and_then(|params| {
        params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(STORAGE_POLICY_PARAMETER))
            .map(|(_, v)| v.clone())
    })
}
