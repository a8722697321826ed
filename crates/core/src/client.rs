//! 협력자 trait — 하네스가 소비하는 외부 클라이언트 계약
//!
//! 하네스는 클러스터 API, 스토리지 백엔드, 암호화 서비스, VM 오케스트레이션을
//! 이 trait들을 통해서만 호출합니다. 실제 구현은 `devops-e2e-kube`,
//! `devops-e2e-vsphere` 크레이트에 있으며, 테스트는 인메모리 구현을 사용합니다.
//!
//! ```text
//!            ┌───────────┐
//!            │ Connector │  (bootstrapper seam)
//!            └─────┬─────┘
//!     ┌──────────┬─┴────────┬──────────────┐
//!     ▼          ▼          ▼              ▼
//! ClusterClient StorageBackend CryptoClient VmOperatorClient
//! ```
//!
//! 모든 메서드는 단일 호출이며 재시도하지 않습니다.

use std::collections::BTreeMap;
use std::future::Future;

use crate::config::VcenterConfig;
use crate::error::{BackendError, ClusterError};
use crate::types::{
    ClaimRef, ClaimRequest, ClusterEvent, ClusterTarget, EncryptionClassRef, EncryptionKeyHandle,
    KeyProviderInfo, NodeInfo, SchemaSet, VmImageInfo,
};

/// 스토리지 클래스 파라미터
pub type StorageClassParameters = BTreeMap<String, String>;

/// 클러스터 API 클라이언트
///
/// 하나의 신원과 네임스페이스에 바인딩됩니다.
/// 삭제 대상이 없으면 반드시 [`ClusterError::NotFound`]를 반환해야 합니다.
pub trait ClusterClient: Clone + Send + Sync + 'static {
    /// 바인딩된 네임스페이스
    fn namespace(&self) -> &str;

    /// Ready 상태이며 스케줄 가능한 노드 목록을 조회합니다.
    fn list_ready_schedulable_nodes(
        &self,
    ) -> impl Future<Output = Result<Vec<NodeInfo>, ClusterError>> + Send;

    /// 스토리지 클래스의 파라미터를 조회합니다. 없으면 `None`.
    fn get_storage_class(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<StorageClassParameters>, ClusterError>> + Send;

    /// 스토리지 클래스를 생성합니다. 같은 이름이 있으면 `AlreadyExists`.
    fn create_storage_class(
        &self,
        name: &str,
        provisioner: &str,
        parameters: &StorageClassParameters,
    ) -> impl Future<Output = Result<(), ClusterError>> + Send;

    /// 스토리지 클래스를 삭제합니다.
    fn delete_storage_class(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<(), ClusterError>> + Send;

    /// 스토리지 클레임을 생성합니다.
    fn create_claim(
        &self,
        request: &ClaimRequest,
    ) -> impl Future<Output = Result<ClaimRef, ClusterError>> + Send;

    /// 스토리지 클레임을 삭제합니다.
    fn delete_claim(
        &self,
        namespace: &str,
        name: &str,
    ) -> impl Future<Output = Result<(), ClusterError>> + Send;

    /// 네임스페이스의 최근 이벤트를 시간순으로 최대 `limit`개 조회합니다.
    fn recent_events(
        &self,
        namespace: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ClusterEvent>, ClusterError>> + Send;
}

/// 스토리지 백엔드 연결 (스토리지 정책, 키 프로바이더)
pub trait StorageBackend: Clone + Send + Sync + 'static {
    /// 정책 이름을 정책 ID로 해석합니다.
    fn storage_policy_id(
        &self,
        policy_name: &str,
    ) -> impl Future<Output = Result<String, BackendError>> + Send;

    /// 정책이 암호화를 수행하는지 조회합니다.
    fn policy_is_encrypted(
        &self,
        policy_id: &str,
    ) -> impl Future<Output = Result<bool, BackendError>> + Send;

    /// 키 프로바이더 정보를 조회합니다.
    fn key_provider(
        &self,
        provider_id: &str,
    ) -> impl Future<Output = Result<KeyProviderInfo, BackendError>> + Send;

    /// 키 프로바이더에서 새 키를 발급받아 키 ID를 반환합니다.
    fn generate_key(
        &self,
        provider_id: &str,
    ) -> impl Future<Output = Result<String, BackendError>> + Send;

    /// 세션을 종료합니다.
    fn close(&self) -> impl Future<Output = Result<(), BackendError>> + Send;
}

/// 암호화 서비스 클라이언트
pub trait CryptoClient: Clone + Send + Sync + 'static {
    /// 키 프로바이더 범위의 새 키를 생성합니다.
    fn generate_key(
        &self,
        provider_id: &str,
    ) -> impl Future<Output = Result<EncryptionKeyHandle, ClusterError>> + Send;

    /// 키를 바인딩한 암호화 클래스를 생성합니다.
    fn create_encryption_class(
        &self,
        namespace: &str,
        name: &str,
        key: &EncryptionKeyHandle,
    ) -> impl Future<Output = Result<EncryptionClassRef, ClusterError>> + Send;

    /// 암호화 클래스를 삭제합니다.
    fn delete_encryption_class(
        &self,
        class: &EncryptionClassRef,
    ) -> impl Future<Output = Result<(), ClusterError>> + Send;

    /// 스토리지 클래스가 실제로 암호화를 수행하는지 조회합니다.
    fn is_encrypted_storage_class(
        &self,
        storage_class: &str,
    ) -> impl Future<Output = Result<bool, ClusterError>> + Send;
}

/// VM 오케스트레이션 클라이언트
pub trait VmOperatorClient: Send + Sync + 'static {
    /// 등록된 스키마 집합
    fn schemas(&self) -> &SchemaSet;

    /// 네임스페이스에서 보이는 VM 이미지 목록
    fn list_images(
        &self,
        namespace: &str,
    ) -> impl Future<Output = Result<Vec<VmImageInfo>, ClusterError>> + Send;
}

/// 클라이언트 생성기 (부트스트랩 seam)
///
/// 부트스트래퍼는 이 trait의 메서드를 정해진 순서로 호출합니다:
/// 클러스터 → 스토리지 백엔드 → 암호화 서비스 → VM 오케스트레이션.
/// devops 신원과 서비스 클러스터도 [`connect_cluster`](Self::connect_cluster)로 생성합니다.
pub trait Connector: Send + Sync {
    type Cluster: ClusterClient;
    type Backend: StorageBackend;
    type Crypto: CryptoClient;
    type VmOperator: VmOperatorClient;

    /// 대상 신원/네임스페이스에 바인딩된 클러스터 클라이언트를 생성합니다.
    fn connect_cluster(
        &self,
        target: &ClusterTarget,
    ) -> impl Future<Output = Result<Self::Cluster, ClusterError>> + Send;

    /// 스토리지 백엔드 세션을 엽니다.
    fn connect_backend(
        &self,
        vcenter: &VcenterConfig,
    ) -> impl Future<Output = Result<Self::Backend, BackendError>> + Send;

    /// 현재 클러스터 자격 증명에 바인딩된 암호화 서비스 클라이언트를 생성합니다.
    fn connect_crypto(
        &self,
        cluster: &Self::Cluster,
        backend: &Self::Backend,
    ) -> impl Future<Output = Result<Self::Crypto, ClusterError>> + Send;

    /// 스키마 집합을 등록한 VM 오케스트레이션 클라이언트를 생성합니다.
    fn connect_vm_operator(
        &self,
        cluster: &Self::Cluster,
        schemas: SchemaSet,
    ) -> impl Future<Output = Result<Self::VmOperator, ClusterError>> + Send;
}
