//! devops E2E 하네스 코어
//!
//! 하네스의 모든 크레이트가 공유하는 기반 요소를 제공합니다.
//!
//! - [`error`]: 실패 분류 체계를 따르는 에러 타입
//! - [`config`]: 타입 설정과 환경변수 해석기
//! - [`types`]: 클러스터 객체 핸들과 도메인 타입
//! - [`client`]: 협력자 trait (클러스터, 스토리지 백엔드, 암호화, VM 오케스트레이션)
//! - [`cleanup`]: 역순 정리 스택
//! - [`metrics`]: 메트릭 이름 상수

pub mod cleanup;
pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{BackendError, ClusterError, ConfigError, FailureKind, HarnessError};

// 설정
pub use config::{ClusterFlavor, EnvSource, HarnessConfig, ProcessEnv};

// 협력자 trait
pub use client::{ClusterClient, Connector, CryptoClient, StorageBackend, VmOperatorClient};

// 정리 스택
pub use cleanup::{CleanupStack, PendingCleanup};

// 도메인 타입
pub use types::{
    ClaimRef, ClaimRequest, ClusterEvent, ClusterTarget, EncryptionClassRef, EncryptionKeyHandle,
    KeyProviderInfo, NodeInfo, SchemaSet, StorageClassRef, VmImageInfo,
};
