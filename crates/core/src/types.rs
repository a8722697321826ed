//! 도메인 타입 — 하네스 전역에서 사용되는 공통 타입
//!
//! 클러스터 객체 핸들, 키 핸들, 노드/이벤트/이미지 정보 등
//! 하네스 단계와 협력자 구현이 교환하는 데이터 구조를 정의합니다.

use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// 클레임이 참조하는 암호화 클래스 어노테이션 키
pub const ENCRYPTION_CLASS_ANNOTATION: &str = "csi.vsphere.encryption-class";

/// 스토리지 클래스가 백엔드 정책을 가리키는 파라미터 키
pub const STORAGE_POLICY_PARAMETER: &str = "storagePolicyID";

/// 클러스터 접속 대상 (신원 + kubeconfig + 네임스페이스)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterTarget {
    /// 로그용 신원 라벨 (admin, devops, service)
    pub identity: String,
    /// kubeconfig 경로. `None`이면 기본 추론
    pub kubeconfig: Option<PathBuf>,
    /// 바인딩할 네임스페이스
    pub namespace: String,
}

impl ClusterTarget {
    /// 새 접속 대상을 생성합니다.
    pub fn new(identity: &str, kubeconfig: Option<PathBuf>, namespace: &str) -> Self {
        Self {
            identity: identity.to_owned(),
            kubeconfig,
            namespace: namespace.to_owned(),
        }
    }
}

impl fmt::Display for ClusterTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kubeconfig {
            Some(path) => write!(
                f,
                "{}@{} ({})",
                self.identity,
                self.namespace,
                path.display()
            ),
            None => write!(f, "{}@{} (inferred)", self.identity, self.namespace),
        }
    }
}

/// 스토리지 클래스의 출처
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassOrigin {
    /// 하네스가 생성
    Created,
    /// 플랫폼이 동기화한 기존 클래스를 채택
    Adopted,
}

/// 스토리지 클래스 핸들
///
/// 암호화 클래스는 암호화 서비스 검증을 통과한 뒤에만 클레임이 참조할 수 있습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageClassRef {
    /// 클러스터 객체 이름
    pub name: String,
    /// 백엔드 스토리지 정책 이름
    pub policy_name: String,
    /// 백엔드 스토리지 정책 ID
    pub policy_id: String,
    /// 요청된 암호화 여부
    pub encrypted: bool,
    /// 출처
    pub origin: ClassOrigin,
}

impl fmt::Display for StorageClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (policy={}, encrypted={})",
            self.name, self.policy_name, self.encrypted
        )
    }
}

/// 키 프로바이더가 발급한 불투명 키 핸들
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncryptionKeyHandle {
    /// 발급한 키 프로바이더 ID
    pub provider_id: String,
    /// 키 ID
    pub key_id: String,
}

impl fmt::Display for EncryptionKeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider_id, self.key_id)
    }
}

/// 암호화 클래스 핸들
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionClassRef {
    /// 네임스페이스
    pub namespace: String,
    /// 객체 이름
    pub name: String,
    /// 바인딩된 키
    pub key: EncryptionKeyHandle,
}

impl fmt::Display for EncryptionClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} (key={})", self.namespace, self.name, self.key)
    }
}

/// 스토리지 클레임 생성 요청
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRequest {
    pub namespace: String,
    pub name: String,
    /// 참조할 스토리지 클래스 이름
    pub storage_class: String,
    /// 참조할 암호화 클래스 이름 (암호화가 필요할 때만)
    pub encryption_class: Option<String>,
    /// 요청 크기 (예: `1Gi`)
    pub size: String,
    /// 접근 모드
    pub access_mode: String,
}

/// 생성된 스토리지 클레임 핸들
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRef {
    pub namespace: String,
    pub name: String,
    pub storage_class: String,
    pub encryption_class: Option<String>,
}

impl fmt::Display for ClaimRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// 컴퓨트 노드 상태 요약
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub name: String,
    /// `Ready=True` 조건 여부
    pub ready: bool,
    /// cordon/taint로 스케줄링이 막혀 있지 않은지 여부
    pub schedulable: bool,
}

impl NodeInfo {
    /// 워크로드를 받을 수 있는 노드인지 여부
    pub fn is_usable(&self) -> bool {
        self.ready && self.schedulable
    }
}

/// 진단용 클러스터 이벤트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterEvent {
    pub namespace: String,
    /// 관련 객체 (`Kind/name`)
    pub involved_object: String,
    pub reason: String,
    pub message: String,
    /// `Normal` / `Warning`
    pub event_type: String,
    /// 마지막 발생 시각
    pub timestamp: Option<SystemTime>,
}

impl fmt::Display for ClusterEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}: {}",
            self.event_type, self.involved_object, self.reason, self.message
        )
    }
}

/// 이벤트를 시간순으로 정렬하고 가장 최근 `limit`개만 남깁니다.
///
/// 시각이 없는 이벤트는 가장 오래된 것으로 취급합니다.
pub fn most_recent_events(mut events: Vec<ClusterEvent>, limit: usize) -> Vec<ClusterEvent> {
    events.sort_by_key(|e| e.timestamp.unwrap_or(SystemTime::UNIX_EPOCH));
    let skip = events.len().saturating_sub(limit);
    events.into_iter().skip(skip).collect()
}

/// 키 프로바이더 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyProviderHealth {
    Healthy,
    Unhealthy(String),
}

/// 키 프로바이더 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyProviderInfo {
    pub id: String,
    pub health: KeyProviderHealth,
}

impl KeyProviderInfo {
    /// 키 발급에 사용할 수 있는지 여부
    pub fn is_usable(&self) -> bool {
        matches!(self.health, KeyProviderHealth::Healthy)
    }
}

/// API 스키마 (group/version/kind)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApiSchema {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl ApiSchema {
    pub fn new(group: &str, version: &str, kind: &str) -> Self {
        Self {
            group: group.to_owned(),
            version: version.to_owned(),
            kind: kind.to_owned(),
        }
    }

    /// `group/version` 형식
    pub fn api_version(&self) -> String {
        format!("{}/{}", self.group, self.version)
    }
}

/// VM 오케스트레이션 클라이언트가 등록하는 스키마 집합
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSet {
    schemas: Vec<ApiSchema>,
}

impl SchemaSet {
    /// VM 오퍼레이터 그룹
    pub const VM_OPERATOR_GROUP: &'static str = "vmoperator.vmware.com";

    /// 시나리오가 필요로 하는 VM 오퍼레이터 스키마 (`v1alpha1`, `v1alpha3`)
    pub fn vm_operator() -> Self {
        let mut set = Self::default();
        for version in ["v1alpha1", "v1alpha3"] {
            set.register(ApiSchema::new(
                Self::VM_OPERATOR_GROUP,
                version,
                "VirtualMachineImage",
            ));
        }
        set
    }

    /// 스키마를 등록합니다. 중복은 무시합니다.
    pub fn register(&mut self, schema: ApiSchema) {
        if !self.schemas.contains(&schema) {
            self.schemas.push(schema);
        }
    }

    pub fn contains(&self, group: &str, version: &str) -> bool {
        self.schemas
            .iter()
            .any(|s| s.group == group && s.version == version)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ApiSchema> {
        self.schemas.iter()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// VM 이미지 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmImageInfo {
    /// 클러스터 객체 이름 (내부 식별자)
    pub name: String,
    /// 표시 이름
    pub display_name: String,
    /// 조회한 API 버전
    pub api_version: String,
}

/// 표시 이름으로 이미지를 찾아 비어 있지 않은 내부 식별자를 반환합니다.
pub fn find_image<'a>(images: &'a [VmImageInfo], display_name: &str) -> Option<&'a str> {
    images
        .iter()
        .find(|img| img.display_name == display_name && !img.name.is_empty())
        .map(|img| img.name.as_str())
}

/// 정책 이름을 DNS-1123 규칙의 스토리지 클래스 이름으로 변환합니다.
///
/// 소문자화, 허용되지 않는 문자는 `-`로 치환, 양끝 `-` 제거, 63자 제한.
pub fn storage_class_name(policy_name: &str) -> String {
    let mut name: String = policy_name
        .trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '-'
            }
        })
        .collect();
    name.truncate(63);
    let trimmed = name.trim_matches(|c| c == '-' || c == '.');
    if trimmed.is_empty() {
        "storage-class".to_owned()
    } else {
        trimmed.to_owned()
    }
}

/// 충돌하지 않는 객체 이름을 생성합니다 (`prefix-xxxxxxxx`).
pub fn unique_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", &id[..8])
}
